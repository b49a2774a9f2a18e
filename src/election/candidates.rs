// Copyright (C) 2021 Quentin M. Kniep <hello@quentinkniep.com>
// Distributed under terms of the MIT license.

use std::collections::HashMap;

use num::{bigint::BigUint, One, Zero};
use tracing::debug;

use super::ElectionError;
use crate::config::ChainParams;
use crate::crypto::{self, CryptoHash};
use crate::data::basics::{Address, SnailNumber};
use crate::data::chain::SnailChain;

/// One qualifying miner, weighted by its share of the window's difficulty
/// credit. Recomputed per election window, never persisted.
#[derive(Clone, Debug)]
pub struct CandidateMember {
    pub coinbase: Address,
    /// Address derived from the miner's fruit-signing key.
    pub address: Address,
    pub pubkey: Vec<u8>,
    /// Number of fruits this miner mined inside the window.
    pub fruit_count: u64,
    /// Sum of per-fruit difficulty credit (actual minus target).
    pub difficulty: BigUint,
    /// Sub-range `[lower, upper)` of the 256-bit lottery space, sized
    /// proportionally to `difficulty`.
    pub lower: BigUint,
    pub upper: BigUint,
}

/// The full 256-bit lottery space upper bound, `2^256 - 1`.
pub fn lottery_space() -> BigUint {
    (BigUint::one() << 256u32) - BigUint::one()
}

/// Scans the closed snail range `[begin, end]`, tallies per-miner fruits and
/// difficulty credit, and turns qualifying miners into range-weighted
/// candidates.
///
/// The returned seed is the keccak digest of the concatenated snail block
/// hashes of the window. Any missing block aborts the whole window: a
/// partial tally would elect a different committee than a fully synced node.
pub fn assemble_candidates(
    chain: &dyn SnailChain,
    begin: SnailNumber,
    end: SnailNumber,
    params: &ChainParams,
) -> Result<(CryptoHash, Vec<CandidateMember>), ElectionError> {
    let mut seed_material = Vec::new();
    let mut order: Vec<Address> = Vec::new();
    let mut tally: HashMap<Address, CandidateMember> = HashMap::new();

    for number in begin..=end {
        let block = chain
            .get_block_by_number(number)
            .ok_or(ElectionError::CommitteeNotFound)?;
        seed_material.extend_from_slice(&block.header.hash.0);

        for fruit in &block.fruits {
            let address = match Address::from_pubkey(&fruit.pubkey) {
                Ok(a) => a,
                Err(_) => {
                    debug!("skipping fruit with malformed pubkey at snail {}", number);
                    continue;
                }
            };
            let credit = fruit.fruit_difficulty.saturating_sub(fruit.target_difficulty);
            let entry = tally.entry(address).or_insert_with(|| {
                order.push(address);
                CandidateMember {
                    coinbase: fruit.coinbase,
                    address,
                    pubkey: fruit.pubkey.clone(),
                    fruit_count: 0,
                    difficulty: BigUint::zero(),
                    lower: BigUint::zero(),
                    upper: BigUint::zero(),
                }
            });
            entry.fruit_count += 1;
            entry.difficulty += BigUint::from(credit);
        }
    }

    let seed = crypto::hash(&seed_material);

    // first-seen order keeps the partition stable across nodes
    let mut candidates: Vec<CandidateMember> = order
        .into_iter()
        .filter_map(|addr| tally.remove(&addr))
        .filter(|c| c.fruit_count >= params.election_fruits_threshold)
        .collect();

    let total: BigUint = candidates.iter().map(|c| c.difficulty.clone()).sum();
    if candidates.is_empty() || total.is_zero() {
        // nobody did work beyond the minimum, callers fall back to defaults
        return Ok((seed, Vec::new()));
    }

    assign_ranges(&mut candidates, &total);
    Ok((seed, candidates))
}

/// Splits `[0, 2^256)` into contiguous sub-ranges proportional to each
/// candidate's difficulty share. Ranges partition the space exactly: the
/// first lower bound is 0, each upper bound is the next lower bound, and the
/// final upper bound is `2^256 - 1`.
fn assign_ranges(candidates: &mut [CandidateMember], total: &BigUint) {
    let space = lottery_space();
    let mut accumulated = BigUint::zero();
    for candidate in candidates.iter_mut() {
        candidate.lower = &space * &accumulated / total;
        accumulated += &candidate.difficulty;
        candidate.upper = &space * &accumulated / total;
    }
}
