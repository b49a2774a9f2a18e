// Copyright (C) 2021 Quentin M. Kniep <hello@quentinkniep.com>
// Distributed under terms of the MIT license.

//! Read-only views of the two chains, provided by the block store.
//!
//! The election engine never walks headers itself; anything it needs must be
//! answerable synchronously from these traits. A missing block means the
//! chain is not synced far enough yet, which callers treat as "not ready",
//! never as fatal.

use serde::{Deserialize, Serialize};

use super::basics::{FastNumber, SnailNumber};
use super::committee::SwitchInfo;
use crate::crypto::CryptoHash;

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct FastHeader {
    pub number: FastNumber,
    pub hash: CryptoHash,
}

/// A fast block, reduced to what the election engine consumes: its header
/// and the membership mutations embedded in it, if any.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct FastBlock {
    pub header: FastHeader,
    pub switch_info: Option<SwitchInfo>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SnailHeader {
    pub number: SnailNumber,
    pub hash: CryptoHash,
}

/// A PoW-mined ballot. Each fruit references one fast block and credits its
/// miner with the work done in excess of the target.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Fruit {
    /// Uncompressed public key of the miner.
    #[serde(with = "serde_bytes")]
    pub pubkey: Vec<u8>,
    /// Reward address named by the miner, which may differ from the
    /// address behind `pubkey`.
    pub coinbase: super::basics::Address,
    /// The fast block this fruit points at.
    pub fast_number: FastNumber,
    pub fast_hash: CryptoHash,
    /// Difficulty the fruit actually achieved.
    pub fruit_difficulty: u64,
    /// Difficulty the fruit was required to achieve.
    pub target_difficulty: u64,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SnailBlock {
    pub header: SnailHeader,
    pub fruits: Vec<Fruit>,
}

/// The primary, transaction-processing chain.
pub trait FastChain: Send + Sync {
    fn current_header(&self) -> FastHeader;
    fn current_block(&self) -> FastBlock;
    fn get_block_by_number(&self, number: FastNumber) -> Option<FastBlock>;
}

/// The secondary proof-of-work chain whose blocks carry fruits.
pub trait SnailChain: Send + Sync {
    fn current_header(&self) -> SnailHeader;
    fn get_block_by_number(&self, number: SnailNumber) -> Option<SnailBlock>;
    fn get_header_by_number(&self, number: SnailNumber) -> Option<SnailHeader>;
    fn get_fruits_at(&self, number: SnailNumber) -> Vec<Fruit>;
    fn get_fruit_by_fast_hash(&self, fast_hash: &CryptoHash) -> Option<Fruit>;
}
