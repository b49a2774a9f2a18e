// Copyright (C) 2021 Quentin M. Kniep <hello@quentinkniep.com>
// Distributed under terms of the MIT license.

use std::collections::HashSet;

use num::bigint::BigUint;
use tracing::debug;

use super::candidates::CandidateMember;
use crate::config::ChainParams;
use crate::crypto::{self, CryptoHash};
use crate::data::basics::Address;
use crate::data::committee::{CommitteeMember, ElectionCommittee, MemberFlag, MemberRole};

/// Draws a committee from range-weighted candidates. Pure: identical
/// `(candidates, seed, defaults)` always produce the identical ordered list.
///
/// Each round hashes the seed with the round counter and looks up the
/// candidate whose range contains the draw. A draw that lands on a default
/// address or an already-selected candidate yields nothing for that round;
/// the round counter still advances, which bounds selection cost. Whether
/// continuing to the next round (rather than re-drawing) biases selection is
/// deliberately left as observed behavior.
pub fn elect(
    candidates: &[CandidateMember],
    seed: &CryptoHash,
    defaults: &[CommitteeMember],
    params: &ChainParams,
) -> ElectionCommittee {
    let default_addrs: HashSet<Address> = defaults.iter().map(|m| m.coinbase).collect();

    let mut selected: Vec<&CandidateMember> = Vec::new();
    if !candidates.is_empty() && candidates.len() <= params.proposal_committee_number {
        // pool already fits the proposal set, no lottery needed
        selected = candidates.iter().collect();
    } else {
        let mut taken: HashSet<Address> = HashSet::new();
        for round in 1..=params.maximum_committee_number {
            let draw = draw_number(seed, round);
            let hit = candidates
                .iter()
                .find(|c| draw >= c.lower && draw < c.upper);
            let candidate = match hit {
                Some(c) => c,
                None => continue,
            };
            if default_addrs.contains(&candidate.coinbase) || taken.contains(&candidate.address) {
                continue;
            }
            taken.insert(candidate.address);
            selected.push(candidate);
        }
    }

    let mut committee = ElectionCommittee::default();
    for (i, candidate) in selected.iter().enumerate() {
        let (flag, role) = if i < params.proposal_committee_number {
            (MemberFlag::Used, MemberRole::Worked)
        } else {
            (MemberFlag::Unused, MemberRole::Backup)
        };
        let member = CommitteeMember {
            coinbase: candidate.coinbase,
            committee_address: candidate.address,
            pubkey: candidate.pubkey.clone(),
            flag,
            role,
        };
        if i < params.proposal_committee_number {
            committee.members.push(member);
        } else {
            committee.backups.push(member);
        }
    }

    // PBFT needs 3f+1 members, fall back to the genesis set below the floor
    if committee.members.len() < params.minimum_committee_number {
        debug!(
            "elected only {} members, seating the default committee",
            committee.members.len()
        );
        committee.members.extend(defaults.iter().cloned());
    }

    committee
}

fn draw_number(seed: &CryptoHash, round: u64) -> BigUint {
    let material = [&seed.0[..], &round.to_be_bytes()[..]].concat();
    BigUint::from_bytes_be(&crypto::hash(&material).0)
}

#[cfg(test)]
mod tests {
    use super::*;

    use num::{One, Zero};

    use super::super::candidates::lottery_space;

    fn candidate(tag: u8, lower: BigUint, upper: BigUint) -> CandidateMember {
        let mut pubkey = vec![4u8; crate::crypto::PUBKEY_LEN];
        pubkey[1] = tag;
        CandidateMember {
            coinbase: Address([tag; crate::data::basics::ADDRESS_LEN]),
            address: Address([tag; crate::data::basics::ADDRESS_LEN]),
            pubkey,
            fruit_count: 10,
            difficulty: BigUint::one(),
            lower,
            upper,
        }
    }

    fn default_member(tag: u8) -> CommitteeMember {
        let mut pubkey = vec![4u8; crate::crypto::PUBKEY_LEN];
        pubkey[1] = tag;
        CommitteeMember {
            coinbase: Address([tag; crate::data::basics::ADDRESS_LEN]),
            committee_address: Address([tag; crate::data::basics::ADDRESS_LEN]),
            pubkey,
            flag: MemberFlag::Used,
            role: MemberRole::Fixed,
        }
    }

    fn equal_split(n: u8) -> Vec<CandidateMember> {
        let space = lottery_space();
        let total = BigUint::from(n);
        let mut out = Vec::new();
        let mut acc = BigUint::zero();
        for tag in 0..n {
            let lower = &space * &acc / &total;
            acc += BigUint::one();
            let upper = &space * &acc / &total;
            out.push(candidate(tag, lower, upper));
        }
        out
    }

    #[test]
    fn elect_is_deterministic() {
        let candidates = equal_split(30);
        let seed = crate::crypto::hash(b"window seed");
        let defaults = vec![default_member(200)];
        let params = ChainParams::testing();

        let a = elect(&candidates, &seed, &defaults, &params);
        let b = elect(&candidates, &seed, &defaults, &params);
        assert_eq!(a.members, b.members);
        assert_eq!(a.backups, b.backups);
    }

    #[test]
    fn no_duplicate_winners() {
        let candidates = equal_split(30);
        let seed = crate::crypto::hash(b"another seed");
        let params = ChainParams::testing();

        let result = elect(&candidates, &seed, &[], &params);
        let mut all = result.members.clone();
        all.extend(result.backups.clone());
        assert!(all.len() as u64 <= params.maximum_committee_number);
        for i in 0..all.len() {
            for j in i + 1..all.len() {
                assert_ne!(all[i], all[j], "candidate selected twice");
            }
        }
    }

    #[test]
    fn small_pool_skips_the_lottery() {
        let candidates = equal_split(3);
        let seed = crate::crypto::hash(b"seed");
        let params = ChainParams::testing();
        assert!(candidates.len() <= params.proposal_committee_number);

        let result = elect(&candidates, &seed, &[], &params);
        // whole pool taken in candidate order, then padded by the safety floor
        let chosen: Vec<Address> = result.members[..3].iter().map(|m| m.committee_address).collect();
        assert_eq!(
            chosen,
            candidates.iter().map(|c| c.address).collect::<Vec<_>>()
        );
    }

    #[test]
    fn safety_floor_seats_defaults() {
        let defaults: Vec<_> = (100..104).map(default_member).collect();
        let seed = crate::crypto::hash(b"seed");
        let params = ChainParams::testing();

        // zero candidates: the default set is the committee
        let result = elect(&[], &seed, &defaults, &params);
        assert_eq!(result.members, defaults);
        assert!(result.members.len() >= params.minimum_committee_number);

        // a too-small pool still gets the full default set appended
        let candidates = equal_split(2);
        let result = elect(&candidates, &seed, &defaults, &params);
        assert!(result.members.len() >= params.minimum_committee_number);
        for d in &defaults {
            assert!(result.members.contains(d));
        }
    }

    #[test]
    fn default_addresses_are_never_reselected() {
        let candidates = equal_split(30);
        // mark ten candidates as defaults by coinbase
        let defaults: Vec<_> = (0..10).map(default_member).collect();
        let seed = crate::crypto::hash(b"seed");
        let mut params = ChainParams::testing();
        params.minimum_committee_number = 0;

        let result = elect(&candidates, &seed, &defaults, &params);
        for m in result.members.iter().chain(result.backups.iter()) {
            assert!(!defaults.contains(m), "default address won the lottery");
        }
    }
}
