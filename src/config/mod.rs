// Copyright (C) 2021 Quentin M. Kniep <hello@quentinkniep.com>
// Distributed under terms of the MIT license.


use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};

/// Specifies the parameters of the fruit-weighted committee election.
///
/// These vary per deployed network, never at runtime.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChainParams {
    /// Minimum number of fruits a miner must have mined inside one election
    /// window before it is considered a candidate at all.
    pub election_fruits_threshold: u64,

    /// Number of lottery rounds drawn per election, and therefore the upper
    /// bound on elected members (primary plus backup).
    pub maximum_committee_number: u64,

    /// Number of lottery winners seated as primary (proposing/signing) members;
    /// the rest become backups.
    pub proposal_committee_number: usize,

    /// Hard safety floor on the primary member count (PBFT needs `3f+1`).
    /// Elections yielding fewer fall back to the genesis committee.
    pub minimum_committee_number: usize,

    /// Length of one election period, in snail blocks.
    pub election_period_number: u64,

    /// Handover slack added to the last fast number referenced by an election
    /// window, giving the retiring committee room to finish signing.
    pub election_switchover_number: u64,

    /// Fast-chain height at which the stake-based election supersedes the
    /// fruit-weighted one. `None` means the fork is not scheduled.
    pub stake_fork_height: Option<u64>,
}

impl Default for ChainParams {
    fn default() -> Self {
        Self {
            election_fruits_threshold: 100,
            maximum_committee_number: 50,
            proposal_committee_number: 20,
            minimum_committee_number: 4,
            election_period_number: 180,
            election_switchover_number: 9600,
            stake_fork_height: None,
        }
    }
}

impl ChainParams {
    /// Parameters scaled down for unit tests: one-block fruit threshold,
    /// ten-block periods, no handover slack.
    pub fn testing() -> Self {
        Self {
            election_fruits_threshold: 2,
            maximum_committee_number: 10,
            proposal_committee_number: 4,
            minimum_committee_number: 4,
            election_period_number: 10,
            election_switchover_number: 2,
            stake_fork_height: None,
        }
    }
}

lazy_static! {
    /// The mainnet parameter set.
    pub static ref MAINNET_PARAMS: ChainParams = ChainParams::default();
}
