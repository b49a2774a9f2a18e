// Copyright (C) 2021 Quentin M. Kniep <hello@quentinkniep.com>
// Distributed under terms of the MIT license.

use std::sync::Arc;

use super::{candidates, lottery, ElectionError};
use crate::config::ChainParams;
use crate::data::basics::{FastNumber, SnailNumber};
use crate::data::chain::SnailChain;
use crate::data::committee::{Committee, CommitteeMember, ElectionCommittee};

/// Answers "which committee signs fast block N, given the snail chain has
/// reached height M". The engine selects an implementation per query by
/// fork height, so the dual-mode decision lives in exactly one place.
pub trait CommitteeSource: Send + Sync {
    fn committee_at(
        &self,
        fast_number: FastNumber,
        snail_number: SnailNumber,
    ) -> Result<Committee, ElectionError>;
}

/// The fruit-weighted lottery election over snail-chain windows.
///
/// Committees are elected one full period before they take effect: the
/// committee serving while the snail chain is inside period `m` was elected
/// over the blocks of period `m - 1`, whose fruits are therefore already
/// buried a full period deep before their electors sign anything. A miner
/// cannot influence its own near-term eligibility.
pub struct PowElection {
    params: ChainParams,
    genesis_members: Vec<CommitteeMember>,
    snailchain: Arc<dyn SnailChain>,
}

impl PowElection {
    pub fn new(
        params: ChainParams,
        genesis_members: Vec<CommitteeMember>,
        snailchain: Arc<dyn SnailChain>,
    ) -> Self {
        Self {
            params,
            genesis_members,
            snailchain,
        }
    }

    /// The fixed configured committee that signs from the first fast block
    /// until the first election takes effect.
    pub fn genesis_committee(&self) -> Committee {
        Committee {
            id: 0,
            begin_fast_number: 1,
            end_fast_number: 0,
            first_election_number: 0,
            last_election_number: 0,
            switch_check_number: self.params.election_period_number,
            members: self.genesis_members.clone(),
            backup_members: Vec::new(),
            switches: Vec::new(),
        }
    }

    pub fn genesis_members(&self) -> &[CommitteeMember] {
        &self.genesis_members
    }

    /// The fast number up to which the committee elected over
    /// `[begin, end]`'s predecessor keeps signing: the fast block referenced
    /// by the last fruit of the window, plus the configured handover slack.
    ///
    /// Every block of the window must be present; a partially synced window
    /// must not produce a boundary that a fully synced node would contradict.
    pub fn last_fast_number(
        &self,
        begin: SnailNumber,
        end: SnailNumber,
    ) -> Result<FastNumber, ElectionError> {
        let mut last_referenced = None;
        for number in begin..=end {
            let block = self
                .snailchain
                .get_block_by_number(number)
                .ok_or(ElectionError::CommitteeNotFound)?;
            if let Some(fruit) = block.fruits.last() {
                last_referenced = Some(fruit.fast_number);
            }
        }
        last_referenced
            .map(|n| n + self.params.election_switchover_number)
            .ok_or(ElectionError::CommitteeNotFound)
    }

    /// Runs the aggregator and lottery over one window. An empty candidate
    /// set (nobody met the fruit threshold, or the window is all
    /// minimum-difficulty work) falls through the lottery's safety floor to
    /// the genesis set, so this only fails when the window is not synced.
    pub fn elect_committee(
        &self,
        begin: SnailNumber,
        end: SnailNumber,
    ) -> Result<ElectionCommittee, ElectionError> {
        let (seed, candidates) =
            candidates::assemble_candidates(&*self.snailchain, begin, end, &self.params)?;
        Ok(lottery::elect(
            &candidates,
            &seed,
            &self.genesis_members,
            &self.params,
        ))
    }

    fn elected_record(
        &self,
        id: u64,
        begin_election: SnailNumber,
        end_election: SnailNumber,
        begin_fast: FastNumber,
        end_fast: FastNumber,
    ) -> Result<Committee, ElectionError> {
        let elected = self.elect_committee(begin_election, end_election)?;
        Ok(Committee {
            id,
            begin_fast_number: begin_fast,
            end_fast_number: end_fast,
            first_election_number: begin_election,
            last_election_number: end_election,
            switch_check_number: (id + 1) * self.params.election_period_number,
            members: elected.members,
            backup_members: elected.backups,
            switches: Vec::new(),
        })
    }
}

impl CommitteeSource for PowElection {
    fn committee_at(
        &self,
        fast_number: FastNumber,
        snail_number: SnailNumber,
    ) -> Result<Committee, ElectionError> {
        let period = self.params.election_period_number;
        let committee_number = snail_number / period;
        if committee_number == 0 {
            return Ok(self.genesis_committee());
        }

        // the window that elected committee `committee_number`, one period back
        let end_election = committee_number * period;
        let begin_election = end_election - period + 1;
        let last_fast = self.last_fast_number(begin_election, end_election)?;

        if fast_number <= last_fast {
            // still inside the previous committee's validity window
            if committee_number == 1 {
                let mut genesis = self.genesis_committee();
                genesis.end_fast_number = last_fast;
                return Ok(genesis);
            }
            let prev_end = end_election - period;
            let prev_begin = prev_end - period + 1;
            let prev_last_fast = self.last_fast_number(prev_begin, prev_end)?;
            return self.elected_record(
                committee_number - 1,
                prev_begin,
                prev_end,
                prev_last_fast + 1,
                last_fast,
            );
        }

        self.elected_record(
            committee_number,
            begin_election,
            end_election,
            last_fast + 1,
            0,
        )
    }
}

/// The post-fork election, run by the staking system. Only its interface
/// lives here; the engine treats it as an external collaborator.
pub trait StakeBackend: Send + Sync {
    fn committee_at(&self, fast_number: FastNumber) -> Result<Committee, ElectionError>;
}

pub struct StakeElection {
    backend: Arc<dyn StakeBackend>,
}

impl StakeElection {
    pub fn new(backend: Arc<dyn StakeBackend>) -> Self {
        Self { backend }
    }
}

impl CommitteeSource for StakeElection {
    fn committee_at(
        &self,
        fast_number: FastNumber,
        _snail_number: SnailNumber,
    ) -> Result<Committee, ElectionError> {
        self.backend.committee_at(fast_number)
    }
}
