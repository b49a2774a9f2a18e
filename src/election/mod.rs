// Copyright (C) 2021 Quentin M. Kniep <hello@quentinkniep.com>
// Distributed under terms of the MIT license.

//! The committee election engine.
//!
//! One worker thread owns every mutation of the active/next committee and
//! the switch log; it is driven by a bounded queue of chain signals. All
//! other threads only snapshot state under a read lock or enqueue signals,
//! so verification never blocks on election progress.

pub mod candidates;
pub mod lottery;
pub mod source;
pub mod store;
pub mod verifier;


use std::sync::mpsc::{Receiver, SyncSender, TrySendError};
use std::sync::{mpsc, Arc, Mutex, RwLock};
use std::thread::{self, JoinHandle};

use thiserror::Error;
use tracing::{debug, error, info, warn};

pub use candidates::CandidateMember;
pub use source::{CommitteeSource, PowElection, StakeBackend, StakeElection};
pub use store::SwitchStore;
pub use verifier::QuorumOutcome;

use crate::config::ChainParams;
use crate::crypto::CryptoHash;
use crate::data::basics::{FastNumber, SnailNumber};
use crate::data::chain::{FastChain, SnailChain};
use crate::data::committee::{
    Committee, CommitteeMember, CommitteeSnapshot, ElectionEvent, MemberFlag, SwitchInfo,
    VoteSign,
};

/// Depth of the engine's signal queue. Chain head events are coalescable
/// (only the latest height matters), so a modest queue is enough.
const SIGNAL_QUEUE_DEPTH: usize = 256;

/// Default depth of a subscriber's event queue.
const EVENT_QUEUE_DEPTH: usize = 64;

#[derive(Debug, Error)]
pub enum ElectionError {
    /// The chain is not synced far enough to determine the committee.
    /// Retryable, never fatal.
    #[error("committee not resolvable yet for the requested height")]
    CommitteeNotFound,
    #[error("signer is not a committee member")]
    InvalidMember,
    /// Embedded switch info disagrees with the independently replayed
    /// state. Consensus-fatal for the block carrying it.
    #[error("switch info does not match the replayed committee state")]
    InvalidSwitch,
    #[error("invalid committee signature")]
    InvalidSign,
    #[error("signature pinned to fast height {got_height}, expected {want_height}")]
    SignHashMismatch {
        want_height: FastNumber,
        got_height: FastNumber,
    },
    #[error("duplicate signature from one member")]
    RepeatSign,
}

/// Signals consumed by the engine worker.
#[derive(Clone, Debug)]
pub enum EngineSignal {
    /// The snail chain reached a new head.
    SnailHead(SnailNumber),
    /// The fast chain finalized a block; retire the committee whose end
    /// boundary it crossed.
    Retire(FastNumber),
    /// A fast block carried membership mutations.
    SwitchInfo {
        number: FastNumber,
        info: SwitchInfo,
    },
    Shutdown,
}

/// Where the engine stands in the committee handover cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SwitchoverPhase {
    /// No committee resolved yet.
    Idle,
    /// The next committee has been elected.
    Prepared,
    /// The next committee has been announced to subscribers.
    Announced,
    /// The active committee is signing.
    Active,
    /// The active committee crossed its end boundary and is handing over.
    Retiring,
}

pub struct Election {
    params: ChainParams,
    pow: PowElection,
    stake: Option<StakeElection>,

    committee: RwLock<Option<Arc<Committee>>>,
    next_committee: RwLock<Option<Arc<Committee>>>,
    /// Superseded committees, kept queryable by id.
    retired: RwLock<Vec<Arc<Committee>>>,
    phase: RwLock<SwitchoverPhase>,

    subscribers: Mutex<Vec<SyncSender<ElectionEvent>>>,
    store: SwitchStore,

    fastchain: Arc<dyn FastChain>,
    snailchain: Arc<dyn SnailChain>,

    signal_tx: SyncSender<EngineSignal>,
    signal_rx: Mutex<Option<Receiver<EngineSignal>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl Election {
    /// Builds a stopped engine. `single_node` truncates the genesis
    /// committee to one member for standalone deployments; it is fixed for
    /// the engine's lifetime.
    pub fn new(
        params: ChainParams,
        mut genesis_members: Vec<CommitteeMember>,
        single_node: bool,
        fastchain: Arc<dyn FastChain>,
        snailchain: Arc<dyn SnailChain>,
        stake_backend: Option<Arc<dyn StakeBackend>>,
        db: &sled::Db,
    ) -> sled::Result<Self> {
        if single_node {
            genesis_members.truncate(1);
        }
        let (signal_tx, signal_rx) = mpsc::sync_channel(SIGNAL_QUEUE_DEPTH);
        Ok(Self {
            pow: PowElection::new(params.clone(), genesis_members, Arc::clone(&snailchain)),
            stake: stake_backend.map(StakeElection::new),
            params,
            committee: RwLock::new(None),
            next_committee: RwLock::new(None),
            retired: RwLock::new(Vec::new()),
            phase: RwLock::new(SwitchoverPhase::Idle),
            subscribers: Mutex::new(Vec::new()),
            store: SwitchStore::open(db)?,
            fastchain,
            snailchain,
            signal_tx,
            signal_rx: Mutex::new(Some(signal_rx)),
            worker: Mutex::new(None),
        })
    }

    /// Resolves the committee for the current chain heads and spawns the
    /// worker. Idempotent; a second call is a no-op.
    pub fn start(self: &Arc<Self>) {
        let rx = match self.signal_rx.lock().unwrap().take() {
            Some(rx) => rx,
            None => return,
        };
        self.init_active();

        let engine = Arc::clone(self);
        match thread::Builder::new()
            .name("election".to_string())
            .spawn(move || engine.run(rx))
        {
            Ok(handle) => *self.worker.lock().unwrap() = Some(handle),
            Err(err) => error!("failed to spawn election worker: {}", err),
        }
    }

    /// Stops feeding the worker and waits for it to drain. In-flight reads
    /// are unaffected; snapshots are copies.
    pub fn stop(&self) {
        let _ = self.signal_tx.send(EngineSignal::Shutdown);
        if let Some(handle) = self.worker.lock().unwrap().take() {
            if handle.join().is_err() {
                error!("election worker panicked");
            }
        }
    }

    /// Handle for feeding chain signals into the engine queue.
    pub fn sender(&self) -> SyncSender<EngineSignal> {
        self.signal_tx.clone()
    }

    /// Registers a lifecycle-event subscriber with the default queue depth.
    /// Delivery is best effort: a slow subscriber loses events and must
    /// catch up through `members_at`.
    pub fn subscribe(&self) -> Receiver<ElectionEvent> {
        self.subscribe_with_depth(EVENT_QUEUE_DEPTH)
    }

    pub fn subscribe_with_depth(&self, depth: usize) -> Receiver<ElectionEvent> {
        let (tx, rx) = mpsc::sync_channel(depth);
        self.subscribers.lock().unwrap().push(tx);
        rx
    }

    pub fn phase(&self) -> SwitchoverPhase {
        *self.phase.read().unwrap()
    }

    /// The effective member set signing fast block `fast_number`, with all
    /// recorded switches up to that height replayed.
    pub fn members_at(&self, fast_number: FastNumber) -> Result<Vec<CommitteeMember>, ElectionError> {
        let record = self.committee_record_for(fast_number)?;
        let replayed = self.replay_switches(&record, fast_number)?;
        Ok(replayed.effective_view().0)
    }

    /// Checks an agreeing quorum of signatures for one fast block. See
    /// `verifier::check_quorum` for the partial-failure contract.
    pub fn verify_quorum(
        &self,
        signs: &[VoteSign],
        fast_height: FastNumber,
        fast_hash: &CryptoHash,
    ) -> Result<QuorumOutcome, ElectionError> {
        if signs.is_empty() {
            return Err(ElectionError::InvalidSign);
        }
        let members = self.members_at(fast_height)?;
        verifier::check_quorum(signs, &members, fast_height, fast_hash)
    }

    /// Validates a block's embedded switch info against the replayed state:
    /// every entry must name a known member and describe a legal flag
    /// transition. A mismatch is consensus-fatal for the block.
    pub fn verify_switch_info(
        &self,
        fast_number: FastNumber,
        info: &SwitchInfo,
    ) -> Result<(), ElectionError> {
        let record = self.committee_record_for(fast_number)?;
        let current = self.replay_switches(&record, fast_number)?;

        for enter in &info.members {
            let member = current.members.iter().find(|m| m.pubkey == enter.pubkey);
            let backup = current
                .backup_members
                .iter()
                .find(|m| m.pubkey == enter.pubkey);
            let legal = match (member, backup, enter.flag) {
                // a working member can only be evicted
                (Some(m), _, MemberFlag::Removed) => m.flag != MemberFlag::Removed,
                // an unseated backup can be promoted or evicted
                (None, Some(b), MemberFlag::Appended) => b.flag == MemberFlag::Unused,
                (None, Some(b), MemberFlag::Removed) => b.flag != MemberFlag::Removed,
                _ => false,
            };
            if !legal {
                return Err(ElectionError::InvalidSwitch);
            }
        }
        Ok(())
    }

    /// Looks up a committee by id among the active, prepared and superseded
    /// records. Superseded committees are never deleted.
    pub fn committee_info(&self, id: u64) -> Option<CommitteeSnapshot> {
        let record = self.find_by_id(id)?;
        Some(self.event_snapshot(&record))
    }

    fn find_by_id(&self, id: u64) -> Option<Arc<Committee>> {
        if let Some(c) = self.committee.read().unwrap().as_ref() {
            if c.id == id {
                return Some(Arc::clone(c));
            }
        }
        if let Some(c) = self.next_committee.read().unwrap().as_ref() {
            if c.id == id {
                return Some(Arc::clone(c));
            }
        }
        self.retired
            .read()
            .unwrap()
            .iter()
            .rev()
            .find(|c| c.id == id)
            .map(Arc::clone)
    }

    fn active(&self) -> Option<Arc<Committee>> {
        self.committee.read().unwrap().as_ref().map(Arc::clone)
    }

    fn source_for(&self, fast_number: FastNumber) -> &dyn CommitteeSource {
        if let (Some(fork), Some(stake)) = (self.params.stake_fork_height, self.stake.as_ref()) {
            if fast_number >= fork {
                return stake;
            }
        }
        &self.pow
    }

    /// The committee record covering `fast_number`: the in-memory state if
    /// it covers the height, otherwise re-derived from chain history with
    /// its persisted switch log attached.
    fn committee_record_for(&self, fast_number: FastNumber) -> Result<Arc<Committee>, ElectionError> {
        if let Some(c) = self.active() {
            if c.covers(fast_number) {
                return Ok(c);
            }
        }
        if let Some(c) = self.next_committee.read().unwrap().as_ref() {
            if c.covers(fast_number) {
                return Ok(Arc::clone(c));
            }
        }
        if let Some(c) = self
            .retired
            .read()
            .unwrap()
            .iter()
            .rev()
            .find(|c| c.covers(fast_number))
        {
            return Ok(Arc::clone(c));
        }

        let snail_number = self.snailchain.current_header().number;
        let mut resolved = self
            .source_for(fast_number)
            .committee_at(fast_number, snail_number)?;
        resolved.switches = self.store.read(resolved.id);
        Ok(Arc::new(resolved))
    }

    /// Replays the committee's recorded switches up to `upto`, reading each
    /// switch block's embedded info from the fast chain.
    fn replay_switches(
        &self,
        committee: &Committee,
        upto: FastNumber,
    ) -> Result<Committee, ElectionError> {
        let mut infos = Vec::new();
        for &number in committee.switches.iter().filter(|&&n| n <= upto) {
            let block = self
                .fastchain
                .get_block_by_number(number)
                .ok_or(ElectionError::CommitteeNotFound)?;
            match block.switch_info {
                Some(info) => infos.push(info),
                None => warn!(
                    "recorded switch at fast {} carries no switch info",
                    number
                ),
            }
        }
        Ok(committee.replayed(&infos))
    }

    fn event_snapshot(&self, committee: &Committee) -> CommitteeSnapshot {
        match self.replay_switches(committee, u64::MAX) {
            Ok(replayed) => replayed.snapshot(),
            Err(_) => committee.snapshot(),
        }
    }

    fn set_phase(&self, phase: SwitchoverPhase) {
        *self.phase.write().unwrap() = phase;
    }

    fn publish(&self, event: ElectionEvent) {
        let mut subscribers = self.subscribers.lock().unwrap();
        subscribers.retain(|tx| match tx.try_send(event.clone()) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                warn!("slow election subscriber, dropping event");
                true
            }
            Err(TrySendError::Disconnected(_)) => false,
        });
    }

    /// Resolves the committee for the current chain heads, reloading its
    /// persisted switch log, and announces it.
    fn init_active(&self) {
        let fast_number = self.fastchain.current_header().number;
        let snail_number = self.snailchain.current_header().number;

        let mut resolved = match self
            .source_for(fast_number)
            .committee_at(fast_number, snail_number)
        {
            Ok(c) => c,
            Err(err) => {
                warn!("election engine starting before chain sync: {}", err);
                return;
            }
        };
        resolved.switches = self.store.read(resolved.id);

        info!(
            "starting with committee {} (fast {} onwards, {} members)",
            resolved.id,
            resolved.begin_fast_number,
            resolved.members.len()
        );
        let snapshot = self.event_snapshot(&resolved);
        *self.committee.write().unwrap() = Some(Arc::new(resolved));
        self.set_phase(SwitchoverPhase::Active);
        self.publish(ElectionEvent::Start(snapshot));
    }

    fn run(&self, rx: Receiver<EngineSignal>) {
        loop {
            match rx.recv() {
                Ok(EngineSignal::SnailHead(number)) => self.on_snail_head(number),
                Ok(EngineSignal::Retire(number)) => self.on_retire(number),
                Ok(EngineSignal::SwitchInfo { number, info }) => {
                    self.on_switch_info(number, info)
                }
                Ok(EngineSignal::Shutdown) | Err(_) => break,
            }
        }
        debug!("election worker stopped");
    }

    /// Snail head progressed. Once the active committee's switch check
    /// height is buried, its end boundary is fixed and the next committee
    /// is elected from the window that just closed.
    fn on_snail_head(&self, snail_number: SnailNumber) {
        let active = match self.active() {
            Some(c) => c,
            None => {
                self.init_active();
                return;
            }
        };
        if snail_number < active.switch_check_number {
            return;
        }
        if let Some(next) = self.next_committee.read().unwrap().as_ref() {
            // duplicate trigger from a fork or replayed head event
            debug!("committee {} already prepared, ignoring trigger", next.id);
            return;
        }

        let period = self.params.election_period_number;
        let end_election = active.switch_check_number;
        let begin_election = end_election - period + 1;

        let last_fast = match self.pow.last_fast_number(begin_election, end_election) {
            Ok(n) => n,
            Err(err) => {
                warn!("election window [{}, {}] not resolvable yet: {}", begin_election, end_election, err);
                return;
            }
        };

        let active = if active.end_fast_number == 0 {
            let mut closed = (*active).clone();
            closed.end_fast_number = last_fast;
            let closed = Arc::new(closed);
            *self.committee.write().unwrap() = Some(Arc::clone(&closed));
            info!("committee {} ends at fast {}", closed.id, last_fast);
            self.publish(ElectionEvent::Over(self.event_snapshot(&closed)));
            closed
        } else {
            active
        };

        if let Some(fork) = self.params.stake_fork_height {
            if last_fast + 1 >= fork {
                info!("stake election supersedes the lottery at fast {}", fork);
                return;
            }
        }

        let next_id = active.id + 1;
        let elected = match self.pow.elect_committee(begin_election, end_election) {
            Ok(e) => e,
            Err(err) => {
                warn!("cannot elect committee {} yet: {}", next_id, err);
                return;
            }
        };
        let next = Committee {
            id: next_id,
            begin_fast_number: last_fast + 1,
            end_fast_number: 0,
            first_election_number: begin_election,
            last_election_number: end_election,
            switch_check_number: end_election + period,
            members: elected.members,
            backup_members: elected.backups,
            switches: Vec::new(),
        };
        info!(
            "elected committee {} over snails [{}, {}], begins at fast {}",
            next.id, begin_election, end_election, next.begin_fast_number
        );
        let snapshot = next.snapshot();
        *self.next_committee.write().unwrap() = Some(Arc::new(next));
        self.set_phase(SwitchoverPhase::Prepared);
        self.publish(ElectionEvent::Switchover(snapshot));
        self.set_phase(SwitchoverPhase::Announced);
    }

    /// Fast chain reached the active committee's end boundary: retire it
    /// and seat the prepared committee atomically.
    fn on_retire(&self, fast_number: FastNumber) {
        let active = match self.active() {
            Some(c) => c,
            None => return,
        };
        if active.end_fast_number == 0 || fast_number < active.end_fast_number {
            return;
        }
        let next = match self.next_committee.write().unwrap().take() {
            Some(n) => n,
            None => {
                warn!(
                    "committee {} crossed its end at fast {} with no successor prepared",
                    active.id, fast_number
                );
                return;
            }
        };

        self.set_phase(SwitchoverPhase::Retiring);
        self.publish(ElectionEvent::Stop(self.event_snapshot(&active)));

        info!("committee {} takes over at fast {}", next.id, next.begin_fast_number);
        self.retired.write().unwrap().push(active);
        let snapshot = self.event_snapshot(&next);
        *self.committee.write().unwrap() = Some(next);
        self.set_phase(SwitchoverPhase::Active);
        self.publish(ElectionEvent::Start(snapshot));
    }

    /// A fast block carried membership mutations for the active committee.
    fn on_switch_info(&self, fast_number: FastNumber, info: SwitchInfo) {
        let active = match self.active() {
            Some(c) => c,
            None => return,
        };
        if !active.covers(fast_number) {
            warn!(
                "switch info at fast {} outside committee {} window, ignored",
                fast_number, active.id
            );
            return;
        }

        let mut updated = (*active).clone();
        if fast_number == active.begin_fast_number {
            // a restart or rewind to the committee's first block: whatever
            // log exists is stale
            info!("rewind to committee {} start, clearing switch log", active.id);
            updated.switches.clear();
        } else {
            updated.switches.push(fast_number);
        }
        if let Err(err) = self.store.write(updated.id, &updated.switches) {
            warn!(
                "switch log for committee {} not persisted: {}",
                updated.id, err
            );
        }

        // the event must reflect the new effective view, including `info`
        // itself even when its block is not yet queryable from the store
        let snapshot = match self.replay_switches(&updated, u64::MAX) {
            Ok(replayed) => replayed.snapshot(),
            Err(_) => updated.replayed(std::slice::from_ref(&info)).snapshot(),
        };
        *self.committee.write().unwrap() = Some(Arc::new(updated));
        self.publish(ElectionEvent::Update(snapshot));
    }
}
