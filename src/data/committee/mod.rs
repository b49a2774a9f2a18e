// Copyright (C) 2021 Quentin M. Kniep <hello@quentinkniep.com>
// Distributed under terms of the MIT license.

#[cfg(test)]
mod tests;

use serde::{Deserialize, Serialize};

use crate::crypto::{self, hashable::Hashable, CryptoHash};
use crate::data::basics;
use crate::protocol;

/// Membership state of a committee member, mutated only through switch replay.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MemberFlag {
    /// Elected as a backup, not yet seated.
    Unused,
    /// Seated as a working member.
    Used,
    /// Promoted from backup into the working set mid-life.
    Appended,
    /// Evicted from the committee mid-life.
    Removed,
}

/// How a member earned its seat.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MemberRole {
    /// Part of the configured genesis set.
    Fixed,
    /// Won a primary seat in the lottery.
    Worked,
    /// Won a backup seat in the lottery.
    Backup,
}

/// One validator seat. Identity is the public key; the flag may change
/// through switch replay without changing identity.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CommitteeMember {
    /// Mining reward address of the member.
    pub coinbase: basics::Address,
    /// Address the member signs fast blocks with.
    pub committee_address: basics::Address,
    /// Uncompressed secp256k1 public key behind `committee_address`.
    #[serde(with = "serde_bytes")]
    pub pubkey: Vec<u8>,
    pub flag: MemberFlag,
    pub role: MemberRole,
}

impl PartialEq for CommitteeMember {
    fn eq(&self, other: &Self) -> bool {
        self.pubkey == other.pubkey
    }
}

impl Eq for CommitteeMember {}

impl Hashable for CommitteeMember {
    fn to_be_hashed(&self) -> (protocol::HashID, Vec<u8>) {
        (protocol::COMMITTEE, protocol::encode(&self))
    }
}

/// One membership mutation: set `flag` for the member holding `pubkey`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwitchEnter {
    #[serde(with = "serde_bytes")]
    pub pubkey: Vec<u8>,
    pub flag: MemberFlag,
}

/// The membership-mutation record embedded in one fast block.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwitchInfo {
    pub members: Vec<SwitchEnter>,
}

impl Hashable for SwitchInfo {
    fn to_be_hashed(&self) -> (protocol::HashID, Vec<u8>) {
        (protocol::SWITCH_INFO, protocol::encode(&self))
    }
}

/// Transient result of one aggregator+lottery run.
#[derive(Clone, Debug, Default)]
pub struct ElectionCommittee {
    pub members: Vec<CommitteeMember>,
    pub backups: Vec<CommitteeMember>,
}

/// One committee record with its fast-chain validity window and the
/// snail-chain election window that produced it.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Committee {
    /// Monotonically increasing id, 0 = genesis.
    pub id: u64,
    /// First fast number this committee signs.
    pub begin_fast_number: basics::FastNumber,
    /// Last fast number this committee signs; 0 means still open.
    pub end_fast_number: basics::FastNumber,
    /// First snail number of the window that elected it.
    pub first_election_number: basics::SnailNumber,
    /// Last snail number of the window that elected it.
    pub last_election_number: basics::SnailNumber,
    /// Snail height that triggers electing the next committee.
    pub switch_check_number: basics::SnailNumber,
    pub members: Vec<CommitteeMember>,
    pub backup_members: Vec<CommitteeMember>,
    /// Fast numbers at which membership changed, in ascending order.
    pub switches: Vec<basics::FastNumber>,
}

impl Committee {
    /// Whether `fast_number` falls inside this committee's validity window.
    pub fn covers(&self, fast_number: basics::FastNumber) -> bool {
        fast_number >= self.begin_fast_number
            && (self.end_fast_number == 0 || fast_number <= self.end_fast_number)
    }

    /// Returns a new record with the given switch infos replayed onto the
    /// member flags. The receiver is never modified; readers holding the old
    /// record keep a complete, consistent view.
    pub fn replayed(&self, infos: &[SwitchInfo]) -> Committee {
        let mut next = self.clone();
        for info in infos {
            for enter in &info.members {
                for m in next
                    .members
                    .iter_mut()
                    .chain(next.backup_members.iter_mut())
                {
                    if m.pubkey == enter.pubkey {
                        m.flag = enter.flag;
                    }
                }
            }
        }
        next
    }

    /// The member/backup view after accounting for switch flags: appended
    /// backups join the working set, removed members drop out.
    pub fn effective_view(&self) -> (Vec<CommitteeMember>, Vec<CommitteeMember>) {
        let mut members: Vec<CommitteeMember> = self
            .members
            .iter()
            .filter(|m| m.flag != MemberFlag::Removed)
            .cloned()
            .collect();
        members.extend(
            self.backup_members
                .iter()
                .filter(|m| m.flag == MemberFlag::Appended)
                .cloned(),
        );
        let backups = self
            .backup_members
            .iter()
            .filter(|m| m.flag == MemberFlag::Unused)
            .cloned()
            .collect();
        (members, backups)
    }

    pub fn snapshot(&self) -> CommitteeSnapshot {
        let (members, backups) = self.effective_view();
        CommitteeSnapshot {
            id: self.id,
            begin_fast_number: self.begin_fast_number,
            end_fast_number: self.end_fast_number,
            members,
            backups,
        }
    }
}

/// The externally observable state of a committee, carried by events.
#[derive(Clone, Debug)]
pub struct CommitteeSnapshot {
    pub id: u64,
    pub begin_fast_number: basics::FastNumber,
    pub end_fast_number: basics::FastNumber,
    pub members: Vec<CommitteeMember>,
    pub backups: Vec<CommitteeMember>,
}

/// Lifecycle notifications emitted by the election engine.
#[derive(Clone, Debug)]
pub enum ElectionEvent {
    /// The active committee's end boundary is now known.
    Over(CommitteeSnapshot),
    /// The next committee has been elected and stored.
    Switchover(CommitteeSnapshot),
    /// The retiring committee signed its last fast block.
    Stop(CommitteeSnapshot),
    /// A committee became active.
    Start(CommitteeSnapshot),
    /// Membership changed mid-life through switch info.
    Update(CommitteeSnapshot),
}

impl ElectionEvent {
    pub fn snapshot(&self) -> &CommitteeSnapshot {
        match self {
            ElectionEvent::Over(s)
            | ElectionEvent::Switchover(s)
            | ElectionEvent::Stop(s)
            | ElectionEvent::Start(s)
            | ElectionEvent::Update(s) => s,
        }
    }
}

/// A vote on one fast block.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum VoteResult {
    Agree,
    Against,
}

/// One committee member's signature over a fast block.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct VoteSign {
    pub fast_height: basics::FastNumber,
    pub fast_hash: CryptoHash,
    pub result: VoteResult,
    /// 65-byte recoverable signature over `hash_with_no_sign()`.
    #[serde(with = "serde_bytes")]
    pub sign: Vec<u8>,
}

impl VoteSign {
    /// The digest a member signs: everything but the signature itself,
    /// domain-separated from all other hashed objects.
    pub fn hash_with_no_sign(&self) -> CryptoHash {
        let unsigned = VotePreimage {
            fast_height: self.fast_height,
            fast_hash: self.fast_hash.clone(),
            result: self.result,
        };
        crypto::hash_obj(&unsigned)
    }
}

#[derive(Serialize)]
struct VotePreimage {
    fast_height: basics::FastNumber,
    fast_hash: CryptoHash,
    result: VoteResult,
}

impl Hashable for VotePreimage {
    fn to_be_hashed(&self) -> (protocol::HashID, Vec<u8>) {
        (protocol::VOTE, protocol::encode(&self))
    }
}
