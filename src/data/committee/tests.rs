// Copyright (C) 2021 Quentin M. Kniep <hello@quentinkniep.com>
// Distributed under terms of the MIT license.

use super::*;

fn member(tag: u8, flag: MemberFlag, role: MemberRole) -> CommitteeMember {
    let mut pubkey = vec![4u8; crate::crypto::PUBKEY_LEN];
    pubkey[1] = tag;
    CommitteeMember {
        coinbase: basics::Address([tag; basics::ADDRESS_LEN]),
        committee_address: basics::Address([tag; basics::ADDRESS_LEN]),
        pubkey,
        flag,
        role,
    }
}

fn committee_with(members: Vec<CommitteeMember>, backups: Vec<CommitteeMember>) -> Committee {
    Committee {
        id: 1,
        begin_fast_number: 101,
        end_fast_number: 0,
        first_election_number: 1,
        last_election_number: 10,
        switch_check_number: 20,
        members,
        backup_members: backups,
        switches: Vec::new(),
    }
}

#[test]
fn equality_is_by_pubkey() {
    let a = member(1, MemberFlag::Used, MemberRole::Worked);
    let mut b = a.clone();
    b.flag = MemberFlag::Removed;
    b.coinbase = basics::Address([9; basics::ADDRESS_LEN]);
    assert_eq!(a, b);

    let c = member(2, MemberFlag::Used, MemberRole::Worked);
    assert_ne!(a, c);
}

#[test]
fn covers_open_and_closed_windows() {
    let mut c = committee_with(vec![member(1, MemberFlag::Used, MemberRole::Worked)], vec![]);
    assert!(!c.covers(100));
    assert!(c.covers(101));
    assert!(c.covers(1_000_000));

    c.end_fast_number = 200;
    assert!(c.covers(200));
    assert!(!c.covers(201));
}

#[test]
fn replay_moves_backup_into_working_set() {
    let worked = member(1, MemberFlag::Used, MemberRole::Worked);
    let backup = member(2, MemberFlag::Unused, MemberRole::Backup);
    let c = committee_with(vec![worked.clone()], vec![backup.clone()]);

    let info = SwitchInfo {
        members: vec![
            SwitchEnter {
                pubkey: worked.pubkey.clone(),
                flag: MemberFlag::Removed,
            },
            SwitchEnter {
                pubkey: backup.pubkey.clone(),
                flag: MemberFlag::Appended,
            },
        ],
    };
    let replayed = c.replayed(&[info]);
    let (members, backups) = replayed.effective_view();

    assert_eq!(members, vec![backup]);
    assert!(backups.is_empty());

    // the original record is untouched
    assert_eq!(c.members[0].flag, MemberFlag::Used);
}

#[test]
fn replay_is_idempotent() {
    let worked = member(1, MemberFlag::Used, MemberRole::Worked);
    let backup = member(2, MemberFlag::Unused, MemberRole::Backup);
    let c = committee_with(vec![worked.clone()], vec![backup.clone()]);

    let infos = vec![SwitchInfo {
        members: vec![SwitchEnter {
            pubkey: backup.pubkey.clone(),
            flag: MemberFlag::Appended,
        }],
    }];

    let once = c.replayed(&infos);
    let twice = once.replayed(&infos);
    assert_eq!(once.effective_view(), twice.effective_view());
}

#[test]
fn replay_of_unknown_pubkey_is_ignored() {
    let c = committee_with(vec![member(1, MemberFlag::Used, MemberRole::Worked)], vec![]);
    let info = SwitchInfo {
        members: vec![SwitchEnter {
            pubkey: vec![0xff; crate::crypto::PUBKEY_LEN],
            flag: MemberFlag::Removed,
        }],
    };
    let (members, _) = c.replayed(&[info]).effective_view();
    assert_eq!(members.len(), 1);
}

#[test]
fn snapshot_reflects_effective_view() {
    let worked = member(1, MemberFlag::Used, MemberRole::Worked);
    let removed = member(2, MemberFlag::Removed, MemberRole::Worked);
    let c = committee_with(vec![worked.clone(), removed], vec![]);

    let snap = c.snapshot();
    assert_eq!(snap.id, c.id);
    assert_eq!(snap.members, vec![worked]);
}

#[test]
fn vote_preimage_excludes_signature() {
    let mut sign = VoteSign {
        fast_height: 7,
        fast_hash: crate::crypto::hash(b"block"),
        result: VoteResult::Agree,
        sign: vec![],
    };
    let h1 = sign.hash_with_no_sign();
    sign.sign = vec![1, 2, 3];
    assert_eq!(sign.hash_with_no_sign(), h1);

    sign.result = VoteResult::Against;
    assert_ne!(sign.hash_with_no_sign(), h1);
}
