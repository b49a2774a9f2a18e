// Copyright (C) 2021 Quentin M. Kniep <hello@quentinkniep.com>
// Distributed under terms of the MIT license.

use criterion::Criterion;
use k256::ecdsa::SigningKey;
use rand::rngs::OsRng;

use fastchain::crypto;
use fastchain::data::basics::Address;
use fastchain::data::committee::{CommitteeMember, MemberFlag, MemberRole, VoteResult, VoteSign};
use fastchain::election::verifier;

fn committee_with_keys(size: usize) -> (Vec<SigningKey>, Vec<CommitteeMember>) {
    let mut secrets = Vec::new();
    let mut members = Vec::new();
    for _ in 0..size {
        let secret = SigningKey::random(&mut OsRng);
        let pubkey = secret
            .verifying_key()
            .to_encoded_point(false)
            .as_bytes()
            .to_vec();
        let address = Address::from_pubkey(&pubkey).unwrap();
        secrets.push(secret);
        members.push(CommitteeMember {
            coinbase: address,
            committee_address: address,
            pubkey,
            flag: MemberFlag::Used,
            role: MemberRole::Worked,
        });
    }
    (secrets, members)
}

pub fn quorum_check(c: &mut Criterion) {
    let (secrets, members) = committee_with_keys(20);
    let fast_hash = crypto::hash(b"fast block");
    let signs: Vec<VoteSign> = secrets
        .iter()
        .take(14)
        .map(|secret| {
            let mut sign = VoteSign {
                fast_height: 1,
                fast_hash: fast_hash.clone(),
                result: VoteResult::Agree,
                sign: Vec::new(),
            };
            sign.sign = crypto::sign_digest(secret, &sign.hash_with_no_sign()).unwrap();
            sign
        })
        .collect();

    c.bench_function("election::verifier::check_quorum() 14 of 20", |b| {
        b.iter(|| verifier::check_quorum(&signs, &members, 1, &fast_hash))
    });
}
