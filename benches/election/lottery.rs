// Copyright (C) 2021 Quentin M. Kniep <hello@quentinkniep.com>
// Distributed under terms of the MIT license.

use criterion::Criterion;
use num::bigint::BigUint;
use rand::{thread_rng, RngCore};

use fastchain::config::ChainParams;
use fastchain::crypto;
use fastchain::data::basics::Address;
use fastchain::data::committee::CommitteeMember;
use fastchain::election::candidates::{lottery_space, CandidateMember};
use fastchain::election::lottery;

/// Builds `n` candidates with equal difficulty shares of the lottery space.
fn equal_candidates(n: usize) -> Vec<CandidateMember> {
    let space = lottery_space();
    (0..n)
        .map(|i| {
            let digest = crypto::hash(&(i as u64).to_be_bytes());
            let mut addr = [0; 20];
            addr.copy_from_slice(&digest.0[12..]);
            CandidateMember {
                coinbase: Address(addr),
                address: Address(addr),
                pubkey: digest.0.to_vec(),
                fruit_count: 10,
                difficulty: BigUint::from(1000u64),
                lower: &space * i / n,
                upper: &space * (i + 1) / n,
            }
        })
        .collect()
}

fn bench_elect(c: &mut Criterion, name: &str, pool: usize) {
    let mut rng = thread_rng();
    let candidates = equal_candidates(pool);
    let defaults: Vec<CommitteeMember> = Vec::new();
    let params = ChainParams::default();

    c.bench_function(name, |b| {
        b.iter_with_setup(
            || {
                let mut seed = [0; 32];
                rng.fill_bytes(&mut seed);
                crypto::CryptoHash(seed)
            },
            |seed| lottery::elect(&candidates, &seed, &defaults, &params),
        );
    });
}

pub fn lottery_elect(c: &mut Criterion) {
    bench_elect(c, "election::lottery::elect() 200 candidates", 200);
}

pub fn lottery_elect_large(c: &mut Criterion) {
    bench_elect(c, "election::lottery::elect() 2000 candidates", 2000);
}
