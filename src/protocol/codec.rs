// Copyright (C) 2021 Quentin M. Kniep <hello@quentinkniep.com>
// Distributed under terms of the MIT license.

use serde::{Deserialize, Serialize};

pub fn encode(x: &impl Serialize) -> Vec<u8> {
    rmp_serde::to_vec(x).unwrap()
}

pub fn decode<'a, T: Deserialize<'a>>(bytes: &'a [u8]) -> Result<T, rmp_serde::decode::Error> {
    rmp_serde::decode::from_slice::<T>(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn switch_log_roundtrip() {
        let switches: Vec<u64> = vec![1, 180, 9601, u64::MAX];
        let enc = encode(&switches);
        let dec: Vec<u64> = decode(&enc).unwrap();
        assert_eq!(dec, switches);
    }

    #[test]
    fn empty_log() {
        let switches: Vec<u64> = Vec::new();
        let dec: Vec<u64> = decode(&encode(&switches)).unwrap();
        assert!(dec.is_empty());
    }
}
