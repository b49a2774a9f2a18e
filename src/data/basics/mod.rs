// Copyright (C) 2021 Quentin M. Kniep <hello@quentinkniep.com>
// Distributed under terms of the MIT license.

mod address;

pub use address::*;

/// A fast (primary, transaction-processing) chain block number.
pub type FastNumber = u64;

/// A snail (secondary, proof-of-work) chain block number.
pub type SnailNumber = u64;
