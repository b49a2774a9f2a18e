// Copyright (C) 2021 Quentin M. Kniep <hello@quentinkniep.com>
// Distributed under terms of the MIT license.

/// Domain separation prefix for an object type that might be hashed.
/// This ensures, for example, the hash of a vote will never collide with the hash of a fruit.
pub type HashID = &'static str;

// Hash IDs for specific object types, in lexicographic order.
// Hash IDs must be PREFIX-FREE (i.e. no hash ID is a prefix of another)!
pub const COMMITTEE: HashID = "CM";
pub const ELECTION_SEED: HashID = "ES";
pub const FRUIT: HashID = "FR";
pub const MESSAGE: HashID = "MX";
pub const SWITCH_INFO: HashID = "SW";
pub const VOTE: HashID = "VT";
