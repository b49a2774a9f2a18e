// Copyright (C) 2021 Quentin M. Kniep <hello@quentinkniep.com>
// Distributed under terms of the MIT license.

mod codec;
mod hash;

pub use codec::*;
pub use hash::*;
