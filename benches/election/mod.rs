// Copyright (C) 2021 Quentin M. Kniep <hello@quentinkniep.com>
// Distributed under terms of the MIT license.

mod lottery;
mod quorum;

pub use lottery::*;
pub use quorum::*;
