// Copyright (C) 2021 Quentin M. Kniep <hello@quentinkniep.com>
// Distributed under terms of the MIT license.

pub mod hashable;
mod recover;

pub use hashable::*;
pub use recover::*;
