// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

mod builder;
mod imp;
mod state;

pub use builder::*;
pub use imp::*;
