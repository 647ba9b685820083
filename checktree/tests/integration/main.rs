// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for checktree.
//!
//! These drive test trees through the public API only, the way a harness built on checktree
//! would.

mod async_bodies;
mod basic;
mod helpers;
