// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

#![warn(missing_docs)]

//! Hierarchical aggregation of test results.
//!
//! A [`Test`] is a node in a tree of checkpoints, annotations and subtests. Each node decides
//! whether it passed from its own checkpoints and from the outcomes of its children, and notifies
//! its completion callback exactly once, after it has finished and every subtest it started has
//! resolved.
//!
//! The basic flow is:
//!
//! 1. Build a root node with [`TestBuilder`].
//! 2. Record checkpoints with [`Test::check`], or start subtests with [`Test::subtest`]. Subtest
//!    bodies passed to [`SubtestBuilder::run`] are executed on the tokio runtime, and panics that
//!    escape them (or escape work they [`spawn`]) are recorded as failures instead of tearing down
//!    the process.
//! 3. The node finishes when [`Test::finish`] is called, when the number of checkpoints and
//!    subtests reaches the count set with [`Test::add_expected`], or when no activity has been
//!    seen for the node's timeout.

pub mod config;
mod content;
pub mod errors;
mod helpers;
mod isolate;
mod node;
mod predicates;
mod snapshot;
mod time;

pub use content::*;
pub use isolate::{BodyResult, spawn};
pub use node::*;
pub use snapshot::*;
