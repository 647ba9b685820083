// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::{Annotation, Checkpoint, Content, FinishReason, Test};
use serde::Serialize;
use std::time::Duration;

/// A point-in-time copy of a [`Test`] and all of its subtests.
///
/// Returned by [`Test::snapshot`].
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct TestSnapshot {
    /// The name of the test.
    pub name: String,

    /// The inactivity timeout of the test.
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,

    /// The number of checkpoints and subtests that passed.
    pub passed: usize,

    /// The number of checkpoints and subtests that failed.
    pub failed: usize,

    /// The number of checkpoints and subtests started.
    pub total: usize,

    /// The number of subtests started but not resolved.
    pub pending: usize,

    /// The expected number of checkpoints and subtests, if set.
    pub expected: Option<i64>,

    /// The number of error annotations.
    pub errors: usize,

    /// Whether the test has finished.
    pub finished: bool,

    /// Why the test finished abnormally, if it did.
    pub finish_reason: Option<FinishReason>,

    /// The result of [`Test::is_complete`].
    pub complete: bool,

    /// The result of [`Test::is_passed`].
    pub ok: bool,

    /// The contents of the test, in the order they were recorded.
    pub contents: Vec<ContentSnapshot>,
}

/// A point-in-time copy of a [`Content`] entry.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ContentSnapshot {
    /// A checkpoint.
    Checkpoint(Checkpoint),

    /// An annotation.
    Annotation(Annotation),

    /// A subtest.
    Subtest(TestSnapshot),
}

impl Test {
    /// Takes a snapshot of this test and its subtests.
    ///
    /// Each test in the tree is copied atomically, but subtests are copied after their parent, so
    /// a snapshot taken while tests are running may show a parent and child at slightly different
    /// points in time.
    pub fn snapshot(&self) -> TestSnapshot {
        let (mut snapshot, contents) = self.snapshot_shallow();
        snapshot.contents = contents
            .into_iter()
            .map(|content| match content {
                Content::Checkpoint(checkpoint) => ContentSnapshot::Checkpoint(checkpoint),
                Content::Annotation(annotation) => ContentSnapshot::Annotation(annotation),
                Content::Subtest(test) => ContentSnapshot::Subtest(test.snapshot()),
            })
            .collect();
        snapshot
    }
}
