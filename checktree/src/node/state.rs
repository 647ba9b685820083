// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::{Annotation, Checkpoint, Content, FinishReason, time::LivenessTimer};

/// Called exactly once with `(reason, passed)` when a test resolves.
pub(crate) type CompletionCallback = Box<dyn FnOnce(Option<FinishReason>, bool) + Send + 'static>;

/// A completion notification that has been taken out of a node, to be delivered after the node's
/// lock has been released.
pub(super) struct Notification {
    callback: CompletionCallback,
    reason: Option<FinishReason>,
    passed: bool,
}

impl Notification {
    pub(super) fn deliver(notification: Option<Self>) {
        if let Some(Self {
            callback,
            reason,
            passed,
        }) = notification
        {
            callback(reason, passed);
        }
    }
}

/// The mutable state of a test node, guarded by the node's mutex.
pub(super) struct NodeState {
    pub(super) contents: Vec<Content>,
    pub(super) passed: usize,
    pub(super) failed: usize,
    pub(super) total: usize,
    pub(super) pending: usize,
    pub(super) expected: Option<i64>,
    pub(super) finished: bool,
    pub(super) finish_reason: Option<FinishReason>,
    pub(super) errors: usize,
    pub(super) timer: LivenessTimer,
    on_complete: Option<CompletionCallback>,
}

impl NodeState {
    pub(super) fn new(on_complete: CompletionCallback) -> Self {
        Self {
            contents: Vec::new(),
            passed: 0,
            failed: 0,
            total: 0,
            pending: 0,
            expected: None,
            finished: false,
            finish_reason: None,
            errors: 0,
            timer: LivenessTimer::new(),
            on_complete: Some(on_complete),
        }
    }

    pub(super) fn push_checkpoint(&mut self, name: String, passed: bool) {
        self.contents.push(Content::Checkpoint(Checkpoint { name, passed }));
        self.count_outcome(passed);
        self.total += 1;
    }

    pub(super) fn push_comment(&mut self, data: serde_json::Value) {
        self.contents.push(Content::Annotation(Annotation::comment(data)));
    }

    pub(super) fn push_error(&mut self, data: serde_json::Value) {
        self.contents.push(Content::Annotation(Annotation::error(data)));
        self.errors += 1;
    }

    pub(super) fn count_outcome(&mut self, passed: bool) {
        if passed {
            self.passed += 1;
        } else {
            self.failed += 1;
        }
    }

    pub(super) fn add_expected(&mut self, delta: i64) {
        self.expected = Some(match self.expected {
            Some(expected) => expected.saturating_add(delta),
            None => delta,
        });
    }

    /// Returns true if an expected count is set and `total` has reached it exactly.
    pub(super) fn expected_reached(&self) -> bool {
        match self.expected {
            Some(expected) => i64::try_from(self.total).is_ok_and(|total| total == expected),
            None => false,
        }
    }

    pub(super) fn is_complete(&self) -> bool {
        self.finished && self.pending == 0 && (self.expected.is_none() || self.expected_reached())
    }

    pub(super) fn is_passed(&self) -> bool {
        self.is_complete() && self.finish_reason.is_none() && self.failed == 0 && self.errors == 0
    }

    /// Takes the completion callback, if it hasn't been taken already.
    ///
    /// Must only be called once the node is finished with nothing pending.
    pub(super) fn take_notification(&mut self) -> Option<Notification> {
        debug_assert!(
            self.finished && self.pending == 0,
            "notification taken before node resolved"
        );
        let callback = self.on_complete.take()?;
        Some(Notification {
            callback,
            reason: self.finish_reason.clone(),
            passed: self.is_passed(),
        })
    }
}
