// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::state::{CompletionCallback, NodeState, Notification};
use crate::{
    Content, FinishReason, TestSnapshot,
    helpers::{display_millis, panic_message},
    time::TimerGeneration,
};
use std::{
    fmt,
    panic::{self, AssertUnwindSafe},
    sync::{Arc, Mutex, MutexGuard, PoisonError, Weak},
    time::Duration,
};
use tokio::runtime::Handle;
use tracing::{debug, warn};

/// A node in a tree of test results.
///
/// `Test` is a cheap handle: clones refer to the same node. A parent's contents hold handles to
/// its subtests, and a subtest reaches its parent only through the completion callback it was
/// created with. That callback holds a weak reference, so a subtest never keeps its parent alive:
/// callers must hold on to the root for as long as they want its completion.
///
/// None of the operations on a `Test` fail or panic. Operations that aren't allowed once a test
/// has finished (recording checkpoints, starting subtests and changing the expected count) are
/// rejected and logged as error annotations instead.
#[derive(Clone)]
pub struct Test {
    shared: Arc<Shared>,
}

struct Shared {
    name: String,
    timeout: Duration,
    subtest_timeout: Option<Duration>,
    handle: Handle,
    state: Mutex<NodeState>,
}

impl Test {
    pub(super) fn new_node(
        name: String,
        timeout: Duration,
        subtest_timeout: Option<Duration>,
        handle: Handle,
        on_complete: CompletionCallback,
    ) -> Self {
        let test = Self {
            shared: Arc::new(Shared {
                name,
                timeout,
                subtest_timeout,
                handle,
                state: Mutex::new(NodeState::new(on_complete)),
            }),
        };
        test.ping();
        test
    }

    /// Returns the name of this test.
    pub fn name(&self) -> &str {
        &self.shared.name
    }

    /// Returns the inactivity timeout for this test. A zero timeout means the test never times out.
    pub fn timeout(&self) -> Duration {
        self.shared.timeout
    }

    /// Returns the number of checkpoints and subtests that passed.
    pub fn passed(&self) -> usize {
        self.lock().passed
    }

    /// Returns the number of checkpoints and subtests that failed.
    pub fn failed(&self) -> usize {
        self.lock().failed
    }

    /// Returns the number of checkpoints and subtests started, including subtests that haven't
    /// resolved yet.
    pub fn total(&self) -> usize {
        self.lock().total
    }

    /// Returns the number of subtests started but not yet resolved.
    pub fn pending(&self) -> usize {
        self.lock().pending
    }

    /// Returns the expected number of checkpoints and subtests, if one was set.
    pub fn expected(&self) -> Option<i64> {
        self.lock().expected
    }

    /// Returns the number of error annotations recorded on this test.
    ///
    /// Errors may still be recorded after a test has resolved, so this isn't stable until all
    /// activity on the test has stopped.
    pub fn errors(&self) -> usize {
        self.lock().errors
    }

    /// Returns true if this test has finished.
    pub fn is_finished(&self) -> bool {
        self.lock().finished
    }

    /// Returns the reason this test finished abnormally, or `None` if it finished normally or
    /// hasn't finished yet.
    pub fn finish_reason(&self) -> Option<FinishReason> {
        self.lock().finish_reason.clone()
    }

    /// Returns a copy of this test's contents, in the order they were recorded.
    pub fn contents(&self) -> Vec<Content> {
        self.lock().contents.clone()
    }

    /// Returns true if this test has finished, has no pending subtests, and has reached its
    /// expected count (if any).
    pub fn is_complete(&self) -> bool {
        self.lock().is_complete()
    }

    /// Returns true if this test is complete, finished normally, and recorded no failures and no
    /// errors.
    pub fn is_passed(&self) -> bool {
        self.lock().is_passed()
    }

    /// Resets the liveness timer.
    ///
    /// Every operation that records activity calls this, so it only needs to be called directly to
    /// signal that a test is alive without recording anything.
    pub fn ping(&self) {
        let mut state = self.lock();
        self.ping_locked(&mut state);
    }

    /// Records a checkpoint.
    ///
    /// Returns the outcome of the checkpoint, or `None` if the checkpoint was rejected because this
    /// test has already finished.
    pub fn check(&self, result: bool, name: impl Into<String>) -> Option<bool> {
        let name = name.into();
        let mut state = self.lock();
        if state.finished {
            self.reject_check_locked(&mut state, &name);
            return None;
        }
        self.ping_locked(&mut state);
        let notification = self.record_checkpoint_locked(&mut state, name, result, None);
        drop(state);

        Notification::deliver(notification);
        Some(result)
    }

    /// Records a checkpoint from the outcome of running `f`.
    ///
    /// The checkpoint passes if `f` returns `Ok`. If `f` returns an error or panics, the checkpoint
    /// fails and the error or panic message is recorded as an error annotation right after it.
    ///
    /// Returns `None` if the checkpoint was rejected because this test has already finished. In
    /// that case `f` isn't run. If the test finishes while `f` is running, the checkpoint is
    /// rejected but a failure from `f` is still recorded as an error annotation.
    pub fn check_with<F, E>(&self, f: F, name: impl Into<String>) -> Option<bool>
    where
        F: FnOnce() -> Result<(), E>,
        E: fmt::Display,
    {
        let name = name.into();
        {
            let mut state = self.lock();
            if state.finished {
                self.reject_check_locked(&mut state, &name);
                return None;
            }
            self.ping_locked(&mut state);
        }

        // f may call back into this test, so it must run without the lock held.
        let failure = match panic::catch_unwind(AssertUnwindSafe(f)) {
            Ok(Ok(())) => None,
            Ok(Err(error)) => Some(error.to_string()),
            Err(payload) => Some(panic_message(&*payload)),
        };
        let passed = failure.is_none();

        let mut state = self.lock();
        if state.finished {
            // The test timed out or was finished by another task while f was running.
            self.reject_check_locked(&mut state, &name);
            if let Some(failure) = failure {
                self.error_locked(&mut state, failure.into());
            }
            return None;
        }
        let notification = self.record_checkpoint_locked(&mut state, name, passed, failure);
        drop(state);

        Notification::deliver(notification);
        Some(passed)
    }

    /// Adjusts the number of checkpoints and subtests this test expects to record.
    ///
    /// Once the number of checkpoints and subtests started equals the expected count, the test
    /// finishes automatically. The comparison is for equality: if the total is already past the
    /// new expectation, the test won't finish automatically.
    pub fn add_expected(&self, delta: i64) {
        let mut state = self.lock();
        if state.finished {
            self.reject_locked(
                &mut state,
                format!("add_expected({delta}) called after test finished"),
            );
            return;
        }
        self.ping_locked(&mut state);
        state.add_expected(delta);
        let notification = self.finish_if_expected_locked(&mut state);
        drop(state);

        Notification::deliver(notification);
    }

    /// Records a comment. Comments may be recorded even after the test has finished.
    pub fn comment(&self, data: impl Into<serde_json::Value>) {
        let mut state = self.lock();
        self.ping_locked(&mut state);
        state.push_comment(data.into());
    }

    /// Records an error. Errors may be recorded even after the test has finished.
    ///
    /// A test with any errors never passes.
    pub fn error(&self, data: impl Into<serde_json::Value>) {
        let mut state = self.lock();
        self.error_locked(&mut state, data.into());
    }

    /// Finishes this test normally.
    pub fn finish(&self) {
        self.finish_inner(None);
    }

    /// Finishes this test abnormally with the given reason.
    ///
    /// A [`FinishReason::Custom`] reason with an empty string is treated as a normal finish.
    pub fn finish_with(&self, reason: FinishReason) {
        let reason = match reason {
            FinishReason::Custom(custom) if custom.is_empty() => None,
            other => Some(other),
        };
        self.finish_inner(reason);
    }

    fn finish_inner(&self, reason: Option<FinishReason>) {
        let mut state = self.lock();
        let notification = self.finish_locked(&mut state, reason);
        drop(state);

        Notification::deliver(notification);
    }

    /// Copies this test's state in one go. The returned snapshot has empty contents: the raw
    /// contents are returned alongside it so subtests can be snapshotted without the lock held.
    pub(crate) fn snapshot_shallow(&self) -> (TestSnapshot, Vec<Content>) {
        let state = self.lock();
        let snapshot = TestSnapshot {
            name: self.shared.name.clone(),
            timeout: self.shared.timeout,
            passed: state.passed,
            failed: state.failed,
            total: state.total,
            pending: state.pending,
            expected: state.expected,
            errors: state.errors,
            finished: state.finished,
            finish_reason: state.finish_reason.clone(),
            complete: state.is_complete(),
            ok: state.is_passed(),
            contents: Vec::new(),
        };
        (snapshot, state.contents.clone())
    }

    pub(crate) fn runtime_handle(&self) -> &Handle {
        &self.shared.handle
    }

    /// Starts a subtest. Returns `None` if this test has already finished.
    pub(super) fn start_subtest(&self, name: String, timeout: Option<Duration>) -> Option<Test> {
        let mut state = self.lock();
        if state.finished {
            self.reject_locked(
                &mut state,
                format!("subtest `{name}` started after test finished"),
            );
            return None;
        }
        self.ping_locked(&mut state);

        let parent = Arc::downgrade(&self.shared);
        let timeout = timeout
            .or(self.shared.subtest_timeout)
            .unwrap_or(self.shared.timeout);
        let child = Test::new_node(
            name,
            timeout,
            self.shared.subtest_timeout,
            self.shared.handle.clone(),
            Box::new(move |reason, passed| Test::resolve_subtest(&parent, reason, passed)),
        );
        state.contents.push(Content::Subtest(child.clone()));
        state.pending += 1;
        state.total += 1;
        let notification = self.finish_if_expected_locked(&mut state);
        drop(state);

        Notification::deliver(notification);
        Some(child)
    }

    /// Called by a subtest once it resolves. Does nothing if the parent has been dropped.
    fn resolve_subtest(parent: &Weak<Shared>, reason: Option<FinishReason>, passed: bool) {
        let Some(shared) = parent.upgrade() else {
            debug!("subtest resolved after its parent was dropped");
            return;
        };
        let parent = Test { shared };
        parent.count_resolved_subtest(reason, passed);
    }

    fn count_resolved_subtest(&self, reason: Option<FinishReason>, passed: bool) {
        let mut state = self.lock();
        state.count_outcome(reason.is_none() && passed);
        match state.pending.checked_sub(1) {
            Some(pending) => state.pending = pending,
            None => {
                warn!(test = %self.name(), "subtest resolved with no subtests pending");
            }
        }

        let notification = if state.pending == 0 && state.finished {
            debug!(test = %self.name(), "last pending subtest resolved");
            state.take_notification()
        } else {
            None
        };
        drop(state);

        Notification::deliver(notification);
    }

    fn fire_timeout(&self, generation: TimerGeneration) {
        let mut state = self.lock();
        if !state.timer.is_current(generation) || state.finished {
            return;
        }
        state.timer.disarm_fired();
        debug!(test = %self.name(), timeout = ?self.shared.timeout, "test timed out");
        let notification = self.finish_locked(&mut state, Some(FinishReason::Timeout));
        drop(state);

        Notification::deliver(notification);
    }

    fn lock(&self) -> MutexGuard<'_, NodeState> {
        // The lock is never held while running caller code, so poisoning can only come from a bug
        // in this module. The state is still consistent in that case.
        self.shared.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn ping_locked(&self, state: &mut NodeState) {
        let duration = (!state.finished).then_some(self.shared.timeout);
        let node = self.clone();
        state.timer.reset(&self.shared.handle, duration, move |generation| async move {
            node.fire_timeout(generation)
        });
    }

    fn error_locked(&self, state: &mut NodeState, data: serde_json::Value) {
        self.ping_locked(state);
        state.push_error(data);
    }

    fn reject_locked(&self, state: &mut NodeState, message: String) {
        debug!(test = %self.name(), %message, "rejected operation on finished test");
        self.error_locked(state, message.into());
    }

    fn reject_check_locked(&self, state: &mut NodeState, name: &str) {
        self.reject_locked(state, format!("check `{name}` recorded after test finished"));
    }

    fn record_checkpoint_locked(
        &self,
        state: &mut NodeState,
        name: String,
        passed: bool,
        failure: Option<String>,
    ) -> Option<Notification> {
        state.push_checkpoint(name, passed);
        if let Some(failure) = failure {
            self.error_locked(state, failure.into());
        }
        self.finish_if_expected_locked(state)
    }

    fn finish_if_expected_locked(&self, state: &mut NodeState) -> Option<Notification> {
        if !state.finished && state.expected_reached() {
            debug!(test = %self.name(), total = state.total, "expected count reached");
            self.finish_locked(state, None)
        } else {
            None
        }
    }

    fn finish_locked(
        &self,
        state: &mut NodeState,
        reason: Option<FinishReason>,
    ) -> Option<Notification> {
        if state.finished {
            let attempted = reason.as_ref().map_or("none", FinishReason::as_str);
            self.reject_locked(
                state,
                format!(
                    "finish called on a test that already finished \
                     (attempted reason: {attempted})"
                ),
            );
            return None;
        }

        state.finished = true;
        // Cancels the liveness timer, since the test is now finished.
        self.ping_locked(state);
        state.finish_reason = reason.clone();
        if let Some(reason) = reason {
            let message = match reason {
                FinishReason::Bail => {
                    "uncaught panic or error in test body, bailing out".to_owned()
                }
                FinishReason::Timeout => format!(
                    "test timed out after {} without activity",
                    display_millis(self.shared.timeout)
                ),
                FinishReason::Custom(custom) => {
                    format!("test finished abnormally, reason was '{custom}'")
                }
            };
            self.error_locked(state, message.into());
        }
        debug!(
            test = %self.name(),
            reason = state.finish_reason.as_ref().map_or("none", FinishReason::as_str),
            pending = state.pending,
            "test finished",
        );

        if state.pending == 0 {
            state.take_notification()
        } else {
            debug!(
                test = %self.name(),
                pending = state.pending,
                "deferring completion until subtests resolve",
            );
            None
        }
    }
}

impl fmt::Debug for Test {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Test")
            .field("name", &self.shared.name)
            .field("timeout", &self.shared.timeout)
            .finish_non_exhaustive()
    }
}
