// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::state::CompletionCallback;
use crate::{
    BodyResult, Completion, FinishReason, Test, config::TreeConfig, errors::TestBuildError,
};
use debug_ignore::DebugIgnore;
use std::{future::Future, time::Duration};
use tokio::{runtime::Handle, sync::oneshot};

/// The default inactivity timeout for a root test: 5 seconds.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(5000);

/// The receiving end of a root test's completion notification.
///
/// Returned by [`TestBuilder::build_with_receiver`].
pub type CompletionReceiver = oneshot::Receiver<Completion>;

/// Builder for a root [`Test`].
#[derive(Debug)]
pub struct TestBuilder {
    name: String,
    timeout: Duration,
    subtest_timeout: Option<Duration>,
    handle: Option<Handle>,
    on_complete: DebugIgnore<Option<CompletionCallback>>,
}

impl TestBuilder {
    /// Creates a new builder for a root test with the given name and the default timeout.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            timeout: DEFAULT_TIMEOUT,
            subtest_timeout: None,
            handle: None,
            on_complete: DebugIgnore(None),
        }
    }

    /// Creates a new builder seeded from configuration.
    pub fn from_config(name: impl Into<String>, config: &TreeConfig) -> Self {
        let mut builder = Self::new(name);
        builder.set_timeout(config.default_timeout);
        if let Some(subtest_timeout) = config.subtest_timeout {
            builder.set_subtest_timeout(subtest_timeout);
        }
        builder
    }

    /// Sets the inactivity timeout for the root test. [`Duration::ZERO`] disables the timeout.
    pub fn set_timeout(&mut self, timeout: Duration) -> &mut Self {
        self.timeout = timeout;
        self
    }

    /// Sets the timeout for subtests started without an explicit timeout, at any depth.
    ///
    /// If this isn't set, such subtests inherit their parent's timeout.
    pub fn set_subtest_timeout(&mut self, timeout: Duration) -> &mut Self {
        self.subtest_timeout = Some(timeout);
        self
    }

    /// Sets the runtime that timers and test bodies are spawned on.
    ///
    /// By default, the runtime that [`Self::build`] is called from is used.
    pub fn set_runtime_handle(&mut self, handle: Handle) -> &mut Self {
        self.handle = Some(handle);
        self
    }

    /// Sets the callback invoked once the root test resolves.
    ///
    /// The callback is called exactly once, with the reason the test finished (`None` for a normal
    /// finish) and whether it passed. It may be called from a tokio worker thread.
    pub fn set_on_complete<F>(&mut self, on_complete: F) -> &mut Self
    where
        F: FnOnce(Option<FinishReason>, bool) + Send + 'static,
    {
        self.on_complete = DebugIgnore(Some(Box::new(on_complete)));
        self
    }

    /// Builds the root test and arms its liveness timer.
    pub fn build(self) -> Result<Test, TestBuildError> {
        let handle = match self.handle {
            Some(handle) => handle,
            None => Handle::try_current().map_err(TestBuildError::NoRuntime)?,
        };
        let on_complete = self.on_complete.0.unwrap_or_else(|| Box::new(|_, _| {}));
        Ok(Test::new_node(
            self.name,
            self.timeout,
            self.subtest_timeout,
            handle,
            on_complete,
        ))
    }

    /// Builds the root test, and returns it along with a receiver for its completion.
    ///
    /// A callback set through [`Self::set_on_complete`] is still invoked, before the completion is
    /// sent.
    pub fn build_with_receiver(mut self) -> Result<(Test, CompletionReceiver), TestBuildError> {
        let (sender, receiver) = oneshot::channel();
        let existing = self.on_complete.0.take();
        self.set_on_complete(move |reason, passed| {
            if let Some(existing) = existing {
                existing(reason.clone(), passed);
            }
            // The receiver may have been dropped: that's fine.
            _ = sender.send(Completion { reason, passed });
        });
        let test = self.build()?;
        Ok((test, receiver))
    }
}

/// Builder for a subtest, returned by [`Test::subtest`].
#[derive(Debug)]
#[must_use = "subtests are only started by calling start() or run()"]
pub struct SubtestBuilder<'a> {
    parent: &'a Test,
    name: String,
    timeout: Option<Duration>,
}

impl SubtestBuilder<'_> {
    /// Sets the inactivity timeout for this subtest. [`Duration::ZERO`] disables the timeout.
    pub fn set_timeout(&mut self, timeout: Duration) -> &mut Self {
        self.timeout = Some(timeout);
        self
    }

    /// Starts the subtest and returns it, so the caller can drive it directly.
    ///
    /// Panics while driving the returned test aren't captured. Returns `None` if the parent has
    /// already finished, in which case the attempt is recorded as an error on the parent.
    pub fn start(self) -> Option<Test> {
        self.parent.start_subtest(self.name, self.timeout)
    }

    /// Starts the subtest and schedules `body` to run against it, as with [`Test::run`].
    ///
    /// If the parent has already finished, the attempt is recorded as an error on the parent and
    /// `body` is dropped without running.
    pub fn run<F, Fut>(self, body: F)
    where
        F: FnOnce(Test) -> Fut + Send + 'static,
        Fut: Future + Send + 'static,
        Fut::Output: BodyResult,
    {
        if let Some(test) = self.start() {
            test.run(body);
        }
    }
}

impl Test {
    /// Returns a builder for a subtest of this test.
    ///
    /// The subtest counts toward this test's total as soon as it is started, and this test won't
    /// notify its own completion until the subtest resolves.
    pub fn subtest(&self, name: impl Into<String>) -> SubtestBuilder<'_> {
        SubtestBuilder {
            parent: self,
            name: name.into(),
            timeout: None,
        }
    }
}
