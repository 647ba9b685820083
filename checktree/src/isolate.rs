// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Running test bodies within an isolation boundary.
//!
//! A test body is spawned as a tokio task. Panics that escape the body, or errors it returns, are
//! recorded on the test, which is then finished with [`FinishReason::Bail`].
//!
//! The boundary also covers work the body defers: the running scope is kept in a task-local, and
//! [`spawn`] starts tasks that inherit it. A panic in such a task bails out the test whose body
//! (transitively) spawned it.

use crate::{FinishReason, Test, helpers::panic_message};
use futures::FutureExt;
use std::{any::Any, fmt, future::Future, panic::AssertUnwindSafe};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

tokio::task_local! {
    static CURRENT_SCOPE: IsolationScope;
}

/// The output of a test body or of a task spawned within one.
///
/// Implemented for `()`, and for `Result<(), E>` where an `Err` is treated the same way as a
/// panic: it is recorded as an error and bails out the test.
pub trait BodyResult {
    /// Returns a description of the failure, or `None` if the body succeeded.
    fn into_failure(self) -> Option<String>;
}

impl BodyResult for () {
    fn into_failure(self) -> Option<String> {
        None
    }
}

impl<E: fmt::Display> BodyResult for Result<(), E> {
    fn into_failure(self) -> Option<String> {
        self.err().map(|error| error.to_string())
    }
}

#[derive(Clone, Debug)]
struct IsolationScope {
    test: Test,
}

impl IsolationScope {
    fn spawn<Fut>(self, fut: Fut) -> JoinHandle<()>
    where
        Fut: Future + Send + 'static,
        Fut::Output: BodyResult,
    {
        let handle = self.test.runtime_handle().clone();
        let scope = self.clone();
        handle.spawn(CURRENT_SCOPE.scope(self, async move {
            let result = AssertUnwindSafe(fut).catch_unwind().await;
            scope.settle(result);
        }))
    }

    fn settle<T: BodyResult>(&self, result: Result<T, Box<dyn Any + Send>>) {
        let failure = match result {
            Ok(output) => output.into_failure(),
            Err(payload) => Some(panic_message(&*payload)),
        };
        if let Some(failure) = failure {
            debug!(test = %self.test.name(), %failure, "uncaught failure in test body");
            self.test.bail(failure);
        }
    }
}

/// Spawns a task within the isolation boundary of the currently running test body.
///
/// If the task panics or returns an error, the failure is recorded on the test whose body is
/// running, and that test bails out. Called outside a test body, this spawns a plain tokio task
/// and only logs failures.
///
/// # Panics
///
/// Panics if called outside a test body and outside a tokio runtime.
pub fn spawn<Fut>(fut: Fut) -> JoinHandle<()>
where
    Fut: Future + Send + 'static,
    Fut::Output: BodyResult,
{
    match CURRENT_SCOPE.try_with(|scope| scope.clone()) {
        Ok(scope) => scope.spawn(fut),
        Err(_) => tokio::spawn(async move {
            if let Some(failure) = fut.await.into_failure() {
                warn!(%failure, "task spawned outside a test body failed");
            }
        }),
    }
}

impl Test {
    /// Schedules `body` to run against this test on the test's runtime.
    ///
    /// `body` never runs before this method returns. If it panics or returns an error, either
    /// directly or from a task it starts with [`spawn`](crate::spawn) or [`Test::spawn`], the
    /// failure is recorded as an error and the test finishes with [`FinishReason::Bail`].
    ///
    /// `run` may be called several times on the same test; the bodies run independently.
    pub fn run<F, Fut>(&self, body: F)
    where
        F: FnOnce(Test) -> Fut + Send + 'static,
        Fut: Future + Send + 'static,
        Fut::Output: BodyResult,
    {
        let test = self.clone();
        IsolationScope { test: self.clone() }.spawn(async move { body(test).await });
    }

    /// Spawns a task within this test's isolation boundary.
    ///
    /// This is like [`spawn`](crate::spawn), except that failures are always routed to this test
    /// regardless of where it's called from.
    pub fn spawn<Fut>(&self, fut: Fut) -> JoinHandle<()>
    where
        Fut: Future + Send + 'static,
        Fut::Output: BodyResult,
    {
        IsolationScope { test: self.clone() }.spawn(fut)
    }

    fn bail(&self, failure: String) {
        self.error(failure);
        self.finish_with(FinishReason::Bail);
    }
}
