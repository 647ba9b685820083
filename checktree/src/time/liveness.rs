// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The liveness timer for a test node.
//!
//! Every activity on a node resets its timer. The timer is a single tokio task that sleeps for the
//! node's timeout and then calls back into the node. Resetting aborts the previous task and bumps a
//! generation counter: a timer task that was already past its sleep when it got reset observes a
//! stale generation and does nothing.

use std::{future::Future, time::Duration};
use tokio::{runtime::Handle, task::AbortHandle};

/// Identifies one arming of a [`LivenessTimer`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct TimerGeneration(u64);

#[derive(Debug, Default)]
pub(crate) struct LivenessTimer {
    generation: u64,
    task: Option<AbortHandle>,
}

impl LivenessTimer {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Cancels any pending firing, then arms a new one if `duration` is `Some` and non-zero.
    ///
    /// `on_fire` is called with the generation it was armed with. It must check that generation
    /// against [`Self::is_current`] before acting.
    pub(crate) fn reset<F, Fut>(&mut self, handle: &Handle, duration: Option<Duration>, on_fire: F)
    where
        F: FnOnce(TimerGeneration) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.cancel();

        let Some(duration) = duration.filter(|d| !d.is_zero()) else {
            return;
        };
        let generation = TimerGeneration(self.generation);
        let fire = on_fire(generation);
        let task = handle.spawn(async move {
            tokio::time::sleep(duration).await;
            fire.await;
        });
        self.task = Some(task.abort_handle());
    }

    /// Returns true if `generation` is the one the timer is currently armed with.
    pub(crate) fn is_current(&self, generation: TimerGeneration) -> bool {
        self.task.is_some() && self.generation == generation.0
    }

    /// Marks the current arming as fired, so that a later reset doesn't abort the task doing the
    /// firing.
    pub(crate) fn disarm_fired(&mut self) {
        self.task = None;
        self.generation += 1;
    }

    fn cancel(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
        self.generation += 1;
    }
}

impl Drop for LivenessTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}
