// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Convenience checks built on [`Test::check_with`].
//!
//! Each of these runs a predicate and turns its outcome into a checkpoint. A failing predicate
//! also records an error annotation explaining the failure.

use crate::Test;
use std::{convert::Infallible, fmt, panic};
use thiserror::Error;

#[derive(Debug, Error)]
#[error("values are not equal\n  actual: {actual}\nexpected: {expected}")]
struct NotEqual {
    actual: String,
    expected: String,
}

#[derive(Debug, Error)]
#[error("expected a panic, but none occurred")]
struct DidNotPanic;

impl Test {
    /// Checks that `actual` equals `expected`.
    ///
    /// On mismatch, the `Debug` representations of both values are recorded.
    pub fn check_eq<T, U>(&self, actual: T, expected: U, name: impl Into<String>) -> Option<bool>
    where
        T: PartialEq<U> + fmt::Debug,
        U: fmt::Debug,
    {
        self.check_with(
            || {
                if actual == expected {
                    Ok(())
                } else {
                    Err(NotEqual {
                        actual: format!("{actual:?}"),
                        expected: format!("{expected:?}"),
                    })
                }
            },
            name,
        )
    }

    /// Checks that `f` panics.
    pub fn check_panics<F>(&self, f: F, name: impl Into<String>) -> Option<bool>
    where
        F: FnOnce(),
    {
        self.check_with(
            || match panic::catch_unwind(panic::AssertUnwindSafe(f)) {
                Ok(()) => Err(DidNotPanic),
                Err(_) => Ok(()),
            },
            name,
        )
    }

    /// Checks that `f` runs to completion without panicking.
    ///
    /// If `f` panics, the panic message is recorded.
    pub fn check_no_panic<F>(&self, f: F, name: impl Into<String>) -> Option<bool>
    where
        F: FnOnce(),
    {
        self.check_with(
            || {
                f();
                Ok::<_, Infallible>(())
            },
            name,
        )
    }
}
