// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! General support code for checktree.

use std::{any::Any, time::Duration};

/// Extracts a human-readable message from a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_owned()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "(panic payload is not a string)".to_owned()
    }
}

/// Formats a timeout as a whole number of milliseconds, e.g. `50ms`.
pub(crate) fn display_millis(duration: Duration) -> String {
    format!("{}ms", duration.as_millis())
}
