// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use checktree::{AnnotationKind, CompletionReceiver, Test, TestBuilder};
use color_eyre::eyre::Result;
use std::time::Duration;

/// Builds a root test with the timeout disabled.
pub(crate) fn untimed_root(name: &str) -> Result<(Test, CompletionReceiver)> {
    timed_root(name, Duration::ZERO)
}

pub(crate) fn timed_root(name: &str, timeout: Duration) -> Result<(Test, CompletionReceiver)> {
    let mut builder = TestBuilder::new(name);
    builder.set_timeout(timeout);
    Ok(builder.build_with_receiver()?)
}

/// Returns the string data of every error annotation on `test`, in order.
pub(crate) fn error_messages(test: &Test) -> Vec<String> {
    test.contents()
        .iter()
        .filter_map(|content| content.as_annotation())
        .filter(|annotation| annotation.kind == AnnotationKind::Error)
        .map(|annotation| match annotation.data.as_str() {
            Some(message) => message.to_owned(),
            None => annotation.data.to_string(),
        })
        .collect()
}

/// Panics with `message`. Bodies that end in a call to this still have a `()` output.
pub(crate) fn explode(message: &str) {
    panic!("{message}");
}
