// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::Test;
use serde::{Serialize, Serializer};
use std::fmt;

/// A single named pass/fail outcome recorded on a [`Test`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Checkpoint {
    /// The label passed to [`Test::check`].
    pub name: String,

    /// Whether the checkpoint passed.
    pub passed: bool,
}

/// The kind of an [`Annotation`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum AnnotationKind {
    /// A diagnostic note. Comments never affect the outcome of a test.
    Comment,

    /// Something went wrong with the test itself.
    ///
    /// Every error annotation increments the owning test's error count, and a test with a non-zero
    /// error count never passes.
    Error,
}

/// A side note attached to a [`Test`].
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Annotation {
    /// The kind of annotation.
    pub kind: AnnotationKind,

    /// Arbitrary data attached to the annotation.
    pub data: serde_json::Value,
}

impl Annotation {
    pub(crate) fn comment(data: serde_json::Value) -> Self {
        Self {
            kind: AnnotationKind::Comment,
            data,
        }
    }

    pub(crate) fn error(data: serde_json::Value) -> Self {
        Self {
            kind: AnnotationKind::Error,
            data,
        }
    }
}

/// An entry in a test's contents, in the order it was recorded.
#[derive(Clone, Debug)]
pub enum Content {
    /// A checkpoint.
    Checkpoint(Checkpoint),

    /// A comment or error annotation.
    Annotation(Annotation),

    /// A subtest. The handle is live: its state keeps changing until it resolves.
    Subtest(Test),
}

impl Content {
    /// Returns the checkpoint, if this entry is one.
    pub fn as_checkpoint(&self) -> Option<&Checkpoint> {
        match self {
            Content::Checkpoint(checkpoint) => Some(checkpoint),
            _ => None,
        }
    }

    /// Returns the annotation, if this entry is one.
    pub fn as_annotation(&self) -> Option<&Annotation> {
        match self {
            Content::Annotation(annotation) => Some(annotation),
            _ => None,
        }
    }

    /// Returns the subtest, if this entry is one.
    pub fn as_subtest(&self) -> Option<&Test> {
        match self {
            Content::Subtest(test) => Some(test),
            _ => None,
        }
    }
}

/// Why a test finished abnormally.
///
/// A test that finished normally has no reason at all: APIs in this crate represent that as
/// `Option::<FinishReason>::None`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum FinishReason {
    /// A panic or error escaped a test body.
    Bail,

    /// The test saw no activity for its configured timeout.
    Timeout,

    /// A caller-supplied reason.
    Custom(String),
}

impl FinishReason {
    /// Creates a reason from a string, mapping `"bail"` and `"timeout"` to their dedicated
    /// variants.
    ///
    /// Returns `None` for the empty string, which denotes a normal finish.
    pub fn from_str_lossy(reason: &str) -> Option<Self> {
        match reason {
            "" => None,
            "bail" => Some(Self::Bail),
            "timeout" => Some(Self::Timeout),
            other => Some(Self::Custom(other.to_owned())),
        }
    }

    /// Returns the string form of this reason.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Bail => "bail",
            Self::Timeout => "timeout",
            Self::Custom(reason) => reason,
        }
    }
}

impl fmt::Display for FinishReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for FinishReason {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// The outcome delivered to a root test's completion callback.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Completion {
    /// The reason the test finished, or `None` if it finished normally.
    pub reason: Option<FinishReason>,

    /// Whether the test passed, as computed by [`Test::is_passed`] at notification time.
    pub passed: bool,
}
