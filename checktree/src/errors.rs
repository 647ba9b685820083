// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Errors produced by checktree.
//!
//! Operations on a [`Test`](crate::Test) never fail: misuse is recorded in the test's contents
//! instead. The errors here are only produced while setting up a test tree.

use camino::{Utf8Path, Utf8PathBuf};
use config::ConfigError;
use thiserror::Error;

/// An error that occurred while building a root [`Test`](crate::Test).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TestBuildError {
    /// No runtime handle was supplied, and the builder was not called from within a tokio runtime.
    #[error("no tokio runtime handle supplied, and not called from within a tokio runtime")]
    NoRuntime(#[source] tokio::runtime::TryCurrentError),
}

/// An error that occurred while loading checktree configuration.
#[derive(Debug, Error)]
#[non_exhaustive]
pub struct ConfigParseError {
    config_file: Option<Utf8PathBuf>,
    #[source]
    err: ConfigError,
}

impl ConfigParseError {
    pub(crate) fn new(config_file: Option<&Utf8Path>, err: ConfigError) -> Self {
        Self {
            config_file: config_file.map(|path| path.to_owned()),
            err,
        }
    }

    /// Returns the config file that failed to parse, or `None` if the built-in defaults failed.
    pub fn config_file(&self) -> Option<&Utf8Path> {
        self.config_file.as_deref()
    }
}

impl std::fmt::Display for ConfigParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.config_file {
            Some(path) => write!(f, "failed to parse checktree config at `{path}`"),
            None => write!(f, "failed to parse default checktree config"),
        }
    }
}
