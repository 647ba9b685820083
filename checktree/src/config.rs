// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration for checktree.
//!
//! Configuration is read from TOML. The built-in defaults in [`TreeConfig::DEFAULT_CONFIG`] are
//! layered underneath an optional user-supplied file.

use crate::errors::ConfigParseError;
use camino::Utf8Path;
use config::{Config, File, FileFormat};
use serde::Deserialize;
use std::time::Duration;

/// Timeouts and other settings applied when building test trees.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct TreeConfig {
    /// The inactivity timeout for root tests. Zero disables the timeout.
    #[serde(with = "humantime_serde")]
    pub default_timeout: Duration,

    /// The timeout for subtests started without an explicit timeout.
    #[serde(with = "humantime_serde", default)]
    pub subtest_timeout: Option<Duration>,
}

impl TreeConfig {
    /// The default configuration, as TOML.
    pub const DEFAULT_CONFIG: &'static str = include_str!("../default-config.toml");

    /// Reads configuration from the defaults and, if provided, the given file.
    ///
    /// Keys set in `config_file` override the defaults.
    pub fn from_sources(config_file: Option<&Utf8Path>) -> Result<Self, ConfigParseError> {
        let mut builder = Config::builder()
            .add_source(File::from_str(Self::DEFAULT_CONFIG, FileFormat::Toml));
        if let Some(config_file) = config_file {
            builder = builder.add_source(File::new(config_file.as_str(), FileFormat::Toml));
        }

        builder
            .build()
            .and_then(|config| config.try_deserialize())
            .map_err(|err| ConfigParseError::new(config_file, err))
    }
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            default_timeout: crate::DEFAULT_TIMEOUT,
            subtest_timeout: None,
        }
    }
}
