//! Bridge configuration.
//!
//! Loaded from an optional TOML file with `GMBRIDGE_*` environment variable
//! overrides (e.g. `GMBRIDGE_DATABASE__PATH`). Page sizes and cursor
//! semantics are part of the GroupMe API contract and live as constants in
//! [`crate::groupme`], not here.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::groupme::DEFAULT_API_BASE;

/// Top-level bridge configuration.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct BridgeConfig {
    pub database: DatabaseConfig,
    pub groupme: GroupMeConfig,
}

/// Database settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file.
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("gmbridge.db"),
        }
    }
}

/// GroupMe API settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GroupMeConfig {
    /// Base URL of the GroupMe v3 API.
    pub base_url: String,
    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,
}

impl Default for GroupMeConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_BASE.to_string(),
            request_timeout_secs: 30,
        }
    }
}

impl BridgeConfig {
    /// Load configuration from an optional TOML file plus environment
    /// overrides. A missing file is not an error; defaults apply.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = ::config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(::config::File::from(path).required(false));
        }
        builder = builder.add_source(
            ::config::Environment::with_prefix("GMBRIDGE")
                .separator("__")
                .try_parsing(true),
        );

        builder
            .build()
            .context("reading configuration sources")?
            .try_deserialize()
            .context("deserializing bridge configuration")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_without_file() {
        let config = BridgeConfig::load(None).unwrap();
        assert_eq!(config.database.path, PathBuf::from("gmbridge.db"));
        assert_eq!(config.groupme.base_url, DEFAULT_API_BASE);
        assert_eq!(config.groupme.request_timeout_secs, 30);
    }
}
