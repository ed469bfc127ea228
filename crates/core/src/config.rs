// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Client configuration: TOML file with environment overrides.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8787";
const DEFAULT_MODE: &str = "auto";
const DEFAULT_POLL_INTERVAL_MS: u64 = 5_000;
const DEFAULT_RECONNECT_DELAY_MS: u64 = 1_500;

/// Errors loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("parse error: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base URL of the execution backend.
    pub base_url: String,
    /// Workspace root the console is operating on.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workspace: Option<String>,
    /// Execution mode sent with confirm requests.
    pub mode: String,
    /// Optional policy sent with confirm requests.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub policy: Option<String>,
    pub poll_interval_ms: u64,
    pub reconnect_delay_ms: u64,
    /// Directory for persisted client state. `None` falls back to the
    /// storage layer's default under the user state dir.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            workspace: None,
            mode: DEFAULT_MODE.to_string(),
            policy: None,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            reconnect_delay_ms: DEFAULT_RECONNECT_DELAY_MS,
            state_path: None,
        }
    }
}

impl Config {
    /// Load from a TOML file, then apply environment overrides.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&text)?;
        config.apply_env();
        Ok(config)
    }

    /// Load from the given file when it exists; defaults (plus environment
    /// overrides) otherwise.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) if path.exists() => Self::load(path),
            _ => {
                let mut config = Config::default();
                config.apply_env();
                Ok(config)
            }
        }
    }

    /// Apply `USHER_*` environment overrides over the file values.
    /// Invalid numeric values are ignored in favor of the configured value.
    pub fn apply_env(&mut self) {
        if let Ok(url) = std::env::var("USHER_BASE_URL") {
            if !url.is_empty() {
                self.base_url = url;
            }
        }
        if let Ok(workspace) = std::env::var("USHER_WORKSPACE") {
            if !workspace.is_empty() {
                self.workspace = Some(workspace);
            }
        }
        if let Some(ms) = parse_ms_var("USHER_POLL_INTERVAL_MS") {
            self.poll_interval_ms = ms;
        }
        if let Some(ms) = parse_ms_var("USHER_RECONNECT_MS") {
            self.reconnect_delay_ms = ms;
        }
        if let Ok(path) = std::env::var("USHER_STATE_PATH") {
            if !path.is_empty() {
                self.state_path = Some(PathBuf::from(path));
            }
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }
}

fn parse_ms_var(var: &str) -> Option<u64> {
    std::env::var(var).ok().and_then(|v| v.parse().ok())
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
