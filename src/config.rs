//! Server configuration
//!
//! Loaded from `~/.augment-mcp/config.toml` when present, then overridden by
//! environment variables. Every field is optional; a missing file simply
//! yields defaults.

use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::auggie::{BINARY_PATH_ENV, SESSION_AUTH_ENV};
use crate::errors::{AuggieError, Result};

/// Environment variable controlling the tracing filter
pub const LOG_LEVEL_ENV: &str = "AUGMENT_MCP_LOG_LEVEL";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Path to the Auggie binary; overrides OS search-path resolution
    #[serde(default)]
    pub binary_path: Option<String>,

    /// Session credential merged into each child's environment
    #[serde(default)]
    pub session_token: Option<String>,

    /// Default per-run timeout applied when a call does not set one
    #[serde(default)]
    pub default_timeout_ms: Option<u64>,

    /// Tracing filter, e.g. `info` or `augment_mcp=debug`
    #[serde(default)]
    pub log_level: Option<String>,
}

impl ServerConfig {
    /// Load configuration from the config file and environment.
    pub fn load() -> Result<Self> {
        let mut config = match Self::config_path() {
            Some(path) if path.exists() => {
                let contents = fs::read_to_string(&path).map_err(|err| {
                    AuggieError::Config(format!("Failed to read {}: {err}", path.display()))
                })?;
                toml::from_str(&contents).map_err(|err| {
                    AuggieError::Config(format!("Failed to parse {}: {err}", path.display()))
                })?
            }
            _ => Self::default(),
        };
        config.apply_env();
        Ok(config)
    }

    /// The configuration file path, `~/.augment-mcp/config.toml`
    pub fn config_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".augment-mcp").join("config.toml"))
    }

    /// Overlay environment variables onto file values.
    fn apply_env(&mut self) {
        if let Ok(path) = std::env::var(BINARY_PATH_ENV) {
            self.binary_path = Some(path);
        }
        if let Ok(token) = std::env::var(SESSION_AUTH_ENV) {
            self.session_token = Some(token);
        }
        if let Ok(level) = std::env::var(LOG_LEVEL_ENV) {
            self.log_level = Some(level);
        }
    }

    /// Binary path for one call: per-call override, then configuration.
    /// `None` lets the invocation layer fall back to the search path.
    pub fn resolved_binary(&self, per_call: Option<&str>) -> Option<String> {
        per_call
            .map(str::to_string)
            .or_else(|| self.binary_path.clone())
    }

    /// Session token for one call: per-call override, then configuration.
    pub fn resolved_session_token(&self, per_call: Option<&str>) -> Option<String> {
        per_call
            .map(str::to_string)
            .or_else(|| self.session_token.clone())
    }

    /// Timeout for one call: per-call override, then the configured default.
    pub fn resolved_timeout_ms(&self, per_call: Option<u64>) -> Option<u64> {
        per_call.or(self.default_timeout_ms)
    }
}
