//! Doctor command for environment diagnostics
//!
//! Health checks for the Auggie binary, the session credential, the server
//! configuration file, and the user-level command directory.

use std::time::Duration;

use crate::auggie::{run_auggie_command, RunOptions};
use crate::config::ServerConfig;
use crate::errors::AuggieError;

/// Deadline for the `--version` probe
const VERSION_PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// Health check result
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    Pass,
    Warn(String),
    Fail(String),
}

/// Individual health check
#[derive(Debug)]
pub struct HealthCheck {
    pub name: String,
    pub status: HealthStatus,
}

/// Doctor diagnostics system
pub struct Doctor {
    config: ServerConfig,
}

impl Doctor {
    /// Create a new doctor instance
    pub fn new(config: ServerConfig) -> Self {
        Self { config }
    }

    /// Run all health checks
    pub async fn run_diagnostics(&self) -> Vec<HealthCheck> {
        vec![
            self.check_auggie_binary().await,
            self.check_session_token(),
            self.check_config_file(),
            self.check_user_commands(),
        ]
    }

    /// Check 1: Auggie binary runs
    async fn check_auggie_binary(&self) -> HealthCheck {
        let options = RunOptions::default()
            .with_binary_path(self.config.resolved_binary(None))
            .with_session_token(self.config.resolved_session_token(None))
            .with_timeout_ms(Some(VERSION_PROBE_TIMEOUT.as_millis() as u64));

        let status = match run_auggie_command(vec!["--version".to_string()], options).await {
            Ok(_) => HealthStatus::Pass,
            Err(AuggieError::NotInstalled { binary_path }) => HealthStatus::Fail(format!(
                "Auggie CLI not found at '{binary_path}'. Install it or set AUGGIE_PATH"
            )),
            Err(AuggieError::CommandFailed { result }) => HealthStatus::Warn(format!(
                "Auggie is present but --version exited with code {}",
                result.exit_code
            )),
            Err(AuggieError::Timeout { .. }) => {
                HealthStatus::Warn("Auggie --version did not finish within 10s".to_string())
            }
            Err(err) => HealthStatus::Fail(format!("Cannot run Auggie: {err}")),
        };

        HealthCheck {
            name: "Auggie CLI".to_string(),
            status,
        }
    }

    /// Check 2: Session credential available
    fn check_session_token(&self) -> HealthCheck {
        let status = if self.config.resolved_session_token(None).is_some() {
            HealthStatus::Pass
        } else {
            HealthStatus::Warn(
                "AUGMENT_SESSION_AUTH not set; callers must pass session_token per call"
                    .to_string(),
            )
        };
        HealthCheck {
            name: "Session Credential".to_string(),
            status,
        }
    }

    /// Check 3: Configuration file parses
    fn check_config_file(&self) -> HealthCheck {
        let status = match ServerConfig::config_path() {
            Some(path) if path.exists() => match std::fs::read_to_string(&path) {
                Ok(contents) => match toml::from_str::<ServerConfig>(&contents) {
                    Ok(_) => HealthStatus::Pass,
                    Err(err) => HealthStatus::Fail(format!("Config file does not parse: {err}")),
                },
                Err(err) => HealthStatus::Fail(format!("Config file unreadable: {err}")),
            },
            Some(_) => HealthStatus::Warn("No config file; defaults in use".to_string()),
            None => HealthStatus::Warn("Could not determine home directory".to_string()),
        };
        HealthCheck {
            name: "Configuration".to_string(),
            status,
        }
    }

    /// Check 4: User-level command directory
    fn check_user_commands(&self) -> HealthCheck {
        let status = match dirs::home_dir() {
            Some(home) if home.join(".augment").join("commands").is_dir() => HealthStatus::Pass,
            Some(_) => {
                HealthStatus::Warn("~/.augment/commands not found; no user commands".to_string())
            }
            None => HealthStatus::Warn("Could not determine home directory".to_string()),
        };
        HealthCheck {
            name: "User Commands".to_string(),
            status,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_binary_check_reports_missing_binary() {
        let config = ServerConfig {
            binary_path: Some("/definitely/not/a/real/auggie".to_string()),
            session_token: None,
            default_timeout_ms: None,
            log_level: None,
        };
        let doctor = Doctor::new(config);
        let check = doctor.check_auggie_binary().await;
        assert!(matches!(check.status, HealthStatus::Fail(_)));
    }

    #[test]
    fn test_session_token_warns_when_absent() {
        let doctor = Doctor::new(ServerConfig::default());
        // The environment may supply AUGMENT_SESSION_AUTH through load(); the
        // default config here has no token, so the check must warn.
        let check = doctor.check_session_token();
        assert!(matches!(check.status, HealthStatus::Warn(_)));
    }

    #[test]
    fn test_session_token_passes_when_configured() {
        let config = ServerConfig {
            session_token: Some("token".to_string()),
            ..ServerConfig::default()
        };
        let check = Doctor::new(config).check_session_token();
        assert_eq!(check.status, HealthStatus::Pass);
    }
}
