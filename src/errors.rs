//! Error types for the Augment MCP server
//!
//! The Auggie invocation core reports exactly one outcome per run. Success is
//! an `AuggieRunResult`; every failure mode is a variant here, so callers can
//! match on the kind instead of parsing messages.

use thiserror::Error;

use crate::auggie::AuggieRunResult;

/// Main error type for Auggie invocations and server plumbing
#[derive(Error, Debug)]
pub enum AuggieError {
    /// The Auggie binary could not be located on disk or the search path
    #[error("Auggie CLI was not found. Expected executable at: {binary_path}")]
    NotInstalled { binary_path: String },

    /// The OS refused to spawn the process for a reason other than a missing
    /// binary (permissions, resource limits)
    #[error("Failed to start Auggie CLI: {source}")]
    LaunchFailed {
        #[source]
        source: std::io::Error,
    },

    /// Auggie ran to completion but exited non-zero; captured output rides
    /// along so its own diagnostics are not lost
    #[error("Auggie exited with code {}. Command: {}", .result.exit_code, .result.command)]
    CommandFailed { result: AuggieRunResult },

    /// The configured deadline elapsed before the run finished
    #[error("Auggie CLI timed out after {}ms", duration.as_millis())]
    Timeout { duration: std::time::Duration },

    /// The caller's cancellation token fired mid-run
    #[error("Auggie invocation aborted by the caller")]
    Aborted,

    /// A review invocation was built without an instruction
    #[error("Instruction is required for Auggie invocations")]
    MissingInstruction,

    /// Configuration file errors
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type alias for Auggie operations
pub type Result<T> = std::result::Result<T, AuggieError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_installed_display() {
        let err = AuggieError::NotInstalled {
            binary_path: "/opt/auggie".to_string(),
        };
        assert!(err.to_string().contains("/opt/auggie"));
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn test_timeout_reports_milliseconds() {
        let err = AuggieError::Timeout {
            duration: std::time::Duration::from_millis(1500),
        };
        assert_eq!(err.to_string(), "Auggie CLI timed out after 1500ms");
    }

    #[test]
    fn test_command_failed_display() {
        let err = AuggieError::CommandFailed {
            result: AuggieRunResult {
                stdout: String::new(),
                stderr: "boom".to_string(),
                exit_code: 3,
                command: "auggie --print hi".to_string(),
            },
        };
        let message = err.to_string();
        assert!(message.contains("code 3"));
        assert!(message.contains("auggie --print hi"));
    }
}
