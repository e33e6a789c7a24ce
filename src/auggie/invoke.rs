//! High-level Auggie invocations
//!
//! Builds [`CommandSpec`]s for the two shapes of Auggie run the server
//! performs: review-style runs (`--print <instruction>` with piped context)
//! and raw custom-command runs (`command <name> …`). Binary resolution and
//! the session credential merge live here so every caller gets the same
//! behavior.

use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::auggie::{runner, AuggieRunResult, CommandSpec};
use crate::errors::{AuggieError, Result};

/// Environment variable carrying the Augment session credential
pub const SESSION_AUTH_ENV: &str = "AUGMENT_SESSION_AUTH";

/// Environment variable overriding the Auggie binary path
pub const BINARY_PATH_ENV: &str = "AUGGIE_PATH";

/// Default binary name, resolved via the OS search path
pub const DEFAULT_BINARY: &str = "auggie";

/// Options shared by every Auggie run
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Deadline for the whole run
    pub timeout: Option<Duration>,

    /// Per-call session credential; falls back to the parent environment
    pub session_token: Option<String>,

    /// Per-call binary override; falls back to `AUGGIE_PATH`, then `auggie`
    pub binary_path: Option<String>,

    /// Caller-owned cancellation handle
    pub cancel: Option<CancellationToken>,
}

impl RunOptions {
    pub fn with_timeout_ms(mut self, timeout_ms: Option<u64>) -> Self {
        self.timeout = timeout_ms.map(Duration::from_millis);
        self
    }

    pub fn with_session_token(mut self, token: Option<String>) -> Self {
        self.session_token = token;
        self
    }

    pub fn with_binary_path(mut self, binary_path: Option<String>) -> Self {
        self.binary_path = binary_path;
        self
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = Some(cancel);
        self
    }
}

/// One review-style Auggie invocation
#[derive(Debug, Clone, Default)]
pub struct AuggieInvocation {
    /// Instruction passed via `--print`; required and non-empty
    pub instruction: String,

    /// Context text piped to stdin
    pub input_text: Option<String>,

    /// Workspace the review runs against
    pub workspace_root: Option<String>,

    /// Model selection forwarded to Auggie
    pub model: Option<String>,

    /// Request compact output
    pub compact: bool,

    /// GitHub token forwarded for PR-aware reviews
    pub github_api_token: Option<String>,

    /// Extra pass-through arguments, inserted before `--print`
    pub extra_args: Vec<String>,

    /// Shared run options
    pub options: RunOptions,
}

impl AuggieInvocation {
    pub fn new(instruction: impl Into<String>) -> Self {
        Self {
            instruction: instruction.into(),
            ..Default::default()
        }
    }

    pub fn with_input_text(mut self, input_text: Option<String>) -> Self {
        self.input_text = input_text;
        self
    }

    pub fn with_workspace_root(mut self, workspace_root: Option<String>) -> Self {
        self.workspace_root = workspace_root;
        self
    }

    pub fn with_model(mut self, model: Option<String>) -> Self {
        self.model = model;
        self
    }

    pub fn with_compact(mut self, compact: bool) -> Self {
        self.compact = compact;
        self
    }

    pub fn with_github_api_token(mut self, token: Option<String>) -> Self {
        self.github_api_token = token;
        self
    }

    pub fn with_extra_args(mut self, extra_args: Vec<String>) -> Self {
        self.extra_args = extra_args;
        self
    }

    pub fn with_options(mut self, options: RunOptions) -> Self {
        self.options = options;
        self
    }

    /// Assemble the command spec. Fails before anything is launched when the
    /// instruction is empty.
    pub fn into_spec(self) -> Result<CommandSpec> {
        let instruction = self.instruction.trim().to_string();
        if instruction.is_empty() {
            return Err(AuggieError::MissingInstruction);
        }

        let mut spec = CommandSpec::new(resolve_binary(self.options.binary_path.as_deref()));
        if let Some(root) = &self.workspace_root {
            spec = spec.args(["--workspace-root", root]);
        }
        if let Some(model) = &self.model {
            spec = spec.args(["--model", model]);
        }
        if self.compact {
            spec = spec.arg("--compact");
        }
        if let Some(token) = &self.github_api_token {
            spec = spec.args(["--github-api-token", token]);
        }
        spec = spec.args(self.extra_args.iter().cloned());
        spec = spec.arg("--print").arg(instruction);

        if let Some(text) = self.input_text {
            spec = spec.with_input(text.into_bytes());
        }

        Ok(apply_options(spec, self.options))
    }
}

/// Run a review-style invocation to completion.
pub async fn run_auggie(invocation: AuggieInvocation) -> Result<AuggieRunResult> {
    runner::run(invocation.into_spec()?).await
}

/// Assemble a raw argument-list spec (custom commands, `command list`).
pub fn command_spec(args: Vec<String>, options: RunOptions) -> CommandSpec {
    let spec = CommandSpec::new(resolve_binary(options.binary_path.as_deref())).args(args);
    apply_options(spec, options)
}

/// Run Auggie with a raw argument list (custom commands, `command list`).
pub async fn run_auggie_command(args: Vec<String>, options: RunOptions) -> Result<AuggieRunResult> {
    runner::run(command_spec(args, options)).await
}

fn apply_options(mut spec: CommandSpec, options: RunOptions) -> CommandSpec {
    let token = options
        .session_token
        .or_else(|| std::env::var(SESSION_AUTH_ENV).ok());
    if let Some(token) = token {
        spec = spec.with_env(SESSION_AUTH_ENV, token);
    }
    if let Some(timeout) = options.timeout {
        spec = spec.with_timeout(timeout);
    }
    if let Some(cancel) = options.cancel {
        spec = spec.with_cancel(cancel);
    }
    spec
}

fn resolve_binary(explicit: Option<&str>) -> String {
    explicit
        .map(str::to_string)
        .or_else(|| std::env::var(BINARY_PATH_ENV).ok())
        .unwrap_or_else(|| DEFAULT_BINARY.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_review_argument_order() {
        let spec = AuggieInvocation::new("Check security")
            .with_workspace_root(Some("/tmp/workspace".to_string()))
            .with_model(Some("claude-sonnet-4".to_string()))
            .with_compact(true)
            .with_github_api_token(Some("gh-token".to_string()))
            .with_extra_args(vec!["--foo".to_string(), "bar".to_string()])
            .with_options(RunOptions::default().with_binary_path(Some("auggie".to_string())))
            .into_spec()
            .unwrap();

        assert_eq!(
            spec.args,
            vec![
                "--workspace-root",
                "/tmp/workspace",
                "--model",
                "claude-sonnet-4",
                "--compact",
                "--github-api-token",
                "gh-token",
                "--foo",
                "bar",
                "--print",
                "Check security",
            ]
        );
    }

    #[test]
    fn test_instruction_is_trimmed() {
        let spec = AuggieInvocation::new("  review me  \n")
            .with_options(RunOptions::default().with_binary_path(Some("auggie".to_string())))
            .into_spec()
            .unwrap();
        assert_eq!(spec.args.last().map(String::as_str), Some("review me"));
    }

    #[test]
    fn test_empty_instruction_rejected() {
        let err = AuggieInvocation::new("   ").into_spec().unwrap_err();
        assert!(matches!(err, AuggieError::MissingInstruction));
    }

    #[test]
    fn test_session_token_merged_into_env() {
        let spec = AuggieInvocation::new("hi")
            .with_options(
                RunOptions::default()
                    .with_session_token(Some("secret".to_string()))
                    .with_binary_path(Some("auggie".to_string())),
            )
            .into_spec()
            .unwrap();
        assert!(spec
            .env
            .iter()
            .any(|(key, value)| key == SESSION_AUTH_ENV && value == "secret"));
    }

    #[test]
    fn test_input_text_becomes_stdin_bytes() {
        let spec = AuggieInvocation::new("hi")
            .with_input_text(Some("context".to_string()))
            .with_options(RunOptions::default().with_binary_path(Some("auggie".to_string())))
            .into_spec()
            .unwrap();
        assert_eq!(spec.input.as_deref(), Some(b"context".as_slice()));
    }

    #[test]
    fn test_explicit_binary_wins() {
        assert_eq!(resolve_binary(Some("/opt/auggie")), "/opt/auggie");
    }

    #[test]
    fn test_timeout_ms_conversion() {
        let options = RunOptions::default().with_timeout_ms(Some(250));
        assert_eq!(options.timeout, Some(Duration::from_millis(250)));
    }
}
