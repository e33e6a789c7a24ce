//! Command specification for a single Auggie invocation
//!
//! A `CommandSpec` is an immutable description of what to run: binary,
//! arguments, optional piped input, environment overrides, deadline, and
//! cancellation handle. One spec is built per invocation and consumed by
//! [`runner::run`](crate::auggie::runner::run).

use std::time::Duration;

use tokio_util::sync::CancellationToken;

/// Description of one external process run
#[derive(Debug, Clone)]
pub struct CommandSpec {
    /// Executable path or bare name resolved via the OS search path
    pub binary: String,

    /// Ordered argument list
    pub args: Vec<String>,

    /// Bytes piped to the child's stdin; the pipe is closed either way
    pub input: Option<Vec<u8>>,

    /// Environment overrides merged over the inherited parent environment
    pub env: Vec<(String, String)>,

    /// Deadline for the whole run, including output draining and reap
    pub timeout: Option<Duration>,

    /// External cancellation handle supplied by the caller
    pub cancel: Option<CancellationToken>,
}

impl CommandSpec {
    /// Create a spec with minimal options
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
            args: Vec::new(),
            input: None,
            env: Vec::new(),
            timeout: None,
            cancel: None,
        }
    }

    /// Append one argument
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append several arguments
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Pipe the given bytes to stdin
    pub fn with_input(mut self, input: impl Into<Vec<u8>>) -> Self {
        self.input = Some(input.into());
        self
    }

    /// Override one environment variable for the child only
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Bound the run's wall-clock duration
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Attach a caller-owned cancellation token
    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// Human-readable reconstruction of the full command line for
    /// diagnostics; elements containing whitespace are double-quoted
    pub fn command_line(&self) -> String {
        let mut parts = Vec::with_capacity(self.args.len() + 1);
        parts.push(quote_arg(&self.binary));
        parts.extend(self.args.iter().map(|arg| quote_arg(arg)));
        parts.join(" ")
    }
}

fn quote_arg(arg: &str) -> String {
    if arg.chars().any(char::is_whitespace) {
        format!("\"{}\"", arg)
    } else {
        arg.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_line_quotes_whitespace() {
        let spec = CommandSpec::new("auggie")
            .arg("--print")
            .arg("review this file");
        assert_eq!(spec.command_line(), "auggie --print \"review this file\"");
    }

    #[test]
    fn test_command_line_plain_args_unquoted() {
        let spec = CommandSpec::new("/usr/local/bin/auggie").args(["--compact", "--model", "gpt"]);
        assert_eq!(
            spec.command_line(),
            "/usr/local/bin/auggie --compact --model gpt"
        );
    }

    #[test]
    fn test_builder_accumulates() {
        let spec = CommandSpec::new("auggie")
            .arg("command")
            .args(["list"])
            .with_input("ctx")
            .with_env("AUGMENT_SESSION_AUTH", "token")
            .with_timeout(Duration::from_millis(250));

        assert_eq!(spec.args, vec!["command", "list"]);
        assert_eq!(spec.input.as_deref(), Some(b"ctx".as_slice()));
        assert_eq!(spec.env.len(), 1);
        assert_eq!(spec.timeout, Some(Duration::from_millis(250)));
        assert!(spec.cancel.is_none());
    }
}
