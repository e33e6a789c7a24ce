//! Auggie process invocation core
//!
//! Runs one external process described by a [`CommandSpec`]: spawn with all
//! three standard streams piped, write and close stdin while draining stdout
//! and stderr concurrently, and race the whole exchange against the optional
//! deadline and the caller's cancellation token. Whichever way a run ends,
//! the child is reaped before this module returns.
//!
//! Escalation for a run that must stop early is SIGTERM, a one second grace
//! period, then SIGKILL. Timeout and cancellation share that path; they only
//! differ in the error reported.

use std::process::Stdio;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::auggie::CommandSpec;
use crate::errors::{AuggieError, Result};

/// Grace period between the terminate request and the forced kill
pub const TERMINATE_GRACE: Duration = Duration::from_secs(1);

/// Successful Auggie invocation result
#[derive(Debug, Clone)]
pub struct AuggieRunResult {
    /// Captured standard output, lossily decoded
    pub stdout: String,

    /// Captured standard error, lossily decoded
    pub stderr: String,

    /// Process exit code; zero here, non-zero rides on `CommandFailed`
    pub exit_code: i32,

    /// Reconstructed command line for diagnostics
    pub command: String,
}

/// Run the process described by `spec` to a classified outcome.
///
/// Exactly one of the following is returned, and the child has been fully
/// reaped before any of them:
///
/// - `Ok(result)`: exit code 0
/// - `Err(CommandFailed)`: ran, exited non-zero
/// - `Err(NotInstalled)`: the binary could not be located (nothing spawned)
/// - `Err(LaunchFailed)`: any other OS-level spawn failure
/// - `Err(Timeout)`: the deadline elapsed first
/// - `Err(Aborted)`: the cancellation token fired first
pub async fn run(spec: CommandSpec) -> Result<AuggieRunResult> {
    let command_line = spec.command_line();
    debug!(command = %command_line, "starting auggie process");

    let mut command = Command::new(&spec.binary);
    command
        .args(&spec.args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    for (key, value) in &spec.env {
        command.env(key, value);
    }

    let mut child = command.spawn().map_err(|source| {
        if source.kind() == std::io::ErrorKind::NotFound {
            AuggieError::NotInstalled {
                binary_path: spec.binary.clone(),
            }
        } else {
            AuggieError::LaunchFailed { source }
        }
    })?;

    // The exchange task owns the three pipe ends but never the child itself,
    // so escalation can signal and reap the process while the task is being
    // torn down.
    let stdin = child.stdin.take();
    let stdout = child.stdout.take();
    let stderr = child.stderr.take();
    let input = spec.input;
    let mut exchange = spawn_exchange(stdin, stdout, stderr, input);

    let timeout = spec.timeout;
    let deadline = async {
        match timeout {
            Some(duration) => tokio::time::sleep(duration).await,
            None => std::future::pending::<()>().await,
        }
    };
    tokio::pin!(deadline);
    let cancel = spec.cancel.clone().unwrap_or_default();

    // Biased ordering resolves a simultaneous timeout and cancellation in
    // favour of the timeout: cancellation only wins when it is observed
    // strictly before the deadline elapses.
    let (stdout_bytes, stderr_bytes) = tokio::select! {
        biased;
        joined = &mut exchange => match joined {
            Ok(buffers) => buffers,
            Err(err) => {
                warn!(error = %err, "output exchange task failed");
                (Vec::new(), Vec::new())
            }
        },
        _ = &mut deadline => {
            abort_exchange(&mut exchange).await;
            escalate(&mut child).await;
            return Err(AuggieError::Timeout {
                duration: timeout.unwrap_or_default(),
            });
        }
        _ = cancel.cancelled() => {
            abort_exchange(&mut exchange).await;
            escalate(&mut child).await;
            return Err(AuggieError::Aborted);
        }
    };

    // Both pipes are at end-of-file, but a child may close them and keep
    // running; the wait stays under the same deadline and cancellation race.
    let status = tokio::select! {
        biased;
        waited = child.wait() => {
            waited.map_err(|source| AuggieError::LaunchFailed { source })?
        }
        _ = &mut deadline => {
            escalate(&mut child).await;
            return Err(AuggieError::Timeout {
                duration: timeout.unwrap_or_default(),
            });
        }
        _ = cancel.cancelled() => {
            escalate(&mut child).await;
            return Err(AuggieError::Aborted);
        }
    };

    let exit_code = status.code().unwrap_or(-1);
    debug!(command = %command_line, exit_code, "auggie process exited");

    classify(exit_code, &stdout_bytes, &stderr_bytes, command_line)
}

/// Write input to the child, close its stdin either way, and drain stdout and
/// stderr to exhaustion, all concurrently to avoid pipe-buffer deadlock.
fn spawn_exchange(
    stdin: Option<tokio::process::ChildStdin>,
    stdout: Option<tokio::process::ChildStdout>,
    stderr: Option<tokio::process::ChildStderr>,
    input: Option<Vec<u8>>,
) -> JoinHandle<(Vec<u8>, Vec<u8>)> {
    tokio::spawn(async move {
        let write_input = async {
            if let Some(mut pipe) = stdin {
                if let Some(bytes) = &input {
                    // A child that stops reading surfaces through its exit
                    // code, not through this write.
                    let _ = pipe.write_all(bytes).await;
                }
                let _ = pipe.shutdown().await;
            }
        };
        let drain_stdout = async {
            let mut buf = Vec::new();
            if let Some(mut pipe) = stdout {
                let _ = pipe.read_to_end(&mut buf).await;
            }
            buf
        };
        let drain_stderr = async {
            let mut buf = Vec::new();
            if let Some(mut pipe) = stderr {
                let _ = pipe.read_to_end(&mut buf).await;
            }
            buf
        };

        let ((), out, err) = tokio::join!(write_input, drain_stdout, drain_stderr);
        (out, err)
    })
}

/// Stop the in-flight exchange and wait for the task to finish tearing down
/// so the pipe ends are closed before the process is signalled.
async fn abort_exchange(exchange: &mut JoinHandle<(Vec<u8>, Vec<u8>)>) {
    exchange.abort();
    let _ = exchange.await;
}

/// Terminate-then-kill a child that must stop early, and reap it.
///
/// Runs on every timeout and cancellation path. On Unix the child first gets
/// SIGTERM and [`TERMINATE_GRACE`] to exit on its own terms; elsewhere the
/// grace step is skipped. The final wait is unconditional.
async fn escalate(child: &mut Child) {
    if let Ok(Some(status)) = child.try_wait() {
        debug!(?status, "process already exited before escalation");
        return;
    }

    #[cfg(unix)]
    {
        if let Some(pid) = child.id() {
            use nix::sys::signal::{kill, Signal};
            use nix::unistd::Pid;

            let _ = kill(Pid::from_raw(pid as i32), Signal::SIGTERM);
            if let Ok(waited) = tokio::time::timeout(TERMINATE_GRACE, child.wait()).await {
                match waited {
                    Ok(status) => debug!(?status, "process exited after terminate"),
                    Err(err) => warn!(error = %err, "wait after terminate failed"),
                }
                return;
            }
            warn!(pid, "process survived terminate grace period, killing");
        }
    }

    if let Err(err) = child.kill().await {
        warn!(error = %err, "failed to kill process");
    }
    let _ = child.wait().await;
}

/// Map a finished run to its outcome. Pure: decodes both streams with invalid
/// bytes replaced and never fails itself.
pub fn classify(
    exit_code: i32,
    stdout_bytes: &[u8],
    stderr_bytes: &[u8],
    command: String,
) -> Result<AuggieRunResult> {
    let result = AuggieRunResult {
        stdout: String::from_utf8_lossy(stdout_bytes).into_owned(),
        stderr: String::from_utf8_lossy(stderr_bytes).into_owned(),
        exit_code,
        command,
    };

    if result.exit_code != 0 {
        return Err(AuggieError::CommandFailed { result });
    }
    Ok(result)
}
