//! Infrastructure implementation of the `ProcessRunner` port.
//!
//! `TokioProcessRunner` is the production implementation that uses tokio
//! for async process execution with a guaranteed timeout, explicit kill, and
//! cooperative cancellation.

use std::process::{Output, Stdio};
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio_util::sync::CancellationToken;

use crate::application::ports::{Invocation, ProcessRunner, StdinFeed};
use crate::domain::error::TransportError;

/// Default bound on any single external process.
pub const DEFAULT_CMD_TIMEOUT: Duration = Duration::from_secs(30);

/// Production `ProcessRunner`.
///
/// `tokio::time::timeout` around `.output().await` drops the future but does
/// not reliably terminate the child, so this uses `tokio::select!` with an
/// explicit `child.kill()` on timeout and on cancellation.
#[derive(Debug, Clone)]
pub struct TokioProcessRunner {
    timeout: Duration,
    cancel: CancellationToken,
}

impl TokioProcessRunner {
    #[must_use]
    pub fn new(timeout: Duration, cancel: CancellationToken) -> Self {
        Self { timeout, cancel }
    }
}

impl Default for TokioProcessRunner {
    fn default() -> Self {
        Self::new(DEFAULT_CMD_TIMEOUT, CancellationToken::new())
    }
}

async fn read_all<R: AsyncRead + Unpin>(handle: Option<R>) -> Vec<u8> {
    let mut buf = Vec::new();
    if let Some(mut h) = handle {
        let _ = h.read_to_end(&mut buf).await;
    }
    buf
}

async fn feed_stdin(handle: Option<tokio::process::ChildStdin>, feed: &StdinFeed<'_>) {
    let (Some(mut stdin), StdinFeed::Lines { lines, delay }) = (handle, feed) else {
        return;
    };
    for (i, line) in lines.iter().enumerate() {
        if i > 0 && !delay.is_zero() {
            tokio::time::sleep(*delay).await;
        }
        // A closed pipe means the remote side already hung up; the exit
        // status tells the caller what happened.
        if stdin.write_all(line.as_bytes()).await.is_err()
            || stdin.write_all(b"\n").await.is_err()
            || stdin.flush().await.is_err()
        {
            return;
        }
    }
    // Dropping `stdin` closes the pipe.
}

impl ProcessRunner for TokioProcessRunner {
    async fn run(&self, invocation: &Invocation<'_>) -> Result<Output> {
        let program = invocation.program;
        let timeout = invocation.timeout.unwrap_or(self.timeout);
        if self.cancel.is_cancelled() {
            return Err(TransportError::Cancelled.into());
        }
        tracing::debug!(
            program,
            args = ?invocation.args,
            env = ?invocation.env.iter().map(|(k, _)| *k).collect::<Vec<_>>(),
            timeout_secs = timeout.as_secs(),
            "spawning"
        );

        let stdin = match invocation.stdin {
            StdinFeed::Null => Stdio::null(),
            StdinFeed::Lines { .. } => Stdio::piped(),
        };
        let mut child = tokio::process::Command::new(program)
            .args(&invocation.args)
            .envs(invocation.env.iter().copied())
            .stdin(stdin)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| TransportError::Spawn {
                program: program.to_string(),
                reason: e.to_string(),
            })?;

        let stdin_handle = child.stdin.take();
        let stdout_handle = child.stdout.take();
        let stderr_handle = child.stderr.take();

        tokio::select! {
            result = async {
                let ((), status, stdout, stderr) = tokio::join!(
                    feed_stdin(stdin_handle, &invocation.stdin),
                    child.wait(),
                    read_all(stdout_handle),
                    read_all(stderr_handle),
                );
                Ok(Output {
                    status: status.with_context(|| format!("waiting for {program}"))?,
                    stdout,
                    stderr,
                })
            } => result,
            () = tokio::time::sleep(timeout) => {
                let _ = child.kill().await;
                Err(TransportError::Timeout {
                    program: program.to_string(),
                    secs: timeout.as_secs(),
                }
                .into())
            }
            () = self.cancel.cancelled() => {
                let _ = child.kill().await;
                Err(TransportError::Cancelled.into())
            }
        }
    }
}
