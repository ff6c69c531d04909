//! The four password transports behind the `CommandRunner` port.
//!
//! `Transport` is a closed enum over the variants so the provisioning engine
//! can iterate them in priority order through one `TransportFactory`.

mod expect;
mod sshpass;
mod stdin;
mod upload;

use std::path::PathBuf;
use std::process::Output;
use std::time::Duration;

use anyhow::Result;
use fleetkey_common::TransportKind;

use crate::application::ports::{CommandRunner, ProcessRunner, RunReport, TransportFactory};
use crate::domain::RemoteSession;
use crate::domain::error::TransportError;
use crate::domain::ssh::password_auth_options;

pub use expect::ExpectRunner;
pub use sshpass::SshpassRunner;
pub use stdin::StdinRunner;
pub use upload::UploadRunner;

/// Exit status ssh uses for its own errors (as opposed to the remote command's).
pub const SSH_ERROR_EXIT: i32 = 255;

/// Knobs shared by every transport.
#[derive(Debug, Clone)]
pub struct TransportSettings {
    pub known_hosts: PathBuf,
    pub connect_timeout: Duration,
    /// Bound on each external process a transport starts.
    pub command_timeout: Duration,
    /// Pause between lines written to an interactive session.
    pub line_delay: Duration,
}

impl TransportSettings {
    /// ssh/scp options for password authentication under the session's
    /// host-key policy.
    fn password_options(&self, session: &RemoteSession<'_>) -> Vec<String> {
        password_auth_options(session.host_keys, &self.known_hosts, self.connect_timeout)
    }
}

/// Stdout then stderr, lossily decoded.
fn combined_output(output: &Output) -> String {
    let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
    let stderr = String::from_utf8_lossy(&output.stderr);
    if !stderr.trim().is_empty() {
        if !text.is_empty() && !text.ends_with('\n') {
            text.push('\n');
        }
        text.push_str(&stderr);
    }
    text
}

/// Names the connection-level failure described by ssh/scp diagnostics.
fn classify_failure(host: &str, stderr: &str) -> TransportError {
    let host = host.to_string();
    if stderr.contains("Host key verification failed")
        || stderr.contains("REMOTE HOST IDENTIFICATION HAS CHANGED")
    {
        TransportError::HostKeyRejected { host }
    } else if stderr.contains("Permission denied")
        || stderr.contains("Too many authentication failures")
    {
        TransportError::AuthRejected { host }
    } else {
        TransportError::ConnectionDropped { host }
    }
}

/// `Some` when ssh itself failed (exit 255) rather than the remote command.
fn ssh_failure(host: &str, output: &Output) -> Option<TransportError> {
    (output.status.code() == Some(SSH_ERROR_EXIT))
        .then(|| classify_failure(host, &String::from_utf8_lossy(&output.stderr)))
}

/// A concrete transport.
pub enum Transport<R> {
    Sshpass(SshpassRunner<R>),
    Expect(ExpectRunner<R>),
    SshStdin(StdinRunner<R>),
    ScpUpload(UploadRunner<R>),
}

impl<R: ProcessRunner> CommandRunner for Transport<R> {
    fn transport(&self) -> TransportKind {
        match self {
            Self::Sshpass(_) => TransportKind::Sshpass,
            Self::Expect(_) => TransportKind::Expect,
            Self::SshStdin(_) => TransportKind::SshStdin,
            Self::ScpUpload(_) => TransportKind::ScpUpload,
        }
    }

    async fn run_commands(
        &self,
        session: &RemoteSession<'_>,
        commands: &[String],
    ) -> Result<RunReport> {
        match self {
            Self::Sshpass(r) => r.run_commands(session, commands).await,
            Self::Expect(r) => r.run_commands(session, commands).await,
            Self::SshStdin(r) => r.run_commands(session, commands).await,
            Self::ScpUpload(r) => r.run_commands(session, commands).await,
        }
    }
}

/// Builds transports that run local OpenSSH tooling through `runner`.
pub struct LocalTransports<R> {
    runner: R,
    settings: TransportSettings,
}

impl<R: ProcessRunner + Clone> LocalTransports<R> {
    #[must_use]
    pub fn new(runner: R, settings: TransportSettings) -> Self {
        Self { runner, settings }
    }
}

impl<R: ProcessRunner + Clone> TransportFactory for LocalTransports<R> {
    type Runner = Transport<R>;

    fn runner(&self, kind: TransportKind) -> Transport<R> {
        let runner = self.runner.clone();
        let settings = self.settings.clone();
        match kind {
            TransportKind::Sshpass => Transport::Sshpass(SshpassRunner::new(runner, settings)),
            TransportKind::Expect => Transport::Expect(ExpectRunner::new(runner, settings)),
            TransportKind::SshStdin => Transport::SshStdin(StdinRunner::new(runner, settings)),
            TransportKind::ScpUpload => Transport::ScpUpload(UploadRunner::new(runner, settings)),
        }
    }
}
