//! `ssh -T` with the password and every command written to stdin.
//!
//! Lines are spaced by `line_delay` so the remote side never reads a command
//! as part of the password or of the previous line. Exit codes come back as
//! marker lines in the session output.

use anyhow::Result;
use fleetkey_common::TransportKind;

use super::{TransportSettings, combined_output, ssh_failure};
use crate::application::ports::{CommandRunner, Invocation, ProcessRunner, RunReport};
use crate::domain::RemoteSession;
use crate::domain::remote::{parse_exit_markers, session_lines};

pub struct StdinRunner<R> {
    runner: R,
    settings: TransportSettings,
}

impl<R: ProcessRunner> StdinRunner<R> {
    #[must_use]
    pub fn new(runner: R, settings: TransportSettings) -> Self {
        Self { runner, settings }
    }
}

impl<R: ProcessRunner> CommandRunner for StdinRunner<R> {
    fn transport(&self) -> TransportKind {
        TransportKind::SshStdin
    }

    async fn run_commands(
        &self,
        session: &RemoteSession<'_>,
        commands: &[String],
    ) -> Result<RunReport> {
        let target = session.target;
        let mut args = vec!["-T".to_string()];
        args.extend(self.settings.password_options(session));
        args.push(target.destination());

        let script = session_lines(commands);
        let mut lines = Vec::with_capacity(script.len() + 1);
        lines.push(target.password.expose());
        lines.extend(script.iter().map(String::as_str));

        let inv = Invocation::new("ssh", args)
            .stdin_lines(lines, self.settings.line_delay)
            .timeout(self.settings.command_timeout);
        let output = self.runner.run(&inv).await?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let outcomes = parse_exit_markers(&stdout, commands);
        if outcomes.iter().all(|o| o.exit_code.is_none())
            && let Some(err) = ssh_failure(&target.hostname, &output)
        {
            return Err(err.into());
        }
        let transcript = target.password.redact(&combined_output(&output));
        Ok(RunReport::from_outcomes(outcomes, transcript))
    }
}
