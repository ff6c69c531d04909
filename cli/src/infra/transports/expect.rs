//! Two-phase transport: `expect` answers the password prompt once to open an
//! ssh ControlMaster, then each command reuses the master in batch mode.
//!
//! The expect program only references `$env(FLEETKEY_SSH_PASSWORD)`, so the
//! secret never appears in argv. The control socket lives in a private
//! temporary directory that is removed before returning.

use std::path::Path;

use anyhow::{Context, Result};
use fleetkey_common::{CommandOutcome, TransportKind};

use super::{TransportSettings, classify_failure, combined_output, ssh_failure};
use crate::application::ports::{CommandRunner, Invocation, ProcessRunner, RunReport};
use crate::domain::RemoteSession;
use crate::domain::error::TransportError;

const PASSWORD_ENV: &str = "FLEETKEY_SSH_PASSWORD";
/// Exit status the expect program uses when its own timeout fires.
const EXPECT_TIMEOUT_EXIT: i32 = 124;

pub struct ExpectRunner<R> {
    runner: R,
    settings: TransportSettings,
}

impl<R: ProcessRunner> ExpectRunner<R> {
    #[must_use]
    pub fn new(runner: R, settings: TransportSettings) -> Self {
        Self { runner, settings }
    }
}

/// Quotes one word for a Tcl command line.
fn tcl_quote(word: &str) -> String {
    if !word.is_empty() && !word.contains(['{', '}', '\\']) {
        return format!("{{{word}}}");
    }
    let mut out = String::with_capacity(word.len() + 2);
    out.push('"');
    for c in word.chars() {
        if matches!(c, '\\' | '"' | '$' | '[' | ']' | '{' | '}') {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('"');
    out
}

/// Expect program that spawns `ssh_args`, answers password prompts from the
/// environment, and exits with ssh's status.
///
/// ssh's terminal output is passed through so a failed handshake can be
/// classified. The password is never echoed back by the prompt.
fn handshake_script(ssh_args: &[String], timeout_secs: u64) -> String {
    let spawn = ssh_args
        .iter()
        .map(String::as_str)
        .map(tcl_quote)
        .collect::<Vec<_>>()
        .join(" ");
    format!(
        "set timeout {timeout_secs}\n\
         log_user 1\n\
         spawn -noecho ssh {spawn}\n\
         expect {{\n\
         \x20 -nocase -re {{(password|passphrase)[^:]*:}} {{ send -- \"$env({PASSWORD_ENV})\\r\"; exp_continue }}\n\
         \x20 timeout {{ exit {EXPECT_TIMEOUT_EXIT} }}\n\
         \x20 eof\n\
         }}\n\
         catch wait result\n\
         exit [lindex $result 3]\n"
    )
}

impl<R: ProcessRunner> ExpectRunner<R> {
    async fn open_master(&self, session: &RemoteSession<'_>, control_path: &str) -> Result<()> {
        let target = session.target;
        let persist = self.settings.command_timeout.as_secs().max(1) * 2;
        let mut ssh_args = self.settings.password_options(session);
        ssh_args.extend([
            "-o".to_string(),
            "ControlMaster=yes".to_string(),
            "-o".to_string(),
            format!("ControlPath={control_path}"),
            "-o".to_string(),
            format!("ControlPersist={persist}"),
            target.destination(),
            "true".to_string(),
        ]);
        let script = handshake_script(&ssh_args, self.settings.command_timeout.as_secs().max(1));
        let inv = Invocation::new("expect", vec!["-c".to_string(), script])
            .env(PASSWORD_ENV, target.password.expose())
            .timeout(self.settings.command_timeout + self.settings.connect_timeout);
        let output = self.runner.run(&inv).await?;

        match output.status.code() {
            Some(0) => Ok(()),
            Some(EXPECT_TIMEOUT_EXIT) => Err(TransportError::Timeout {
                program: "expect".to_string(),
                secs: self.settings.command_timeout.as_secs(),
            }
            .into()),
            _ => {
                let transcript = target.password.redact(&combined_output(&output));
                tracing::debug!(host = %target.hostname, output = %transcript, "expect handshake failed");
                Err(classify_failure(&target.hostname, &transcript).into())
            }
        }
    }

    async fn run_through_master(
        &self,
        session: &RemoteSession<'_>,
        control_path: &str,
        commands: &[String],
    ) -> Result<RunReport> {
        let target = session.target;
        let mut outcomes = Vec::with_capacity(commands.len());
        let mut transcript = String::new();
        for command in commands {
            let args = vec![
                "-o".to_string(),
                format!("ControlPath={control_path}"),
                "-o".to_string(),
                "BatchMode=yes".to_string(),
                target.destination(),
                command.clone(),
            ];
            let inv = Invocation::new("ssh", args).timeout(self.settings.command_timeout);
            let output = self.runner.run(&inv).await?;
            if let Some(err) = ssh_failure(&target.hostname, &output) {
                return Err(err.into());
            }
            transcript.push_str(&combined_output(&output));
            outcomes.push(CommandOutcome {
                command: command.clone(),
                exit_code: output.status.code(),
            });
        }
        Ok(RunReport::from_outcomes(outcomes, transcript))
    }

    async fn close_master(&self, session: &RemoteSession<'_>, control_path: &str) {
        let args = vec![
            "-o".to_string(),
            format!("ControlPath={control_path}"),
            "-O".to_string(),
            "exit".to_string(),
            session.target.destination(),
        ];
        let inv = Invocation::new("ssh", args).timeout(self.settings.connect_timeout);
        if let Err(e) = self.runner.run(&inv).await {
            tracing::debug!(host = %session.target.hostname, error = %e, "control master shutdown failed");
        }
    }
}

impl<R: ProcessRunner> CommandRunner for ExpectRunner<R> {
    fn transport(&self) -> TransportKind {
        TransportKind::Expect
    }

    async fn run_commands(
        &self,
        session: &RemoteSession<'_>,
        commands: &[String],
    ) -> Result<RunReport> {
        let control_dir = tempfile::Builder::new()
            .prefix("fleetkey-ctl-")
            .tempdir()
            .context("cannot create control socket directory")?;
        let socket = control_dir.path().join("cm");
        let control_path = path_str(&socket)?;

        // A failed handshake issues no commands.
        let result = match self.open_master(session, control_path).await {
            Ok(()) => self.run_through_master(session, control_path, commands).await,
            Err(e) => Err(e),
        };
        if socket.exists() {
            self.close_master(session, control_path).await;
        }
        drop(control_dir);
        result
    }
}

fn path_str(path: &Path) -> Result<&str> {
    path.to_str()
        .ok_or_else(|| anyhow::anyhow!("non UTF-8 temp path {}", path.display()))
}
