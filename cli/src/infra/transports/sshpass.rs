//! `sshpass -e ssh ...`: one connection per command, password in `SSHPASS`.

use anyhow::Result;
use fleetkey_common::{CommandOutcome, TransportKind};

use super::{TransportSettings, combined_output, ssh_failure};
use crate::application::ports::{CommandRunner, Invocation, ProcessRunner, RunReport};
use crate::domain::RemoteSession;
use crate::domain::error::TransportError;

/// sshpass: the password was rejected.
const SSHPASS_BAD_PASSWORD: i32 = 5;
/// sshpass: the host key is unknown or changed.
const SSHPASS_HOST_KEY: i32 = 6;

pub struct SshpassRunner<R> {
    runner: R,
    settings: TransportSettings,
}

impl<R: ProcessRunner> SshpassRunner<R> {
    #[must_use]
    pub fn new(runner: R, settings: TransportSettings) -> Self {
        Self { runner, settings }
    }
}

impl<R: ProcessRunner> CommandRunner for SshpassRunner<R> {
    fn transport(&self) -> TransportKind {
        TransportKind::Sshpass
    }

    async fn run_commands(
        &self,
        session: &RemoteSession<'_>,
        commands: &[String],
    ) -> Result<RunReport> {
        let target = session.target;
        let host = target.hostname.as_str();
        let destination = target.destination();
        let options = self.settings.password_options(session);

        let mut outcomes = Vec::with_capacity(commands.len());
        let mut transcript = String::new();
        for command in commands {
            let mut args = vec!["-e".to_string(), "ssh".to_string()];
            args.extend(options.iter().cloned());
            args.push(destination.clone());
            args.push(command.clone());
            let inv = Invocation::new("sshpass", args)
                .env("SSHPASS", target.password.expose())
                .timeout(self.settings.command_timeout);
            let output = self.runner.run(&inv).await?;

            match output.status.code() {
                Some(SSHPASS_BAD_PASSWORD) => {
                    return Err(TransportError::AuthRejected {
                        host: host.to_string(),
                    }
                    .into());
                }
                Some(SSHPASS_HOST_KEY) => {
                    return Err(TransportError::HostKeyRejected {
                        host: host.to_string(),
                    }
                    .into());
                }
                _ => {}
            }
            if let Some(err) = ssh_failure(host, &output) {
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
}
