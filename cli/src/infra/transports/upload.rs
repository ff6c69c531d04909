//! Upload-and-execute: the command sequence becomes one remote script that is
//! copied with `scp`, run once over `ssh`, and deletes itself on exit.
//!
//! Both calls authenticate through an `SSH_ASKPASS` helper that reads the
//! password from its environment.

use std::io::Write;

use anyhow::{Context, Result};
use fleetkey_common::TransportKind;

use super::{TransportSettings, classify_failure, combined_output, ssh_failure};
use crate::application::ports::{CommandRunner, Invocation, ProcessRunner, RunReport};
use crate::domain::RemoteSession;
use crate::domain::remote::{parse_exit_markers, remote_script_path, render_remote_script};
use crate::infra::askpass::AskpassHelper;

pub struct UploadRunner<R> {
    runner: R,
    settings: TransportSettings,
}

impl<R: ProcessRunner> UploadRunner<R> {
    #[must_use]
    pub fn new(runner: R, settings: TransportSettings) -> Self {
        Self { runner, settings }
    }
}

/// Runs the uploaded script; removes it even if `chmod` fails.
fn execute_line(remote_path: &str) -> String {
    format!("chmod 700 {remote_path} && {remote_path}; rc=$?; rm -f {remote_path}; exit $rc")
}

fn write_local_script(commands: &[String]) -> Result<tempfile::NamedTempFile> {
    let mut file = tempfile::Builder::new()
        .prefix("fleetkey-script-")
        .suffix(".sh")
        .tempfile()
        .context("cannot create local script")?;
    file.write_all(render_remote_script(commands).as_bytes())
        .context("cannot write local script")?;
    file.flush().context("cannot write local script")?;
    Ok(file)
}

impl<R: ProcessRunner> CommandRunner for UploadRunner<R> {
    fn transport(&self) -> TransportKind {
        TransportKind::ScpUpload
    }

    async fn run_commands(
        &self,
        session: &RemoteSession<'_>,
        commands: &[String],
    ) -> Result<RunReport> {
        let target = session.target;
        let host = target.hostname.as_str();
        let remote_path = remote_script_path(&uuid::Uuid::new_v4().simple().to_string());
        let local = write_local_script(commands)?;
        let askpass = AskpassHelper::create()?;
        let env = askpass.env(target.password.expose());
        let options = self.settings.password_options(session);

        let mut scp_args = vec!["-q".to_string()];
        scp_args.extend(options.iter().cloned());
        scp_args.push(local.path().display().to_string());
        scp_args.push(format!("{}:{remote_path}", target.destination()));
        let mut scp = Invocation::new("scp", scp_args).timeout(self.settings.command_timeout);
        scp.env.clone_from(&env);
        let copied = self.runner.run(&scp).await?;
        if !copied.status.success() {
            return Err(classify_failure(host, &String::from_utf8_lossy(&copied.stderr)).into());
        }

        let mut ssh_args = options;
        ssh_args.push(target.destination());
        ssh_args.push(execute_line(&remote_path));
        let mut ssh = Invocation::new("ssh", ssh_args).timeout(self.settings.command_timeout);
        ssh.env = env;
        let output = self.runner.run(&ssh).await?;

        let outcomes = parse_exit_markers(&String::from_utf8_lossy(&output.stdout), commands);
        if outcomes.iter().all(|o| o.exit_code.is_none())
            && let Some(err) = ssh_failure(host, &output)
        {
            return Err(err.into());
        }

        if let Err(e) = askpass.close() {
            tracing::warn!(error = %format!("{e:#}"), "askpass helper cleanup failed");
        }
        Ok(RunReport::from_outcomes(outcomes, combined_output(&output)))
    }
}
