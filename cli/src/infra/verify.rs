//! `LoginVerifier` that runs a no-op command over key-only ssh.

use std::time::Duration;

use anyhow::Result;

use crate::application::ports::{Invocation, LoginVerifier, ProcessRunner};
use crate::domain::ssh::key_auth_options;
use crate::domain::{HostTarget, KeyPair};

/// Printed by the remote side when key login works.
pub const VERIFY_MARKER: &str = "fleetkey-verified";

pub struct SshKeyVerifier<R> {
    runner: R,
    connect_timeout: Duration,
}

impl<R: ProcessRunner> SshKeyVerifier<R> {
    #[must_use]
    pub fn new(runner: R, connect_timeout: Duration) -> Self {
        Self {
            runner,
            connect_timeout,
        }
    }
}

impl<R: ProcessRunner> LoginVerifier for SshKeyVerifier<R> {
    async fn verify(&self, target: &HostTarget, key_pair: &KeyPair) -> Result<bool> {
        let mut args = key_auth_options(&key_pair.private_key_path, self.connect_timeout);
        args.push(target.destination());
        args.push(format!("echo {VERIFY_MARKER}"));
        let output = self.runner.run(&Invocation::new("ssh", args)).await?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let ok = output.status.success() && stdout.lines().any(|l| l.trim() == VERIFY_MARKER);
        if !ok {
            tracing::debug!(
                host = %target.hostname,
                status = %output.status,
                stderr = %String::from_utf8_lossy(&output.stderr).trim(),
                "key login check failed"
            );
        }
        Ok(ok)
    }
}
