//! Application service — install the local public key on one host.
//!
//! Imports only from `crate::domain` and `crate::application::ports`.
//! All I/O is routed through injected port traits.

use std::time::Duration;

use anyhow::Result;
use fleetkey_common::{ProvisioningResult, TransportKind};

use crate::application::ports::{
    CommandRunner, ExecutableLocator, LoginVerifier, ProgressReporter, TransportFactory,
    TrustStore,
};
use crate::application::services::transport_selector::available_transports;
use crate::domain::error::{HostError, TransportError};
use crate::domain::remote::authorized_key_commands;
use crate::domain::{HostKeyPolicy, HostTarget, KeyPair, RemoteSession};

/// Per-run knobs for the engine.
#[derive(Debug, Clone, Default)]
pub struct ProvisionSettings {
    /// Pause between installation and the key-auth check.
    pub settle: Duration,
    /// Skip the key-auth check entirely when false.
    pub verify: bool,
    /// Restricts candidate transports; `None` means all.
    pub allowed: Option<Vec<TransportKind>>,
}

/// Orchestrates trust priming, transport fallback and verification for a host.
pub struct ProvisioningEngine<T, F, L, V> {
    trust: T,
    transports: F,
    locator: L,
    verifier: V,
    settings: ProvisionSettings,
}

impl<T, F, L, V> ProvisioningEngine<T, F, L, V>
where
    T: TrustStore,
    F: TransportFactory,
    L: ExecutableLocator,
    V: LoginVerifier,
{
    pub fn new(trust: T, transports: F, locator: L, verifier: V, settings: ProvisionSettings) -> Self {
        Self {
            trust,
            transports,
            locator,
            verifier,
            settings,
        }
    }

    /// Install `key_pair`'s public key for `host.username` on `host.hostname`.
    ///
    /// Transport failures are recovered here by falling back to the next
    /// transport; exhausting every transport yields `Ok` with a failed result.
    ///
    /// # Errors
    ///
    /// Returns a `HostError` if the public key cannot be installed by any
    /// transport because it is empty or malformed.
    pub async fn provision(
        &self,
        host: &HostTarget,
        key_pair: &KeyPair,
        reporter: &impl ProgressReporter,
    ) -> Result<ProvisioningResult> {
        let commands = authorized_key_commands(&key_pair.public_key)?;
        let hostname = host.hostname.as_str();

        // Priming must happen before any transport touches the host.
        let host_keys = self.prime(hostname, reporter).await;

        let available = available_transports(&self.locator, self.settings.allowed.as_deref());
        if available.is_empty() {
            reporter.warn(&format!("{hostname}: {}", HostError::NoTransport));
            tracing::error!(host = hostname, "no transport available");
            return Ok(ProvisioningResult::failed(
                hostname,
                HostError::NoTransport.to_string(),
            ));
        }

        let session = RemoteSession {
            target: host,
            host_keys,
        };
        let Some(transport) = self.install(&session, &commands, &available, reporter).await? else {
            tracing::error!(host = hostname, attempted = available.len(), "all transports failed");
            return Ok(ProvisioningResult::failed(
                hostname,
                HostError::TransportsExhausted(available.len()).to_string(),
            ));
        };
        reporter.success(&format!("{hostname}: key installed via {transport}"));

        let verified = if self.settings.verify {
            self.verify(host, key_pair, reporter).await
        } else {
            false
        };

        Ok(ProvisioningResult {
            host: hostname.to_string(),
            succeeded: true,
            transport_used: Some(transport),
            verified,
            error: None,
        })
    }

    async fn prime(&self, hostname: &str, reporter: &impl ProgressReporter) -> HostKeyPolicy {
        reporter.step(&format!("{hostname}: fetching host key"));
        match self.trust.prime_host(hostname).await {
            Ok(added) => {
                tracing::debug!(host = hostname, added, "host key recorded");
                HostKeyPolicy::Pinned
            }
            Err(e) => {
                tracing::warn!(host = hostname, error = %format!("{e:#}"), "host key priming failed; host key checking disabled for this host");
                reporter.warn(&format!("{hostname}: could not fetch host key ({e}); continuing without host key checking"));
                HostKeyPolicy::Bypass
            }
        }
    }

    /// Attempts each transport in order; returns the first that succeeded.
    async fn install(
        &self,
        session: &RemoteSession<'_>,
        commands: &[String],
        available: &[TransportKind],
        reporter: &impl ProgressReporter,
    ) -> Result<Option<TransportKind>> {
        let hostname = session.target.hostname.as_str();
        for &kind in available {
            reporter.step(&format!("{hostname}: installing key via {kind}"));
            let runner = self.transports.runner(kind);
            match runner.run_commands(session, commands).await {
                Ok(report) if report.succeeded => {
                    tracing::info!(host = hostname, transport = %kind, "key installed");
                    return Ok(Some(kind));
                }
                Ok(report) => {
                    for outcome in &report.outcomes {
                        tracing::debug!(host = hostname, transport = %kind, command = %outcome.command, exit_code = ?outcome.exit_code, "remote command");
                    }
                    let err = TransportError::CommandsFailed {
                        failed: report.failed_count(),
                        total: report.outcomes.len(),
                    };
                    tracing::warn!(host = hostname, transport = %kind, error = %err, "transport failed");
                    tracing::debug!(host = hostname, transport = %kind, output = %report.output, "transport output");
                }
                Err(e) => {
                    if matches!(
                        e.downcast_ref::<TransportError>(),
                        Some(TransportError::Cancelled)
                    ) {
                        return Err(e);
                    }
                    tracing::warn!(host = hostname, transport = %kind, error = %format!("{e:#}"), "transport failed");
                }
            }
        }
        Ok(None)
    }

    async fn verify(
        &self,
        host: &HostTarget,
        key_pair: &KeyPair,
        reporter: &impl ProgressReporter,
    ) -> bool {
        let hostname = host.hostname.as_str();
        if !self.settings.settle.is_zero() {
            tokio::time::sleep(self.settings.settle).await;
        }
        reporter.step(&format!("{hostname}: verifying key login"));
        match self.verifier.verify(host, key_pair).await {
            Ok(true) => {
                tracing::info!(host = hostname, "key login verified");
                true
            }
            Ok(false) => {
                tracing::warn!(host = hostname, "key login verification failed");
                reporter.warn(&format!("{hostname}: key installed but key login was not confirmed"));
                false
            }
            Err(e) => {
                tracing::warn!(host = hostname, error = %format!("{e:#}"), "key login verification errored");
                reporter.warn(&format!("{hostname}: key installed but verification errored ({e})"));
                false
            }
        }
    }
}
