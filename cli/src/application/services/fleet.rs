//! Application service — provision a list of hosts one after another.
//!
//! Imports only from `crate::domain` and `crate::application`.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::Utc;
use fleetkey_common::{FleetReport, ProvisioningResult};
use tokio_util::sync::CancellationToken;

use crate::application::ports::{
    ExecutableLocator, KeyMaterial, LoginVerifier, ProgressReporter, TransportFactory, TrustStore,
};
use crate::application::services::provision::ProvisioningEngine;
use crate::domain::error::{HostError, TransportError};
use crate::domain::{FleetMember, KeyStatus};

/// Ensure the local key pair, then provision every host in order.
///
/// A host's failure never stops the run; the report holds exactly one result
/// per input host, in input order. Rejected entries are reported as failed
/// without being contacted, as are the remaining hosts after cancellation.
///
/// # Errors
///
/// Returns an error only if the key pair cannot be created or read.
pub async fn provision_fleet<K, T, F, L, V>(
    engine: &ProvisioningEngine<T, F, L, V>,
    keys: &K,
    private_key: &Path,
    hosts: &[FleetMember],
    reporter: &impl ProgressReporter,
    cancel: &CancellationToken,
) -> Result<FleetReport>
where
    K: KeyMaterial,
    T: TrustStore,
    F: TransportFactory,
    L: ExecutableLocator,
    V: LoginVerifier,
{
    let started_at = Utc::now();

    // Nothing to install, so no key pair is needed.
    if !hosts.iter().any(FleetMember::is_target) {
        let results = hosts
            .iter()
            .filter_map(|member| match member {
                FleetMember::Rejected { host, error } => Some(reject(host, error, reporter)),
                FleetMember::Target(_) => None,
            })
            .collect();
        return Ok(FleetReport {
            started_at,
            finished_at: Utc::now(),
            results,
        });
    }

    match keys
        .ensure_key_pair(private_key)
        .await
        .context("failed to prepare local key pair")?
    {
        KeyStatus::Created => {
            reporter.success(&format!("generated key pair {}", private_key.display()));
        }
        KeyStatus::AlreadyExists => {
            tracing::debug!(path = %private_key.display(), "using existing key pair");
        }
    }
    let key_pair = keys
        .load_key_pair(private_key)
        .await
        .context("failed to read local key pair")?;

    let mut results = Vec::with_capacity(hosts.len());
    for member in hosts {
        let hostname = member.host();
        let host = match member {
            FleetMember::Target(target) => target,
            FleetMember::Rejected { host, error } => {
                results.push(reject(host, error, reporter));
                continue;
            }
        };
        if cancel.is_cancelled() {
            results.push(ProvisioningResult::failed(
                hostname,
                HostError::Cancelled.to_string(),
            ));
            continue;
        }

        let result = match engine.provision(host, &key_pair, reporter).await {
            Ok(result) => result,
            Err(e) => {
                let message = if matches!(
                    e.downcast_ref::<TransportError>(),
                    Some(TransportError::Cancelled)
                ) {
                    TransportError::Cancelled.to_string()
                } else {
                    format!("{e:#}")
                };
                tracing::error!(host = hostname, error = %message, "host failed");
                ProvisioningResult::failed(hostname, message)
            }
        };
        if !result.succeeded {
            reporter.warn(&format!(
                "{hostname}: failed ({})",
                result.error.as_deref().unwrap_or("unknown error")
            ));
        }
        results.push(result);
    }

    Ok(FleetReport {
        started_at,
        finished_at: Utc::now(),
        results,
    })
}

fn reject(host: &str, error: &HostError, reporter: &impl ProgressReporter) -> ProvisioningResult {
    tracing::error!(host, error = %error, "host rejected");
    reporter.warn(&format!("{host}: failed ({error})"));
    ProvisioningResult::failed(host, error.to_string())
}
