//! Unit tests for `ProvisioningEngine` through the public API.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::time::Duration;

use fleetkey_cli::application::services::provision::{ProvisionSettings, ProvisioningEngine};
use fleetkey_common::{HostState, TransportKind};

use crate::helpers::{key_pair, target};
use crate::mocks::{CollectingReporter, Journal, OnPath, Outcome, Transports, Trust, Verifier};

const ALL_TOOLS: &[&str] = &["sshpass", "expect", "ssh", "scp"];

fn engine(
    journal: &Journal,
    transports: Transports,
    tools: &'static [&'static str],
    settings: ProvisionSettings,
) -> ProvisioningEngine<Trust, Transports, OnPath, Verifier> {
    ProvisioningEngine::new(
        Trust {
            journal: journal.clone(),
            unreachable: &["cold"],
        },
        transports,
        OnPath(tools),
        Verifier {
            journal: journal.clone(),
            answer: true,
        },
        settings,
    )
}

fn verifying() -> ProvisionSettings {
    ProvisionSettings {
        verify: true,
        ..ProvisionSettings::default()
    }
}

#[tokio::test]
async fn test_first_available_transport_wins_and_is_verified() {
    let journal = Journal::default();
    let e = engine(&journal, Transports::new(&journal, Outcome::Ok), ALL_TOOLS, verifying());

    let result = e
        .provision(&target("pve1"), &key_pair(), &CollectingReporter::default())
        .await
        .expect("provision");

    assert_eq!(result.state(), HostState::Verified);
    assert_eq!(result.transport_used, Some(TransportKind::Sshpass));
    assert_eq!(
        journal.entries(),
        vec!["prime pve1", "run pve1 sshpass pinned", "verify pve1"]
    );
}

#[tokio::test]
async fn test_falls_back_in_priority_order_until_one_succeeds() {
    let journal = Journal::default();
    let transports = Transports::new(&journal, Outcome::Ok)
        .with("pve1", TransportKind::Sshpass, Outcome::AuthRejected)
        .with("pve1", TransportKind::Expect, Outcome::LastCommandFails);
    let e = engine(&journal, transports, ALL_TOOLS, verifying());

    let result = e
        .provision(&target("pve1"), &key_pair(), &CollectingReporter::default())
        .await
        .expect("provision");

    assert!(result.succeeded);
    assert_eq!(result.transport_used, Some(TransportKind::SshStdin));
    assert_eq!(journal.count_prefix("run pve1"), 3);
}

#[tokio::test]
async fn test_unavailable_transports_are_never_attempted() {
    let journal = Journal::default();
    let e = engine(&journal, Transports::new(&journal, Outcome::AuthRejected), &["ssh"], verifying());

    let result = e
        .provision(&target("pve1"), &key_pair(), &CollectingReporter::default())
        .await
        .expect("provision");

    assert!(!result.succeeded);
    assert_eq!(result.transport_used, None);
    assert_eq!(journal.count_prefix("run "), 1);
    assert!(journal.position("run pve1 ssh-stdin pinned").is_some());
    assert!(result.error.unwrap().contains("all 1 transports failed"));
}

#[tokio::test]
async fn test_unreachable_trust_falls_back_to_bypass_policy_with_warning() {
    let journal = Journal::default();
    let reporter = CollectingReporter::default();
    let e = engine(&journal, Transports::new(&journal, Outcome::Ok), ALL_TOOLS, verifying());

    let result = e
        .provision(&target("cold"), &key_pair(), &reporter)
        .await
        .expect("provision");

    assert!(result.succeeded);
    assert!(journal.position("run cold sshpass bypass").is_some());
    assert_eq!(reporter.warnings.borrow().len(), 1);
}

#[tokio::test]
async fn test_trust_priming_precedes_every_transport_attempt() {
    let journal = Journal::default();
    let transports = Transports::new(&journal, Outcome::AuthRejected)
        .with("pve1", TransportKind::ScpUpload, Outcome::Ok);
    let e = engine(&journal, transports, ALL_TOOLS, verifying());

    e.provision(&target("pve1"), &key_pair(), &CollectingReporter::default())
        .await
        .expect("provision");

    let prime = journal.position("prime pve1").expect("primed");
    let first_run = journal
        .entries()
        .iter()
        .position(|e| e.starts_with("run "))
        .expect("ran");
    assert!(prime < first_run);
}

#[tokio::test]
async fn test_no_verify_skips_login_check() {
    let journal = Journal::default();
    let e = engine(
        &journal,
        Transports::new(&journal, Outcome::Ok),
        ALL_TOOLS,
        ProvisionSettings::default(),
    );

    let result = e
        .provision(&target("pve1"), &key_pair(), &CollectingReporter::default())
        .await
        .expect("provision");

    assert_eq!(result.state(), HostState::Installed);
    assert_eq!(journal.count_prefix("verify"), 0);
}

#[tokio::test]
async fn test_allowed_set_restricts_without_reordering() {
    let journal = Journal::default();
    let settings = ProvisionSettings {
        allowed: Some(vec![TransportKind::ScpUpload, TransportKind::Expect]),
        ..ProvisionSettings::default()
    };
    let e = engine(&journal, Transports::new(&journal, Outcome::AuthRejected), ALL_TOOLS, settings);

    e.provision(&target("pve1"), &key_pair(), &CollectingReporter::default())
        .await
        .expect("provision");

    let runs: Vec<String> = journal
        .entries()
        .into_iter()
        .filter(|e| e.starts_with("run "))
        .collect();
    assert_eq!(
        runs,
        vec!["run pve1 expect pinned", "run pve1 scp-upload pinned"]
    );
}

#[tokio::test]
async fn test_settle_interval_elapses_before_verification() {
    let journal = Journal::default();
    let settings = ProvisionSettings {
        verify: true,
        settle: Duration::from_millis(50),
        allowed: None,
    };
    let e = engine(&journal, Transports::new(&journal, Outcome::Ok), ALL_TOOLS, settings);

    let start = std::time::Instant::now();
    e.provision(&target("pve1"), &key_pair(), &CollectingReporter::default())
        .await
        .expect("provision");

    assert!(start.elapsed() >= Duration::from_millis(50));
}
