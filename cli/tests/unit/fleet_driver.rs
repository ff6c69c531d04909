//! Unit tests for `provision_fleet` through the public API.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::path::Path;

use fleetkey_cli::application::services::fleet::provision_fleet;
use fleetkey_cli::application::services::provision::{ProvisionSettings, ProvisioningEngine};
use fleetkey_common::{HostState, TransportKind};
use tokio_util::sync::CancellationToken;

use crate::helpers::fleet;
use crate::mocks::{
    CollectingReporter, Journal, Keys, OnPath, Outcome, Transports, Trust, Verifier,
};

fn engine(
    journal: &Journal,
    transports: Transports,
    verified: bool,
) -> ProvisioningEngine<Trust, Transports, OnPath, Verifier> {
    ProvisioningEngine::new(
        Trust {
            journal: journal.clone(),
            unreachable: &[],
        },
        transports,
        OnPath(&["sshpass", "ssh"]),
        Verifier {
            journal: journal.clone(),
            answer: verified,
        },
        ProvisionSettings {
            verify: true,
            ..ProvisionSettings::default()
        },
    )
}

#[tokio::test]
async fn test_fleet_report_has_one_result_per_host_in_input_order() {
    let journal = Journal::default();
    let transports = Transports::new(&journal, Outcome::Ok)
        .with("pve2", TransportKind::Sshpass, Outcome::AuthRejected)
        .with("pve2", TransportKind::SshStdin, Outcome::AuthRejected);
    let e = engine(&journal, transports, true);
    let hosts = fleet(&["pve1", "pve2", "pve3"]);
    let keys = Keys {
        journal: journal.clone(),
    };

    let report = provision_fleet(
        &e,
        &keys,
        Path::new("/home/op/.ssh/id_ed25519"),
        &hosts,
        &CollectingReporter::default(),
        &CancellationToken::new(),
    )
    .await
    .expect("fleet");

    let states: Vec<(String, HostState)> = report
        .results
        .iter()
        .map(|r| (r.host.clone(), r.state()))
        .collect();
    assert_eq!(
        states,
        vec![
            ("pve1".to_string(), HostState::Verified),
            ("pve2".to_string(), HostState::Failed),
            ("pve3".to_string(), HostState::Verified),
        ]
    );
    assert_eq!(report.succeeded_count(), 2);
    assert!(report.started_at <= report.finished_at);
}

#[tokio::test]
async fn test_key_pair_is_prepared_once_before_any_host() {
    let journal = Journal::default();
    let e = engine(&journal, Transports::new(&journal, Outcome::Ok), true);
    let keys = Keys {
        journal: journal.clone(),
    };

    provision_fleet(
        &e,
        &keys,
        Path::new("/k"),
        &fleet(&["a", "b"]),
        &CollectingReporter::default(),
        &CancellationToken::new(),
    )
    .await
    .expect("fleet");

    let entries = journal.entries();
    assert_eq!(entries[0], "ensure");
    assert_eq!(entries[1], "load");
    assert_eq!(journal.count_prefix("ensure"), 1);
    assert_eq!(journal.count_prefix("load"), 1);
}

#[tokio::test]
async fn test_failed_verification_still_counts_as_installed() {
    let journal = Journal::default();
    let e = engine(&journal, Transports::new(&journal, Outcome::Ok), false);
    let keys = Keys {
        journal: journal.clone(),
    };

    let report = provision_fleet(
        &e,
        &keys,
        Path::new("/k"),
        &fleet(&["pve1"]),
        &CollectingReporter::default(),
        &CancellationToken::new(),
    )
    .await
    .expect("fleet");

    assert_eq!(report.results[0].state(), HostState::Installed);
    assert!(report.all_succeeded());
}

#[tokio::test]
async fn test_cancelled_run_contacts_no_host_but_reports_all() {
    let journal = Journal::default();
    let e = engine(&journal, Transports::new(&journal, Outcome::Ok), true);
    let keys = Keys {
        journal: journal.clone(),
    };
    let cancel = CancellationToken::new();
    cancel.cancel();

    let report = provision_fleet(
        &e,
        &keys,
        Path::new("/k"),
        &fleet(&["a", "b"]),
        &CollectingReporter::default(),
        &cancel,
    )
    .await
    .expect("fleet");

    assert_eq!(report.results.len(), 2);
    assert!(report.results.iter().all(|r| !r.succeeded));
    assert_eq!(journal.count_prefix("prime"), 0);
    assert_eq!(journal.count_prefix("run"), 0);
}

#[tokio::test]
async fn test_unusable_host_entry_fails_alone_and_keeps_its_place() {
    let journal = Journal::default();
    let e = engine(&journal, Transports::new(&journal, Outcome::Ok), true);
    let keys = Keys {
        journal: journal.clone(),
    };

    let report = provision_fleet(
        &e,
        &keys,
        Path::new("/k"),
        &fleet(&["pve1", "host!", "pve3"]),
        &CollectingReporter::default(),
        &CancellationToken::new(),
    )
    .await
    .expect("fleet");

    let states: Vec<(&str, HostState)> = report
        .results
        .iter()
        .map(|r| (r.host.as_str(), r.state()))
        .collect();
    assert_eq!(
        states,
        vec![
            ("pve1", HostState::Verified),
            ("host!", HostState::Failed),
            ("pve3", HostState::Verified),
        ]
    );
    assert_eq!(journal.count_prefix("prime"), 2);
    assert!(!report.all_succeeded());
}
