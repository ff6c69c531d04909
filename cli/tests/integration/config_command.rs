//! Integration tests for `fleetkey config`.
//!
//! Every test sets `FLEETKEY_CONFIG` to a temp path so it never reads or
//! writes `~/.fleetkey/config.yaml`.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn fleetkey() -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("fleetkey"));
    cmd.env("NO_COLOR", "1");
    cmd
}

/// Returns a `TempDir` and the path string for a config file inside it.
fn temp_config_path() -> (TempDir, String) {
    let dir = TempDir::new().expect("temp dir");
    let path = dir
        .path()
        .join("config.yaml")
        .to_string_lossy()
        .into_owned();
    (dir, path)
}

#[test]
fn test_config_help_shows_show_and_set_subcommands() {
    fleetkey()
        .args(["config", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("show"))
        .stdout(predicate::str::contains("set"));
}

#[test]
fn test_config_show_without_file_prints_defaults() {
    let (_dir, path) = temp_config_path();
    fleetkey()
        .args(["config", "show"])
        .env("FLEETKEY_CONFIG", &path)
        .assert()
        .success()
        .stdout(predicate::str::contains("defaults.username:"))
        .stdout(predicate::str::contains("root"));
}

#[test]
fn test_config_show_json_includes_path() {
    let (_dir, path) = temp_config_path();
    let output = fleetkey()
        .args(["config", "show", "--json"])
        .env("FLEETKEY_CONFIG", &path)
        .output()
        .expect("run");
    assert!(output.status.success());
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).expect("json");
    assert_eq!(value["path"], path.as_str());
    assert_eq!(value["config"]["timeouts"]["command_secs"], 30);
}

#[test]
fn test_config_set_persists_value() {
    let (_dir, path) = temp_config_path();
    fleetkey()
        .args(["config", "set", "defaults.username", "admin"])
        .env("FLEETKEY_CONFIG", &path)
        .assert()
        .success()
        .stdout(predicate::str::contains("Set defaults.username = admin"));

    let content = std::fs::read_to_string(&path).expect("config written");
    assert!(content.contains("admin"));
}

#[cfg(unix)]
#[test]
fn test_config_set_writes_owner_only_file() {
    use std::os::unix::fs::PermissionsExt;

    let (_dir, path) = temp_config_path();
    fleetkey()
        .args(["config", "set", "timeouts.command_secs", "45"])
        .env("FLEETKEY_CONFIG", &path)
        .assert()
        .success();

    let mode = std::fs::metadata(&path).unwrap().permissions().mode() & 0o777;
    assert_eq!(mode, 0o600);
}

#[test]
fn test_config_set_unknown_key_fails() {
    let (_dir, path) = temp_config_path();
    fleetkey()
        .args(["config", "set", "security.level", "high"])
        .env("FLEETKEY_CONFIG", &path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown setting"));
    assert!(!std::path::Path::new(&path).exists());
}

#[test]
fn test_config_set_invalid_value_fails() {
    let (_dir, path) = temp_config_path();
    fleetkey()
        .args(["config", "set", "timeouts.command_secs", "soon"])
        .env("FLEETKEY_CONFIG", &path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid value"));
}
