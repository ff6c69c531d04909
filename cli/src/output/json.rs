//! JSON output helpers.
//!
//! `JsonRenderer` prints `fleetkey-common` types as pretty JSON on stdout;
//! `format_error` is the error object used by every `--json` code path when
//! a command fails.

use std::path::Path;

use anyhow::{Context, Result};
use fleetkey_common::{FleetReport, TransportInventoryEntry};

use crate::domain::{FleetkeyConfig, KeyStatus};

/// Machine-readable renderer.
pub struct JsonRenderer;

impl JsonRenderer {
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn render_fleet_report(report: &FleetReport) -> Result<()> {
        print_json(report)
    }

    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn render_transports(entries: &[TransportInventoryEntry]) -> Result<()> {
        print_json(&serde_json::json!({ "transports": entries }))
    }

    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn render_key_status(status: KeyStatus, private_key: &Path) -> Result<()> {
        let status = match status {
            KeyStatus::Created => "created",
            KeyStatus::AlreadyExists => "already_exists",
        };
        print_json(&serde_json::json!({
            "status": status,
            "private_key": private_key.display().to_string(),
        }))
    }

    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn render_config(config: &FleetkeyConfig, path: &Path) -> Result<()> {
        print_json(&serde_json::json!({
            "path": path.display().to_string(),
            "config": config,
        }))
    }

    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn render_version(version: &str) -> Result<()> {
        print_json(&serde_json::json!({ "version": version }))
    }
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<()> {
    let text = serde_json::to_string_pretty(value).context("JSON serialization failed")?;
    println!("{text}");
    Ok(())
}

/// Format a JSON error object.
///
/// Output (pretty-printed):
/// ```json
/// {
///   "error": true,
///   "message": "...",
///   "code": "..."
/// }
/// ```
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn format_error(message: &str, code: &str) -> Result<String> {
    let obj = serde_json::json!({
        "error": true,
        "message": message,
        "code": code,
    });
    serde_json::to_string_pretty(&obj).context("JSON serialization failed")
}
