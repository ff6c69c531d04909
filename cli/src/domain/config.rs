//! Domain types and validators for fleetkey configuration.
//!
//! Pure functions only — no I/O, no async, no filesystem access.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use fleetkey_common::TransportKind;
use serde::{Deserialize, Serialize};

use crate::domain::error::ConfigError;
use crate::domain::host::DEFAULT_USERNAME;

// ── Constants ────────────────────────────────────────────────────────────────

pub const VALID_CONFIG_KEYS: &[&str] = &[
    "defaults.username",
    "keys.path",
    "known_hosts.path",
    "timeouts.command_secs",
    "timeouts.connect_secs",
    "timeouts.keyscan_secs",
    "timeouts.settle_ms",
    "timeouts.line_delay_ms",
    "transports.disabled",
];

// ── Config schema ────────────────────────────────────────────────────────────

/// Top-level configuration stored in `~/.fleetkey/config.yaml`.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct FleetkeyConfig {
    pub defaults: Defaults,
    pub keys: KeyConfig,
    pub known_hosts: KnownHostsConfig,
    pub timeouts: Timeouts,
    pub transports: TransportConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Defaults {
    /// Account provisioned when `--user` is not given.
    pub username: String,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            username: DEFAULT_USERNAME.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct KeyConfig {
    /// Private key path. Defaults to `~/.ssh/id_rsa`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct KnownHostsConfig {
    /// Known-hosts file. Defaults to `~/.ssh/known_hosts`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

/// Bounded waits. Every remote interaction is capped by one of these.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Timeouts {
    pub command_secs: u64,
    pub connect_secs: u64,
    pub keyscan_secs: u64,
    pub settle_ms: u64,
    pub line_delay_ms: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            command_secs: 30,
            connect_secs: 10,
            keyscan_secs: 5,
            settle_ms: 2000,
            line_delay_ms: 300,
        }
    }
}

impl Timeouts {
    #[must_use]
    pub fn command(&self) -> Duration {
        Duration::from_secs(self.command_secs)
    }

    #[must_use]
    pub fn connect(&self) -> Duration {
        Duration::from_secs(self.connect_secs)
    }

    #[must_use]
    pub fn keyscan(&self) -> Duration {
        Duration::from_secs(self.keyscan_secs)
    }

    #[must_use]
    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }

    #[must_use]
    pub fn line_delay(&self) -> Duration {
        Duration::from_millis(self.line_delay_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct TransportConfig {
    /// Transports never attempted.
    pub disabled: Vec<TransportKind>,
}

// ── Validators ───────────────────────────────────────────────────────────────

/// Validates a configuration key against the whitelist.
///
/// # Errors
///
/// Returns an error if the key is not in the allowed list.
pub fn validate_config_key(key: &str) -> Result<()> {
    if !VALID_CONFIG_KEYS.contains(&key) {
        return Err(ConfigError::UnknownKey {
            key: key.to_string(),
            valid: VALID_CONFIG_KEYS.join(", "),
        }
        .into());
    }
    Ok(())
}

fn invalid(key: &str, value: &str, expected: &str) -> anyhow::Error {
    ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
        expected: expected.to_string(),
    }
    .into()
}

fn parse_positive(key: &str, value: &str) -> Result<u64> {
    match value.parse::<u64>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(invalid(key, value, "a positive integer")),
    }
}

fn parse_transport_list(key: &str, value: &str) -> Result<Vec<TransportKind>> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<TransportKind>()
                .map_err(|_| invalid(key, value, "comma-separated transports"))
        })
        .collect()
}

/// Validates a configuration value for the given key.
///
/// # Errors
///
/// Returns an error if the value is not valid for the key.
pub fn validate_config_value(key: &str, value: &str) -> Result<()> {
    match key {
        "defaults.username" if value.trim().is_empty() || value.contains(char::is_whitespace) => {
            Err(invalid(key, value, "a non-empty account name"))
        }
        "keys.path" | "known_hosts.path" if value.trim().is_empty() => {
            Err(invalid(key, value, "a file path"))
        }
        k if k.starts_with("timeouts.") => parse_positive(key, value).map(|_| ()),
        "transports.disabled" => parse_transport_list(key, value).map(|_| ()),
        _ => Ok(()),
    }
}

/// Applies a validated `key = value` to `config`.
///
/// # Errors
///
/// Returns an error if the key is unknown or the value is invalid.
pub fn apply_config_value(config: &mut FleetkeyConfig, key: &str, value: &str) -> Result<()> {
    validate_config_key(key)?;
    validate_config_value(key, value)?;
    match key {
        "defaults.username" => config.defaults.username = value.to_string(),
        "keys.path" => config.keys.path = Some(PathBuf::from(value)),
        "known_hosts.path" => config.known_hosts.path = Some(PathBuf::from(value)),
        "timeouts.command_secs" => config.timeouts.command_secs = parse_positive(key, value)?,
        "timeouts.connect_secs" => config.timeouts.connect_secs = parse_positive(key, value)?,
        "timeouts.keyscan_secs" => config.timeouts.keyscan_secs = parse_positive(key, value)?,
        "timeouts.settle_ms" => config.timeouts.settle_ms = parse_positive(key, value)?,
        "timeouts.line_delay_ms" => config.timeouts.line_delay_ms = parse_positive(key, value)?,
        "transports.disabled" => config.transports.disabled = parse_transport_list(key, value)?,
        _ => anyhow::bail!("Unknown setting: {key}"),
    }
    Ok(())
}

// ── Unit tests ───────────────────────────────────────────────────────────────
