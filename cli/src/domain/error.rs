//! Typed domain error enums.
//!
//! This module has zero imports from `crate::infra`, `crate::commands`,
//! `crate::application`, `tokio`, `std::fs`, `std::process`, or `std::net`.
//! All error types implement `thiserror::Error` and convert to `anyhow::Error`
//! via the `?` operator. Callers that need to classify a failure recover the
//! typed value with `anyhow::Error::downcast_ref`.

use std::path::PathBuf;

use thiserror::Error;

// ── Key material errors ───────────────────────────────────────────────────────

/// Failures to create or read the local key pair. Fatal for the whole run.
#[derive(Debug, Error)]
pub enum KeyMaterialError {
    #[error("ssh-keygen not found on PATH; install OpenSSH client tools")]
    ToolMissing,

    #[error("cannot create key directory {path}: {reason}")]
    Directory { path: PathBuf, reason: String },

    #[error("key generation failed for {path}: {reason}")]
    Generation { path: PathBuf, reason: String },

    #[error("public key {0} is empty")]
    EmptyPublicKey(PathBuf),

    #[error("public key {path} is missing. Run 'fleetkey keygen' or remove {private} to regenerate.")]
    MissingPublicKey { path: PathBuf, private: PathBuf },
}

// ── Transport errors ──────────────────────────────────────────────────────────

/// A single transport attempt failed. Triggers fallback to the next transport.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("{program} timed out after {secs}s")]
    Timeout { program: String, secs: u64 },

    #[error("authentication rejected by {host}")]
    AuthRejected { host: String },

    #[error("host key for {host} was rejected")]
    HostKeyRejected { host: String },

    #[error("connection to {host} dropped")]
    ConnectionDropped { host: String },

    #[error("{failed} of {total} remote commands failed")]
    CommandsFailed { failed: usize, total: usize },

    #[error("failed to spawn {program}: {reason}")]
    Spawn { program: String, reason: String },

    #[error("interrupted")]
    Cancelled,
}

// ── Trust errors ──────────────────────────────────────────────────────────────

/// Host key priming failed. Logged as a warning; never fatal.
#[derive(Debug, Error)]
pub enum TrustError {
    #[error("no host keys returned for {0}")]
    NoHostKeys(String),
}

// ── Host errors ───────────────────────────────────────────────────────────────

/// Errors that fail one host without touching the rest of the fleet.
#[derive(Debug, Error)]
pub enum HostError {
    #[error("invalid hostname '{0}'")]
    InvalidHostname(String),

    #[error("invalid username '{0}'")]
    InvalidUsername(String),

    #[error("public key is empty")]
    EmptyPublicKey,

    #[error("public key must be a single line of printable text")]
    InvalidPublicKey,

    #[error("no transport available (install sshpass, expect, or an OpenSSH client)")]
    NoTransport,

    #[error("all {0} transports failed")]
    TransportsExhausted(usize),

    #[error("interrupted before provisioning started")]
    Cancelled,
}

// ── Config errors ─────────────────────────────────────────────────────────────

/// Errors related to configuration key/value validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Unknown setting: {key}\n\nValid settings: {valid}")]
    UnknownKey { key: String, valid: String },

    #[error("Invalid value for {key}: {value}\n\nExpected: {expected}")]
    InvalidValue {
        key: String,
        value: String,
        expected: String,
    },
}
