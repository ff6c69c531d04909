use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A mechanism capable of running commands on a host that only accepts
/// password authentication.
///
/// Variants are declared in attempt priority order; `TransportKind::PRIORITY`
/// is the canonical ordering.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "kebab-case")]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
pub enum TransportKind {
    /// `sshpass` feeding the password to `ssh`, one connection per command.
    Sshpass,
    /// `expect` answering the first password prompt, then batch-mode `ssh`
    /// over the authenticated control socket.
    Expect,
    /// Plain `ssh` with the password and commands written to stdin.
    SshStdin,
    /// `scp` a script to the host and execute it once.
    ScpUpload,
}

impl TransportKind {
    /// All transports, most preferred first.
    pub const PRIORITY: [TransportKind; 4] = [
        TransportKind::Sshpass,
        TransportKind::Expect,
        TransportKind::SshStdin,
        TransportKind::ScpUpload,
    ];

    /// Stable identifier used in config files, flags and JSON output.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            TransportKind::Sshpass => "sshpass",
            TransportKind::Expect => "expect",
            TransportKind::SshStdin => "ssh-stdin",
            TransportKind::ScpUpload => "scp-upload",
        }
    }

    /// Executables that must be on `PATH` for this transport to be usable.
    #[must_use]
    pub fn required_executables(self) -> &'static [&'static str] {
        match self {
            TransportKind::Sshpass => &["sshpass", "ssh"],
            TransportKind::Expect => &["expect", "ssh"],
            TransportKind::SshStdin => &["ssh"],
            TransportKind::ScpUpload => &["scp", "ssh"],
        }
    }

    #[must_use]
    pub fn description(self) -> &'static str {
        match self {
            TransportKind::Sshpass => "password injected by sshpass, one connection per command",
            TransportKind::Expect => "expect handshake, then batch ssh over a control socket",
            TransportKind::SshStdin => "password and commands written to ssh stdin",
            TransportKind::ScpUpload => "script uploaded with scp and executed once",
        }
    }

    /// 1-based attempt priority.
    #[must_use]
    pub fn priority(self) -> usize {
        Self::PRIORITY
            .iter()
            .position(|k| *k == self)
            .map_or(usize::MAX, |i| i + 1)
    }
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown transport '{0}' (expected one of: sshpass, expect, ssh-stdin, scp-upload)")]
pub struct UnknownTransport(pub String);

impl FromStr for TransportKind {
    type Err = UnknownTransport;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TransportKind::PRIORITY
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| UnknownTransport(s.to_string()))
    }
}

/// Exit indicator for one command of a transport's command sequence.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CommandOutcome {
    pub command: String,
    /// `None` when the transport could not observe the exit code.
    pub exit_code: Option<i32>,
}

impl CommandOutcome {
    #[must_use]
    pub fn succeeded(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Outcome of provisioning a single host.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProvisioningResult {
    pub host: String,
    pub succeeded: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transport_used: Option<TransportKind>,
    pub verified: bool,
    /// Human-readable reason when `succeeded` is false.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ProvisioningResult {
    #[must_use]
    pub fn failed(host: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            succeeded: false,
            transport_used: None,
            verified: false,
            error: Some(error.into()),
        }
    }

    #[must_use]
    pub fn state(&self) -> HostState {
        match (self.succeeded, self.verified) {
            (true, true) => HostState::Verified,
            (true, false) => HostState::Installed,
            (false, _) => HostState::Failed,
        }
    }
}

/// Tri-state host summary shown to the operator.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HostState {
    /// Key installed and key-based login confirmed.
    Verified,
    /// Key installed, confirmation failed or was skipped.
    Installed,
    Failed,
}

/// Aggregate result of a fleet run, in input host order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FleetReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub results: Vec<ProvisioningResult>,
}

impl FleetReport {
    #[must_use]
    pub fn succeeded_count(&self) -> usize {
        self.results.iter().filter(|r| r.succeeded).count()
    }

    #[must_use]
    pub fn verified_count(&self) -> usize {
        self.results.iter().filter(|r| r.verified).count()
    }

    #[must_use]
    pub fn all_succeeded(&self) -> bool {
        self.results.iter().all(|r| r.succeeded)
    }
}

/// Availability of one transport on the local machine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TransportInventoryEntry {
    pub transport: TransportKind,
    pub priority: usize,
    pub available: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub missing: Vec<String>,
}
