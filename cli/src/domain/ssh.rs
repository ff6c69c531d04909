//! OpenSSH option sets and host-key record validation.
//!
//! Pure functions only — callers turn the returned argument vectors into
//! process invocations.

use std::path::Path;
use std::time::Duration;

use anyhow::Result;

use crate::domain::host::HostTarget;

/// How a transport treats the remote host key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostKeyPolicy {
    /// The key was fetched into the known-hosts file; require a match.
    Pinned,
    /// Priming failed; skip verification for this attempt.
    Bypass,
}

/// Everything a transport needs to reach one host.
#[derive(Debug, Clone, Copy)]
pub struct RemoteSession<'a> {
    pub target: &'a HostTarget,
    pub host_keys: HostKeyPolicy,
}

fn opt(args: &mut Vec<String>, value: impl Into<String>) {
    args.push("-o".to_string());
    args.push(value.into());
}

fn host_key_options(args: &mut Vec<String>, policy: HostKeyPolicy, known_hosts: &Path) {
    match policy {
        HostKeyPolicy::Pinned => {
            opt(args, "StrictHostKeyChecking=yes");
            opt(args, format!("UserKnownHostsFile={}", known_hosts.display()));
        }
        HostKeyPolicy::Bypass => {
            opt(args, "StrictHostKeyChecking=no");
            opt(args, "UserKnownHostsFile=/dev/null");
        }
    }
}

/// Options for password-authenticated `ssh`/`scp`: never prompt for a host
/// key, never fall back to key-only authentication, ask for the password once.
#[must_use]
pub fn password_auth_options(
    policy: HostKeyPolicy,
    known_hosts: &Path,
    connect_timeout: Duration,
) -> Vec<String> {
    let mut args = Vec::new();
    host_key_options(&mut args, policy, known_hosts);
    opt(&mut args, format!("ConnectTimeout={}", connect_timeout.as_secs().max(1)));
    opt(&mut args, "PreferredAuthentications=password,keyboard-interactive");
    opt(&mut args, "PubkeyAuthentication=no");
    opt(&mut args, "NumberOfPasswordPrompts=1");
    opt(&mut args, "LogLevel=ERROR");
    args
}

/// Options for the post-install login check: key only, no prompts, host key
/// not checked since the call is diagnostic.
#[must_use]
pub fn key_auth_options(private_key: &Path, connect_timeout: Duration) -> Vec<String> {
    let mut args = vec!["-i".to_string(), private_key.display().to_string()];
    opt(&mut args, "IdentitiesOnly=yes");
    opt(&mut args, "BatchMode=yes");
    opt(&mut args, "PasswordAuthentication=no");
    host_key_options(&mut args, HostKeyPolicy::Bypass, Path::new("/dev/null"));
    opt(&mut args, format!("ConnectTimeout={}", connect_timeout.as_secs().max(1)));
    opt(&mut args, "LogLevel=ERROR");
    args
}

/// Validates one `ssh-keyscan` output line: `<host> <key-type> <base64>`.
///
/// # Errors
///
/// Returns an error for comments, blank lines, unknown key types, or lines
/// with no key material.
pub fn validate_host_key_line(line: &str) -> Result<()> {
    let mut fields = line.split_whitespace();
    let (Some(host), Some(key_type), Some(material)) = (fields.next(), fields.next(), fields.next())
    else {
        anyhow::bail!("host key line must have host, type and key material (got: {line:?})");
    };
    anyhow::ensure!(!host.starts_with('#'), "comment line");
    anyhow::ensure!(
        key_type.starts_with("ssh-")
            || key_type.starts_with("ecdsa-")
            || key_type.starts_with("sk-"),
        "unsupported host key type {key_type:?}"
    );
    anyhow::ensure!(!material.trim().is_empty(), "host key has no key material");
    Ok(())
}

/// Keeps only the valid host key lines from `ssh-keyscan` output.
#[must_use]
pub fn host_key_lines(keyscan_output: &str) -> Vec<String> {
    keyscan_output
        .lines()
        .map(str::trim)
        .filter(|l| validate_host_key_line(l).is_ok())
        .map(str::to_string)
        .collect()
}
