//! Host targets and the credential they are reached with.
//!
//! Pure types only — nothing here is ever persisted.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use zeroize::Zeroizing;

use crate::domain::error::HostError;

/// Account provisioned when no username is given.
pub const DEFAULT_USERNAME: &str = "root";

static HOSTNAME_RE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_\[]([A-Za-z0-9._:%\[\]-]*[A-Za-z0-9_\]])?$").ok());

/// A password held in memory that is wiped on drop and never printed.
#[derive(Clone)]
pub struct Password(Zeroizing<String>);

impl Password {
    #[must_use]
    pub fn new(secret: impl Into<String>) -> Self {
        Self(Zeroizing::new(secret.into()))
    }

    /// The plaintext secret. Only transports should call this.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// `text` with every occurrence of the secret replaced by `***`.
    #[must_use]
    pub fn redact(&self, text: &str) -> String {
        if self.0.is_empty() {
            return text.to_string();
        }
        text.replace(self.0.as_str(), "***")
    }
}

impl fmt::Debug for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Password(***)")
    }
}

impl fmt::Display for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("***")
    }
}

/// One host to provision, with the account and password used to reach it.
#[derive(Debug, Clone)]
pub struct HostTarget {
    pub hostname: String,
    pub username: String,
    pub password: Password,
}

impl HostTarget {
    /// Build a target, validating hostname and username.
    ///
    /// # Errors
    ///
    /// Returns `HostError::InvalidHostname` or `HostError::InvalidUsername`
    /// if that part could be mistaken for an ssh option or contains
    /// whitespace.
    pub fn new(
        hostname: impl Into<String>,
        username: impl Into<String>,
        password: Password,
    ) -> Result<Self, HostError> {
        let hostname = hostname.into();
        let username = username.into();
        validate_hostname(&hostname)?;
        validate_username(&username)?;
        Ok(Self {
            hostname,
            username,
            password,
        })
    }

    /// `user@host` destination as passed to ssh.
    #[must_use]
    pub fn destination(&self) -> String {
        format!("{}@{}", self.username, self.hostname)
    }
}

/// Validates a hostname or IP literal.
///
/// # Errors
///
/// Returns `HostError::InvalidHostname` for empty names, names starting with
/// `-`, or names containing characters outside hostname/IP syntax.
pub fn validate_hostname(hostname: &str) -> Result<(), HostError> {
    let ok = HOSTNAME_RE
        .as_ref()
        .is_some_and(|re| re.is_match(hostname));
    if ok {
        Ok(())
    } else {
        Err(HostError::InvalidHostname(hostname.to_string()))
    }
}

fn validate_username(username: &str) -> Result<(), HostError> {
    let bad = username.is_empty()
        || username.starts_with('-')
        || username
            .chars()
            .any(|c| c.is_whitespace() || c == '@' || c.is_control());
    if bad {
        Err(HostError::InvalidUsername(username.to_string()))
    } else {
        Ok(())
    }
}

/// One entry of the host list: a usable target, or the input that was
/// rejected before any connection was attempted.
#[derive(Debug)]
pub enum FleetMember {
    Target(HostTarget),
    Rejected { host: String, error: HostError },
}

impl FleetMember {
    /// Validates `hostname` and `username`; a bad entry becomes `Rejected`.
    #[must_use]
    pub fn parse(hostname: &str, username: &str, password: Password) -> Self {
        match HostTarget::new(hostname, username, password) {
            Ok(target) => Self::Target(target),
            Err(error) => Self::Rejected {
                host: hostname.to_string(),
                error,
            },
        }
    }

    #[must_use]
    pub fn is_target(&self) -> bool {
        matches!(self, Self::Target(_))
    }

    /// The host as the operator wrote it.
    #[must_use]
    pub fn host(&self) -> &str {
        match self {
            Self::Target(target) => &target.hostname,
            Self::Rejected { host, .. } => host,
        }
    }
}

impl From<HostTarget> for FleetMember {
    fn from(target: HostTarget) -> Self {
        Self::Target(target)
    }
}

/// Parses a host list: one host per line, `#` starts a comment, commas and
/// whitespace also separate hosts. Duplicates are dropped, first wins.
#[must_use]
pub fn parse_host_list(text: &str) -> Vec<String> {
    let mut hosts: Vec<String> = Vec::new();
    for line in text.lines() {
        let line = line.split('#').next().unwrap_or_default();
        for host in line.split(|c: char| c == ',' || c.is_whitespace()) {
            if !host.is_empty() && !hosts.iter().any(|h| h == host) {
                hosts.push(host.to_string());
            }
        }
    }
    hosts
}
