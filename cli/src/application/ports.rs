//! Port trait definitions for the Application layer.
//!
//! Ports are the interfaces (contracts) that infrastructure must fulfill.
//! This file imports only from `crate::domain` — never from `crate::infra`,
//! `crate::commands`, or `crate::output`.

use std::path::{Path, PathBuf};
use std::process::Output;
use std::time::Duration;

use anyhow::Result;
use fleetkey_common::{CommandOutcome, TransportKind};

use crate::domain::{FleetkeyConfig, HostTarget, KeyPair, KeyStatus, RemoteSession};

// ── Value Types ───────────────────────────────────────────────────────────────

/// What to feed a child process on stdin.
#[derive(Debug, Clone, Default)]
pub enum StdinFeed<'a> {
    /// Stdin is `/dev/null`.
    #[default]
    Null,
    /// Each line is written with a trailing newline, `delay` apart, then stdin
    /// is closed.
    Lines { lines: Vec<&'a str>, delay: Duration },
}

/// A single external process invocation.
///
/// Secrets go in `env` or `stdin`, never in `args`: argument vectors are
/// visible in process listings and are logged at debug level.
#[derive(Debug, Clone)]
pub struct Invocation<'a> {
    pub program: &'a str,
    pub args: Vec<String>,
    pub env: Vec<(&'a str, &'a str)>,
    pub stdin: StdinFeed<'a>,
    /// Overrides the runner's default timeout.
    pub timeout: Option<Duration>,
}

impl<'a> Invocation<'a> {
    #[must_use]
    pub fn new(program: &'a str, args: Vec<String>) -> Self {
        Self {
            program,
            args,
            env: Vec::new(),
            stdin: StdinFeed::Null,
            timeout: None,
        }
    }

    #[must_use]
    pub fn env(mut self, key: &'a str, value: &'a str) -> Self {
        self.env.push((key, value));
        self
    }

    #[must_use]
    pub fn stdin_lines(mut self, lines: Vec<&'a str>, delay: Duration) -> Self {
        self.stdin = StdinFeed::Lines { lines, delay };
        self
    }

    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// What one transport reported for a command sequence.
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    /// True only if every command exited 0.
    pub succeeded: bool,
    pub outcomes: Vec<CommandOutcome>,
    /// Captured stdout/stderr, for diagnostics only.
    pub output: String,
}

impl RunReport {
    /// Builds a report whose success is derived from the outcomes.
    #[must_use]
    pub fn from_outcomes(outcomes: Vec<CommandOutcome>, output: String) -> Self {
        let succeeded = !outcomes.is_empty() && outcomes.iter().all(CommandOutcome::succeeded);
        Self {
            succeeded,
            outcomes,
            output,
        }
    }

    #[must_use]
    pub fn failed_count(&self) -> usize {
        self.outcomes.iter().filter(|o| !o.succeeded()).count()
    }
}

// ── Process Runner Port ───────────────────────────────────────────────────────

/// Abstracts process execution so infrastructure can be swapped or mocked.
#[allow(async_fn_in_trait)]
pub trait ProcessRunner {
    /// Run a program to completion and capture its output.
    ///
    /// # Errors
    ///
    /// Returns an error if the process cannot be spawned, exceeds its timeout
    /// (`TransportError::Timeout`), or is cancelled (`TransportError::Cancelled`).
    /// On timeout or cancellation the child process must be killed.
    async fn run(&self, invocation: &Invocation<'_>) -> Result<Output>;
}

// ── Remote Command Ports ──────────────────────────────────────────────────────

/// Runs a command sequence on a host over one transport.
///
/// Every command is attempted even if an earlier one fails; only a dropped
/// connection, rejected authentication, or timeout ends the sequence early,
/// and those are reported as `Err`.
#[allow(async_fn_in_trait)]
pub trait CommandRunner {
    fn transport(&self) -> TransportKind;

    async fn run_commands(
        &self,
        session: &RemoteSession<'_>,
        commands: &[String],
    ) -> Result<RunReport>;
}

/// Builds the runner for a transport.
pub trait TransportFactory {
    type Runner: CommandRunner;

    fn runner(&self, kind: TransportKind) -> Self::Runner;
}

/// Answers whether an executable can be found on `PATH`.
pub trait ExecutableLocator {
    fn is_available(&self, program: &str) -> bool;
}

// ── Host Trust and Identity Ports ─────────────────────────────────────────────

/// Local record of accepted host keys.
#[allow(async_fn_in_trait)]
pub trait TrustStore {
    /// Fetch `hostname`'s host keys and append them. Returns how many were added.
    async fn prime_host(&self, hostname: &str) -> Result<usize>;
}

/// The local key pair installed on every host.
#[allow(async_fn_in_trait)]
pub trait KeyMaterial {
    /// Generate the pair at `private_key` unless it already exists.
    async fn ensure_key_pair(&self, private_key: &Path) -> Result<KeyStatus>;

    /// Read the pair at `private_key`.
    async fn load_key_pair(&self, private_key: &Path) -> Result<KeyPair>;
}

/// Confirms that key-based login works after installation.
#[allow(async_fn_in_trait)]
pub trait LoginVerifier {
    async fn verify(&self, target: &HostTarget, key_pair: &KeyPair) -> Result<bool>;
}

// ── Progress Reporting Port ───────────────────────────────────────────────────

/// Abstracts progress reporting so services can emit events without
/// depending on the Presentation layer. Sync trait — no async needed.
pub trait ProgressReporter {
    /// Emit an in-progress step message.
    fn step(&self, message: &str);
    /// Emit a success message.
    fn success(&self, message: &str);
    /// Emit a warning message.
    fn warn(&self, message: &str);
}

// ── Config Port ───────────────────────────────────────────────────────────────

/// Abstracts configuration persistence.
pub trait ConfigStore {
    /// Load the configuration, returning defaults when no file exists.
    fn load(&self) -> Result<FleetkeyConfig>;
    /// Persist the configuration.
    fn save(&self, config: &FleetkeyConfig) -> Result<()>;
    /// Location of the configuration file.
    fn path(&self) -> Result<PathBuf>;
}
