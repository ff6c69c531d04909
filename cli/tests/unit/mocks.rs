//! Hand-written port implementations shared by the unit tests.

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::process::Output;
use std::rc::Rc;

use anyhow::Result;
use fleetkey_cli::application::ports::{
    CommandRunner, ExecutableLocator, Invocation, KeyMaterial, LoginVerifier, ProcessRunner,
    ProgressReporter, RunReport, TransportFactory, TrustStore,
};
use fleetkey_cli::domain::error::{TransportError, TrustError};
use fleetkey_cli::domain::{HostKeyPolicy, HostTarget, KeyPair, KeyStatus, RemoteSession};
use fleetkey_common::{CommandOutcome, TransportKind};

use crate::helpers::{key_pair, ok_output};

/// Ordered record of everything the mocks saw.
#[derive(Clone, Default)]
pub struct Journal(Rc<RefCell<Vec<String>>>);

impl Journal {
    pub fn push(&self, entry: impl Into<String>) {
        self.0.borrow_mut().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.borrow().clone()
    }

    pub fn position(&self, entry: &str) -> Option<usize> {
        self.0.borrow().iter().position(|e| e == entry)
    }

    pub fn count_prefix(&self, prefix: &str) -> usize {
        self.0.borrow().iter().filter(|e| e.starts_with(prefix)).count()
    }
}

// ── Locator ──────────────────────────────────────────────────────────────────

/// Only the listed executables exist.
pub struct OnPath(pub &'static [&'static str]);

impl ExecutableLocator for OnPath {
    fn is_available(&self, program: &str) -> bool {
        self.0.contains(&program)
    }
}

// ── Reporter ─────────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct CollectingReporter {
    pub steps: RefCell<Vec<String>>,
    pub successes: RefCell<Vec<String>>,
    pub warnings: RefCell<Vec<String>>,
}

impl ProgressReporter for CollectingReporter {
    fn step(&self, message: &str) {
        self.steps.borrow_mut().push(message.to_string());
    }
    fn success(&self, message: &str) {
        self.successes.borrow_mut().push(message.to_string());
    }
    fn warn(&self, message: &str) {
        self.warnings.borrow_mut().push(message.to_string());
    }
}

// ── Trust / keys / verification ─────────────────────────────────────────────

pub struct Trust {
    pub journal: Journal,
    pub unreachable: &'static [&'static str],
}

impl TrustStore for Trust {
    async fn prime_host(&self, hostname: &str) -> Result<usize> {
        self.journal.push(format!("prime {hostname}"));
        if self.unreachable.contains(&hostname) {
            return Err(TrustError::NoHostKeys(hostname.to_string()).into());
        }
        Ok(2)
    }
}

pub struct Keys {
    pub journal: Journal,
}

impl KeyMaterial for Keys {
    async fn ensure_key_pair(&self, _: &Path) -> Result<KeyStatus> {
        self.journal.push("ensure");
        Ok(KeyStatus::AlreadyExists)
    }
    async fn load_key_pair(&self, _: &Path) -> Result<KeyPair> {
        self.journal.push("load");
        Ok(key_pair())
    }
}

pub struct Verifier {
    pub journal: Journal,
    pub answer: bool,
}

impl LoginVerifier for Verifier {
    async fn verify(&self, target: &HostTarget, _: &KeyPair) -> Result<bool> {
        self.journal.push(format!("verify {}", target.hostname));
        Ok(self.answer)
    }
}

// ── Scripted transports ──────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug)]
pub enum Outcome {
    /// Every command exits 0.
    Ok,
    /// The last command exits 1.
    LastCommandFails,
    /// The transport aborts with an authentication error.
    AuthRejected,
}

/// Transport factory whose runners follow a per `(host, kind)` script.
#[derive(Clone)]
pub struct Transports {
    pub journal: Journal,
    pub script: Rc<HashMap<(String, TransportKind), Outcome>>,
    pub fallback: Outcome,
}

impl Transports {
    pub fn new(journal: &Journal, fallback: Outcome) -> Self {
        Self {
            journal: journal.clone(),
            script: Rc::new(HashMap::new()),
            fallback,
        }
    }

    #[must_use]
    pub fn with(mut self, host: &str, kind: TransportKind, outcome: Outcome) -> Self {
        Rc::make_mut(&mut self.script).insert((host.to_string(), kind), outcome);
        self
    }
}

pub struct Runner {
    kind: TransportKind,
    owner: Transports,
}

impl TransportFactory for Transports {
    type Runner = Runner;

    fn runner(&self, kind: TransportKind) -> Runner {
        Runner {
            kind,
            owner: self.clone(),
        }
    }
}

impl CommandRunner for Runner {
    fn transport(&self) -> TransportKind {
        self.kind
    }

    async fn run_commands(
        &self,
        session: &RemoteSession<'_>,
        commands: &[String],
    ) -> Result<RunReport> {
        let host = session.target.hostname.clone();
        let policy = match session.host_keys {
            HostKeyPolicy::Pinned => "pinned",
            HostKeyPolicy::Bypass => "bypass",
        };
        self.owner
            .journal
            .push(format!("run {host} {} {policy}", self.kind));
        let outcome = self
            .owner
            .script
            .get(&(host.clone(), self.kind))
            .copied()
            .unwrap_or(self.owner.fallback);
        let last = commands.len().saturating_sub(1);
        let outcomes = commands
            .iter()
            .enumerate()
            .map(|(i, c)| CommandOutcome {
                command: c.clone(),
                exit_code: Some(match outcome {
                    Outcome::LastCommandFails if i == last => 1,
                    _ => 0,
                }),
            })
            .collect();
        match outcome {
            Outcome::AuthRejected => Err(TransportError::AuthRejected { host }.into()),
            _ => Ok(RunReport::from_outcomes(outcomes, String::new())),
        }
    }
}

// ── Process runner ───────────────────────────────────────────────────────────

/// One recorded process invocation with owned copies of its parts.
#[derive(Debug, Clone)]
pub struct Call {
    pub program: String,
    pub args: Vec<String>,
    pub env: Vec<(String, String)>,
}

impl Call {
    pub fn line(&self) -> String {
        format!("{} {}", self.program, self.args.join(" "))
    }
}

/// Process runner answering from per-program queues; unscripted calls succeed
/// with empty output.
#[derive(Clone, Default)]
pub struct FakeProcesses {
    responses: Rc<RefCell<HashMap<String, VecDeque<Output>>>>,
    calls: Rc<RefCell<Vec<Call>>>,
}

impl FakeProcesses {
    #[must_use]
    pub fn respond(self, program: &str, output: Output) -> Self {
        self.responses
            .borrow_mut()
            .entry(program.to_string())
            .or_default()
            .push_back(output);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    pub fn programs(&self) -> Vec<String> {
        self.calls.borrow().iter().map(|c| c.program.clone()).collect()
    }
}

impl ProcessRunner for FakeProcesses {
    async fn run(&self, invocation: &Invocation<'_>) -> Result<Output> {
        self.calls.borrow_mut().push(Call {
            program: invocation.program.to_string(),
            args: invocation.args.clone(),
            env: invocation
                .env
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect(),
        });
        let next = self
            .responses
            .borrow_mut()
            .get_mut(invocation.program)
            .and_then(VecDeque::pop_front);
        Ok(next.unwrap_or_else(|| ok_output(b"")))
    }
}
