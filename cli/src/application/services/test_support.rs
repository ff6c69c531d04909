//! Shared test helpers for service and adapter tests.
//!
//! Provides cross-platform `exit_status()`, canned process outputs, and
//! scripted implementations of the application ports.

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::process::Output;
use std::rc::Rc;

use anyhow::Result;
use fleetkey_common::{CommandOutcome, TransportKind};

use crate::application::ports::{
    CommandRunner, ExecutableLocator, Invocation, KeyMaterial, LoginVerifier, ProcessRunner,
    ProgressReporter, RunReport, StdinFeed, TransportFactory, TrustStore,
};
use crate::domain::error::{KeyMaterialError, TransportError, TrustError};
use crate::domain::{
    FleetMember, HostKeyPolicy, HostTarget, KeyPair, KeyStatus, Password, RemoteSession,
};

/// Build an `ExitStatus` from a logical exit code (cross-platform).
#[cfg(unix)]
pub fn exit_status(code: i32) -> std::process::ExitStatus {
    use std::os::unix::process::ExitStatusExt;
    std::process::ExitStatus::from_raw(code << 8)
}

#[cfg(windows)]
pub fn exit_status(code: i32) -> std::process::ExitStatus {
    use std::os::windows::process::ExitStatusExt;
    #[allow(clippy::cast_sign_loss)]
    std::process::ExitStatus::from_raw(code as u32)
}

pub fn ok_output(stdout: &[u8]) -> Output {
    Output {
        status: exit_status(0),
        stdout: stdout.to_vec(),
        stderr: Vec::new(),
    }
}

pub fn code_output(code: i32, stdout: &[u8]) -> Output {
    Output {
        status: exit_status(code),
        stdout: stdout.to_vec(),
        stderr: Vec::new(),
    }
}

pub fn fail_output() -> Output {
    code_output(1, b"")
}

pub const PASSWORD: &str = "hunter2-s3cret";

pub fn host(name: &str) -> HostTarget {
    HostTarget::new(name, "root", Password::new(PASSWORD)).unwrap_or_else(|e| panic!("{e}"))
}

pub fn members(names: &[&str]) -> Vec<FleetMember> {
    names.iter().map(|n| FleetMember::from(host(n))).collect()
}

pub fn key_pair() -> KeyPair {
    KeyPair {
        private_key_path: PathBuf::from("/home/op/.ssh/id_rsa"),
        public_key_path: PathBuf::from("/home/op/.ssh/id_rsa.pub"),
        public_key: "ssh-rsa AAAAB3NzaC1yc2EAAAADAQAB op@laptop".to_string(),
    }
}

// ── Event log ────────────────────────────────────────────────────────────────

#[derive(Default)]
struct LogInner {
    events: Vec<String>,
    policies: Vec<HostKeyPolicy>,
    commands: Vec<Vec<String>>,
}

/// Ordered record of port calls shared between stubs.
#[derive(Clone, Default)]
pub struct EventLog(Rc<RefCell<LogInner>>);

impl EventLog {
    pub fn push(&self, event: impl Into<String>) {
        self.0.borrow_mut().events.push(event.into());
    }

    pub fn events(&self) -> Vec<String> {
        self.0.borrow().events.clone()
    }

    /// `host:transport` for every runner call, in order.
    pub fn runs(&self) -> Vec<String> {
        self.0
            .borrow()
            .events
            .iter()
            .filter_map(|e| e.strip_prefix("run:").map(str::to_string))
            .collect()
    }

    pub fn contains(&self, event: &str) -> bool {
        self.0.borrow().events.iter().any(|e| e == event)
    }

    pub fn policies(&self) -> Vec<HostKeyPolicy> {
        self.0.borrow().policies.clone()
    }

    pub fn last_commands(&self) -> Vec<String> {
        self.0.borrow().commands.last().cloned().unwrap_or_default()
    }
}

// ── Port stubs ───────────────────────────────────────────────────────────────

pub struct OnPath(pub &'static [&'static str]);

impl ExecutableLocator for OnPath {
    fn is_available(&self, program: &str) -> bool {
        self.0.contains(&program)
    }
}

pub struct SilentReporter;

impl ProgressReporter for SilentReporter {
    fn step(&self, _: &str) {}
    fn success(&self, _: &str) {}
    fn warn(&self, _: &str) {}
}

pub struct StubTrust {
    log: EventLog,
    ok: bool,
}

impl StubTrust {
    pub fn new(log: &EventLog, ok: bool) -> Self {
        Self {
            log: log.clone(),
            ok,
        }
    }
}

impl TrustStore for StubTrust {
    async fn prime_host(&self, hostname: &str) -> Result<usize> {
        self.log.push(format!("prime:{hostname}"));
        if self.ok {
            Ok(1)
        } else {
            Err(TrustError::NoHostKeys(hostname.to_string()).into())
        }
    }
}

pub struct FixedVerifier {
    log: EventLog,
    outcome: Option<bool>,
}

impl FixedVerifier {
    /// `None` makes verification return an error.
    pub fn new(log: &EventLog, outcome: Option<bool>) -> Self {
        Self {
            log: log.clone(),
            outcome,
        }
    }
}

impl LoginVerifier for FixedVerifier {
    async fn verify(&self, target: &HostTarget, _: &KeyPair) -> Result<bool> {
        self.log.push(format!("verify:{}", target.hostname));
        self.outcome
            .ok_or_else(|| anyhow::anyhow!("ssh exited with status 255"))
    }
}

pub struct StubKeys {
    log: EventLog,
    pub fail_ensure: bool,
    pub fail_load: bool,
}

impl StubKeys {
    pub fn new(log: &EventLog) -> Self {
        Self {
            log: log.clone(),
            fail_ensure: false,
            fail_load: false,
        }
    }
}

impl KeyMaterial for StubKeys {
    async fn ensure_key_pair(&self, _: &Path) -> Result<KeyStatus> {
        self.log.push("ensure");
        if self.fail_ensure {
            return Err(KeyMaterialError::ToolMissing.into());
        }
        Ok(KeyStatus::AlreadyExists)
    }

    async fn load_key_pair(&self, private_key: &Path) -> Result<KeyPair> {
        self.log.push("load");
        if self.fail_load {
            return Err(KeyMaterialError::EmptyPublicKey(private_key.to_path_buf()).into());
        }
        Ok(key_pair())
    }
}

// ── Scripted transports ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Behaviour {
    Succeed,
    /// The connection works but every command exits 1.
    CommandFails,
    /// The transport raises `AuthRejected`.
    Error,
    Cancelled,
}

pub struct ScriptedTransports {
    log: EventLog,
    default: Behaviour,
    overrides: HashMap<(String, TransportKind), Behaviour>,
}

impl ScriptedTransports {
    pub fn new(log: &EventLog, default: Behaviour) -> Self {
        Self {
            log: log.clone(),
            default,
            overrides: HashMap::new(),
        }
    }

    #[must_use]
    pub fn with(mut self, host: &str, kind: TransportKind, behaviour: Behaviour) -> Self {
        self.overrides.insert((host.to_string(), kind), behaviour);
        self
    }
}

impl TransportFactory for ScriptedTransports {
    type Runner = ScriptedRunner;

    fn runner(&self, kind: TransportKind) -> ScriptedRunner {
        ScriptedRunner {
            kind,
            log: self.log.clone(),
            default: self.default,
            overrides: self.overrides.clone(),
        }
    }
}

pub struct ScriptedRunner {
    kind: TransportKind,
    log: EventLog,
    default: Behaviour,
    overrides: HashMap<(String, TransportKind), Behaviour>,
}

impl CommandRunner for ScriptedRunner {
    fn transport(&self) -> TransportKind {
        self.kind
    }

    async fn run_commands(
        &self,
        session: &RemoteSession<'_>,
        commands: &[String],
    ) -> Result<RunReport> {
        let hostname = session.target.hostname.clone();
        self.log.push(format!("run:{hostname}:{}", self.kind));
        {
            let mut inner = self.log.0.borrow_mut();
            inner.policies.push(session.host_keys);
            inner.commands.push(commands.to_vec());
        }
        let behaviour = self
            .overrides
            .get(&(hostname.clone(), self.kind))
            .copied()
            .unwrap_or(self.default);
        let outcomes = |code| {
            commands
                .iter()
                .map(|c| CommandOutcome {
                    command: c.clone(),
                    exit_code: Some(code),
                })
                .collect::<Vec<_>>()
        };
        match behaviour {
            Behaviour::Succeed => Ok(RunReport::from_outcomes(outcomes(0), String::new())),
            Behaviour::CommandFails => Ok(RunReport::from_outcomes(outcomes(1), String::new())),
            Behaviour::Error => Err(TransportError::AuthRejected { host: hostname }.into()),
            Behaviour::Cancelled => Err(TransportError::Cancelled.into()),
        }
    }
}

// ── Recording process runner ─────────────────────────────────────────────────

/// One captured `ProcessRunner::run` call.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub program: String,
    pub args: Vec<String>,
    pub env: Vec<(String, String)>,
    pub stdin: Vec<String>,
}

impl RecordedCall {
    /// Program and arguments joined, as they would appear in a process listing.
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn env_value(&self, key: &str) -> Option<&str> {
        self.env
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Default)]
struct RecordingInner {
    calls: RefCell<Vec<RecordedCall>>,
    responses: RefCell<VecDeque<Result<Output>>>,
    hook: RefCell<Option<Box<dyn Fn(&RecordedCall)>>>,
}

/// `ProcessRunner` that records every invocation and replays queued results.
/// Once the queue is drained every call succeeds with empty output.
#[derive(Clone, Default)]
pub struct RecordingProcess(Rc<RecordingInner>);

impl RecordingProcess {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn then(self, output: Output) -> Self {
        self.0.responses.borrow_mut().push_back(Ok(output));
        self
    }

    #[must_use]
    pub fn then_err(self, err: impl Into<anyhow::Error>) -> Self {
        self.0.responses.borrow_mut().push_back(Err(err.into()));
        self
    }

    /// Runs `hook` for every call before replaying its result.
    #[must_use]
    pub fn on_call(self, hook: impl Fn(&RecordedCall) + 'static) -> Self {
        *self.0.hook.borrow_mut() = Some(Box::new(hook));
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.0.calls.borrow().clone()
    }
}

impl ProcessRunner for RecordingProcess {
    async fn run(&self, invocation: &Invocation<'_>) -> Result<Output> {
        let call = RecordedCall {
            program: invocation.program.to_string(),
            args: invocation.args.clone(),
            env: invocation
                .env
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect(),
            stdin: match &invocation.stdin {
                StdinFeed::Null => Vec::new(),
                StdinFeed::Lines { lines, .. } => lines.iter().map(|l| (*l).to_string()).collect(),
            },
        };
        if let Some(hook) = self.0.hook.borrow().as_ref() {
            hook(&call);
        }
        self.0.calls.borrow_mut().push(call);
        self.0
            .responses
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| Ok(ok_output(b"")))
    }
}
