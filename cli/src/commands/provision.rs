//! `fleetkey provision` — install the operator's public key on every host.

use std::io::{BufRead, IsTerminal};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Args;
use fleetkey_common::TransportKind;

use crate::app::AppContext;
use crate::application::services::config_service;
use crate::application::services::fleet::provision_fleet;
use crate::application::services::provision::{ProvisionSettings, ProvisioningEngine};
use crate::domain::transport::allowed_set;
use crate::domain::{FleetMember, FleetkeyConfig, Password, parse_host_list};
use crate::infra::config::LocalPaths;
use crate::infra::keys::SshKeygen;
use crate::infra::known_hosts::KnownHostsStore;
use crate::infra::locator::PathLocator;
use crate::infra::process::TokioProcessRunner;
use crate::infra::transports::{LocalTransports, TransportSettings};
use crate::infra::verify::SshKeyVerifier;
use crate::output::{NullReporter, TerminalReporter};

/// Environment variable holding the shared host password.
pub const PASSWORD_ENV: &str = "FLEETKEY_PASSWORD";

/// Arguments for the provision command.
#[derive(Args, Debug, Default)]
pub struct ProvisionArgs {
    /// Hosts to provision (hostname or IP; commas also separate hosts)
    #[arg(value_name = "HOST")]
    pub hosts: Vec<String>,

    /// Read hosts from a file: one per line, `#` starts a comment
    #[arg(long, value_name = "FILE")]
    pub hosts_file: Option<PathBuf>,

    /// Remote account to install the key for [default: defaults.username]
    #[arg(short, long, value_name = "USER")]
    pub user: Option<String>,

    /// Read the password from the first line of stdin
    #[arg(long)]
    pub password_stdin: bool,

    /// Private key path; the public key is `<PATH>.pub` [default: ~/.ssh/id_rsa]
    #[arg(long, value_name = "PATH")]
    pub key: Option<PathBuf>,

    /// Only try these transports (repeatable; priority order is kept)
    #[arg(long = "transport", value_enum, value_name = "KIND")]
    pub transports: Vec<TransportKind>,

    /// Skip the key-login check after installing
    #[arg(long)]
    pub no_verify: bool,
}

/// Run the provision command.
///
/// # Errors
///
/// Returns an error for invalid input, a missing password, or when the local
/// key pair cannot be prepared. Per-host failures are reported, not returned.
pub async fn run(app: &AppContext, args: &ProvisionArgs) -> Result<ExitCode> {
    let config = config_service::load_config(&app.config_store)?;
    let hosts = gather_hosts(args)?;
    if hosts.is_empty() {
        anyhow::bail!("no hosts given. Pass hosts as arguments or use --hosts-file.");
    }

    let username = args
        .user
        .clone()
        .unwrap_or_else(|| config.defaults.username.clone());
    let password = resolve_password(args, &username)?;
    let targets = fleet_members(&hosts, &username, &password);
    let LocalPaths {
        private_key,
        known_hosts,
    } = LocalPaths::resolve(&config, args.key.as_deref())?;

    let runner = TokioProcessRunner::new(config.timeouts.command(), app.cancel.clone());
    let engine = ProvisioningEngine::new(
        KnownHostsStore::with_path(known_hosts.clone(), runner.clone(), config.timeouts.keyscan()),
        LocalTransports::new(runner.clone(), transport_settings(&config, known_hosts)),
        PathLocator,
        SshKeyVerifier::new(runner.clone(), config.timeouts.connect()),
        provision_settings(&config, args),
    );
    let keys = SshKeygen::new(runner, PathLocator);

    tracing::info!(hosts = targets.len(), user = %username, "provisioning fleet");
    let report = if app.is_json() {
        provision_fleet(&engine, &keys, &private_key, &targets, &NullReporter, &app.cancel).await?
    } else {
        let reporter = TerminalReporter::new(&app.output);
        provision_fleet(&engine, &keys, &private_key, &targets, &reporter, &app.cancel).await?
    };

    app.renderer().render_fleet_report(&report)?;
    Ok(if report.all_succeeded() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

/// Positional hosts followed by the hosts file, duplicates removed.
fn gather_hosts(args: &ProvisionArgs) -> Result<Vec<String>> {
    let mut text = args.hosts.join("\n");
    if let Some(path) = &args.hosts_file {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read hosts file {}", path.display()))?;
        text.push('\n');
        text.push_str(&content);
    }
    Ok(parse_host_list(&text))
}

/// One member per host, in order. Unusable entries are kept as rejected so
/// they are reported in place.
fn fleet_members(hosts: &[String], username: &str, password: &Password) -> Vec<FleetMember> {
    hosts
        .iter()
        .map(|h| FleetMember::parse(h, username, password.clone()))
        .collect()
}

fn resolve_password(args: &ProvisionArgs, username: &str) -> Result<Password> {
    let secret = if args.password_stdin {
        read_password_line(&mut std::io::stdin().lock())?
    } else if let Ok(value) = std::env::var(PASSWORD_ENV) {
        value
    } else {
        prompt_password(username)?
    };
    if secret.is_empty() {
        anyhow::bail!("password is empty");
    }
    Ok(Password::new(secret))
}

/// First line of `reader`, without its line terminator.
fn read_password_line(reader: &mut impl BufRead) -> Result<String> {
    let mut line = String::new();
    reader
        .read_line(&mut line)
        .context("cannot read password from stdin")?;
    let trimmed = line.trim_end_matches(['\r', '\n']).to_string();
    zeroize::Zeroize::zeroize(&mut line);
    Ok(trimmed)
}

fn prompt_password(username: &str) -> Result<String> {
    if !std::io::stdin().is_terminal() {
        anyhow::bail!(
            "no password given and stdin is not a terminal. Set {PASSWORD_ENV} or use --password-stdin."
        );
    }
    dialoguer::Password::new()
        .with_prompt(format!("Password for {username}"))
        .interact()
        .context("password prompt failed")
}

fn transport_settings(config: &FleetkeyConfig, known_hosts: PathBuf) -> TransportSettings {
    TransportSettings {
        known_hosts,
        connect_timeout: config.timeouts.connect(),
        command_timeout: config.timeouts.command(),
        line_delay: config.timeouts.line_delay(),
    }
}

fn provision_settings(config: &FleetkeyConfig, args: &ProvisionArgs) -> ProvisionSettings {
    ProvisionSettings {
        settle: config.timeouts.settle(),
        verify: !args.no_verify,
        allowed: allowed_set(&args.transports, &config.transports.disabled),
    }
}
