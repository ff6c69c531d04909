//! CLI argument parsing with clap derive

use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::app::AppContext;
use crate::commands;

/// Bootstrap SSH key authentication across password-only hosts
#[derive(Parser, Debug)]
#[command(
    name = "fleetkey",
    version,
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    pub no_color: bool,

    /// Log more to stderr (-v info, -vv debug); FLEETKEY_LOG overrides
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Install your public key on one or more hosts
    Provision(commands::provision::ProvisionArgs),

    /// Show which transports are available on this machine
    Transports,

    /// Create the local key pair if it does not exist
    Keygen(commands::keygen::KeygenArgs),

    /// Manage configuration
    #[command(subcommand)]
    Config(commands::config::ConfigCommand),

    /// Show version
    Version,
}

impl Cli {
    /// Execute the CLI command.
    ///
    /// # Errors
    ///
    /// Returns an error if the command fails.
    pub async fn run(self, app: &AppContext) -> Result<ExitCode> {
        match self.command {
            Command::Provision(args) => commands::provision::run(app, &args).await,
            Command::Transports => commands::transports::run(app),
            Command::Keygen(args) => commands::keygen::run(app, &args).await,
            Command::Config(cmd) => commands::config::run(app, cmd),
            Command::Version => commands::version::run(app),
        }
    }
}
