//! fleetkey - bootstrap SSH key authentication across password-only hosts

use std::process::ExitCode;

use clap::Parser;
use fleetkey_cli::app::{AppContext, AppFlags};
use fleetkey_cli::cli::Cli;
use fleetkey_cli::output::json;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Overrides the `-v` derived log filter when set.
const LOG_ENV: &str = "FLEETKEY_LOG";
/// Conventional exit status after SIGINT.
const INTERRUPTED_EXIT: u8 = 130;

fn init_tracing(verbose: u8) {
    let fallback = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(fallback));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupted, stopping after the current step");
            on_signal.cancel();
        }
    });

    let app = AppContext::new(
        &AppFlags {
            no_color: cli.no_color,
            quiet: cli.quiet,
            json: cli.json,
        },
        cancel.clone(),
    );

    let result = cli.run(&app).await;
    if cancel.is_cancelled() {
        return ExitCode::from(INTERRUPTED_EXIT);
    }
    match result {
        Ok(code) => code,
        Err(e) => {
            if app.is_json() {
                match json::format_error(&format!("{e:#}"), "ERROR") {
                    Ok(text) => println!("{text}"),
                    Err(_) => eprintln!("Error: {e:#}"),
                }
            } else {
                app.output.error(&format!("{e:#}"));
            }
            ExitCode::FAILURE
        }
    }
}
