//! Human-readable terminal renderer.

use std::path::Path;

use fleetkey_common::{FleetReport, HostState, ProvisioningResult, TransportInventoryEntry};
use owo_colors::OwoColorize as _;

use crate::domain::{FleetkeyConfig, KeyStatus};
use crate::infra::config::CONFIG_ENV;
use crate::output::{OutputContext, Styles};

/// Renders domain types as human-readable terminal output using `OutputContext`.
pub struct HumanRenderer<'a> {
    ctx: &'a OutputContext,
}

impl<'a> HumanRenderer<'a> {
    /// Create a new `HumanRenderer` wrapping the given output context.
    #[must_use]
    pub fn new(ctx: &'a OutputContext) -> Self {
        Self { ctx }
    }

    /// Render the CLI version information.
    pub fn render_version(&self, version: &str) {
        println!("fleetkey {version}");
    }

    /// Render the per-host tri-state summary. Failed hosts are always shown.
    pub fn render_fleet_report(&self, report: &FleetReport) {
        if !self.ctx.quiet {
            println!();
            self.ctx.header("Summary:");
        }
        for result in &report.results {
            let state = result.state();
            if self.ctx.quiet && state != HostState::Failed {
                continue;
            }
            println!(
                "  {} {}",
                Styles::marker(state).style(self.ctx.styles.for_state(state)),
                format_result_line(result)
            );
        }
        if !self.ctx.quiet {
            println!();
            self.ctx.info(&format_totals(report));
        }
    }

    /// Render transport availability in priority order.
    pub fn render_transports(&self, entries: &[TransportInventoryEntry]) {
        self.ctx.header("Transports (in priority order):");
        for entry in entries {
            let name = format!("{}. {:<11}", entry.priority, entry.transport.as_str());
            if entry.available {
                println!(
                    "  {} {name} {}",
                    "✓".style(self.ctx.styles.success),
                    entry.transport.description().style(self.ctx.styles.dim)
                );
            } else {
                println!(
                    "  {} {name} {}",
                    "✗".style(self.ctx.styles.error),
                    format!("missing: {}", entry.missing.join(", ")).style(self.ctx.styles.dim)
                );
            }
        }
        if !entries.iter().any(|e| e.available) {
            println!();
            self.ctx
                .warn("No transport available. Install sshpass, expect, or an OpenSSH client.");
        }
    }

    /// Render the outcome of `keygen`.
    pub fn render_key_status(&self, status: KeyStatus, private_key: &Path) {
        match status {
            KeyStatus::Created => self
                .ctx
                .success(&format!("Generated key pair {}", private_key.display())),
            KeyStatus::AlreadyExists => self.ctx.info(&format!(
                "Key pair already exists at {}",
                private_key.display()
            )),
        }
    }

    /// Render the current fleetkey configuration.
    pub fn render_config(&self, config: &FleetkeyConfig, path: &Path) {
        println!();
        println!(
            "  {}",
            format!("Configuration ({})", path.display()).style(self.ctx.styles.header)
        );
        println!();
        let default = "(default)".to_string();
        let rows = [
            ("defaults.username:", config.defaults.username.clone()),
            (
                "keys.path:",
                config
                    .keys
                    .path
                    .as_ref()
                    .map_or_else(|| default.clone(), |p| p.display().to_string()),
            ),
            (
                "known_hosts.path:",
                config
                    .known_hosts
                    .path
                    .as_ref()
                    .map_or_else(|| default.clone(), |p| p.display().to_string()),
            ),
            ("timeouts.command_secs:", config.timeouts.command_secs.to_string()),
            ("timeouts.connect_secs:", config.timeouts.connect_secs.to_string()),
            ("timeouts.keyscan_secs:", config.timeouts.keyscan_secs.to_string()),
            ("timeouts.settle_ms:", config.timeouts.settle_ms.to_string()),
            ("timeouts.line_delay_ms:", config.timeouts.line_delay_ms.to_string()),
            (
                "transports.disabled:",
                if config.transports.disabled.is_empty() {
                    "(none)".to_string()
                } else {
                    config
                        .transports
                        .disabled
                        .iter()
                        .map(|t| t.as_str())
                        .collect::<Vec<_>>()
                        .join(", ")
                },
            ),
        ];
        for (key, value) in rows {
            println!("  {key:<24} {value}");
        }
        println!();
        println!("  {}", "Environment:".style(self.ctx.styles.bold));
        println!(
            "    {:<18} {}",
            format!("{CONFIG_ENV}:"),
            std::env::var(CONFIG_ENV).unwrap_or_else(|_| "(not set)".to_string())
        );
        println!(
            "    {:<18} {}",
            "NO_COLOR:",
            std::env::var("NO_COLOR").unwrap_or_else(|_| "(not set)".to_string())
        );
    }
}

/// Label for a host's final state.
#[must_use]
pub fn host_state_label(state: HostState) -> &'static str {
    match state {
        HostState::Verified => "verified",
        HostState::Installed => "installed (unverified)",
        HostState::Failed => "failed",
    }
}

/// One summary line: host, state, and the transport or the error.
#[must_use]
pub fn format_result_line(result: &ProvisioningResult) -> String {
    let state = host_state_label(result.state());
    match (&result.transport_used, &result.error) {
        (Some(t), _) => format!("{:<24} {state} via {t}", result.host),
        (None, Some(e)) => format!("{:<24} {state}: {e}", result.host),
        (None, None) => format!("{:<24} {state}", result.host),
    }
}

/// `"2/3 hosts provisioned, 1 verified"`.
#[must_use]
pub fn format_totals(report: &FleetReport) -> String {
    format!(
        "{}/{} hosts provisioned, {} verified",
        report.succeeded_count(),
        report.results.len(),
        report.verified_count()
    )
}
