//! `fleetkey transports` — show which transports this machine can use.

use std::process::ExitCode;

use anyhow::Result;

use crate::app::AppContext;
use crate::application::services::transport_selector::transport_inventory;
use crate::infra::locator::PathLocator;

/// Run the transports command.
///
/// # Errors
///
/// Returns an error if JSON rendering fails.
pub fn run(app: &AppContext) -> Result<ExitCode> {
    let inventory = transport_inventory(&PathLocator);
    app.renderer().render_transports(&inventory)?;
    Ok(ExitCode::SUCCESS)
}
