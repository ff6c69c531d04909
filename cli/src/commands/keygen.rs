//! `fleetkey keygen` — create the local key pair if it does not exist.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::Args;

use crate::app::AppContext;
use crate::application::ports::KeyMaterial;
use crate::application::services::config_service;
use crate::infra::config::LocalPaths;
use crate::infra::keys::SshKeygen;
use crate::infra::locator::PathLocator;
use crate::infra::process::TokioProcessRunner;

/// Arguments for the keygen command.
#[derive(Args, Debug, Default)]
pub struct KeygenArgs {
    /// Private key path [default: keys.path or ~/.ssh/id_rsa]
    #[arg(long, value_name = "PATH")]
    pub key: Option<PathBuf>,
}

/// Run the keygen command.
///
/// # Errors
///
/// Returns an error if `ssh-keygen` is missing or fails.
pub async fn run(app: &AppContext, args: &KeygenArgs) -> Result<ExitCode> {
    let config = config_service::load_config(&app.config_store)?;
    let private_key = LocalPaths::resolve(&config, args.key.as_deref())?.private_key;
    let runner = TokioProcessRunner::new(config.timeouts.command(), app.cancel.clone());
    let status = SshKeygen::new(runner, PathLocator)
        .ensure_key_pair(&private_key)
        .await?;
    app.renderer().render_key_status(status, &private_key)?;
    Ok(ExitCode::SUCCESS)
}
