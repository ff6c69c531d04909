//! Application service — configuration use-cases.

use anyhow::Result;

use crate::application::ports::ConfigStore;
use crate::domain::config::{FleetkeyConfig, apply_config_value};

/// Load configuration.
///
/// # Errors
///
/// Returns an error if the config file exists but cannot be read or parsed.
pub fn load_config(store: &impl ConfigStore) -> Result<FleetkeyConfig> {
    store.load()
}

/// Validate and persist one setting, returning the updated configuration.
///
/// # Errors
///
/// Returns an error if the key or value is invalid or the file cannot be written.
pub fn set_config_value(store: &impl ConfigStore, key: &str, value: &str) -> Result<FleetkeyConfig> {
    let mut config = store.load()?;
    apply_config_value(&mut config, key, value)?;
    store.save(&config)?;
    Ok(config)
}
