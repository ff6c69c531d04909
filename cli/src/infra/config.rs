//! The YAML config file, and the local key and known_hosts paths it names.

use std::io::Write;
use std::path::{Component, Path, PathBuf};

use anyhow::{Context, Result};

use crate::application::ports::ConfigStore;
use crate::domain::config::FleetkeyConfig;

/// Environment variable that points at an alternative config file.
pub const CONFIG_ENV: &str = "FLEETKEY_CONFIG";

/// Current user's home directory.
///
/// # Errors
///
/// Returns an error if the home directory cannot be determined.
pub fn home_dir() -> Result<PathBuf> {
    dirs::home_dir().ok_or_else(|| anyhow::anyhow!("cannot determine home directory"))
}

/// `path` with a leading `~` component replaced by `home`.
///
/// `~user/...` is left as written; only the current user's home is known.
#[must_use]
pub fn expand_tilde(path: &Path, home: &Path) -> PathBuf {
    let mut components = path.components();
    match components.next() {
        Some(Component::Normal(first)) if first == "~" => home.join(components.as_path()),
        _ => path.to_path_buf(),
    }
}

/// Private key and known_hosts file used by a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalPaths {
    pub private_key: PathBuf,
    pub known_hosts: PathBuf,
}

impl LocalPaths {
    /// Resolves the paths from a `--key` override, then the config file,
    /// then `~/.ssh/id_rsa` and `~/.ssh/known_hosts`.
    ///
    /// # Errors
    ///
    /// Returns an error if the home directory cannot be determined.
    pub fn resolve(config: &FleetkeyConfig, key_override: Option<&Path>) -> Result<Self> {
        Ok(Self::resolve_in(config, key_override, &home_dir()?))
    }

    /// Same as `resolve` with an explicit home directory.
    #[must_use]
    pub fn resolve_in(config: &FleetkeyConfig, key_override: Option<&Path>, home: &Path) -> Self {
        let ssh_dir = home.join(".ssh");
        let private_key = key_override
            .or(config.keys.path.as_deref())
            .map_or_else(|| ssh_dir.join("id_rsa"), |p| expand_tilde(p, home));
        let known_hosts = config
            .known_hosts
            .path
            .as_deref()
            .map_or_else(|| ssh_dir.join("known_hosts"), |p| expand_tilde(p, home));
        Self {
            private_key,
            known_hosts,
        }
    }
}

/// `ConfigStore` backed by `~/.fleetkey/config.yaml`, or the file named by
/// `FLEETKEY_CONFIG`.
pub struct YamlConfigStore;

impl ConfigStore for YamlConfigStore {
    fn load(&self) -> Result<FleetkeyConfig> {
        let path = self.path()?;
        if !path.exists() {
            return Ok(FleetkeyConfig::default());
        }
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("cannot read {}", path.display()))?;
        serde_yaml::from_str(&content).with_context(|| format!("cannot parse {}", path.display()))
    }

    fn save(&self, config: &FleetkeyConfig) -> Result<()> {
        let path = self.path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("cannot create {}", parent.display()))?;
        }
        let content = serde_yaml::to_string(config).context("cannot serialize config")?;

        // Written beside the target with mode 0600, then renamed over it, so
        // a reader never sees a partial or wider-permission file.
        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let mut tmp = tempfile::NamedTempFile::new_in(dir)
            .with_context(|| format!("cannot write {}", path.display()))?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tmp.as_file()
                .set_permissions(std::fs::Permissions::from_mode(0o600))
                .with_context(|| format!("cannot set permissions on {}", path.display()))?;
        }
        tmp.write_all(content.as_bytes())
            .with_context(|| format!("cannot write {}", path.display()))?;
        tmp.persist(&path)
            .with_context(|| format!("cannot write {}", path.display()))?;
        Ok(())
    }

    fn path(&self) -> Result<PathBuf> {
        let home = home_dir();
        if let Ok(val) = std::env::var(CONFIG_ENV) {
            let path = PathBuf::from(val);
            return Ok(match &home {
                Ok(home) => expand_tilde(&path, home),
                Err(_) => path,
            });
        }
        Ok(home?.join(".fleetkey").join("config.yaml"))
    }
}
