//! Known-hosts trust store — fetches host keys with `ssh-keyscan` and
//! appends them to an OpenSSH `known_hosts` file.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};

use crate::application::ports::{Invocation, ProcessRunner, TrustStore};
use crate::domain::error::TrustError;
use crate::domain::ssh::host_key_lines;

/// Slack added on top of `ssh-keyscan -T` so the tool's own timeout fires first.
const KEYSCAN_GRACE: Duration = Duration::from_secs(2);

/// Manages the operator's `known_hosts` file.
pub struct KnownHostsStore<R> {
    path: PathBuf,
    runner: R,
    keyscan_timeout: Duration,
}

impl<R: ProcessRunner> KnownHostsStore<R> {
    /// Creates a store pointing at `~/.ssh/known_hosts`.
    ///
    /// # Errors
    ///
    /// Returns an error if the home directory cannot be determined.
    pub fn new(runner: R, keyscan_timeout: Duration) -> Result<Self> {
        Ok(Self::with_path(
            crate::infra::config::home_dir()?.join(".ssh").join("known_hosts"),
            runner,
            keyscan_timeout,
        ))
    }

    /// Creates a store pointing at an arbitrary path.
    #[must_use]
    pub fn with_path(path: PathBuf, runner: R, keyscan_timeout: Duration) -> Self {
        Self {
            path,
            runner,
            keyscan_timeout,
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends `lines` to the file, creating it (600) and its parent
    /// directory (700) when absent. Existing content is never rewritten.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory or file cannot be created or written.
    pub fn append(&self, lines: &[String]) -> Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create dir {}", parent.display()))?;
            set_permissions(parent, 0o700)?;
        }

        let mut options = std::fs::OpenOptions::new();
        options.create(true).append(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
        let mut file = options
            .open(&self.path)
            .with_context(|| format!("open {}", self.path.display()))?;
        for line in lines {
            writeln!(file, "{line}").with_context(|| format!("write {}", self.path.display()))?;
        }
        Ok(())
    }
}

impl<R: ProcessRunner> TrustStore for KnownHostsStore<R> {
    async fn prime_host(&self, hostname: &str) -> Result<usize> {
        let secs = self.keyscan_timeout.as_secs().max(1);
        let inv = Invocation::new(
            "ssh-keyscan",
            vec!["-T".to_string(), secs.to_string(), hostname.to_string()],
        )
        .timeout(self.keyscan_timeout + KEYSCAN_GRACE);
        let output = self
            .runner
            .run(&inv)
            .await
            .with_context(|| format!("ssh-keyscan {hostname}"))?;

        let lines = host_key_lines(&String::from_utf8_lossy(&output.stdout));
        if lines.is_empty() {
            return Err(TrustError::NoHostKeys(hostname.to_string()).into());
        }
        self.append(&lines)?;
        tracing::debug!(host = hostname, keys = lines.len(), path = %self.path.display(), "host keys appended");
        Ok(lines.len())
    }
}

#[cfg(unix)]
fn set_permissions(path: &Path, mode: u32) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode))
        .with_context(|| format!("set permissions on {}", path.display()))
}

#[cfg(not(unix))]
fn set_permissions(_path: &Path, _mode: u32) -> Result<()> {
    Ok(())
}
