//! Scratch `SSH_ASKPASS` helper for transports that cannot take a password on
//! stdin or from a wrapper.
//!
//! The script holds no secret: it echoes an environment variable that only
//! the child process receives.

use std::io::Write;

use anyhow::{Context, Result};
use tempfile::TempPath;

/// Variable the helper script prints.
pub const ASKPASS_SECRET_ENV: &str = "FLEETKEY_ASKPASS_SECRET";

const SCRIPT: &str = "#!/bin/sh\nprintf '%s\\n' \"$FLEETKEY_ASKPASS_SECRET\"\n";

/// An executable askpass script, deleted on drop or `close`.
pub struct AskpassHelper {
    path: TempPath,
    display: String,
}

impl AskpassHelper {
    /// Writes the helper to a private temp file (mode 700).
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be created, written or chmod'ed.
    pub fn create() -> Result<Self> {
        let mut file = tempfile::Builder::new()
            .prefix("fleetkey-askpass-")
            .suffix(".sh")
            .tempfile()
            .context("cannot create askpass helper")?;
        file.write_all(SCRIPT.as_bytes())
            .context("cannot write askpass helper")?;
        file.flush().context("cannot write askpass helper")?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            file.as_file()
                .set_permissions(std::fs::Permissions::from_mode(0o700))
                .context("cannot chmod askpass helper")?;
        }
        // Executing a file that is still open for writing fails with ETXTBSY.
        let path = file.into_temp_path();
        Ok(Self {
            path,
            display: std::env::var("DISPLAY").unwrap_or_else(|_| ":0".to_string()),
        })
    }

    #[must_use]
    pub fn path(&self) -> &std::path::Path {
        &self.path
    }

    /// Environment that makes ssh/scp call the helper for `secret`.
    #[must_use]
    pub fn env<'a>(&'a self, secret: &'a str) -> Vec<(&'a str, &'a str)> {
        vec![
            ("SSH_ASKPASS", self.path.to_str().unwrap_or_default()),
            ("SSH_ASKPASS_REQUIRE", "force"),
            ("DISPLAY", self.display.as_str()),
            (ASKPASS_SECRET_ENV, secret),
        ]
    }

    /// Deletes the helper, reporting failure.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be removed.
    pub fn close(self) -> Result<()> {
        self.path.close().context("cannot remove askpass helper")
    }
}
