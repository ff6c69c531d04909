//! `KeyMaterial` backed by `ssh-keygen`.

use std::path::Path;

use anyhow::Result;

use crate::application::ports::{ExecutableLocator, Invocation, KeyMaterial, ProcessRunner};
use crate::domain::error::KeyMaterialError;
use crate::domain::keys::{KeyPair, KeyStatus, RSA_KEY_BITS, public_key_path};

const KEYGEN: &str = "ssh-keygen";

/// Generates and reads the operator key pair.
pub struct SshKeygen<R, L> {
    runner: R,
    locator: L,
}

impl<R: ProcessRunner, L: ExecutableLocator> SshKeygen<R, L> {
    #[must_use]
    pub fn new(runner: R, locator: L) -> Self {
        Self { runner, locator }
    }
}

fn ensure_parent(private_key: &Path) -> Result<(), KeyMaterialError> {
    let Some(parent) = private_key.parent() else {
        return Ok(());
    };
    if parent.as_os_str().is_empty() || parent.exists() {
        return Ok(());
    }
    let directory = |e: std::io::Error| KeyMaterialError::Directory {
        path: parent.to_path_buf(),
        reason: e.to_string(),
    };
    std::fs::create_dir_all(parent).map_err(directory)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(parent, std::fs::Permissions::from_mode(0o700))
            .map_err(directory)?;
    }
    Ok(())
}

impl<R: ProcessRunner, L: ExecutableLocator> KeyMaterial for SshKeygen<R, L> {
    async fn ensure_key_pair(&self, private_key: &Path) -> Result<KeyStatus> {
        if private_key.exists() {
            tracing::debug!(path = %private_key.display(), "key pair already exists");
            return Ok(KeyStatus::AlreadyExists);
        }
        if !self.locator.is_available(KEYGEN) {
            return Err(KeyMaterialError::ToolMissing.into());
        }
        ensure_parent(private_key)?;

        let generation = |reason: String| KeyMaterialError::Generation {
            path: private_key.to_path_buf(),
            reason,
        };
        let inv = Invocation::new(
            KEYGEN,
            vec![
                "-q".to_string(),
                "-t".to_string(),
                "rsa".to_string(),
                "-b".to_string(),
                RSA_KEY_BITS.to_string(),
                "-N".to_string(),
                String::new(),
                "-f".to_string(),
                private_key.display().to_string(),
            ],
        );
        let output = self
            .runner
            .run(&inv)
            .await
            .map_err(|e| generation(format!("{e:#}")))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(generation(format!("{} ({})", stderr.trim(), output.status)).into());
        }
        if !private_key.exists() || !public_key_path(private_key).exists() {
            return Err(generation("ssh-keygen reported success but wrote no key".to_string()).into());
        }
        tracing::info!(path = %private_key.display(), bits = RSA_KEY_BITS, "generated key pair");
        Ok(KeyStatus::Created)
    }

    async fn load_key_pair(&self, private_key: &Path) -> Result<KeyPair> {
        let public_key_path = public_key_path(private_key);
        let content = match std::fs::read_to_string(&public_key_path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(KeyMaterialError::MissingPublicKey {
                    path: public_key_path,
                    private: private_key.to_path_buf(),
                }
                .into());
            }
            Err(e) => {
                return Err(anyhow::Error::new(e)
                    .context(format!("cannot read {}", public_key_path.display())));
            }
        };
        let public_key = content.trim().to_string();
        if public_key.is_empty() {
            return Err(KeyMaterialError::EmptyPublicKey(public_key_path).into());
        }
        Ok(KeyPair {
            private_key_path: private_key.to_path_buf(),
            public_key_path,
            public_key,
        })
    }
}
