//! Local identity: the key pair whose public half is installed on every host.

use std::path::{Path, PathBuf};

use crate::domain::error::HostError;

/// Key size requested from `ssh-keygen`.
pub const RSA_KEY_BITS: u32 = 4096;

/// A loaded key pair. `public_key` is the trimmed single-line `.pub` content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyPair {
    pub private_key_path: PathBuf,
    pub public_key_path: PathBuf,
    pub public_key: String,
}

/// Result of `ensure_key_pair`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyStatus {
    Created,
    AlreadyExists,
}

/// `<private>.pub`, the sibling ssh-keygen writes the public half to.
#[must_use]
pub fn public_key_path(private_key: &Path) -> PathBuf {
    let mut name = private_key.as_os_str().to_os_string();
    name.push(".pub");
    PathBuf::from(name)
}

/// Checks that a public key can be appended to `authorized_keys` as one line.
///
/// # Errors
///
/// Returns `HostError::EmptyPublicKey` for blank input and
/// `HostError::InvalidPublicKey` for multi-line or control-character content.
pub fn validate_public_key(key: &str) -> Result<(), HostError> {
    let key = key.trim();
    if key.is_empty() {
        return Err(HostError::EmptyPublicKey);
    }
    if key.chars().any(char::is_control) {
        return Err(HostError::InvalidPublicKey);
    }
    Ok(())
}
