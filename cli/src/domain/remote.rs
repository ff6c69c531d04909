//! Remote-side shell text: the authorized-keys command sequence, exit markers,
//! and the self-deleting script used by upload transports.
//!
//! Pure functions only — no I/O.

use fleetkey_common::CommandOutcome;

use crate::domain::error::HostError;
use crate::domain::keys::validate_public_key;

pub const AUTHORIZED_KEYS_DIR: &str = "~/.ssh";
pub const AUTHORIZED_KEYS_FILE: &str = "~/.ssh/authorized_keys";

/// Prefix of the line each wrapped command prints with its exit code.
pub const EXIT_MARKER: &str = "__FLEETKEY_RC__";

/// Builds the fixed sequence that installs `public_key` for the login account.
///
/// Order matters: the directory is created with owner-only access, the key is
/// appended, the file is tightened, and only then is the directory tightened.
///
/// # Errors
///
/// Returns a `HostError` if the key is empty, multi-line, or cannot be quoted.
pub fn authorized_key_commands(public_key: &str) -> Result<Vec<String>, HostError> {
    validate_public_key(public_key)?;
    let quoted = shlex::try_quote(public_key.trim()).map_err(|_| HostError::InvalidPublicKey)?;
    Ok(vec![
        format!("mkdir -p -m 700 {AUTHORIZED_KEYS_DIR}"),
        format!(
            "grep -qxF -- {quoted} {AUTHORIZED_KEYS_FILE} 2>/dev/null || printf '%s\\n' {quoted} >> {AUTHORIZED_KEYS_FILE}"
        ),
        format!("chmod 600 {AUTHORIZED_KEYS_FILE}"),
        format!("chmod 700 {AUTHORIZED_KEYS_DIR}"),
    ])
}

/// `command` followed by an echo of its exit code tagged with `index`.
#[must_use]
pub fn with_exit_marker(index: usize, command: &str) -> String {
    format!("{command}; echo \"{EXIT_MARKER} {index} $?\"")
}

/// Lines fed to an interactive remote shell: each command with its marker,
/// then `exit` so the session ends once input is drained.
#[must_use]
pub fn session_lines(commands: &[String]) -> Vec<String> {
    commands
        .iter()
        .enumerate()
        .map(|(i, c)| with_exit_marker(i, c))
        .chain(std::iter::once("exit".to_string()))
        .collect()
}

/// Renders a POSIX script that runs every command, reports each exit code,
/// exits non-zero if any failed, and deletes itself as its last action.
#[must_use]
pub fn render_remote_script(commands: &[String]) -> String {
    let mut script = String::from("#!/bin/sh\ntrap 'rm -f \"$0\"' EXIT\nstatus=0\n");
    for (i, command) in commands.iter().enumerate() {
        script.push_str(command);
        script.push('\n');
        script.push_str(&format!(
            "rc=$?; echo \"{EXIT_MARKER} {i} $rc\"; [ \"$rc\" -eq 0 ] || status=$rc\n"
        ));
    }
    script.push_str("exit \"$status\"\n");
    script
}

/// Scratch location for an uploaded script.
#[must_use]
pub fn remote_script_path(id: &str) -> String {
    format!("/tmp/fleetkey-{id}.sh")
}

/// Recovers per-command exit codes from marker lines in captured output.
///
/// Commands without a marker get `exit_code: None`.
#[must_use]
pub fn parse_exit_markers(output: &str, commands: &[String]) -> Vec<CommandOutcome> {
    let mut codes: Vec<Option<i32>> = vec![None; commands.len()];
    for line in output.lines() {
        let Some(rest) = line.trim().strip_prefix(EXIT_MARKER) else {
            continue;
        };
        let mut parts = rest.split_whitespace();
        let (Some(idx), Some(code)) = (parts.next(), parts.next()) else {
            continue;
        };
        let (Ok(idx), Ok(code)) = (idx.parse::<usize>(), code.parse::<i32>()) else {
            continue;
        };
        if let Some(slot) = codes.get_mut(idx) {
            *slot = Some(code);
        }
    }
    commands
        .iter()
        .zip(codes)
        .map(|(command, exit_code)| CommandOutcome {
            command: command.clone(),
            exit_code,
        })
        .collect()
}
