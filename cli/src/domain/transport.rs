//! Transport selection over a presence predicate.
//!
//! The predicate answers "is this executable on PATH"; keeping it injected
//! makes selection a pure function of its inputs.

use fleetkey_common::{TransportInventoryEntry, TransportKind};

/// Executables required by `kind` that `is_present` reports missing.
#[must_use]
pub fn missing_executables(kind: TransportKind, is_present: impl Fn(&str) -> bool) -> Vec<String> {
    kind.required_executables()
        .iter()
        .filter(|exe| !is_present(**exe))
        .map(|exe| (*exe).to_string())
        .collect()
}

/// Available transports in fixed priority order, restricted to `allowed`
/// when given. Restriction never reorders.
#[must_use]
pub fn select_available(
    is_present: impl Fn(&str) -> bool,
    allowed: Option<&[TransportKind]>,
) -> Vec<TransportKind> {
    TransportKind::PRIORITY
        .into_iter()
        .filter(|kind| allowed.is_none_or(|a| a.contains(kind)))
        .filter(|kind| missing_executables(*kind, &is_present).is_empty())
        .collect()
}

/// Availability of every transport, for the `transports` command.
#[must_use]
pub fn inventory(is_present: impl Fn(&str) -> bool) -> Vec<TransportInventoryEntry> {
    TransportKind::PRIORITY
        .into_iter()
        .map(|kind| {
            let missing = missing_executables(kind, &is_present);
            TransportInventoryEntry {
                transport: kind,
                priority: kind.priority(),
                available: missing.is_empty(),
                missing,
            }
        })
        .collect()
}

/// Transports left after removing `disabled` from the full set, or `None`
/// when nothing is disabled.
#[must_use]
pub fn allowed_set(only: &[TransportKind], disabled: &[TransportKind]) -> Option<Vec<TransportKind>> {
    if only.is_empty() && disabled.is_empty() {
        return None;
    }
    let base: Vec<TransportKind> = if only.is_empty() {
        TransportKind::PRIORITY.to_vec()
    } else {
        only.to_vec()
    };
    Some(base.into_iter().filter(|k| !disabled.contains(k)).collect())
}
