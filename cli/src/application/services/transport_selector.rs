//! Application service — which transports can be attempted on this machine.
//!
//! Availability is recomputed on every call from the injected locator rather
//! than cached, so a tool installed mid-run is picked up by the next host.

use fleetkey_common::{TransportInventoryEntry, TransportKind};

use crate::application::ports::ExecutableLocator;
use crate::domain::transport;

/// Available transports in fixed priority order, restricted to `allowed`.
///
/// An empty result is not an error here; the caller decides how to report it.
pub fn available_transports(
    locator: &impl ExecutableLocator,
    allowed: Option<&[TransportKind]>,
) -> Vec<TransportKind> {
    let available = transport::select_available(|exe| locator.is_available(exe), allowed);
    tracing::debug!(?available, ?allowed, "transport inventory");
    available
}

/// Availability of every transport with its missing executables.
pub fn transport_inventory(locator: &impl ExecutableLocator) -> Vec<TransportInventoryEntry> {
    transport::inventory(|exe| locator.is_available(exe))
}
