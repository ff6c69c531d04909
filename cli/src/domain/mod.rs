//! Domain layer — pure business logic, types, and validation.
//!
//! This module has zero imports from `crate::infra`, `crate::commands`,
//! `crate::application`, `tokio`, `std::fs`, `std::process`, or `std::net`.
//! All functions are synchronous and take data in, returning data out.

pub mod config;
pub mod error;
pub mod host;
pub mod keys;
pub mod remote;
pub mod ssh;
pub mod transport;

pub use config::{FleetkeyConfig, apply_config_value, validate_config_key, validate_config_value};
pub use error::{ConfigError, HostError, KeyMaterialError, TransportError, TrustError};
pub use host::{FleetMember, HostTarget, Password, parse_host_list};
pub use keys::{KeyPair, KeyStatus};
pub use ssh::{HostKeyPolicy, RemoteSession};
