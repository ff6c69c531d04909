//! Command implementations

pub mod config;
pub mod keygen;
pub mod provision;
pub mod transports;
pub mod version;
