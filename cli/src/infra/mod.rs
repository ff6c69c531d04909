//! Infrastructure layer — concrete implementations of application port traits.
//!
//! This module contains all I/O-performing code: process execution, `PATH`
//! lookup, key generation, known-hosts management, and the ssh transports.
//!
//! Imports from `crate::domain` and `crate::application::ports` are allowed.
//! Imports from `crate::commands` or `crate::output` are forbidden.

pub mod askpass;
pub mod config;
pub mod keys;
pub mod known_hosts;
pub mod locator;
pub mod process;
pub mod transports;
pub mod verify;
