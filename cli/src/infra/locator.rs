//! `ExecutableLocator` backed by a `PATH` lookup.

use crate::application::ports::ExecutableLocator;

/// Looks executables up on `PATH` at call time.
#[derive(Debug, Clone, Copy, Default)]
pub struct PathLocator;

impl ExecutableLocator for PathLocator {
    fn is_available(&self, program: &str) -> bool {
        which::which(program).is_ok()
    }
}
