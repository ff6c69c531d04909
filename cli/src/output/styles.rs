//! Colors for terminal output, keyed by what is being shown.

use fleetkey_common::HostState;
use owo_colors::Style;

/// Stylesheet for CLI output. Every style is plain until `colorize`.
#[derive(Default, Clone)]
pub struct Styles {
    pub success: Style,
    pub warning: Style,
    pub error: Style,
    pub info: Style,
    /// Secondary text: transport descriptions, missing executables.
    pub dim: Style,
    pub bold: Style,
    pub header: Style,
}

impl Styles {
    pub fn colorize(&mut self) {
        self.success = Style::new().green();
        self.warning = Style::new().yellow();
        self.error = Style::new().red();
        self.info = Style::new().blue();
        self.dim = Style::new().dimmed();
        self.bold = Style::new().bold();
        self.header = Style::new().bold().cyan();
    }

    /// Style of a host's summary marker. An unverified install is a warning.
    #[must_use]
    pub fn for_state(&self, state: HostState) -> Style {
        match state {
            HostState::Verified => self.success,
            HostState::Installed => self.warning,
            HostState::Failed => self.error,
        }
    }

    #[must_use]
    pub fn marker(state: HostState) -> &'static str {
        match state {
            HostState::Verified => "✓",
            HostState::Installed => "⚠",
            HostState::Failed => "✗",
        }
    }
}
