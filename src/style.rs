//! Terminal styling for report output.
//!
//! Respects environment variables:
//! - `NO_COLOR=1`: Disables styling
//! - `COLOR=1`: Forces styling even without TTY

use std::io::IsTerminal;

/// Pre-formatted ANSI escape sequences
pub mod codes {
    pub const BOLD_WHITE: &str = "\x1b[1m\x1b[37m";
    pub const UNDERLINE_BLUE: &str = "\x1b[4m\x1b[34m";
    pub const RESET: &str = "\x1b[0m";
}

/// Whether renderers emit ANSI styling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    enabled: bool,
}

impl Palette {
    pub const fn plain() -> Self {
        Palette { enabled: false }
    }

    pub const fn ansi() -> Self {
        Palette { enabled: true }
    }

    /// Check if styling should be enabled based on TTY and environment variables.
    pub fn detect() -> Self {
        if std::env::var("NO_COLOR").is_ok_and(|v| v == "1") {
            return Palette::plain();
        }
        if std::env::var("COLOR").is_ok_and(|v| v == "1") {
            return Palette::ansi();
        }
        Palette {
            enabled: std::io::stdout().is_terminal(),
        }
    }

    /// Headings and emphasis
    pub fn bold(&self, text: &str) -> String {
        self.wrap(codes::BOLD_WHITE, text)
    }

    /// URLs
    pub fn link(&self, text: &str) -> String {
        self.wrap(codes::UNDERLINE_BLUE, text)
    }

    fn wrap(&self, start: &str, text: &str) -> String {
        if self.enabled {
            format!("{}{}{}", start, text, codes::RESET)
        } else {
            text.to_string()
        }
    }
}
