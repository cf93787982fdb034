use std::fmt;
use std::io::{self, Write};
use thiserror::Error;

use crate::tracker::TOKEN_ENV;

/// Classified failures talking to Pivotal Tracker or resolving local settings.
#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("PIVOTAL_TOKEN is not set")]
    MissingToken,

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("could not reach Pivotal Tracker: {0}")]
    Unreachable(String),

    #[error("Pivotal Tracker rejected the request ({status}): {body}")]
    Rejected { status: u16, body: String },
}

impl TrackerError {
    /// Whether an idempotent request that failed this way is worth retrying
    pub fn is_retryable(&self) -> bool {
        match self {
            TrackerError::Unreachable(_) => true,
            TrackerError::Rejected { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

/// User-friendly error wrapper
#[derive(Debug)]
pub struct UserError {
    message: String,
    details: Option<String>,
    suggestion: Option<String>,
}

impl UserError {
    /// Create a new user error
    pub fn new(message: impl Into<String>) -> Self {
        UserError {
            message: message.into(),
            details: None,
            suggestion: None,
        }
    }

    /// Add details about the error
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Add a suggestion for how to fix the error
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Print the error and any remediation to stderr
    pub fn display(&self) {
        // Nothing useful is left to do if stderr is gone
        let _ = self.write_to(&mut io::stderr().lock());
    }

    fn write_to(&self, out: &mut impl Write) -> io::Result<()> {
        writeln!(out, "\n❌ Error: {}", self.message)?;
        if let Some(details) = &self.details {
            writeln!(out, "\n   {}", details)?;
        }
        if let Some(suggestion) = &self.suggestion {
            writeln!(out, "\n💡 {}", suggestion)?;
        }
        Ok(())
    }
}

impl fmt::Display for UserError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(ref details) = self.details {
            write!(f, ": {}", details)?;
        }
        Ok(())
    }
}

impl std::error::Error for UserError {}

const TOKEN_HELP: &str = "\
You need to have your pivotal developer token set to the 'PIVOTAL_TOKEN' env variable.

   I keep mine in ~/.zshenv
   export PIVOTAL_TOKEN='your token'

   If you do not have one, login to pivotal, go to your profile page,
   and scroll to the bottom. You'll find it there.";

/// Convert common errors to user-friendly messages
pub fn user_friendly_error(error: &anyhow::Error) -> UserError {
    let classified = error
        .chain()
        .find_map(|cause| cause.downcast_ref::<TrackerError>());

    match classified {
        Some(TrackerError::MissingToken) => UserError::new("Pivotal Tracker token not configured")
            .with_details("Every request needs your API token")
            .with_suggestion(TOKEN_HELP),
        Some(TrackerError::Configuration(reason)) => UserError::new("Invalid configuration")
            .with_details(reason.clone())
            .with_suggestion("Check your flags and ~/.config/pivotal-tools/config.toml"),
        Some(TrackerError::NotFound(what)) => {
            UserError::new(format!("Could not find {}", what))
                .with_suggestion("Double check the id, or pass --project-index to pick the right project")
        }
        Some(TrackerError::Unreachable(reason)) => UserError::new("Network connection failed")
            .with_details(reason.clone())
            .with_suggestion("Check your internet connection and try again"),
        Some(TrackerError::Rejected { status: 401 | 403, .. }) => {
            UserError::new("Pivotal Tracker refused your token")
                .with_details("The API answered with an authorization error")
                .with_suggestion(format!("Check that {} holds a current API token", TOKEN_ENV))
        }
        Some(TrackerError::Rejected { status, body }) => {
            UserError::new(format!("Pivotal Tracker rejected the request ({})", status))
                .with_details(body.clone())
        }
        None => UserError::new("An unexpected error occurred").with_details(format!("{:#}", error)),
    }
}
