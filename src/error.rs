//! Error types for the invoice flow.

use std::time::Duration;

use thiserror::Error;

/// Convenience alias used throughout the library.
pub type Result<T, E = FacturaError> = std::result::Result<T, E>;

/// Errors that can occur while logging in or walking the invoice wizard.
#[derive(Debug, Error)]
pub enum FacturaError {
    /// The portal rejected the identifier or the password. Carries the
    /// portal's inline message verbatim.
    #[error("{message}")]
    Authentication { message: String },

    /// A selector or page condition was never satisfied.
    #[error("timed out after {timeout:?} waiting for {waiting_for}")]
    NavigationTimeout {
        waiting_for: String,
        timeout: Duration,
    },

    /// A user-supplied answer failed a format or membership check.
    #[error("{message}")]
    Validation { message: String },

    /// An expected UI control is missing from the page.
    #[error("unexpected page state: {detail}")]
    UnexpectedPageState { detail: String },

    /// An answer of the wrong kind was fed to a wizard state.
    #[error("answer {answer} is not valid for wizard state {state}")]
    InvalidAnswer { state: String, answer: String },

    /// The automation collaborator failed for a reason other than a timeout.
    #[error("browser {action} failed: {reason}")]
    Browser { action: String, reason: String },

    /// Console I/O failed.
    #[error("prompt failed: {reason}")]
    Prompt { reason: String },

    /// The configuration document could not be read or written.
    #[error("config error: {reason}")]
    Config { reason: String },
}

impl FacturaError {
    pub fn browser(action: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        FacturaError::Browser {
            action: action.into(),
            reason: reason.to_string(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        FacturaError::Validation {
            message: message.into(),
        }
    }

    pub fn unexpected(detail: impl Into<String>) -> Self {
        FacturaError::UnexpectedPageState {
            detail: detail.into(),
        }
    }

    /// Validation failures are the only errors the orchestrator recovers from.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, FacturaError::Validation { .. })
    }
}

impl From<dialoguer::Error> for FacturaError {
    fn from(err: dialoguer::Error) -> Self {
        FacturaError::Prompt {
            reason: err.to_string(),
        }
    }
}
