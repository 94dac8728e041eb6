//! Error taxonomy shared by every layer.
//!
//! The failure kind is fixed where the error is raised, so callers branch on
//! [`ErrorKind`] instead of inspecting message text.

use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// No provider (or no API key) has been configured yet.
    #[error("No AI provider configured: {0}")]
    ConfigMissing(String),

    #[error("{0}")]
    Validation(String),

    /// Transport failure before a response arrived.
    #[error("Network error: {0}")]
    Network(String),

    /// The provider answered with a non-2xx status. `status` is `None` when
    /// the error was rebuilt from a response that did not carry one.
    #[error("{message}")]
    Api {
        status: Option<u16>,
        message: String,
    },

    /// The background side went away mid-request; the host must be reloaded.
    #[error("Extension context invalidated: {0}")]
    ContextInvalidated(String),

    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    /// A summarize or chat call is already running for this page.
    #[error("A request is already in progress for {0}")]
    Busy(String),

    #[error("Failed to parse response: {0}")]
    Parse(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorKind {
    ConfigMissing,
    Validation,
    Network,
    Api,
    ContextInvalidated,
    StorageUnavailable,
    Busy,
    Parse,
    NotFound,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::ConfigMissing(_) => ErrorKind::ConfigMissing,
            Error::Validation(_) => ErrorKind::Validation,
            Error::Network(_) => ErrorKind::Network,
            Error::Api { .. } => ErrorKind::Api,
            Error::ContextInvalidated(_) => ErrorKind::ContextInvalidated,
            Error::StorageUnavailable(_) => ErrorKind::StorageUnavailable,
            Error::Busy(_) => ErrorKind::Busy,
            Error::Parse(_) => ErrorKind::Parse,
            Error::NotFound(_) => ErrorKind::NotFound,
        }
    }

    /// Whether the UI should offer a retry action.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::Network | ErrorKind::Api | ErrorKind::Busy | ErrorKind::Parse
        )
    }

    /// HTTP status of an `Api` error.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Api { status, .. } => *status,
            _ => None,
        }
    }

    /// Rebuild an error that crossed the background boundary as
    /// `(kind, message, status)`.
    pub fn from_kind(kind: ErrorKind, message: impl Into<String>, status: Option<u16>) -> Self {
        let message = message.into();
        match kind {
            ErrorKind::ConfigMissing => Error::ConfigMissing(message),
            ErrorKind::Validation => Error::Validation(message),
            ErrorKind::Network => Error::Network(message),
            ErrorKind::Api => Error::Api { status, message },
            ErrorKind::ContextInvalidated => Error::ContextInvalidated(message),
            ErrorKind::StorageUnavailable => Error::StorageUnavailable(message),
            ErrorKind::Busy => Error::Busy(message),
            ErrorKind::Parse => Error::Parse(message),
            ErrorKind::NotFound => Error::NotFound(message),
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Error::Parse(err.to_string())
        } else {
            Error::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Parse(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
