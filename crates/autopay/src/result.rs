//! Result and error types for autopay.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type for autopay operations
pub type PayResult<T> = Result<T, PayError>;

/// Coarse failure category reported alongside a failed run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FailureKind {
    /// Portal login or logout was rejected
    Authentication,
    /// A bounded wait expired or a required element was absent
    ElementTimeout,
    /// Amount text was not decimal-shaped
    Parse,
    /// Anything uncategorized, including driver crashes
    Unknown,
}

impl FailureKind {
    /// Stable name used in logs and outbox documents
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Authentication => "authentication",
            Self::ElementTimeout => "element_timeout",
            Self::Parse => "parse",
            Self::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors that can occur while driving the portal
#[derive(Debug, Error)]
pub enum PayError {
    /// Login or logout failed
    #[error("Authentication failed: {message}")]
    Authentication {
        /// Error message
        message: String,
    },

    /// A wait point expired
    #[error("Timed out after {ms}ms waiting for {waited_for}")]
    ElementTimeout {
        /// What the wait was for
        waited_for: String,
        /// Timeout in milliseconds
        ms: u64,
    },

    /// A required element was not present when acted upon
    #[error("Element not found: {selector}")]
    ElementNotFound {
        /// Selector that matched nothing
        selector: String,
    },

    /// Amount text could not be parsed
    #[error("Could not parse amount from {text:?}: {message}")]
    Parse {
        /// Raw text read from the page
        text: String,
        /// Error message
        message: String,
    },

    /// Uncategorized failure
    #[error("Unexpected failure: {message}")]
    Unknown {
        /// Error message
        message: String,
    },

    /// Browser or CDP failure
    #[error("Browser driver error: {message}")]
    Driver {
        /// Error message
        message: String,
    },

    /// Notification delivery failed
    #[error("Notification failed: {message}")]
    Notification {
        /// Error message
        message: String,
    },

    /// Invalid configuration
    #[error("Configuration error: {message}")]
    Config {
        /// Error message
        message: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),
}

impl PayError {
    /// Create an authentication error
    #[must_use]
    pub fn authentication(message: impl Into<String>) -> Self {
        Self::Authentication {
            message: message.into(),
        }
    }

    /// Create a timeout error
    #[must_use]
    pub fn timeout(waited_for: impl Into<String>, ms: u64) -> Self {
        Self::ElementTimeout {
            waited_for: waited_for.into(),
            ms,
        }
    }

    /// Create an element-not-found error
    #[must_use]
    pub fn not_found(selector: impl Into<String>) -> Self {
        Self::ElementNotFound {
            selector: selector.into(),
        }
    }

    /// Create a parse error
    #[must_use]
    pub fn parse(text: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Parse {
            text: text.into(),
            message: message.into(),
        }
    }

    /// Create an uncategorized error
    #[must_use]
    pub fn unknown(message: impl Into<String>) -> Self {
        Self::Unknown {
            message: message.into(),
        }
    }

    /// Create a driver error
    #[must_use]
    pub fn driver(message: impl Into<String>) -> Self {
        Self::Driver {
            message: message.into(),
        }
    }

    /// Create a notification error
    #[must_use]
    pub fn notification(message: impl Into<String>) -> Self {
        Self::Notification {
            message: message.into(),
        }
    }

    /// Create a configuration error
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Failure category for reporting
    #[must_use]
    pub const fn kind(&self) -> FailureKind {
        match self {
            Self::Authentication { .. } => FailureKind::Authentication,
            Self::ElementTimeout { .. } | Self::ElementNotFound { .. } => {
                FailureKind::ElementTimeout
            }
            Self::Parse { .. } => FailureKind::Parse,
            Self::Unknown { .. }
            | Self::Driver { .. }
            | Self::Notification { .. }
            | Self::Config { .. }
            | Self::Io(_)
            | Self::Json(_)
            | Self::Yaml(_) => FailureKind::Unknown,
        }
    }
}
