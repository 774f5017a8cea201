//! Error types for segment recovery
//!
//! This module defines the error taxonomy shared by every recovery component.
//! We use `thiserror` for automatic `Display` and `Error` trait implementations.
//!
//! The `Display` output of validation, connection and I/O errors is the bare
//! message: it is copied verbatim into the `error_msg` field of the structured
//! error record that operators and higher-level controllers consume.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::io;
use thiserror::Error;

/// Result type alias for recovery operations
pub type Result<T> = std::result::Result<T, Error>;

/// Coarse classification of a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorKind {
    /// Precondition or preparation failure (directory state, checkpoint, pid removal)
    Validation,
    /// Driver or connection failure; transient for the reconfigurer, fatal elsewhere
    Connection,
    /// A wall-clock deadline was exceeded
    Timeout,
}

impl ErrorKind {
    /// Lowercase wire name of the kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation",
            ErrorKind::Connection => "connection",
            ErrorKind::Timeout => "timeout",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error types for segment recovery
#[derive(Debug, Error)]
pub enum Error {
    /// A preparation step rejected the segment's current state
    #[error("{0}")]
    Validation(String),

    /// Could not reach or talk to a database endpoint
    #[error("{0}")]
    Connection(String),

    /// A retry loop ran out of time
    #[error("{message}")]
    Timeout {
        /// Fatal, user-visible message
        message: String,
    },

    /// I/O error (directory inspection, creation, permission changes)
    #[error("{0}")]
    Io(#[from] io::Error),

    /// Malformed serialized recovery descriptors
    #[error("malformed recovery info: {0}")]
    Serialization(String),

    /// Invalid configuration value or unreadable configuration file
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl Error {
    /// Build a validation error.
    pub fn validation(msg: impl Into<String>) -> Self {
        Error::Validation(msg.into())
    }

    /// Build a connection error.
    pub fn connection(msg: impl Into<String>) -> Self {
        Error::Connection(msg.into())
    }

    /// Build a timeout error carrying the fatal message.
    pub fn timeout(message: impl Into<String>) -> Self {
        Error::Timeout {
            message: message.into(),
        }
    }

    /// Classify the error.
    ///
    /// I/O, serialization and configuration failures surface to operators as
    /// validation failures: they are all precondition problems.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Connection(_) => ErrorKind::Connection,
            Error::Timeout { .. } => ErrorKind::Timeout,
            Error::Validation(_)
            | Error::Io(_)
            | Error::Serialization(_)
            | Error::Config(_) => ErrorKind::Validation,
        }
    }

    /// True for failures a retry loop may re-attempt.
    pub fn is_transient(&self) -> bool {
        self.kind() == ErrorKind::Connection
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}
