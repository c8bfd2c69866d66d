//! Error types for locus-core

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Core error type for locus operations
#[derive(Debug, Clone, Error)]
pub enum Error {
    /// Configuration value is missing or malformed
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    /// Input could not be parsed
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Filesystem errors
    #[error("IO error: {0}")]
    IoError(String),

    /// The location resolver answered with a failure
    #[error("Resolver '{resolver}' failed: {reason}")]
    Resolver {
        /// Resolver that produced the failure
        resolver: String,
        /// Underlying reason
        reason: String,
    },

    /// Transport-level failure talking to a remote resolver
    #[error("Transport error: {0}")]
    Transport(String),

    /// An operation did not finish in time
    #[error("Timed out after {0} ms")]
    Timeout(u64),
}

impl Error {
    /// Short machine-readable code for this error
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidConfig(_) => "INVALID_CONFIG",
            Self::ParseError(_) => "PARSE_ERROR",
            Self::IoError(_) => "IO_ERROR",
            Self::Resolver { .. } => "RESOLVER_FAILED",
            Self::Transport(_) => "TRANSPORT_ERROR",
            Self::Timeout(_) => "TIMEOUT",
        }
    }

    /// Returns the process exit code for this error.
    ///
    /// - 1: configuration or input errors
    /// - 2: system and transport errors
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::InvalidConfig(_) | Self::ParseError(_) => 1,
            Self::IoError(_) | Self::Resolver { .. } | Self::Transport(_) | Self::Timeout(_) => 2,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::IoError(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::ParseError(err.to_string())
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Self::ParseError(format!("Failed to parse config: {err}"))
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Transport(format!("request timed out: {err}"))
        } else {
            Self::Transport(err.to_string())
        }
    }
}

/// Result type alias for locus-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Failure recorded in a location snapshot.
///
/// Discovery failures are data: they travel inside [`crate::LocationSnapshot`]
/// and are read by anyone who inspects it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationError {
    /// Machine-readable code, e.g. `RESOLVER_FAILED`
    pub code: String,
    /// Human-readable description
    pub message: String,
}

impl LocationError {
    /// Create a new location error
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for LocationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for LocationError {}

impl From<Error> for LocationError {
    fn from(err: Error) -> Self {
        Self::new(err.code(), err.to_string())
    }
}

impl From<&Error> for LocationError {
    fn from(err: &Error) -> Self {
        Self::new(err.code(), err.to_string())
    }
}
