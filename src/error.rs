//! Error types and handling for Bowser
//!
//! This module defines the error types used throughout the application,
//! providing consistent error handling and reporting.

use thiserror::Error;

/// Result type alias for Bowser operations
pub type Result<T> = std::result::Result<T, BowserError>;

/// Main error type for Bowser
#[derive(Debug, Error)]
pub enum BowserError {
    /// Configuration-related errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Authentication failures against the FuelCheck API (needs user action)
    #[error("Authentication error: {message}")]
    Auth { message: String },

    /// Transient transport failures (expected to self-heal next cycle)
    #[error("Transport error: {message}")]
    Transport { message: String },

    /// Upstream asked us to back off; never retried within a cycle
    #[error("Rate limit error: {message}")]
    RateLimit { message: String },

    /// Timeout errors
    #[error("Timeout error: {message}")]
    Timeout { message: String },

    /// Upstream answered but had no records for the query
    #[error("Empty result: {message}")]
    EmptyResult { message: String },

    /// A poll cycle with zero successful requests
    #[error("Cycle failure: {message}")]
    Cycle { message: String },

    /// Serialization/deserialization errors
    #[error("Serialization error: {message}")]
    Serialization { message: String },

    /// File I/O errors
    #[error("I/O error: {message}")]
    Io { message: String },

    /// Validation errors
    #[error("Validation error: {field} - {message}")]
    Validation { field: String, message: String },

    /// Generic errors with context
    #[error("Error: {message}")]
    Generic { message: String },
}

impl BowserError {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        BowserError::Config {
            message: message.into(),
        }
    }

    /// Create a new auth error
    pub fn auth<S: Into<String>>(message: S) -> Self {
        BowserError::Auth {
            message: message.into(),
        }
    }

    /// Create a new transport error
    pub fn transport<S: Into<String>>(message: S) -> Self {
        BowserError::Transport {
            message: message.into(),
        }
    }

    /// Create a new rate limit error
    pub fn rate_limit<S: Into<String>>(message: S) -> Self {
        BowserError::RateLimit {
            message: message.into(),
        }
    }

    /// Create a new timeout error
    pub fn timeout<S: Into<String>>(message: S) -> Self {
        BowserError::Timeout {
            message: message.into(),
        }
    }

    /// Create a new empty result error
    pub fn empty_result<S: Into<String>>(message: S) -> Self {
        BowserError::EmptyResult {
            message: message.into(),
        }
    }

    /// Create a new cycle failure error
    pub fn cycle<S: Into<String>>(message: S) -> Self {
        BowserError::Cycle {
            message: message.into(),
        }
    }

    /// Create a new I/O error
    pub fn io<S: Into<String>>(message: S) -> Self {
        BowserError::Io {
            message: message.into(),
        }
    }

    /// Create a new validation error
    pub fn validation<S: Into<String>>(field: S, message: S) -> Self {
        BowserError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a new generic error
    pub fn generic<S: Into<String>>(message: S) -> Self {
        BowserError::Generic {
            message: message.into(),
        }
    }

    /// Whether this error requires user action rather than waiting for the
    /// next cycle to self-heal.
    pub fn needs_user_action(&self) -> bool {
        matches!(
            self,
            BowserError::Auth { .. } | BowserError::Config { .. } | BowserError::Validation { .. }
        )
    }
}

impl From<std::io::Error> for BowserError {
    fn from(err: std::io::Error) -> Self {
        BowserError::io(err.to_string())
    }
}

impl From<serde_yaml::Error> for BowserError {
    fn from(err: serde_yaml::Error) -> Self {
        BowserError::Serialization {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for BowserError {
    fn from(err: serde_json::Error) -> Self {
        BowserError::Serialization {
            message: err.to_string(),
        }
    }
}

impl From<reqwest::Error> for BowserError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            BowserError::timeout(err.to_string())
        } else {
            BowserError::transport(err.to_string())
        }
    }
}

impl From<chrono::ParseError> for BowserError {
    fn from(err: chrono::ParseError) -> Self {
        BowserError::validation("datetime", &err.to_string())
    }
}
