//! Error types for key-value operations.

use thiserror::Error;

/// Result type for key-value operations.
pub type KvResult<T> = Result<T, KvError>;

/// Errors that can occur during key-value operations.
#[derive(Debug, Error)]
pub enum KvError {
    /// The key holds a value of a different kind than the operation expects.
    #[error("wrong kind of value at key {key}: expected {expected}")]
    WrongType {
        /// The offending key.
        key: String,
        /// The kind the operation needed.
        expected: &'static str,
    },

    /// A key pattern could not be parsed.
    #[error("invalid key pattern {pattern:?}: {message}")]
    InvalidPattern {
        /// The pattern as supplied.
        pattern: String,
        /// What was wrong with it.
        message: String,
    },

    /// The store could not be reached.
    #[error("key-value store unavailable: {0}")]
    Unavailable(String),
}

impl KvError {
    /// Creates a wrong-type error.
    pub fn wrong_type(key: impl Into<String>, expected: &'static str) -> Self {
        Self::WrongType {
            key: key.into(),
            expected,
        }
    }

    /// Creates an invalid-pattern error.
    pub fn invalid_pattern(pattern: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidPattern {
            pattern: pattern.into(),
            message: message.into(),
        }
    }
}
