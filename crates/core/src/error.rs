//! Error types for the core domain.

use thiserror::Error;

/// Core domain error type.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid {field}: {reason}")]
    Validation { field: &'static str, reason: String },

    #[error("missing required field: {0}")]
    MissingField(&'static str),

    #[error("invalid role: {0}")]
    InvalidRole(String),

    #[error("password hashing error: {0}")]
    PasswordHash(String),
}

impl Error {
    /// Build a validation error for a named field.
    pub fn validation(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Validation {
            field,
            reason: reason.into(),
        }
    }
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, Error>;
