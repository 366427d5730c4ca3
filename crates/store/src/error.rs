//! Store error types.

use thiserror::Error;

/// Primary store operation errors.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("already exists: {0}")]
    AlreadyExists(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("invalid reference: {0}")]
    InvalidReference(String),

    #[error("internal error: {0}")]
    Internal(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for primary store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Mirror write errors. These never cross the review store boundary.
#[derive(Debug, Error)]
pub enum MirrorError {
    #[error("mirror database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("mirror configuration error: {0}")]
    Config(String),

    #[error("mirror unavailable: {0}")]
    Unavailable(String),

    #[error("mirror write timed out after {0:?}")]
    Timeout(std::time::Duration),
}

/// Result type for mirror writes.
pub type MirrorResult<T> = std::result::Result<T, MirrorError>;

/// Whether a database error is a unique-constraint violation
/// (SQLite "UNIQUE constraint failed", PostgreSQL SQLSTATE 23505).
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db_err) if db_err.is_unique_violation())
}

/// Whether a database error is a foreign-key violation
/// (SQLite "FOREIGN KEY constraint failed", PostgreSQL SQLSTATE 23503).
pub fn is_foreign_key_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db_err) if db_err.is_foreign_key_violation())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_database_errors_are_not_violations() {
        let err = sqlx::Error::RowNotFound;
        assert!(!is_unique_violation(&err));
        assert!(!is_foreign_key_violation(&err));
    }

    #[test]
    fn test_error_display() {
        let err = StoreError::NotFound("review 7".to_string());
        assert_eq!(err.to_string(), "not found: review 7");
    }
}
