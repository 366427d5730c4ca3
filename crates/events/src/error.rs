//! Event publishing errors.

use thiserror::Error;

/// Errors raised while setting up or feeding the event queue.
///
/// [`crate::EventPublisher::publish`] never returns these; they are logged.
#[derive(Debug, Error)]
pub enum EventError {
    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("queue '{0}' is full")]
    Full(String),

    #[error("queue '{0}' is closed")]
    Closed(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("consumer error: {0}")]
    Consumer(String),
}

/// Result type for event operations.
pub type EventResult<T> = std::result::Result<T, EventError>;
