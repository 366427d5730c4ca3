//! Authentication event publishing for Critique.
//!
//! Signup and login events are published to a named queue and consumed in
//! the background. Publishing never fails the request that produced the event.

pub mod error;
pub mod event;
pub mod publisher;
pub mod queue;

pub use error::{EventError, EventResult};
pub use event::AuthEvent;
pub use publisher::{EventPublisher, NoopPublisher};
pub use queue::{LoggingConsumer, QueueConsumer, QueuePublisher, QueueStats};

use critique_core::config::EventsConfig;
use std::sync::Arc;

/// Create an event publisher from configuration.
///
/// Must be called inside a Tokio runtime when events are enabled.
pub fn from_config(config: &EventsConfig) -> EventResult<Arc<dyn EventPublisher>> {
    config.validate().map_err(EventError::Config)?;

    if !config.enabled {
        tracing::info!("Authentication events disabled");
        return Ok(Arc::new(NoopPublisher));
    }

    let queue = QueuePublisher::open(
        config.queue_name.clone(),
        config.capacity,
        Arc::new(LoggingConsumer),
    )?;
    Ok(Arc::new(queue))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_from_config_disabled_is_noop() {
        let config = EventsConfig {
            enabled: false,
            ..Default::default()
        };
        let publisher = from_config(&config).unwrap();
        publisher.publish(AuthEvent::login(1, "a@example.com", "user")).await;
        publisher.close().await;
    }

    #[tokio::test]
    async fn test_from_config_default_opens_queue() {
        let publisher = from_config(&EventsConfig::default()).unwrap();
        publisher.publish(AuthEvent::login(1, "a@example.com", "user")).await;
        publisher.close().await;
    }
}
