//! Event publisher seam.

use crate::event::AuthEvent;
use async_trait::async_trait;

/// Publishes authentication events.
///
/// Publishing is fire-and-forget: failures are logged by the implementation
/// and never reach the caller.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, event: AuthEvent);

    /// Stop accepting events and flush anything pending.
    async fn close(&self) {}
}

/// Publisher that discards every event. Used when events are disabled.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopPublisher;

#[async_trait]
impl EventPublisher for NoopPublisher {
    async fn publish(&self, event: AuthEvent) {
        tracing::trace!(event = event.kind(), "Events disabled, discarding");
    }
}
