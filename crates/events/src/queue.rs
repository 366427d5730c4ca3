//! In-process named queue with a background consumer.
//!
//! Publishing never waits: a full or closed queue drops the event with a
//! warning. The consumer acknowledges each message once its sink accepts it.

use crate::error::{EventError, EventResult};
use crate::event::AuthEvent;
use crate::publisher::EventPublisher;
use async_trait::async_trait;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Receives queued messages on the consumer side.
#[async_trait]
pub trait QueueConsumer: Send + Sync + 'static {
    /// Handle one message body. `Ok` acknowledges it; an error drops it.
    async fn consume(&self, queue: &str, payload: &[u8]) -> EventResult<()>;
}

/// Consumer that logs each message, standing in for the downstream service.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingConsumer;

#[async_trait]
impl QueueConsumer for LoggingConsumer {
    async fn consume(&self, queue: &str, payload: &[u8]) -> EventResult<()> {
        let body = std::str::from_utf8(payload)
            .map_err(|e| EventError::Consumer(format!("message is not UTF-8: {e}")))?;
        tracing::info!(queue, message = body, "Message received");
        Ok(())
    }
}

/// Counters for one queue.
#[derive(Debug, Default)]
pub struct QueueStats {
    published: AtomicU64,
    dropped: AtomicU64,
    acked: AtomicU64,
    rejected: AtomicU64,
}

impl QueueStats {
    pub fn published(&self) -> u64 {
        self.published.load(Ordering::Relaxed)
    }

    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    pub fn acked(&self) -> u64 {
        self.acked.load(Ordering::Relaxed)
    }

    pub fn rejected(&self) -> u64 {
        self.rejected.load(Ordering::Relaxed)
    }
}

/// Event publisher backed by a bounded named queue.
pub struct QueuePublisher {
    name: String,
    sender: Mutex<Option<mpsc::Sender<Vec<u8>>>>,
    consumer: Mutex<Option<JoinHandle<()>>>,
    stats: Arc<QueueStats>,
}

impl QueuePublisher {
    /// Open the queue and start its consumer task.
    ///
    /// Must be called inside a Tokio runtime.
    pub fn open(
        name: impl Into<String>,
        capacity: usize,
        consumer: Arc<dyn QueueConsumer>,
    ) -> EventResult<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(EventError::Config("queue name must not be empty".to_string()));
        }
        if capacity == 0 {
            return Err(EventError::Config(
                "queue capacity must be at least 1".to_string(),
            ));
        }

        let (tx, rx) = mpsc::channel(capacity);
        let stats = Arc::new(QueueStats::default());
        let handle = tokio::spawn(run_consumer(
            name.clone(),
            rx,
            consumer,
            Arc::clone(&stats),
        ));

        tracing::info!(queue = %name, capacity, "Event queue opened");

        Ok(Self {
            name,
            sender: Mutex::new(Some(tx)),
            consumer: Mutex::new(Some(handle)),
            stats,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn stats(&self) -> &QueueStats {
        &self.stats
    }

    /// Enqueue an event without waiting for queue space.
    pub fn try_publish(&self, event: &AuthEvent) -> EventResult<()> {
        let payload = event.to_payload()?;
        let sender = self
            .sender
            .lock()
            .ok()
            .and_then(|guard| guard.clone())
            .ok_or_else(|| EventError::Closed(self.name.clone()))?;

        sender.try_send(payload).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => EventError::Full(self.name.clone()),
            mpsc::error::TrySendError::Closed(_) => EventError::Closed(self.name.clone()),
        })?;
        self.stats.published.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Close the queue: later publishes are dropped and the consumer drains
    /// what is already queued before this returns.
    pub async fn shutdown(&self) {
        let sender = self.sender.lock().ok().and_then(|mut guard| guard.take());
        drop(sender);

        let handle = self.consumer.lock().ok().and_then(|mut guard| guard.take());
        if let Some(handle) = handle
            && let Err(e) = handle.await
        {
            tracing::warn!(queue = %self.name, error = %e, "Event consumer task failed");
        }
        tracing::info!(
            queue = %self.name,
            published = self.stats.published(),
            acked = self.stats.acked(),
            dropped = self.stats.dropped(),
            "Event queue closed"
        );
    }
}

impl std::fmt::Debug for QueuePublisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueuePublisher")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl EventPublisher for QueuePublisher {
    async fn publish(&self, event: AuthEvent) {
        if let Err(e) = self.try_publish(&event) {
            self.stats.dropped.fetch_add(1, Ordering::Relaxed);
            tracing::warn!(
                queue = %self.name,
                event = event.kind(),
                user_id = event.user_id(),
                error = %e,
                "Dropping authentication event"
            );
        }
    }

    async fn close(&self) {
        self.shutdown().await;
    }
}

async fn run_consumer(
    name: String,
    mut rx: mpsc::Receiver<Vec<u8>>,
    consumer: Arc<dyn QueueConsumer>,
    stats: Arc<QueueStats>,
) {
    while let Some(payload) = rx.recv().await {
        match consumer.consume(&name, &payload).await {
            Ok(()) => {
                stats.acked.fetch_add(1, Ordering::Relaxed);
            }
            Err(e) => {
                stats.rejected.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(queue = %name, error = %e, "Event consumer rejected message");
            }
        }
    }
    tracing::debug!(queue = %name, "Event consumer stopped");
}
