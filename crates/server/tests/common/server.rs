//! Test server setup.

use super::fixtures::RecordingPublisher;
use axum::Router;
use critique_core::config::AppConfig;
use critique_events::EventPublisher;
use critique_server::{AppState, create_router};
use critique_store::{NoopMirror, PrimaryStore, ReviewMirror, SqliteStore};
use std::sync::Arc;
use tempfile::TempDir;

/// Test server wrapper that manages resources.
pub struct TestServer {
    pub router: Router,
    pub state: AppState,
    pub events: Arc<RecordingPublisher>,
    _temp_dir: TempDir,
}

#[allow(dead_code)]
impl TestServer {
    /// Create a new test server with default configuration.
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    /// Create a test server with custom config modifications.
    pub async fn with_config<F>(modifier: F) -> Self
    where
        F: FnOnce(&mut AppConfig),
    {
        Self::build(modifier, Arc::new(NoopMirror)).await
    }

    /// Create a test server writing review copies to `mirror`.
    pub async fn with_mirror(mirror: Arc<dyn ReviewMirror>) -> Self {
        Self::build(|_| {}, mirror).await
    }

    async fn build<F>(modifier: F, mirror: Arc<dyn ReviewMirror>) -> Self
    where
        F: FnOnce(&mut AppConfig),
    {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");
        let db_path = temp_dir.path().join("critique.db");
        let store: Arc<dyn PrimaryStore> = Arc::new(
            SqliteStore::new(&db_path, None)
                .await
                .expect("Failed to create primary store"),
        );

        let mut config = AppConfig::for_testing(db_path);
        modifier(&mut config);

        let events = Arc::new(RecordingPublisher::default());
        let publisher: Arc<dyn EventPublisher> = events.clone();
        let state = AppState::new(config, store, mirror, publisher);
        let router = create_router(state.clone());

        Self {
            router,
            state,
            events,
            _temp_dir: temp_dir,
        }
    }

    /// Get access to the underlying primary store.
    pub fn store(&self) -> Arc<dyn PrimaryStore> {
        self.state.store.clone()
    }
}
