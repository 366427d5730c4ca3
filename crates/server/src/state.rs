//! Application state shared across handlers.

use crate::auth::{IdentityVerifier, SessionVerifier};
use critique_core::config::AppConfig;
use critique_events::EventPublisher;
use critique_store::{
    BestEffortMirror, EngagementTracker, PrimaryStore, ReviewMirror, ReviewStore,
};
use std::sync::Arc;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Arc<AppConfig>,
    /// Primary store.
    pub store: Arc<dyn PrimaryStore>,
    /// Review lifecycle with the mirror write.
    pub reviews: ReviewStore,
    /// Per-user like/dislike state.
    pub engagement: EngagementTracker,
    /// Bearer token verification.
    pub verifier: Arc<dyn IdentityVerifier>,
    /// Authentication event sink.
    pub events: Arc<dyn EventPublisher>,
}

impl AppState {
    /// Create the application state with the default session verifier.
    pub fn new(
        config: AppConfig,
        store: Arc<dyn PrimaryStore>,
        mirror: Arc<dyn ReviewMirror>,
        events: Arc<dyn EventPublisher>,
    ) -> Self {
        let verifier: Arc<dyn IdentityVerifier> = Arc::new(SessionVerifier::new(store.clone()));
        Self::with_verifier(config, store, mirror, events, verifier)
    }

    /// Create the application state with a caller-supplied verifier.
    pub fn with_verifier(
        config: AppConfig,
        store: Arc<dyn PrimaryStore>,
        mirror: Arc<dyn ReviewMirror>,
        events: Arc<dyn EventPublisher>,
        verifier: Arc<dyn IdentityVerifier>,
    ) -> Self {
        let reviews = ReviewStore::new(
            store.clone(),
            BestEffortMirror::new(mirror).with_timeout(config.server.mirror_timeout()),
            config.server.max_page_size,
        );
        let engagement = EngagementTracker::new(store.clone());

        Self {
            config: Arc::new(config),
            store,
            reviews,
            engagement,
            verifier,
            events,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use critique_events::NoopPublisher;
    use critique_store::{NoopMirror, SqliteStore};

    #[tokio::test]
    async fn test_page_size_comes_from_config() {
        let temp = tempfile::tempdir().unwrap();
        let db_path = temp.path().join("critique.db");
        let store: Arc<dyn PrimaryStore> =
            Arc::new(SqliteStore::new(&db_path, None).await.unwrap());

        let mut config = AppConfig::for_testing(&db_path);
        config.server.max_page_size = 7;

        let state = AppState::new(
            config,
            store,
            Arc::new(NoopMirror),
            Arc::new(NoopPublisher),
        );
        assert_eq!(state.config.server.max_page_size, 7);
        assert!(format!("{:?}", state.reviews).contains("max_page_size: 7"));
    }
}
