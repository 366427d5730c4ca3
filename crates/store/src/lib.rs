//! Persistence for the Critique review service.
//!
//! This crate provides:
//! - Repository traits over the primary relational schema
//! - SQLite and PostgreSQL primary stores
//! - The best-effort secondary review mirror
//! - The Review Store and Engagement Tracker components

pub mod engagement;
pub mod error;
pub mod mirror;
pub mod models;
pub mod postgres;
pub mod repos;
pub mod reviews;
pub mod store;

pub use engagement::EngagementTracker;
pub use error::{MirrorError, MirrorResult, StoreError, StoreResult};
pub use mirror::{BestEffortMirror, NoopMirror, ReviewMirror, SqlMirror, mirror_from_config};
pub use postgres::PostgresStore;
pub use repos::FlagChange;
pub use reviews::{RestoreOutcome, ReviewStore, SoftDeleteOutcome, UpdateOutcome};
pub use store::{PrimaryStore, SqliteStore};

use critique_core::config::DatabaseConfig;
use std::sync::Arc;

/// Create a primary store from configuration.
pub async fn from_config(config: &DatabaseConfig) -> StoreResult<Arc<dyn PrimaryStore>> {
    config.validate().map_err(StoreError::Config)?;

    match config {
        DatabaseConfig::Sqlite {
            path,
            query_timeout_secs,
        } => {
            let store = SqliteStore::new(path, *query_timeout_secs).await?;
            Ok(Arc::new(store) as Arc<dyn PrimaryStore>)
        }
        DatabaseConfig::Postgres {
            url,
            host,
            port,
            username,
            password,
            database,
            ssl_mode,
            max_connections,
            statement_timeout_ms,
        } => {
            let store = if let Some(url) = url {
                tracing::info!("Connecting to PostgreSQL using connection URL");
                PostgresStore::from_url(url, *max_connections, *statement_timeout_ms).await?
            } else if let (Some(host), Some(database)) = (host.as_ref(), database.as_ref()) {
                PostgresStore::from_params(
                    host,
                    port.unwrap_or(5432),
                    username.as_deref(),
                    password.as_deref(),
                    database,
                    *ssl_mode,
                    *max_connections,
                    *statement_timeout_ms,
                )
                .await?
            } else {
                return Err(StoreError::Config(
                    "postgres config requires either 'url' or 'host' + 'database'".to_string(),
                ));
            };
            Ok(Arc::new(store) as Arc<dyn PrimaryStore>)
        }
    }
}
