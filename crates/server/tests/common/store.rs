//! Primary store setup for integration tests.

use critique_store::{PostgresStore, PrimaryStore, SqliteStore, StoreError, StoreResult};
use std::sync::Arc;
use tempfile::TempDir;
use testcontainers::{ContainerAsync, ImageExt, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres;

#[allow(dead_code)]
pub const POSTGRES_CONTAINER_START_ERR_PREFIX: &str = "Failed to start Postgres container";

/// SQLite-backed primary store in a temporary directory.
pub struct TestStore {
    store: Arc<SqliteStore>,
    _temp_dir: TempDir,
}

#[allow(dead_code)]
impl TestStore {
    pub async fn new() -> Self {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");
        let db_path = temp_dir.path().join("critique.db");
        let store = Arc::new(
            SqliteStore::new(&db_path, None)
                .await
                .expect("Failed to create primary store"),
        );

        Self {
            store,
            _temp_dir: temp_dir,
        }
    }

    /// Get access to the store as a trait object.
    pub fn store(&self) -> Arc<dyn PrimaryStore> {
        self.store.clone()
    }
}

/// PostgreSQL-backed primary store running in a throwaway container.
pub struct PostgresTestStore {
    store: Arc<PostgresStore>,
    _container: ContainerAsync<Postgres>,
}

#[allow(dead_code)]
impl PostgresTestStore {
    pub async fn new() -> StoreResult<Self> {
        let container = Postgres::default()
            .with_tag("15-alpine")
            .start()
            .await
            .map_err(|e| {
                StoreError::Internal(format!("{POSTGRES_CONTAINER_START_ERR_PREFIX}: {e}"))
            })?;

        let host = container.get_host().await.expect("Failed to get host");
        let port = container
            .get_host_port_ipv4(5432)
            .await
            .expect("Failed to get port");

        // Default credentials from testcontainers-modules postgres
        let url = format!("postgres://postgres:postgres@{host}:{port}/postgres");
        let store = PostgresStore::from_url(&url, 5, None).await?;

        Ok(Self {
            store: Arc::new(store),
            _container: container,
        })
    }

    pub fn store(&self) -> Arc<dyn PrimaryStore> {
        self.store.clone()
    }
}
