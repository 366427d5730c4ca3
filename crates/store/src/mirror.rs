//! Secondary review mirror.
//!
//! The mirror is a write-only projection of reviews kept in a second database.
//! Writes happen after the primary commit, each on its own short-lived
//! connection, and their failures are logged and dropped by [`BestEffortMirror`].

use crate::error::{MirrorError, MirrorResult};
use crate::models::MirrorRecord;
use crate::postgres::pg_options_from_params;
use async_trait::async_trait;
use critique_core::config::DatabaseConfig;
use sqlx::postgres::PgConnectOptions;
use sqlx::sqlite::SqliteConnectOptions;
use sqlx::{ConnectOptions, Connection, PgConnection, SqliteConnection};
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use time::OffsetDateTime;

/// Write side of the review mirror.
#[async_trait]
pub trait ReviewMirror: Send + Sync {
    /// Insert (or overwrite) the mirror copy of a review.
    async fn insert_review(&self, record: &MirrorRecord) -> MirrorResult<()>;

    /// Replace title and description of a mirrored review.
    async fn update_review(
        &self,
        review_id: i64,
        title: &str,
        description: &str,
        updated_at: OffsetDateTime,
    ) -> MirrorResult<()>;

    /// Set or clear the deletion timestamp of a mirrored review.
    async fn set_deleted_at(
        &self,
        review_id: i64,
        deleted_at: Option<OffsetDateTime>,
    ) -> MirrorResult<()>;
}

/// Mirror that drops every write. Used when no mirror database is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopMirror;

#[async_trait]
impl ReviewMirror for NoopMirror {
    async fn insert_review(&self, _record: &MirrorRecord) -> MirrorResult<()> {
        Ok(())
    }

    async fn update_review(
        &self,
        _review_id: i64,
        _title: &str,
        _description: &str,
        _updated_at: OffsetDateTime,
    ) -> MirrorResult<()> {
        Ok(())
    }

    async fn set_deleted_at(
        &self,
        _review_id: i64,
        _deleted_at: Option<OffsetDateTime>,
    ) -> MirrorResult<()> {
        Ok(())
    }
}

enum MirrorTarget {
    Sqlite(SqliteConnectOptions),
    Postgres(PgConnectOptions),
}

/// Mirror backed by a SQLite or PostgreSQL database.
///
/// No pool is kept: every write connects, executes one statement and closes.
pub struct SqlMirror {
    target: MirrorTarget,
    schema_ready: AtomicBool,
}

impl SqlMirror {
    /// Build a mirror for a SQLite file. The file is created on the first write.
    pub fn sqlite(path: impl Into<PathBuf>) -> MirrorResult<Self> {
        let path = path.into();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| {
                MirrorError::Config(format!("cannot create {}: {e}", parent.display()))
            })?;
        }
        let opts = SqliteConnectOptions::new()
            .filename(&path)
            .create_if_missing(true)
            .busy_timeout(Duration::from_secs(5));
        Ok(Self {
            target: MirrorTarget::Sqlite(opts),
            schema_ready: AtomicBool::new(false),
        })
    }

    /// Build a mirror for a PostgreSQL database.
    pub fn postgres(opts: PgConnectOptions) -> Self {
        Self {
            target: MirrorTarget::Postgres(opts),
            schema_ready: AtomicBool::new(false),
        }
    }

    /// Create the mirror table if it does not exist.
    pub async fn ensure_schema(&self) -> MirrorResult<()> {
        match &self.target {
            MirrorTarget::Sqlite(opts) => {
                let mut conn = opts.connect().await?;
                let result = sqlx::query(SQLITE_MIRROR_SCHEMA).execute(&mut conn).await;
                conn.close().await?;
                result?;
            }
            MirrorTarget::Postgres(opts) => {
                let mut conn = opts.connect().await?;
                let result = sqlx::query(POSTGRES_MIRROR_SCHEMA)
                    .execute(&mut conn)
                    .await;
                conn.close().await?;
                result?;
            }
        }
        self.schema_ready.store(true, Ordering::Release);
        Ok(())
    }

    async fn write(&self, op: MirrorWrite<'_>) -> MirrorResult<()> {
        // A mirror that was down at startup gets its table on the first write
        // that reaches it.
        if !self.schema_ready.load(Ordering::Acquire) {
            self.ensure_schema().await?;
        }
        match &self.target {
            MirrorTarget::Sqlite(opts) => {
                let mut conn = opts.connect().await?;
                let result = write_sqlite(&mut conn, &op).await;
                conn.close().await?;
                result
            }
            MirrorTarget::Postgres(opts) => {
                let mut conn = opts.connect().await?;
                let result = write_postgres(&mut conn, &op).await;
                conn.close().await?;
                result
            }
        }
    }
}

enum MirrorWrite<'a> {
    Insert(&'a MirrorRecord),
    Update {
        review_id: i64,
        title: &'a str,
        description: &'a str,
        updated_at: OffsetDateTime,
    },
    Deleted {
        review_id: i64,
        deleted_at: Option<OffsetDateTime>,
    },
}

async fn write_sqlite(conn: &mut SqliteConnection, op: &MirrorWrite<'_>) -> MirrorResult<()> {
    match op {
        MirrorWrite::Insert(record) => {
            sqlx::query(
                r#"
                INSERT INTO review_mirror (
                    id, media_id, title, description, platform_id, user_id,
                    created_at, updated_at, deleted_at
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, NULL)
                ON CONFLICT(id) DO UPDATE SET
                    media_id = excluded.media_id,
                    title = excluded.title,
                    description = excluded.description,
                    platform_id = excluded.platform_id,
                    user_id = excluded.user_id,
                    created_at = excluded.created_at,
                    updated_at = excluded.updated_at,
                    deleted_at = NULL
                "#,
            )
            .bind(record.id)
            .bind(record.media_id)
            .bind(&record.title)
            .bind(&record.description)
            .bind(record.platform_id)
            .bind(record.user_id)
            .bind(record.created_at)
            .bind(record.updated_at)
            .execute(conn)
            .await?;
        }
        MirrorWrite::Update {
            review_id,
            title,
            description,
            updated_at,
        } => {
            sqlx::query(
                "UPDATE review_mirror SET title = ?, description = ?, updated_at = ? WHERE id = ?",
            )
            .bind(*title)
            .bind(*description)
            .bind(*updated_at)
            .bind(*review_id)
            .execute(conn)
            .await?;
        }
        MirrorWrite::Deleted {
            review_id,
            deleted_at,
        } => {
            sqlx::query("UPDATE review_mirror SET deleted_at = ? WHERE id = ?")
                .bind(*deleted_at)
                .bind(*review_id)
                .execute(conn)
                .await?;
        }
    }
    Ok(())
}

async fn write_postgres(conn: &mut PgConnection, op: &MirrorWrite<'_>) -> MirrorResult<()> {
    match op {
        MirrorWrite::Insert(record) => {
            sqlx::query(
                r#"
                INSERT INTO review_mirror (
                    id, media_id, title, description, platform_id, user_id,
                    created_at, updated_at, deleted_at
                ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, NULL)
                ON CONFLICT (id) DO UPDATE SET
                    media_id = EXCLUDED.media_id,
                    title = EXCLUDED.title,
                    description = EXCLUDED.description,
                    platform_id = EXCLUDED.platform_id,
                    user_id = EXCLUDED.user_id,
                    created_at = EXCLUDED.created_at,
                    updated_at = EXCLUDED.updated_at,
                    deleted_at = NULL
                "#,
            )
            .bind(record.id)
            .bind(record.media_id)
            .bind(&record.title)
            .bind(&record.description)
            .bind(record.platform_id)
            .bind(record.user_id)
            .bind(record.created_at)
            .bind(record.updated_at)
            .execute(conn)
            .await?;
        }
        MirrorWrite::Update {
            review_id,
            title,
            description,
            updated_at,
        } => {
            sqlx::query(
                "UPDATE review_mirror SET title = $1, description = $2, updated_at = $3 WHERE id = $4",
            )
            .bind(*title)
            .bind(*description)
            .bind(*updated_at)
            .bind(*review_id)
            .execute(conn)
            .await?;
        }
        MirrorWrite::Deleted {
            review_id,
            deleted_at,
        } => {
            sqlx::query("UPDATE review_mirror SET deleted_at = $1 WHERE id = $2")
                .bind(*deleted_at)
                .bind(*review_id)
                .execute(conn)
                .await?;
        }
    }
    Ok(())
}

#[async_trait]
impl ReviewMirror for SqlMirror {
    async fn insert_review(&self, record: &MirrorRecord) -> MirrorResult<()> {
        self.write(MirrorWrite::Insert(record)).await
    }

    async fn update_review(
        &self,
        review_id: i64,
        title: &str,
        description: &str,
        updated_at: OffsetDateTime,
    ) -> MirrorResult<()> {
        self.write(MirrorWrite::Update {
            review_id,
            title,
            description,
            updated_at,
        })
        .await
    }

    async fn set_deleted_at(
        &self,
        review_id: i64,
        deleted_at: Option<OffsetDateTime>,
    ) -> MirrorResult<()> {
        self.write(MirrorWrite::Deleted {
            review_id,
            deleted_at,
        })
        .await
    }
}

/// Default bound on a single mirror write.
pub const DEFAULT_MIRROR_TIMEOUT: Duration = Duration::from_secs(2);

/// Post-commit mirror policy: every failure is logged at `warn` and dropped.
/// Nothing is retried, and a write that outlives the timeout is abandoned.
#[derive(Clone)]
pub struct BestEffortMirror {
    inner: Arc<dyn ReviewMirror>,
    timeout: Duration,
}

impl BestEffortMirror {
    pub fn new(inner: Arc<dyn ReviewMirror>) -> Self {
        Self {
            inner,
            timeout: DEFAULT_MIRROR_TIMEOUT,
        }
    }

    /// A policy wrapper around [`NoopMirror`].
    pub fn disabled() -> Self {
        Self::new(Arc::new(NoopMirror))
    }

    /// Bound every mirror write by `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    async fn bounded<F>(&self, write: F) -> MirrorResult<()>
    where
        F: std::future::Future<Output = MirrorResult<()>>,
    {
        match tokio::time::timeout(self.timeout, write).await {
            Ok(result) => result,
            Err(_) => Err(MirrorError::Timeout(self.timeout)),
        }
    }

    pub async fn review_created(&self, record: &MirrorRecord) {
        if let Err(e) = self.bounded(self.inner.insert_review(record)).await {
            tracing::warn!(review_id = record.id, error = %e, "Mirror insert failed");
        }
    }

    pub async fn review_updated(
        &self,
        review_id: i64,
        title: &str,
        description: &str,
        updated_at: OffsetDateTime,
    ) {
        let write = self
            .inner
            .update_review(review_id, title, description, updated_at);
        if let Err(e) = self.bounded(write).await {
            tracing::warn!(review_id, error = %e, "Mirror update failed");
        }
    }

    pub async fn review_deleted(&self, review_id: i64, deleted_at: OffsetDateTime) {
        let write = self.inner.set_deleted_at(review_id, Some(deleted_at));
        if let Err(e) = self.bounded(write).await {
            tracing::warn!(review_id, error = %e, "Mirror soft-delete failed");
        }
    }

    pub async fn review_restored(&self, review_id: i64) {
        if let Err(e) = self.bounded(self.inner.set_deleted_at(review_id, None)).await {
            tracing::warn!(review_id, error = %e, "Mirror restore failed");
        }
    }
}

impl std::fmt::Debug for BestEffortMirror {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BestEffortMirror").finish_non_exhaustive()
    }
}

/// Create a review mirror from configuration. `None` disables mirroring.
///
/// The mirror table is created eagerly; an unreachable mirror only logs a
/// warning and the table is created by the first write that gets through.
pub async fn mirror_from_config(
    config: Option<&DatabaseConfig>,
) -> MirrorResult<Arc<dyn ReviewMirror>> {
    let Some(config) = config else {
        tracing::info!("Review mirror disabled");
        return Ok(Arc::new(NoopMirror));
    };

    config.validate().map_err(MirrorError::Config)?;

    let mirror = match config {
        DatabaseConfig::Sqlite { path, .. } => SqlMirror::sqlite(path)?,
        DatabaseConfig::Postgres {
            url,
            host,
            port,
            username,
            password,
            database,
            ssl_mode,
            statement_timeout_ms,
            ..
        } => {
            let mut opts = if let Some(url) = url {
                PgConnectOptions::from_str(url)?
            } else if let (Some(host), Some(database)) = (host.as_ref(), database.as_ref()) {
                pg_options_from_params(
                    host,
                    port.unwrap_or(5432),
                    username.as_deref(),
                    password.as_deref(),
                    database,
                    *ssl_mode,
                )
            } else {
                return Err(MirrorError::Config(
                    "postgres config requires either 'url' or 'host' + 'database'".to_string(),
                ));
            };
            if let Some(timeout_ms) = statement_timeout_ms {
                opts = opts.options([("statement_timeout", format!("{}ms", timeout_ms))]);
            }
            SqlMirror::postgres(opts)
        }
    };

    if let Err(e) = mirror.ensure_schema().await {
        tracing::warn!(error = %e, "Review mirror unreachable at startup");
    } else {
        tracing::info!("Review mirror ready");
    }

    Ok(Arc::new(mirror))
}

const SQLITE_MIRROR_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS review_mirror (
    id INTEGER PRIMARY KEY,
    media_id INTEGER NOT NULL,
    title TEXT NOT NULL,
    description TEXT NOT NULL,
    platform_id INTEGER NOT NULL,
    user_id INTEGER NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    deleted_at TEXT
)
"#;

const POSTGRES_MIRROR_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS review_mirror (
    id BIGINT PRIMARY KEY,
    media_id BIGINT NOT NULL,
    title TEXT NOT NULL,
    description TEXT NOT NULL,
    platform_id BIGINT NOT NULL,
    user_id BIGINT NOT NULL,
    created_at TIMESTAMPTZ NOT NULL,
    updated_at TIMESTAMPTZ NOT NULL,
    deleted_at TIMESTAMPTZ
)
"#;
