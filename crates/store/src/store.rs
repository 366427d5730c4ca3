//! Primary store trait and the SQLite implementation.

use crate::error::{StoreError, StoreResult};
use crate::repos::{CatalogRepo, EngagementRepo, ReviewRepo, SessionRepo, UserRepo};
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// Combined primary store trait.
#[async_trait]
pub trait PrimaryStore:
    ReviewRepo + EngagementRepo + CatalogRepo + UserRepo + SessionRepo + Send + Sync
{
    /// Create the schema and seed reference rows.
    async fn migrate(&self) -> StoreResult<()>;

    /// Check database connectivity and health.
    async fn health_check(&self) -> StoreResult<()>;

    /// Close the connection pool. Pending queries finish first.
    async fn close(&self);
}

/// SQLite-based primary store.
pub struct SqliteStore {
    pool: Pool<Sqlite>,
    #[allow(dead_code)] // advisory, SQLite has no statement cancellation
    query_timeout_secs: u64,
}

impl SqliteStore {
    /// Create a new SQLite store and apply the schema.
    pub async fn new(
        path: impl AsRef<Path>,
        query_timeout_secs: Option<u64>,
    ) -> StoreResult<Self> {
        let path = path.as_ref();
        let query_timeout_secs = query_timeout_secs.unwrap_or(30);

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let opts = SqliteConnectOptions::from_str(&format!("sqlite:{}?mode=rwc", path.display()))?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
            .foreign_keys(true)
            // Prevent transient "database is locked" errors under concurrent access.
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            // A single connection serializes writers, so transactions never
            // hit "database is locked" under axum concurrency.
            .max_connections(1)
            .connect_with(opts)
            .await?;

        let store = Self {
            pool,
            query_timeout_secs,
        };
        store.migrate().await?;

        tracing::debug!(
            path = %path.display(),
            query_timeout_secs,
            "SQLite primary store ready (query timeout is advisory only)"
        );

        Ok(store)
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }
}

#[async_trait]
impl PrimaryStore for SqliteStore {
    async fn migrate(&self) -> StoreResult<()> {
        sqlx::query(SCHEMA_SQL).execute(&self.pool).await?;
        Ok(())
    }

    async fn health_check(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}

// Implement all the repository traits for SqliteStore
mod sqlite_impl {
    use super::*;
    use crate::error::{is_foreign_key_violation, is_unique_violation};
    use crate::models::*;
    use crate::repos::reviews::{attach_genres, group_genres};
    use crate::repos::{FlagChange, escape_like};
    use critique_core::{DislikeOutcome, EngagementState, LikeOutcome, Tally};
    use sqlx::{QueryBuilder, SqliteConnection};
    use time::OffsetDateTime;
    use uuid::Uuid;

    const REVIEW_SELECT: &str = r#"
        SELECT r.id, r.media_id, m.name AS media_name, r.title, r.description,
               r.platform_id, r.user_id, u.name AS user_name, r.is_blocked,
               r.created_at, r.updated_at
        FROM reviews r
        JOIN users u ON u.id = r.user_id
        JOIN media m ON m.id = r.media_id
    "#;

    fn to_i64(value: u64) -> i64 {
        i64::try_from(value).unwrap_or(i64::MAX)
    }

    async fn insert_genre_links(
        conn: &mut SqliteConnection,
        review_id: i64,
        genre_ids: &[i64],
    ) -> Result<(), sqlx::Error> {
        if genre_ids.is_empty() {
            return Ok(());
        }
        let mut qb = QueryBuilder::<Sqlite>::new("INSERT INTO review_genres (review_id, genre_id) ");
        qb.push_values(genre_ids, |mut row, genre_id| {
            row.push_bind(review_id).push_bind(*genre_id);
        });
        qb.build().execute(conn).await?;
        Ok(())
    }

    /// Fail with NotFound unless the review exists and is not soft-deleted.
    async fn require_active_review(
        conn: &mut SqliteConnection,
        review_id: i64,
    ) -> StoreResult<()> {
        let blocked: Option<bool> =
            sqlx::query_scalar("SELECT is_blocked FROM reviews WHERE id = ?")
                .bind(review_id)
                .fetch_optional(conn)
                .await?;
        match blocked {
            Some(false) => Ok(()),
            _ => Err(StoreError::NotFound(format!("review {review_id}"))),
        }
    }

    fn map_reference_error(err: sqlx::Error) -> StoreError {
        if is_foreign_key_violation(&err) {
            StoreError::InvalidReference(
                "media, platform, user or genre does not exist".to_string(),
            )
        } else {
            err.into()
        }
    }

    impl SqliteStore {
        async fn fetch_review_genres(&self, review_ids: &[i64]) -> StoreResult<Vec<ReviewGenreRow>> {
            if review_ids.is_empty() {
                return Ok(Vec::new());
            }
            let mut qb = QueryBuilder::<Sqlite>::new(
                "SELECT rg.review_id, rg.genre_id, g.name AS genre_name \
                 FROM review_genres rg JOIN genres g ON g.id = rg.genre_id \
                 WHERE rg.review_id IN (",
            );
            let mut ids = qb.separated(", ");
            for id in review_ids {
                ids.push_bind(*id);
            }
            ids.push_unseparated(") ORDER BY rg.review_id, rg.genre_id");
            let rows = qb
                .build_query_as::<ReviewGenreRow>()
                .fetch_all(&self.pool)
                .await?;
            Ok(rows)
        }

        async fn with_genres(&self, rows: Vec<ReviewJoinRow>) -> StoreResult<Vec<ReviewDetail>> {
            let ids: Vec<i64> = rows.iter().map(|r| r.id).collect();
            let genres = self.fetch_review_genres(&ids).await?;
            Ok(attach_genres(rows, genres))
        }
    }

    #[async_trait]
    impl ReviewRepo for SqliteStore {
        async fn insert_review(&self, review: &NewReview, now: OffsetDateTime) -> StoreResult<i64> {
            let mut tx = self.pool.begin().await?;

            let review_id: i64 = sqlx::query_scalar(
                r#"
                INSERT INTO reviews (
                    media_id, title, title_folded, description, platform_id, user_id,
                    is_blocked, created_at, updated_at
                ) VALUES (?, ?, ?, ?, ?, ?, 0, ?, ?)
                RETURNING id
                "#,
            )
            .bind(review.media_id)
            .bind(&review.title)
            .bind(review.title.to_lowercase())
            .bind(&review.description)
            .bind(review.platform_id)
            .bind(review.user_id)
            .bind(now)
            .bind(now)
            .fetch_one(&mut *tx)
            .await
            .map_err(map_reference_error)?;

            insert_genre_links(&mut tx, review_id, &review.genre_ids)
                .await
                .map_err(map_reference_error)?;

            tx.commit().await?;
            Ok(review_id)
        }

        async fn update_review(
            &self,
            review_id: i64,
            update: &ReviewUpdate,
            now: OffsetDateTime,
        ) -> StoreResult<bool> {
            let mut tx = self.pool.begin().await?;

            let updated = sqlx::query(
                r#"
                UPDATE reviews SET title = ?, title_folded = ?, description = ?, updated_at = ?
                WHERE id = ?
                "#,
            )
            .bind(&update.title)
            .bind(update.title.to_lowercase())
            .bind(&update.description)
            .bind(now)
            .bind(review_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

            if updated == 0 {
                tx.rollback().await?;
                return Ok(false);
            }

            sqlx::query("DELETE FROM review_genres WHERE review_id = ?")
                .bind(review_id)
                .execute(&mut *tx)
                .await?;

            insert_genre_links(&mut tx, review_id, &update.genre_ids)
                .await
                .map_err(map_reference_error)?;

            tx.commit().await?;
            Ok(true)
        }

        async fn set_review_blocked(
            &self,
            review_id: i64,
            blocked: bool,
            now: OffsetDateTime,
        ) -> StoreResult<FlagChange> {
            let changed = sqlx::query(
                "UPDATE reviews SET is_blocked = ?, updated_at = ? WHERE id = ? AND is_blocked <> ?",
            )
            .bind(blocked)
            .bind(now)
            .bind(review_id)
            .bind(blocked)
            .execute(&self.pool)
            .await?
            .rows_affected();

            let exists = changed > 0
                || sqlx::query_scalar::<_, bool>(
                    "SELECT EXISTS(SELECT 1 FROM reviews WHERE id = ?)",
                )
                .bind(review_id)
                .fetch_one(&self.pool)
                .await?;

            Ok(FlagChange::classify(changed, exists))
        }

        async fn get_review(&self, review_id: i64) -> StoreResult<Option<ReviewRow>> {
            let row = sqlx::query_as::<_, ReviewRow>("SELECT * FROM reviews WHERE id = ?")
                .bind(review_id)
                .fetch_optional(&self.pool)
                .await?;
            Ok(row)
        }

        async fn get_review_detail(&self, review_id: i64) -> StoreResult<Option<ReviewDetail>> {
            let sql = format!("{REVIEW_SELECT} WHERE r.id = ?");
            let Some(row) = sqlx::query_as::<_, ReviewJoinRow>(&sql)
                .bind(review_id)
                .fetch_optional(&self.pool)
                .await?
            else {
                return Ok(None);
            };
            Ok(self.with_genres(vec![row]).await?.into_iter().next())
        }

        async fn search_reviews_by_title(&self, pattern: &str) -> StoreResult<Vec<ReviewDetail>> {
            // SQLite only folds ASCII, so both sides are lowercased here.
            let sql = format!(
                "{REVIEW_SELECT} WHERE r.is_blocked = 0 AND r.title_folded LIKE ? ESCAPE '\\' ORDER BY r.id"
            );
            let rows = sqlx::query_as::<_, ReviewJoinRow>(&sql)
                .bind(escape_like(&pattern.to_lowercase()))
                .fetch_all(&self.pool)
                .await?;
            self.with_genres(rows).await
        }

        async fn list_active_reviews(
            &self,
            limit: u32,
            offset: u64,
        ) -> StoreResult<Vec<ReviewDetail>> {
            let sql = format!("{REVIEW_SELECT} WHERE r.is_blocked = 0 ORDER BY r.id LIMIT ? OFFSET ?");
            let rows = sqlx::query_as::<_, ReviewJoinRow>(&sql)
                .bind(i64::from(limit))
                .bind(to_i64(offset))
                .fetch_all(&self.pool)
                .await?;
            self.with_genres(rows).await
        }

        async fn list_blocked_reviews(&self) -> StoreResult<Vec<ReviewDetail>> {
            let sql = format!("{REVIEW_SELECT} WHERE r.is_blocked = 1 ORDER BY r.id");
            let rows = sqlx::query_as::<_, ReviewJoinRow>(&sql)
                .fetch_all(&self.pool)
                .await?;
            self.with_genres(rows).await
        }

        async fn review_genre_ids(&self, review_id: i64) -> StoreResult<Vec<i64>> {
            let ids = sqlx::query_scalar(
                "SELECT genre_id FROM review_genres WHERE review_id = ? ORDER BY genre_id",
            )
            .bind(review_id)
            .fetch_all(&self.pool)
            .await?;
            Ok(ids)
        }

        async fn review_tally(&self, review_id: i64) -> StoreResult<Option<Tally>> {
            if self.get_review(review_id).await?.is_none() {
                return Ok(None);
            }
            let (likes, dislikes): (i64, i64) = sqlx::query_as(
                r#"
                SELECT
                    COALESCE(SUM(CASE WHEN gesture = 1 THEN 1 ELSE 0 END), 0),
                    COALESCE(SUM(CASE WHEN gesture = 0 THEN 1 ELSE 0 END), 0)
                FROM review_actions
                WHERE review_id = ?
                "#,
            )
            .bind(review_id)
            .fetch_one(&self.pool)
            .await?;
            Ok(Some(Tally {
                likes: likes as u64,
                dislikes: dislikes as u64,
            }))
        }

        async fn count_reviews(&self) -> StoreResult<u64> {
            let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM reviews")
                .fetch_one(&self.pool)
                .await?;
            Ok(count as u64)
        }
    }

    #[async_trait]
    impl EngagementRepo for SqliteStore {
        async fn like_review(
            &self,
            user_id: i64,
            review_id: i64,
            now: OffsetDateTime,
        ) -> StoreResult<LikeOutcome> {
            let mut tx = self.pool.begin().await?;
            require_active_review(&mut tx, review_id).await?;

            let inserted = sqlx::query(
                r#"
                INSERT INTO review_actions (user_id, review_id, gesture, created_at, updated_at)
                VALUES (?, ?, 1, ?, ?)
                "#,
            )
            .bind(user_id)
            .bind(review_id)
            .bind(now)
            .bind(now)
            .execute(&mut *tx)
            .await;

            match inserted {
                Ok(_) => {}
                Err(e) if is_unique_violation(&e) => {
                    let gesture: Option<bool> = sqlx::query_scalar(
                        "SELECT gesture FROM review_actions WHERE user_id = ? AND review_id = ?",
                    )
                    .bind(user_id)
                    .bind(review_id)
                    .fetch_optional(&mut *tx)
                    .await?;
                    tx.rollback().await?;
                    return Ok(LikeOutcome::AlreadyActed(EngagementState::from_gesture(
                        gesture,
                    )));
                }
                Err(e) => return Err(e.into()),
            }

            tx.commit().await?;
            Ok(LikeOutcome::Liked)
        }

        async fn dislike_review(
            &self,
            user_id: i64,
            review_id: i64,
            now: OffsetDateTime,
        ) -> StoreResult<DislikeOutcome> {
            let mut tx = self.pool.begin().await?;
            require_active_review(&mut tx, review_id).await?;

            let previous: Option<bool> = sqlx::query_scalar(
                "SELECT gesture FROM review_actions WHERE user_id = ? AND review_id = ?",
            )
            .bind(user_id)
            .bind(review_id)
            .fetch_optional(&mut *tx)
            .await?;

            sqlx::query(
                r#"
                INSERT INTO review_actions (user_id, review_id, gesture, created_at, updated_at)
                VALUES (?, ?, 0, ?, ?)
                ON CONFLICT(user_id, review_id) DO UPDATE
                SET gesture = 0, updated_at = excluded.updated_at
                WHERE review_actions.gesture <> 0
                "#,
            )
            .bind(user_id)
            .bind(review_id)
            .bind(now)
            .bind(now)
            .execute(&mut *tx)
            .await?;

            tx.commit().await?;
            Ok(DislikeOutcome {
                previous: EngagementState::from_gesture(previous),
            })
        }

        async fn engagement_state(
            &self,
            user_id: i64,
            review_id: i64,
        ) -> StoreResult<EngagementState> {
            let gesture: Option<bool> = sqlx::query_scalar(
                "SELECT gesture FROM review_actions WHERE user_id = ? AND review_id = ?",
            )
            .bind(user_id)
            .bind(review_id)
            .fetch_optional(&self.pool)
            .await?;
            Ok(EngagementState::from_gesture(gesture))
        }

        async fn list_liked_reviews(&self, user_id: i64) -> StoreResult<Vec<LikedReview>> {
            let rows = sqlx::query_as::<_, LikedReviewRow>(
                r#"
                SELECT r.id AS review_id, r.title, r.description, r.created_at, r.updated_at,
                       u.id AS creator_id, u.name AS creator_name, u.email AS creator_email,
                       ra.updated_at AS liked_at
                FROM review_actions ra
                JOIN reviews r ON r.id = ra.review_id
                JOIN users u ON u.id = r.user_id
                WHERE ra.user_id = ? AND ra.gesture = 1 AND r.is_blocked = 0
                ORDER BY ra.updated_at DESC, r.id DESC
                "#,
            )
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;

            let ids: Vec<i64> = rows.iter().map(|r| r.review_id).collect();
            let mut genres = group_genres(self.fetch_review_genres(&ids).await?);
            Ok(rows
                .into_iter()
                .map(|review| LikedReview {
                    genres: genres.remove(&review.review_id).unwrap_or_default(),
                    review,
                })
                .collect())
        }
    }

    #[async_trait]
    impl CatalogRepo for SqliteStore {
        async fn create_genre(&self, name: &str) -> StoreResult<GenreRow> {
            sqlx::query_as::<_, GenreRow>("INSERT INTO genres (name) VALUES (?) RETURNING id, name")
                .bind(name)
                .fetch_one(&self.pool)
                .await
                .map_err(|e| {
                    if is_unique_violation(&e) {
                        StoreError::AlreadyExists(format!("genre '{name}'"))
                    } else {
                        e.into()
                    }
                })
        }

        async fn list_genres(&self) -> StoreResult<Vec<GenreRow>> {
            let rows = sqlx::query_as::<_, GenreRow>("SELECT id, name FROM genres ORDER BY id")
                .fetch_all(&self.pool)
                .await?;
            Ok(rows)
        }

        async fn top_genres(&self, limit: u32) -> StoreResult<Vec<GenreCountRow>> {
            let rows = sqlx::query_as::<_, GenreCountRow>(
                r#"
                SELECT g.id, g.name, COUNT(rg.review_id) AS review_count
                FROM genres g
                LEFT JOIN review_genres rg ON rg.genre_id = g.id
                GROUP BY g.id, g.name
                ORDER BY review_count DESC, g.id ASC
                LIMIT ?
                "#,
            )
            .bind(i64::from(limit))
            .fetch_all(&self.pool)
            .await?;
            Ok(rows)
        }

        async fn create_media(&self, name: &str) -> StoreResult<MediaRow> {
            let row =
                sqlx::query_as::<_, MediaRow>("INSERT INTO media (name) VALUES (?) RETURNING id, name")
                    .bind(name)
                    .fetch_one(&self.pool)
                    .await?;
            Ok(row)
        }

        async fn list_media(&self) -> StoreResult<Vec<MediaRow>> {
            let rows = sqlx::query_as::<_, MediaRow>("SELECT id, name FROM media ORDER BY id")
                .fetch_all(&self.pool)
                .await?;
            Ok(rows)
        }

        async fn create_platform(&self, name: &str) -> StoreResult<PlatformRow> {
            let row = sqlx::query_as::<_, PlatformRow>(
                "INSERT INTO platforms (name) VALUES (?) RETURNING id, name",
            )
            .bind(name)
            .fetch_one(&self.pool)
            .await?;
            Ok(row)
        }

        async fn list_platforms(&self) -> StoreResult<Vec<PlatformRow>> {
            let rows =
                sqlx::query_as::<_, PlatformRow>("SELECT id, name FROM platforms ORDER BY id")
                    .fetch_all(&self.pool)
                    .await?;
            Ok(rows)
        }

        async fn list_roles(&self) -> StoreResult<Vec<RoleRow>> {
            let rows = sqlx::query_as::<_, RoleRow>("SELECT id, name FROM roles ORDER BY id")
                .fetch_all(&self.pool)
                .await?;
            Ok(rows)
        }
    }

    #[async_trait]
    impl UserRepo for SqliteStore {
        async fn create_user(&self, user: &NewUser, now: OffsetDateTime) -> StoreResult<UserRow> {
            sqlx::query_as::<_, UserRow>(
                r#"
                INSERT INTO users (
                    name, lastname, email, password_hash, role_id,
                    is_blocked, created_at, updated_at
                ) VALUES (?, ?, ?, ?, ?, 0, ?, ?)
                RETURNING *
                "#,
            )
            .bind(&user.name)
            .bind(&user.lastname)
            .bind(&user.email)
            .bind(&user.password_hash)
            .bind(user.role_id)
            .bind(now)
            .bind(now)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    StoreError::AlreadyExists(format!("email '{}'", user.email))
                } else {
                    e.into()
                }
            })
        }

        async fn get_user(&self, user_id: i64) -> StoreResult<Option<UserRow>> {
            let row = sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE id = ?")
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await?;
            Ok(row)
        }

        async fn get_user_by_email(&self, email: &str) -> StoreResult<Option<UserRow>> {
            let row = sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE email = ?")
                .bind(email)
                .fetch_optional(&self.pool)
                .await?;
            Ok(row)
        }

        async fn list_users(&self) -> StoreResult<Vec<UserRow>> {
            let rows = sqlx::query_as::<_, UserRow>("SELECT * FROM users ORDER BY id")
                .fetch_all(&self.pool)
                .await?;
            Ok(rows)
        }

        async fn update_user(
            &self,
            user_id: i64,
            update: &UserUpdate,
            now: OffsetDateTime,
        ) -> StoreResult<Option<UserRow>> {
            let row = sqlx::query_as::<_, UserRow>(
                r#"
                UPDATE users
                SET name = ?, lastname = ?,
                    password_hash = COALESCE(?, password_hash),
                    updated_at = ?
                WHERE id = ?
                RETURNING *
                "#,
            )
            .bind(&update.name)
            .bind(&update.lastname)
            .bind(update.password_hash.as_deref())
            .bind(now)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
            Ok(row)
        }

        async fn set_user_role(
            &self,
            user_id: i64,
            role_id: i64,
            now: OffsetDateTime,
        ) -> StoreResult<bool> {
            let updated = sqlx::query("UPDATE users SET role_id = ?, updated_at = ? WHERE id = ?")
                .bind(role_id)
                .bind(now)
                .bind(user_id)
                .execute(&self.pool)
                .await?
                .rows_affected();
            Ok(updated > 0)
        }

        async fn set_user_blocked(
            &self,
            user_id: i64,
            blocked: bool,
            now: OffsetDateTime,
        ) -> StoreResult<FlagChange> {
            let changed = sqlx::query(
                "UPDATE users SET is_blocked = ?, updated_at = ? WHERE id = ? AND is_blocked <> ?",
            )
            .bind(blocked)
            .bind(now)
            .bind(user_id)
            .bind(blocked)
            .execute(&self.pool)
            .await?
            .rows_affected();

            let exists = changed > 0 || self.get_user(user_id).await?.is_some();
            Ok(FlagChange::classify(changed, exists))
        }
    }

    #[async_trait]
    impl SessionRepo for SqliteStore {
        async fn create_session(&self, session: &SessionRow) -> StoreResult<()> {
            sqlx::query(
                r#"
                INSERT INTO sessions (
                    session_id, user_id, token_hash, created_at,
                    expires_at, revoked_at, last_used_at
                ) VALUES (?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(session.session_id)
            .bind(session.user_id)
            .bind(&session.token_hash)
            .bind(session.created_at)
            .bind(session.expires_at)
            .bind(session.revoked_at)
            .bind(session.last_used_at)
            .execute(&self.pool)
            .await?;
            Ok(())
        }

        async fn get_session_by_hash(&self, token_hash: &str) -> StoreResult<Option<SessionRow>> {
            let row =
                sqlx::query_as::<_, SessionRow>("SELECT * FROM sessions WHERE token_hash = ?")
                    .bind(token_hash)
                    .fetch_optional(&self.pool)
                    .await?;
            Ok(row)
        }

        async fn touch_session(&self, session_id: Uuid, used_at: OffsetDateTime) -> StoreResult<()> {
            sqlx::query("UPDATE sessions SET last_used_at = ? WHERE session_id = ?")
                .bind(used_at)
                .bind(session_id)
                .execute(&self.pool)
                .await?;
            Ok(())
        }

        async fn revoke_session(
            &self,
            session_id: Uuid,
            revoked_at: OffsetDateTime,
        ) -> StoreResult<()> {
            sqlx::query(
                "UPDATE sessions SET revoked_at = ? WHERE session_id = ? AND revoked_at IS NULL",
            )
            .bind(revoked_at)
            .bind(session_id)
            .execute(&self.pool)
            .await?;
            Ok(())
        }

        async fn revoke_user_sessions(
            &self,
            user_id: i64,
            revoked_at: OffsetDateTime,
        ) -> StoreResult<u64> {
            let revoked = sqlx::query(
                "UPDATE sessions SET revoked_at = ? WHERE user_id = ? AND revoked_at IS NULL",
            )
            .bind(revoked_at)
            .bind(user_id)
            .execute(&self.pool)
            .await?
            .rows_affected();
            Ok(revoked)
        }
    }
}

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS roles (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL UNIQUE
);

INSERT OR IGNORE INTO roles (id, name) VALUES (1, 'user'), (2, 'admin');

CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    lastname TEXT NOT NULL,
    email TEXT NOT NULL UNIQUE,
    password_hash TEXT NOT NULL,
    role_id INTEGER NOT NULL REFERENCES roles(id),
    is_blocked INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS sessions (
    session_id BLOB PRIMARY KEY,
    user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    token_hash TEXT NOT NULL UNIQUE,
    created_at TEXT NOT NULL,
    expires_at TEXT NOT NULL,
    revoked_at TEXT,
    last_used_at TEXT
);

CREATE INDEX IF NOT EXISTS idx_sessions_user ON sessions(user_id);

CREATE TABLE IF NOT EXISTS genres (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS media (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS platforms (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS reviews (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    media_id INTEGER NOT NULL REFERENCES media(id),
    title TEXT NOT NULL,
    -- Lowercased title used by substring search.
    title_folded TEXT NOT NULL,
    description TEXT NOT NULL,
    platform_id INTEGER NOT NULL REFERENCES platforms(id),
    user_id INTEGER NOT NULL REFERENCES users(id),
    is_blocked INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_reviews_blocked ON reviews(is_blocked, id);

CREATE TABLE IF NOT EXISTS review_genres (
    review_id INTEGER NOT NULL REFERENCES reviews(id) ON DELETE CASCADE,
    genre_id INTEGER NOT NULL REFERENCES genres(id),
    PRIMARY KEY (review_id, genre_id)
);

CREATE INDEX IF NOT EXISTS idx_review_genres_genre ON review_genres(genre_id);

CREATE TABLE IF NOT EXISTS review_actions (
    user_id INTEGER NOT NULL REFERENCES users(id),
    review_id INTEGER NOT NULL REFERENCES reviews(id) ON DELETE CASCADE,
    gesture INTEGER NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    PRIMARY KEY (user_id, review_id)
);

CREATE INDEX IF NOT EXISTS idx_review_actions_review ON review_actions(review_id);
"#;
