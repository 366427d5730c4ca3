//! PostgreSQL-based primary store implementation.

use crate::error::{StoreError, StoreResult, is_foreign_key_violation, is_unique_violation};
use crate::models::*;
use crate::repos::reviews::{attach_genres, group_genres};
use crate::repos::{
    CatalogRepo, EngagementRepo, FlagChange, ReviewRepo, SessionRepo, UserRepo, escape_like,
};
use crate::store::PrimaryStore;
use async_trait::async_trait;
use critique_core::config::PgSslMode;
use critique_core::{DislikeOutcome, EngagementState, LikeOutcome, Tally};
use sqlx::postgres::{PgConnectOptions, PgPoolOptions, PgSslMode as SqlxPgSslMode};
use sqlx::{PgConnection, Pool, Postgres, QueryBuilder};
use std::str::FromStr;
use time::OffsetDateTime;
use uuid::Uuid;

pub(crate) fn postgres_schema_statements(schema: &str) -> Vec<&str> {
    schema
        .split(';')
        .filter_map(|statement| {
            let trimmed = statement.trim();
            if trimmed.is_empty() {
                return None;
            }
            let has_sql = trimmed.lines().any(|line| {
                let line = line.trim();
                !line.is_empty() && !line.starts_with("--")
            });
            has_sql.then_some(trimmed)
        })
        .collect()
}

/// Translate the config SSL mode into the sqlx one.
pub(crate) fn sqlx_ssl_mode(mode: PgSslMode) -> SqlxPgSslMode {
    match mode {
        PgSslMode::Disable => SqlxPgSslMode::Disable,
        PgSslMode::Prefer => SqlxPgSslMode::Prefer,
        PgSslMode::Require => SqlxPgSslMode::Require,
    }
}

/// Build connection options from individual parameters.
pub(crate) fn pg_options_from_params(
    host: &str,
    port: u16,
    username: Option<&str>,
    password: Option<&str>,
    database: &str,
    ssl_mode: Option<PgSslMode>,
) -> PgConnectOptions {
    let mut opts = PgConnectOptions::new()
        .host(host)
        .port(port)
        .database(database);
    if let Some(user) = username {
        opts = opts.username(user);
    }
    if let Some(pass) = password {
        opts = opts.password(pass);
    }
    if let Some(mode) = ssl_mode {
        opts = opts.ssl_mode(sqlx_ssl_mode(mode));
    }
    opts
}

/// PostgreSQL-based primary store.
pub struct PostgresStore {
    pool: Pool<Postgres>,
}

impl PostgresStore {
    /// Create a new PostgreSQL store from a connection URL.
    pub async fn from_url(
        url: &str,
        max_connections: u32,
        statement_timeout_ms: Option<u64>,
    ) -> StoreResult<Self> {
        let opts = PgConnectOptions::from_str(url)?;
        Self::connect(opts, max_connections, statement_timeout_ms).await
    }

    /// Create a new PostgreSQL store from individual connection parameters,
    /// so the password can come from its own environment variable.
    #[allow(clippy::too_many_arguments)]
    pub async fn from_params(
        host: &str,
        port: u16,
        username: Option<&str>,
        password: Option<&str>,
        database: &str,
        ssl_mode: Option<PgSslMode>,
        max_connections: u32,
        statement_timeout_ms: Option<u64>,
    ) -> StoreResult<Self> {
        let opts = pg_options_from_params(host, port, username, password, database, ssl_mode);

        // Log connection info without password
        tracing::info!(
            host = host,
            port = port,
            database = database,
            username = username.unwrap_or("<none>"),
            ssl_mode = ?ssl_mode,
            "Connecting to PostgreSQL with individual parameters"
        );

        Self::connect(opts, max_connections, statement_timeout_ms).await
    }

    async fn connect(
        mut opts: PgConnectOptions,
        max_connections: u32,
        statement_timeout_ms: Option<u64>,
    ) -> StoreResult<Self> {
        if let Some(timeout_ms) = statement_timeout_ms {
            opts = opts.options([("statement_timeout", format!("{}ms", timeout_ms))]);
            tracing::info!("PostgreSQL statement_timeout set to {}ms", timeout_ms);
        }

        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect_with(opts)
            .await?;

        let store = Self { pool };
        store.migrate().await?;

        Ok(store)
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &Pool<Postgres> {
        &self.pool
    }

    async fn fetch_review_genres(&self, review_ids: &[i64]) -> StoreResult<Vec<ReviewGenreRow>> {
        if review_ids.is_empty() {
            return Ok(Vec::new());
        }
        let rows = sqlx::query_as::<_, ReviewGenreRow>(
            r#"
            SELECT rg.review_id, rg.genre_id, g.name AS genre_name
            FROM review_genres rg
            JOIN genres g ON g.id = rg.genre_id
            WHERE rg.review_id = ANY($1)
            ORDER BY rg.review_id, rg.genre_id
            "#,
        )
        .bind(review_ids)
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
impl PrimaryStore for PostgresStore {
    async fn migrate(&self) -> StoreResult<()> {
        // PostgreSQL doesn't allow multiple statements in a single prepared statement,
        // so we split the schema and execute each statement separately.
        for statement in postgres_schema_statements(POSTGRES_SCHEMA) {
            sqlx::query(statement).execute(&self.pool).await?;
        }
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

fn map_reference_error(err: sqlx::Error) -> StoreError {
    if is_foreign_key_violation(&err) {
        StoreError::InvalidReference("media, platform, user or genre does not exist".to_string())
    } else {
        err.into()
    }
}

async fn insert_genre_links(
    conn: &mut PgConnection,
    review_id: i64,
    genre_ids: &[i64],
) -> Result<(), sqlx::Error> {
    if genre_ids.is_empty() {
        return Ok(());
    }
    let mut qb = QueryBuilder::<Postgres>::new("INSERT INTO review_genres (review_id, genre_id) ");
    qb.push_values(genre_ids, |mut row, genre_id| {
        row.push_bind(review_id).push_bind(*genre_id);
    });
    qb.build().execute(conn).await?;
    Ok(())
}

/// Lock the review row for the rest of the transaction and fail with NotFound
/// unless it exists and is not soft-deleted.
async fn require_active_review(conn: &mut PgConnection, review_id: i64) -> StoreResult<()> {
    let blocked: Option<bool> =
        sqlx::query_scalar("SELECT is_blocked FROM reviews WHERE id = $1 FOR SHARE")
            .bind(review_id)
            .fetch_optional(conn)
            .await?;
    match blocked {
        Some(false) => Ok(()),
        _ => Err(StoreError::NotFound(format!("review {review_id}"))),
    }
}

async fn current_gesture(
    conn: &mut PgConnection,
    user_id: i64,
    review_id: i64,
) -> Result<Option<bool>, sqlx::Error> {
    sqlx::query_scalar("SELECT gesture FROM review_actions WHERE user_id = $1 AND review_id = $2")
        .bind(user_id)
        .bind(review_id)
        .fetch_optional(conn)
        .await
}

#[async_trait]
impl ReviewRepo for PostgresStore {
    async fn insert_review(&self, review: &NewReview, now: OffsetDateTime) -> StoreResult<i64> {
        let mut tx = self.pool.begin().await?;

        let review_id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO reviews (
                media_id, title, title_folded, description, platform_id, user_id,
                is_blocked, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, FALSE, $7, $7)
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
            UPDATE reviews SET title = $1, title_folded = $2, description = $3, updated_at = $4
            WHERE id = $5
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

        sqlx::query("DELETE FROM review_genres WHERE review_id = $1")
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
            "UPDATE reviews SET is_blocked = $1, updated_at = $2 WHERE id = $3 AND is_blocked <> $1",
        )
        .bind(blocked)
        .bind(now)
        .bind(review_id)
        .execute(&self.pool)
        .await?
        .rows_affected();

        let exists = changed > 0
            || sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM reviews WHERE id = $1)")
                .bind(review_id)
                .fetch_one(&self.pool)
                .await?;

        Ok(FlagChange::classify(changed, exists))
    }

    async fn get_review(&self, review_id: i64) -> StoreResult<Option<ReviewRow>> {
        let row = sqlx::query_as::<_, ReviewRow>("SELECT * FROM reviews WHERE id = $1")
            .bind(review_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn get_review_detail(&self, review_id: i64) -> StoreResult<Option<ReviewDetail>> {
        let sql = format!("{REVIEW_SELECT} WHERE r.id = $1");
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
        // Folded in Rust so the result does not depend on the server locale.
        let sql = format!(
            "{REVIEW_SELECT} WHERE r.is_blocked = FALSE AND r.title_folded LIKE $1 ESCAPE '\\' ORDER BY r.id"
        );
        let rows = sqlx::query_as::<_, ReviewJoinRow>(&sql)
            .bind(escape_like(&pattern.to_lowercase()))
            .fetch_all(&self.pool)
            .await?;
        self.with_genres(rows).await
    }

    async fn list_active_reviews(&self, limit: u32, offset: u64) -> StoreResult<Vec<ReviewDetail>> {
        let sql =
            format!("{REVIEW_SELECT} WHERE r.is_blocked = FALSE ORDER BY r.id LIMIT $1 OFFSET $2");
        let rows = sqlx::query_as::<_, ReviewJoinRow>(&sql)
            .bind(i64::from(limit))
            .bind(to_i64(offset))
            .fetch_all(&self.pool)
            .await?;
        self.with_genres(rows).await
    }

    async fn list_blocked_reviews(&self) -> StoreResult<Vec<ReviewDetail>> {
        let sql = format!("{REVIEW_SELECT} WHERE r.is_blocked = TRUE ORDER BY r.id");
        let rows = sqlx::query_as::<_, ReviewJoinRow>(&sql)
            .fetch_all(&self.pool)
            .await?;
        self.with_genres(rows).await
    }

    async fn review_genre_ids(&self, review_id: i64) -> StoreResult<Vec<i64>> {
        let ids = sqlx::query_scalar(
            "SELECT genre_id FROM review_genres WHERE review_id = $1 ORDER BY genre_id",
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
                COALESCE(SUM(CASE WHEN gesture THEN 1 ELSE 0 END), 0)::BIGINT,
                COALESCE(SUM(CASE WHEN gesture THEN 0 ELSE 1 END), 0)::BIGINT
            FROM review_actions
            WHERE review_id = $1
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
impl EngagementRepo for PostgresStore {
    async fn like_review(
        &self,
        user_id: i64,
        review_id: i64,
        now: OffsetDateTime,
    ) -> StoreResult<LikeOutcome> {
        let mut tx = self.pool.begin().await?;
        require_active_review(&mut tx, review_id).await?;

        // A concurrent first like waits on the primary key and then inserts nothing.
        let inserted = sqlx::query(
            r#"
            INSERT INTO review_actions (user_id, review_id, gesture, created_at, updated_at)
            VALUES ($1, $2, TRUE, $3, $3)
            ON CONFLICT (user_id, review_id) DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(review_id)
        .bind(now)
        .execute(&mut *tx)
        .await;

        let inserted = match inserted {
            Ok(result) => result.rows_affected(),
            Err(e) if is_unique_violation(&e) => 0,
            Err(e) => return Err(e.into()),
        };

        if inserted == 0 {
            tx.rollback().await?;
            let gesture = current_gesture(
                &mut *self.pool.acquire().await?,
                user_id,
                review_id,
            )
            .await?;
            return Ok(LikeOutcome::AlreadyActed(EngagementState::from_gesture(
                gesture,
            )));
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

        let previous = current_gesture(&mut tx, user_id, review_id).await?;

        sqlx::query(
            r#"
            INSERT INTO review_actions (user_id, review_id, gesture, created_at, updated_at)
            VALUES ($1, $2, FALSE, $3, $3)
            ON CONFLICT (user_id, review_id) DO UPDATE
            SET gesture = FALSE, updated_at = EXCLUDED.updated_at
            WHERE review_actions.gesture <> FALSE
            "#,
        )
        .bind(user_id)
        .bind(review_id)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(DislikeOutcome {
            previous: EngagementState::from_gesture(previous),
        })
    }

    async fn engagement_state(&self, user_id: i64, review_id: i64) -> StoreResult<EngagementState> {
        let gesture = current_gesture(&mut *self.pool.acquire().await?, user_id, review_id).await?;
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
            WHERE ra.user_id = $1 AND ra.gesture = TRUE AND r.is_blocked = FALSE
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
impl CatalogRepo for PostgresStore {
    async fn create_genre(&self, name: &str) -> StoreResult<GenreRow> {
        sqlx::query_as::<_, GenreRow>("INSERT INTO genres (name) VALUES ($1) RETURNING id, name")
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
            LIMIT $1
            "#,
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn create_media(&self, name: &str) -> StoreResult<MediaRow> {
        let row =
            sqlx::query_as::<_, MediaRow>("INSERT INTO media (name) VALUES ($1) RETURNING id, name")
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
            "INSERT INTO platforms (name) VALUES ($1) RETURNING id, name",
        )
        .bind(name)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn list_platforms(&self) -> StoreResult<Vec<PlatformRow>> {
        let rows = sqlx::query_as::<_, PlatformRow>("SELECT id, name FROM platforms ORDER BY id")
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
impl UserRepo for PostgresStore {
    async fn create_user(&self, user: &NewUser, now: OffsetDateTime) -> StoreResult<UserRow> {
        sqlx::query_as::<_, UserRow>(
            r#"
            INSERT INTO users (
                name, lastname, email, password_hash, role_id,
                is_blocked, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, FALSE, $6, $6)
            RETURNING *
            "#,
        )
        .bind(&user.name)
        .bind(&user.lastname)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.role_id)
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
        let row = sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn get_user_by_email(&self, email: &str) -> StoreResult<Option<UserRow>> {
        let row = sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE email = $1")
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
            SET name = $1, lastname = $2,
                password_hash = COALESCE($3, password_hash),
                updated_at = $4
            WHERE id = $5
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
        let updated = sqlx::query("UPDATE users SET role_id = $1, updated_at = $2 WHERE id = $3")
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
            "UPDATE users SET is_blocked = $1, updated_at = $2 WHERE id = $3 AND is_blocked <> $1",
        )
        .bind(blocked)
        .bind(now)
        .bind(user_id)
        .execute(&self.pool)
        .await?
        .rows_affected();

        let exists = changed > 0 || self.get_user(user_id).await?.is_some();
        Ok(FlagChange::classify(changed, exists))
    }
}

#[async_trait]
impl SessionRepo for PostgresStore {
    async fn create_session(&self, session: &SessionRow) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO sessions (
                session_id, user_id, token_hash, created_at,
                expires_at, revoked_at, last_used_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7)
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
        let row = sqlx::query_as::<_, SessionRow>("SELECT * FROM sessions WHERE token_hash = $1")
            .bind(token_hash)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn touch_session(&self, session_id: Uuid, used_at: OffsetDateTime) -> StoreResult<()> {
        sqlx::query("UPDATE sessions SET last_used_at = $1 WHERE session_id = $2")
            .bind(used_at)
            .bind(session_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn revoke_session(&self, session_id: Uuid, revoked_at: OffsetDateTime) -> StoreResult<()> {
        sqlx::query(
            "UPDATE sessions SET revoked_at = $1 WHERE session_id = $2 AND revoked_at IS NULL",
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
            "UPDATE sessions SET revoked_at = $1 WHERE user_id = $2 AND revoked_at IS NULL",
        )
        .bind(revoked_at)
        .bind(user_id)
        .execute(&self.pool)
        .await?
        .rows_affected();
        Ok(revoked)
    }
}

/// PostgreSQL schema.
const POSTGRES_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS roles (
    id BIGINT PRIMARY KEY,
    name TEXT NOT NULL UNIQUE
);

INSERT INTO roles (id, name) VALUES (1, 'user'), (2, 'admin')
ON CONFLICT (id) DO NOTHING;

CREATE TABLE IF NOT EXISTS users (
    id BIGSERIAL PRIMARY KEY,
    name TEXT NOT NULL,
    lastname TEXT NOT NULL,
    email TEXT NOT NULL UNIQUE,
    password_hash TEXT NOT NULL,
    role_id BIGINT NOT NULL REFERENCES roles(id),
    is_blocked BOOLEAN NOT NULL DEFAULT FALSE,
    created_at TIMESTAMPTZ NOT NULL,
    updated_at TIMESTAMPTZ NOT NULL
);

CREATE TABLE IF NOT EXISTS sessions (
    session_id UUID PRIMARY KEY,
    user_id BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    token_hash TEXT NOT NULL UNIQUE,
    created_at TIMESTAMPTZ NOT NULL,
    expires_at TIMESTAMPTZ NOT NULL,
    revoked_at TIMESTAMPTZ,
    last_used_at TIMESTAMPTZ
);

CREATE INDEX IF NOT EXISTS idx_sessions_user ON sessions(user_id);

CREATE TABLE IF NOT EXISTS genres (
    id BIGSERIAL PRIMARY KEY,
    name TEXT NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS media (
    id BIGSERIAL PRIMARY KEY,
    name TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS platforms (
    id BIGSERIAL PRIMARY KEY,
    name TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS reviews (
    id BIGSERIAL PRIMARY KEY,
    media_id BIGINT NOT NULL REFERENCES media(id),
    title TEXT NOT NULL,
    title_folded TEXT NOT NULL,
    description TEXT NOT NULL,
    platform_id BIGINT NOT NULL REFERENCES platforms(id),
    user_id BIGINT NOT NULL REFERENCES users(id),
    is_blocked BOOLEAN NOT NULL DEFAULT FALSE,
    created_at TIMESTAMPTZ NOT NULL,
    updated_at TIMESTAMPTZ NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_reviews_blocked ON reviews(is_blocked, id);

CREATE TABLE IF NOT EXISTS review_genres (
    review_id BIGINT NOT NULL REFERENCES reviews(id) ON DELETE CASCADE,
    genre_id BIGINT NOT NULL REFERENCES genres(id),
    PRIMARY KEY (review_id, genre_id)
);

CREATE INDEX IF NOT EXISTS idx_review_genres_genre ON review_genres(genre_id);

CREATE TABLE IF NOT EXISTS review_actions (
    user_id BIGINT NOT NULL REFERENCES users(id),
    review_id BIGINT NOT NULL REFERENCES reviews(id) ON DELETE CASCADE,
    gesture BOOLEAN NOT NULL,
    created_at TIMESTAMPTZ NOT NULL,
    updated_at TIMESTAMPTZ NOT NULL,
    PRIMARY KEY (user_id, review_id)
);

CREATE INDEX IF NOT EXISTS idx_review_actions_review ON review_actions(review_id);
"#;
