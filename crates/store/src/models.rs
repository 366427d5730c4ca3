//! Database models mapping to the primary schema.

use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

// =============================================================================
// Accounts
// =============================================================================

/// Role record.
#[derive(Debug, Clone, FromRow, PartialEq, Eq)]
pub struct RoleRow {
    pub id: i64,
    pub name: String,
}

/// User account record.
#[derive(Debug, Clone, FromRow)]
pub struct UserRow {
    pub id: i64,
    pub name: String,
    pub lastname: String,
    pub email: String,
    pub password_hash: String,
    pub role_id: i64,
    /// Blocked users cannot log in and their sessions are rejected.
    pub is_blocked: bool,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// Input for account creation.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub lastname: String,
    pub email: String,
    pub password_hash: String,
    pub role_id: i64,
}

/// Profile fields a user may change.
#[derive(Debug, Clone)]
pub struct UserUpdate {
    pub name: String,
    pub lastname: String,
    /// Replacement password hash; `None` keeps the current password.
    pub password_hash: Option<String>,
}

/// Login session record. Only the SHA-256 of the bearer token is stored.
#[derive(Debug, Clone, FromRow)]
pub struct SessionRow {
    pub session_id: Uuid,
    pub user_id: i64,
    pub token_hash: String,
    pub created_at: OffsetDateTime,
    pub expires_at: OffsetDateTime,
    pub revoked_at: Option<OffsetDateTime>,
    pub last_used_at: Option<OffsetDateTime>,
}

impl SessionRow {
    /// Whether the session can still authenticate requests at `now`.
    pub fn is_active(&self, now: OffsetDateTime) -> bool {
        self.revoked_at.is_none() && self.expires_at > now
    }
}

// =============================================================================
// Catalog
// =============================================================================

/// Genre record.
#[derive(Debug, Clone, FromRow, PartialEq, Eq)]
pub struct GenreRow {
    pub id: i64,
    pub name: String,
}

/// Genre with the number of reviews tagged with it.
#[derive(Debug, Clone, FromRow)]
pub struct GenreCountRow {
    pub id: i64,
    pub name: String,
    pub review_count: i64,
}

/// Media record (film, series, game, ...).
#[derive(Debug, Clone, FromRow, PartialEq, Eq)]
pub struct MediaRow {
    pub id: i64,
    pub name: String,
}

/// Platform record.
#[derive(Debug, Clone, FromRow, PartialEq, Eq)]
pub struct PlatformRow {
    pub id: i64,
    pub name: String,
}

// =============================================================================
// Reviews
// =============================================================================

/// Review record.
#[derive(Debug, Clone, FromRow)]
pub struct ReviewRow {
    pub id: i64,
    pub media_id: i64,
    pub title: String,
    pub description: String,
    pub platform_id: i64,
    pub user_id: i64,
    /// Soft-delete flag.
    pub is_blocked: bool,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// Review joined with creator and media names.
#[derive(Debug, Clone, FromRow)]
pub struct ReviewJoinRow {
    pub id: i64,
    pub media_id: i64,
    pub media_name: String,
    pub title: String,
    pub description: String,
    pub platform_id: i64,
    pub user_id: i64,
    pub user_name: String,
    pub is_blocked: bool,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// One `(review, genre)` association with the genre name.
#[derive(Debug, Clone, FromRow)]
pub struct ReviewGenreRow {
    pub review_id: i64,
    pub genre_id: i64,
    pub genre_name: String,
}

/// Review with creator, media and genres resolved.
#[derive(Debug, Clone)]
pub struct ReviewDetail {
    pub review: ReviewJoinRow,
    pub genres: Vec<GenreRow>,
}

/// Input for review creation.
#[derive(Debug, Clone)]
pub struct NewReview {
    pub media_id: i64,
    pub title: String,
    pub description: String,
    pub platform_id: i64,
    pub user_id: i64,
    pub genre_ids: Vec<i64>,
}

/// Review fields replaced by an update.
#[derive(Debug, Clone)]
pub struct ReviewUpdate {
    pub title: String,
    pub description: String,
    /// Complete new genre set; an empty set removes every association.
    pub genre_ids: Vec<i64>,
}

/// A liked review with its creator, as listed for the liking user.
#[derive(Debug, Clone, FromRow)]
pub struct LikedReviewRow {
    pub review_id: i64,
    pub title: String,
    pub description: String,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
    pub creator_id: i64,
    pub creator_name: String,
    pub creator_email: String,
    pub liked_at: OffsetDateTime,
}

/// Liked review with genres resolved.
#[derive(Debug, Clone)]
pub struct LikedReview {
    pub review: LikedReviewRow,
    pub genres: Vec<GenreRow>,
}

// =============================================================================
// Mirror
// =============================================================================

/// Projection of a review written to the secondary database.
#[derive(Debug, Clone, FromRow)]
pub struct MirrorRecord {
    pub id: i64,
    pub media_id: i64,
    pub title: String,
    pub description: String,
    pub platform_id: i64,
    pub user_id: i64,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl MirrorRecord {
    /// Build the mirror projection of a freshly created review.
    pub fn from_new(id: i64, review: &NewReview, now: OffsetDateTime) -> Self {
        Self {
            id,
            media_id: review.media_id,
            title: review.title.clone(),
            description: review.description.clone(),
            platform_id: review.platform_id,
            user_id: review.user_id,
            created_at: now,
            updated_at: now,
        }
    }
}
