//! Session repository.

use crate::error::StoreResult;
use crate::models::SessionRow;
use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

/// Repository for login sessions.
#[async_trait]
pub trait SessionRepo: Send + Sync {
    /// Create a session.
    async fn create_session(&self, session: &SessionRow) -> StoreResult<()>;

    /// Get a session by token hash.
    async fn get_session_by_hash(&self, token_hash: &str) -> StoreResult<Option<SessionRow>>;

    /// Update last used time.
    async fn touch_session(&self, session_id: Uuid, used_at: OffsetDateTime) -> StoreResult<()>;

    /// Revoke a session.
    async fn revoke_session(&self, session_id: Uuid, revoked_at: OffsetDateTime)
    -> StoreResult<()>;

    /// Revoke every active session of a user. Returns the number revoked.
    async fn revoke_user_sessions(&self, user_id: i64, revoked_at: OffsetDateTime)
    -> StoreResult<u64>;
}
