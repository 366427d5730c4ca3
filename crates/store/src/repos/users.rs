//! User repository.

use crate::error::StoreResult;
use crate::models::{NewUser, UserRow, UserUpdate};
use crate::repos::FlagChange;
use async_trait::async_trait;
use time::OffsetDateTime;

/// Repository for user accounts.
#[async_trait]
pub trait UserRepo: Send + Sync {
    /// Create a user. Returns `StoreError::AlreadyExists` when the email is taken.
    async fn create_user(&self, user: &NewUser, now: OffsetDateTime) -> StoreResult<UserRow>;

    /// Get a user by id.
    async fn get_user(&self, user_id: i64) -> StoreResult<Option<UserRow>>;

    /// Get a user by email (exact match).
    async fn get_user_by_email(&self, email: &str) -> StoreResult<Option<UserRow>>;

    /// List all users ordered by id.
    async fn list_users(&self) -> StoreResult<Vec<UserRow>>;

    /// Update profile fields. Returns the updated row, `None` if absent.
    async fn update_user(
        &self,
        user_id: i64,
        update: &UserUpdate,
        now: OffsetDateTime,
    ) -> StoreResult<Option<UserRow>>;

    /// Change a user's role.
    async fn set_user_role(&self, user_id: i64, role_id: i64, now: OffsetDateTime)
    -> StoreResult<bool>;

    /// Set the blocked flag.
    async fn set_user_blocked(
        &self,
        user_id: i64,
        blocked: bool,
        now: OffsetDateTime,
    ) -> StoreResult<FlagChange>;
}
