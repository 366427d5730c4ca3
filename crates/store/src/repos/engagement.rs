//! Engagement repository.

use crate::error::StoreResult;
use crate::models::LikedReview;
use async_trait::async_trait;
use critique_core::{DislikeOutcome, EngagementState, LikeOutcome};
use time::OffsetDateTime;

/// Repository for per-user like/dislike state.
///
/// At most one row exists per `(user_id, review_id)`. Both writes run in a
/// single transaction that first checks the review, and both return
/// `StoreError::NotFound` when it is missing or soft-deleted. Genre links are
/// never touched here.
#[async_trait]
pub trait EngagementRepo: Send + Sync {
    /// Record a like if the user has not acted on the review yet.
    async fn like_review(
        &self,
        user_id: i64,
        review_id: i64,
        now: OffsetDateTime,
    ) -> StoreResult<LikeOutcome>;

    /// Set the user's gesture to dislike from any prior state.
    async fn dislike_review(
        &self,
        user_id: i64,
        review_id: i64,
        now: OffsetDateTime,
    ) -> StoreResult<DislikeOutcome>;

    /// Current state of a user towards a review.
    async fn engagement_state(&self, user_id: i64, review_id: i64)
    -> StoreResult<EngagementState>;

    /// Reviews the user liked, most recent like first.
    async fn list_liked_reviews(&self, user_id: i64) -> StoreResult<Vec<LikedReview>>;
}
