//! Per-user like/dislike state.

use crate::error::StoreResult;
use crate::models::LikedReview;
use crate::store::PrimaryStore;
use critique_core::{DislikeOutcome, EngagementState, LikeOutcome};
use std::sync::Arc;
use time::OffsetDateTime;

/// Owns the single engagement row per (user, review).
#[derive(Clone)]
pub struct EngagementTracker {
    primary: Arc<dyn PrimaryStore>,
}

impl EngagementTracker {
    pub fn new(primary: Arc<dyn PrimaryStore>) -> Self {
        Self { primary }
    }

    /// Record a first like. Any earlier gesture leaves the state unchanged.
    pub async fn like(&self, user_id: i64, review_id: i64) -> StoreResult<LikeOutcome> {
        let outcome = self
            .primary
            .like_review(user_id, review_id, OffsetDateTime::now_utc())
            .await?;
        match outcome {
            LikeOutcome::Liked => tracing::info!(user_id, review_id, "Review liked"),
            LikeOutcome::AlreadyActed(state) => {
                tracing::debug!(user_id, review_id, ?state, "Like rejected, already acted")
            }
        }
        Ok(outcome)
    }

    /// Move the user to `Disliked` from any state.
    pub async fn dislike(&self, user_id: i64, review_id: i64) -> StoreResult<DislikeOutcome> {
        let outcome = self
            .primary
            .dislike_review(user_id, review_id, OffsetDateTime::now_utc())
            .await?;
        tracing::info!(
            user_id,
            review_id,
            previous = ?outcome.previous,
            changed = outcome.changed(),
            "Review disliked"
        );
        Ok(outcome)
    }

    pub async fn list_liked(&self, user_id: i64) -> StoreResult<Vec<LikedReview>> {
        self.primary.list_liked_reviews(user_id).await
    }

    pub async fn state(&self, user_id: i64, review_id: i64) -> StoreResult<EngagementState> {
        self.primary.engagement_state(user_id, review_id).await
    }
}

impl std::fmt::Debug for EngagementTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngagementTracker").finish_non_exhaustive()
    }
}
