//! Review lifecycle: create, update, soft-delete and restore, with the
//! post-commit mirror write.

use crate::error::StoreResult;
use crate::mirror::BestEffortMirror;
use crate::models::{MirrorRecord, NewReview, ReviewDetail, ReviewUpdate};
use crate::repos::FlagChange;
use crate::store::PrimaryStore;
use critique_core::Tally;
use critique_core::validation::dedup_genre_ids;
use std::sync::Arc;
use time::OffsetDateTime;

/// Result of [`ReviewStore::update_review`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UpdateOutcome {
    Updated,
    NotFound,
}

/// Result of [`ReviewStore::soft_delete`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SoftDeleteOutcome {
    Deleted,
    AlreadyDeleted,
    NotFound,
}

/// Result of [`ReviewStore::undelete`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RestoreOutcome {
    Restored,
    NotDeleted,
    NotFound,
}

/// Owns reviews and their genre associations.
#[derive(Clone)]
pub struct ReviewStore {
    primary: Arc<dyn PrimaryStore>,
    mirror: BestEffortMirror,
    max_page_size: u32,
}

impl ReviewStore {
    pub fn new(primary: Arc<dyn PrimaryStore>, mirror: BestEffortMirror, max_page_size: u32) -> Self {
        Self {
            primary,
            mirror,
            max_page_size: max_page_size.max(1),
        }
    }

    /// Create a review with its genre links. Returns the new review id.
    ///
    /// The review and every link are committed together or not at all.
    pub async fn create_review(&self, mut review: NewReview) -> StoreResult<i64> {
        review.genre_ids = dedup_genre_ids(&review.genre_ids);
        let now = OffsetDateTime::now_utc();

        let review_id = self.primary.insert_review(&review, now).await?;
        tracing::info!(
            review_id,
            user_id = review.user_id,
            genres = review.genre_ids.len(),
            "Review created"
        );

        self.mirror
            .review_created(&MirrorRecord::from_new(review_id, &review, now))
            .await;
        Ok(review_id)
    }

    /// Replace title, description and the whole genre set of a review.
    pub async fn update_review(
        &self,
        review_id: i64,
        mut update: ReviewUpdate,
    ) -> StoreResult<UpdateOutcome> {
        update.genre_ids = dedup_genre_ids(&update.genre_ids);
        let now = OffsetDateTime::now_utc();

        if !self.primary.update_review(review_id, &update, now).await? {
            tracing::debug!(review_id, "Update skipped, review not found");
            return Ok(UpdateOutcome::NotFound);
        }
        tracing::info!(review_id, genres = update.genre_ids.len(), "Review updated");

        self.mirror
            .review_updated(review_id, &update.title, &update.description, now)
            .await;
        Ok(UpdateOutcome::Updated)
    }

    /// Soft-delete a review. Deleting twice is a no-op.
    pub async fn soft_delete(&self, review_id: i64) -> StoreResult<SoftDeleteOutcome> {
        let now = OffsetDateTime::now_utc();
        let outcome = match self.primary.set_review_blocked(review_id, true, now).await? {
            FlagChange::Changed => SoftDeleteOutcome::Deleted,
            FlagChange::Unchanged => SoftDeleteOutcome::AlreadyDeleted,
            FlagChange::NotFound => SoftDeleteOutcome::NotFound,
        };

        if outcome == SoftDeleteOutcome::Deleted {
            tracing::info!(review_id, "Review soft-deleted");
            self.mirror.review_deleted(review_id, now).await;
        }
        Ok(outcome)
    }

    /// Restore a soft-deleted review.
    pub async fn undelete(&self, review_id: i64) -> StoreResult<RestoreOutcome> {
        let now = OffsetDateTime::now_utc();
        let outcome = match self.primary.set_review_blocked(review_id, false, now).await? {
            FlagChange::Changed => RestoreOutcome::Restored,
            FlagChange::Unchanged => RestoreOutcome::NotDeleted,
            FlagChange::NotFound => RestoreOutcome::NotFound,
        };

        if outcome == RestoreOutcome::Restored {
            tracing::info!(review_id, "Review restored");
            self.mirror.review_restored(review_id).await;
        }
        Ok(outcome)
    }

    pub async fn search_by_title(&self, pattern: &str) -> StoreResult<Vec<ReviewDetail>> {
        self.primary.search_reviews_by_title(pattern).await
    }

    /// Non-deleted reviews ordered by id. `limit` is capped at the configured
    /// page size and a limit of 0 yields an empty page.
    pub async fn list_active(&self, limit: u32, offset: u64) -> StoreResult<Vec<ReviewDetail>> {
        let limit = limit.min(self.max_page_size);
        if limit == 0 {
            return Ok(Vec::new());
        }
        self.primary.list_active_reviews(limit, offset).await
    }

    pub async fn list_deleted(&self) -> StoreResult<Vec<ReviewDetail>> {
        self.primary.list_blocked_reviews().await
    }

    pub async fn get_one(&self, review_id: i64) -> StoreResult<Option<ReviewDetail>> {
        self.primary.get_review_detail(review_id).await
    }

    pub async fn tally(&self, review_id: i64) -> StoreResult<Option<Tally>> {
        self.primary.review_tally(review_id).await
    }

    /// Creator of a review, if it exists. Used for ownership checks.
    pub async fn owner_of(&self, review_id: i64) -> StoreResult<Option<i64>> {
        Ok(self
            .primary
            .get_review(review_id)
            .await?
            .map(|review| review.user_id))
    }
}

impl std::fmt::Debug for ReviewStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReviewStore")
            .field("max_page_size", &self.max_page_size)
            .finish_non_exhaustive()
    }
}
