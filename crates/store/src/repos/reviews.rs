//! Review repository.

use crate::error::StoreResult;
use crate::models::{
    GenreRow, NewReview, ReviewDetail, ReviewGenreRow, ReviewJoinRow, ReviewRow, ReviewUpdate,
};
use crate::repos::FlagChange;
use async_trait::async_trait;
use critique_core::Tally;
use std::collections::HashMap;
use time::OffsetDateTime;

/// Repository for reviews and their genre associations.
#[async_trait]
pub trait ReviewRepo: Send + Sync {
    /// Insert a review and all its genre associations in one transaction.
    /// Returns the new review id. A dangling media, platform, user or genre
    /// reference fails the whole insert.
    async fn insert_review(&self, review: &NewReview, now: OffsetDateTime) -> StoreResult<i64>;

    /// Replace title, description and the full genre set in one transaction.
    /// Returns `false` (and writes nothing) when the review does not exist.
    async fn update_review(
        &self,
        review_id: i64,
        update: &ReviewUpdate,
        now: OffsetDateTime,
    ) -> StoreResult<bool>;

    /// Set the soft-delete flag.
    async fn set_review_blocked(
        &self,
        review_id: i64,
        blocked: bool,
        now: OffsetDateTime,
    ) -> StoreResult<FlagChange>;

    /// Get a review record regardless of its soft-delete flag.
    async fn get_review(&self, review_id: i64) -> StoreResult<Option<ReviewRow>>;

    /// Get a review with creator, media and genres regardless of its flag.
    async fn get_review_detail(&self, review_id: i64) -> StoreResult<Option<ReviewDetail>>;

    /// Case-insensitive literal substring search on titles, ordered by id.
    async fn search_reviews_by_title(&self, pattern: &str) -> StoreResult<Vec<ReviewDetail>>;

    /// Non-blocked reviews ordered by id.
    async fn list_active_reviews(&self, limit: u32, offset: u64)
    -> StoreResult<Vec<ReviewDetail>>;

    /// Blocked reviews ordered by id.
    async fn list_blocked_reviews(&self) -> StoreResult<Vec<ReviewDetail>>;

    /// Genre ids associated with a review, ascending.
    async fn review_genre_ids(&self, review_id: i64) -> StoreResult<Vec<i64>>;

    /// Like and dislike counts; `None` when the review does not exist.
    async fn review_tally(&self, review_id: i64) -> StoreResult<Option<Tally>>;

    /// Total number of reviews, blocked or not.
    async fn count_reviews(&self) -> StoreResult<u64>;
}

/// Group genre association rows by review id.
pub(crate) fn group_genres(rows: Vec<ReviewGenreRow>) -> HashMap<i64, Vec<GenreRow>> {
    let mut grouped: HashMap<i64, Vec<GenreRow>> = HashMap::new();
    for row in rows {
        grouped.entry(row.review_id).or_default().push(GenreRow {
            id: row.genre_id,
            name: row.genre_name,
        });
    }
    grouped
}

/// Attach grouped genres to joined review rows, keeping row order.
pub(crate) fn attach_genres(
    rows: Vec<ReviewJoinRow>,
    genre_rows: Vec<ReviewGenreRow>,
) -> Vec<ReviewDetail> {
    let mut grouped = group_genres(genre_rows);
    rows.into_iter()
        .map(|review| {
            let genres = grouped.remove(&review.id).unwrap_or_default();
            ReviewDetail { review, genres }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn join_row(id: i64) -> ReviewJoinRow {
        let now = OffsetDateTime::now_utc();
        ReviewJoinRow {
            id,
            media_id: 1,
            media_name: "Film".to_string(),
            title: format!("review {id}"),
            description: String::new(),
            platform_id: 1,
            user_id: 1,
            user_name: "Ada".to_string(),
            is_blocked: false,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_attach_genres_keeps_order_and_fills_empty() {
        let rows = vec![join_row(3), join_row(1)];
        let genres = vec![
            ReviewGenreRow {
                review_id: 3,
                genre_id: 2,
                genre_name: "Drama".to_string(),
            },
            ReviewGenreRow {
                review_id: 3,
                genre_id: 5,
                genre_name: "Sci-Fi".to_string(),
            },
        ];

        let details = attach_genres(rows, genres);
        assert_eq!(details.len(), 2);
        assert_eq!(details[0].review.id, 3);
        assert_eq!(
            details[0].genres.iter().map(|g| g.id).collect::<Vec<_>>(),
            vec![2, 5]
        );
        assert_eq!(details[1].review.id, 1);
        assert!(details[1].genres.is_empty());
    }
}
