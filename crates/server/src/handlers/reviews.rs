//! Review endpoints.

use crate::auth::{AuthenticatedUser, require_auth};
use crate::error::{ApiError, ApiResult};
use crate::handlers::common::{
    ReviewResponse, parse_id, read_json, required, review_list,
};
use crate::metrics::{REVIEWS_CREATED, REVIEWS_RESTORED, REVIEWS_SOFT_DELETED, REVIEWS_UPDATED};
use crate::state::AppState;
use axum::Json;
use axum::extract::{Path, Request, State};
use critique_core::Tally;
use critique_core::validation::{validate_description, validate_title};
use critique_store::models::{NewReview, ReviewUpdate};
use critique_store::{RestoreOutcome, SoftDeleteOutcome, UpdateOutcome};
use serde::{Deserialize, Serialize};

/// Review creation request body.
#[derive(Debug, Deserialize)]
pub struct CreateReviewRequest {
    #[serde(alias = "media_fk", alias = "mediaId")]
    pub media_id: Option<i64>,
    #[serde(alias = "platform_fk", alias = "platformId")]
    pub platform_id: Option<i64>,
    pub title: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default, alias = "genreIds", alias = "genres")]
    pub genre_ids: Vec<i64>,
    /// Author of the review; defaults to the caller.
    #[serde(alias = "userId", alias = "user_fk")]
    pub user_id: Option<i64>,
}

/// Review update request body. The genre set is replaced as a whole.
#[derive(Debug, Deserialize)]
pub struct UpdateReviewRequest {
    pub title: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default, alias = "genreIds", alias = "genres")]
    pub genre_ids: Vec<i64>,
}

/// Response for review creation.
#[derive(Debug, Serialize)]
pub struct CreatedReviewResponse {
    pub review_id: i64,
    pub message: &'static str,
}

/// Response for soft-delete and restore.
#[derive(Debug, Serialize)]
pub struct ReviewStateResponse {
    pub review_id: i64,
    pub outcome: &'static str,
    pub is_blocked: bool,
}

/// Response for the like/dislike tally.
#[derive(Debug, Serialize)]
pub struct TallyResponse {
    pub review_id: i64,
    #[serde(flatten)]
    pub tally: Tally,
}

fn positive(value: Option<i64>, field: &'static str) -> ApiResult<i64> {
    let value = required(value, field)?;
    if value <= 0 {
        return Err(ApiError::BadRequest(format!("{field} must be a positive id")));
    }
    Ok(value)
}

/// Load the creator of a review and check the caller may change it.
async fn authorize_review_change(
    state: &AppState,
    auth: &AuthenticatedUser,
    review_id: i64,
) -> ApiResult<()> {
    let owner = state
        .reviews
        .owner_of(review_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("review {review_id} not found")))?;
    auth.require_can_act_for(owner)
}

/// POST /review - Create a review with its genre links.
pub async fn create_review(
    State(state): State<AppState>,
    req: Request,
) -> ApiResult<Json<CreatedReviewResponse>> {
    let auth = require_auth(&req)?.clone();
    let body: CreateReviewRequest = read_json(req, state.config.server.max_body_bytes).await?;

    let user_id = body.user_id.unwrap_or_else(|| auth.user_id());
    auth.require_can_act_for(user_id)?;

    let title = required(body.title, "title")?;
    validate_title(&title)?;
    validate_description(&body.description)?;
    let media_id = positive(body.media_id, "media_id")?;
    let platform_id = positive(body.platform_id, "platform_id")?;

    let review_id = state
        .reviews
        .create_review(NewReview {
            media_id,
            title: title.trim().to_string(),
            description: body.description,
            platform_id,
            user_id,
            genre_ids: body.genre_ids,
        })
        .await?;
    REVIEWS_CREATED.inc();

    Ok(Json(CreatedReviewResponse {
        review_id,
        message: "review created",
    }))
}

/// PUT /update/review/{id} - Replace title, description and genres.
pub async fn update_review(
    State(state): State<AppState>,
    Path(review_id): Path<String>,
    req: Request,
) -> ApiResult<Json<ReviewResponse>> {
    let auth = require_auth(&req)?.clone();
    let review_id = parse_id(&review_id, "review")?;
    authorize_review_change(&state, &auth, review_id).await?;

    let body: UpdateReviewRequest = read_json(req, state.config.server.max_body_bytes).await?;
    let title = required(body.title, "title")?;
    validate_title(&title)?;
    validate_description(&body.description)?;

    let update = ReviewUpdate {
        title: title.trim().to_string(),
        description: body.description,
        genre_ids: body.genre_ids,
    };
    if state.reviews.update_review(review_id, update).await? == UpdateOutcome::NotFound {
        return Err(ApiError::NotFound(format!("review {review_id} not found")));
    }
    REVIEWS_UPDATED.inc();

    let detail = state
        .reviews
        .get_one(review_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("review {review_id} not found")))?;
    Ok(Json(detail.into()))
}

/// PUT /delete/review/{id} - Soft-delete a review. Repeating it is a no-op.
pub async fn delete_review(
    State(state): State<AppState>,
    Path(review_id): Path<String>,
    req: Request,
) -> ApiResult<Json<ReviewStateResponse>> {
    let auth = require_auth(&req)?;
    let review_id = parse_id(&review_id, "review")?;
    authorize_review_change(&state, auth, review_id).await?;

    let outcome = match state.reviews.soft_delete(review_id).await? {
        SoftDeleteOutcome::Deleted => {
            REVIEWS_SOFT_DELETED.inc();
            "deleted"
        }
        SoftDeleteOutcome::AlreadyDeleted => "already_deleted",
        SoftDeleteOutcome::NotFound => {
            return Err(ApiError::NotFound(format!("review {review_id} not found")));
        }
    };

    Ok(Json(ReviewStateResponse {
        review_id,
        outcome,
        is_blocked: true,
    }))
}

/// PUT /undelete/review/{id} - Restore a soft-deleted review.
pub async fn undelete_review(
    State(state): State<AppState>,
    Path(review_id): Path<String>,
    req: Request,
) -> ApiResult<Json<ReviewStateResponse>> {
    let auth = require_auth(&req)?;
    let review_id = parse_id(&review_id, "review")?;
    authorize_review_change(&state, auth, review_id).await?;

    let outcome = match state.reviews.undelete(review_id).await? {
        RestoreOutcome::Restored => {
            REVIEWS_RESTORED.inc();
            "restored"
        }
        RestoreOutcome::NotDeleted => "not_deleted",
        RestoreOutcome::NotFound => {
            return Err(ApiError::NotFound(format!("review {review_id} not found")));
        }
    };

    Ok(Json(ReviewStateResponse {
        review_id,
        outcome,
        is_blocked: false,
    }))
}

/// GET /review/{title} - Case-insensitive title search. Public.
pub async fn search_reviews(
    State(state): State<AppState>,
    Path(title): Path<String>,
) -> ApiResult<Json<Vec<ReviewResponse>>> {
    let pattern = title.trim();
    if pattern.is_empty() {
        return Err(ApiError::BadRequest("search title must not be empty".to_string()));
    }
    let found = state.reviews.search_by_title(pattern).await?;
    tracing::debug!(pattern, matches = found.len(), "Review search");
    Ok(Json(review_list(found)))
}

/// GET /reviews/{max}/{offset} - Page through active reviews by id.
pub async fn list_reviews(
    State(state): State<AppState>,
    Path((max, offset)): Path<(String, String)>,
    req: Request,
) -> ApiResult<Json<Vec<ReviewResponse>>> {
    require_auth(&req)?;
    let max: u32 = max
        .trim()
        .parse()
        .map_err(|_| ApiError::BadRequest(format!("invalid page size: {max}")))?;
    let offset: u64 = offset
        .trim()
        .parse()
        .map_err(|_| ApiError::BadRequest(format!("invalid offset: {offset}")))?;

    let page = state.reviews.list_active(max, offset).await?;
    Ok(Json(review_list(page)))
}

/// GET /getReview/{id} - One review with creator, media and genres.
pub async fn get_review(
    State(state): State<AppState>,
    Path(review_id): Path<String>,
    req: Request,
) -> ApiResult<Json<ReviewResponse>> {
    require_auth(&req)?;
    let review_id = parse_id(&review_id, "review")?;
    let detail = state
        .reviews
        .get_one(review_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("review {review_id} not found")))?;
    Ok(Json(detail.into()))
}

/// GET /softDeletedReviews - Every soft-deleted review.
pub async fn list_soft_deleted(
    State(state): State<AppState>,
    req: Request,
) -> ApiResult<Json<Vec<ReviewResponse>>> {
    require_auth(&req)?;
    let deleted = state.reviews.list_deleted().await?;
    Ok(Json(review_list(deleted)))
}

/// GET /tally/{id} - Like and dislike counts.
pub async fn review_tally(
    State(state): State<AppState>,
    Path(review_id): Path<String>,
    req: Request,
) -> ApiResult<Json<TallyResponse>> {
    require_auth(&req)?;
    let review_id = parse_id(&review_id, "review")?;
    let tally = state
        .reviews
        .tally(review_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("review {review_id} not found")))?;
    Ok(Json(TallyResponse { review_id, tally }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_request_accepts_legacy_names() {
        let body: CreateReviewRequest = serde_json::from_str(
            r#"{"media_fk": 2, "platform_fk": 3, "title": "Dune", "genre_ids": [1, 1], "userId": 9}"#,
        )
        .unwrap();
        assert_eq!(body.media_id, Some(2));
        assert_eq!(body.platform_id, Some(3));
        assert_eq!(body.user_id, Some(9));
        assert_eq!(body.genre_ids, vec![1, 1]);
        assert!(body.description.is_empty());
    }

    #[test]
    fn test_positive_ids() {
        assert_eq!(positive(Some(4), "media_id").unwrap(), 4);
        assert!(matches!(
            positive(None, "media_id"),
            Err(ApiError::Core(critique_core::Error::MissingField("media_id")))
        ));
        assert!(matches!(
            positive(Some(0), "media_id"),
            Err(ApiError::BadRequest(_))
        ));
    }

    #[test]
    fn test_tally_response_is_flat() {
        let value = serde_json::to_value(TallyResponse {
            review_id: 3,
            tally: Tally {
                likes: 2,
                dislikes: 1,
            },
        })
        .unwrap();
        assert_eq!(value["likes"], 2);
        assert_eq!(value["dislikes"], 1);
        assert_eq!(value["review_id"], 3);
    }
}
