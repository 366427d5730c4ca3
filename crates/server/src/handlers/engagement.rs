//! Like and dislike endpoints.

use crate::auth::{AuthenticatedUser, require_auth};
use crate::error::{ApiError, ApiResult};
use crate::handlers::common::{GenreResponse, parse_id, read_json, required};
use crate::metrics::{DISLIKES, record_like};
use crate::state::AppState;
use axum::Json;
use axum::extract::{Path, Request, State};
use critique_core::{EngagementState, LikeOutcome};
use critique_store::models::LikedReview;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Body of like and dislike requests.
#[derive(Debug, Deserialize)]
pub struct EngagementRequest {
    #[serde(alias = "userId")]
    pub user_id: Option<i64>,
    #[serde(alias = "reviewId")]
    pub review_id: Option<i64>,
}

/// Result of a like or dislike.
#[derive(Debug, Serialize)]
pub struct EngagementResponse {
    pub user_id: i64,
    pub review_id: i64,
    /// `liked`, `already_acted` or `disliked`.
    pub outcome: &'static str,
    /// State after the request.
    pub state: EngagementState,
    /// State before the request.
    pub previous: EngagementState,
}

/// A review the user liked.
#[derive(Debug, Serialize)]
pub struct LikedReviewResponse {
    pub review_id: i64,
    pub title: String,
    pub description: String,
    pub creator_id: i64,
    pub creator_name: String,
    pub creator_email: String,
    pub genres: Vec<GenreResponse>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub liked_at: OffsetDateTime,
}

impl From<LikedReview> for LikedReviewResponse {
    fn from(liked: LikedReview) -> Self {
        let review = liked.review;
        Self {
            review_id: review.review_id,
            title: review.title,
            description: review.description,
            creator_id: review.creator_id,
            creator_name: review.creator_name,
            creator_email: review.creator_email,
            genres: liked.genres.into_iter().map(GenreResponse::from).collect(),
            created_at: review.created_at,
            updated_at: review.updated_at,
            liked_at: review.liked_at,
        }
    }
}

/// Validate the body and check the caller may act for the named user.
async fn resolve_target(
    state: &AppState,
    auth: &AuthenticatedUser,
    body: EngagementRequest,
) -> ApiResult<(i64, i64)> {
    let user_id = required(body.user_id, "user_id")?;
    let review_id = required(body.review_id, "review_id")?;
    if user_id <= 0 || review_id <= 0 {
        return Err(ApiError::BadRequest(
            "user_id and review_id must be positive ids".to_string(),
        ));
    }
    auth.require_can_act_for(user_id)?;

    // Admins may act for other accounts, which must exist.
    if user_id != auth.user_id() && state.store.get_user(user_id).await?.is_none() {
        return Err(ApiError::NotFound(format!("user {user_id} not found")));
    }
    Ok((user_id, review_id))
}

/// POST /like - Record a like unless the user already liked or disliked the review.
pub async fn like_review(
    State(state): State<AppState>,
    req: Request,
) -> ApiResult<Json<EngagementResponse>> {
    let auth = require_auth(&req)?.clone();
    let body: EngagementRequest = read_json(req, state.config.server.max_body_bytes).await?;
    let (user_id, review_id) = resolve_target(&state, &auth, body).await?;

    let response = match state.engagement.like(user_id, review_id).await? {
        LikeOutcome::Liked => {
            record_like("liked");
            EngagementResponse {
                user_id,
                review_id,
                outcome: "liked",
                state: EngagementState::Liked,
                previous: EngagementState::NoAction,
            }
        }
        LikeOutcome::AlreadyActed(current) => {
            record_like("already_acted");
            EngagementResponse {
                user_id,
                review_id,
                outcome: "already_acted",
                state: current,
                previous: current,
            }
        }
    };
    Ok(Json(response))
}

/// PUT /dislike - Move the user to the disliked state from any state.
pub async fn dislike_review(
    State(state): State<AppState>,
    req: Request,
) -> ApiResult<Json<EngagementResponse>> {
    let auth = require_auth(&req)?.clone();
    let body: EngagementRequest = read_json(req, state.config.server.max_body_bytes).await?;
    let (user_id, review_id) = resolve_target(&state, &auth, body).await?;

    let outcome = state.engagement.dislike(user_id, review_id).await?;
    DISLIKES.inc();

    Ok(Json(EngagementResponse {
        user_id,
        review_id,
        outcome: "disliked",
        state: EngagementState::Disliked,
        previous: outcome.previous,
    }))
}

/// GET /liked/{userId} - Reviews the user liked, most recent first.
pub async fn liked_reviews(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    req: Request,
) -> ApiResult<Json<Vec<LikedReviewResponse>>> {
    let auth = require_auth(&req)?;
    let user_id = parse_id(&user_id, "user")?;
    auth.require_can_act_for(user_id)?;

    let liked = state.engagement.list_liked(user_id).await?;
    Ok(Json(
        liked.into_iter().map(LikedReviewResponse::from).collect(),
    ))
}
