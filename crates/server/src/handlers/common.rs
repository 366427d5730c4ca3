//! Shared handler helpers and response bodies.

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use axum::Json;
use axum::extract::{Request, State};
use critique_core::Role;
use critique_store::models::{GenreRow, ReviewDetail, UserRow};
use serde::Serialize;
use serde::de::DeserializeOwned;
use time::OffsetDateTime;

/// Read and decode a JSON request body of at most `limit` bytes.
pub async fn read_json<T: DeserializeOwned>(req: Request, limit: usize) -> ApiResult<T> {
    let bytes = axum::body::to_bytes(req.into_body(), limit)
        .await
        .map_err(|e| ApiError::BadRequest(format!("failed to read body: {e}")))?;
    serde_json::from_slice(&bytes).map_err(|e| ApiError::BadRequest(format!("invalid JSON: {e}")))
}

/// Parse a positive numeric id from a path segment.
pub fn parse_id(raw: &str, what: &str) -> ApiResult<i64> {
    match raw.trim().parse::<i64>() {
        Ok(id) if id > 0 => Ok(id),
        _ => Err(ApiError::BadRequest(format!("invalid {what} id: {raw}"))),
    }
}

/// Unwrap a required body field.
pub fn required<T>(value: Option<T>, field: &'static str) -> ApiResult<T> {
    value.ok_or(ApiError::Core(critique_core::Error::MissingField(field)))
}

/// Plain acknowledgement.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

/// GET /health - Health check.
///
/// Unauthenticated so probes and load balancers can reach it. Fails when the
/// primary store is unreachable.
pub async fn health_check(State(state): State<AppState>) -> ApiResult<Json<HealthResponse>> {
    state.store.health_check().await?;

    Ok(Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    }))
}

/// Genre as returned by the API.
#[derive(Debug, Serialize)]
pub struct GenreResponse {
    pub id: i64,
    pub name: String,
}

impl From<GenreRow> for GenreResponse {
    fn from(row: GenreRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
        }
    }
}

/// Review with creator, media and genres.
#[derive(Debug, Serialize)]
pub struct ReviewResponse {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub media_id: i64,
    pub media_name: String,
    pub platform_id: i64,
    pub user_id: i64,
    pub user_name: String,
    pub is_blocked: bool,
    pub genres: Vec<GenreResponse>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl From<ReviewDetail> for ReviewResponse {
    fn from(detail: ReviewDetail) -> Self {
        let review = detail.review;
        Self {
            id: review.id,
            title: review.title,
            description: review.description,
            media_id: review.media_id,
            media_name: review.media_name,
            platform_id: review.platform_id,
            user_id: review.user_id,
            user_name: review.user_name,
            is_blocked: review.is_blocked,
            genres: detail.genres.into_iter().map(GenreResponse::from).collect(),
            created_at: review.created_at,
            updated_at: review.updated_at,
        }
    }
}

/// Convert a list of review details.
pub fn review_list(details: Vec<ReviewDetail>) -> Vec<ReviewResponse> {
    details.into_iter().map(ReviewResponse::from).collect()
}

/// User profile. Never carries the password hash.
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: i64,
    pub name: String,
    pub lastname: String,
    pub email: String,
    pub role: String,
    pub is_blocked: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl From<UserRow> for UserResponse {
    fn from(row: UserRow) -> Self {
        let role = Role::from_id(row.role_id)
            .map(|role| role.as_str().to_string())
            .unwrap_or_else(|_| format!("role-{}", row.role_id));
        Self {
            id: row.id,
            name: row.name,
            lastname: row.lastname,
            email: row.email,
            role,
            is_blocked: row.is_blocked,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}
