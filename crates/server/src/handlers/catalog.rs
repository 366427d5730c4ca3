//! Genres, media, platforms and roles.

use crate::auth::require_auth;
use crate::error::{ApiError, ApiResult};
use crate::handlers::common::{GenreResponse, read_json};
use crate::state::AppState;
use axum::Json;
use axum::extract::{Request, State};
use critique_core::TOP_GENRES_LIMIT;
use serde::{Deserialize, Serialize};

/// Longest accepted catalog entry name.
const MAX_CATALOG_NAME_LEN: usize = 100;

/// Body for creating a genre, media or platform.
#[derive(Debug, Deserialize)]
pub struct CreateNamedRequest {
    #[serde(default)]
    pub name: String,
}

/// A named catalog entry.
#[derive(Debug, Serialize)]
pub struct NamedResponse {
    pub id: i64,
    pub name: String,
}

/// Genre with its number of tagged reviews.
#[derive(Debug, Serialize)]
pub struct TopGenreResponse {
    pub id: i64,
    pub name: String,
    pub review_count: i64,
}

fn validate_catalog_name(name: &str) -> ApiResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ApiError::BadRequest("name must not be empty".to_string()));
    }
    if name.chars().count() > MAX_CATALOG_NAME_LEN {
        return Err(ApiError::BadRequest(format!(
            "name must be at most {MAX_CATALOG_NAME_LEN} characters"
        )));
    }
    Ok(name.to_string())
}

/// Admin check plus body decoding shared by the create endpoints.
async fn admin_name(state: &AppState, req: Request) -> ApiResult<(i64, String)> {
    let auth = require_auth(&req)?;
    auth.require_admin()?;
    let admin_id = auth.user_id();
    let body: CreateNamedRequest = read_json(req, state.config.server.max_body_bytes).await?;
    Ok((admin_id, validate_catalog_name(&body.name)?))
}

/// GET /genres - Every genre.
pub async fn list_genres(
    State(state): State<AppState>,
    req: Request,
) -> ApiResult<Json<Vec<GenreResponse>>> {
    require_auth(&req)?;
    let genres = state.store.list_genres().await?;
    Ok(Json(genres.into_iter().map(GenreResponse::from).collect()))
}

/// GET /genres/top - Genres with the most reviews.
pub async fn top_genres(
    State(state): State<AppState>,
    req: Request,
) -> ApiResult<Json<Vec<TopGenreResponse>>> {
    require_auth(&req)?;
    let genres = state.store.top_genres(TOP_GENRES_LIMIT).await?;
    Ok(Json(
        genres
            .into_iter()
            .map(|row| TopGenreResponse {
                id: row.id,
                name: row.name,
                review_count: row.review_count,
            })
            .collect(),
    ))
}

/// POST /genres - Create a genre (admin only). Names are unique.
pub async fn create_genre(
    State(state): State<AppState>,
    req: Request,
) -> ApiResult<Json<GenreResponse>> {
    let (admin_id, name) = admin_name(&state, req).await?;
    let genre = state.store.create_genre(&name).await?;
    tracing::info!(genre_id = genre.id, name = %genre.name, admin_id, "Genre created");
    Ok(Json(genre.into()))
}

/// GET /medias - Every media entry.
pub async fn list_media(
    State(state): State<AppState>,
    req: Request,
) -> ApiResult<Json<Vec<NamedResponse>>> {
    require_auth(&req)?;
    let media = state.store.list_media().await?;
    Ok(Json(
        media
            .into_iter()
            .map(|row| NamedResponse {
                id: row.id,
                name: row.name,
            })
            .collect(),
    ))
}

/// POST /medias - Create a media entry (admin only).
pub async fn create_media(
    State(state): State<AppState>,
    req: Request,
) -> ApiResult<Json<NamedResponse>> {
    let (admin_id, name) = admin_name(&state, req).await?;
    let media = state.store.create_media(&name).await?;
    tracing::info!(media_id = media.id, name = %media.name, admin_id, "Media created");
    Ok(Json(NamedResponse {
        id: media.id,
        name: media.name,
    }))
}

/// GET /platforms - Every platform.
pub async fn list_platforms(
    State(state): State<AppState>,
    req: Request,
) -> ApiResult<Json<Vec<NamedResponse>>> {
    require_auth(&req)?;
    let platforms = state.store.list_platforms().await?;
    Ok(Json(
        platforms
            .into_iter()
            .map(|row| NamedResponse {
                id: row.id,
                name: row.name,
            })
            .collect(),
    ))
}

/// POST /platforms - Create a platform (admin only).
pub async fn create_platform(
    State(state): State<AppState>,
    req: Request,
) -> ApiResult<Json<NamedResponse>> {
    let (admin_id, name) = admin_name(&state, req).await?;
    let platform = state.store.create_platform(&name).await?;
    tracing::info!(platform_id = platform.id, name = %platform.name, admin_id, "Platform created");
    Ok(Json(NamedResponse {
        id: platform.id,
        name: platform.name,
    }))
}

/// GET /roles - Every role.
pub async fn list_roles(
    State(state): State<AppState>,
    req: Request,
) -> ApiResult<Json<Vec<NamedResponse>>> {
    require_auth(&req)?;
    let roles = state.store.list_roles().await?;
    Ok(Json(
        roles
            .into_iter()
            .map(|row| NamedResponse {
                id: row.id,
                name: row.name,
            })
            .collect(),
    ))
}
