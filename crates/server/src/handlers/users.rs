//! User directory endpoints.

use crate::auth::{AuthenticatedUser, require_auth};
use crate::error::{ApiError, ApiResult};
use crate::handlers::common::{UserResponse, parse_id};
use crate::state::AppState;
use axum::Json;
use axum::extract::{Path, Request, State};
use critique_store::FlagChange;
use serde::Serialize;
use time::OffsetDateTime;

/// Result of a block or unblock request.
#[derive(Debug, Serialize)]
pub struct BlockResponse {
    pub user_id: i64,
    pub is_blocked: bool,
    /// False when the account already had the requested state.
    pub changed: bool,
    /// Sessions revoked by a block.
    pub sessions_revoked: u64,
}

/// GET /users - List every account (admin only).
pub async fn list_users(
    State(state): State<AppState>,
    req: Request,
) -> ApiResult<Json<Vec<UserResponse>>> {
    let auth = require_auth(&req)?;
    auth.require_admin()?;

    let users = state.store.list_users().await?;
    Ok(Json(users.into_iter().map(UserResponse::from).collect()))
}

/// GET /user/{id} - Get one account (self or admin).
pub async fn get_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    req: Request,
) -> ApiResult<Json<UserResponse>> {
    let auth = require_auth(&req)?;
    let user_id = parse_id(&user_id, "user")?;
    auth.require_can_act_for(user_id)?;

    let user = state
        .store
        .get_user(user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("user {user_id} not found")))?;
    Ok(Json(user.into()))
}

async fn set_blocked(
    state: &AppState,
    auth: &AuthenticatedUser,
    user_id: &str,
    blocked: bool,
) -> ApiResult<BlockResponse> {
    auth.require_admin()?;
    let user_id = parse_id(user_id, "user")?;
    if blocked && user_id == auth.user_id() {
        return Err(ApiError::BadRequest("cannot block yourself".to_string()));
    }

    let now = OffsetDateTime::now_utc();
    let change = state.store.set_user_blocked(user_id, blocked, now).await?;
    if change == FlagChange::NotFound {
        return Err(ApiError::NotFound(format!("user {user_id} not found")));
    }

    // Revoke on every block request so a half-applied earlier block is completed.
    let sessions_revoked = if blocked {
        state.store.revoke_user_sessions(user_id, now).await?
    } else {
        0
    };

    tracing::info!(
        user_id,
        blocked,
        changed = change == FlagChange::Changed,
        sessions_revoked,
        admin_id = auth.user_id(),
        "User block state set"
    );

    Ok(BlockResponse {
        user_id,
        is_blocked: blocked,
        changed: change == FlagChange::Changed,
        sessions_revoked,
    })
}

/// PUT /block/user/{id} - Block an account and revoke its sessions (admin only).
pub async fn block_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    req: Request,
) -> ApiResult<Json<BlockResponse>> {
    Ok(Json(set_blocked(&state, require_auth(&req)?, &user_id, true).await?))
}

/// PUT /unblock/user/{id} - Unblock an account (admin only).
pub async fn unblock_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    req: Request,
) -> ApiResult<Json<BlockResponse>> {
    Ok(Json(set_blocked(&state, require_auth(&req)?, &user_id, false).await?))
}
