//! Account endpoints: signup, login, logout, whoami and profile updates.

use crate::auth::{generate_token_secret, hash_token, require_auth};
use crate::error::{ApiError, ApiResult};
use crate::handlers::common::{MessageResponse, UserResponse, parse_id, read_json};
use crate::metrics::{AUTH_FAILURES, LOGINS, SIGNUPS};
use crate::state::AppState;
use axum::Json;
use axum::extract::{Path, Request, State};
use critique_core::Role;
use critique_core::password::{hash_password_async, verify_password_async};
use critique_core::validation::{
    SignupFields, validate_lastname, validate_name, validate_password,
};
use critique_events::AuthEvent;
use critique_store::StoreError;
use critique_store::models::{NewUser, SessionRow, UserUpdate};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

/// Same message for an unknown email and a wrong password.
const BAD_CREDENTIALS: &str = "incorrect email or password";

/// Signup request body.
#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub lastname: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// Login request body.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// Profile update request body.
#[derive(Debug, Deserialize)]
pub struct UpdateUserRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub lastname: String,
    /// New password; omitted keeps the current one.
    pub password: Option<String>,
}

/// Session token issued by signup and login.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,
    pub user: UserResponse,
}

/// Response for the authenticated caller.
#[derive(Debug, Serialize)]
pub struct WhoamiResponse {
    pub user_id: i64,
    pub role: String,
    pub session_id: String,
    pub user: UserResponse,
}

/// Emails are compared and stored lowercase.
fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Create a session for `user_id` and return the bearer token with its expiry.
async fn open_session(state: &AppState, user_id: i64) -> ApiResult<(String, OffsetDateTime)> {
    let token = generate_token_secret();
    let now = OffsetDateTime::now_utc();
    let expires_at = now.saturating_add(state.config.auth.session_ttl());

    let session = SessionRow {
        session_id: Uuid::new_v4(),
        user_id,
        token_hash: hash_token(&token),
        created_at: now,
        expires_at,
        revoked_at: None,
        last_used_at: None,
    };
    state.store.create_session(&session).await?;
    tracing::debug!(user_id, session_id = %session.session_id, "Session opened");

    Ok((token, expires_at))
}

/// POST /auth/signup - Create an account with the default user role.
pub async fn signup(State(state): State<AppState>, req: Request) -> ApiResult<Json<AuthResponse>> {
    let body: SignupRequest = read_json(req, state.config.server.max_body_bytes).await?;
    let email = normalize_email(&body.email);
    let name = body.name.trim().to_string();
    let lastname = body.lastname.trim().to_string();

    SignupFields {
        name: &name,
        lastname: &lastname,
        email: &email,
        password: &body.password,
    }
    .validate()?;

    if state.store.get_user_by_email(&email).await?.is_some() {
        return Err(ApiError::Conflict("user already exists".to_string()));
    }

    let password_hash = hash_password_async(body.password).await?;
    let now = OffsetDateTime::now_utc();
    let user = state
        .store
        .create_user(
            &NewUser {
                name,
                lastname,
                email,
                password_hash,
                role_id: Role::User.id(),
            },
            now,
        )
        .await
        .map_err(|e| match e {
            // Lost a race with a concurrent signup for the same email.
            StoreError::AlreadyExists(_) => ApiError::Conflict("user already exists".to_string()),
            other => other.into(),
        })?;

    let (token, expires_at) = open_session(&state, user.id).await?;

    SIGNUPS.inc();
    tracing::info!(user_id = user.id, "User signed up");
    state
        .events
        .publish(AuthEvent::signup(
            user.id,
            user.email.clone(),
            user.name.clone(),
            user.lastname.clone(),
            Role::User.as_str(),
        ))
        .await;

    Ok(Json(AuthResponse {
        token,
        expires_at,
        user: user.into(),
    }))
}

/// POST /auth/login - Exchange email and password for a session token.
pub async fn login(State(state): State<AppState>, req: Request) -> ApiResult<Json<AuthResponse>> {
    let body: LoginRequest = read_json(req, state.config.server.max_body_bytes).await?;
    let email = normalize_email(&body.email);
    if email.is_empty() || body.password.is_empty() {
        return Err(ApiError::BadRequest(
            "email and password are required".to_string(),
        ));
    }

    let Some(user) = state.store.get_user_by_email(&email).await? else {
        AUTH_FAILURES.with_label_values(&["bad_credentials"]).inc();
        return Err(ApiError::Unauthorized(BAD_CREDENTIALS.to_string()));
    };

    if !verify_password_async(body.password, user.password_hash.clone()).await? {
        AUTH_FAILURES.with_label_values(&["bad_credentials"]).inc();
        tracing::debug!(user_id = user.id, "Login rejected, wrong password");
        return Err(ApiError::Unauthorized(BAD_CREDENTIALS.to_string()));
    }

    if user.is_blocked {
        AUTH_FAILURES.with_label_values(&["user_blocked"]).inc();
        tracing::info!(user_id = user.id, "Login rejected, user is blocked");
        return Err(ApiError::Unauthorized("account is blocked".to_string()));
    }

    let role = Role::from_id(user.role_id)?;
    let (token, expires_at) = open_session(&state, user.id).await?;

    LOGINS.inc();
    tracing::info!(user_id = user.id, role = %role, "User logged in");
    state
        .events
        .publish(AuthEvent::login(user.id, user.email.clone(), role.as_str()))
        .await;

    Ok(Json(AuthResponse {
        token,
        expires_at,
        user: user.into(),
    }))
}

/// POST /auth/logout - Revoke the session that authenticated this request.
pub async fn logout(
    State(state): State<AppState>,
    req: Request,
) -> ApiResult<Json<MessageResponse>> {
    let auth = require_auth(&req)?;
    state
        .store
        .revoke_session(auth.session_id, OffsetDateTime::now_utc())
        .await?;
    tracing::info!(user_id = auth.user_id(), session_id = %auth.session_id, "Session revoked");

    Ok(Json(MessageResponse::new("logged out")))
}

/// GET /auth/whoami - Return the caller's identity and profile.
pub async fn whoami(
    State(state): State<AppState>,
    req: Request,
) -> ApiResult<Json<WhoamiResponse>> {
    let auth = require_auth(&req)?;
    let user = state
        .store
        .get_user(auth.user_id())
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("user {} not found", auth.user_id())))?;

    Ok(Json(WhoamiResponse {
        user_id: auth.user_id(),
        role: auth.identity.role.as_str().to_string(),
        session_id: auth.session_id.to_string(),
        user: user.into(),
    }))
}

/// PUT /auth/updateUser/{id} - Update name, lastname and optionally the password.
pub async fn update_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    req: Request,
) -> ApiResult<Json<UserResponse>> {
    let auth = require_auth(&req)?.clone();
    let user_id = parse_id(&user_id, "user")?;
    auth.require_can_act_for(user_id)?;

    let body: UpdateUserRequest = read_json(req, state.config.server.max_body_bytes).await?;
    let name = body.name.trim().to_string();
    let lastname = body.lastname.trim().to_string();
    validate_name(&name)?;
    validate_lastname(&lastname)?;

    let password_hash = match body.password {
        Some(password) => {
            validate_password(&password)?;
            Some(hash_password_async(password).await?)
        }
        None => None,
    };
    let password_changed = password_hash.is_some();

    let user = state
        .store
        .update_user(
            user_id,
            &UserUpdate {
                name,
                lastname,
                password_hash,
            },
            OffsetDateTime::now_utc(),
        )
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("user {user_id} not found")))?;

    tracing::info!(
        user_id,
        updated_by = auth.user_id(),
        password_changed,
        "User profile updated"
    );
    Ok(Json(user.into()))
}
