//! Authentication and authorization middleware.

use crate::error::{ApiError, ApiResult};
use crate::metrics::AUTH_FAILURES;
use crate::state::AppState;
use async_trait::async_trait;
use axum::extract::{Request, State};
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::Response;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use critique_core::{Identity, Role};
use critique_store::{PrimaryStore, StoreError};
use rand::RngCore;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use time::OffsetDateTime;
use tracing::Instrument;
use uuid::Uuid;

/// Maximum length for trace IDs.
/// Longer trace IDs are truncated to prevent log bloat and potential log injection.
const MAX_TRACE_ID_LEN: usize = 128;

/// Trace ID for request correlation.
#[derive(Clone, Debug)]
pub struct TraceId(pub String);

impl TraceId {
    /// Generate a new random trace ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create a trace ID from a client-provided value.
    /// Truncated to MAX_TRACE_ID_LEN characters, non-printable characters removed.
    pub fn from_client(value: &str) -> Self {
        let sanitized: String = value
            .chars()
            .take(MAX_TRACE_ID_LEN)
            .filter(|c| c.is_ascii_graphic() || *c == ' ')
            .collect();

        if sanitized.is_empty() {
            Self::new()
        } else {
            Self(sanitized)
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for TraceId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TraceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Why a presented bearer token was not accepted.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("unknown session token")]
    UnknownToken,

    #[error("session expired or revoked")]
    SessionInactive,

    #[error("user is blocked")]
    UserBlocked,

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("invalid stored role: {0}")]
    Role(#[from] critique_core::Error),
}

impl AuthError {
    /// Label used for the authentication failure counter.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::UnknownToken => "unknown_token",
            Self::SessionInactive => "session_inactive",
            Self::UserBlocked => "user_blocked",
            Self::Store(_) | Self::Role(_) => "internal",
        }
    }

    /// Whether this is a credential problem rather than a server failure.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            Self::UnknownToken | Self::SessionInactive | Self::UserBlocked
        )
    }
}

/// Authenticated request extension.
#[derive(Clone, Debug)]
pub struct AuthenticatedUser {
    pub identity: Identity,
    /// Session that authenticated the request.
    pub session_id: Uuid,
}

impl AuthenticatedUser {
    pub fn user_id(&self) -> i64 {
        self.identity.user_id
    }

    pub fn is_admin(&self) -> bool {
        self.identity.is_admin()
    }

    /// Require the admin role.
    pub fn require_admin(&self) -> ApiResult<()> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(ApiError::Forbidden("admin role required".to_string()))
        }
    }

    /// Require that the caller is `owner_id` or an admin.
    pub fn require_can_act_for(&self, owner_id: i64) -> ApiResult<()> {
        if self.identity.can_act_for(owner_id) {
            Ok(())
        } else {
            Err(ApiError::Forbidden(format!(
                "not allowed to act for user {owner_id}"
            )))
        }
    }
}

/// Turns a bearer token into an identity.
#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> Result<AuthenticatedUser, AuthError>;
}

/// Verifies opaque session tokens against the sessions table.
pub struct SessionVerifier {
    store: Arc<dyn PrimaryStore>,
}

impl SessionVerifier {
    pub fn new(store: Arc<dyn PrimaryStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl IdentityVerifier for SessionVerifier {
    async fn verify(&self, token: &str) -> Result<AuthenticatedUser, AuthError> {
        let token_hash = hash_token(token);
        let session = self
            .store
            .get_session_by_hash(&token_hash)
            .await?
            .ok_or(AuthError::UnknownToken)?;

        let now = OffsetDateTime::now_utc();
        if !session.is_active(now) {
            return Err(AuthError::SessionInactive);
        }

        let user = self
            .store
            .get_user(session.user_id)
            .await?
            .ok_or(AuthError::UnknownToken)?;
        if user.is_blocked {
            return Err(AuthError::UserBlocked);
        }
        let role = Role::from_id(user.role_id)?;

        // Update last used time (fire and forget)
        let store = self.store.clone();
        let session_id = session.session_id;
        tokio::spawn(async move {
            let _ = store.touch_session(session_id, now).await;
        });

        Ok(AuthenticatedUser {
            identity: Identity::new(user.id, role),
            session_id,
        })
    }
}

/// Extract bearer token from Authorization header.
/// Per RFC 6750, the "Bearer" scheme is case-insensitive.
fn extract_bearer_token(req: &Request) -> Option<&str> {
    req.headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| {
            if v.len() >= 7 && v[..7].eq_ignore_ascii_case("bearer ") {
                Some(v[7..].trim())
            } else {
                None
            }
        })
        .filter(|token| !token.is_empty())
}

/// Extract trace ID from X-Trace-Id header or generate a new one.
fn extract_or_generate_trace_id(req: &Request) -> TraceId {
    req.headers()
        .get("x-trace-id")
        .and_then(|v| v.to_str().ok())
        .map(TraceId::from_client)
        .unwrap_or_else(TraceId::new)
}

/// Hash a token for storage lookup.
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

/// Generate a new random session token secret.
pub fn generate_token_secret() -> String {
    let mut bytes = [0u8; 32];
    rand::rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Authentication middleware that resolves session tokens and sets up trace context.
///
/// A rejected token leaves the request unauthenticated; handlers that need an
/// identity answer 401 through [`require_auth`].
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let trace_id = extract_or_generate_trace_id(&req);
    let trace_id_str = trace_id.0.clone();
    req.extensions_mut().insert(trace_id);

    let token = extract_bearer_token(&req).map(str::to_owned);
    if let Some(token) = token {
        let verified = state.verifier.verify(&token).await;
        match verified {
            Ok(user) => {
                req.extensions_mut().insert(user);
            }
            Err(e) if e.is_rejection() => {
                AUTH_FAILURES.with_label_values(&[e.reason()]).inc();
                tracing::debug!(trace_id = %trace_id_str, reason = e.reason(), "Bearer token rejected");
            }
            Err(e) => {
                AUTH_FAILURES.with_label_values(&[e.reason()]).inc();
                return Err(ApiError::Internal(format!("token verification failed: {e}")));
            }
        }
    }

    let response = next
        .run(req)
        .instrument(tracing::info_span!("request", trace_id = %trace_id_str))
        .await;

    Ok(response)
}

/// Require authentication (a valid session must be present).
pub fn require_auth(req: &Request) -> ApiResult<&AuthenticatedUser> {
    req.extensions()
        .get::<AuthenticatedUser>()
        .ok_or_else(|| ApiError::Unauthorized("unauthenticated".to_string()))
}

mod hex {
    pub fn encode(bytes: impl AsRef<[u8]>) -> String {
        bytes.as_ref().iter().map(|b| format!("{b:02x}")).collect()
    }
}
