//! HTTP API server for the Critique review service.
//!
//! This crate provides:
//! - Review, engagement and catalog endpoints
//! - Account signup, login and session handling
//! - Admin user directory operations
//! - Prometheus metrics

pub mod auth;
pub mod bootstrap;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod routes;
pub mod state;

pub use auth::{AuthenticatedUser, IdentityVerifier, SessionVerifier, TraceId};
pub use error::ApiError;
pub use routes::create_router;
pub use state::AppState;
