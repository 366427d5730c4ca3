//! Core domain types and shared logic for the Critique review service.
//!
//! This crate defines the data model used across all other crates:
//! - Identities and roles
//! - Engagement states and gestures
//! - Signup and profile validation rules
//! - Password hashing
//! - Service configuration

pub mod config;
pub mod engagement;
pub mod error;
pub mod identity;
pub mod password;
pub mod validation;

pub use engagement::{DislikeOutcome, EngagementState, LikeOutcome, Tally};
pub use error::{Error, Result};
pub use identity::{Identity, Role};

/// Maximum page size for review listings.
pub const MAX_PAGE_SIZE: u32 = 100;

/// Number of genres reported by the top genres listing.
pub const TOP_GENRES_LIMIT: u32 = 4;
