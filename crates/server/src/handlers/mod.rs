//! HTTP request handlers.

pub mod auth;
pub mod catalog;
pub mod common;
pub mod engagement;
pub mod reviews;
pub mod users;

pub use auth::*;
pub use catalog::*;
pub use common::*;
pub use engagement::*;
pub use reviews::*;
pub use users::*;
