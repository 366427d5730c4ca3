//! Authentication events.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// An authentication event as it appears on the queue:
/// `{"event": "signup" | "login", ...payload}`.
///
/// Events carry no password material.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum AuthEvent {
    Signup {
        user_id: i64,
        email: String,
        name: String,
        lastname: String,
        role: String,
        #[serde(with = "time::serde::rfc3339")]
        occurred_at: OffsetDateTime,
    },
    Login {
        user_id: i64,
        email: String,
        role: String,
        #[serde(with = "time::serde::rfc3339")]
        occurred_at: OffsetDateTime,
    },
}

impl AuthEvent {
    pub fn signup(
        user_id: i64,
        email: impl Into<String>,
        name: impl Into<String>,
        lastname: impl Into<String>,
        role: impl Into<String>,
    ) -> Self {
        Self::Signup {
            user_id,
            email: email.into(),
            name: name.into(),
            lastname: lastname.into(),
            role: role.into(),
            occurred_at: OffsetDateTime::now_utc(),
        }
    }

    pub fn login(user_id: i64, email: impl Into<String>, role: impl Into<String>) -> Self {
        Self::Login {
            user_id,
            email: email.into(),
            role: role.into(),
            occurred_at: OffsetDateTime::now_utc(),
        }
    }

    /// The `event` tag value.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Signup { .. } => "signup",
            Self::Login { .. } => "login",
        }
    }

    pub fn user_id(&self) -> i64 {
        match self {
            Self::Signup { user_id, .. } | Self::Login { user_id, .. } => *user_id,
        }
    }

    /// Encode the event as the JSON message body.
    pub fn to_payload(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }
}
