//! Authenticated identities and roles.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A user role.
///
/// Role ids are stable: they are seeded into the `roles` table at startup
/// and referenced by `users.role_id`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

impl Role {
    /// The role assigned to every new account.
    pub const DEFAULT: Role = Role::User;

    /// Database id of the role.
    pub fn id(self) -> i64 {
        match self {
            Role::User => 1,
            Role::Admin => 2,
        }
    }

    /// Resolve a role from its database id.
    pub fn from_id(id: i64) -> Result<Self> {
        match id {
            1 => Ok(Role::User),
            2 => Ok(Role::Admin),
            other => Err(Error::InvalidRole(other.to_string())),
        }
    }

    /// Canonical role name.
    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "user" => Ok(Role::User),
            "admin" => Ok(Role::Admin),
            other => Err(Error::InvalidRole(other.to_string())),
        }
    }
}

/// Claims extracted from a verified credential.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Identity {
    pub user_id: i64,
    pub role: Role,
}

impl Identity {
    pub fn new(user_id: i64, role: Role) -> Self {
        Self { user_id, role }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Whether this identity may act on resources owned by `owner_id`.
    pub fn can_act_for(&self, owner_id: i64) -> bool {
        self.is_admin() || self.user_id == owner_id
    }
}
