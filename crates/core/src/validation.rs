//! Field validation for account and review input.

use crate::error::{Error, Result};
use regex::Regex;
use std::sync::LazyLock;

/// Name length bounds, in characters.
pub const NAME_LEN: (usize, usize) = (2, 20);

/// Last name length bounds, in characters.
pub const LASTNAME_LEN: (usize, usize) = (3, 20);

/// Minimum password length, in characters.
pub const MIN_PASSWORD_LEN: usize = 8;

/// Maximum review title length, in characters.
pub const MAX_TITLE_LEN: usize = 255;

/// Maximum review description length, in characters.
pub const MAX_DESCRIPTION_LEN: usize = 10_000;

fn check_len(field: &'static str, value: &str, (min, max): (usize, usize)) -> Result<()> {
    let len = value.chars().count();
    if len < min || len > max {
        return Err(Error::validation(
            field,
            format!("must be between {min} and {max} characters"),
        ));
    }
    Ok(())
}

pub fn validate_name(name: &str) -> Result<()> {
    check_len("name", name, NAME_LEN)
}

pub fn validate_lastname(lastname: &str) -> Result<()> {
    check_len("lastname", lastname, LASTNAME_LEN)
}

pub fn validate_password(password: &str) -> Result<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(Error::validation(
            "password",
            format!("must be at least {MIN_PASSWORD_LEN} characters"),
        ));
    }
    Ok(())
}

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").expect("valid email regex")
});

/// Validate an email address.
///
/// Accepted shape: `local@domain.tld` where the local part uses letters, digits
/// and `._%+-`, the domain uses letters, digits and `.-`, and the final label is
/// at least two ASCII letters.
pub fn validate_email(email: &str) -> Result<()> {
    if !EMAIL_RE.is_match(email) {
        return Err(Error::validation(
            "email",
            "must be valid and not contain special characters other than '.', '_', '%', '+', and '-'",
        ));
    }
    Ok(())
}

pub fn validate_title(title: &str) -> Result<()> {
    if title.trim().is_empty() {
        return Err(Error::validation("title", "must not be empty"));
    }
    if title.chars().count() > MAX_TITLE_LEN {
        return Err(Error::validation(
            "title",
            format!("must be at most {MAX_TITLE_LEN} characters"),
        ));
    }
    Ok(())
}

pub fn validate_description(description: &str) -> Result<()> {
    if description.chars().count() > MAX_DESCRIPTION_LEN {
        return Err(Error::validation(
            "description",
            format!("must be at most {MAX_DESCRIPTION_LEN} characters"),
        ));
    }
    Ok(())
}

/// Collapse duplicate genre ids while keeping first-seen order.
pub fn dedup_genre_ids(genre_ids: &[i64]) -> Vec<i64> {
    let mut seen = std::collections::HashSet::new();
    genre_ids
        .iter()
        .copied()
        .filter(|id| seen.insert(*id))
        .collect()
}

/// Signup input after validation.
#[derive(Clone, Debug)]
pub struct SignupFields<'a> {
    pub name: &'a str,
    pub lastname: &'a str,
    pub email: &'a str,
    pub password: &'a str,
}

impl SignupFields<'_> {
    pub fn validate(&self) -> Result<()> {
        validate_name(self.name)?;
        validate_lastname(self.lastname)?;
        validate_email(self.email)?;
        validate_password(self.password)
    }
}
