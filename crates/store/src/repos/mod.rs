//! Repository traits for primary store operations.

pub mod catalog;
pub mod engagement;
pub mod reviews;
pub mod sessions;
pub mod users;

pub use catalog::CatalogRepo;
pub use engagement::EngagementRepo;
pub use reviews::ReviewRepo;
pub use sessions::SessionRepo;
pub use users::UserRepo;

/// Result of setting a boolean flag on a row.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FlagChange {
    /// The flag changed value.
    Changed,
    /// The flag already had the requested value.
    Unchanged,
    /// No row with the given id exists.
    NotFound,
}

impl FlagChange {
    /// Classify a conditional update: `rows_affected` of the update that only
    /// matches rows whose flag differs, and whether the row exists at all.
    pub fn classify(rows_affected: u64, exists: bool) -> Self {
        if rows_affected > 0 {
            Self::Changed
        } else if exists {
            Self::Unchanged
        } else {
            Self::NotFound
        }
    }
}

/// Escape `%`, `_` and `\` so a user-supplied pattern matches literally
/// inside `LIKE ... ESCAPE '\'`.
pub fn escape_like(pattern: &str) -> String {
    let mut escaped = String::with_capacity(pattern.len() + 2);
    escaped.push('%');
    for c in pattern.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}
