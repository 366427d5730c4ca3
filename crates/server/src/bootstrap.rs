//! Admin account initialization.

use anyhow::Result;
use critique_core::Role;
use critique_core::config::AuthConfig;
use critique_store::PrimaryStore;
use time::OffsetDateTime;

/// Promote every configured admin email that has an account to the admin role.
///
/// Emails without an account are skipped with a warning; they can sign up and
/// are promoted on the next restart. Returns the number of promoted accounts.
pub async fn ensure_admins(store: &dyn PrimaryStore, config: &AuthConfig) -> Result<usize> {
    let now = OffsetDateTime::now_utc();
    let mut promoted = 0;

    for email in &config.admin_emails {
        // Stored emails are lowercase.
        let email = email.trim().to_lowercase();
        if email.is_empty() {
            continue;
        }

        let Some(user) = store.get_user_by_email(&email).await? else {
            tracing::warn!(email = %email, "Configured admin has no account, skipping");
            continue;
        };

        if user.role_id == Role::Admin.id() {
            tracing::debug!(user_id = user.id, "Admin role already assigned");
            continue;
        }

        if store.set_user_role(user.id, Role::Admin.id(), now).await? {
            promoted += 1;
            tracing::info!(user_id = user.id, email = %email, "User promoted to admin");
        }
    }

    Ok(promoted)
}
