//! Test fixtures for generating test data.

use async_trait::async_trait;
use critique_core::Role;
use critique_events::{AuthEvent, EventPublisher};
use critique_server::auth::{generate_token_secret, hash_token};
use critique_store::models::{MirrorRecord, NewReview, NewUser, SessionRow, UserRow};
use critique_store::{MirrorError, MirrorResult, PrimaryStore, ReviewMirror};
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

/// Counter for generating unique emails.
static EMAIL_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Reference rows most review tests need.
#[allow(dead_code)]
#[derive(Debug, Clone)]
pub struct Catalog {
    pub media_id: i64,
    pub platform_id: i64,
    pub genre_ids: Vec<i64>,
}

/// Generate a unique email address.
#[allow(dead_code)]
pub fn unique_email(prefix: &str) -> String {
    let n = EMAIL_COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("{prefix}{n}@example.com")
}

/// Create a user with a placeholder password hash.
#[allow(dead_code)]
pub async fn create_user(store: &dyn PrimaryStore, role: Role) -> UserRow {
    store
        .create_user(
            &NewUser {
                name: "Test".to_string(),
                lastname: "User".to_string(),
                email: unique_email(role.as_str()),
                password_hash: "not-a-real-hash".to_string(),
                role_id: role.id(),
            },
            OffsetDateTime::now_utc(),
        )
        .await
        .expect("Failed to create user")
}

/// Open a session for `user_id` and return the raw bearer token.
#[allow(dead_code)]
pub async fn create_session_token(store: &dyn PrimaryStore, user_id: i64) -> String {
    let token = generate_token_secret();
    let now = OffsetDateTime::now_utc();
    store
        .create_session(&SessionRow {
            session_id: Uuid::new_v4(),
            user_id,
            token_hash: hash_token(&token),
            created_at: now,
            expires_at: now + Duration::hours(1),
            revoked_at: None,
            last_used_at: None,
        })
        .await
        .expect("Failed to create session");
    token
}

/// Create a user and a session, returning both.
#[allow(dead_code)]
pub async fn create_user_with_token(store: &dyn PrimaryStore, role: Role) -> (UserRow, String) {
    let user = create_user(store, role).await;
    let token = create_session_token(store, user.id).await;
    (user, token)
}

/// Seed one media, one platform and three genres.
#[allow(dead_code)]
pub async fn seed_catalog(store: &dyn PrimaryStore) -> Catalog {
    let media = store.create_media("Film").await.expect("create media");
    let platform = store.create_platform("Cinema").await.expect("create platform");
    let mut genre_ids = Vec::new();
    for name in ["Drama", "Sci-Fi", "Comedy"] {
        genre_ids.push(store.create_genre(name).await.expect("create genre").id);
    }
    Catalog {
        media_id: media.id,
        platform_id: platform.id,
        genre_ids,
    }
}

/// Build a review for `user_id` using the seeded catalog.
#[allow(dead_code)]
pub fn new_review(catalog: &Catalog, user_id: i64, title: &str, genre_ids: Vec<i64>) -> NewReview {
    NewReview {
        media_id: catalog.media_id,
        title: title.to_string(),
        description: format!("Thoughts on {title}"),
        platform_id: catalog.platform_id,
        user_id,
        genre_ids,
    }
}

/// Event publisher that keeps every event in memory.
#[allow(dead_code)]
#[derive(Default)]
pub struct RecordingPublisher {
    events: Mutex<Vec<AuthEvent>>,
}

#[allow(dead_code)]
impl RecordingPublisher {
    pub fn events(&self) -> Vec<AuthEvent> {
        self.events.lock().unwrap().clone()
    }
}

#[async_trait]
impl EventPublisher for RecordingPublisher {
    async fn publish(&self, event: AuthEvent) {
        self.events.lock().unwrap().push(event);
    }
}

/// Mirror write as seen by [`RecordingMirror`].
#[allow(dead_code)]
#[derive(Debug, Clone, PartialEq)]
pub enum MirrorCall {
    Insert(i64),
    Update(i64, String),
    SetDeleted(i64, bool),
}

/// Mirror that records calls and optionally fails or never finishes a write.
#[allow(dead_code)]
#[derive(Default)]
pub struct RecordingMirror {
    pub fail: bool,
    pub hang: bool,
    calls: Mutex<Vec<MirrorCall>>,
}

#[allow(dead_code)]
impl RecordingMirror {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    /// Every write is recorded and then never completes.
    pub fn hanging() -> Self {
        Self {
            hang: true,
            ..Default::default()
        }
    }

    pub fn calls(&self) -> Vec<MirrorCall> {
        self.calls.lock().unwrap().clone()
    }

    async fn record(&self, call: MirrorCall) -> MirrorResult<()> {
        self.calls.lock().unwrap().push(call);
        if self.hang {
            std::future::pending::<()>().await;
        }
        if self.fail {
            Err(MirrorError::Unavailable("mirror down for test".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl ReviewMirror for RecordingMirror {
    async fn insert_review(&self, record: &MirrorRecord) -> MirrorResult<()> {
        self.record(MirrorCall::Insert(record.id)).await
    }

    async fn update_review(
        &self,
        review_id: i64,
        title: &str,
        _description: &str,
        _updated_at: OffsetDateTime,
    ) -> MirrorResult<()> {
        self.record(MirrorCall::Update(review_id, title.to_string()))
            .await
    }

    async fn set_deleted_at(
        &self,
        review_id: i64,
        deleted_at: Option<OffsetDateTime>,
    ) -> MirrorResult<()> {
        self.record(MirrorCall::SetDeleted(review_id, deleted_at.is_some()))
            .await
    }
}
