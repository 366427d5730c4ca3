//! Integration tests for like/dislike state against SQLite.

mod common;

use common::fixtures::{Catalog, create_user, new_review, seed_catalog};
use common::store::TestStore;
use critique_core::{EngagementState, LikeOutcome, Role};
use critique_store::{BestEffortMirror, EngagementTracker, ReviewStore, StoreError};

struct Fixture {
    test: TestStore,
    reviews: ReviewStore,
    tracker: EngagementTracker,
    catalog: Catalog,
    author: i64,
}

async fn fixture() -> Fixture {
    let test = TestStore::new().await;
    let store = test.store();
    let catalog = seed_catalog(store.as_ref()).await;
    let author = create_user(store.as_ref(), Role::User).await.id;
    Fixture {
        reviews: ReviewStore::new(store.clone(), BestEffortMirror::disabled(), 50),
        tracker: EngagementTracker::new(store),
        test,
        catalog,
        author,
    }
}

impl Fixture {
    async fn review(&self, title: &str) -> i64 {
        self.reviews
            .create_review(new_review(&self.catalog, self.author, title, vec![]))
            .await
            .unwrap()
    }

    async fn user(&self) -> i64 {
        create_user(self.test.store().as_ref(), Role::User).await.id
    }
}

#[tokio::test]
async fn test_like_is_recorded_once() {
    let fx = fixture().await;
    let review = fx.review("Paprika").await;
    let user = fx.user().await;

    assert_eq!(fx.tracker.state(user, review).await.unwrap(), EngagementState::NoAction);
    assert_eq!(fx.tracker.like(user, review).await.unwrap(), LikeOutcome::Liked);
    assert_eq!(
        fx.tracker.like(user, review).await.unwrap(),
        LikeOutcome::AlreadyActed(EngagementState::Liked)
    );
    assert_eq!(fx.tracker.state(user, review).await.unwrap(), EngagementState::Liked);

    let tally = fx.reviews.tally(review).await.unwrap().unwrap();
    assert_eq!((tally.likes, tally.dislikes), (1, 0));
}

#[tokio::test]
async fn test_dislike_converges_from_any_state() {
    let fx = fixture().await;
    let review = fx.review("Akira").await;
    let fresh = fx.user().await;
    let liker = fx.user().await;

    let first = fx.tracker.dislike(fresh, review).await.unwrap();
    assert_eq!(first.previous, EngagementState::NoAction);
    assert!(first.changed());
    let repeat = fx.tracker.dislike(fresh, review).await.unwrap();
    assert_eq!(repeat.previous, EngagementState::Disliked);
    assert!(!repeat.changed());

    fx.tracker.like(liker, review).await.unwrap();
    let flipped = fx.tracker.dislike(liker, review).await.unwrap();
    assert_eq!(flipped.previous, EngagementState::Liked);
    assert_eq!(fx.tracker.state(liker, review).await.unwrap(), EngagementState::Disliked);

    // The row was updated, not duplicated.
    let tally = fx.reviews.tally(review).await.unwrap().unwrap();
    assert_eq!((tally.likes, tally.dislikes), (0, 2));
}

#[tokio::test]
async fn test_like_after_dislike_is_rejected() {
    let fx = fixture().await;
    let review = fx.review("Perfect Blue").await;
    let user = fx.user().await;

    fx.tracker.dislike(user, review).await.unwrap();
    assert_eq!(
        fx.tracker.like(user, review).await.unwrap(),
        LikeOutcome::AlreadyActed(EngagementState::Disliked)
    );
    assert_eq!(fx.tracker.state(user, review).await.unwrap(), EngagementState::Disliked);
}

#[tokio::test]
async fn test_concurrent_likes_record_one_row() {
    let fx = fixture().await;
    let review = fx.review("Ghost in the Shell").await;
    let user = fx.user().await;

    let (a, b) = tokio::join!(fx.tracker.like(user, review), fx.tracker.like(user, review));
    let mut outcomes = vec![a.unwrap(), b.unwrap()];
    outcomes.sort_by_key(|o| matches!(o, LikeOutcome::AlreadyActed(_)));
    assert_eq!(
        outcomes,
        vec![
            LikeOutcome::Liked,
            LikeOutcome::AlreadyActed(EngagementState::Liked)
        ]
    );

    let tally = fx.reviews.tally(review).await.unwrap().unwrap();
    assert_eq!(tally.likes, 1);
}

#[tokio::test]
async fn test_users_engage_independently() {
    let fx = fixture().await;
    let review = fx.review("Mind Game").await;
    let alice = fx.user().await;
    let bob = fx.user().await;

    fx.tracker.like(alice, review).await.unwrap();
    fx.tracker.dislike(bob, review).await.unwrap();

    assert_eq!(fx.tracker.state(alice, review).await.unwrap(), EngagementState::Liked);
    assert_eq!(fx.tracker.state(bob, review).await.unwrap(), EngagementState::Disliked);
    let tally = fx.reviews.tally(review).await.unwrap().unwrap();
    assert_eq!((tally.likes, tally.dislikes), (1, 1));
}

#[tokio::test]
async fn test_engagement_keeps_genre_links() {
    let fx = fixture().await;
    let genres = vec![fx.catalog.genre_ids[2], fx.catalog.genre_ids[0]];
    let review = fx
        .reviews
        .create_review(new_review(&fx.catalog, fx.author, "Paterson", genres))
        .await
        .unwrap();
    let liker = fx.user().await;
    let disliker = fx.user().await;

    fx.tracker.like(liker, review).await.unwrap();
    fx.tracker.dislike(disliker, review).await.unwrap();
    fx.tracker.dislike(liker, review).await.unwrap();

    let mut expected = vec![fx.catalog.genre_ids[0], fx.catalog.genre_ids[2]];
    expected.sort();
    let store = fx.test.store();
    assert_eq!(store.review_genre_ids(review).await.unwrap(), expected);
    let detail = fx.reviews.get_one(review).await.unwrap().unwrap();
    assert_eq!(detail.genres.len(), 2);
}

#[tokio::test]
async fn test_engagement_with_missing_or_deleted_review() {
    let fx = fixture().await;
    let review = fx.review("Tokyo Godfathers").await;
    let user = fx.user().await;

    assert!(matches!(
        fx.tracker.like(user, review + 50).await,
        Err(StoreError::NotFound(_))
    ));
    assert!(matches!(
        fx.tracker.dislike(user, review + 50).await,
        Err(StoreError::NotFound(_))
    ));

    fx.reviews.soft_delete(review).await.unwrap();
    assert!(matches!(
        fx.tracker.like(user, review).await,
        Err(StoreError::NotFound(_))
    ));
    assert!(matches!(
        fx.tracker.dislike(user, review).await,
        Err(StoreError::NotFound(_))
    ));
    assert_eq!(fx.tracker.state(user, review).await.unwrap(), EngagementState::NoAction);
}

#[tokio::test]
async fn test_liked_list_skips_dislikes_and_deleted_reviews() {
    let fx = fixture().await;
    let kept = fx.review("Spirited Away").await;
    let hidden = fx.review("Porco Rosso").await;
    let disliked = fx.review("Tales from Earthsea").await;
    let user = fx.user().await;

    fx.tracker.like(user, kept).await.unwrap();
    fx.tracker.like(user, hidden).await.unwrap();
    fx.tracker.dislike(user, disliked).await.unwrap();
    fx.reviews.soft_delete(hidden).await.unwrap();

    let liked = fx.tracker.list_liked(user).await.unwrap();
    assert_eq!(liked.len(), 1);
    assert_eq!(liked[0].review.review_id, kept);
    assert_eq!(liked[0].review.creator_id, fx.author);

    // Restoring brings the like back.
    fx.reviews.undelete(hidden).await.unwrap();
    assert_eq!(fx.tracker.list_liked(user).await.unwrap().len(), 2);
}
