//! Integration tests for the review lifecycle against SQLite.

mod common;

use common::fixtures::{MirrorCall, RecordingMirror, create_user, new_review, seed_catalog};
use common::store::TestStore;
use critique_core::Role;
use critique_store::models::ReviewUpdate;
use critique_store::{
    BestEffortMirror, RestoreOutcome, ReviewStore, SoftDeleteOutcome, StoreError, UpdateOutcome,
};
use std::sync::Arc;
use std::time::Duration;

fn review_store(test: &TestStore, mirror: Arc<RecordingMirror>, max_page_size: u32) -> ReviewStore {
    ReviewStore::new(test.store(), BestEffortMirror::new(mirror), max_page_size)
}

#[tokio::test]
async fn test_create_review_links_genres() {
    let test = TestStore::new().await;
    let store = test.store();
    let catalog = seed_catalog(store.as_ref()).await;
    let user = create_user(store.as_ref(), Role::User).await;
    let mirror = Arc::new(RecordingMirror::default());
    let reviews = review_store(&test, mirror.clone(), 50);

    let genres = vec![catalog.genre_ids[1], catalog.genre_ids[0], catalog.genre_ids[1]];
    let id = reviews
        .create_review(new_review(&catalog, user.id, "Arrival", genres))
        .await
        .unwrap();

    // Duplicates collapse to one link.
    assert_eq!(
        store.review_genre_ids(id).await.unwrap(),
        vec![catalog.genre_ids[0], catalog.genre_ids[1]]
    );

    let detail = reviews.get_one(id).await.unwrap().unwrap();
    assert_eq!(detail.review.title, "Arrival");
    assert_eq!(detail.review.user_id, user.id);
    assert_eq!(detail.review.media_name, "Film");
    assert!(!detail.review.is_blocked);
    assert_eq!(detail.genres.len(), 2);

    assert_eq!(mirror.calls(), vec![MirrorCall::Insert(id)]);
}

#[tokio::test]
async fn test_create_review_with_unknown_genre_writes_nothing() {
    let test = TestStore::new().await;
    let store = test.store();
    let catalog = seed_catalog(store.as_ref()).await;
    let user = create_user(store.as_ref(), Role::User).await;
    let mirror = Arc::new(RecordingMirror::default());
    let reviews = review_store(&test, mirror.clone(), 50);

    let result = reviews
        .create_review(new_review(
            &catalog,
            user.id,
            "Broken",
            vec![catalog.genre_ids[0], 9_999],
        ))
        .await;

    assert!(matches!(result, Err(StoreError::InvalidReference(_))));
    assert_eq!(store.count_reviews().await.unwrap(), 0);
    assert!(mirror.calls().is_empty());
}

#[tokio::test]
async fn test_create_review_with_unknown_media_is_rejected() {
    let test = TestStore::new().await;
    let store = test.store();
    let mut catalog = seed_catalog(store.as_ref()).await;
    let user = create_user(store.as_ref(), Role::User).await;
    let reviews = review_store(&test, Arc::new(RecordingMirror::default()), 50);

    catalog.media_id = 4_242;
    let result = reviews
        .create_review(new_review(&catalog, user.id, "Nowhere", vec![]))
        .await;

    assert!(matches!(result, Err(StoreError::InvalidReference(_))));
    assert_eq!(store.count_reviews().await.unwrap(), 0);
}

#[tokio::test]
async fn test_update_review_replaces_genre_set() {
    let test = TestStore::new().await;
    let store = test.store();
    let catalog = seed_catalog(store.as_ref()).await;
    let user = create_user(store.as_ref(), Role::User).await;
    let mirror = Arc::new(RecordingMirror::default());
    let reviews = review_store(&test, mirror.clone(), 50);
    let [drama, scifi, comedy] = [catalog.genre_ids[0], catalog.genre_ids[1], catalog.genre_ids[2]];

    let id = reviews
        .create_review(new_review(&catalog, user.id, "Alien", vec![drama, scifi]))
        .await
        .unwrap();

    let outcome = reviews
        .update_review(
            id,
            ReviewUpdate {
                title: "Aliens".to_string(),
                description: "Louder this time".to_string(),
                genre_ids: vec![scifi, comedy],
            },
        )
        .await
        .unwrap();
    assert_eq!(outcome, UpdateOutcome::Updated);
    assert_eq!(store.review_genre_ids(id).await.unwrap(), vec![scifi, comedy]);

    let detail = reviews.get_one(id).await.unwrap().unwrap();
    assert_eq!(detail.review.title, "Aliens");
    assert_eq!(detail.review.description, "Louder this time");

    // An empty set clears every association.
    reviews
        .update_review(
            id,
            ReviewUpdate {
                title: "Aliens".to_string(),
                description: "Louder this time".to_string(),
                genre_ids: vec![],
            },
        )
        .await
        .unwrap();
    assert!(store.review_genre_ids(id).await.unwrap().is_empty());

    assert_eq!(
        mirror.calls(),
        vec![
            MirrorCall::Insert(id),
            MirrorCall::Update(id, "Aliens".to_string()),
            MirrorCall::Update(id, "Aliens".to_string()),
        ]
    );
}

#[tokio::test]
async fn test_update_review_with_unknown_genre_keeps_previous_state() {
    let test = TestStore::new().await;
    let store = test.store();
    let catalog = seed_catalog(store.as_ref()).await;
    let user = create_user(store.as_ref(), Role::User).await;
    let reviews = review_store(&test, Arc::new(RecordingMirror::default()), 50);

    let id = reviews
        .create_review(new_review(&catalog, user.id, "Heat", vec![catalog.genre_ids[0]]))
        .await
        .unwrap();

    let result = reviews
        .update_review(
            id,
            ReviewUpdate {
                title: "Heat (1995)".to_string(),
                description: "Changed".to_string(),
                genre_ids: vec![catalog.genre_ids[1], 9_999],
            },
        )
        .await;
    assert!(matches!(result, Err(StoreError::InvalidReference(_))));

    let detail = reviews.get_one(id).await.unwrap().unwrap();
    assert_eq!(detail.review.title, "Heat");
    assert_eq!(
        store.review_genre_ids(id).await.unwrap(),
        vec![catalog.genre_ids[0]]
    );
}

#[tokio::test]
async fn test_update_missing_review() {
    let test = TestStore::new().await;
    let mirror = Arc::new(RecordingMirror::default());
    let reviews = review_store(&test, mirror.clone(), 50);

    let outcome = reviews
        .update_review(
            404,
            ReviewUpdate {
                title: "Ghost".to_string(),
                description: "Nobody home".to_string(),
                genre_ids: vec![],
            },
        )
        .await
        .unwrap();
    assert_eq!(outcome, UpdateOutcome::NotFound);
    assert!(mirror.calls().is_empty());
}

#[tokio::test]
async fn test_soft_delete_is_idempotent() {
    let test = TestStore::new().await;
    let store = test.store();
    let catalog = seed_catalog(store.as_ref()).await;
    let user = create_user(store.as_ref(), Role::User).await;
    let mirror = Arc::new(RecordingMirror::default());
    let reviews = review_store(&test, mirror.clone(), 50);

    let id = reviews
        .create_review(new_review(&catalog, user.id, "Tenet", vec![]))
        .await
        .unwrap();

    assert_eq!(reviews.soft_delete(id).await.unwrap(), SoftDeleteOutcome::Deleted);
    assert_eq!(
        reviews.soft_delete(id).await.unwrap(),
        SoftDeleteOutcome::AlreadyDeleted
    );
    assert_eq!(
        reviews.soft_delete(id + 100).await.unwrap(),
        SoftDeleteOutcome::NotFound
    );

    // Soft-deleted reviews stay readable by id and show up in the deleted list.
    let detail = reviews.get_one(id).await.unwrap().unwrap();
    assert!(detail.review.is_blocked);
    let deleted = reviews.list_deleted().await.unwrap();
    assert_eq!(deleted.len(), 1);
    assert_eq!(deleted[0].review.id, id);
    assert!(reviews.list_active(10, 0).await.unwrap().is_empty());

    assert_eq!(reviews.undelete(id).await.unwrap(), RestoreOutcome::Restored);
    assert_eq!(reviews.undelete(id).await.unwrap(), RestoreOutcome::NotDeleted);
    assert_eq!(
        reviews.undelete(id + 100).await.unwrap(),
        RestoreOutcome::NotFound
    );
    assert_eq!(reviews.list_active(10, 0).await.unwrap().len(), 1);

    assert_eq!(
        mirror.calls(),
        vec![
            MirrorCall::Insert(id),
            MirrorCall::SetDeleted(id, true),
            MirrorCall::SetDeleted(id, false),
        ]
    );
}

#[tokio::test]
async fn test_mirror_failures_do_not_affect_primary() {
    let test = TestStore::new().await;
    let store = test.store();
    let catalog = seed_catalog(store.as_ref()).await;
    let user = create_user(store.as_ref(), Role::User).await;
    let mirror = Arc::new(RecordingMirror::failing());
    let reviews = review_store(&test, mirror.clone(), 50);

    let id = reviews
        .create_review(new_review(&catalog, user.id, "Solaris", vec![catalog.genre_ids[1]]))
        .await
        .unwrap();
    assert!(reviews.get_one(id).await.unwrap().is_some());

    let outcome = reviews
        .update_review(
            id,
            ReviewUpdate {
                title: "Solaris (1972)".to_string(),
                description: "Slow and strange".to_string(),
                genre_ids: vec![catalog.genre_ids[0]],
            },
        )
        .await
        .unwrap();
    assert_eq!(outcome, UpdateOutcome::Updated);
    assert_eq!(reviews.soft_delete(id).await.unwrap(), SoftDeleteOutcome::Deleted);

    let detail = reviews.get_one(id).await.unwrap().unwrap();
    assert_eq!(detail.review.title, "Solaris (1972)");
    assert!(detail.review.is_blocked);
    // Every write was attempted on the mirror.
    assert_eq!(mirror.calls().len(), 3);
}

#[tokio::test]
async fn test_hung_mirror_does_not_block_writes() {
    let test = TestStore::new().await;
    let store = test.store();
    let catalog = seed_catalog(store.as_ref()).await;
    let user = create_user(store.as_ref(), Role::User).await;
    let mirror = Arc::new(RecordingMirror::hanging());
    let reviews = ReviewStore::new(
        test.store(),
        BestEffortMirror::new(mirror.clone()).with_timeout(Duration::from_millis(50)),
        50,
    );

    let bound = Duration::from_secs(5);
    let id = tokio::time::timeout(
        bound,
        reviews.create_review(new_review(&catalog, user.id, "Stalker", vec![])),
    )
    .await
    .expect("create_review waited on the mirror")
    .unwrap();

    let update = ReviewUpdate {
        title: "Stalker (1979)".to_string(),
        description: "The Zone".to_string(),
        genre_ids: vec![catalog.genre_ids[0]],
    };
    let outcome = tokio::time::timeout(bound, reviews.update_review(id, update))
        .await
        .expect("update_review waited on the mirror")
        .unwrap();
    assert_eq!(outcome, UpdateOutcome::Updated);

    let deleted = tokio::time::timeout(bound, reviews.soft_delete(id))
        .await
        .expect("soft_delete waited on the mirror")
        .unwrap();
    assert_eq!(deleted, SoftDeleteOutcome::Deleted);
    let restored = tokio::time::timeout(bound, reviews.undelete(id))
        .await
        .expect("undelete waited on the mirror")
        .unwrap();
    assert_eq!(restored, RestoreOutcome::Restored);

    let detail = reviews.get_one(id).await.unwrap().unwrap();
    assert_eq!(detail.review.title, "Stalker (1979)");
    assert!(!detail.review.is_blocked);
    assert_eq!(mirror.calls().len(), 4);
}

#[tokio::test]
async fn test_search_by_title() {
    let test = TestStore::new().await;
    let store = test.store();
    let catalog = seed_catalog(store.as_ref()).await;
    let user = create_user(store.as_ref(), Role::User).await;
    let reviews = review_store(&test, Arc::new(RecordingMirror::default()), 50);

    let dune = reviews
        .create_review(new_review(&catalog, user.id, "Dune Part Two", vec![]))
        .await
        .unwrap();
    let old_dune = reviews
        .create_review(new_review(&catalog, user.id, "Dune (1984)", vec![]))
        .await
        .unwrap();
    reviews
        .create_review(new_review(&catalog, user.id, "Blade Runner", vec![]))
        .await
        .unwrap();
    reviews.soft_delete(old_dune).await.unwrap();

    let found = reviews.search_by_title("dune").await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].review.id, dune);

    let umlaut = reviews
        .create_review(new_review(&catalog, user.id, "Ärger im Paradies", vec![]))
        .await
        .unwrap();
    for pattern in ["Ärger", "ärger", "ÄRGER IM"] {
        let found = reviews.search_by_title(pattern).await.unwrap();
        assert_eq!(found.len(), 1, "pattern {pattern}");
        assert_eq!(found[0].review.id, umlaut);
    }

    assert!(reviews.search_by_title("nothing").await.unwrap().is_empty());
    // LIKE wildcards in the pattern match literally.
    assert!(reviews.search_by_title("%").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_list_active_pagination() {
    let test = TestStore::new().await;
    let store = test.store();
    let catalog = seed_catalog(store.as_ref()).await;
    let user = create_user(store.as_ref(), Role::User).await;
    let reviews = review_store(&test, Arc::new(RecordingMirror::default()), 2);

    let mut ids = Vec::new();
    for title in ["One", "Two", "Three"] {
        ids.push(
            reviews
                .create_review(new_review(&catalog, user.id, title, vec![]))
                .await
                .unwrap(),
        );
    }

    // Requests above the configured page size are clamped.
    let first = reviews.list_active(100, 0).await.unwrap();
    assert_eq!(
        first.iter().map(|d| d.review.id).collect::<Vec<_>>(),
        vec![ids[0], ids[1]]
    );
    let rest = reviews.list_active(2, 2).await.unwrap();
    assert_eq!(rest.len(), 1);
    assert_eq!(rest[0].review.id, ids[2]);
    assert!(reviews.list_active(2, 10).await.unwrap().is_empty());
    assert!(reviews.list_active(0, 0).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_owner_and_tally_of_missing_review() {
    let test = TestStore::new().await;
    let store = test.store();
    let catalog = seed_catalog(store.as_ref()).await;
    let user = create_user(store.as_ref(), Role::User).await;
    let reviews = review_store(&test, Arc::new(RecordingMirror::default()), 50);

    let id = reviews
        .create_review(new_review(&catalog, user.id, "Stalker", vec![]))
        .await
        .unwrap();

    assert_eq!(reviews.owner_of(id).await.unwrap(), Some(user.id));
    assert_eq!(reviews.owner_of(id + 1).await.unwrap(), None);

    let tally = reviews.tally(id).await.unwrap().unwrap();
    assert_eq!((tally.likes, tally.dislikes), (0, 0));
    assert!(reviews.tally(id + 1).await.unwrap().is_none());
}
