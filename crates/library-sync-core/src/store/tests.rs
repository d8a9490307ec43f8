use super::*;
use crate::notify::NotificationKind;
use chrono::{DateTime, Duration as ChronoDuration, TimeZone};
use library_sync_models::{derive_id, MediaType};
use library_sync_sources::{InMemoryLibrary, RemoteOp};
use std::collections::BTreeSet;
use std::sync::Mutex as StdMutex;
use std::time::Duration;

#[derive(Default)]
struct RecordingNotifier {
    seen: StdMutex<Vec<Notification>>,
}

impl RecordingNotifier {
    fn messages(&self) -> Vec<String> {
        self.seen.lock().unwrap().iter().map(|n| n.message.clone()).collect()
    }

    fn failures(&self) -> usize {
        self.seen
            .lock()
            .unwrap()
            .iter()
            .filter(|n| n.kind == NotificationKind::Failure)
            .count()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notification: Notification) {
        self.seen.lock().unwrap().push(notification);
    }
}

struct Harness {
    remote: Arc<InMemoryLibrary>,
    notifier: Arc<RecordingNotifier>,
    store: LibrarySyncStore,
}

fn harness() -> Harness {
    let remote = Arc::new(InMemoryLibrary::with_user("alice"));
    let notifier = Arc::new(RecordingNotifier::default());
    let store = LibrarySyncStore::new(remote.clone(), remote.clone(), CachePolicy::default())
        .with_notifier(notifier.clone());
    Harness { remote, notifier, store }
}

fn matrix() -> SearchResult {
    SearchResult {
        id: 603,
        title: Some("The Matrix".to_string()),
        name: None,
        poster_path: Some("/p.jpg".to_string()),
        vote_average: 8.2,
        release_date: None,
        first_air_date: None,
        media_type: MediaType::Movie,
        overview: None,
    }
}

fn series(id: u64, name: &str) -> SearchResult {
    SearchResult {
        id,
        title: None,
        name: Some(name.to_string()),
        poster_path: Some(format!("/{}.jpg", id)),
        vote_average: 8.0,
        release_date: None,
        first_air_date: Some("2008-01-20".to_string()),
        media_type: MediaType::Tv,
        overview: None,
    }
}

fn added(day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, day, 12, 0, 0).unwrap()
}

fn row(user_id: &str, media_id: u64, title: &str, added_at: DateTime<Utc>) -> LibraryRow {
    LibraryRow {
        user_id: user_id.to_string(),
        media_id,
        media_type: MediaType::Movie,
        title: Some(title.to_string()),
        name: None,
        poster_path: Some("/poster.jpg".to_string()),
        vote_average: 7.5,
        release_date: Some("2010-07-16".to_string()),
        first_air_date: None,
        status: WatchStatus::ToWatch,
        added_at,
        updated_at: added_at,
        personal_rating: None,
        notes: None,
    }
}

fn ids(items: &[LibraryItem]) -> Vec<String> {
    items.iter().map(|i| i.id.to_string()).collect()
}

fn remote_ids(remote: &InMemoryLibrary, user_id: &str) -> BTreeSet<String> {
    remote
        .rows_for(user_id)
        .into_iter()
        .map(|r| derive_id(r.media_type, r.media_id).to_string())
        .collect()
}

/// Alice's library holding Inception (newest) and Heat
async fn seeded() -> Harness {
    let h = harness();
    h.remote.seed(row("alice", 27205, "Inception", added(2)));
    h.remote.seed(row("alice", 949, "Heat", added(1)));
    h.store.load().await.unwrap();
    h
}

#[tokio::test]
async fn test_add_move_remove_scenario() {
    let h = harness();
    assert!(h.store.load().await.unwrap().is_empty());

    let outcome = h.store.add(&matrix(), WatchStatus::ToWatch).await;
    assert!(outcome.committed);
    let items = h.store.items();
    assert_eq!(ids(&items), vec!["movie-603"]);
    assert_eq!(items[0].status, WatchStatus::ToWatch);
    assert_eq!(items[0].title.as_deref(), Some("The Matrix"));

    let outcome = h.store.move_item("movie-603", WatchStatus::Watching).await;
    assert!(outcome.committed);
    let items = h.store.items();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].status, WatchStatus::Watching);

    let outcome = h.store.remove("movie-603").await;
    assert!(outcome.committed);
    assert!(h.store.items().is_empty());

    h.store.add(&matrix(), WatchStatus::ToWatch).await;
    let outcome = h.store.add(&matrix(), WatchStatus::ToWatch).await;
    assert_eq!(outcome.error, Some(StoreError::DuplicateItem));
    assert_eq!(ids(&h.store.items()), vec!["movie-603"]);

    assert_eq!(
        h.notifier.messages(),
        vec![
            "Item added to your library!",
            "Item status updated!",
            "Item removed from your library",
            "Item added to your library!",
            "Failed to add item: This item is already in your library",
        ]
    );
}

#[tokio::test]
async fn test_duplicate_add_leaves_single_item() {
    let h = harness();
    h.store.load().await.unwrap();
    h.store.add_default(&matrix()).await;
    let before = h.store.items();

    let outcome = h.store.add(&matrix(), WatchStatus::Watched).await;
    assert!(outcome.rolled_back);
    assert_eq!(outcome.into_result(), Err(StoreError::DuplicateItem));
    assert_eq!(h.store.items(), before);
    assert_eq!(h.remote.rows_for("alice").len(), 1);

    let refreshed = h.store.refresh().await.unwrap();
    assert_eq!(ids(&refreshed), vec!["movie-603"]);
    assert_eq!(refreshed[0].status, WatchStatus::ToWatch);
}

#[tokio::test]
async fn test_failed_add_restores_prior_state() {
    let h = seeded().await;
    let before = h.store.items();

    h.remote.fail_next(RemoteOp::Insert);
    let outcome = h.store.add(&matrix(), WatchStatus::ToWatch).await;

    assert!(outcome.applied_optimistically);
    assert!(outcome.rolled_back);
    assert!(matches!(outcome.error, Some(StoreError::RemoteFailure(_))));
    assert_eq!(h.store.items(), before);
    assert_eq!(h.notifier.failures(), 1);
    assert!(h.notifier.messages()[0].starts_with("Failed to add item: Database error"));
}

#[tokio::test]
async fn test_failed_move_restores_prior_state() {
    let h = seeded().await;
    let before = h.store.items();

    h.remote.fail_next(RemoteOp::Update);
    let outcome = h.store.move_item("movie-949", WatchStatus::Watched).await;

    assert!(outcome.rolled_back);
    assert_eq!(h.store.items(), before);
    assert_eq!(h.remote.rows_for("alice")[1].status, WatchStatus::ToWatch);
}

#[tokio::test]
async fn test_failed_remove_restores_prior_state() {
    let h = seeded().await;
    let before = h.store.items();

    h.remote.fail_next(RemoteOp::Delete);
    let outcome = h.store.remove("movie-27205").await;

    assert!(outcome.rolled_back);
    assert_eq!(h.store.items(), before);
    assert_eq!(
        h.notifier.messages(),
        vec!["Failed to remove item: Database error: Request failed with status 500: injected failure"]
    );
}

#[tokio::test]
async fn test_failed_clear_restores_prior_state() {
    let h = seeded().await;
    let before = h.store.items();

    h.remote.fail_next(RemoteOp::DeleteAll);
    let outcome = h.store.clear_all().await;

    assert!(outcome.rolled_back);
    assert_eq!(h.store.items(), before);
    assert_eq!(h.remote.rows_for("alice").len(), 2);
}

#[tokio::test]
async fn test_clear_all_empties_only_current_user() {
    let h = seeded().await;
    h.remote.seed(row("bob", 13, "Forrest Gump", added(3)));

    let outcome = h.store.clear_all().await;
    assert!(outcome.committed);
    assert!(h.store.items().is_empty());
    assert!(h.remote.rows_for("alice").is_empty());
    assert_eq!(h.remote.rows_for("bob").len(), 1);
    assert_eq!(h.notifier.messages(), vec!["Library cleared"]);
}

#[tokio::test]
async fn test_refresh_converges_with_remote() {
    let h = seeded().await;
    h.store.add(&series(1396, "Breaking Bad"), WatchStatus::Watching).await;
    h.store.remove("movie-949").await;
    h.store
        .update_item(
            "movie-27205",
            ItemUpdate {
                personal_rating: Some(9.0),
                notes: Some("rewatch".to_string()),
                ..ItemUpdate::default()
            },
        )
        .await;

    let local: BTreeSet<String> = ids(&h.store.refresh().await.unwrap()).into_iter().collect();
    assert_eq!(local, remote_ids(&h.remote, "alice"));

    let inception = h
        .store
        .items()
        .into_iter()
        .find(|i| i.id == "movie-27205")
        .unwrap();
    assert_eq!(inception.personal_rating, Some(9.0));
    assert_eq!(inception.notes.as_deref(), Some("rewatch"));
}

#[tokio::test]
async fn test_malformed_item_id_rejected_before_remote() {
    let h = seeded().await;
    let before = h.store.items();
    let outcome = h.store.move_item("movie-abc", WatchStatus::Watched).await;
    assert!(!outcome.applied_optimistically);
    assert!(matches!(outcome.error, Some(StoreError::InvalidItemId(_))));
    assert_eq!(h.store.items(), before);
    assert_eq!(h.notifier.failures(), 1);
}

#[tokio::test]
async fn test_empty_update_rejected_before_remote() {
    let h = seeded().await;
    let before = h.remote.rows_for("alice");
    let outcome = h.store.update_item("movie-27205", ItemUpdate::default()).await;
    assert!(!outcome.applied_optimistically);
    assert_eq!(outcome.error, Some(StoreError::EmptyUpdate));
    assert_eq!(h.remote.rows_for("alice"), before);
    assert_eq!(h.notifier.failures(), 1);
}

#[tokio::test]
async fn test_failed_remove_keeps_concurrent_add() {
    let h = seeded().await;
    let y = derive_id(MediaType::Movie, 949);
    let x = derive_id(MediaType::Movie, 603);

    h.remote.fail_next(RemoteOp::Delete);
    h.remote.hold_writes();

    let matrix_item = matrix();
    let (removed, added, _) = tokio::join!(h.store.remove(y.as_str()), h.store.add_default(&matrix_item), async {
        let mut rx = h.store.subscribe();
        let _ = rx
            .wait_for(|items| items.iter().any(|i| i.id == x) && !items.iter().any(|i| i.id == y))
            .await;
        h.remote.release_writes(2);
    });

    assert!(removed.rolled_back);
    assert!(added.committed);
    let items = h.store.items();
    assert!(items.iter().any(|i| i.id == x));
    assert!(items.iter().any(|i| i.id == y));

    let refreshed = h.store.refresh().await.unwrap();
    assert_eq!(ids(&refreshed), vec!["movie-603", "movie-27205", "movie-949"]);
}

#[tokio::test]
async fn test_failed_add_then_failed_remove_restore_prior_state() {
    let h = seeded().await;
    let y = derive_id(MediaType::Movie, 949);
    let x = derive_id(MediaType::Movie, 603);

    h.remote.fail_next(RemoteOp::Insert);
    h.remote.fail_next(RemoteOp::Delete);
    h.remote.hold_writes();

    let matrix_item = matrix();
    let (added, removed, _) = tokio::join!(h.store.add_default(&matrix_item), h.store.remove(y.as_str()), async {
        let mut rx = h.store.subscribe();
        let _ = rx
            .wait_for(|items| items.iter().any(|i| i.id == x) && !items.iter().any(|i| i.id == y))
            .await;
        // The add was first to wait, so it fails first
        h.remote.release_writes(1);
        let _ = rx.wait_for(|items| !items.iter().any(|i| i.id == x)).await;
        h.remote.release_writes(1);
    });

    assert!(added.rolled_back);
    assert!(removed.rolled_back);
    assert_eq!(ids(&h.store.items()), vec!["movie-27205", "movie-949"]);
    assert_eq!(h.notifier.failures(), 2);
}

#[tokio::test]
async fn test_failed_remove_started_after_add_keeps_it() {
    let h = seeded().await;
    let y = derive_id(MediaType::Movie, 949);
    let x = derive_id(MediaType::Movie, 603);

    h.remote.fail_next(RemoteOp::Delete);
    h.remote.hold_writes();

    let matrix_item = matrix();
    let (added, removed, _) = tokio::join!(h.store.add_default(&matrix_item), h.store.remove(y.as_str()), async {
        let mut rx = h.store.subscribe();
        let _ = rx
            .wait_for(|items| items.iter().any(|i| i.id == x) && !items.iter().any(|i| i.id == y))
            .await;
        h.remote.release_writes(2);
    });

    assert!(added.committed);
    assert!(removed.rolled_back);
    let items = h.store.items();
    assert_eq!(ids(&items), vec!["movie-603", "movie-27205", "movie-949"]);
}

#[tokio::test(start_paused = true)]
async fn test_load_served_from_cache_while_fresh() {
    let h = seeded().await;
    assert_eq!(h.remote.select_calls(), 1);

    tokio::time::advance(Duration::from_secs(240)).await;
    h.store.load().await.unwrap();
    assert_eq!(h.remote.select_calls(), 1);

    tokio::time::advance(Duration::from_secs(61)).await;
    h.store.load().await.unwrap();
    assert_eq!(h.remote.select_calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_invalidate_forces_refetch() {
    let h = seeded().await;
    h.store.invalidate().await;
    h.store.load().await.unwrap();
    assert_eq!(h.remote.select_calls(), 2);

    h.store.move_item("movie-949", WatchStatus::OnHold).await;
    let items = h.store.load().await.unwrap();
    assert_eq!(h.remote.select_calls(), 3);
    assert_eq!(items[1].status, WatchStatus::OnHold);
}

#[tokio::test]
async fn test_fetch_failure_keeps_previous_items() {
    let h = seeded().await;
    let before = h.store.items();

    h.remote.fail_next(RemoteOp::Select);
    let result = h.store.refresh().await;

    assert!(matches!(result, Err(StoreError::StoreUnavailable(_))));
    assert_eq!(h.store.items(), before);
    assert_eq!(*h.store.subscribe().borrow(), before);
}

#[tokio::test]
async fn test_signed_out_writes_are_rejected() {
    let h = harness();
    h.remote.sign_out();

    assert_eq!(h.store.load().await, Err(StoreError::Unauthenticated));

    let outcome = h.store.add_default(&matrix()).await;
    assert!(!outcome.applied_optimistically);
    assert_eq!(outcome.error, Some(StoreError::Unauthenticated));
    assert!(h.store.items().is_empty());
    assert_eq!(
        h.notifier.messages(),
        vec!["Failed to add item: You need to be signed in to do that"]
    );
}

#[tokio::test]
async fn test_remove_of_missing_remote_row_is_benign() {
    let h = seeded().await;
    let alice = AuthUser::new("alice");
    h.remote.delete(&alice, MediaType::Movie, 949).await.unwrap();

    let outcome = h.store.remove("movie-949").await;

    assert_eq!(outcome.error, Some(StoreError::NotFound));
    assert!(outcome.is_ok());
    assert!(!outcome.rolled_back);
    assert_eq!(ids(&h.store.items()), vec!["movie-27205"]);
    assert!(h.notifier.messages().is_empty());
}

#[tokio::test]
async fn test_move_of_unknown_item_leaves_cache_untouched() {
    let h = seeded().await;
    let before = h.store.items();

    let outcome = h.store.move_item("tv-1396", WatchStatus::Watched).await;

    assert!(outcome.is_ok());
    assert_eq!(h.store.items(), before);
    assert!(h.notifier.messages().is_empty());
}

#[tokio::test]
async fn test_superseded_fetch_is_discarded() {
    let h = harness();
    h.remote.seed(row("alice", 27205, "Inception", added(2)));
    h.remote.hold_reads();

    let (loaded, outcome) = tokio::join!(h.store.load(), async {
        // The held read has already captured the remote rows
        tokio::task::yield_now().await;
        let outcome = h.store.add_default(&matrix()).await;
        h.remote.release_reads(1);
        outcome
    });

    assert!(outcome.committed);
    assert_eq!(ids(&loaded.unwrap()), vec!["movie-603"]);
    assert_eq!(ids(&h.store.items()), vec!["movie-603"]);

    h.remote.release_reads(1);
    let refreshed = h.store.load().await.unwrap();
    let refreshed_ids: BTreeSet<String> = ids(&refreshed).into_iter().collect();
    assert_eq!(refreshed_ids, remote_ids(&h.remote, "alice"));
}

#[tokio::test]
async fn test_fetch_during_pending_write_keeps_optimistic_item() {
    let h = seeded().await;
    h.remote.hold_writes();

    let matrix_item = matrix();
    let (outcome, loaded) = tokio::join!(h.store.add_default(&matrix_item), async {
        let loaded = h.store.refresh().await;
        h.remote.release_writes(1);
        loaded
    });

    assert!(outcome.committed);
    assert_eq!(ids(&loaded.unwrap()), vec!["movie-603", "movie-27205", "movie-949"]);
    assert_eq!(h.store.pending_mutations().await, 0);
}

#[tokio::test]
async fn test_session_switch_drops_previous_user_data() {
    let h = seeded().await;
    h.remote.seed(row("bob", 13, "Forrest Gump", added(3) + ChronoDuration::hours(1)));

    h.remote.sign_in_as("bob");
    let items = h.store.load().await.unwrap();
    assert_eq!(ids(&items), vec!["movie-13"]);
}

#[tokio::test]
async fn test_teardown_clears_visible_items() {
    let h = seeded().await;
    let mut rx = h.store.subscribe();

    h.store.teardown().await;

    assert!(h.store.items().is_empty());
    assert!(rx.has_changed().unwrap());
    assert!(rx.borrow_and_update().is_empty());

    h.store.load().await.unwrap();
    assert_eq!(h.remote.select_calls(), 2);
}

#[tokio::test]
async fn test_update_with_rating_uses_generic_message() {
    let h = seeded().await;
    let update = ItemUpdate {
        personal_rating: Some(8.5),
        ..ItemUpdate::default()
    };

    let outcome = h.store.update_item("movie-949", update).await;

    assert!(outcome.committed);
    assert_eq!(h.notifier.messages(), vec!["Item updated!"]);
    assert_eq!(h.remote.rows_for("alice")[1].personal_rating, Some(8.5));
}
