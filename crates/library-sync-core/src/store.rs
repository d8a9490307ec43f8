use crate::error::StoreError;
use crate::journal::{MutationJournal, Patch};
use crate::notify::{Notification, Notifier, TracingNotifier};
use crate::outcome::MutationOutcome;
use crate::query_cache::{CachePolicy, QueryCache};
use chrono::Utc;
use library_sync_models::{ItemUpdate, LibraryItem, LibraryKey, LibraryRow, RowPatch, SearchResult, WatchStatus};
use library_sync_sources::{AuthUser, IdentityProvider, RemoteLibrary};
use std::sync::Arc;
use tokio::sync::{watch, Mutex};
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};

#[cfg(test)]
mod tests;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MutationKind {
    Add,
    Move,
    Update,
    Remove,
    Clear,
}

impl MutationKind {
    fn name(self) -> &'static str {
        match self {
            MutationKind::Add => "add",
            MutationKind::Move => "move",
            MutationKind::Update => "update",
            MutationKind::Remove => "remove",
            MutationKind::Clear => "clear",
        }
    }

    fn success_message(self) -> &'static str {
        match self {
            MutationKind::Add => "Item added to your library!",
            MutationKind::Move => "Item status updated!",
            MutationKind::Update => "Item updated!",
            MutationKind::Remove => "Item removed from your library",
            MutationKind::Clear => "Library cleared",
        }
    }

    fn failure_message(self, error: &StoreError) -> String {
        let action = match self {
            MutationKind::Add => "add item",
            MutationKind::Move | MutationKind::Update => "update item",
            MutationKind::Remove => "remove item",
            MutationKind::Clear => "clear library",
        };
        format!("Failed to {}: {}", action, error)
    }
}

struct StoreState {
    /// User whose library the cache and journal describe
    owner: Option<String>,
    cache: QueryCache<Vec<LibraryItem>>,
    journal: MutationJournal,
}

impl StoreState {
    /// Point the state at `user_id`, dropping anything cached for another user.
    /// Returns true when the state was reset.
    fn bind(&mut self, user_id: &str) -> bool {
        if self.owner.as_deref() == Some(user_id) {
            return false;
        }
        self.reset();
        self.owner = Some(user_id.to_string());
        true
    }

    fn reset(&mut self) {
        self.owner = None;
        self.cache.remove();
        self.cache.cancel_fetches();
        self.journal.clear();
    }

    fn owned_by(&self, user_id: &str) -> bool {
        self.owner.as_deref() == Some(user_id)
    }
}

/// Optimistic cache of the signed-in user's library.
///
/// Writes show up in `items()` and on the `subscribe()` channel before the
/// remote store confirms them, and are rolled back individually if it
/// refuses. Share one store per session behind an `Arc`.
pub struct LibrarySyncStore {
    remote: Arc<dyn RemoteLibrary>,
    identity: Arc<dyn IdentityProvider>,
    notifier: Arc<dyn Notifier>,
    state: Mutex<StoreState>,
    updates: watch::Sender<Vec<LibraryItem>>,
}

impl LibrarySyncStore {
    pub fn new(remote: Arc<dyn RemoteLibrary>, identity: Arc<dyn IdentityProvider>, policy: CachePolicy) -> Self {
        let (updates, _) = watch::channel(Vec::new());
        Self {
            remote,
            identity,
            notifier: Arc::new(TracingNotifier),
            state: Mutex::new(StoreState {
                owner: None,
                cache: QueryCache::new(policy),
                journal: MutationJournal::new(),
            }),
            updates,
        }
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    /// The list as currently visible, optimistic changes included
    pub fn items(&self) -> Vec<LibraryItem> {
        self.updates.borrow().clone()
    }

    /// Receives every change to the visible list
    pub fn subscribe(&self) -> watch::Receiver<Vec<LibraryItem>> {
        self.updates.subscribe()
    }

    /// Mutations started but not yet confirmed or rolled back
    pub async fn pending_mutations(&self) -> usize {
        self.state.lock().await.journal.pending()
    }

    /// The user's library, served from cache while fresh
    pub async fn load(&self) -> Result<Vec<LibraryItem>, StoreError> {
        self.fetch(false).await
    }

    /// Refetch regardless of freshness
    pub async fn refresh(&self) -> Result<Vec<LibraryItem>, StoreError> {
        self.fetch(true).await
    }

    /// Mark cached data stale so the next `load()` refetches
    pub async fn invalidate(&self) {
        self.state.lock().await.cache.invalidate();
    }

    /// Forget everything cached for the current session
    pub async fn teardown(&self) {
        let mut state = self.state.lock().await;
        state.reset();
        self.publish(Vec::new());
        debug!("library store torn down");
    }

    pub async fn add(&self, candidate: &SearchResult, status: WatchStatus) -> MutationOutcome {
        let item = LibraryItem::from_search_result(candidate, status, Utc::now());
        self.mutate(MutationKind::Add, Patch::Insert(item)).await
    }

    pub async fn add_default(&self, candidate: &SearchResult) -> MutationOutcome {
        self.add(candidate, WatchStatus::default()).await
    }

    /// Change an item's status. Items missing locally are left alone.
    pub async fn move_item(&self, item_id: &str, status: WatchStatus) -> MutationOutcome {
        self.update_item(item_id, ItemUpdate::status(status)).await
    }

    pub async fn update_item(&self, item_id: &str, update: ItemUpdate) -> MutationOutcome {
        let kind = if update.personal_rating.is_none() && update.notes.is_none() {
            MutationKind::Move
        } else {
            MutationKind::Update
        };
        if update.is_empty() {
            return self.reject(kind, StoreError::EmptyUpdate);
        }
        match LibraryKey::from_input(item_id) {
            Ok(id) => self.mutate(kind, Patch::Update { id, update }).await,
            Err(e) => self.reject(kind, e.into()),
        }
    }

    pub async fn remove(&self, item_id: &str) -> MutationOutcome {
        match LibraryKey::from_input(item_id) {
            Ok(id) => self.mutate(MutationKind::Remove, Patch::Remove(id)).await,
            Err(e) => self.reject(MutationKind::Remove, e.into()),
        }
    }

    pub async fn clear_all(&self) -> MutationOutcome {
        self.mutate(MutationKind::Clear, Patch::Clear).await
    }

    fn publish(&self, items: Vec<LibraryItem>) {
        self.updates.send_replace(items);
    }

    async fn require_user(&self) -> Result<AuthUser, StoreError> {
        match self.identity.current_user().await {
            Ok(Some(user)) => Ok(user),
            Ok(None) => Err(StoreError::Unauthenticated),
            Err(e) => Err(StoreError::from_read(e)),
        }
    }

    #[instrument(skip(self), fields(operation = "load"))]
    async fn fetch(&self, force: bool) -> Result<Vec<LibraryItem>, StoreError> {
        let user = self.require_user().await?;

        let (generation, watermark) = {
            let mut state = self.state.lock().await;
            if state.bind(&user.id) {
                self.publish(Vec::new());
            }
            let now = Instant::now();
            state.cache.collect_garbage(now);
            if !force && state.cache.is_fresh(&user.id, now) {
                if let Some(items) = state.cache.get(&user.id, now) {
                    debug!("serving library from cache");
                    return Ok(items.clone());
                }
            }
            (state.cache.generation(), state.journal.commit_watermark())
        };

        debug!(generation, source = self.remote.source_name(), "fetching library");
        let fetched = self.remote.select_ordered(&user).await;

        let mut state = self.state.lock().await;
        let rows = match fetched {
            Ok(rows) => rows,
            Err(e) => {
                let error = StoreError::from_read(e);
                warn!(error = %error, "library fetch failed");
                return Err(error);
            }
        };

        if !state.owned_by(&user.id) || state.cache.generation() != generation {
            debug!(generation, "discarding superseded fetch");
            return Ok(self.items());
        }

        state.journal.settle_through(watermark);
        let items = state
            .journal
            .rebase(rows.into_iter().map(LibraryRow::into_item).collect());
        state.cache.set_fetched(&user.id, items.clone(), Instant::now());
        self.publish(items.clone());
        info!(count = items.len(), "library loaded");
        Ok(items)
    }

    fn reject(&self, kind: MutationKind, error: StoreError) -> MutationOutcome {
        warn!(operation = kind.name(), error = %error, "mutation rejected");
        self.notifier.notify(Notification::failure(kind.failure_message(&error)));
        MutationOutcome::rejected(error)
    }

    /// Optimistic apply, remote commit, then reconcile
    #[instrument(skip(self, patch), fields(operation = kind.name()))]
    async fn mutate(&self, kind: MutationKind, patch: Patch) -> MutationOutcome {
        let user = match self.require_user().await {
            Ok(user) => user,
            Err(e) => return self.reject(kind, e),
        };

        let seq = {
            let mut state = self.state.lock().await;
            state.bind(&user.id);
            let generation = state.cache.cancel_fetches();
            let snapshot = state.cache.peek(&user.id).cloned();
            let mut next = snapshot.clone().unwrap_or_default();
            patch.apply(&mut next);
            state.cache.set_local(&user.id, next.clone(), Instant::now());
            self.publish(next);
            let seq = state.journal.begin(patch.clone(), snapshot);
            debug!(seq, generation, item_id = patch_target(&patch), "applied optimistically");
            seq
        };

        let result = self.commit(&user, &patch).await;

        let mut state = self.state.lock().await;
        if !state.owned_by(&user.id) {
            // Session changed while the write was in flight
            return match result {
                Ok(()) => MutationOutcome::committed(),
                Err(e) if e.is_benign() => MutationOutcome::already_satisfied(),
                Err(e) => MutationOutcome::rolled_back(e),
            };
        }

        match result {
            Ok(()) => {
                state.journal.commit(seq);
                state.cache.invalidate();
                info!(seq, "mutation committed");
                self.notifier.notify(Notification::success(kind.success_message()));
                MutationOutcome::committed()
            }
            Err(e) if e.is_benign() => {
                state.journal.commit(seq);
                state.cache.invalidate();
                debug!(seq, "remote row already gone");
                MutationOutcome::already_satisfied()
            }
            Err(e) => {
                state.cache.cancel_fetches();
                match state.journal.rollback(seq) {
                    Some(restored) => {
                        state.cache.set_local(&user.id, restored.clone(), Instant::now());
                        self.publish(restored);
                    }
                    None => {
                        state.cache.remove();
                        self.publish(Vec::new());
                    }
                }
                state.cache.invalidate();
                warn!(seq, error = %e, "mutation rolled back");
                self.notifier.notify(Notification::failure(kind.failure_message(&e)));
                MutationOutcome::rolled_back(e)
            }
        }
    }

    async fn commit(&self, user: &AuthUser, patch: &Patch) -> Result<(), StoreError> {
        let now = Utc::now();
        let result = match patch {
            Patch::Insert(item) => self.remote.insert(&LibraryRow::from_item(&user.id, item, now)).await,
            Patch::Update { id, update } => {
                let (media_type, media_id) = id.parts()?;
                self.remote
                    .update(user, media_type, media_id, &RowPatch::new(update, now))
                    .await
            }
            Patch::Remove(id) => {
                let (media_type, media_id) = id.parts()?;
                self.remote.delete(user, media_type, media_id).await
            }
            Patch::Clear => self.remote.delete_all(user).await,
        };
        result.map_err(StoreError::from_write)
    }
}

fn patch_target(patch: &Patch) -> Option<&str> {
    match patch {
        Patch::Insert(item) => Some(item.id.as_str()),
        Patch::Update { id, .. } | Patch::Remove(id) => Some(id.as_str()),
        Patch::Clear => None,
    }
}
