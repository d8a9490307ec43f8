//! In-process stand-in for the remote library table.
//!
//! Enforces the same rules as the hosted table: one row per
//! `(user_id, media_type, media_id)`, user-scoped statements and
//! `added_at DESC` ordering. Tests can inject failures and hold reads or
//! writes behind a gate to exercise interleavings.

use crate::error::SourceError;
use crate::traits::{AuthUser, IdentityProvider, RemoteLibrary};
use async_trait::async_trait;
use library_sync_models::{LibraryRow, MediaType, RowPatch};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::Semaphore;

/// Statement kinds that failures can be injected into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteOp {
    Select,
    Insert,
    Update,
    Delete,
    DeleteAll,
}

#[derive(Default)]
struct MemoryState {
    rows: Vec<LibraryRow>,
    user: Option<AuthUser>,
    failures: VecDeque<(RemoteOp, String)>,
}

/// Holds statements until permits are released
#[derive(Default)]
struct Gates {
    reads: Option<Arc<Semaphore>>,
    writes: Option<Arc<Semaphore>>,
}

#[derive(Default)]
pub struct InMemoryLibrary {
    state: Mutex<MemoryState>,
    gates: Mutex<Gates>,
    select_calls: AtomicUsize,
}

impl InMemoryLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(user_id: &str) -> Self {
        let library = Self::new();
        library.sign_in_as(user_id);
        library
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn gates(&self) -> MutexGuard<'_, Gates> {
        self.gates.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn sign_in_as(&self, user_id: &str) {
        self.state().user = Some(AuthUser::new(user_id));
    }

    pub fn sign_out(&self) {
        self.state().user = None;
    }

    /// Insert a row directly, bypassing uniqueness checks
    pub fn seed(&self, row: LibraryRow) {
        self.state().rows.push(row);
    }

    /// Rows visible to `user_id`, most recently added first
    pub fn rows_for(&self, user_id: &str) -> Vec<LibraryRow> {
        let mut rows: Vec<LibraryRow> = self
            .state()
            .rows
            .iter()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.added_at.cmp(&a.added_at));
        rows
    }

    pub fn select_calls(&self) -> usize {
        self.select_calls.load(Ordering::SeqCst)
    }

    /// Make the next `op` statement fail with a server error
    pub fn fail_next(&self, op: RemoteOp) {
        self.state()
            .failures
            .push_back((op, "injected failure".to_string()));
    }

    pub fn hold_reads(&self) {
        self.gates().reads = Some(Arc::new(Semaphore::new(0)));
    }

    pub fn hold_writes(&self) {
        self.gates().writes = Some(Arc::new(Semaphore::new(0)));
    }

    pub fn release_reads(&self, count: usize) {
        if let Some(ref gate) = self.gates().reads {
            gate.add_permits(count);
        }
    }

    pub fn release_writes(&self, count: usize) {
        if let Some(ref gate) = self.gates().writes {
            gate.add_permits(count);
        }
    }

    async fn pass_gate(&self, write: bool) {
        let gate = {
            let gates = self.gates();
            if write { gates.writes.clone() } else { gates.reads.clone() }
        };
        if let Some(gate) = gate {
            if let Ok(permit) = gate.acquire().await {
                permit.forget();
            }
        }
    }

    fn take_failure(&self, op: RemoteOp) -> Result<(), SourceError> {
        let mut state = self.state();
        if let Some(index) = state.failures.iter().position(|(failing, _)| *failing == op) {
            if let Some((_, message)) = state.failures.remove(index) {
                return Err(SourceError::http(500, message));
            }
        }
        Ok(())
    }

    fn require_owner(&self, user: &AuthUser) -> Result<(), SourceError> {
        match self.state().user {
            Some(ref current) if current.id == user.id => Ok(()),
            _ => Err(SourceError::Unauthenticated),
        }
    }
}

#[async_trait]
impl IdentityProvider for InMemoryLibrary {
    async fn current_user(&self) -> Result<Option<AuthUser>, SourceError> {
        Ok(self.state().user.clone())
    }
}

#[async_trait]
impl RemoteLibrary for InMemoryLibrary {
    fn source_name(&self) -> &str {
        "memory"
    }

    async fn select_ordered(&self, user: &AuthUser) -> Result<Vec<LibraryRow>, SourceError> {
        self.select_calls.fetch_add(1, Ordering::SeqCst);
        self.require_owner(user)?;
        self.take_failure(RemoteOp::Select)?;
        // Read before waiting so a held read returns data that may be stale by the time it lands
        let rows = self.rows_for(&user.id);
        self.pass_gate(false).await;
        Ok(rows)
    }

    async fn insert(&self, row: &LibraryRow) -> Result<(), SourceError> {
        self.pass_gate(true).await;
        self.require_owner(&AuthUser::new(row.user_id.as_str()))?;
        self.take_failure(RemoteOp::Insert)?;
        let mut state = self.state();
        let exists = state.rows.iter().any(|r| {
            r.user_id == row.user_id && r.media_id == row.media_id && r.media_type == row.media_type
        });
        if exists {
            return Err(SourceError::Duplicate(format!(
                "Key (user_id, media_id, media_type)=({}, {}, {}) already exists.",
                row.user_id, row.media_id, row.media_type
            )));
        }
        state.rows.push(row.clone());
        Ok(())
    }

    async fn update(
        &self,
        user: &AuthUser,
        media_type: MediaType,
        media_id: u64,
        patch: &RowPatch,
    ) -> Result<(), SourceError> {
        self.pass_gate(true).await;
        self.require_owner(user)?;
        self.take_failure(RemoteOp::Update)?;
        let mut state = self.state();
        let row = state
            .rows
            .iter_mut()
            .find(|r| r.user_id == user.id && r.media_id == media_id && r.media_type == media_type)
            .ok_or(SourceError::NotFound)?;
        row.apply(patch);
        Ok(())
    }

    async fn delete(&self, user: &AuthUser, media_type: MediaType, media_id: u64) -> Result<(), SourceError> {
        self.pass_gate(true).await;
        self.require_owner(user)?;
        self.take_failure(RemoteOp::Delete)?;
        let mut state = self.state();
        let before = state.rows.len();
        state
            .rows
            .retain(|r| !(r.user_id == user.id && r.media_id == media_id && r.media_type == media_type));
        if state.rows.len() == before {
            return Err(SourceError::NotFound);
        }
        Ok(())
    }

    async fn delete_all(&self, user: &AuthUser) -> Result<(), SourceError> {
        self.pass_gate(true).await;
        self.require_owner(user)?;
        self.take_failure(RemoteOp::DeleteAll)?;
        self.state().rows.retain(|r| r.user_id != user.id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use library_sync_models::WatchStatus;

    fn row(user_id: &str, media_id: u64, minutes_ago: i64) -> LibraryRow {
        let added_at = Utc::now() - Duration::minutes(minutes_ago);
        LibraryRow {
            user_id: user_id.to_string(),
            media_id,
            media_type: MediaType::Movie,
            title: Some(format!("Movie {}", media_id)),
            name: None,
            poster_path: None,
            vote_average: 7.0,
            release_date: None,
            first_air_date: None,
            status: WatchStatus::ToWatch,
            added_at,
            updated_at: added_at,
            personal_rating: None,
            notes: None,
        }
    }

    #[tokio::test]
    async fn test_select_is_ordered_and_user_scoped() {
        let library = InMemoryLibrary::with_user("alice");
        library.seed(row("alice", 1, 30));
        library.seed(row("alice", 2, 5));
        library.seed(row("bob", 3, 1));

        let rows = library.select_ordered(&AuthUser::new("alice")).await.unwrap();
        let ids: Vec<u64> = rows.iter().map(|r| r.media_id).collect();
        assert_eq!(ids, vec![2, 1]);
    }

    #[tokio::test]
    async fn test_insert_rejects_duplicates() {
        let library = InMemoryLibrary::with_user("alice");
        library.insert(&row("alice", 1, 0)).await.unwrap();
        let err = library.insert(&row("alice", 1, 0)).await.unwrap_err();
        assert!(matches!(err, SourceError::Duplicate(_)));
        // Another user can hold the same media
        library.sign_in_as("bob");
        library.insert(&row("bob", 1, 0)).await.unwrap();
    }

    #[tokio::test]
    async fn test_update_and_delete_report_missing_rows() {
        let library = InMemoryLibrary::with_user("alice");
        library.seed(row("bob", 7, 0));
        let alice = AuthUser::new("alice");
        let patch = RowPatch::new(&library_sync_models::ItemUpdate::status(WatchStatus::Watched), Utc::now());

        assert!(matches!(library.update(&alice, MediaType::Movie, 7, &patch).await, Err(SourceError::NotFound)));
        assert!(matches!(library.delete(&alice, MediaType::Movie, 7).await, Err(SourceError::NotFound)));
        assert_eq!(library.rows_for("bob").len(), 1);
    }

    #[tokio::test]
    async fn test_injected_failure_fires_once() {
        let library = InMemoryLibrary::with_user("alice");
        library.fail_next(RemoteOp::DeleteAll);
        let alice = AuthUser::new("alice");

        assert!(library.delete_all(&alice).await.is_err());
        assert!(library.delete_all(&alice).await.is_ok());
    }

    #[tokio::test]
    async fn test_statements_require_the_signed_in_user() {
        let library = InMemoryLibrary::with_user("alice");
        library.seed(row("alice", 1, 0));
        let mallory = AuthUser::new("mallory");

        assert!(matches!(library.delete_all(&mallory).await, Err(SourceError::Unauthenticated)));
        assert_eq!(library.rows_for("alice").len(), 1);
    }
}
