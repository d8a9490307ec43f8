use library_sync_models::{ItemUpdate, LibraryItem, LibraryKey};

/// Local effect of one mutation on the cached list
#[derive(Debug, Clone, PartialEq)]
pub enum Patch {
    /// Prepend unless an item with the same id is already present
    Insert(LibraryItem),
    Update { id: LibraryKey, update: ItemUpdate },
    Remove(LibraryKey),
    Clear,
}

impl Patch {
    pub fn apply(&self, items: &mut Vec<LibraryItem>) {
        match self {
            Patch::Insert(item) => {
                if !items.iter().any(|existing| existing.id == item.id) {
                    items.insert(0, item.clone());
                }
            }
            Patch::Update { id, update } => {
                if let Some(existing) = items.iter_mut().find(|existing| &existing.id == id) {
                    update.apply_to(existing);
                }
            }
            Patch::Remove(id) => items.retain(|existing| &existing.id != id),
            Patch::Clear => items.clear(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Pending,
    /// Confirmed remotely; `stamp` orders it against fetches
    Committed { stamp: u64 },
}

#[derive(Debug)]
struct JournalEntry {
    seq: u64,
    patch: Patch,
    phase: Phase,
}

/// Mutations whose effect may not yet be reflected in fetched data.
///
/// The visible list is always `base` with every live entry replayed on top.
/// `base` is the snapshot taken when the journal went from empty to busy, or
/// the latest fetch that landed since. Entries leave the journal when they
/// roll back, or once a fetch that began after their commit has landed.
#[derive(Debug, Default)]
pub struct MutationJournal {
    base: Option<Vec<LibraryItem>>,
    entries: Vec<JournalEntry>,
    next_seq: u64,
    commits: u64,
}

impl MutationJournal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn pending(&self) -> usize {
        self.entries.iter().filter(|e| e.phase == Phase::Pending).count()
    }

    /// Record a mutation that has just been applied optimistically.
    ///
    /// `snapshot` is the list before the patch; it only becomes the base when
    /// no other mutation is live, since otherwise it already carries their
    /// unconfirmed effects.
    pub fn begin(&mut self, patch: Patch, snapshot: Option<Vec<LibraryItem>>) -> u64 {
        if self.entries.is_empty() {
            self.base = snapshot;
        }
        self.next_seq += 1;
        self.entries.push(JournalEntry {
            seq: self.next_seq,
            patch,
            phase: Phase::Pending,
        });
        self.next_seq
    }

    pub fn commit(&mut self, seq: u64) {
        self.commits += 1;
        let stamp = self.commits;
        if let Some(entry) = self.entries.iter_mut().find(|e| e.seq == seq) {
            entry.phase = Phase::Committed { stamp };
        }
    }

    /// Commits completed so far; a fetch started now observes all of them
    pub fn commit_watermark(&self) -> u64 {
        self.commits
    }

    /// Drop `seq` and rebuild the list from the base with every other live
    /// mutation replayed, so effects of earlier rollbacks stay undone.
    ///
    /// Returns `None` when there was no base and nothing needs replaying.
    pub fn rollback(&mut self, seq: u64) -> Option<Vec<LibraryItem>> {
        let index = self.entries.iter().position(|e| e.seq == seq)?;
        self.entries.remove(index);

        if self.base.is_none() && self.entries.is_empty() {
            return None;
        }
        let mut items = self.base.clone().unwrap_or_default();
        self.replay(&mut items);
        Some(items)
    }

    /// Forget committed mutations a fetch started at `watermark` already reflects
    pub fn settle_through(&mut self, watermark: u64) {
        self.entries.retain(|e| match e.phase {
            Phase::Pending => true,
            Phase::Committed { stamp } => stamp > watermark,
        });
    }

    /// Adopt fetched data as the new base and return it with every remaining
    /// mutation reapplied, in start order
    pub fn rebase(&mut self, fetched: Vec<LibraryItem>) -> Vec<LibraryItem> {
        let mut items = fetched.clone();
        self.replay(&mut items);
        self.base = Some(fetched);
        items
    }

    fn replay(&self, items: &mut Vec<LibraryItem>) {
        for e in &self.entries {
            e.patch.apply(items);
        }
    }

    pub fn clear(&mut self) {
        self.base = None;
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use library_sync_models::{MediaType, SearchResult, WatchStatus};

    fn item(id: u64) -> LibraryItem {
        let candidate = SearchResult {
            id,
            title: Some(format!("Movie {}", id)),
            name: None,
            poster_path: None,
            vote_average: 7.0,
            release_date: None,
            first_air_date: None,
            media_type: MediaType::Movie,
            overview: None,
        };
        LibraryItem::from_search_result(&candidate, WatchStatus::ToWatch, Utc::now())
    }

    fn ids(items: &[LibraryItem]) -> Vec<String> {
        items.iter().map(|i| i.id.to_string()).collect()
    }

    #[test]
    fn test_insert_patch_deduplicates() {
        let mut items = vec![item(1)];
        Patch::Insert(item(2)).apply(&mut items);
        Patch::Insert(item(1)).apply(&mut items);
        assert_eq!(ids(&items), vec!["movie-2", "movie-1"]);
    }

    #[test]
    fn test_update_patch_on_missing_item_is_noop() {
        let mut items = vec![item(1)];
        let before = items.clone();
        Patch::Update {
            id: library_sync_models::derive_id(MediaType::Movie, 99),
            update: ItemUpdate::status(WatchStatus::Watched),
        }
        .apply(&mut items);
        assert_eq!(items, before);
    }

    #[test]
    fn test_rollback_replays_later_mutations() {
        let mut journal = MutationJournal::new();
        let y = item(2);
        // O2 (remove Y) starts first, then O1 (add X)
        let o2 = journal.begin(Patch::Remove(y.id.clone()), Some(vec![y.clone()]));
        let o1 = journal.begin(Patch::Insert(item(1)), Some(vec![]));
        journal.commit(o1);

        let restored = journal.rollback(o2).unwrap();
        assert_eq!(ids(&restored), vec!["movie-1", "movie-2"]);
    }

    #[test]
    fn test_rollbacks_in_start_order_undo_both() {
        let mut journal = MutationJournal::new();
        let x = item(1);
        let y = item(2);
        // add(X) starts on [Y], then remove(Y) starts on [X, Y]
        let add = journal.begin(Patch::Insert(x.clone()), Some(vec![y.clone()]));
        let remove = journal.begin(Patch::Remove(y.id.clone()), Some(vec![x, y]));

        assert_eq!(ids(&journal.rollback(add).unwrap()), Vec::<String>::new());
        assert_eq!(ids(&journal.rollback(remove).unwrap()), vec!["movie-2"]);
        assert!(journal.is_empty());
    }

    #[test]
    fn test_rebase_replays_live_mutations_onto_fetch() {
        let mut journal = MutationJournal::new();
        let seq = journal.begin(Patch::Insert(item(1)), Some(vec![]));
        let visible = journal.rebase(vec![item(2)]);
        assert_eq!(ids(&visible), vec!["movie-1", "movie-2"]);

        // A rollback after the fetch rebuilds from the fetched base
        assert_eq!(ids(&journal.rollback(seq).unwrap()), vec!["movie-2"]);
    }

    #[test]
    fn test_rollback_without_snapshot_or_followers() {
        let mut journal = MutationJournal::new();
        let seq = journal.begin(Patch::Insert(item(1)), None);
        assert_eq!(journal.rollback(seq), None);
        assert!(journal.is_empty());
    }

    #[test]
    fn test_settle_through_keeps_pending_and_late_commits() {
        let mut journal = MutationJournal::new();
        let a = journal.begin(Patch::Insert(item(1)), None);
        let b = journal.begin(Patch::Insert(item(2)), None);
        let _c = journal.begin(Patch::Insert(item(3)), None);

        journal.commit(a);
        let watermark = journal.commit_watermark();
        journal.commit(b);

        journal.settle_through(watermark);
        assert_eq!(journal.len(), 2);
        assert_eq!(journal.pending(), 1);
    }
}
