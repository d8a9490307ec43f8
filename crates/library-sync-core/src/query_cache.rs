use library_sync_config::CacheConfig;
use std::time::Duration;
use tokio::time::Instant;

/// Freshness window and eviction delay for cached query data
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachePolicy {
    pub stale_time: Duration,
    pub gc_time: Duration,
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self {
            stale_time: Duration::from_secs(5 * 60),
            gc_time: Duration::from_secs(10 * 60),
        }
    }
}

impl From<&CacheConfig> for CachePolicy {
    fn from(config: &CacheConfig) -> Self {
        Self {
            stale_time: config.stale_time(),
            gc_time: config.gc_time(),
        }
    }
}

struct Entry<T> {
    key: String,
    data: T,
    updated_at: Instant,
    last_access: Instant,
    invalidated: bool,
}

/// Single-slot query cache with stale-time/gc-time semantics.
///
/// The slot is keyed (by user id) so a session change never serves another
/// user's data. `generation` increases whenever a writer replaces the data;
/// fetches compare it on completion to detect they were superseded.
pub struct QueryCache<T> {
    policy: CachePolicy,
    entry: Option<Entry<T>>,
    generation: u64,
}

impl<T: Clone> QueryCache<T> {
    pub fn new(policy: CachePolicy) -> Self {
        Self {
            policy,
            entry: None,
            generation: 0,
        }
    }

    pub fn policy(&self) -> CachePolicy {
        self.policy
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Supersede every fetch currently in flight
    pub fn cancel_fetches(&mut self) -> u64 {
        self.generation += 1;
        self.generation
    }

    /// Data for `key` without counting as a use
    pub fn peek(&self, key: &str) -> Option<&T> {
        self.entry.as_ref().filter(|e| e.key == key).map(|e| &e.data)
    }

    /// Data for `key`, recording the access for eviction purposes
    pub fn get(&mut self, key: &str, now: Instant) -> Option<&T> {
        self.collect_garbage(now);
        let entry = self.entry.as_mut().filter(|e| e.key == key)?;
        entry.last_access = now;
        Some(&entry.data)
    }

    pub fn is_fresh(&self, key: &str, now: Instant) -> bool {
        match self.entry {
            Some(ref e) if e.key == key => {
                !e.invalidated && now.saturating_duration_since(e.updated_at) < self.policy.stale_time
            }
            _ => false,
        }
    }

    /// Store authoritative data from a completed fetch
    pub fn set_fetched(&mut self, key: &str, data: T, now: Instant) {
        self.entry = Some(Entry {
            key: key.to_string(),
            data,
            updated_at: now,
            last_access: now,
            invalidated: false,
        });
    }

    /// Replace the data locally (optimistic writes and rollbacks).
    ///
    /// Keeps the fetch timestamp; an entry created this way starts invalidated
    /// since it never came from the remote store.
    pub fn set_local(&mut self, key: &str, data: T, now: Instant) {
        match self.entry {
            Some(ref mut e) if e.key == key => {
                e.data = data;
                e.last_access = now;
            }
            _ => {
                self.entry = Some(Entry {
                    key: key.to_string(),
                    data,
                    updated_at: now,
                    last_access: now,
                    invalidated: true,
                });
            }
        }
    }

    /// Mark the data stale so the next read refetches
    pub fn invalidate(&mut self) {
        if let Some(ref mut e) = self.entry {
            e.invalidated = true;
        }
    }

    pub fn remove(&mut self) {
        self.entry = None;
    }

    /// Evict the entry once it has gone unused for `gc_time`
    pub fn collect_garbage(&mut self, now: Instant) -> bool {
        let expired = self
            .entry
            .as_ref()
            .map(|e| now.saturating_duration_since(e.last_access) >= self.policy.gc_time)
            .unwrap_or(false);
        if expired {
            self.entry = None;
        }
        expired
    }
}
