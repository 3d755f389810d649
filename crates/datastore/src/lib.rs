use chrono::{DateTime, TimeDelta, Utc};
use log::debug;
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::RwLock;

/// Key-value cache abstraction.
///
/// Fetch functions stay unaware of caching; the caller decides when to look
/// up, store, or bypass.
pub trait Store<K, V>: Send + Sync {
    /// Get a live entry; expired entries count as misses
    fn get(&self, key: &K) -> Option<V>;

    /// Store `value`, replacing any previous entry for `key`
    fn put(&self, key: K, value: V);

    /// Drop the entry for `key`, if any
    fn invalidate(&self, key: &K);

    /// Drop every entry
    fn clear(&self);
}

#[derive(Debug, Clone)]
struct Entry<V> {
    value: V,
    stored_at: DateTime<Utc>,
}

impl<V> Entry<V> {
    fn is_expired(&self, ttl: TimeDelta, now: DateTime<Utc>) -> bool {
        is_stale(self.stored_at, ttl, now)
    }
}

/// Whether something stamped at `since` is at least `ttl` old at `now`.
///
/// A deadline past the representable range never arrives.
pub fn is_stale(since: DateTime<Utc>, ttl: TimeDelta, now: DateTime<Utc>) -> bool {
    since
        .checked_add_signed(ttl)
        .is_some_and(|deadline| now >= deadline)
}

/// In-memory implementation of [`Store`] with a fixed time-to-live
pub struct InMemoryStore<K, V> {
    entries: RwLock<HashMap<K, Entry<V>>>,
    ttl: TimeDelta,
}

impl<K, V> InMemoryStore<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new(ttl: TimeDelta) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    pub fn ttl(&self) -> TimeDelta {
        self.ttl
    }

    /// Lookup as of `now`
    pub fn get_at(&self, key: &K, now: DateTime<Utc>) -> Option<V> {
        let entries = self
            .entries
            .read()
            .expect("Failed to acquire read lock on entries");
        let entry = entries.get(key)?;
        if entry.is_expired(self.ttl, now) {
            debug!("Cache entry expired");
            return None;
        }
        Some(entry.value.clone())
    }

    /// Store as of `now`. Entries already expired at `now` are dropped first,
    /// so the map never outgrows its live entries plus one.
    pub fn put_at(&self, key: K, value: V, now: DateTime<Utc>) {
        let mut entries = self
            .entries
            .write()
            .expect("Failed to acquire write lock on entries");
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired(self.ttl, now));
        if entries.len() < before {
            debug!("Purged {} expired cache entries", before - entries.len());
        }
        entries.insert(
            key,
            Entry {
                value,
                stored_at: now,
            },
        );
    }

    /// Remove every expired entry, returning how many were dropped
    pub fn purge_expired(&self, now: DateTime<Utc>) -> usize {
        let mut entries = self
            .entries
            .write()
            .expect("Failed to acquire write lock on entries");
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired(self.ttl, now));
        before - entries.len()
    }

    /// Number of stored entries, expired ones included
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .expect("Failed to acquire read lock on entries")
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<K, V> Store<K, V> for InMemoryStore<K, V>
where
    K: Eq + Hash + Clone + Send + Sync,
    V: Clone + Send + Sync,
{
    fn get(&self, key: &K) -> Option<V> {
        self.get_at(key, Utc::now())
    }

    fn put(&self, key: K, value: V) {
        self.put_at(key, value, Utc::now());
    }

    fn invalidate(&self, key: &K) {
        self.entries
            .write()
            .expect("Failed to acquire write lock on entries")
            .remove(key);
    }

    fn clear(&self) {
        self.entries
            .write()
            .expect("Failed to acquire write lock on entries")
            .clear();
    }
}
