//! Reader-writer-locked table shared between the tick driver and
//! asynchronous outcome handlers.
//!
//! Every per-agent table in the crate (humanizer state, attempt ledgers,
//! feedback stats) goes through this one abstraction so the locking
//! discipline lives in exactly one place: many concurrent readers, one
//! writer, statistics read-modify-write entirely under the writer lock.

use ahash::AHashMap;
use std::hash::Hash;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

pub struct SharedMap<K, V> {
    inner: RwLock<AHashMap<K, V>>,
}

impl<K: Eq + Hash + Clone, V> SharedMap<K, V> {
    pub fn new() -> Self {
        Self { inner: RwLock::new(AHashMap::new()) }
    }

    // A poisoned lock only means another thread panicked mid-write; the
    // map itself is still structurally sound, so recover rather than
    // propagate the panic into the combat loop.
    fn read_guard(&self) -> RwLockReadGuard<'_, AHashMap<K, V>> {
        match self.inner.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn write_guard(&self) -> RwLockWriteGuard<'_, AHashMap<K, V>> {
        match self.inner.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Run a closure against the map under the read lock
    pub fn read_with<R>(&self, f: impl FnOnce(&AHashMap<K, V>) -> R) -> R {
        f(&self.read_guard())
    }

    /// Run a closure against the map under the write lock
    pub fn write_with<R>(&self, f: impl FnOnce(&mut AHashMap<K, V>) -> R) -> R {
        f(&mut self.write_guard())
    }

    /// Copy out the value for a key, if present
    pub fn get_cloned(&self, key: &K) -> Option<V>
    where
        V: Clone,
    {
        self.read_guard().get(key).cloned()
    }

    /// Insert-or-update for one key, entirely under the writer lock
    pub fn with_entry<R>(
        &self,
        key: K,
        default: impl FnOnce() -> V,
        f: impl FnOnce(&mut V) -> R,
    ) -> R {
        let mut guard = self.write_guard();
        let value = guard.entry(key).or_insert_with(default);
        f(value)
    }

    /// Run a closure against one existing entry; `None` for unknown keys
    pub fn with_existing<R>(&self, key: &K, f: impl FnOnce(&mut V) -> R) -> Option<R> {
        let mut guard = self.write_guard();
        guard.get_mut(key).map(f)
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.read_guard().contains_key(key)
    }

    pub fn remove(&self, key: &K) -> Option<V> {
        self.write_guard().remove(key)
    }

    /// Snapshot of the current keys, for sweeps that must tolerate
    /// concurrent insertion and removal
    pub fn keys(&self) -> Vec<K> {
        self.read_guard().keys().cloned().collect()
    }

    pub fn retain(&self, f: impl FnMut(&K, &mut V) -> bool) {
        self.write_guard().retain(f);
    }

    pub fn len(&self) -> usize {
        self.read_guard().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read_guard().is_empty()
    }
}

impl<K: Eq + Hash + Clone, V> Default for SharedMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}
