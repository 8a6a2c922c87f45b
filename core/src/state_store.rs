//! Keyed state behind the in-process guards.
//!
//! The rate guard, activity detector and payment ledgers keep their records
//! in a [`StateStore`]. Each `update` is an atomic read-modify-write of one
//! key, which is what lets the ledger check-and-register in a single step.
//! The in-memory implementation is per process; a shared implementation
//! makes the guards consistent across instances.

/// Map-like store with atomic per-key updates.
pub trait StateStore<K, V>: Send + Sync {
    /// Copy of the value at `key`.
    fn get(&self, key: &K) -> Option<V>;

    /// Insert or overwrite.
    fn insert(&self, key: K, value: V);

    /// Remove and return the value at `key`.
    fn remove(&self, key: &K) -> Option<V>;

    /// Atomically transform the value at `key`.
    ///
    /// `f` receives the current value and returns the new value (`None`
    /// removes the key) together with a result handed back to the caller.
    /// No other operation on the store interleaves with `f`.
    fn update<R>(&self, key: K, f: impl FnOnce(Option<V>) -> (Option<V>, R)) -> R;

    /// Keep only entries for which `keep` returns true; returns how many
    /// were removed.
    fn retain(&self, keep: impl FnMut(&K, &V) -> bool) -> usize;

    /// Copy of every value.
    fn values(&self) -> Vec<V>;

    /// Number of entries.
    fn len(&self) -> usize;

    /// Whether the store is empty.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
