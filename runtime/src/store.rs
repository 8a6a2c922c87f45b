//! In-memory [`StateStore`].

use clubpass_core::state_store::StateStore;
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Process-local state store backed by a mutex-guarded `HashMap`.
///
/// Cloning shares the underlying map. Every operation holds the lock for its
/// whole duration, so `update` closures never interleave.
#[derive(Debug)]
pub struct InMemoryStateStore<K, V> {
    entries: Arc<Mutex<HashMap<K, V>>>,
}

impl<K, V> InMemoryStateStore<K, V> {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    // A panic inside an update leaves the map consistent (the entry was
    // removed before the closure ran), so a poisoned lock is still usable.
    fn lock(&self) -> MutexGuard<'_, HashMap<K, V>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<K, V> Clone for InMemoryStateStore<K, V> {
    fn clone(&self) -> Self {
        Self {
            entries: Arc::clone(&self.entries),
        }
    }
}

impl<K, V> Default for InMemoryStateStore<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> StateStore<K, V> for InMemoryStateStore<K, V>
where
    K: Eq + Hash + Send,
    V: Clone + Send,
{
    fn get(&self, key: &K) -> Option<V> {
        self.lock().get(key).cloned()
    }

    fn insert(&self, key: K, value: V) {
        self.lock().insert(key, value);
    }

    fn remove(&self, key: &K) -> Option<V> {
        self.lock().remove(key)
    }

    fn update<R>(&self, key: K, f: impl FnOnce(Option<V>) -> (Option<V>, R)) -> R {
        let mut entries = self.lock();
        let current = entries.remove(&key);
        let (next, result) = f(current);
        if let Some(value) = next {
            entries.insert(key, value);
        }
        result
    }

    fn retain(&self, mut keep: impl FnMut(&K, &V) -> bool) -> usize {
        let mut entries = self.lock();
        let before = entries.len();
        entries.retain(|k, v| keep(k, v));
        before - entries.len()
    }

    fn values(&self) -> Vec<V> {
        self.lock().values().cloned().collect()
    }

    fn len(&self) -> usize {
        self.lock().len()
    }
}
