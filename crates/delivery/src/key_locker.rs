use std::hash::Hash;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Per-key async mutex. Entries are dropped once the last guard for a key
/// is released, so idle queues leave nothing behind.
pub struct KeyLocker<K: Eq + Hash + Clone> {
    locks: Arc<DashMap<K, Arc<Mutex<()>>>>,
}

impl<K: Eq + Hash + Clone> Default for KeyLocker<K> {
    fn default() -> Self {
        Self { locks: Arc::new(DashMap::new()) }
    }
}

impl<K: Eq + Hash + Clone> KeyLocker<K> {
    pub async fn lock(&self, key: &K) -> KeyGuard<K> {
        let entry = self.locks.entry(key.clone()).or_insert_with(|| Arc::new(Mutex::new(()))).clone();
        let guard = entry.lock_owned().await;
        KeyGuard { key: key.clone(), locks: Arc::clone(&self.locks), _guard: guard }
    }
}

pub struct KeyGuard<K: Eq + Hash + Clone> {
    key: K,
    locks: Arc<DashMap<K, Arc<Mutex<()>>>>,
    _guard: OwnedMutexGuard<()>,
}

impl<K: Eq + Hash + Clone> Drop for KeyGuard<K> {
    fn drop(&mut self) {
        // our own clone of the mutex is held by `_guard`, hence 2
        self.locks.remove_if(&self.key, |_, lock| Arc::strong_count(lock) <= 2);
    }
}
