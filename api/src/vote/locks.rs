use std::{future::Future, hash::Hash, sync::Arc};

use tokio::sync::Mutex;

/// Registry of async mutexes keyed by `K`. Futures run through
/// [`KeyedLocks::serialize`] never overlap for equal keys; entries are dropped
/// once nobody holds or waits on them.
pub struct KeyedLocks<K> {
    locks: scc::HashMap<K, Arc<Mutex<()>>>,
}

impl<K> KeyedLocks<K>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self {
            locks: scc::HashMap::new(),
        }
    }

    pub async fn serialize<F, T>(&self, key: K, fut: F) -> T
    where
        F: Future<Output = T>,
    {
        // declared first so it drops last, after our clone of the mutex
        let _release = Release {
            locks: &self.locks,
            key: key.clone(),
        };

        let lock = self
            .locks
            .entry_async(key)
            .await
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .get()
            .clone();

        let _guard = lock.lock().await;
        fut.await
    }

    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

/// Drops the registry entry of `key` once no caller holds a clone of it. Runs
/// on completion and on cancellation alike.
struct Release<'a, K: Eq + Hash> {
    locks: &'a scc::HashMap<K, Arc<Mutex<()>>>,
    key: K,
}

impl<K: Eq + Hash> Drop for Release<'_, K> {
    fn drop(&mut self) {
        let _ = self
            .locks
            .remove_if_sync(&self.key, |lock| Arc::strong_count(lock) == 1);
    }
}

impl<K> Default for KeyedLocks<K>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}
