//! Per-key async exclusion
//!
//! Submissions that share an idempotency key, and stops of the same job, run
//! one at a time. A waiter resumes after the holder has persisted its result.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

#[derive(Debug)]
struct Slot {
    lock: Arc<AsyncMutex<()>>,
    /// Holder plus waiters, including waits still in progress
    users: usize,
}

/// Map of key -> async mutex, pruned when the last user of a key leaves
///
/// Clones share the same map.
#[derive(Debug, Default, Clone)]
pub struct KeyedLocks {
    inner: Arc<Mutex<HashMap<String, Slot>>>,
}

/// Claim on a key
///
/// Registered before the wait starts, so dropping an unfinished `acquire`
/// releases the key's entry just like dropping a held guard.
pub struct KeyGuard {
    locks: KeyedLocks,
    key: String,
    guard: Option<OwnedMutexGuard<()>>,
}

impl KeyedLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait until `key` is free, then claim it
    pub async fn acquire(&self, key: &str) -> KeyGuard {
        let lock = {
            let mut map = self.inner.lock().unwrap_or_else(|e| e.into_inner());
            let slot = map.entry(key.to_string()).or_insert_with(|| Slot {
                lock: Arc::new(AsyncMutex::new(())),
                users: 0,
            });
            slot.users += 1;
            slot.lock.clone()
        };

        let mut claim = KeyGuard {
            locks: self.clone(),
            key: key.to_string(),
            guard: None,
        };
        claim.guard = Some(lock.lock_owned().await);
        claim
    }

    /// Number of keys currently claimed or waited on
    pub fn len(&self) -> usize {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Drop for KeyGuard {
    fn drop(&mut self) {
        drop(self.guard.take());

        let mut map = self.locks.inner.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(slot) = map.get_mut(&self.key) {
            slot.users = slot.users.saturating_sub(1);
            if slot.users == 0 {
                map.remove(&self.key);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::FutureExt;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_same_key_is_serialized() {
        let locks = KeyedLocks::new();
        let active = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..5 {
            let (locks, active, peak) = (locks.clone(), active.clone(), peak.clone());
            handles.push(tokio::spawn(async move {
                let _guard = locks.acquire("job-1").await;
                let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(10)).await;
                active.fetch_sub(1, Ordering::SeqCst);
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(peak.load(Ordering::SeqCst), 1);
        assert!(locks.is_empty());
    }

    #[tokio::test]
    async fn test_distinct_keys_do_not_block() {
        let locks = KeyedLocks::new();

        let _a = locks.acquire("a").await;
        let b = tokio::time::timeout(Duration::from_millis(100), locks.acquire("b")).await;

        assert!(b.is_ok());
        assert_eq!(locks.len(), 2);
    }

    #[tokio::test]
    async fn test_entry_removed_after_release() {
        let locks = KeyedLocks::new();
        {
            let _guard = locks.acquire("a").await;
            assert_eq!(locks.len(), 1);
        }
        assert!(locks.is_empty());
    }

    #[tokio::test]
    async fn test_abandoned_wait_does_not_leak_entry() {
        let locks = KeyedLocks::new();
        let holder = locks.acquire("k").await;

        // Polled once while the key is held, then dropped mid-wait
        assert!(locks.acquire("k").now_or_never().is_none());
        assert_eq!(locks.len(), 1);

        drop(holder);
        assert!(locks.is_empty());
    }

    #[tokio::test]
    async fn test_timed_out_waiter_then_holder_leaves() {
        let locks = KeyedLocks::new();
        let holder = locks.acquire("k").await;

        let waited = tokio::time::timeout(Duration::from_millis(10), locks.acquire("k")).await;
        assert!(waited.is_err());

        drop(holder);
        assert!(locks.is_empty());

        let _again = locks.acquire("k").await;
        assert_eq!(locks.len(), 1);
    }
}
