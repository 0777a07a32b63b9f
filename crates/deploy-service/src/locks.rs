//! Keyed mutual exclusion
//!
//! The orchestrator holds a per-application token across the build and
//! launch stages; the registry holds a per-client-path token across its
//! read-then-insert sequence. Both are backed by the same keyed lock map.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::OwnedMutexGuard;

/// A map of named async locks.
///
/// Entries are never evicted; the map is bounded by the number of
/// applications the service has seen.
#[derive(Default)]
pub struct KeyedLocks {
    inner: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl KeyedLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the lock for `key`, waiting if another holder has it.
    pub async fn acquire(&self, key: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut map = self.inner.lock().expect("lock map poisoned");
            map.entry(key.to_string())
                .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::timeout;

    #[tokio::test]
    async fn test_same_key_serializes() {
        let locks = KeyedLocks::new();
        let guard = locks.acquire("app-1").await;

        // A second acquire on the same key must wait for the first holder.
        assert!(timeout(Duration::from_millis(50), locks.acquire("app-1"))
            .await
            .is_err());

        drop(guard);
        assert!(timeout(Duration::from_millis(50), locks.acquire("app-1"))
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_distinct_keys_do_not_block() {
        let locks = KeyedLocks::new();
        let _guard = locks.acquire("app-1").await;

        assert!(timeout(Duration::from_millis(50), locks.acquire("app-2"))
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_second_holder_observes_first_completion() {
        let locks = Arc::new(KeyedLocks::new());
        let order = Arc::new(Mutex::new(Vec::new()));

        let guard = locks.acquire("app-1").await;

        let locks2 = locks.clone();
        let order2 = order.clone();
        let waiter = tokio::spawn(async move {
            let _guard = locks2.acquire("app-1").await;
            order2.lock().unwrap().push("second");
        });

        tokio::time::sleep(Duration::from_millis(20)).await;
        order.lock().unwrap().push("first");
        drop(guard);

        waiter.await.unwrap();
        assert_eq!(*order.lock().unwrap(), vec!["first", "second"]);
    }
}
