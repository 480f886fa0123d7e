use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Per-handle mutual exclusion for sync passes.
#[derive(Default)]
pub struct HandleLocks {
    locks: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl HandleLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits for exclusive access to `handle`. Access is released when the guard is dropped.
    pub async fn acquire(&self, handle: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
            // 誰も保持していないロックは捨てる
            locks.retain(|key, lock| key == handle || Arc::strong_count(lock) > 1);
            locks
                .entry(String::from(handle))
                .or_insert_with(|| Arc::new(AsyncMutex::new(())))
                .clone()
        };

        lock.lock_owned().await
    }

    pub fn len(&self) -> usize {
        self.locks.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
