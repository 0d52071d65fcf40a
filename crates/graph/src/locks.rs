use crate::types::NodeKey;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Per-node-key write locks.
///
/// Writers touching a common key (a shared `Category`, the same server)
/// serialize; writers with disjoint keys run concurrently. Keys are taken in
/// sorted order so two writers can never wait on each other in a cycle.
#[derive(Debug, Default)]
pub struct KeyLocks {
    slots: Mutex<HashMap<NodeKey, Arc<AsyncMutex<()>>>>,
    wait_ms_last: AtomicU64,
    wait_ms_max: AtomicU64,
}

/// Held locks; released on drop.
#[derive(Debug)]
pub struct KeyGuards {
    _guards: Vec<OwnedMutexGuard<()>>,
}

impl KeyLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lock every key in `keys`, which must be sorted and deduplicated
    pub async fn acquire(&self, keys: &[NodeKey]) -> KeyGuards {
        let slots: Vec<Arc<AsyncMutex<()>>> = {
            // the map only ever holds whole entries, so a poisoned guard is still consistent
            let mut map = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
            map.retain(|_, slot| Arc::strong_count(slot) > 1);
            keys.iter()
                .map(|key| Arc::clone(map.entry(key.clone()).or_default()))
                .collect()
        };

        let start = Instant::now();
        let mut guards = Vec::with_capacity(slots.len());
        for slot in slots {
            guards.push(slot.lock_owned().await);
        }
        self.record_wait(start.elapsed().as_millis() as u64);

        KeyGuards { _guards: guards }
    }

    pub fn wait_ms_last(&self) -> u64 {
        self.wait_ms_last.load(Ordering::Relaxed)
    }

    pub fn wait_ms_max(&self) -> u64 {
        self.wait_ms_max.load(Ordering::Relaxed)
    }

    /// Keys with a live lock slot
    pub fn tracked(&self) -> usize {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn record_wait(&self, wait_ms: u64) {
        self.wait_ms_last.store(wait_ms, Ordering::Relaxed);
        let mut current = self.wait_ms_max.load(Ordering::Relaxed);
        while wait_ms > current {
            match self.wait_ms_max.compare_exchange(
                current,
                wait_ms,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => break,
                Err(next) => current = next,
            }
        }
    }
}
