//! Per-instance exclusive locks
//!
//! Non-blocking: a held lock means an action or sweep is in flight and the
//! contender fails immediately (`ConflictActionInProgress` at the dispatcher,
//! skip-this-pass at the sweeper). No queuing, no waiting.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use uuid::Uuid;

#[derive(Clone, Default)]
pub struct InstanceLockTable {
    held: Arc<Mutex<HashSet<Uuid>>>,
}

impl InstanceLockTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Zero-wait acquire; `None` if the key is already held.
    pub fn try_acquire(&self, key: Uuid) -> Option<InstanceLock> {
        let mut held = self.held.lock().unwrap_or_else(|e| e.into_inner());
        if held.insert(key) {
            Some(InstanceLock {
                key,
                held: Arc::clone(&self.held),
            })
        } else {
            None
        }
    }
}

/// RAII guard; releases the key on drop, including on panic or early return.
pub struct InstanceLock {
    key: Uuid,
    held: Arc<Mutex<HashSet<Uuid>>>,
}

impl Drop for InstanceLock {
    fn drop(&mut self) {
        let mut held = self.held.lock().unwrap_or_else(|e| e.into_inner());
        held.remove(&self.key);
    }
}
