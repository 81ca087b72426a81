//! In-memory store, used when no store path is configured and in tests.

use std::sync::Mutex;

use super::{AccountStore, Snapshot};
use crate::error::StoreError;

#[derive(Default)]
pub struct MemoryStore {
    snapshot: Mutex<Snapshot>,
}

impl MemoryStore {
    pub fn new(snapshot: Snapshot) -> Self {
        Self {
            snapshot: Mutex::new(snapshot),
        }
    }

    /// Copy of the last saved snapshot
    pub fn snapshot(&self) -> Snapshot {
        match self.snapshot.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl AccountStore for MemoryStore {
    fn load(&self) -> Result<Snapshot, StoreError> {
        Ok(self.snapshot())
    }

    fn save(&self, snapshot: &Snapshot) -> Result<(), StoreError> {
        let mut guard = match self.snapshot.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *guard = snapshot.clone();
        Ok(())
    }
}
