use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use crate::domain::error::StoreError;
use crate::domain::ports::{CredentialStore, PersistedSession};

/// Process-local store for tests and ephemeral runs.
#[derive(Default)]
pub struct InMemoryCredentialStore {
    record: Mutex<Option<PersistedSession>>,
    fail_writes: AtomicBool,
    writes: AtomicUsize,
}

impl InMemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from a previously persisted record (validated like a real load).
    pub fn with_record(record: PersistedSession) -> Self {
        let store = Self::new();
        *store.record.lock() = Some(record);
        store
    }

    /// Raw stored record, bypassing validation.
    pub fn peek(&self) -> Option<PersistedSession> {
        self.record.lock().clone()
    }

    /// Make subsequent writes fail; clears keep working.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of successful writes.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

impl CredentialStore for InMemoryCredentialStore {
    fn load(&self) -> Option<PersistedSession> {
        self.record.lock().clone().filter(PersistedSession::is_valid)
    }

    fn write(&self, record: &PersistedSession) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("writes disabled".into()));
        }
        *self.record.lock() = Some(record.clone());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn clear(&self) -> Result<(), StoreError> {
        *self.record.lock() = None;
        Ok(())
    }
}
