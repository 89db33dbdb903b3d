use crate::domain::VersionRecord;
use crate::error::{Result, VersionError};
use crate::store::VersionStore;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Default)]
struct MemoryState {
    record: Option<VersionRecord>,
    loads: usize,
    saves: usize,
    fail_saves: bool,
}

/// In-memory store for tests without touching the filesystem
///
/// Clones share state, so a test can keep one handle and give another to the
/// engine.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    /// Create an empty store; `load` yields the zero record
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that already holds `record`
    pub fn with_record(record: VersionRecord) -> Self {
        let store = Self::new();
        store.lock().record = Some(record);
        store
    }

    /// Make every following `save` fail with a write error
    pub fn fail_saves(&self, fail: bool) {
        self.lock().fail_saves = fail;
    }

    pub fn record(&self) -> Option<VersionRecord> {
        self.lock().record
    }

    pub fn load_count(&self) -> usize {
        self.lock().loads
    }

    pub fn save_count(&self) -> usize {
        self.lock().saves
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        // A poisoned lock only means another test thread panicked.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl VersionStore for MemoryStore {
    fn load(&mut self) -> Result<VersionRecord> {
        let mut state = self.lock();
        state.loads += 1;
        Ok(state.record.unwrap_or_default())
    }

    fn save(&mut self, record: &VersionRecord) -> Result<()> {
        let mut state = self.lock();
        if state.fail_saves {
            return Err(VersionError::store_write(
                Path::new("memory"),
                "save failure forced",
            ));
        }
        state.saves += 1;
        state.record = Some(*record);
        Ok(())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}
