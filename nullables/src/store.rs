//! Nullable registry store: keeps the last saved snapshot in memory.

use stakeward_registry::{ElectionRegistry, RegistryError, RegistryStore};
use std::sync::Mutex;

#[derive(Default)]
pub struct MemoryStore {
    snapshot: Mutex<Option<ElectionRegistry>>,
    saves: Mutex<usize>,
    fail_saves: Mutex<bool>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose snapshot already holds `registry`.
    pub fn with_snapshot(registry: ElectionRegistry) -> Self {
        let store = Self::new();
        *store.snapshot.lock().unwrap() = Some(registry);
        store
    }

    pub fn snapshot(&self) -> Option<ElectionRegistry> {
        self.snapshot.lock().unwrap().clone()
    }

    pub fn save_count(&self) -> usize {
        *self.saves.lock().unwrap()
    }

    pub fn fail_saves(&self, fail: bool) {
        *self.fail_saves.lock().unwrap() = fail;
    }
}

impl RegistryStore for MemoryStore {
    fn load(&self) -> Result<ElectionRegistry, RegistryError> {
        Ok(self.snapshot().unwrap_or_default())
    }

    fn save(&self, registry: &ElectionRegistry) -> Result<(), RegistryError> {
        if *self.fail_saves.lock().unwrap() {
            return Err(RegistryError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                "save disabled",
            )));
        }
        let mut saved = registry.clone();
        saved.mark_clean();
        *self.snapshot.lock().unwrap() = Some(saved);
        *self.saves.lock().unwrap() += 1;
        Ok(())
    }
}
