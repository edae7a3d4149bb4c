use super::{DocumentSink, PersistError, PersistedDocument};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

/// Records every save in memory. Can be told to fail, to exercise the
/// optimistic-save path.
#[derive(Debug, Default)]
pub struct MemorySink {
    saves: Mutex<Vec<PersistedDocument>>,
    fail: AtomicBool,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    /// Every snapshot saved so far, oldest first.
    pub fn saves(&self) -> Vec<PersistedDocument> {
        self.saves
            .lock()
            .map(|saves| saves.clone())
            .unwrap_or_default()
    }

    pub fn save_count(&self) -> usize {
        self.saves.lock().map(|saves| saves.len()).unwrap_or(0)
    }

    pub fn last(&self) -> Option<PersistedDocument> {
        self.saves.lock().ok().and_then(|saves| saves.last().cloned())
    }
}

#[async_trait]
impl DocumentSink for MemorySink {
    async fn save(&self, document: &PersistedDocument) -> Result<(), PersistError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(PersistError::Task("memory sink set to fail".to_string()));
        }
        let mut saves = self
            .saves
            .lock()
            .map_err(|_| PersistError::Task("memory sink lock poisoned".to_string()))?;
        saves.push(document.clone());
        Ok(())
    }
}
