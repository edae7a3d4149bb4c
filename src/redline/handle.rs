use super::model::{NewSuggestion, SuggestionId};
use super::store::{Navigation, RedlineStore};
use super::RedlineError;
use crate::persist::{AutoSaver, PersistedDocument};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Shared, serialized access to one document.
///
/// All mutations take the same async lock, so there is exactly one writer
/// per document at a time. When an [`AutoSaver`] is attached, a snapshot is
/// scheduled after every mutation while the lock is still held, which keeps
/// snapshots in mutation order.
#[derive(Debug, Clone)]
pub struct DocumentHandle {
    store: Arc<Mutex<RedlineStore>>,
    autosave: Option<Arc<AutoSaver>>,
}

impl DocumentHandle {
    pub fn new(store: RedlineStore) -> Self {
        Self {
            store: Arc::new(Mutex::new(store)),
            autosave: None,
        }
    }

    pub fn with_autosave(mut self, saver: Arc<AutoSaver>) -> Self {
        self.autosave = Some(saver);
        self
    }

    pub async fn read<R>(&self, f: impl FnOnce(&RedlineStore) -> R) -> R {
        let store = self.store.lock().await;
        f(&store)
    }

    /// Run `f` as one serialized mutation, then schedule a save.
    pub async fn mutate<R>(&self, f: impl FnOnce(&mut RedlineStore) -> R) -> R {
        let mut store = self.store.lock().await;
        let result = f(&mut store);
        if let Some(saver) = &self.autosave {
            saver.schedule(PersistedDocument::from_store(&store));
        }
        result
    }

    pub async fn add_suggestion(&self, new: NewSuggestion) -> Result<SuggestionId, RedlineError> {
        self.mutate(|store| store.add_suggestion(new)).await
    }

    pub async fn accept(&self, id: SuggestionId) -> Result<isize, RedlineError> {
        self.mutate(|store| store.accept(id)).await
    }

    pub async fn modify(&self, id: SuggestionId, text: String) -> Result<isize, RedlineError> {
        self.mutate(|store| store.modify(id, text)).await
    }

    pub async fn reject(&self, id: SuggestionId) -> Result<(), RedlineError> {
        self.mutate(|store| store.reject(id)).await
    }

    /// Cursor movement is not persisted, so no save is scheduled.
    pub async fn navigate(&self, to: Navigation) -> Result<Option<SuggestionId>, RedlineError> {
        self.store.lock().await.navigate(to)
    }

    pub async fn snapshot(&self) -> PersistedDocument {
        self.read(PersistedDocument::from_store).await
    }
}
