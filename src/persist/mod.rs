//! Document persistence.
//!
//! Storage itself is a collaborator behind [`DocumentSink`]; this module
//! owns the persisted shape, a JSON-file sink, an in-memory sink for tests,
//! and the debounced [`AutoSaver`] that feeds a sink from the store.

pub mod autosave;
pub mod file;
pub mod memory;

pub use autosave::AutoSaver;
pub use file::JsonFileSink;
pub use memory::MemorySink;

use crate::redline::{DocumentMetadata, RedlineStore, RedlineSuggestion};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;
use xxhash_rust::xxh3::Xxh3;

#[derive(Error, Debug)]
pub enum PersistError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to encode or decode document: {0}")]
    Json(#[from] serde_json::Error),

    #[error("document id {id:?} cannot be used as a file name")]
    InvalidId { id: String },

    #[error("stored document {id:?} does not match its content hash")]
    HashMismatch { id: String },

    #[error("background persistence task failed: {0}")]
    Task(String),
}

/// Stored form of one document. Metadata is recomputed from the suggestions
/// every time a snapshot is taken.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedDocument {
    pub id: String,
    pub original_content: String,
    pub current_content: String,
    pub suggestions: Vec<RedlineSuggestion>,
    pub metadata: DocumentMetadata,
    /// xxh3 of the contents and suggestions (see [`content_hash`]), hex encoded
    pub content_hash: String,
}

impl PersistedDocument {
    pub fn from_store(store: &RedlineStore) -> Self {
        let suggestions: Vec<RedlineSuggestion> = store.suggestions().cloned().collect();
        Self {
            id: store.id().to_string(),
            original_content: store.original_content().to_string(),
            current_content: store.current_content().to_string(),
            content_hash: content_hash(
                store.original_content(),
                store.current_content(),
                &suggestions,
            ),
            metadata: store.metadata(),
            suggestions,
        }
    }

    pub fn into_store(self) -> RedlineStore {
        RedlineStore::restore(
            self.id,
            self.original_content,
            self.current_content,
            self.suggestions,
            self.metadata.last_modified,
        )
    }

    /// Whether `content_hash` still describes the content and suggestions.
    pub fn verify(&self) -> bool {
        content_hash(
            &self.original_content,
            &self.current_content,
            &self.suggestions,
        ) == self.content_hash
    }
}

/// Hash of both contents and every suggestion's texts, range and status.
/// Timestamps and the derived metadata are excluded so that re-saving
/// identical state is detectable.
pub fn content_hash(
    original_content: &str,
    current_content: &str,
    suggestions: &[RedlineSuggestion],
) -> String {
    let mut hasher = Xxh3::new();
    let mut field = |bytes: &[u8]| {
        hasher.update(&(bytes.len() as u64).to_le_bytes());
        hasher.update(bytes);
    };
    field(original_content.as_bytes());
    field(current_content.as_bytes());
    for suggestion in suggestions {
        field(&suggestion.id.0.to_le_bytes());
        field(&(suggestion.start as u64).to_le_bytes());
        field(&(suggestion.end as u64).to_le_bytes());
        field(suggestion.status.to_string().as_bytes());
        field(suggestion.original_text.as_bytes());
        field(suggestion.suggested_text.as_bytes());
        field(suggestion.explanation.as_bytes());
        field(suggestion.modified_text.as_deref().unwrap_or_default().as_bytes());
        field(suggestion.paragraph_id.as_deref().unwrap_or_default().as_bytes());
    }
    format!("{:016x}", hasher.digest())
}

/// Destination for document snapshots.
#[async_trait]
pub trait DocumentSink: Send + Sync {
    async fn save(&self, document: &PersistedDocument) -> Result<(), PersistError>;
}
