use super::{DocumentSink, PersistError, PersistedDocument};
use async_trait::async_trait;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Stores each document as `<dir>/<id>.json`.
#[derive(Debug, Clone)]
pub struct JsonFileSink {
    dir: PathBuf,
}

impl JsonFileSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, id: &str) -> Result<PathBuf, PersistError> {
        let usable = !id.is_empty()
            && id != "."
            && id != ".."
            && !id.contains(['/', '\\', '\0']);
        if !usable {
            return Err(PersistError::InvalidId { id: id.to_string() });
        }
        Ok(self.dir.join(format!("{id}.json")))
    }

    /// Read a stored document back and check its content hash.
    pub async fn load(&self, id: &str) -> Result<PersistedDocument, PersistError> {
        let path = self.path_for(id)?;
        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|source| PersistError::Io { path, source })?;
        let document: PersistedDocument = serde_json::from_slice(&bytes)?;
        if !document.verify() {
            return Err(PersistError::HashMismatch { id: id.to_string() });
        }
        Ok(document)
    }
}

#[async_trait]
impl DocumentSink for JsonFileSink {
    async fn save(&self, document: &PersistedDocument) -> Result<(), PersistError> {
        let path = self.path_for(&document.id)?;
        let content = serde_json::to_vec_pretty(document)?;
        let dir = self.dir.clone();

        tokio::task::spawn_blocking(move || atomic_write(&dir, &path, &content))
            .await
            .map_err(|err| PersistError::Task(err.to_string()))??;

        debug!(id = %document.id, hash = %document.content_hash, "saved document");
        Ok(())
    }
}

/// Atomic file write: tempfile + fsync + rename.
///
/// Either the full write lands or the previous file is left as it was.
fn atomic_write(dir: &Path, path: &Path, content: &[u8]) -> Result<(), PersistError> {
    let io = |source: std::io::Error| PersistError::Io {
        path: path.to_path_buf(),
        source,
    };

    std::fs::create_dir_all(dir).map_err(io)?;

    // Same directory keeps the rename on one filesystem.
    let mut temp = tempfile::NamedTempFile::new_in(dir).map_err(io)?;
    temp.write_all(content).map_err(io)?;
    temp.as_file().sync_all().map_err(io)?;
    temp.persist(path).map_err(|err| io(err.error))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::redline::{NewSuggestion, RedlineStore};

    fn document() -> PersistedDocument {
        let mut store = RedlineStore::new("memo", "The the court held.");
        store
            .add_suggestion(NewSuggestion::new(0, 8, "The the ", "The "))
            .unwrap();
        PersistedDocument::from_store(&store)
    }

    #[tokio::test]
    async fn saves_and_loads() {
        let temp_dir = tempfile::tempdir().unwrap();
        let sink = JsonFileSink::new(temp_dir.path().join("docs"));
        let doc = document();

        sink.save(&doc).await.unwrap();
        assert!(temp_dir.path().join("docs/memo.json").exists());
        assert_eq!(sink.load("memo").await.unwrap(), doc);
    }

    #[tokio::test]
    async fn tampered_file_fails_hash_check() {
        let temp_dir = tempfile::tempdir().unwrap();
        let sink = JsonFileSink::new(temp_dir.path());
        let mut doc = document();
        sink.save(&doc).await.unwrap();

        doc.current_content.push_str(" Edited.");
        let path = sink.path_for("memo").unwrap();
        std::fs::write(&path, serde_json::to_vec(&doc).unwrap()).unwrap();

        assert!(matches!(
            sink.load("memo").await,
            Err(PersistError::HashMismatch { .. })
        ));
    }

    #[tokio::test]
    async fn edited_suggestion_text_fails_hash_check() {
        let temp_dir = tempfile::tempdir().unwrap();
        let sink = JsonFileSink::new(temp_dir.path());
        let doc = document();
        sink.save(&doc).await.unwrap();

        let path = sink.path_for("memo").unwrap();
        let mut json: serde_json::Value =
            serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        json["suggestions"][0]["suggestedText"] = "The the the ".into();
        std::fs::write(&path, serde_json::to_vec(&json).unwrap()).unwrap();

        assert!(matches!(
            sink.load("memo").await,
            Err(PersistError::HashMismatch { .. })
        ));
    }

    #[test]
    fn rejects_path_like_ids() {
        let sink = JsonFileSink::new("/tmp");
        for id in ["", "..", "a/b", "a\\b"] {
            assert!(matches!(sink.path_for(id), Err(PersistError::InvalidId { .. })));
        }
        assert!(sink.path_for("brief-1").is_ok());
    }

    #[tokio::test]
    async fn missing_document_is_io_error() {
        let temp_dir = tempfile::tempdir().unwrap();
        let sink = JsonFileSink::new(temp_dir.path());
        assert!(matches!(sink.load("nope").await, Err(PersistError::Io { .. })));
    }
}
