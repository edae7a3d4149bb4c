use super::{DocumentSink, PersistedDocument};
use crate::config::AutosaveConfig;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(1500);

/// Debounced, fire-and-forget persistence.
///
/// Each [`schedule`](Self::schedule) replaces the pending snapshot and
/// restarts the timer; when the timer runs out only the latest snapshot is
/// written. A snapshot whose hash equals the last one written is skipped.
/// Failures are logged and dropped: in-memory state is never rolled back.
#[derive(Debug)]
pub struct AutoSaver {
    snapshots: watch::Sender<Option<Arc<PersistedDocument>>>,
    shutdown: watch::Sender<bool>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl AutoSaver {
    /// Start the background task. Must be called inside a tokio runtime.
    pub fn spawn(sink: Arc<dyn DocumentSink>, debounce: Duration) -> Self {
        let (snapshots, snapshot_rx) = watch::channel(None);
        let (shutdown, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(run(sink, debounce, snapshot_rx, shutdown_rx));
        Self {
            snapshots,
            shutdown,
            task: Mutex::new(Some(task)),
        }
    }

    /// Start a saver from `[autosave]` settings; `None` when disabled.
    pub fn from_config(sink: Arc<dyn DocumentSink>, config: &AutosaveConfig) -> Option<Self> {
        config
            .enabled
            .then(|| Self::spawn(sink, config.debounce()))
    }

    pub fn schedule(&self, document: PersistedDocument) {
        debug!(id = %document.id, hash = %document.content_hash, "scheduled save");
        self.snapshots.send_replace(Some(Arc::new(document)));
    }

    /// Flush the pending snapshot, if any, and stop the task.
    pub async fn shutdown(&self) {
        let task = self.task.lock().ok().and_then(|mut task| task.take());
        let Some(task) = task else {
            return;
        };
        self.shutdown.send_replace(true);
        if let Err(err) = task.await {
            warn!(error = %err, "autosave task ended abnormally");
        }
    }
}

async fn run(
    sink: Arc<dyn DocumentSink>,
    debounce: Duration,
    mut snapshots: watch::Receiver<Option<Arc<PersistedDocument>>>,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut last_saved: Option<String> = None;

    'outer: loop {
        tokio::select! {
            changed = snapshots.changed() => {
                if changed.is_err() {
                    break;
                }
            }
            _ = shutdown.changed() => break,
        }

        // Any newer snapshot restarts the wait.
        loop {
            tokio::select! {
                _ = tokio::time::sleep(debounce) => break,
                changed = snapshots.changed() => {
                    if changed.is_err() {
                        break 'outer;
                    }
                }
                _ = shutdown.changed() => break 'outer,
            }
        }

        let latest = snapshots.borrow_and_update().clone();
        save_if_changed(sink.as_ref(), latest, &mut last_saved).await;
    }

    let latest = snapshots.borrow().clone();
    save_if_changed(sink.as_ref(), latest, &mut last_saved).await;
}

async fn save_if_changed(
    sink: &dyn DocumentSink,
    document: Option<Arc<PersistedDocument>>,
    last_saved: &mut Option<String>,
) {
    let Some(document) = document else {
        return;
    };
    if last_saved.as_deref() == Some(document.content_hash.as_str()) {
        debug!(id = %document.id, "snapshot unchanged, skipping save");
        return;
    }
    match sink.save(&document).await {
        Ok(()) => *last_saved = Some(document.content_hash.clone()),
        Err(err) => warn!(id = %document.id, error = %err, "autosave failed"),
    }
}
