use super::model::SuggestionId;
use serde::Serialize;
use tokio::sync::mpsc::UnboundedSender;

/// Something that happened to a document's suggestions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum RedlineEvent {
    Added { id: SuggestionId },
    Accepted { id: SuggestionId, delta: isize },
    Modified { id: SuggestionId, delta: isize },
    Rejected { id: SuggestionId },
    Navigated { id: Option<SuggestionId> },
}

impl RedlineEvent {
    /// Whether the event changed document state that must be persisted.
    pub fn is_mutation(&self) -> bool {
        !matches!(self, RedlineEvent::Navigated { .. })
    }
}

/// Receives store events synchronously, in order, under the store's lock.
pub trait RedlineListener: Send + Sync {
    fn on_event(&self, event: &RedlineEvent);
}

/// Forward events into a channel; a dropped receiver is ignored.
impl RedlineListener for UnboundedSender<RedlineEvent> {
    fn on_event(&self, event: &RedlineEvent) {
        let _ = self.send(event.clone());
    }
}
