//! Redline suggestions and their lifecycle.
//!
//! A suggestion starts `pending` and ends `accepted`, `rejected` or
//! `modified`. Accepting or modifying splices text into the document's
//! current content and shifts every suggestion positioned after the edit;
//! rejecting touches nothing but the status.

pub mod events;
pub mod filter;
pub mod handle;
pub mod model;
pub mod shift;
pub mod store;

pub use events::{RedlineEvent, RedlineListener};
pub use filter::{apply_filters, SuggestionFilter};
pub use handle::DocumentHandle;
pub use model::{
    DocumentMetadata, NewSuggestion, RedlineSuggestion, Severity, SuggestionId, SuggestionStatus,
    SuggestionType,
};
pub use shift::shift_offsets;
pub use store::{Navigation, RedlineStore, SuggestionDefaults};

use crate::edit::EditError;
use crate::locator::LocateError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RedlineError {
    #[error("suggestion {id} not found")]
    NotFound { id: SuggestionId },

    #[error("suggestion {id} is already {status}")]
    NotPending {
        id: SuggestionId,
        status: SuggestionStatus,
    },

    #[error("suggestion {id} no longer matches the document: {source}")]
    StaleRange {
        id: SuggestionId,
        #[source]
        source: EditError,
    },

    #[error("invalid suggestion range: {0}")]
    InvalidRange(#[from] EditError),

    #[error(transparent)]
    Locate(#[from] LocateError),
}
