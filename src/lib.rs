//! Redline Core: anchored correction reconciliation and redline review
//!
//! Lands model-proposed corrections on the exact character range of a live
//! document, or refuses them. Corrections arrive addressed by a paragraph
//! anchor and a local offset; suggestions are kept as tracked edits with an
//! accept/reject/modify lifecycle.
//!
//! # Architecture
//!
//! All content mutations compile down to a single primitive: [`TextEdit`], a
//! verified byte-span replacement. The interesting work is in acquiring the
//! span: anchors ([`anchor`]), plain-text/HTML position mapping
//! ([`html`]), fuzzy location ([`locator`]) and reconciliation
//! ([`reconcile`]).
//!
//! # Safety
//!
//! - Every edit verifies its expected before-text before applying
//! - Overlapping corrections are skipped, never merged
//! - Offsets are byte offsets checked against char boundaries
//! - Malformed model output is reported per item, never panics
//! - Atomic document writes (tempfile + fsync + rename)
//!
//! # Example
//!
//! ```
//! use redline_core::{anchor_text, Reconciler, DEFAULT_MIN_PARAGRAPH_CHARS};
//!
//! let anchored = anchor_text(
//!     "Plaintiff alleges fraud.\n\nDefendant denies all claims.",
//!     DEFAULT_MIN_PARAGRAPH_CHARS,
//! )
//! .unwrap();
//!
//! let payload = r#"[{"anchor":"P-00001","start_offset":0,"end_offset":9,
//!                    "orig":"Plaintiff","suggested":"Plaintiffs"}]"#;
//! let report = Reconciler::default()
//!     .reconcile_payload(&anchored, payload)
//!     .unwrap();
//!
//! assert_eq!(report.applied_count(), 1);
//! assert!(report.text.contains("Plaintiffs alleges fraud."));
//! ```

pub mod anchor;
pub mod cache;
pub mod config;
pub mod edit;
pub mod html;
pub mod locator;
pub mod persist;
pub mod reconcile;
pub mod redline;

// Re-exports
pub use anchor::{
    anchor_text, ensure_anchored, strip_anchors, AnchorEntry, AnchorError, AnchorId, AnchorMap,
    AnchoredText, DEFAULT_MIN_PARAGRAPH_CHARS,
};
pub use config::{load_from_path, load_from_str, ConfigError, RedlineConfig};
pub use edit::{EditError, EditVerification, TextEdit};
pub use html::{extract_plain_text, PositionMap, PositionMapEntry};
pub use locator::{find_text_in_html, LocateError, LocateStrategy, Located, TextLocator, TextRange};
pub use persist::{AutoSaver, DocumentSink, JsonFileSink, PersistError, PersistedDocument};
pub use reconcile::{
    Correction, CorrectionOutcome, OffsetUnit, Outcome, ParseFailure, ReconcileError,
    ReconcileReport, Reconciler,
};
pub use redline::{
    DocumentHandle, Navigation, NewSuggestion, RedlineError, RedlineStore, RedlineSuggestion,
    SuggestionFilter, SuggestionId, SuggestionStatus,
};
