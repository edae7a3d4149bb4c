//! Correction reconciliation.
//!
//! Corrections address text by anchor id plus a local offset pair. This
//! module resolves them to absolute ranges in the anchored text, checks that
//! each range still holds exactly the text the correction claims to replace,
//! and applies the survivors in ascending order with a running offset delta.
//!
//! # Hard Rules
//!
//! 1. **Exact before-text**: a correction is applied only if the resolved
//!    range holds `original` byte-for-byte.
//! 2. **No double application**: a correction that overlaps one already
//!    applied is skipped, never merged.
//! 3. **Per-item failure is normal**: only an unparseable payload fails the
//!    whole batch.

pub mod applicator;
pub mod payload;

pub use applicator::{Reconciler, Resolved};
pub use payload::{parse_payload, ItemRejection, ParseFailure, ParsedPayload, PayloadSource};

use crate::anchor::{AnchorError, AnchorId, AnchorMap};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One model-proposed replacement, addressed relative to an anchor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Correction {
    pub anchor: AnchorId,
    /// Local start offset from the paragraph content start
    pub start_offset: usize,
    /// Local end offset (exclusive)
    pub end_offset: usize,
    pub original: String,
    pub suggested: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

impl Correction {
    pub fn new(
        anchor: AnchorId,
        start_offset: usize,
        end_offset: usize,
        original: impl Into<String>,
        suggested: impl Into<String>,
    ) -> Self {
        Self {
            anchor,
            start_offset,
            end_offset,
            original: original.into(),
            suggested: suggested.into(),
            explanation: None,
            kind: None,
            status: None,
        }
    }

    pub fn with_explanation(mut self, explanation: impl Into<String>) -> Self {
        self.explanation = Some(explanation.into());
        self
    }

    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = Some(kind.into());
        self
    }
}

/// How local offsets in a payload are counted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OffsetUnit {
    /// Unicode scalar values, as models count them
    #[default]
    Chars,
    /// UTF-8 bytes
    Bytes,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReconcilerConfig {
    pub offset_unit: OffsetUnit,
}

/// Per-item result of a reconciliation pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    /// Applied; `start..end` is where the suggested text now sits
    Applied { start: usize, end: usize },
    /// Valid, but `original` equals `suggested`
    NoChange,
    /// The resolved range does not hold `original`
    ValidationMismatch { expected: String, found: String },
    AnchorNotFound { anchor: String },
    /// Overlaps the already-applied item at this input index
    ConflictingRange { conflicts_with: usize },
    /// Offsets are negative, inverted, off a char boundary or outside the
    /// anchor's paragraph
    OffsetOutOfRange { start: i64, end: i64 },
    Malformed { reason: String },
}

impl Outcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, Outcome::Applied { .. })
    }

    pub fn is_failure(&self) -> bool {
        !matches!(self, Outcome::Applied { .. } | Outcome::NoChange)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Outcome::Applied { .. } => "applied",
            Outcome::NoChange => "no-change",
            Outcome::ValidationMismatch { .. } => "validation-mismatch",
            Outcome::AnchorNotFound { .. } => "anchor-not-found",
            Outcome::ConflictingRange { .. } => "conflicting-range",
            Outcome::OffsetOutOfRange { .. } => "offset-out-of-range",
            Outcome::Malformed { .. } => "malformed",
        }
    }
}

impl From<ItemRejection> for Outcome {
    fn from(rejection: ItemRejection) -> Self {
        match rejection {
            ItemRejection::Malformed { reason } => Outcome::Malformed { reason },
            ItemRejection::UnknownAnchor { anchor } => Outcome::AnchorNotFound { anchor },
            ItemRejection::OffsetOutOfRange { start, end } => {
                Outcome::OffsetOutOfRange { start, end }
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CorrectionOutcome {
    /// Position of the item in the input batch
    pub index: usize,
    pub anchor: Option<String>,
    #[serde(flatten)]
    pub outcome: Outcome,
}

/// Result of one reconciliation pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    /// Corrected anchored text
    pub text: String,
    /// One outcome per input item, in input order
    pub outcomes: Vec<CorrectionOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<PayloadSource>,
}

impl ReconcileReport {
    pub fn applied_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.outcome.is_applied()).count()
    }

    pub fn failed_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.outcome.is_failure()).count()
    }

    /// Anchor positions in the corrected text.
    pub fn anchors(&self) -> Result<AnchorMap, AnchorError> {
        AnchorMap::scan(&self.text)
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReconcileError {
    #[error(transparent)]
    Parse(#[from] ParseFailure),
}
