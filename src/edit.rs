use std::ops::Range;
use thiserror::Error;
use xxhash_rust::xxh3::xxh3_64;

/// The fundamental mutation primitive: byte-span replacement with verification.
///
/// Accepting a suggestion, applying a user modification and applying a
/// reconciled correction all compile down to this one primitive. The span is
/// only replaced when the text currently occupying it passes verification.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "TextEdit does nothing until apply_to() is called"]
pub struct TextEdit {
    /// Starting byte offset (inclusive)
    pub start: usize,
    /// Ending byte offset (exclusive)
    pub end: usize,
    /// New text to insert at [start, end)
    pub new_text: String,
    /// Verification of what we expect to find before applying
    pub expected_before: EditVerification,
}

/// Verification strategy for edit safety.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditVerification {
    /// Exact text match required
    ExactMatch(String),
    /// xxh3 hash of expected text (faster for large spans)
    Hash(u64),
}

impl EditVerification {
    /// Check if the provided text matches the verification criteria.
    pub fn matches(&self, text: &str) -> bool {
        match self {
            EditVerification::ExactMatch(expected) => text == expected,
            EditVerification::Hash(expected_hash) => xxh3_64(text.as_bytes()) == *expected_hash,
        }
    }

    /// Create verification from text, using hash for text over 1KB.
    pub fn from_text(text: &str) -> Self {
        if text.len() > 1024 {
            EditVerification::Hash(xxh3_64(text.as_bytes()))
        } else {
            EditVerification::ExactMatch(text.to_string())
        }
    }

    fn describe(&self) -> String {
        match self {
            EditVerification::ExactMatch(text) => format!("{text:?}"),
            EditVerification::Hash(hash) => format!("xxh3:{hash:016x}"),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EditError {
    #[error("before-text verification failed at {start}..{end}: expected {expected}, found {found:?}")]
    BeforeTextMismatch {
        start: usize,
        end: usize,
        expected: String,
        found: String,
    },

    #[error("invalid byte range: [{start}, {end}) in text of length {len}")]
    InvalidRange { start: usize, end: usize, len: usize },

    #[error("byte offset {offset} is not on a character boundary")]
    NotCharBoundary { offset: usize },
}

/// Outcome of a successfully applied edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedEdit {
    /// Range now occupied by the inserted text
    pub range: Range<usize>,
    /// Length change introduced by the edit, in bytes
    pub delta: isize,
}

impl TextEdit {
    /// Create a new edit with automatic verification generation.
    pub fn new(
        start: usize,
        end: usize,
        new_text: impl Into<String>,
        expected_before: impl AsRef<str>,
    ) -> Self {
        Self {
            start,
            end,
            new_text: new_text.into(),
            expected_before: EditVerification::from_text(expected_before.as_ref()),
        }
    }

    /// Length change this edit introduces once applied.
    pub fn delta(&self) -> isize {
        self.new_text.len() as isize - (self.end - self.start) as isize
    }

    /// Validate the edit against the current content.
    ///
    /// Returns the current text at [start, end) if validation succeeds.
    pub fn validate<'a>(&self, content: &'a str) -> Result<&'a str, EditError> {
        check_range(content, self.start, self.end)?;

        let current = &content[self.start..self.end];
        if !self.expected_before.matches(current) {
            return Err(EditError::BeforeTextMismatch {
                start: self.start,
                end: self.end,
                expected: self.expected_before.describe(),
                found: current.to_string(),
            });
        }

        Ok(current)
    }

    /// Apply this edit to an in-memory buffer.
    ///
    /// The buffer is left untouched when validation fails.
    pub fn apply_to(&self, content: &mut String) -> Result<AppliedEdit, EditError> {
        self.validate(content)?;
        content.replace_range(self.start..self.end, &self.new_text);

        Ok(AppliedEdit {
            range: self.start..self.start + self.new_text.len(),
            delta: self.delta(),
        })
    }
}

/// Check that `[start, end)` is an ordered, in-bounds range on char boundaries.
pub fn check_range(content: &str, start: usize, end: usize) -> Result<(), EditError> {
    if start > end || end > content.len() {
        return Err(EditError::InvalidRange {
            start,
            end,
            len: content.len(),
        });
    }
    for offset in [start, end] {
        if !content.is_char_boundary(offset) {
            return Err(EditError::NotCharBoundary { offset });
        }
    }
    Ok(())
}
