//! Best-effort text location with a graduated fallback chain.
//!
//! Text echoed back by a model rarely matches the source byte-for-byte: case
//! drifts, whitespace is re-flowed, and in HTML the words are split by tags
//! and entities. [`TextLocator`] tries, in order:
//!
//! 1. Exact substring search
//! 2. Case-insensitive search
//! 3. Word-partial search: find a significant word, then look for the whole
//!    needle (case- and whitespace-insensitively) in a window around it
//! 4. Mapping-based search: find the needle in the plain text behind the
//!    [`PositionMap`] and map the hit back into haystack coordinates
//!
//! Each later strategy trades precision for recall. The first success wins.

pub mod matching;

use crate::cache;
use matching::{
    ceil_boundary, char_to_byte, chars_back, chars_forward, find_case_insensitive, find_loose,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Range;
use thiserror::Error;
use tracing::{debug, warn};

/// Fixed allowance for markup around a mapped span.
const MAPPED_SPAN_SLACK: usize = 32;

/// End-exclusive byte range in the haystack's coordinate space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TextRange {
    pub start: usize,
    pub end: usize,
}

impl TextRange {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn as_range(&self) -> Range<usize> {
        self.start..self.end
    }
}

impl From<Range<usize>> for TextRange {
    fn from(range: Range<usize>) -> Self {
        Self::new(range.start, range.end)
    }
}

/// Which fallback produced a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LocateStrategy {
    Exact,
    CaseInsensitive,
    WordWindow,
    PositionMap,
}

impl fmt::Display for LocateStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LocateStrategy::Exact => "exact",
            LocateStrategy::CaseInsensitive => "case-insensitive",
            LocateStrategy::WordWindow => "word-window",
            LocateStrategy::PositionMap => "position-map",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Located {
    pub range: TextRange,
    pub strategy: LocateStrategy,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LocateError {
    #[error("could not locate text: all strategies failed for {needle:?}")]
    Exhausted { needle: String },

    #[error("cannot locate an empty needle")]
    EmptyNeedle,
}

/// Tuning for the fallback chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LocatorConfig {
    /// Chars inspected on each side of a word hit
    pub window_chars: usize,
    /// Words shorter than this are too common to anchor a window
    pub min_word_chars: usize,
    /// A mapped HTML span may be at most this many times the plain match
    pub max_span_expansion: usize,
}

impl Default for LocatorConfig {
    fn default() -> Self {
        Self {
            window_chars: 50,
            min_word_chars: 3,
            max_span_expansion: 8,
        }
    }
}

/// Read-only locator; safe to share across threads and documents.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextLocator {
    config: LocatorConfig,
}

impl TextLocator {
    pub fn new(config: LocatorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &LocatorConfig {
        &self.config
    }

    /// Locate `needle` in `haystack`, searching from byte `start_from`.
    /// Returns `None` when every strategy fails.
    ///
    /// The mapping-based strategy retries from the top when nothing follows
    /// `start_from`; the others only search forward.
    pub fn locate(
        &self,
        haystack: &str,
        needle: &str,
        start_from: Option<usize>,
    ) -> Option<Located> {
        if needle.trim().is_empty() {
            return None;
        }
        let from = ceil_boundary(haystack, start_from.unwrap_or(0));

        let attempts: [(LocateStrategy, &dyn Fn() -> Option<Range<usize>>); 4] = [
            (LocateStrategy::Exact, &|| exact(haystack, needle, from)),
            (LocateStrategy::CaseInsensitive, &|| {
                find_case_insensitive(haystack, needle, from)
            }),
            (LocateStrategy::WordWindow, &|| self.word_window(haystack, needle, from)),
            (LocateStrategy::PositionMap, &|| self.mapped(haystack, needle, from)),
        ];

        for (strategy, attempt) in attempts {
            if let Some(range) = attempt() {
                debug!(%strategy, start = range.start, end = range.end, "located text");
                return Some(Located {
                    range: range.into(),
                    strategy,
                });
            }
        }

        None
    }

    /// Like [`locate`](Self::locate), but reports exhaustion as an error.
    pub fn locate_or_err(
        &self,
        haystack: &str,
        needle: &str,
        start_from: Option<usize>,
    ) -> Result<Located, LocateError> {
        if needle.trim().is_empty() {
            return Err(LocateError::EmptyNeedle);
        }
        self.locate(haystack, needle, start_from).ok_or_else(|| {
            warn!(needle_len = needle.len(), "all locator strategies exhausted");
            LocateError::Exhausted {
                needle: needle.to_string(),
            }
        })
    }

    fn word_window(&self, haystack: &str, needle: &str, from: usize) -> Option<Range<usize>> {
        let words = needle
            .split_whitespace()
            .filter(|word| word.chars().count() >= self.config.min_word_chars);

        for word in words {
            let mut search_from = from;
            while let Some(hit) = find_case_insensitive(haystack, word, search_from) {
                let lo = chars_back(haystack, hit.start, self.config.window_chars);
                let hi = chars_forward(haystack, hit.end, self.config.window_chars);
                let floor = from.saturating_sub(lo);
                if let Some(found) = find_loose(&haystack[lo..hi], needle, floor) {
                    return Some(lo + found.start..lo + found.end);
                }
                search_from = hit.end;
            }
        }

        None
    }

    fn mapped(&self, haystack: &str, needle: &str, from: usize) -> Option<Range<usize>> {
        let map = cache::position_map_for(haystack);
        let plain = map.plain_text(haystack);
        let plain_from = char_to_byte(&plain, map.first_char_from(from));
        let hit = find_loose(&plain, needle, plain_from)
            .or_else(|| find_loose(&plain, needle, 0).filter(|_| plain_from > 0))?;

        let char_start = plain[..hit.start].chars().count();
        let char_len = plain[hit.clone()].chars().count();
        let span = map.map_plain_range_to_html(char_start..char_start + char_len)?;

        let plain_len = hit.len();
        let max_len = plain_len * self.config.max_span_expansion + MAPPED_SPAN_SLACK;
        if span.is_empty() || span.len() < plain_len || span.len() > max_len {
            debug!(
                span_len = span.len(),
                plain_len, "mapped span failed sanity check"
            );
            return None;
        }
        Some(span)
    }
}

fn exact(haystack: &str, needle: &str, from: usize) -> Option<Range<usize>> {
    haystack[from..]
        .find(needle)
        .map(|offset| from + offset..from + offset + needle.len())
}

/// Locate `needle` inside rendered HTML with the default configuration.
pub fn find_text_in_html(html: &str, needle: &str) -> Option<TextRange> {
    TextLocator::default()
        .locate(html, needle, None)
        .map(|located| located.range)
}
