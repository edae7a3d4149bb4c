//! Paragraph anchoring.
//!
//! Inserts stable `⟦P-NNNNN⟧` markers in front of every qualifying paragraph
//! so that a downstream model can address a paragraph by id and a local
//! offset. The anchor map built here is the only bridge between those local
//! offsets and absolute positions, so it is built once and never mutated.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Range;
use std::str::FromStr;
use thiserror::Error;
use tracing::debug;

pub const ANCHOR_OPEN: &str = "⟦";
pub const ANCHOR_CLOSE: &str = "⟧";
pub const ANCHOR_PREFIX: &str = "P-";
pub const ANCHOR_DIGITS: usize = 5;

/// Byte length of one anchor token (`⟦` and `⟧` are three bytes each).
pub const TOKEN_LEN: usize =
    ANCHOR_OPEN.len() + ANCHOR_PREFIX.len() + ANCHOR_DIGITS + ANCHOR_CLOSE.len();

/// Paragraphs whose trimmed length is below this many chars get no anchor.
pub const DEFAULT_MIN_PARAGRAPH_CHARS: usize = 10;

const MAX_ANCHOR_ID: u32 = 99_999;

static TOKEN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"⟦P-(\d{5})⟧").expect("anchor token regex is valid"));

static PARAGRAPH_BREAK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:\r?\n){2,}").expect("paragraph break regex is valid"));

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AnchorError {
    #[error("text already contains {count} anchor tokens; refusing to anchor twice")]
    AlreadyAnchored { count: usize },

    #[error("document has more than {max} anchorable paragraphs")]
    Overflow { max: u32 },

    #[error("anchor sequence broken at byte {offset}: expected {expected}, found {found}")]
    Malformed {
        offset: usize,
        expected: AnchorId,
        found: String,
    },

    #[error("invalid anchor id: {0:?}")]
    InvalidId(String),
}

/// Numeric anchor id, rendered as `P-00001`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AnchorId(u32);

impl AnchorId {
    pub fn new(value: u32) -> Result<Self, AnchorError> {
        if value == 0 || value > MAX_ANCHOR_ID {
            return Err(AnchorError::InvalidId(value.to_string()));
        }
        Ok(Self(value))
    }

    pub fn value(self) -> u32 {
        self.0
    }

    /// The full token as it appears in anchored text.
    pub fn token(self) -> String {
        format!("{ANCHOR_OPEN}{self}{ANCHOR_CLOSE}")
    }
}

impl fmt::Display for AnchorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{ANCHOR_PREFIX}{:0width$}", self.0, width = ANCHOR_DIGITS)
    }
}

/// Accepts `P-00001`, `⟦P-00001⟧` and unpadded forms such as `P-1`.
impl FromStr for AnchorId {
    type Err = AnchorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let inner = trimmed
            .strip_prefix(ANCHOR_OPEN)
            .and_then(|rest| rest.strip_suffix(ANCHOR_CLOSE))
            .unwrap_or(trimmed);
        let digits = inner
            .strip_prefix(ANCHOR_PREFIX)
            .ok_or_else(|| AnchorError::InvalidId(s.to_string()))?;
        if digits.is_empty()
            || digits.len() > ANCHOR_DIGITS
            || !digits.bytes().all(|b| b.is_ascii_digit())
        {
            return Err(AnchorError::InvalidId(s.to_string()));
        }
        let value = digits
            .parse::<u32>()
            .map_err(|_| AnchorError::InvalidId(s.to_string()))?;
        AnchorId::new(value).map_err(|_| AnchorError::InvalidId(s.to_string()))
    }
}

impl TryFrom<String> for AnchorId {
    type Error = AnchorError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<AnchorId> for String {
    fn from(id: AnchorId) -> Self {
        id.to_string()
    }
}

/// Location of one anchor inside the anchored text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnchorEntry {
    pub id: AnchorId,
    /// Index of the paragraph among all paragraphs, anchored or not
    pub paragraph_index: usize,
    /// Byte offset of the token itself
    pub token_offset: usize,
    /// Byte offset of the paragraph content, right after the token
    pub offset: usize,
}

/// Immutable id → position index over one anchored text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnchorMap {
    entries: Vec<AnchorEntry>,
    text_len: usize,
}

impl AnchorMap {
    /// Rebuild the map from text that already carries anchor tokens.
    ///
    /// Ids must start at 1 and increase by exactly one per token.
    pub fn scan(text: &str) -> Result<Self, AnchorError> {
        let break_ends: Vec<usize> = PARAGRAPH_BREAK.find_iter(text).map(|m| m.end()).collect();
        let mut entries = Vec::new();

        for caps in TOKEN_RE.captures_iter(text) {
            let Some(whole) = caps.get(0) else {
                continue;
            };
            let expected = AnchorId(entries.len() as u32 + 1);
            let found = &caps[1];
            if found.parse::<u32>().ok() != Some(expected.0) {
                return Err(AnchorError::Malformed {
                    offset: whole.start(),
                    expected,
                    found: whole.as_str().to_string(),
                });
            }
            entries.push(AnchorEntry {
                id: expected,
                paragraph_index: break_ends.partition_point(|&end| end <= whole.start()),
                token_offset: whole.start(),
                offset: whole.end(),
            });
        }

        Ok(Self {
            entries,
            text_len: text.len(),
        })
    }

    pub fn get(&self, id: AnchorId) -> Option<&AnchorEntry> {
        self.entries
            .get(id.0 as usize - 1)
            .filter(|entry| entry.id == id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &AnchorEntry> {
        self.entries.iter()
    }

    /// Byte range a correction addressed to `id` may touch: from the
    /// paragraph content start up to the next token (or end of text).
    pub fn paragraph_range(&self, id: AnchorId) -> Option<Range<usize>> {
        let idx = id.0 as usize - 1;
        let entry = self.get(id)?;
        let end = self
            .entries
            .get(idx + 1)
            .map_or(self.text_len, |next| next.token_offset);
        Some(entry.offset..end)
    }

    /// Translate a position in the anchored text into the same position in
    /// the text with every token removed. Positions inside a token collapse
    /// to the token's start.
    pub fn to_clean_offset(&self, anchored_pos: usize) -> usize {
        let before = self
            .entries
            .partition_point(|entry| entry.offset <= anchored_pos);
        let mut clean = anchored_pos - before * TOKEN_LEN;
        if let Some(next) = self.entries.get(before) {
            if anchored_pos > next.token_offset {
                clean -= anchored_pos - next.token_offset;
            }
        }
        clean
    }
}

/// Text with anchor tokens interleaved, together with its anchor map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnchoredText {
    text: String,
    map: AnchorMap,
}

impl AnchoredText {
    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn map(&self) -> &AnchorMap {
        &self.map
    }

    pub fn into_parts(self) -> (String, AnchorMap) {
        (self.text, self.map)
    }

    /// The original, un-anchored text.
    pub fn clean_text(&self) -> String {
        strip_anchors(&self.text)
    }
}

/// Anchor raw text.
///
/// Refuses text that already carries anchor tokens; see [`ensure_anchored`]
/// for the no-op variant.
pub fn anchor_text(raw: &str, min_paragraph_chars: usize) -> Result<AnchoredText, AnchorError> {
    let existing = count_anchors(raw);
    if existing > 0 {
        return Err(AnchorError::AlreadyAnchored { count: existing });
    }

    let breaks: Vec<Range<usize>> = PARAGRAPH_BREAK.find_iter(raw).map(|m| m.range()).collect();
    let single_paragraph = breaks.is_empty();

    let mut text = String::with_capacity(raw.len() + (breaks.len() + 1) * TOKEN_LEN);
    let mut entries = Vec::new();
    let mut cursor = 0;

    for (paragraph_index, separator) in breaks
        .iter()
        .map(Some)
        .chain(std::iter::once(None))
        .enumerate()
    {
        let segment_end = separator.map_or(raw.len(), |sep| sep.start);
        let segment = &raw[cursor..segment_end];
        let trimmed = segment.trim();

        let qualifies = if single_paragraph {
            !trimmed.is_empty()
        } else {
            trimmed.chars().count() >= min_paragraph_chars
        };

        if qualifies {
            let value = entries.len() as u32 + 1;
            if value > MAX_ANCHOR_ID {
                return Err(AnchorError::Overflow { max: MAX_ANCHOR_ID });
            }
            let id = AnchorId(value);
            let token_offset = text.len();
            text.push_str(&id.token());
            entries.push(AnchorEntry {
                id,
                paragraph_index,
                token_offset,
                offset: text.len(),
            });
        }

        text.push_str(segment);
        if let Some(sep) = separator {
            text.push_str(&raw[sep.clone()]);
            cursor = sep.end;
        }
    }

    debug!(
        anchors = entries.len(),
        paragraphs = breaks.len() + 1,
        "anchored document"
    );

    let map = AnchorMap {
        entries,
        text_len: text.len(),
    };
    Ok(AnchoredText { text, map })
}

/// Anchor raw text, or adopt the existing anchors if it is already anchored.
pub fn ensure_anchored(
    text: &str,
    min_paragraph_chars: usize,
) -> Result<AnchoredText, AnchorError> {
    if count_anchors(text) == 0 {
        return anchor_text(text, min_paragraph_chars);
    }
    let map = AnchorMap::scan(text)?;
    debug!(anchors = map.len(), "adopted existing anchors");
    Ok(AnchoredText {
        text: text.to_string(),
        map,
    })
}

pub fn count_anchors(text: &str) -> usize {
    TOKEN_RE.find_iter(text).count()
}

/// Remove every anchor token.
pub fn strip_anchors(text: &str) -> String {
    TOKEN_RE.replace_all(text, "").into_owned()
}
