//! Plain-text ⇄ HTML coordinate translation.
//!
//! The same document exists as extracted plain text (what the model sees)
//! and as rendered HTML (what the reviewer sees). This module maps offsets
//! between the two and extracts comparable plain text from markup.

pub mod extract;
pub mod mapper;

pub use extract::{extract_plain_text, normalize_whitespace, strip_tags};
pub use mapper::{PositionMap, PositionMapEntry};
