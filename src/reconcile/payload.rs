//! Parser for correction payloads returned by a model.
//!
//! The payload should be a JSON array, but models wrap it in markdown fences
//! or surround it with prose often enough that three shapes are accepted, in
//! order: a bare JSON document, the body of a fenced code block, and the
//! first JSON array embedded in the text. Whatever happens, the parser
//! returns a typed result; it never panics on model output.

use crate::anchor::AnchorId;
use crate::reconcile::Correction;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

static FENCED_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)```[A-Za-z]*[ \t]*\r?\n?(.*?)```").expect("fence regex is valid")
});

/// Where in the raw payload the correction array was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayloadSource {
    /// The payload was a JSON document on its own
    Json,
    /// The array sat inside a markdown code fence
    Fenced,
    /// The array was cut out of surrounding text
    Extracted,
}

/// Whole-payload failure; the batch counts as zero corrections.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseFailure {
    #[error("correction payload is empty")]
    Empty,

    #[error("correction payload is not valid JSON: {message}")]
    InvalidJson { message: String },

    #[error("correction payload top level is {found}, expected an array")]
    NotAnArray { found: &'static str },
}

/// Why a single payload item could not become a [`Correction`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemRejection {
    Malformed { reason: String },
    UnknownAnchor { anchor: String },
    OffsetOutOfRange { start: i64, end: i64 },
}

pub type PayloadItem = Result<Correction, ItemRejection>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedPayload {
    pub source: PayloadSource,
    pub items: Vec<PayloadItem>,
}

/// Field layout of one array element, everything optional so that missing
/// fields surface as rejections rather than deserialization errors.
/// Informational fields accept any JSON type and are coerced leniently.
#[derive(Debug, Deserialize)]
struct RawCorrection {
    anchor: Option<String>,
    start_offset: Option<Value>,
    end_offset: Option<Value>,
    #[serde(rename = "type")]
    kind: Option<Value>,
    status: Option<Value>,
    errors: Option<Value>,
    orig: Option<String>,
    suggested: Option<String>,
    explanation: Option<Value>,
}

pub fn parse_payload(raw: &str) -> Result<ParsedPayload, ParseFailure> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ParseFailure::Empty);
    }

    let direct_error = match serde_json::from_str::<Value>(trimmed) {
        Ok(value) => return from_value(value, PayloadSource::Json),
        Err(err) => err,
    };

    if let Some(body) = FENCED_RE.captures(trimmed).and_then(|caps| caps.get(1)) {
        if let Ok(value) = serde_json::from_str::<Value>(body.as_str().trim()) {
            return from_value(value, PayloadSource::Fenced);
        }
    }

    if let Some(value) = embedded_array(trimmed) {
        return from_value(value, PayloadSource::Extracted);
    }

    Err(ParseFailure::InvalidJson {
        message: direct_error.to_string(),
    })
}

/// First array that parses from some `[` in `text`, ignoring trailing prose.
///
/// Arrays holding at least one object win over bare-value arrays, so a
/// footnote marker like `[1]` ahead of the payload is skipped.
fn embedded_array(text: &str) -> Option<Value> {
    let mut fallback = None;
    for (open, _) in text.match_indices('[') {
        let mut stream = serde_json::Deserializer::from_str(&text[open..]).into_iter::<Value>();
        let Some(Ok(Value::Array(items))) = stream.next() else {
            continue;
        };
        if items.iter().any(Value::is_object) {
            return Some(Value::Array(items));
        }
        fallback.get_or_insert(Value::Array(items));
    }
    fallback
}

fn from_value(value: Value, source: PayloadSource) -> Result<ParsedPayload, ParseFailure> {
    match value {
        Value::Array(items) => Ok(ParsedPayload {
            source,
            items: items.into_iter().map(parse_item).collect(),
        }),
        other => Err(ParseFailure::NotAnArray {
            found: value_kind(&other),
        }),
    }
}

fn parse_item(value: Value) -> PayloadItem {
    if !value.is_object() {
        return Err(ItemRejection::Malformed {
            reason: format!("item is {}, expected an object", value_kind(&value)),
        });
    }
    let raw: RawCorrection =
        serde_json::from_value(value).map_err(|err| ItemRejection::Malformed {
            reason: err.to_string(),
        })?;

    let anchor_raw = required(raw.anchor, "anchor")?;
    let start = offset_field(raw.start_offset, "start_offset")?;
    let end = offset_field(raw.end_offset, "end_offset")?;
    let original = required(raw.orig, "orig")?;
    let suggested = required(raw.suggested, "suggested")?;

    let anchor = anchor_raw
        .parse::<AnchorId>()
        .map_err(|_| ItemRejection::UnknownAnchor { anchor: anchor_raw })?;

    if start < 0 || end < start {
        return Err(ItemRejection::OffsetOutOfRange { start, end });
    }

    let explanation = text_field(raw.explanation).or_else(|| raw.errors.and_then(errors_field));

    Ok(Correction {
        anchor,
        start_offset: start as usize,
        end_offset: end as usize,
        original,
        suggested,
        explanation,
        kind: text_field(raw.kind),
        status: text_field(raw.status),
    })
}

fn required(field: Option<String>, name: &str) -> Result<String, ItemRejection> {
    field.ok_or_else(|| ItemRejection::Malformed {
        reason: format!("missing field `{name}`"),
    })
}

/// Offsets arrive as integers, but integral floats and numeric strings are
/// tolerated.
fn offset_field(field: Option<Value>, name: &str) -> Result<i64, ItemRejection> {
    let malformed = |detail: &str| ItemRejection::Malformed {
        reason: format!("field `{name}` {detail}"),
    };
    match field {
        None | Some(Value::Null) => Err(malformed("is missing")),
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64))
            .ok_or_else(|| malformed("is not an integer")),
        Some(Value::String(s)) => s
            .trim()
            .parse::<i64>()
            .map_err(|_| malformed("is not an integer")),
        Some(_) => Err(malformed("is not an integer")),
    }
}

/// Strings pass through, numbers and booleans are stringified, anything
/// else is dropped.
fn text_field(field: Option<Value>) -> Option<String> {
    match field? {
        Value::String(s) if !s.trim().is_empty() => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// `errors` is normally an array, but a lone string or object is read as a
/// one-element list.
fn errors_field(errors: Value) -> Option<String> {
    match errors {
        Value::Array(items) => join_errors(&items),
        single @ (Value::String(_) | Value::Object(_)) => join_errors(&[single]),
        _ => None,
    }
}

fn join_errors(errors: &[Value]) -> Option<String> {
    let parts: Vec<&str> = errors
        .iter()
        .filter_map(|error| match error {
            Value::String(s) => Some(s.as_str()),
            Value::Object(fields) => ["explanation", "message", "description"]
                .iter()
                .find_map(|key| fields.get(*key).and_then(Value::as_str)),
            _ => None,
        })
        .filter(|s| !s.trim().is_empty())
        .collect();

    if parts.is_empty() {
        None
    } else {
        Some(parts.join("; "))
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
