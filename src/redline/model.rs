use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Store-assigned suggestion id, stable for the life of the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SuggestionId(pub u64);

impl fmt::Display for SuggestionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SuggestionType {
    Grammar,
    Spelling,
    Punctuation,
    Style,
    Citation,
    Clarity,
    #[default]
    Other,
}

/// Lenient: model-supplied type labels vary, and anything unrecognised is
/// [`SuggestionType::Other`].
impl FromStr for SuggestionType {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_ascii_lowercase().as_str() {
            "grammar" => SuggestionType::Grammar,
            "spelling" | "typo" => SuggestionType::Spelling,
            "punctuation" => SuggestionType::Punctuation,
            "style" => SuggestionType::Style,
            "citation" | "citations" => SuggestionType::Citation,
            "clarity" => SuggestionType::Clarity,
            _ => SuggestionType::Other,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    #[default]
    Warning,
    Info,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SuggestionStatus {
    #[default]
    Pending,
    Accepted,
    Rejected,
    Modified,
}

impl SuggestionStatus {
    pub fn is_pending(self) -> bool {
        self == SuggestionStatus::Pending
    }
}

impl fmt::Display for SuggestionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SuggestionStatus::Pending => "pending",
            SuggestionStatus::Accepted => "accepted",
            SuggestionStatus::Rejected => "rejected",
            SuggestionStatus::Modified => "modified",
        };
        f.write_str(name)
    }
}

/// A proposed edit addressed by an absolute byte range in the current
/// content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RedlineSuggestion {
    pub id: SuggestionId,
    #[serde(rename = "type")]
    pub kind: SuggestionType,
    pub severity: Severity,
    pub original_text: String,
    pub suggested_text: String,
    pub explanation: String,
    #[serde(rename = "startPos")]
    pub start: usize,
    #[serde(rename = "endPos")]
    pub end: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paragraph_id: Option<String>,
    pub status: SuggestionStatus,
    pub confidence: f32,
    /// User-supplied replacement, set when the status is `modified`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified_text: Option<String>,
}

impl RedlineSuggestion {
    pub fn range(&self) -> std::ops::Range<usize> {
        self.start..self.end
    }
}

/// Everything a caller supplies for a new suggestion; the store assigns the
/// id and the initial `pending` status.
#[derive(Debug, Clone, PartialEq)]
pub struct NewSuggestion {
    pub kind: SuggestionType,
    pub severity: Severity,
    pub original_text: String,
    pub suggested_text: String,
    pub explanation: String,
    pub start: usize,
    pub end: usize,
    pub paragraph_id: Option<String>,
    pub confidence: f32,
}

impl NewSuggestion {
    pub fn new(
        start: usize,
        end: usize,
        original_text: impl Into<String>,
        suggested_text: impl Into<String>,
    ) -> Self {
        Self {
            kind: SuggestionType::default(),
            severity: Severity::default(),
            original_text: original_text.into(),
            suggested_text: suggested_text.into(),
            explanation: String::new(),
            start,
            end,
            paragraph_id: None,
            confidence: 1.0,
        }
    }

    pub fn kind(mut self, kind: SuggestionType) -> Self {
        self.kind = kind;
        self
    }

    pub fn severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    pub fn explanation(mut self, explanation: impl Into<String>) -> Self {
        self.explanation = explanation.into();
        self
    }

    pub fn paragraph(mut self, paragraph_id: impl Into<String>) -> Self {
        self.paragraph_id = Some(paragraph_id.into());
        self
    }

    pub fn confidence(mut self, confidence: f32) -> Self {
        self.confidence = confidence.clamp(0.0, 1.0);
        self
    }

    pub(crate) fn into_suggestion(self, id: SuggestionId) -> RedlineSuggestion {
        RedlineSuggestion {
            id,
            kind: self.kind,
            severity: self.severity,
            original_text: self.original_text,
            suggested_text: self.suggested_text,
            explanation: self.explanation,
            start: self.start,
            end: self.end,
            paragraph_id: self.paragraph_id,
            status: SuggestionStatus::Pending,
            confidence: self.confidence,
            modified_text: None,
        }
    }
}

/// Derived counts; never stored independently of the suggestions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentMetadata {
    pub total_suggestions: usize,
    /// Accepted plus modified
    pub accepted_suggestions: usize,
    pub rejected_suggestions: usize,
    pub last_modified: DateTime<Utc>,
}

impl DocumentMetadata {
    pub fn compute<'a>(
        suggestions: impl IntoIterator<Item = &'a RedlineSuggestion>,
        last_modified: DateTime<Utc>,
    ) -> Self {
        let mut metadata = Self {
            total_suggestions: 0,
            accepted_suggestions: 0,
            rejected_suggestions: 0,
            last_modified,
        };
        for suggestion in suggestions {
            metadata.total_suggestions += 1;
            match suggestion.status {
                SuggestionStatus::Accepted | SuggestionStatus::Modified => {
                    metadata.accepted_suggestions += 1
                }
                SuggestionStatus::Rejected => metadata.rejected_suggestions += 1,
                SuggestionStatus::Pending => {}
            }
        }
        metadata
    }

    pub fn pending_suggestions(&self) -> usize {
        self.total_suggestions - self.accepted_suggestions - self.rejected_suggestions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lenient_type_parsing() {
        assert_eq!("Grammar".parse::<SuggestionType>().unwrap(), SuggestionType::Grammar);
        assert_eq!(" citations ".parse::<SuggestionType>().unwrap(), SuggestionType::Citation);
        assert_eq!("tone".parse::<SuggestionType>().unwrap(), SuggestionType::Other);
    }

    #[test]
    fn metadata_counts_modified_as_accepted() {
        let mut suggestions: Vec<_> = (0..4)
            .map(|i| NewSuggestion::new(i, i + 1, "a", "b").into_suggestion(SuggestionId(i as u64)))
            .collect();
        suggestions[0].status = SuggestionStatus::Accepted;
        suggestions[1].status = SuggestionStatus::Modified;
        suggestions[2].status = SuggestionStatus::Rejected;

        let metadata = DocumentMetadata::compute(&suggestions, Utc::now());
        assert_eq!(metadata.total_suggestions, 4);
        assert_eq!(metadata.accepted_suggestions, 2);
        assert_eq!(metadata.rejected_suggestions, 1);
        assert_eq!(metadata.pending_suggestions(), 1);
    }

    #[test]
    fn serializes_with_wire_names() {
        let suggestion = NewSuggestion::new(3, 7, "teh", "the")
            .kind(SuggestionType::Spelling)
            .into_suggestion(SuggestionId(1));
        let json = serde_json::to_value(&suggestion).unwrap();
        assert_eq!(json["type"], "spelling");
        assert_eq!(json["startPos"], 3);
        assert_eq!(json["endPos"], 7);
        assert_eq!(json["originalText"], "teh");
        assert_eq!(json["status"], "pending");
    }
}
