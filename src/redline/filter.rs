use super::model::{RedlineSuggestion, Severity, SuggestionStatus, SuggestionType};
use serde::{Deserialize, Serialize};

/// View predicate over the suggestion set. Never mutates anything.
///
/// `kind`/`severity` of `None` mean "any". Pending and modified suggestions
/// are always shown once they pass the type and severity checks; accepted
/// and rejected ones only when their flag is set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SuggestionFilter {
    pub kind: Option<SuggestionType>,
    pub severity: Option<Severity>,
    pub show_accepted: bool,
    pub show_rejected: bool,
}

impl Default for SuggestionFilter {
    fn default() -> Self {
        Self {
            kind: None,
            severity: None,
            show_accepted: true,
            show_rejected: true,
        }
    }
}

impl SuggestionFilter {
    /// Only what still needs a decision.
    pub fn pending_only() -> Self {
        Self {
            show_accepted: false,
            show_rejected: false,
            ..Self::default()
        }
    }

    pub fn matches(&self, suggestion: &RedlineSuggestion) -> bool {
        if self.kind.is_some_and(|kind| kind != suggestion.kind) {
            return false;
        }
        if self
            .severity
            .is_some_and(|severity| severity != suggestion.severity)
        {
            return false;
        }
        match suggestion.status {
            SuggestionStatus::Accepted => self.show_accepted,
            SuggestionStatus::Rejected => self.show_rejected,
            SuggestionStatus::Pending | SuggestionStatus::Modified => true,
        }
    }
}

pub fn apply_filters<'a>(
    suggestions: impl IntoIterator<Item = &'a RedlineSuggestion>,
    filter: &SuggestionFilter,
) -> Vec<&'a RedlineSuggestion> {
    suggestions
        .into_iter()
        .filter(|suggestion| filter.matches(suggestion))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::redline::model::{NewSuggestion, SuggestionId};

    fn suggestion(
        id: u64,
        kind: SuggestionType,
        severity: Severity,
        status: SuggestionStatus,
    ) -> RedlineSuggestion {
        let mut s = NewSuggestion::new(0, 1, "a", "b")
            .kind(kind)
            .severity(severity)
            .into_suggestion(SuggestionId(id));
        s.status = status;
        s
    }

    #[test]
    fn filters_by_type_severity_and_status() {
        let all = vec![
            suggestion(1, SuggestionType::Grammar, Severity::Error, SuggestionStatus::Pending),
            suggestion(2, SuggestionType::Grammar, Severity::Info, SuggestionStatus::Accepted),
            suggestion(3, SuggestionType::Citation, Severity::Error, SuggestionStatus::Rejected),
            suggestion(4, SuggestionType::Grammar, Severity::Error, SuggestionStatus::Modified),
        ];

        let ids = |filter: SuggestionFilter| -> Vec<u64> {
            apply_filters(&all, &filter).iter().map(|s| s.id.0).collect()
        };

        assert_eq!(ids(SuggestionFilter::default()), vec![1, 2, 3, 4]);
        assert_eq!(ids(SuggestionFilter::pending_only()), vec![1, 4]);
        assert_eq!(
            ids(SuggestionFilter {
                kind: Some(SuggestionType::Grammar),
                severity: Some(Severity::Error),
                ..SuggestionFilter::default()
            }),
            vec![1, 4]
        );
        assert_eq!(
            ids(SuggestionFilter {
                show_accepted: false,
                ..SuggestionFilter::default()
            }),
            vec![1, 3, 4]
        );
    }
}
