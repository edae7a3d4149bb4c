use super::events::{RedlineEvent, RedlineListener};
use super::filter::{apply_filters, SuggestionFilter};
use super::model::{
    DocumentMetadata, NewSuggestion, RedlineSuggestion, Severity, SuggestionId, SuggestionStatus,
};
use super::shift::shift_offsets;
use super::RedlineError;
use crate::anchor::AnchoredText;
use crate::cache;
use crate::edit::TextEdit;
use crate::locator::matching::find_loose;
use crate::locator::{Located, TextLocator};
use crate::reconcile::Resolved;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use std::fmt;
use tracing::debug;

/// Where [`RedlineStore::navigate`] should move the cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigation {
    Next,
    Prev,
    To(SuggestionId),
}

/// Values applied to suggestions created from reconciler output, which
/// carries no severity or confidence of its own.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SuggestionDefaults {
    pub severity: Severity,
    pub confidence: f32,
}

impl Default for SuggestionDefaults {
    fn default() -> Self {
        Self {
            severity: Severity::Warning,
            confidence: 0.8,
        }
    }
}

/// One document under review: an immutable baseline, the live content, and
/// an arena of suggestions addressed by stable id.
///
/// Every content mutation goes through [`TextEdit`], so a suggestion whose
/// range no longer holds its original text is refused instead of applied
/// in the wrong place.
pub struct RedlineStore {
    id: String,
    original_content: String,
    current_content: String,
    suggestions: IndexMap<SuggestionId, RedlineSuggestion>,
    next_id: u64,
    cursor: Option<SuggestionId>,
    last_modified: DateTime<Utc>,
    locator: TextLocator,
    listeners: Vec<Box<dyn RedlineListener>>,
}

impl fmt::Debug for RedlineStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedlineStore")
            .field("id", &self.id)
            .field("content_len", &self.current_content.len())
            .field("suggestions", &self.suggestions.len())
            .field("cursor", &self.cursor)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl RedlineStore {
    pub fn new(id: impl Into<String>, content: impl Into<String>) -> Self {
        let content = content.into();
        Self {
            id: id.into(),
            original_content: content.clone(),
            current_content: content,
            suggestions: IndexMap::new(),
            next_id: 1,
            cursor: None,
            last_modified: Utc::now(),
            locator: TextLocator::default(),
            listeners: Vec::new(),
        }
    }

    /// Rebuild a store from previously persisted state.
    pub fn restore(
        id: impl Into<String>,
        original_content: impl Into<String>,
        current_content: impl Into<String>,
        suggestions: impl IntoIterator<Item = RedlineSuggestion>,
        last_modified: DateTime<Utc>,
    ) -> Self {
        let suggestions: IndexMap<_, _> = suggestions.into_iter().map(|s| (s.id, s)).collect();
        let next_id = suggestions.keys().map(|id| id.0).max().unwrap_or(0) + 1;
        Self {
            id: id.into(),
            original_content: original_content.into(),
            current_content: current_content.into(),
            suggestions,
            next_id,
            cursor: None,
            last_modified,
            locator: TextLocator::default(),
            listeners: Vec::new(),
        }
    }

    pub fn with_locator(mut self, locator: TextLocator) -> Self {
        self.locator = locator;
        self
    }

    pub fn subscribe(&mut self, listener: impl RedlineListener + 'static) {
        self.listeners.push(Box::new(listener));
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn original_content(&self) -> &str {
        &self.original_content
    }

    pub fn current_content(&self) -> &str {
        &self.current_content
    }

    pub fn get(&self, id: SuggestionId) -> Option<&RedlineSuggestion> {
        self.suggestions.get(&id)
    }

    /// Suggestions in insertion order.
    pub fn suggestions(&self) -> impl Iterator<Item = &RedlineSuggestion> {
        self.suggestions.values()
    }

    pub fn len(&self) -> usize {
        self.suggestions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.suggestions.is_empty()
    }

    pub fn cursor(&self) -> Option<SuggestionId> {
        self.cursor
    }

    pub fn last_modified(&self) -> DateTime<Utc> {
        self.last_modified
    }

    /// Counts derived from the current suggestion set.
    pub fn metadata(&self) -> DocumentMetadata {
        DocumentMetadata::compute(self.suggestions.values(), self.last_modified)
    }

    /// Add a suggestion whose range already points into the current content.
    ///
    /// The range must be in bounds, on char boundaries, and hold exactly
    /// `original_text`.
    pub fn add_suggestion(&mut self, new: NewSuggestion) -> Result<SuggestionId, RedlineError> {
        TextEdit::new(new.start, new.end, "", &new.original_text).validate(&self.current_content)?;

        let id = SuggestionId(self.next_id);
        self.next_id += 1;
        debug!(%id, start = new.start, end = new.end, "added suggestion");
        self.suggestions.insert(id, new.into_suggestion(id));
        self.touch();
        self.emit(RedlineEvent::Added { id });
        Ok(id)
    }

    /// Add a finder output that carries text but no offsets.
    ///
    /// `original_text` is located in the current content (searching from
    /// `start_from`) and replaced by the exact text that was matched.
    pub fn add_located(
        &mut self,
        mut new: NewSuggestion,
        start_from: Option<usize>,
    ) -> Result<SuggestionId, RedlineError> {
        let located = self
            .locator
            .locate_or_err(&self.current_content, &new.original_text, start_from)?;
        let range = located.range.as_range();
        new.original_text = self.current_content[range.clone()].to_string();
        new.start = range.start;
        new.end = range.end;
        self.add_suggestion(new)
    }

    /// Turn validated reconciler resolutions into pending suggestions.
    ///
    /// `anchored` must be the anchored form of this store's current content;
    /// ranges are translated into un-anchored coordinates.
    pub fn suggestions_from_resolved(
        &mut self,
        anchored: &AnchoredText,
        resolved: &[Resolved],
        defaults: SuggestionDefaults,
    ) -> Result<Vec<SuggestionId>, RedlineError> {
        let map = anchored.map();
        resolved
            .iter()
            .map(|item| {
                let correction = &item.correction;
                let mut new = NewSuggestion::new(
                    map.to_clean_offset(item.range.start),
                    map.to_clean_offset(item.range.end),
                    correction.original.as_str(),
                    correction.suggested.as_str(),
                )
                .severity(defaults.severity)
                .confidence(defaults.confidence)
                .paragraph(correction.anchor.to_string())
                .explanation(correction.explanation.clone().unwrap_or_default());
                if let Some(kind) = &correction.kind {
                    new = new.kind(kind.parse().unwrap_or_default());
                }
                self.add_suggestion(new)
            })
            .collect()
    }

    /// Splice the suggested text into the content. Returns the length delta.
    pub fn accept(&mut self, id: SuggestionId) -> Result<isize, RedlineError> {
        let replacement = self.pending(id)?.suggested_text.clone();
        let delta = self.splice(id, replacement, SuggestionStatus::Accepted)?;
        self.emit(RedlineEvent::Accepted { id, delta });
        Ok(delta)
    }

    /// Splice user-supplied text instead of the suggestion.
    pub fn modify(
        &mut self,
        id: SuggestionId,
        text: impl Into<String>,
    ) -> Result<isize, RedlineError> {
        self.pending(id)?;
        let delta = self.splice(id, text.into(), SuggestionStatus::Modified)?;
        self.emit(RedlineEvent::Modified { id, delta });
        Ok(delta)
    }

    /// Mark rejected. Content and every other range stay as they are.
    pub fn reject(&mut self, id: SuggestionId) -> Result<(), RedlineError> {
        self.pending(id)?;
        if let Some(suggestion) = self.suggestions.get_mut(&id) {
            suggestion.status = SuggestionStatus::Rejected;
        }
        debug!(%id, "rejected suggestion");
        self.touch();
        self.emit(RedlineEvent::Rejected { id });
        Ok(())
    }

    /// Move the cursor among pending suggestions, ordered by position.
    /// Clamps at both ends; there is no wraparound.
    pub fn navigate(&mut self, to: Navigation) -> Result<Option<SuggestionId>, RedlineError> {
        let mut pending: Vec<&RedlineSuggestion> = self
            .suggestions
            .values()
            .filter(|s| s.status.is_pending())
            .collect();
        pending.sort_by_key(|s| (s.start, s.id));

        let key = |s: &RedlineSuggestion| (s.start, s.id);
        let current = self.cursor.and_then(|id| self.suggestions.get(&id)).map(key);

        let target = match to {
            Navigation::To(id) => {
                self.pending(id)?;
                Some(id)
            }
            Navigation::Next => match current {
                None => pending.first().map(|s| s.id),
                Some(cur) => pending
                    .iter()
                    .find(|s| key(**s) > cur)
                    .or(pending.last())
                    .map(|s| s.id),
            },
            Navigation::Prev => match current {
                None => pending.first().map(|s| s.id),
                Some(cur) => pending
                    .iter()
                    .rev()
                    .find(|s| key(**s) < cur)
                    .or(pending.first())
                    .map(|s| s.id),
            },
        };

        self.cursor = target;
        self.emit(RedlineEvent::Navigated { id: target });
        Ok(target)
    }

    pub fn apply_filters(&self, filter: &SuggestionFilter) -> Vec<&RedlineSuggestion> {
        apply_filters(self.suggestions.values(), filter)
    }

    /// Find where a suggestion's current text sits in rendered HTML.
    ///
    /// If the text occurs `n` times before the suggestion in the current
    /// content, the search starts at its `n`-th occurrence in the HTML's
    /// plain text. It is retried from the top if that finds nothing.
    pub fn locate_in_html(&self, id: SuggestionId, html: &str) -> Result<Located, RedlineError> {
        let suggestion = self.get(id).ok_or(RedlineError::NotFound { id })?;
        let needle = match suggestion.status {
            SuggestionStatus::Accepted => suggestion.suggested_text.as_str(),
            SuggestionStatus::Modified => suggestion
                .modified_text
                .as_deref()
                .unwrap_or(&suggestion.suggested_text),
            SuggestionStatus::Pending | SuggestionStatus::Rejected => {
                suggestion.original_text.as_str()
            }
        };

        let ordinal = self
            .current_content
            .get(..suggestion.start)
            .map_or(0, |prefix| prefix.matches(needle).count());
        let hint = nth_plain_occurrence(html, needle, ordinal);
        debug!(%id, ordinal, ?hint, "locating suggestion in html");

        match self.locator.locate(html, needle, hint) {
            Some(located) => Ok(located),
            None => Ok(self.locator.locate_or_err(html, needle, None)?),
        }
    }

    fn pending(&self, id: SuggestionId) -> Result<&RedlineSuggestion, RedlineError> {
        let suggestion = self.get(id).ok_or(RedlineError::NotFound { id })?;
        if !suggestion.status.is_pending() {
            return Err(RedlineError::NotPending {
                id,
                status: suggestion.status,
            });
        }
        Ok(suggestion)
    }

    fn splice(
        &mut self,
        id: SuggestionId,
        replacement: String,
        status: SuggestionStatus,
    ) -> Result<isize, RedlineError> {
        let suggestion = self.pending(id)?;
        let range = suggestion.range();
        let edit = TextEdit::new(
            range.start,
            range.end,
            replacement.as_str(),
            &suggestion.original_text,
        );
        let applied = edit
            .apply_to(&mut self.current_content)
            .map_err(|source| RedlineError::StaleRange { id, source })?;

        let shifted = shift_offsets(self.suggestions.values_mut(), range, applied.delta, Some(id));
        if let Some(suggestion) = self.suggestions.get_mut(&id) {
            suggestion.start = applied.range.start;
            suggestion.end = applied.range.end;
            suggestion.status = status;
            if status == SuggestionStatus::Modified {
                suggestion.modified_text = Some(replacement);
            }
        }
        debug!(%id, %status, delta = applied.delta, shifted, "applied suggestion");
        self.touch();
        Ok(applied.delta)
    }

    fn touch(&mut self) {
        self.last_modified = Utc::now();
    }

    fn emit(&self, event: RedlineEvent) {
        for listener in &self.listeners {
            listener.on_event(&event);
        }
    }
}

/// HTML byte offset where the `ordinal`-th occurrence (counting from 0) of
/// `needle` starts in the plain text rendered by `html`.
fn nth_plain_occurrence(html: &str, needle: &str, ordinal: usize) -> Option<usize> {
    let map = cache::position_map_for(html);
    let plain = map.plain_text(html);
    let mut from = 0;
    let mut hit = None;
    for _ in 0..=ordinal {
        let found = find_loose(&plain, needle, from)?;
        from = found.end;
        hit = Some(found);
    }
    let char_start = plain[..hit?.start].chars().count();
    map.map_plain_range_to_html(char_start..char_start + 1)
        .map(|span| span.start)
}
