//! Offset bookkeeping after a content splice.

use super::model::{RedlineSuggestion, SuggestionId};
use std::ops::Range;

/// Shift every suggestion that begins at or after the end of `edit` by
/// `delta` bytes.
///
/// `edit` is the replaced range in coordinates *before* the splice.
/// Suggestions starting earlier are left alone, including ones that overlap
/// the edited range; their text no longer matches and the store reports
/// them as stale when they are acted on. `skip` excludes the suggestion that
/// produced the edit.
pub fn shift_offsets<'a>(
    suggestions: impl IntoIterator<Item = &'a mut RedlineSuggestion>,
    edit: Range<usize>,
    delta: isize,
    skip: Option<SuggestionId>,
) -> usize {
    let mut shifted = 0;
    if delta == 0 {
        return shifted;
    }
    for suggestion in suggestions {
        if Some(suggestion.id) == skip || suggestion.start < edit.end {
            continue;
        }
        suggestion.start = suggestion.start.saturating_add_signed(delta);
        suggestion.end = suggestion.end.saturating_add_signed(delta);
        shifted += 1;
    }
    shifted
}
