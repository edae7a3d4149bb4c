//! Char-level substring matchers that report exact byte ranges in the
//! haystack, even when case folding changes byte lengths.

use std::ops::Range;

/// Case-insensitive search starting at byte `from`.
pub fn find_case_insensitive(haystack: &str, needle: &str, from: usize) -> Option<Range<usize>> {
    find_with(haystack, needle, from, false)
}

/// Case-insensitive search in which any whitespace run in the needle
/// matches any whitespace run (including NBSP) in the haystack.
pub fn find_loose(haystack: &str, needle: &str, from: usize) -> Option<Range<usize>> {
    find_with(haystack, needle.trim(), from, true)
}

fn find_with(haystack: &str, needle: &str, from: usize, loose: bool) -> Option<Range<usize>> {
    if needle.is_empty() || from > haystack.len() || !haystack.is_char_boundary(from) {
        return None;
    }
    haystack[from..].char_indices().find_map(|(offset, _)| {
        let start = from + offset;
        match_at(haystack, start, needle, loose).map(|end| start..end)
    })
}

/// Try to match `needle` at byte `start`; returns the end of the match.
fn match_at(haystack: &str, start: usize, needle: &str, loose: bool) -> Option<usize> {
    let mut hay = haystack[start..].char_indices().peekable();
    let mut pattern = needle.chars().peekable();

    while let Some(nc) = pattern.next() {
        if loose && nc.is_whitespace() {
            while pattern.peek().is_some_and(|c| c.is_whitespace()) {
                pattern.next();
            }
            let (_, hc) = hay.next()?;
            if !hc.is_whitespace() {
                return None;
            }
            while hay.peek().is_some_and(|(_, c)| c.is_whitespace()) {
                hay.next();
            }
            continue;
        }

        let (_, hc) = hay.next()?;
        if !chars_eq_ignore_case(nc, hc) {
            return None;
        }
    }

    Some(hay.peek().map_or(haystack.len(), |(offset, _)| start + offset))
}

fn chars_eq_ignore_case(a: char, b: char) -> bool {
    a == b || a.to_lowercase().eq(b.to_lowercase())
}

/// Smallest char boundary `>= pos`, clamped to the end of text.
pub fn ceil_boundary(text: &str, pos: usize) -> usize {
    let mut pos = pos.min(text.len());
    while !text.is_char_boundary(pos) {
        pos += 1;
    }
    pos
}

/// Byte offset of char `index`, or the end of text past the last char.
pub fn char_to_byte(text: &str, index: usize) -> usize {
    text.char_indices().nth(index).map_or(text.len(), |(i, _)| i)
}

/// Byte offset `count` chars before `pos` (or 0).
pub fn chars_back(text: &str, pos: usize, count: usize) -> usize {
    if count == 0 {
        return pos;
    }
    text[..pos]
        .char_indices()
        .rev()
        .nth(count - 1)
        .map_or(0, |(i, _)| i)
}

/// Byte offset `count` chars after `pos` (or end of text).
pub fn chars_forward(text: &str, pos: usize, count: usize) -> usize {
    text[pos..]
        .char_indices()
        .nth(count)
        .map_or(text.len(), |(i, _)| pos + i)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn case_insensitive_reports_haystack_range() {
        let hay = "The PLAINTIFF alleges";
        assert_eq!(find_case_insensitive(hay, "plaintiff", 0), Some(4..13));
        assert_eq!(find_case_insensitive(hay, "plaintiff", 5), None);
    }

    #[test]
    fn case_insensitive_handles_multibyte() {
        let hay = "§ 1983 ÉCOLE claim";
        let range = find_case_insensitive(hay, "école", 0).unwrap();
        assert_eq!(&hay[range], "ÉCOLE");
    }

    #[test]
    fn loose_matches_whitespace_runs() {
        let hay = "Smith\u{a0}v.\n   Jones";
        let range = find_loose(hay, "smith v. jones", 0).unwrap();
        assert_eq!(range, 0..hay.len());
        assert_eq!(find_case_insensitive(hay, "smith v. jones", 0), None);
    }

    #[test]
    fn loose_requires_whitespace_where_needle_has_it() {
        assert_eq!(find_loose("SmithJones", "Smith Jones", 0), None);
    }

    #[test]
    fn empty_needle_never_matches() {
        assert_eq!(find_case_insensitive("abc", "", 0), None);
        assert_eq!(find_loose("abc", "   ", 0), None);
    }

    #[test]
    fn boundary_helpers() {
        let text = "a§b";
        assert_eq!(ceil_boundary(text, 2), 3);
        assert_eq!(ceil_boundary(text, 99), 4);
        assert_eq!(chars_back(text, 4, 2), 1);
        assert_eq!(chars_back(text, 4, 10), 0);
        assert_eq!(chars_forward(text, 0, 2), 3);
        assert_eq!(chars_forward(text, 0, 10), 4);
        assert_eq!(char_to_byte(text, 2), 3);
        assert_eq!(char_to_byte(text, 7), 4);
    }
}
