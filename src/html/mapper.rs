use serde::Serialize;
use std::ops::Range;

/// One plain-text character and where it lives in the HTML.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PositionMapEntry {
    /// Char index into the plain text
    pub plain_pos: usize,
    /// Byte offset into the HTML
    pub html_pos: usize,
}

/// Dense plain-text → HTML offset table.
///
/// Index `i` of [`entries`](Self::entries) describes plain-text char `i`.
/// Characters inside a tag do not advance the plain-text position; a
/// complete entity such as `&nbsp;` counts as one plain-text character and
/// is mapped to the byte right after its terminating `;`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PositionMap {
    entries: Vec<PositionMapEntry>,
    /// Full HTML span of each plain-text char, for range mapping
    spans: Vec<Range<usize>>,
}

impl PositionMap {
    /// Build the map with a single forward scan over `html`.
    pub fn build(html: &str) -> Self {
        let mut entries = Vec::with_capacity(html.len());
        let mut spans = Vec::with_capacity(html.len());
        let mut inside_tag = false;
        let mut entity_start: Option<usize> = None;

        for (i, c) in html.char_indices() {
            if c == '<' {
                inside_tag = true;
                continue;
            }
            if inside_tag {
                if c == '>' {
                    inside_tag = false;
                }
                continue;
            }
            if let Some(start) = entity_start {
                if c == ';' {
                    entity_start = None;
                    entries.push(PositionMapEntry {
                        plain_pos: entries.len(),
                        html_pos: i + 1,
                    });
                    spans.push(start..i + 1);
                }
                continue;
            }
            if c == '&' && entity_follows(&html[i + 1..]) {
                entity_start = Some(i);
                continue;
            }
            entries.push(PositionMapEntry {
                plain_pos: entries.len(),
                html_pos: i,
            });
            spans.push(i..i + c.len_utf8());
        }

        Self { entries, spans }
    }

    pub fn entries(&self) -> &[PositionMapEntry] {
        &self.entries
    }

    /// Number of plain-text characters covered.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Direct lookup; positions past the end clamp to the last entry.
    pub fn map_plain_to_html(&self, plain_pos: usize) -> usize {
        match self.entries.get(plain_pos) {
            Some(entry) => entry.html_pos,
            None => self.entries.last().map_or(0, |entry| entry.html_pos),
        }
    }

    /// Exact reverse lookup.
    ///
    /// Returns 0 when no entry sits at `html_pos`, which is the case for every
    /// position inside a tag or an entity. There is no interpolation.
    pub fn map_html_to_plain(&self, html_pos: usize) -> usize {
        let idx = self.entries.partition_point(|entry| entry.html_pos < html_pos);
        match self.entries.get(idx) {
            Some(entry) if entry.html_pos == html_pos => entry.plain_pos,
            _ => 0,
        }
    }

    /// Index of the first plain-text char rendered at or after `html_pos`,
    /// or [`len`](Self::len) when none is.
    pub fn first_char_from(&self, html_pos: usize) -> usize {
        self.spans.partition_point(|span| span.start < html_pos)
    }

    /// The plain text this map indexes, one char per entry.
    ///
    /// `html` must be the string the map was built from. Entities decode to
    /// their character; unknown or multi-char entities become U+FFFD so that
    /// char `i` of the result always corresponds to entry `i`.
    pub fn plain_text(&self, html: &str) -> String {
        let mut text = String::with_capacity(self.spans.len());
        for span in &self.spans {
            let Some(raw) = html.get(span.clone()) else {
                text.push(char::REPLACEMENT_CHARACTER);
                continue;
            };
            if !raw.starts_with('&') || raw.len() == 1 {
                text.push_str(raw);
                continue;
            }
            let decoded = html_escape::decode_html_entities(raw);
            let mut chars = decoded.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) if decoded != raw => text.push(c),
                _ => text.push(char::REPLACEMENT_CHARACTER),
            }
        }
        text
    }

    /// Map a plain-text char range onto the HTML bytes that render it,
    /// including the whole of any entity at either end.
    pub fn map_plain_range_to_html(&self, plain: Range<usize>) -> Option<Range<usize>> {
        if plain.start >= plain.end {
            return None;
        }
        let first = self.spans.get(plain.start)?;
        let last = self.spans.get(plain.end - 1)?;
        Some(first.start..last.end)
    }
}

/// `&` opens an entity only when a well-formed reference body follows;
/// a bare ampersand in sloppy markup is ordinary text.
fn entity_follows(rest: &str) -> bool {
    let body = rest.strip_prefix('#').unwrap_or(rest);
    let len = body
        .bytes()
        .take(32)
        .take_while(|b| b.is_ascii_alphanumeric())
        .count();
    len > 0 && body.as_bytes().get(len) == Some(&b';')
}
