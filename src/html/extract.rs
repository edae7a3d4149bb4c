use once_cell::sync::Lazy;
use quick_xml::events::Event;
use quick_xml::reader::Reader;
use regex::Regex;
use tracing::debug;

static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").expect("tag regex is valid"));
static WHITESPACE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+").expect("whitespace regex is valid"));

/// Extract the visible text of an HTML fragment.
///
/// Walks the markup as an event stream, decoding entities and skipping
/// `<script>`/`<style>` bodies. Markup the event reader cannot make sense of
/// falls back to [`strip_tags`]. Both paths collapse whitespace runs
/// (including non-breaking spaces) to a single space and trim, so their
/// output is interchangeable for matching.
pub fn extract_plain_text(html: &str) -> String {
    match structured_text(html) {
        Ok(text) => normalize_whitespace(&text),
        Err(err) => {
            debug!(error = %err, "markup walk failed, stripping tags instead");
            strip_tags(html)
        }
    }
}

/// Regex-based extraction: drop anything between `<` and `>`, decode
/// entities, normalize whitespace.
pub fn strip_tags(html: &str) -> String {
    let without_tags = TAG_RE.replace_all(html, "");
    normalize_whitespace(&html_escape::decode_html_entities(&without_tags))
}

/// Collapse every whitespace run to one space and trim both ends.
pub fn normalize_whitespace(text: &str) -> String {
    WHITESPACE_RE.replace_all(text, " ").trim().to_string()
}

fn structured_text(html: &str) -> Result<String, quick_xml::Error> {
    let mut reader = Reader::from_str(html);
    reader.config_mut().check_end_names = false;

    let mut text = String::with_capacity(html.len());
    let mut skip_depth = 0usize;

    loop {
        match reader.read_event()? {
            Event::Start(e) if is_opaque(e.name().as_ref()) => skip_depth += 1,
            Event::End(e) if is_opaque(e.name().as_ref()) => {
                skip_depth = skip_depth.saturating_sub(1);
            }
            Event::Text(e) if skip_depth == 0 => {
                let raw = String::from_utf8_lossy(&e);
                text.push_str(&html_escape::decode_html_entities(&raw));
            }
            Event::CData(e) if skip_depth == 0 => {
                text.push_str(&String::from_utf8_lossy(&e));
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(text)
}

fn is_opaque(name: &[u8]) -> bool {
    name.eq_ignore_ascii_case(b"script") || name.eq_ignore_ascii_case(b"style")
}
