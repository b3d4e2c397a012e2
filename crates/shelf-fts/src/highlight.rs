//! Highlight fragments for stored field values.
//!
//! The stored text is re-analyzed with the field's analyzer; every token that
//! a query term matches is wrapped in the pre/post tags at its original byte
//! span. Short values come back as one fragment holding the whole value.
//! Longer values are cut into fragments starting at a match.

use tantivy::tokenizer::TextAnalyzer;

use crate::query::TermMatcher;
use crate::settings::analyze;

/// Values up to this many bytes are returned whole.
pub const FRAGMENT_SIZE: usize = 100;

/// Most fragments returned per field.
pub const MAX_FRAGMENTS: usize = 5;

/// Highlight every span of `text` that one of `matchers` matches.
///
/// Returns no fragments when nothing matched.
pub fn highlight(
    text: &str,
    analyzer: &mut TextAnalyzer,
    matchers: &[TermMatcher],
    pre_tag: &str,
    post_tag: &str,
) -> Vec<String> {
    if matchers.is_empty() {
        return Vec::new();
    }

    let mut spans: Vec<(usize, usize)> = analyze(analyzer, text)
        .into_iter()
        .filter(|token| matchers.iter().any(|m| m.matches(&token.text)))
        .map(|token| (token.from, token.to))
        .collect();
    spans.sort_unstable();
    spans.dedup();
    if spans.is_empty() {
        return Vec::new();
    }

    if text.len() <= FRAGMENT_SIZE {
        return vec![render(text, 0, text.len(), &spans, pre_tag, post_tag)];
    }

    let mut fragments = Vec::new();
    let mut next = 0;
    while next < spans.len() && fragments.len() < MAX_FRAGMENTS {
        let start = spans[next].0;
        let end = fragment_end(text, start).max(spans[next].1);

        let mut last = next;
        while last + 1 < spans.len() && spans[last + 1].1 <= end {
            last += 1;
        }
        fragments.push(render(
            text,
            start,
            end,
            &spans[next..=last],
            pre_tag,
            post_tag,
        ));
        next = last + 1;
    }
    fragments
}

/// End of a fragment starting at `start`: about [`FRAGMENT_SIZE`] bytes on,
/// pulled back to a whitespace so words are not cut.
fn fragment_end(text: &str, start: usize) -> usize {
    let mut end = (start + FRAGMENT_SIZE).min(text.len());
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    if end == text.len() {
        return end;
    }
    match text[start..end].rfind(char::is_whitespace) {
        Some(i) if i > 0 => start + i,
        _ => end,
    }
}

fn render(
    text: &str,
    start: usize,
    end: usize,
    spans: &[(usize, usize)],
    pre_tag: &str,
    post_tag: &str,
) -> String {
    let mut out = String::with_capacity(end - start + spans.len() * (pre_tag.len() + post_tag.len()));
    let mut cursor = start;
    for &(from, to) in spans {
        out.push_str(&text[cursor..from]);
        out.push_str(pre_tag);
        out.push_str(&text[from..to]);
        out.push_str(post_tag);
        cursor = to;
    }
    out.push_str(&text[cursor..end]);
    out.trim_end().to_string()
}

// ============================================================================
// Tests
// ============================================================================
