//! HTML to plain text
//!
//! Good enough for reading mail in a chat window: markup is stripped,
//! block-level elements become line breaks, each line is trimmed and
//! blank lines are dropped.

use regex::Regex;
use std::sync::OnceLock;

fn invisible_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(r"(?is)<!--.*?-->|<script\b.*?</script\s*>|<style\b.*?</style\s*>")
            .expect("valid invisible-content regex")
    })
}

fn whitespace_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(r"\s+").expect("valid whitespace regex"))
}

fn line_break_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(
            r"(?i)<br\s*/?>|</?(?:p|div|li|ul|ol|tr|td|th|table|thead|tbody|h[1-6]|blockquote|pre|hr|section|article|header|footer|title|dt|dd)\b[^>]*>",
        )
        .expect("valid line-break regex")
    })
}

fn tag_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(r"(?s)<[^>]*>").expect("valid HTML tag regex"))
}

/// Convert an HTML document or fragment to visible text.
///
/// ```
/// assert_eq!(inbox_relay::html_to_text("<p>Hello</p><p>World</p>"), "Hello\nWorld");
/// ```
#[must_use]
pub fn html_to_text(html: &str) -> String {
    let visible = invisible_regex().replace_all(html, " ");
    let flowed = whitespace_regex().replace_all(&visible, " ");
    let broken = line_break_regex().replace_all(&flowed, "\n");
    let stripped = tag_regex().replace_all(&broken, "");
    let decoded = html_escape::decode_html_entities(&stripped);

    decoded
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
