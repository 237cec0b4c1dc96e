//! Text helpers shared by the chat crates.
//!
//! Everything here works on `&str` and never splits a UTF-8 sequence.

use std::sync::OnceLock;

use regex_lite::Regex;

/// Truncate a `&str` to a byte budget at a character boundary (prefix).
///
/// Returns the longest prefix of `s` that fits within `max_bytes` bytes
/// while ending at a valid UTF-8 character boundary.
///
/// # Examples
///
/// ```
/// use burp_utils_string::take_bytes_at_char_boundary;
///
/// assert_eq!(take_bytes_at_char_boundary("hello world", 5), "hello");
/// assert_eq!(take_bytes_at_char_boundary("héllo", 2), "h"); // é is 2 bytes
/// assert_eq!(take_bytes_at_char_boundary("😀abc", 3), "");
/// ```
#[inline]
pub fn take_bytes_at_char_boundary(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    let mut end = max_bytes;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

/// Keep only ASCII letters and digits, then cap the result at `max_chars`.
///
/// Channel ids and nicknames go through this before they reach the wire;
/// the server rejects anything that is not alphanumeric.
///
/// ```
/// use burp_utils_string::sanitize_alphanumeric;
///
/// assert_eq!(sanitize_alphanumeric("my-chan!nel", 32), "mychannel");
/// assert_eq!(sanitize_alphanumeric("abcdef", 3), "abc");
/// assert_eq!(sanitize_alphanumeric("???", 32), "");
/// ```
pub fn sanitize_alphanumeric(value: &str, max_chars: usize) -> String {
    value
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .take(max_chars)
        .collect()
}

/// A piece of a transcript line after link detection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Span<'a> {
    Text(&'a str),
    Link(&'a str),
}

impl<'a> Span<'a> {
    pub fn as_str(&self) -> &'a str {
        match self {
            Span::Text(s) | Span::Link(s) => s,
        }
    }
}

#[allow(clippy::expect_used)]
fn link_regex() -> &'static Regex {
    static LINK_RE: OnceLock<Regex> = OnceLock::new();
    LINK_RE.get_or_init(|| Regex::new(r"(?:https?:|magnet:|/ipfs/)\S+").expect("valid link regex"))
}

/// Split `text` into plain text and link spans.
///
/// A link starts with `http:`, `https:`, `magnet:` or `/ipfs/` and runs to
/// the next whitespace. Joining the spans yields `text` unchanged.
pub fn split_links(text: &str) -> Vec<Span<'_>> {
    let mut spans = Vec::new();
    let mut last = 0;
    for m in link_regex().find_iter(text) {
        if m.start() > last {
            spans.push(Span::Text(&text[last..m.start()]));
        }
        spans.push(Span::Link(m.as_str()));
        last = m.end();
    }
    if last < text.len() {
        spans.push(Span::Text(&text[last..]));
    }
    spans
}
