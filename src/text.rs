// src/text.rs
//! Plain-text cleanup shared by the feed adapters.

use once_cell::sync::OnceCell;
use regex::Regex;

/// Tidy text that an XML parser has already entity-decoded: strip common
/// inline HTML tags, normalize typographic quotes and collapse whitespace.
/// Anything else, including a bare `<` or `>`, is kept verbatim for the
/// composer to escape. Returns an empty string for markup-only input.
pub fn clean_text(s: &str) -> String {
    // 1) Strip known HTML tags only; "<90 рублей, евро >100" is text.
    static RE_TAGS: OnceCell<Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| {
        Regex::new(r"(?i)</?(?:a|b|i|u|s|em|strong|p|br|span|div|font|img|sup|sub)\b[^<>]*>")
            .unwrap()
    });
    let mut out = re_tags.replace_all(s, " ").to_string();

    // 2) Normalize “ ” ‘ ’ « » to ASCII quotes
    out = out
        .replace(['\u{201C}', '\u{201D}', '\u{00AB}', '\u{00BB}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");

    // 3) Collapse whitespace (incl. NBSP)
    static RE_WS: OnceCell<Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| Regex::new(r"[\s\u{00A0}]+").unwrap());
    re_ws.replace_all(&out, " ").trim().to_string()
}

/// Cap `s` at `cap` characters. A capped result ends with `…`, is at most
/// `cap` characters long and never has whitespace before the ellipsis.
/// Works on chars, never on bytes.
pub fn cap_chars(s: &str, cap: usize) -> String {
    let trimmed = s.trim();
    if trimmed.chars().count() <= cap {
        return trimmed.to_string();
    }
    if cap == 0 {
        return String::new();
    }
    let kept: String = trimmed.chars().take(cap - 1).collect();
    let mut out = kept.trim_end().to_string();
    out.push('…');
    out
}

/// Uppercase the first character, leave the rest untouched.
pub fn capitalize_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
