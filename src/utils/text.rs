// Column-level string normalisation used by the cleaning steps.

use regex::Regex;
use std::sync::LazyLock;

static HTML_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]*>").expect("tag pattern is valid"));

/// Removes every `<...>` tag. Entities are left alone.
pub fn strip_html_tags(s: &str) -> String {
    HTML_TAG.replace_all(s, "").into_owned()
}

/// Upper-cases the first letter of every run of alphabetic characters and
/// lower-cases the rest, so `"mcDOWELL county"` becomes `"Mcdowell County"`
/// and `"o'brien"` becomes `"O'Brien"`.
pub fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_word = false;
    for ch in s.chars() {
        if ch.is_alphabetic() {
            if in_word {
                out.extend(ch.to_lowercase());
            } else {
                out.extend(ch.to_uppercase());
            }
            in_word = true;
        } else {
            out.push(ch);
            in_word = false;
        }
    }
    out
}

/// Left-pads with zeros to `width` characters, keeping a leading sign in front.
pub fn zero_fill(s: &str, width: usize) -> String {
    let len = s.chars().count();
    if len >= width {
        return s.to_string();
    }
    let padding = "0".repeat(width - len);
    match s.chars().next() {
        Some(sign @ ('+' | '-')) => format!("{}{}{}", sign, padding, &s[1..]),
        _ => format!("{}{}", padding, s),
    }
}

/// Cuts `s` to at most `max_chars` characters.
pub fn truncate_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
