//! Turns test method names into readable titles.

use regex::Regex;
use std::sync::OnceLock;

fn camel_boundary() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"([a-z0-9])([A-Z])").expect("valid regex"))
}

/// Converts `login_with_valid_user` or `loginWithValidUser` into `Login with valid user`.
///
/// Names that already contain spaces are only capitalized.
#[must_use]
pub fn humanize(name: &str) -> String {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return String::new();
    }

    let spaced = camel_boundary().replace_all(trimmed, "$1 $2");
    let words: Vec<String> = spaced
        .split(|c: char| c == '_' || c == '-' || c.is_whitespace())
        .filter(|w| !w.is_empty())
        .enumerate()
        .map(|(i, w)| {
            if i == 0 {
                capitalize(w)
            } else if w.chars().all(|c| c.is_uppercase() || c.is_ascii_digit()) {
                // Keep acronyms like "HTTP" or "ID" intact.
                w.to_string()
            } else {
                w.to_lowercase()
            }
        })
        .collect();

    words.join(" ")
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars).collect()
    })
}
