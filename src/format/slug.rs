//! Slug derivation

use chrono::{DateTime, Utc};
use lazy_static::lazy_static;
use regex::Regex;

use crate::entry::{extract_values, Entry};

lazy_static! {
    static ref CAMEL_BOUNDARY: Regex = Regex::new(r"([a-z])([A-Z])").unwrap();
    static ref NON_ALPHANUMERIC: Regex = Regex::new(r"[^a-z0-9]+").unwrap();
}

/// Words kept from a title or content candidate
const MAX_SLUG_WORDS: usize = 5;

/// Seconds in a day, the modulus of the timestamp fallback
const SECONDS_PER_DAY: i64 = 24 * 60 * 60;

/// Fold a name into lowercase dash-separated words
///
/// Transliterates to ASCII first so that camel-case boundaries survive
/// inside accented words, then splits camel case, lowercases and keeps
/// alphanumeric runs only.
pub fn semi_kebab_case(name: &str) -> String {
    let ascii = deunicode::deunicode(name);
    let spaced = CAMEL_BOUNDARY.replace_all(&ascii, "$1 $2");
    let lowered = spaced.trim().to_lowercase();
    let cleaned = NON_ALPHANUMERIC.replace_all(&lowered, " ");
    cleaned.split_whitespace().collect::<Vec<_>>().join("-")
}

/// Choose the slug for an entry
///
/// An explicit `slug` property wins, folded as-is. Otherwise the name,
/// or the content when enabled, is folded with at most five words kept.
/// With no text at all the slug becomes the second-of-day of the
/// publication instant.
pub fn derive_slug(entry: &Entry, content_slug: bool, published: DateTime<Utc>) -> String {
    if let Some(explicit) = entry.first_value("slug") {
        return semi_kebab_case(&explicit);
    }

    let mut candidate = entry
        .first_value("name")
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty());

    if candidate.is_none() && content_slug && entry.has_property("content") {
        let text = extract_values(entry.property("content")).join("\n");
        if !text.is_empty() {
            candidate = Some(text);
        }
    }

    match candidate {
        Some(name) => {
            let words: Vec<&str> = name.split_whitespace().collect();
            let capped = words[..words.len().min(MAX_SLUG_WORDS)].join(" ");
            semi_kebab_case(&capped)
        }
        None => published
            .timestamp()
            .rem_euclid(SECONDS_PER_DAY)
            .to_string(),
    }
}
