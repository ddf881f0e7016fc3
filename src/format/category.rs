//! Category and person-tag derivation

use lazy_static::lazy_static;
use regex::Regex;

use crate::entry::Entry;

lazy_static! {
    /// Default pattern for tags that reference a person by URL
    pub static ref DEFAULT_PERSON_TAG_PATTERN: Regex = Regex::new(r"^https?://").unwrap();
}

/// Classification for bookmarks and reposts
pub const LINKS_CATEGORY: &str = "links";

/// Classification for notes, replies and likes
pub const SOCIAL_CATEGORY: &str = "social";

/// Built-in classification rules
pub fn classify(entry: &Entry) -> Option<String> {
    if entry.has_property("bookmark")
        || entry.has_property("repost-of")
        || entry.has_property("bookmark-of")
    {
        return Some(LINKS_CATEGORY.to_string());
    }

    // An entry without a name is a note rather than an article.
    if !entry.has_property("name")
        || entry.has_property("in-reply-to")
        || entry.has_property("like-of")
    {
        return Some(SOCIAL_CATEGORY.to_string());
    }

    None
}

/// Move tags matching the person pattern out of `category`
///
/// Returns the extracted tags in order; `category` keeps the rest.
/// Structured tag values never match.
pub fn extract_person_tags(entry: &mut Entry, pattern: &Regex) -> Option<Vec<String>> {
    let values = entry.properties.get_mut("category")?;
    if values.is_empty() {
        return None;
    }

    let mut person_tags = Vec::new();
    values.retain(|value| match value.as_plain() {
        Some(tag) if pattern.is_match(tag) => {
            person_tags.push(tag.to_string());
            false
        }
        _ => true,
    });

    if person_tags.is_empty() {
        None
    } else {
        Some(person_tags)
    }
}
