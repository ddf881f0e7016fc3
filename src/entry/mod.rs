//! Microformats2 entry model
//!
//! An [`Entry`] is the parsed form of a Micropub submission: the mf2
//! `type` array, an ordered property map, any uploaded media files and
//! the values derived during normalization.

mod value;

pub use value::{extract_values, PropertyValue};

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Ordered microformats2 property map
pub type PropertyMap = IndexMap<String, Vec<PropertyValue>>;

/// A media upload attached to an entry
#[derive(Debug, Clone, PartialEq)]
pub struct MediaFile {
    /// Filename, as submitted or as relocated
    pub filename: String,
    /// File contents, shared rather than copied between clones
    pub buffer: Arc<Vec<u8>>,
}

impl MediaFile {
    /// Create a file from its submitted name and contents
    pub fn new(filename: impl Into<String>, buffer: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            buffer: Arc::new(buffer),
        }
    }
}

/// Media uploads grouped by kind, before relocation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MediaFiles {
    pub photo: Vec<MediaFile>,
    pub video: Vec<MediaFile>,
    pub audio: Vec<MediaFile>,
}

impl MediaFiles {
    pub fn is_empty(&self) -> bool {
        self.photo.is_empty() && self.video.is_empty() && self.audio.is_empty()
    }
}

/// Kind of an uploaded media file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Video,
    Photo,
    Audio,
}

impl MediaKind {
    /// Property the relocated URL is appended to
    pub fn property(&self) -> &'static str {
        match self {
            MediaKind::Video => "video",
            MediaKind::Photo => "photo",
            MediaKind::Audio => "audio",
        }
    }
}

impl std::fmt::Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.property())
    }
}

/// File attachments in their two lifecycle stages
#[derive(Debug, Clone, PartialEq)]
pub enum EntryFiles {
    /// Uploads waiting to be assigned a storage path
    Pending(MediaFiles),
    /// Uploads with their storage paths resolved
    Relocated(Vec<MediaFile>),
}

impl Default for EntryFiles {
    fn default() -> Self {
        EntryFiles::Pending(MediaFiles::default())
    }
}

impl EntryFiles {
    pub fn is_empty(&self) -> bool {
        match self {
            EntryFiles::Pending(files) => files.is_empty(),
            EntryFiles::Relocated(files) => files.is_empty(),
        }
    }

    /// Relocated files, empty before normalization
    pub fn relocated(&self) -> &[MediaFile] {
        match self {
            EntryFiles::Relocated(files) => files,
            EntryFiles::Pending(_) => &[],
        }
    }
}

/// Override of the layout front-matter key
#[derive(Debug, Clone, PartialEq)]
pub enum LayoutOverride {
    /// Replace the default layout name
    Custom(String),
    /// Drop the layout key entirely
    Disabled,
}

/// Values computed during normalization rather than submitted
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Derived {
    /// Classification of the entry, `links`, `social` or custom
    pub category: Option<String>,
    /// Absolute-URL tags moved out of the `category` property
    pub person_tags: Option<Vec<String>>,
    /// Layout override carried through normalization untouched
    pub layout: Option<LayoutOverride>,
}

impl Derived {
    pub fn is_empty(&self) -> bool {
        self.category.is_none() && self.person_tags.is_none() && self.layout.is_none()
    }
}

/// Fallback values merged into entries that lack them
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntryDefaults {
    /// Properties filled in when the entry has no such key
    pub properties: PropertyMap,
    /// Derived fields filled in when normalization left them unset
    pub derived: Derived,
}

/// A microformats2 entry as submitted through Micropub
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    /// The mf2 type array, `h-entry` for posts
    #[serde(rename = "type", default = "default_entry_type")]
    pub entry_type: Vec<String>,

    /// Properties in submission order
    #[serde(default)]
    pub properties: PropertyMap,

    /// Attached media uploads
    #[serde(skip)]
    pub files: EntryFiles,

    /// Values computed during normalization
    #[serde(skip)]
    pub derived: Derived,

    /// Set once the entry has passed through normalization
    #[serde(skip)]
    pub pre_formatted: bool,
}

fn default_entry_type() -> Vec<String> {
    vec!["h-entry".to_string()]
}

impl Default for Entry {
    fn default() -> Self {
        Self {
            entry_type: default_entry_type(),
            properties: PropertyMap::new(),
            files: EntryFiles::default(),
            derived: Derived::default(),
            pre_formatted: false,
        }
    }
}

impl Entry {
    /// An empty `h-entry`
    pub fn new() -> Self {
        Self::default()
    }

    /// Values of a property, empty when the property is absent
    pub fn property(&self, key: &str) -> &[PropertyValue] {
        self.properties.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Whether a property is present with at least one value
    pub fn has_property(&self, key: &str) -> bool {
        !self.property(key).is_empty()
    }

    /// Plain-text rendition of a property's first value
    pub fn first_value(&self, key: &str) -> Option<String> {
        self.property(key).first().and_then(|v| v.to_plain_text())
    }

    /// Plain-text renditions of all of a property's values
    pub fn values(&self, key: &str) -> Vec<String> {
        extract_values(self.property(key))
    }

    /// Replace a property with a single plain value
    ///
    /// An existing property keeps its position in the map.
    pub fn set_plain(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.properties
            .insert(key.into(), vec![PropertyValue::Plain(value.into())]);
    }

    /// Append a plain value, creating the property when missing
    pub fn push_plain(&mut self, key: &str, value: impl Into<String>) {
        self.properties
            .entry(key.to_string())
            .or_default()
            .push(PropertyValue::Plain(value.into()));
    }

    /// The publication instant, when one is recorded and parseable
    pub fn published_at(&self) -> Option<DateTime<Utc>> {
        self.first_value("published")
            .and_then(|s| parse_date_string(&s))
    }

    /// Fill in defaults for missing property keys and derived fields
    ///
    /// A property key already present on the entry wins, even when its
    /// value sequence is empty.
    pub fn apply_defaults(&mut self, defaults: &EntryDefaults) {
        for (key, values) in &defaults.properties {
            if !self.properties.contains_key(key) {
                self.properties.insert(key.clone(), values.clone());
            }
        }
        if self.derived.category.is_none() {
            self.derived.category = defaults.derived.category.clone();
        }
        if self.derived.person_tags.is_none() {
            self.derived.person_tags = defaults.derived.person_tags.clone();
        }
        if self.derived.layout.is_none() {
            self.derived.layout = defaults.derived.layout.clone();
        }
    }
}

/// Parse a date string in the common submission formats
///
/// Bare digit runs are read as Unix epoch milliseconds, which is how
/// several Micropub clients submit timestamps.
fn parse_date_string(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }

    let formats = [
        "%Y-%m-%d %H:%M:%S",
        "%Y/%m/%d %H:%M:%S",
        "%Y-%m-%d %H:%M",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M:%S%.f",
    ];
    for fmt in formats {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(DateTime::from_naive_utc_and_offset(dt, Utc));
        }
    }

    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        let dt = d.and_hms_opt(0, 0, 0)?;
        return Some(DateTime::from_naive_utc_and_offset(dt, Utc));
    }

    if let Ok(ms) = s.parse::<i64>() {
        return DateTime::from_timestamp_millis(ms);
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_property_access() {
        let mut entry = Entry::new();
        entry.set_plain("name", "hello");

        assert!(entry.has_property("name"));
        assert!(!entry.has_property("content"));
        assert_eq!(entry.first_value("name").as_deref(), Some("hello"));
        assert_eq!(entry.first_value("content"), None);
    }

    #[test]
    fn test_push_keeps_existing_values() {
        let mut entry = Entry::new();
        entry.set_plain("audio", "http://example.com/pre-existing/url");
        entry.push_plain("audio", "media/foo.mp3");

        assert_eq!(
            entry.values("audio"),
            vec!["http://example.com/pre-existing/url", "media/foo.mp3"]
        );
    }

    #[test]
    fn test_published_at_rfc3339() {
        let mut entry = Entry::new();
        entry.set_plain("published", "2015-06-30T14:34:01.000Z");

        assert_eq!(entry.published_at().unwrap().timestamp(), 1_435_674_841);
    }

    #[test]
    fn test_published_at_epoch_millis() {
        let mut entry = Entry::new();
        entry.set_plain("published", "1435674841000");

        assert_eq!(entry.published_at().unwrap().timestamp(), 1_435_674_841);
    }

    #[test]
    fn test_published_at_invalid() {
        let mut entry = Entry::new();
        entry.set_plain("published", "not a date");

        assert_eq!(entry.published_at(), None);
        assert_eq!(Entry::new().published_at(), None);
    }

    #[test]
    fn test_clone_shares_file_buffers() {
        let mut entry = Entry::new();
        entry.files = EntryFiles::Pending(MediaFiles {
            photo: vec![MediaFile::new("foo.jpg", b"sampledata".to_vec())],
            ..MediaFiles::default()
        });

        let cloned = entry.clone();
        let original_buffer = match &entry.files {
            EntryFiles::Pending(files) => &files.photo[0].buffer,
            EntryFiles::Relocated(_) => unreachable!(),
        };
        let cloned_buffer = match &cloned.files {
            EntryFiles::Pending(files) => &files.photo[0].buffer,
            EntryFiles::Relocated(_) => unreachable!(),
        };

        assert!(Arc::ptr_eq(original_buffer, cloned_buffer));
    }

    #[test]
    fn test_apply_defaults() {
        let mut defaults = EntryDefaults::default();
        defaults
            .properties
            .insert("lang".to_string(), vec!["en".into()]);
        defaults
            .properties
            .insert("content".to_string(), vec!["default".into()]);

        let mut entry = Entry::new();
        entry.set_plain("content", "hello world");
        entry.apply_defaults(&defaults);

        assert_eq!(entry.values("lang"), vec!["en"]);
        assert_eq!(entry.values("content"), vec!["hello world"]);
    }

    #[test]
    fn test_apply_defaults_keeps_empty_property() {
        let mut defaults = EntryDefaults::default();
        defaults
            .properties
            .insert("slug".to_string(), vec![PropertyValue::plain("fallback")]);

        let mut entry = Entry::new();
        entry.properties.insert("slug".to_string(), Vec::new());
        entry.apply_defaults(&defaults);

        assert!(entry.property("slug").is_empty());
    }

    #[test]
    fn test_deserialize_micropub_payload() {
        let json = r#"{
            "type": ["h-entry"],
            "properties": {
                "content": ["hello world"],
                "name": ["awesomeness is awesome"]
            }
        }"#;

        let entry: Entry = serde_json::from_str(json).unwrap();
        assert_eq!(entry.entry_type, vec!["h-entry"]);
        assert_eq!(entry.values("content"), vec!["hello world"]);
        assert!(!entry.pre_formatted);
    }
}
