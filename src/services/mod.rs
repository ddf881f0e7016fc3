//! Collaborator traits and their shipped implementations
//!
//! The formatter delegates HTML-to-Markdown conversion, language
//! detection and ISO 639 lookups to injectable services. Conversion and
//! the code registry ship with working defaults; language detection has
//! to be provided by the caller.

mod markdown;

pub use markdown::BasicMarkdownConverter;

use anyhow::Result;
use async_trait::async_trait;

/// Detector result meaning the language could not be determined
pub const UNDETERMINED_LANGUAGE: &str = "und";

/// Converts an HTML fragment to Markdown
#[async_trait]
pub trait MarkdownConverter: Send + Sync {
    async fn to_markdown(&self, html: &str) -> Result<String>;
}

/// Detects the language of a text
///
/// Returns an ISO 639-3 code, or [`UNDETERMINED_LANGUAGE`] when no
/// language stands out. The whitelist, when given, restricts the
/// candidate set.
#[async_trait]
pub trait LanguageDetector: Send + Sync {
    async fn detect(&self, text: &str, whitelist: Option<&[String]>) -> Result<String>;
}

/// Maps ISO 639-3 codes to their 639-1 equivalents
pub trait Iso639Registry: Send + Sync {
    /// The two-letter code for a three-letter one, when it exists
    fn two_letter(&self, code: &str) -> Option<&str>;
}

/// Built-in ISO 639-3 to 639-1 table covering the common web languages
///
/// Bibliographic aliases such as `ger` and `fre` map to the same
/// two-letter codes as their terminologic forms.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinIso639Registry;

static ISO_639_CODES: &[(&str, &str)] = &[
    ("afr", "af"),
    ("alb", "sq"),
    ("ara", "ar"),
    ("ben", "bn"),
    ("bul", "bg"),
    ("ces", "cs"),
    ("chi", "zh"),
    ("cmn", "zh"),
    ("cze", "cs"),
    ("dan", "da"),
    ("deu", "de"),
    ("dut", "nl"),
    ("ell", "el"),
    ("eng", "en"),
    ("est", "et"),
    ("eus", "eu"),
    ("fas", "fa"),
    ("fin", "fi"),
    ("fra", "fr"),
    ("fre", "fr"),
    ("ger", "de"),
    ("gle", "ga"),
    ("glg", "gl"),
    ("gre", "el"),
    ("heb", "he"),
    ("hin", "hi"),
    ("hrv", "hr"),
    ("hun", "hu"),
    ("hye", "hy"),
    ("ice", "is"),
    ("ind", "id"),
    ("isl", "is"),
    ("ita", "it"),
    ("jpn", "ja"),
    ("kat", "ka"),
    ("kor", "ko"),
    ("lat", "la"),
    ("lav", "lv"),
    ("lit", "lt"),
    ("mac", "mk"),
    ("may", "ms"),
    ("mkd", "mk"),
    ("msa", "ms"),
    ("nld", "nl"),
    ("nno", "nn"),
    ("nob", "nb"),
    ("nor", "no"),
    ("per", "fa"),
    ("pol", "pl"),
    ("por", "pt"),
    ("ron", "ro"),
    ("rum", "ro"),
    ("rus", "ru"),
    ("slk", "sk"),
    ("slo", "sk"),
    ("slv", "sl"),
    ("spa", "es"),
    ("sqi", "sq"),
    ("srp", "sr"),
    ("swa", "sw"),
    ("swe", "sv"),
    ("tam", "ta"),
    ("tha", "th"),
    ("tur", "tr"),
    ("ukr", "uk"),
    ("urd", "ur"),
    ("vie", "vi"),
    ("zho", "zh"),
];

impl Iso639Registry for BuiltinIso639Registry {
    fn two_letter(&self, code: &str) -> Option<&str> {
        ISO_639_CODES
            .iter()
            .find(|(three, _)| *three == code)
            .map(|(_, two)| *two)
    }
}
