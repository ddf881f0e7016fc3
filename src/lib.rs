//! mf2post: Micropub entries as front matter post documents
//!
//! This crate turns microformats2 entries submitted over Micropub into
//! Jekyll style post documents: a YAML front matter block plus rendered
//! content, together with the filename, permalink and media file paths
//! the post should be published under.

pub mod config;
pub mod entry;
pub mod files;
pub mod format;
pub mod helpers;
pub mod render;
pub mod services;
pub mod template;

use anyhow::Result;
use regex::Regex;
use std::sync::Arc;

pub use config::{
    CategoryClassifier, CategoryDerivation, ConfigError, FormatterOptions, LanguageDerivation,
    DEFAULT_FILENAME_STYLE, DEFAULT_FILES_STYLE, DEFAULT_PERMALINK_STYLE,
};
pub use entry::{
    Derived, Entry, EntryDefaults, EntryFiles, LayoutOverride, MediaFile, MediaFiles, MediaKind,
    PropertyMap, PropertyValue,
};
pub use files::files_slug;
pub use format::FormattedBundle;
pub use services::{
    BasicMarkdownConverter, BuiltinIso639Registry, Iso639Registry, LanguageDetector,
    MarkdownConverter, UNDETERMINED_LANGUAGE,
};
pub use template::{PathStyle, StyleCallback, PLACEHOLDERS};

/// The entry formatter
///
/// Built once from [`FormatterOptions`] and shared across entries, it
/// holds only configuration, so formatting concurrent submissions with
/// one instance is fine.
#[derive(Clone)]
pub struct Formatter {
    pub(crate) markdown: bool,
    pub(crate) content_slug: bool,
    pub(crate) defaults: Option<EntryDefaults>,
    pub(crate) derive_languages: LanguageDerivation,
    pub(crate) derive_category: CategoryDerivation,
    pub(crate) filename_style: PathStyle,
    pub(crate) files_style: PathStyle,
    pub(crate) permalink_style: PathStyle,
    pub(crate) base_url: Option<String>,
    pub(crate) person_tag_pattern: Regex,
    pub(crate) markdown_converter: Arc<dyn MarkdownConverter>,
    pub(crate) language_detector: Option<Arc<dyn LanguageDetector>>,
    pub(crate) iso639_registry: Arc<dyn Iso639Registry>,
}

impl Formatter {
    /// Create a formatter with default options
    pub fn new() -> Self {
        Self::build(FormatterOptions::default())
    }

    /// Create a formatter producing URLs under the given absolute base
    pub fn relative_to(base_url: impl Into<String>) -> Result<Self, ConfigError> {
        Self::with_options(FormatterOptions {
            base_url: Some(base_url.into()),
            ..FormatterOptions::default()
        })
    }

    /// Create a formatter after validating the options
    pub fn with_options(options: FormatterOptions) -> Result<Self, ConfigError> {
        config::validate(&options)?;
        Ok(Self::build(options))
    }

    fn build(options: FormatterOptions) -> Self {
        Self {
            markdown: options.markdown,
            content_slug: options.content_slug,
            defaults: options.defaults,
            derive_languages: options.derive_languages,
            derive_category: options.derive_category,
            filename_style: options.filename_style,
            files_style: options.files_style,
            permalink_style: options.permalink_style,
            base_url: options.base_url,
            person_tag_pattern: options
                .person_tag_pattern
                .unwrap_or_else(|| format::category::DEFAULT_PERSON_TAG_PATTERN.clone()),
            markdown_converter: options
                .markdown_converter
                .unwrap_or_else(|| Arc::new(BasicMarkdownConverter)),
            language_detector: options.language_detector,
            iso639_registry: options
                .iso639_registry
                .unwrap_or_else(|| Arc::new(BuiltinIso639Registry)),
        }
    }

    /// Normalize an entry without rendering it
    pub async fn normalize(&self, entry: &Entry) -> Result<Entry> {
        format::normalize(self, entry).await
    }

    /// Render the post document for a normalized entry
    pub async fn render(&self, entry: &Entry) -> Result<String> {
        render::document(self, entry).await
    }

    /// Resolve the storage filename for a normalized entry
    pub async fn resolve_filename(&self, entry: &Entry) -> Result<String> {
        template::resolve_filename(self, entry).await
    }

    /// Resolve the public URL for a normalized entry
    pub async fn resolve_url(&self, entry: &Entry) -> Result<String> {
        template::resolve_url(self, entry).await
    }

    /// Resolve the storage path for one media file
    pub async fn resolve_file_path(
        &self,
        kind: MediaKind,
        file: &MediaFile,
        entry: &Entry,
    ) -> Result<String> {
        files::resolve_file_path(self, kind, file, entry).await
    }

    /// Resolve the public URL for one media file
    pub async fn resolve_file_url(
        &self,
        kind: MediaKind,
        file: &MediaFile,
        entry: &Entry,
    ) -> Result<String> {
        files::resolve_file_url(self, kind, file, entry).await
    }

    /// Normalize an entry and resolve its document, paths and files
    pub async fn process_all(&self, entry: &Entry) -> Result<FormattedBundle> {
        format::process_all(self, entry).await
    }
}

impl Default for Formatter {
    fn default() -> Self {
        Self::new()
    }
}
