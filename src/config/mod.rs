//! Formatter options and their validation
//!
//! Options are resolved once when a [`Formatter`](crate::Formatter) is
//! built. Literal path styles are checked here so a bad pattern fails
//! construction instead of the first entry.

use async_trait::async_trait;
use regex::Regex;
use std::sync::Arc;
use thiserror::Error;

use crate::entry::{EntryDefaults, PropertyMap};
use crate::helpers::has_scheme;
use crate::services::{Iso639Registry, LanguageDetector, MarkdownConverter};
use crate::template::{contains_placeholder, PathStyle};

/// Filename pattern, relative to the site root
pub const DEFAULT_FILENAME_STYLE: &str = "_posts/:year-:month-:day-:slug";

/// Media file pattern, must keep a `:filesslug` token
pub const DEFAULT_FILES_STYLE: &str = "media/:year-:month-:slug/:filesslug";

/// Permalink pattern, matching the usual Jekyll permalink config
pub const DEFAULT_PERMALINK_STYLE: &str = "/:categories/:year/:month/:day/:title.html";

/// Invalid formatter configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{kind} style '{style}' contains no recognized placeholder")]
    MissingPlaceholder { kind: &'static str, style: String },
    #[error("files style '{0}' must contain :filesslug")]
    MissingFilesSlug(String),
    #[error("language derivation is enabled but no detector is configured")]
    MissingLanguageDetector,
    #[error("base URL '{0}' is not absolute")]
    InvalidBaseUrl(String),
}

/// Whether and how to detect the language of unlabelled entries
#[derive(Debug, Clone, Default, PartialEq)]
pub enum LanguageDerivation {
    #[default]
    Off,
    /// Accept whatever the detector reports
    Any,
    /// Accept only the listed language codes
    Whitelist(Vec<String>),
}

/// Callback deciding the derived category for an entry
#[async_trait]
pub trait CategoryClassifier: Send + Sync {
    async fn classify(&self, properties: &PropertyMap) -> anyhow::Result<Option<String>>;
}

/// How the derived category is chosen
#[derive(Clone, Default)]
pub enum CategoryDerivation {
    /// Built-in link and social classification
    #[default]
    Enabled,
    Disabled,
    Custom(Arc<dyn CategoryClassifier>),
}

impl CategoryDerivation {
    /// Wrap a plain function as a custom classifier
    pub fn from_fn<F>(f: F) -> Self
    where
        F: Fn(&PropertyMap) -> Option<String> + Send + Sync + 'static,
    {
        struct FnClassifier<F>(F);

        #[async_trait]
        impl<F> CategoryClassifier for FnClassifier<F>
        where
            F: Fn(&PropertyMap) -> Option<String> + Send + Sync,
        {
            async fn classify(&self, properties: &PropertyMap) -> anyhow::Result<Option<String>> {
                Ok((self.0)(properties))
            }
        }

        CategoryDerivation::Custom(Arc::new(FnClassifier(f)))
    }
}

/// Options accepted by [`Formatter::with_options`](crate::Formatter::with_options)
#[derive(Clone)]
pub struct FormatterOptions {
    /// Convert HTML content to Markdown and use an `.md` extension
    pub markdown: bool,
    /// Fall back to the content text when deriving a missing slug
    pub content_slug: bool,
    /// Properties and derived values filled in when an entry lacks them
    pub defaults: Option<EntryDefaults>,
    pub derive_languages: LanguageDerivation,
    pub derive_category: CategoryDerivation,
    pub filename_style: PathStyle,
    pub files_style: PathStyle,
    pub permalink_style: PathStyle,
    /// Absolute base joined onto permalinks and media URLs
    pub base_url: Option<String>,
    /// Category values matching this pattern become person tags
    pub person_tag_pattern: Option<Regex>,
    pub markdown_converter: Option<Arc<dyn MarkdownConverter>>,
    pub language_detector: Option<Arc<dyn LanguageDetector>>,
    pub iso639_registry: Option<Arc<dyn Iso639Registry>>,
}

impl Default for FormatterOptions {
    fn default() -> Self {
        Self {
            markdown: true,
            content_slug: false,
            defaults: None,
            derive_languages: LanguageDerivation::default(),
            derive_category: CategoryDerivation::default(),
            filename_style: DEFAULT_FILENAME_STYLE.into(),
            files_style: DEFAULT_FILES_STYLE.into(),
            permalink_style: DEFAULT_PERMALINK_STYLE.into(),
            base_url: None,
            person_tag_pattern: None,
            markdown_converter: None,
            language_detector: None,
            iso639_registry: None,
        }
    }
}

/// Reject option combinations that could only fail later
pub(crate) fn validate(options: &FormatterOptions) -> Result<(), ConfigError> {
    if let PathStyle::Literal(style) = &options.filename_style {
        if !contains_placeholder(style) {
            return Err(ConfigError::MissingPlaceholder {
                kind: "filename",
                style: style.clone(),
            });
        }
    }
    if let PathStyle::Literal(style) = &options.permalink_style {
        if !contains_placeholder(style) {
            return Err(ConfigError::MissingPlaceholder {
                kind: "permalink",
                style: style.clone(),
            });
        }
    }
    if let PathStyle::Literal(style) = &options.files_style {
        if !style.contains(":filesslug") {
            return Err(ConfigError::MissingFilesSlug(style.clone()));
        }
    }

    if let Some(base_url) = &options.base_url {
        if !has_scheme(base_url) {
            return Err(ConfigError::InvalidBaseUrl(base_url.clone()));
        }
    }

    if options.derive_languages != LanguageDerivation::Off && options.language_detector.is_none() {
        return Err(ConfigError::MissingLanguageDetector);
    }

    Ok(())
}
