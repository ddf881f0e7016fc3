//! Entry normalization
//!
//! Normalization turns a raw Micropub submission into a publishable
//! entry: the published timestamp and slug are ensured, language codes
//! are detected and folded, person tags and a category are derived,
//! configured defaults are applied and media uploads are relocated.

pub mod category;
pub mod lang;
pub mod slug;

use anyhow::Result;
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use tracing::debug;

use crate::config::CategoryDerivation;
use crate::entry::{Derived, Entry, MediaFile};
use crate::{files, render, template, Formatter};

/// Backdate applied when an entry arrives without a published timestamp
const PUBLISH_BACKDATE_SECONDS: i64 = 15;

fn default_published() -> DateTime<Utc> {
    Utc::now() - Duration::seconds(PUBLISH_BACKDATE_SECONDS)
}

/// Normalize an entry without rendering it
///
/// Already normalized entries pass through unchanged, so feeding a
/// stored entry back in is safe.
pub(crate) async fn normalize(fmt: &Formatter, entry: &Entry) -> Result<Entry> {
    if entry.pre_formatted {
        return Ok(entry.clone());
    }
    let mut entry = entry.clone();

    let published = entry.published_at().unwrap_or_else(default_published);
    entry.set_plain(
        "published",
        published.to_rfc3339_opts(SecondsFormat::Millis, true),
    );

    let slug = slug::derive_slug(&entry, fmt.content_slug, published);
    entry.properties.insert(
        "slug".to_string(),
        if slug.is_empty() {
            Vec::new()
        } else {
            vec![slug.into()]
        },
    );

    if let Some(detector) = &fmt.language_detector {
        if let Some(code) =
            lang::detect_language(&entry, &fmt.derive_languages, detector.as_ref()).await?
        {
            entry.set_plain("lang", code);
        }
    }
    lang::fold_language_codes(&mut entry, fmt.iso639_registry.as_ref());

    // Derived values never survive normalization, only a layout set by
    // the caller does.
    let layout = entry.derived.layout.take();
    entry.derived = Derived {
        layout,
        ..Derived::default()
    };

    entry.derived.person_tags = category::extract_person_tags(&mut entry, &fmt.person_tag_pattern);
    entry.derived.category = match &fmt.derive_category {
        CategoryDerivation::Custom(classifier) => classifier.classify(&entry.properties).await?,
        CategoryDerivation::Disabled => None,
        CategoryDerivation::Enabled => category::classify(&entry),
    };
    if let Some(category) = &entry.derived.category {
        debug!(category = %category, "derived entry category");
    }

    if let Some(defaults) = &fmt.defaults {
        entry.apply_defaults(defaults);
    }

    files::relocate(fmt, &mut entry).await?;

    entry.pre_formatted = true;
    Ok(entry)
}

/// Everything needed to publish one entry
#[derive(Debug, Clone)]
pub struct FormattedBundle {
    /// Storage filename for the rendered document
    pub filename: String,
    /// Public URL the entry will live at
    pub url: String,
    /// Rendered document, front matter plus body
    pub content: String,
    /// Relocated media files to persist alongside the document
    pub files: Vec<MediaFile>,
    /// The normalized entry the bundle was rendered from
    pub entry: Entry,
}

/// Normalize an entry and resolve its document, paths and files
pub(crate) async fn process_all(fmt: &Formatter, entry: &Entry) -> Result<FormattedBundle> {
    let entry = normalize(fmt, entry).await?;

    let (filename, url, content) = futures::try_join!(
        template::resolve_filename(fmt, &entry),
        template::resolve_url(fmt, &entry),
        render::document(fmt, &entry),
    )?;

    Ok(FormattedBundle {
        filename,
        url,
        content,
        files: entry.files.relocated().to_vec(),
        entry,
    })
}
