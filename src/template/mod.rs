//! Path-style templates for filenames, media paths and permalinks
//!
//! A [`PathStyle`] is either a literal pattern with `:placeholder`
//! tokens or a callback producing such a pattern per entry. Literal
//! styles are validated when the formatter is built, callback output
//! when it is resolved.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::Arc;

use crate::config::ConfigError;
use crate::entry::{Entry, PropertyMap};
use crate::helpers::join_url;
use crate::Formatter;

/// Placeholders recognized in path styles
pub const PLACEHOLDERS: &[&str] = &[
    ":year",
    ":month",
    ":day",
    ":i_month",
    ":i_day",
    ":hour",
    ":minute",
    ":second",
    ":slug",
    ":title",
    ":categories",
    ":name",
    ":filesslug",
];

/// Callback producing a path pattern for an entry
#[async_trait]
pub trait StyleCallback: Send + Sync {
    async fn style(&self, properties: &PropertyMap) -> Result<String>;
}

/// A path template, literal or computed per entry
#[derive(Clone)]
pub enum PathStyle {
    Literal(String),
    Dynamic(Arc<dyn StyleCallback>),
}

impl PathStyle {
    /// Wrap a plain function as a dynamic style
    pub fn from_fn<F>(f: F) -> Self
    where
        F: Fn(&PropertyMap) -> String + Send + Sync + 'static,
    {
        struct FnStyle<F>(F);

        #[async_trait]
        impl<F> StyleCallback for FnStyle<F>
        where
            F: Fn(&PropertyMap) -> String + Send + Sync,
        {
            async fn style(&self, properties: &PropertyMap) -> Result<String> {
                Ok((self.0)(properties))
            }
        }

        PathStyle::Dynamic(Arc::new(FnStyle(f)))
    }

    /// The pattern for an entry, calling the callback when dynamic
    pub(crate) async fn resolve(&self, properties: &PropertyMap) -> Result<String> {
        match self {
            PathStyle::Literal(pattern) => Ok(pattern.clone()),
            PathStyle::Dynamic(callback) => callback
                .style(properties)
                .await
                .context("style callback failed"),
        }
    }
}

impl From<&str> for PathStyle {
    fn from(pattern: &str) -> Self {
        PathStyle::Literal(pattern.to_string())
    }
}

impl From<String> for PathStyle {
    fn from(pattern: String) -> Self {
        PathStyle::Literal(pattern)
    }
}

impl fmt::Debug for PathStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathStyle::Literal(pattern) => f.debug_tuple("Literal").field(pattern).finish(),
            PathStyle::Dynamic(_) => f.write_str("Dynamic(..)"),
        }
    }
}

/// Whether a pattern contains at least one recognized placeholder
pub(crate) fn contains_placeholder(pattern: &str) -> bool {
    PLACEHOLDERS.iter().any(|p| pattern.contains(p))
}

/// Values substituted into a path style
#[derive(Debug, Clone)]
pub(crate) struct StyleContext {
    pub published: DateTime<Utc>,
    pub slug: String,
    pub category: Option<String>,
    /// Basename of the resolved filename, permalinks only
    pub name: Option<String>,
    /// Folded media filename, files styles only
    pub files_slug: Option<String>,
}

/// Substitute placeholders and tidy the resulting path
///
/// Duplicate slash runs collapse to one, which absorbs an empty
/// `:categories` segment, and the leading slash is stripped so outputs
/// stay relative.
pub(crate) fn substitute(pattern: &str, ctx: &StyleContext) -> String {
    let date = &ctx.published;
    let mut path = pattern.to_string();

    if let Some(files_slug) = &ctx.files_slug {
        path = path.replace(":filesslug", files_slug);
    }
    path = path
        .replace(":categories", ctx.category.as_deref().unwrap_or(""))
        .replace(":year", &date.format("%Y").to_string())
        .replace(":month", &date.format("%m").to_string())
        .replace(":day", &date.format("%d").to_string())
        .replace(":i_month", &date.format("%-m").to_string())
        .replace(":i_day", &date.format("%-d").to_string())
        .replace(":hour", &date.format("%H").to_string())
        .replace(":minute", &date.format("%M").to_string())
        .replace(":second", &date.format("%S").to_string())
        .replace(":slug", &ctx.slug)
        .replace(":title", &ctx.slug);
    if let Some(name) = &ctx.name {
        path = path.replace(":name", name);
    }

    let mut tidied = String::with_capacity(path.len());
    let mut previous_slash = false;
    for c in path.chars() {
        if c == '/' {
            if previous_slash {
                continue;
            }
            previous_slash = true;
        } else {
            previous_slash = false;
        }
        tidied.push(c);
    }
    tidied.trim_start_matches('/').to_string()
}

/// Style context for an entry, minus the per-style extras
fn entry_context(entry: &Entry) -> Result<StyleContext> {
    let published = entry
        .published_at()
        .context("entry has no parseable published timestamp")?;

    Ok(StyleContext {
        published,
        slug: entry.first_value("slug").unwrap_or_default(),
        category: entry.derived.category.clone(),
        name: None,
        files_slug: None,
    })
}

/// Storage filename for an entry
///
/// The extension follows the markdown setting and is appended after
/// substitution, the style never carries one.
pub(crate) async fn resolve_filename(fmt: &Formatter, entry: &Entry) -> Result<String> {
    let pattern = fmt.filename_style.resolve(&entry.properties).await?;
    if !contains_placeholder(&pattern) {
        return Err(ConfigError::MissingPlaceholder {
            kind: "filename",
            style: pattern,
        }
        .into());
    }

    let ctx = entry_context(entry)?;
    let extension = if fmt.markdown { "md" } else { "html" };
    Ok(format!("{}.{}", substitute(&pattern, &ctx), extension))
}

/// Public URL for an entry
///
/// The `:name` placeholder expands to the basename of the resolved
/// filename, so the filename is computed first.
pub(crate) async fn resolve_url(fmt: &Formatter, entry: &Entry) -> Result<String> {
    let pattern = fmt.permalink_style.resolve(&entry.properties).await?;
    if !contains_placeholder(&pattern) {
        return Err(ConfigError::MissingPlaceholder {
            kind: "permalink",
            style: pattern,
        }
        .into());
    }

    let mut ctx = entry_context(entry)?;
    if pattern.contains(":name") {
        let filename = resolve_filename(fmt, entry).await?;
        ctx.name = Some(basename_without_extension(&filename).to_string());
    }

    let path = substitute(&pattern, &ctx);
    Ok(match &fmt.base_url {
        Some(base) => join_url(base, &path),
        None => path,
    })
}

fn basename_without_extension(path: &str) -> &str {
    let base = path.rsplit('/').next().unwrap_or(path);
    match base.rsplit_once('.') {
        Some((stem, _)) => stem,
        None => base,
    }
}
