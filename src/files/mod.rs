//! Media file placement
//!
//! Pending photo, video and audio uploads are assigned storage paths
//! from the files style, their public URLs are appended to the matching
//! entry properties and the buffers are kept for the caller to persist.

use anyhow::{Context, Result};
use futures::future::try_join_all;
use std::mem;
use tracing::debug;

use crate::config::ConfigError;
use crate::entry::{Entry, EntryFiles, MediaFile, MediaKind};
use crate::format::slug::semi_kebab_case;
use crate::helpers::join_url;
use crate::template::{substitute, StyleContext};
use crate::Formatter;

/// Fold an uploaded filename into a path-safe one
///
/// Each dot-separated segment is folded on its own so the extension
/// survives, `123.ExampleIs Very-Cool.jpg` becomes
/// `123.example-is-very-cool.jpg`.
pub fn files_slug(filename: &str) -> String {
    filename
        .trim()
        .split('.')
        .map(semi_kebab_case)
        .collect::<Vec<_>>()
        .join(".")
}

fn file_context(entry: &Entry, file: &MediaFile) -> Result<StyleContext> {
    let published = entry
        .published_at()
        .context("entry has no parseable published timestamp")?;

    Ok(StyleContext {
        published,
        slug: entry.first_value("slug").unwrap_or_default(),
        category: entry.derived.category.clone(),
        name: None,
        files_slug: Some(files_slug(&file.filename)),
    })
}

/// Storage path for one media file
pub(crate) async fn resolve_file_path(
    fmt: &Formatter,
    kind: MediaKind,
    file: &MediaFile,
    entry: &Entry,
) -> Result<String> {
    let pattern = fmt.files_style.resolve(&entry.properties).await?;
    if !pattern.contains(":filesslug") {
        return Err(ConfigError::MissingFilesSlug(pattern).into());
    }

    debug!(kind = %kind, filename = %file.filename, "resolving media file path");

    let ctx = file_context(entry, file)?;
    Ok(substitute(&pattern, &ctx))
}

/// Public URL for one media file
pub(crate) async fn resolve_file_url(
    fmt: &Formatter,
    kind: MediaKind,
    file: &MediaFile,
    entry: &Entry,
) -> Result<String> {
    let path = resolve_file_path(fmt, kind, file, entry).await?;
    Ok(match &fmt.base_url {
        Some(base) => join_url(base, &path),
        None => path,
    })
}

/// Move pending uploads into their final paths and properties
///
/// URLs are pushed after any values already on the property, so a photo
/// URL submitted alongside an upload stays first. Relocating twice is a
/// no-op.
pub(crate) async fn relocate(fmt: &Formatter, entry: &mut Entry) -> Result<()> {
    let pending = match mem::take(&mut entry.files) {
        EntryFiles::Pending(pending) => pending,
        relocated @ EntryFiles::Relocated(_) => {
            entry.files = relocated;
            return Ok(());
        }
    };
    if pending.is_empty() {
        entry.files = EntryFiles::Relocated(Vec::new());
        return Ok(());
    }

    let entry_ref: &Entry = entry;
    let mut resolutions = Vec::new();
    for (kind, files) in [
        (MediaKind::Video, pending.video),
        (MediaKind::Photo, pending.photo),
        (MediaKind::Audio, pending.audio),
    ] {
        for file in files {
            resolutions.push(async move {
                let path = resolve_file_path(fmt, kind, &file, entry_ref).await?;
                let url = match &fmt.base_url {
                    Some(base) => join_url(base, &path),
                    None => path.clone(),
                };
                Ok::<_, anyhow::Error>((kind, file, path, url))
            });
        }
    }
    let resolved = try_join_all(resolutions).await?;

    let mut relocated = Vec::with_capacity(resolved.len());
    for (kind, file, path, url) in resolved {
        entry.push_plain(kind.property(), url);
        relocated.push(MediaFile {
            filename: path,
            buffer: file.buffer,
        });
    }
    entry.files = EntryFiles::Relocated(relocated);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::MediaFiles;
    use std::sync::Arc;

    fn entry() -> Entry {
        let mut entry = Entry::default();
        entry.set_plain("slug", "awesomeness-is-awesome");
        entry.set_plain("published", "2015-06-30T14:34:01.000Z");
        entry
    }

    #[test]
    fn test_files_slug() {
        assert_eq!(files_slug("example.jpg"), "example.jpg");
        assert_eq!(
            files_slug("123.ExampleIs Very-Cool.jpg"),
            "123.example-is-very-cool.jpg"
        );
        assert_eq!(files_slug("  spaced name.png "), "spaced-name.png");
    }

    #[tokio::test]
    async fn test_resolve_file_path_default_style() {
        let fmt = Formatter::new();
        let file = MediaFile::new("foo.jpg", vec![1, 2, 3]);

        let path = resolve_file_path(&fmt, MediaKind::Photo, &file, &entry())
            .await
            .unwrap();
        assert_eq!(path, "media/2015-06-awesomeness-is-awesome/foo.jpg");
    }

    #[tokio::test]
    async fn test_resolve_file_url_with_base() {
        let fmt = Formatter::relative_to("http://example.com/bar/").unwrap();
        let file = MediaFile::new("foo.jpg", vec![1, 2, 3]);

        let url = resolve_file_url(&fmt, MediaKind::Photo, &file, &entry())
            .await
            .unwrap();
        assert_eq!(
            url,
            "http://example.com/bar/media/2015-06-awesomeness-is-awesome/foo.jpg"
        );
    }

    #[tokio::test]
    async fn test_relocate_assigns_paths_and_urls() {
        let fmt = Formatter::relative_to("http://example.com/").unwrap();
        let mut entry = entry();
        entry.files = EntryFiles::Pending(MediaFiles {
            photo: vec![MediaFile::new("foo.jpg", vec![1, 2, 3])],
            ..MediaFiles::default()
        });

        relocate(&fmt, &mut entry).await.unwrap();

        assert_eq!(
            entry.values("photo"),
            vec!["http://example.com/media/2015-06-awesomeness-is-awesome/foo.jpg"]
        );
        let files = entry.files.relocated();
        assert_eq!(files.len(), 1);
        assert_eq!(
            files[0].filename,
            "media/2015-06-awesomeness-is-awesome/foo.jpg"
        );
        assert_eq!(*files[0].buffer, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_relocate_appends_after_existing_urls() {
        let fmt = Formatter::new();
        let mut entry = entry();
        entry.push_plain("photo", "http://example.com/existing.jpg");
        entry.files = EntryFiles::Pending(MediaFiles {
            photo: vec![MediaFile::new("foo.jpg", vec![1])],
            ..MediaFiles::default()
        });

        relocate(&fmt, &mut entry).await.unwrap();

        assert_eq!(
            entry.values("photo"),
            vec![
                "http://example.com/existing.jpg",
                "media/2015-06-awesomeness-is-awesome/foo.jpg",
            ]
        );
    }

    #[tokio::test]
    async fn test_relocate_custom_style() {
        let options = crate::FormatterOptions {
            files_style: "files/:year/:month/:slug/:filesslug".into(),
            ..crate::FormatterOptions::default()
        };
        let fmt = Formatter::with_options(options).unwrap();
        let mut entry = entry();
        entry.files = EntryFiles::Pending(MediaFiles {
            photo: vec![MediaFile::new("bar.png", vec![9])],
            ..MediaFiles::default()
        });

        relocate(&fmt, &mut entry).await.unwrap();

        assert_eq!(
            entry.files.relocated()[0].filename,
            "files/2015/06/awesomeness-is-awesome/bar.png"
        );
    }

    #[tokio::test]
    async fn test_relocate_preserves_buffers() {
        let fmt = Formatter::new();
        let buffer = Arc::new(vec![7, 8, 9]);
        let mut entry = entry();
        entry.files = EntryFiles::Pending(MediaFiles {
            audio: vec![MediaFile {
                filename: "clip.mp3".to_string(),
                buffer: Arc::clone(&buffer),
            }],
            ..MediaFiles::default()
        });

        relocate(&fmt, &mut entry).await.unwrap();

        assert!(Arc::ptr_eq(&entry.files.relocated()[0].buffer, &buffer));
    }

    #[tokio::test]
    async fn test_relocate_twice_is_noop() {
        let fmt = Formatter::new();
        let mut entry = entry();
        entry.files = EntryFiles::Pending(MediaFiles {
            photo: vec![MediaFile::new("foo.jpg", vec![1])],
            ..MediaFiles::default()
        });

        relocate(&fmt, &mut entry).await.unwrap();
        let first = entry.clone();
        relocate(&fmt, &mut entry).await.unwrap();

        assert_eq!(entry, first);
    }

    #[tokio::test]
    async fn test_style_without_filesslug_rejected() {
        let options = crate::FormatterOptions {
            files_style: crate::PathStyle::from_fn(|_| "media/:year/:slug".to_string()),
            ..crate::FormatterOptions::default()
        };
        let fmt = Formatter::with_options(options).unwrap();
        let file = MediaFile::new("foo.jpg", vec![1]);

        let err = resolve_file_path(&fmt, MediaKind::Photo, &file, &entry())
            .await
            .unwrap_err();
        assert!(err.to_string().contains(":filesslug"));
    }
}
