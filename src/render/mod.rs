//! Post document rendering
//!
//! A rendered document is a YAML front matter block followed by the
//! entry content, HTML values converted to Markdown and plain values
//! escaped.

use anyhow::{Context, Result};
use chrono::SecondsFormat;
use futures::future::join_all;
use indexmap::IndexMap;
use tracing::warn;

use crate::entry::{extract_values, Entry, LayoutOverride, PropertyValue};
use crate::helpers::escape_html;
use crate::Formatter;

const DEFAULT_LAYOUT: &str = "micropubpost";

/// Properties rendered outside the front matter, or not at all
const IGNORED_PROPERTIES: &[&str] = &["content", "published", "url"];

fn mapped_key(key: &str) -> Option<&'static str> {
    match key {
        "name" => Some("title"),
        "slug" => Some("slug"),
        "category" => Some("tags"),
        "lang" => Some("lang"),
        _ => None,
    }
}

fn yaml_str(value: impl Into<String>) -> serde_yaml::Value {
    serde_yaml::Value::String(value.into())
}

/// Front matter mapping for a normalized entry
///
/// Well-known properties map to their post keys, everything else keeps
/// its values under an `mf-` prefixed key. `title` is seeded empty so
/// it always appears, in a stable position, even for nameless notes.
pub(crate) fn front_matter_data(entry: &Entry) -> Result<IndexMap<String, serde_yaml::Value>> {
    let published = entry
        .published_at()
        .context("entry has no parseable published timestamp")?;

    let mut data = IndexMap::new();
    match &entry.derived.layout {
        None => {
            data.insert("layout".to_string(), yaml_str(DEFAULT_LAYOUT));
        }
        Some(LayoutOverride::Custom(layout)) => {
            data.insert("layout".to_string(), yaml_str(layout));
        }
        Some(LayoutOverride::Disabled) => {}
    }
    data.insert(
        "date".to_string(),
        yaml_str(published.to_rfc3339_opts(SecondsFormat::Millis, true)),
    );
    data.insert("title".to_string(), yaml_str(""));

    for (key, values) in &entry.properties {
        if values.is_empty() || IGNORED_PROPERTIES.contains(&key.as_str()) {
            continue;
        }
        match mapped_key(key) {
            Some(mapped) => {
                data.insert(mapped.to_string(), yaml_str(extract_values(values).join(" ")));
            }
            None => {
                let sequence = values.iter().map(property_value_to_yaml).collect();
                data.insert(format!("mf-{}", key), serde_yaml::Value::Sequence(sequence));
            }
        }
    }

    if let Some(category) = &entry.derived.category {
        data.insert("category".to_string(), yaml_str(category));
    }
    if let Some(person_tags) = &entry.derived.person_tags {
        let sequence = person_tags.iter().map(yaml_str).collect();
        data.insert("persontags".to_string(), serde_yaml::Value::Sequence(sequence));
    }

    Ok(data)
}

fn property_value_to_yaml(value: &PropertyValue) -> serde_yaml::Value {
    match value {
        PropertyValue::Plain(text) => yaml_str(text),
        PropertyValue::Item { value, html, extra } => {
            let mut mapping = serde_yaml::Mapping::new();
            if let Some(value) = value {
                mapping.insert(yaml_str("value"), yaml_str(value));
            }
            if let Some(html) = html {
                mapping.insert(yaml_str("html"), yaml_str(html));
            }
            for (key, member) in extra {
                mapping.insert(yaml_str(key), json_value_to_yaml(member));
            }
            serde_yaml::Value::Mapping(mapping)
        }
    }
}

fn json_value_to_yaml(value: &serde_json::Value) -> serde_yaml::Value {
    match value {
        serde_json::Value::Null => serde_yaml::Value::Null,
        serde_json::Value::Bool(b) => serde_yaml::Value::Bool(*b),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                serde_yaml::Value::Number(i.into())
            } else if let Some(u) = n.as_u64() {
                serde_yaml::Value::Number(u.into())
            } else {
                serde_yaml::Value::Number(n.as_f64().unwrap_or(0.0).into())
            }
        }
        serde_json::Value::String(s) => yaml_str(s),
        serde_json::Value::Array(members) => {
            serde_yaml::Value::Sequence(members.iter().map(json_value_to_yaml).collect())
        }
        serde_json::Value::Object(members) => {
            let mut mapping = serde_yaml::Mapping::new();
            for (key, member) in members {
                mapping.insert(yaml_str(key), json_value_to_yaml(member));
            }
            serde_yaml::Value::Mapping(mapping)
        }
    }
}

/// Front matter block, framed by `---` lines
pub(crate) fn front_matter(entry: &Entry) -> Result<String> {
    let data = front_matter_data(entry)?;
    let yaml = serde_yaml::to_string(&data).context("failed to serialize front matter")?;
    Ok(format!("---\n{}---\n", yaml))
}

async fn render_content_value(fmt: &Formatter, value: &PropertyValue) -> String {
    if let Some(html) = value.html_content() {
        if !fmt.markdown {
            return html.to_string();
        }
        return match fmt.markdown_converter.to_markdown(html).await {
            Ok(markdown) => markdown,
            Err(error) => {
                warn!(%error, "markdown conversion failed, keeping raw HTML");
                html.to_string()
            }
        };
    }

    escape_html(value.literal())
}

/// Rendered entry content, one block per content value
pub(crate) async fn body(fmt: &Formatter, entry: &Entry) -> String {
    let Some(content) = entry.properties.get("content") else {
        return String::new();
    };

    let rendered = join_all(content.iter().map(|value| render_content_value(fmt, value))).await;

    let parts: Vec<String> = rendered.into_iter().filter(|part| !part.is_empty()).collect();
    format!("{}\n", parts.join("\n"))
}

/// The complete post document for a normalized entry
pub(crate) async fn document(fmt: &Formatter, entry: &Entry) -> Result<String> {
    let front_matter = front_matter(entry)?;
    let body = body(fmt, entry).await;
    Ok(format!("{}{}", front_matter, body))
}
