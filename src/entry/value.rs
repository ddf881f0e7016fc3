//! Property values and plain-text extraction

use indexmap::IndexMap;
use serde::de::{self, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

use crate::helpers::{collapse_whitespace, decode_entities, strip_tags};

/// A single microformats2 property value
///
/// Micropub payloads carry either bare strings or objects with `value`
/// and/or `html` members. Numbers fold to their string form when
/// deserialized.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    /// A bare string value
    Plain(String),
    /// A structured value, such as an `e-content` object
    Item {
        /// Plain-text rendition
        value: Option<String>,
        /// HTML rendition
        html: Option<String>,
        /// Members other than `value`/`html`, kept for round-trips
        extra: IndexMap<String, serde_json::Value>,
    },
}

impl PropertyValue {
    /// A bare string value
    pub fn plain(value: impl Into<String>) -> Self {
        PropertyValue::Plain(value.into())
    }

    /// A structured value carrying only an HTML rendition
    pub fn html(html: impl Into<String>) -> Self {
        PropertyValue::Item {
            value: None,
            html: Some(html.into()),
            extra: IndexMap::new(),
        }
    }

    /// The bare string form, `None` for structured values
    pub fn as_plain(&self) -> Option<&str> {
        match self {
            PropertyValue::Plain(s) => Some(s),
            PropertyValue::Item { .. } => None,
        }
    }

    /// The HTML rendition, when present and non-empty
    pub fn html_content(&self) -> Option<&str> {
        match self {
            PropertyValue::Item { html: Some(h), .. } if !h.is_empty() => Some(h),
            _ => None,
        }
    }

    /// The literal string form: a bare string or the `value` member
    pub fn literal(&self) -> &str {
        match self {
            PropertyValue::Plain(s) => s,
            PropertyValue::Item { value: Some(v), .. } => v,
            PropertyValue::Item { value: None, .. } => "",
        }
    }

    /// Plain-text rendition, if any
    ///
    /// Prefers an explicit plain value and falls back to the HTML
    /// rendition with tags replaced by spaces and entities decoded.
    /// Empty results count as absent.
    pub fn to_plain_text(&self) -> Option<String> {
        match self {
            PropertyValue::Plain(s) if !s.is_empty() => Some(s.clone()),
            PropertyValue::Plain(_) => None,
            PropertyValue::Item { value: Some(v), .. } if !v.is_empty() => Some(v.clone()),
            PropertyValue::Item { html: Some(h), .. } if !h.is_empty() => {
                let text = collapse_whitespace(&decode_entities(&strip_tags(h)));
                if text.is_empty() {
                    None
                } else {
                    Some(text)
                }
            }
            PropertyValue::Item { .. } => None,
        }
    }
}

/// Extract the plain-text renditions of a property's values
///
/// Values without usable text are dropped; order is preserved.
pub fn extract_values(values: &[PropertyValue]) -> Vec<String> {
    values.iter().filter_map(|v| v.to_plain_text()).collect()
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        PropertyValue::plain(value)
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        PropertyValue::Plain(value)
    }
}

impl Serialize for PropertyValue {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            PropertyValue::Plain(s) => serializer.serialize_str(s),
            PropertyValue::Item { value, html, extra } => {
                let len = value.is_some() as usize + html.is_some() as usize + extra.len();
                let mut map = serializer.serialize_map(Some(len))?;
                if let Some(v) = value {
                    map.serialize_entry("value", v)?;
                }
                if let Some(h) = html {
                    map.serialize_entry("html", h)?;
                }
                for (key, item) in extra {
                    map.serialize_entry(key, item)?;
                }
                map.end()
            }
        }
    }
}

impl<'de> Deserialize<'de> for PropertyValue {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct ValueVisitor;

        impl<'de> Visitor<'de> for ValueVisitor {
            type Value = PropertyValue;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a string, a number or an object")
            }

            fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                Ok(PropertyValue::plain(value))
            }

            fn visit_string<E>(self, value: String) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                Ok(PropertyValue::Plain(value))
            }

            fn visit_i64<E>(self, value: i64) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                Ok(PropertyValue::Plain(value.to_string()))
            }

            fn visit_u64<E>(self, value: u64) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                Ok(PropertyValue::Plain(value.to_string()))
            }

            fn visit_f64<E>(self, value: f64) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                Ok(PropertyValue::Plain(value.to_string()))
            }

            fn visit_map<M>(self, mut access: M) -> Result<Self::Value, M::Error>
            where
                M: MapAccess<'de>,
            {
                let mut value = None;
                let mut html = None;
                let mut extra = IndexMap::new();

                while let Some((key, item)) = access.next_entry::<String, serde_json::Value>()? {
                    match (key.as_str(), scalar_string(&item)) {
                        ("value", Some(s)) => value = Some(s),
                        ("html", Some(s)) => html = Some(s),
                        _ => {
                            extra.insert(key, item);
                        }
                    }
                }

                Ok(PropertyValue::Item { value, html, extra })
            }
        }

        deserializer.deserialize_any(ValueVisitor)
    }
}

/// String form of a scalar JSON value, `None` for everything else
fn scalar_string(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_plain_values() {
        let values = vec![PropertyValue::plain("foo"), PropertyValue::plain("bar")];
        assert_eq!(extract_values(&values), vec!["foo", "bar"]);
    }

    #[test]
    fn test_extract_prefers_value_over_html() {
        let values = vec![PropertyValue::Item {
            value: Some("plain".to_string()),
            html: Some("<p>rich</p>".to_string()),
            extra: IndexMap::new(),
        }];
        assert_eq!(extract_values(&values), vec!["plain"]);
    }

    #[test]
    fn test_extract_strips_html() {
        let values = vec![PropertyValue::html("<h1>Foo</h1> Bar &amp; <strong>Abc</strong>")];
        assert_eq!(extract_values(&values), vec!["Foo Bar & Abc"]);
    }

    #[test]
    fn test_extract_drops_empty_values() {
        let values = vec![
            PropertyValue::plain(""),
            PropertyValue::plain("kept"),
            PropertyValue::html("<p></p>"),
        ];
        assert_eq!(extract_values(&values), vec!["kept"]);
    }

    #[test]
    fn test_deserialize_string_and_object() {
        let values: Vec<PropertyValue> =
            serde_json::from_str(r#"["hello", {"html": "<p>hi</p>"}, 42]"#).unwrap();

        assert_eq!(values[0], PropertyValue::plain("hello"));
        assert_eq!(values[1].html_content(), Some("<p>hi</p>"));
        assert_eq!(values[2], PropertyValue::plain("42"));
    }

    #[test]
    fn test_deserialize_keeps_extra_members() {
        let value: PropertyValue =
            serde_json::from_str(r#"{"value": "x", "lat": 59.3}"#).unwrap();

        match value {
            PropertyValue::Item { value, extra, .. } => {
                assert_eq!(value.as_deref(), Some("x"));
                assert!(extra.contains_key("lat"));
            }
            other => panic!("expected an item, got {other:?}"),
        }
    }

    #[test]
    fn test_serialize_round_trip() {
        let original: Vec<PropertyValue> =
            serde_json::from_str(r#"["a", {"value": "b", "html": "<b>b</b>"}]"#).unwrap();
        let json = serde_json::to_string(&original).unwrap();
        let back: Vec<PropertyValue> = serde_json::from_str(&json).unwrap();
        assert_eq!(original, back);
    }
}
