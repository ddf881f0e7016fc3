//! HTML helper functions

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref TAG: Regex = Regex::new(r"<[^>]+>").unwrap();
    static ref WHITESPACE: Regex = Regex::new(r"\s+").unwrap();
    static ref NUMERIC_ENTITY: Regex = Regex::new(r"^#(?:x([0-9a-fA-F]+)|([0-9]+))$").unwrap();
}

/// Escape HTML special characters
pub fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

/// Replace every tag with a single space
///
/// Used when projecting HTML values down to plain text; the space keeps
/// adjacent words from running together (`<p>a</p><p>b</p>` -> `a b`
/// after whitespace collapsing).
pub fn strip_tags(s: &str) -> String {
    TAG.replace_all(s, " ").into_owned()
}

/// Collapse runs of whitespace to a single space and trim
pub fn collapse_whitespace(s: &str) -> String {
    WHITESPACE.replace_all(s, " ").trim().to_string()
}

/// Decode HTML entities (named and numeric) into their characters
///
/// Unknown entities are left untouched so malformed input degrades to
/// itself rather than disappearing.
pub fn decode_entities(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut rest = s;

    while let Some(pos) = rest.find('&') {
        out.push_str(&rest[..pos]);
        rest = &rest[pos..];

        // An entity is at most a handful of characters; cap the scan so a
        // stray ampersand doesn't drag in the rest of the string.
        let end = rest[1..]
            .char_indices()
            .take(32)
            .find(|(_, c)| *c == ';')
            .map(|(i, _)| i + 1);

        match end {
            Some(end) => {
                let name = &rest[1..end];
                match decode_entity(name) {
                    Some(decoded) => {
                        out.push_str(&decoded);
                        rest = &rest[end + 1..];
                    }
                    None => {
                        out.push('&');
                        rest = &rest[1..];
                    }
                }
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }

    out.push_str(rest);
    out
}

/// Decode a single entity name (without `&`/`;`)
fn decode_entity(name: &str) -> Option<String> {
    if let Some(caps) = NUMERIC_ENTITY.captures(name) {
        let code = match (caps.get(1), caps.get(2)) {
            (Some(hex), _) => u32::from_str_radix(hex.as_str(), 16).ok()?,
            (_, Some(dec)) => dec.as_str().parse::<u32>().ok()?,
            _ => return None,
        };
        return char::from_u32(code).map(|c| c.to_string());
    }

    let decoded = match name {
        "amp" => "&",
        "lt" => "<",
        "gt" => ">",
        "quot" => "\"",
        "apos" => "'",
        "nbsp" => "\u{a0}",
        "mdash" => "\u{2014}",
        "ndash" => "\u{2013}",
        "hellip" => "\u{2026}",
        "lsquo" => "\u{2018}",
        "rsquo" => "\u{2019}",
        "ldquo" => "\u{201c}",
        "rdquo" => "\u{201d}",
        "laquo" => "\u{ab}",
        "raquo" => "\u{bb}",
        "copy" => "\u{a9}",
        "reg" => "\u{ae}",
        "trade" => "\u{2122}",
        "deg" => "\u{b0}",
        "middot" => "\u{b7}",
        "bull" => "\u{2022}",
        "sect" => "\u{a7}",
        "para" => "\u{b6}",
        "times" => "\u{d7}",
        "divide" => "\u{f7}",
        "plusmn" => "\u{b1}",
        "frac12" => "\u{bd}",
        "frac14" => "\u{bc}",
        "frac34" => "\u{be}",
        "euro" => "\u{20ac}",
        "pound" => "\u{a3}",
        "yen" => "\u{a5}",
        "cent" => "\u{a2}",
        _ => return None,
    };

    Some(decoded.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html("<p>a & b</p>"),
            "&lt;p&gt;a &amp; b&lt;/p&gt;"
        );
        assert_eq!(escape_html("it's \"fine\""), "it&#39;s &quot;fine&quot;");
    }

    #[test]
    fn test_strip_tags() {
        assert_eq!(strip_tags("<p>Hello <b>World</b></p>"), " Hello  World  ");
    }

    #[test]
    fn test_collapse_whitespace() {
        assert_eq!(collapse_whitespace("  a \n\t b  "), "a b");
    }

    #[test]
    fn test_decode_entities() {
        assert_eq!(decode_entities("Foo &amp; Bar"), "Foo & Bar");
        assert_eq!(decode_entities("&lt;tag&gt;"), "<tag>");
        assert_eq!(decode_entities("&#65;&#x42;"), "AB");
    }

    #[test]
    fn test_decode_unknown_entity() {
        assert_eq!(decode_entities("&bogus; & co"), "&bogus; & co");
        assert_eq!(decode_entities("AT&T"), "AT&T");
    }
}
