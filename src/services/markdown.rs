//! Fallback HTML to Markdown conversion
//!
//! A small tag-walking converter covering the markup Micropub clients
//! actually send: paragraphs, headings, lists, emphasis, links, images,
//! quotes and code. Anything fancier should come from an injected
//! [`MarkdownConverter`](super::MarkdownConverter) implementation.

use anyhow::Result;
use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;

use super::MarkdownConverter;
use crate::helpers::{collapse_whitespace, decode_entities};

lazy_static! {
    static ref ATTRIBUTE: Regex =
        Regex::new(r#"([a-zA-Z][a-zA-Z0-9-]*)\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>]+))"#)
            .unwrap();
}

/// The converter used when no custom one is injected
#[derive(Debug, Clone, Copy, Default)]
pub struct BasicMarkdownConverter;

#[async_trait]
impl MarkdownConverter for BasicMarkdownConverter {
    async fn to_markdown(&self, html: &str) -> Result<String> {
        Ok(convert(html))
    }
}

enum Token {
    Text(String),
    Open {
        name: String,
        attrs: Vec<(String, String)>,
    },
    Close {
        name: String,
    },
}

fn tokenize(html: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut rest = html;

    loop {
        match rest.find('<') {
            None => {
                if !rest.is_empty() {
                    tokens.push(Token::Text(rest.to_string()));
                }
                return tokens;
            }
            Some(lt) => {
                if lt > 0 {
                    tokens.push(Token::Text(rest[..lt].to_string()));
                }
                rest = &rest[lt..];

                if let Some(after) = rest.strip_prefix("<!--") {
                    match after.find("-->") {
                        Some(end) => {
                            rest = &after[end + 3..];
                            continue;
                        }
                        None => return tokens,
                    }
                }

                match rest.find('>') {
                    None => {
                        // A dangling bracket is plain text.
                        tokens.push(Token::Text(rest.to_string()));
                        return tokens;
                    }
                    Some(gt) => {
                        if let Some(token) = parse_tag(&rest[1..gt]) {
                            tokens.push(token);
                        }
                        rest = &rest[gt + 1..];
                    }
                }
            }
        }
    }
}

fn parse_tag(tag: &str) -> Option<Token> {
    let tag = tag.trim().trim_end_matches('/').trim_end();
    if tag.is_empty() || tag.starts_with('!') || tag.starts_with('?') {
        return None;
    }

    if let Some(name) = tag.strip_prefix('/') {
        return Some(Token::Close {
            name: name.trim().to_lowercase(),
        });
    }

    let (name, attr_text) = match tag.find(char::is_whitespace) {
        Some(pos) => (&tag[..pos], &tag[pos..]),
        None => (tag, ""),
    };

    let attrs = ATTRIBUTE
        .captures_iter(attr_text)
        .filter_map(|caps| {
            let name = caps.get(1)?.as_str().to_lowercase();
            let value = caps
                .get(2)
                .or_else(|| caps.get(3))
                .or_else(|| caps.get(4))
                .map(|m| m.as_str().to_string())
                .unwrap_or_default();
            Some((name, value))
        })
        .collect();

    Some(Token::Open {
        name: name.to_lowercase(),
        attrs,
    })
}

fn attr<'a>(attrs: &'a [(String, String)], name: &str) -> Option<&'a str> {
    attrs
        .iter()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.as_str())
}

enum ListKind {
    Unordered,
    Ordered(u32),
}

#[derive(Default)]
struct MarkdownWriter {
    blocks: Vec<String>,
    line: String,
    pending_space: bool,
    lists: Vec<ListKind>,
    item_lines: Vec<String>,
    links: Vec<String>,
    quote: bool,
    pre: bool,
    skip_depth: usize,
}

impl MarkdownWriter {
    fn text(&mut self, text: &str) {
        if self.skip_depth > 0 {
            return;
        }

        let decoded = decode_entities(text);
        if self.pre {
            self.line.push_str(&decoded);
            return;
        }

        let leading = decoded.starts_with(|c: char| c.is_whitespace());
        let trailing = decoded.ends_with(|c: char| c.is_whitespace());
        let collapsed = collapse_whitespace(&decoded);

        if collapsed.is_empty() {
            if !self.line.is_empty() {
                self.pending_space = true;
            }
            return;
        }

        if (self.pending_space || leading) && !self.line.is_empty() && !self.line.ends_with(' ') {
            self.line.push(' ');
        }
        self.line.push_str(&collapsed);
        self.pending_space = trailing;
    }

    /// Append an opening inline marker, spacing it like a word
    fn append_inline(&mut self, s: &str) {
        if self.pending_space && !self.line.is_empty() && !self.line.ends_with(' ') {
            self.line.push(' ');
        }
        self.pending_space = false;
        self.line.push_str(s);
    }

    /// Append a closing inline marker directly after the content
    fn append_closing(&mut self, s: &str) {
        self.line.push_str(s);
    }

    fn push_block(&mut self, text: String) {
        if self.quote {
            let quoted: Vec<String> = text.lines().map(|line| format!("> {line}")).collect();
            self.blocks.push(quoted.join("\n"));
        } else {
            self.blocks.push(text);
        }
    }

    fn flush_block(&mut self) {
        let text = self.line.trim().to_string();
        self.line.clear();
        self.pending_space = false;
        if !text.is_empty() {
            self.push_block(text);
        }
    }

    /// Emit the pending list item line, when any text accumulated
    fn emit_item(&mut self) {
        if self.line.trim().is_empty() {
            self.line.clear();
            self.pending_space = false;
            return;
        }
        if self.lists.is_empty() {
            self.flush_block();
            return;
        }

        let text = self.line.trim().to_string();
        self.line.clear();
        self.pending_space = false;

        let indent = "  ".repeat(self.lists.len() - 1);
        let marker = match self.lists.last_mut() {
            Some(ListKind::Unordered) => "* ".to_string(),
            Some(ListKind::Ordered(counter)) => {
                let marker = format!("{counter}. ");
                *counter += 1;
                marker
            }
            None => return,
        };
        self.item_lines.push(format!("{indent}{marker}{text}"));
    }

    fn begin_list(&mut self, kind: ListKind) {
        if self.lists.is_empty() {
            self.flush_block();
        } else {
            self.emit_item();
        }
        self.lists.push(kind);
    }

    fn end_list(&mut self) {
        self.emit_item();
        self.lists.pop();
        if self.lists.is_empty() && !self.item_lines.is_empty() {
            let block = self.item_lines.join("\n");
            self.item_lines.clear();
            self.push_block(block);
        }
    }

    fn open(&mut self, name: &str, attrs: &[(String, String)]) {
        if self.skip_depth > 0 {
            if matches!(name, "script" | "style") {
                self.skip_depth += 1;
            }
            return;
        }

        match name {
            "script" | "style" => self.skip_depth += 1,
            "p" | "div" | "section" | "article" | "table" => self.flush_block(),
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
                self.flush_block();
                let level = name[1..].parse::<usize>().unwrap_or(1);
                self.line = format!("{} ", "#".repeat(level));
            }
            "ul" => self.begin_list(ListKind::Unordered),
            "ol" => self.begin_list(ListKind::Ordered(1)),
            "li" => self.emit_item(),
            "blockquote" => {
                self.flush_block();
                self.quote = true;
            }
            "pre" => {
                self.flush_block();
                self.pre = true;
            }
            "code" => {
                if !self.pre {
                    self.append_inline("`");
                }
            }
            "strong" | "b" => self.append_inline("**"),
            "em" | "i" => self.append_inline("*"),
            "a" => {
                self.links
                    .push(attr(attrs, "href").unwrap_or_default().to_string());
                self.append_inline("[");
            }
            "img" => {
                let alt = attr(attrs, "alt").unwrap_or_default();
                let src = attr(attrs, "src").unwrap_or_default();
                self.append_inline(&format!("![{alt}]({src})"));
            }
            "br" => {
                self.line.push('\n');
                self.pending_space = false;
            }
            "hr" => {
                self.flush_block();
                self.blocks.push("---".to_string());
            }
            _ => {}
        }
    }

    fn close(&mut self, name: &str) {
        if matches!(name, "script" | "style") {
            self.skip_depth = self.skip_depth.saturating_sub(1);
            return;
        }
        if self.skip_depth > 0 {
            return;
        }

        match name {
            "p" | "div" | "section" | "article" | "table" | "h1" | "h2" | "h3" | "h4" | "h5"
            | "h6" => self.flush_block(),
            "ul" | "ol" => self.end_list(),
            "li" => self.emit_item(),
            "blockquote" => {
                self.flush_block();
                self.quote = false;
            }
            "pre" => {
                let content = self.line.trim_matches('\n').trim_end().to_string();
                self.line.clear();
                self.pending_space = false;
                self.pre = false;
                if !content.is_empty() {
                    self.push_block(format!("```\n{content}\n```"));
                }
            }
            "code" => {
                if !self.pre {
                    self.append_closing("`");
                }
            }
            "strong" | "b" => self.append_closing("**"),
            "em" | "i" => self.append_closing("*"),
            "a" => {
                let href = self.links.pop().unwrap_or_default();
                self.append_closing(&format!("]({href})"));
            }
            _ => {}
        }
    }

    fn finish(mut self) -> String {
        while !self.lists.is_empty() {
            self.end_list();
        }
        self.flush_block();
        self.blocks.join("\n\n")
    }
}

fn convert(html: &str) -> String {
    let mut writer = MarkdownWriter::default();
    for token in tokenize(html) {
        match token {
            Token::Text(text) => writer.text(&text),
            Token::Open { name, attrs } => writer.open(&name, &attrs),
            Token::Close { name } => writer.close(&name),
        }
    }
    writer.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn md(html: &str) -> String {
        BasicMarkdownConverter.to_markdown(html).await.unwrap()
    }

    #[tokio::test]
    async fn test_paragraphs_and_list() {
        assert_eq!(
            md("<p>Abc</p><p>123</p><ul><li>Foo</li><li>Bar</li></ul>").await,
            "Abc\n\n123\n\n* Foo\n* Bar"
        );
    }

    #[tokio::test]
    async fn test_ordered_list() {
        assert_eq!(md("<ol><li>One</li><li>Two</li></ol>").await, "1. One\n2. Two");
    }

    #[tokio::test]
    async fn test_nested_list() {
        assert_eq!(
            md("<ul><li>Foo<ul><li>Sub</li></ul></li><li>Bar</li></ul>").await,
            "* Foo\n  * Sub\n* Bar"
        );
    }

    #[tokio::test]
    async fn test_emphasis() {
        assert_eq!(
            md("<p>a <strong>b</strong> and <em>c</em></p>").await,
            "a **b** and *c*"
        );
    }

    #[tokio::test]
    async fn test_links_and_images() {
        assert_eq!(
            md(r#"<p>See <a href="http://example.com">this</a></p>"#).await,
            "See [this](http://example.com)"
        );
        assert_eq!(
            md(r#"<p><img src="cat.png" alt="a cat"></p>"#).await,
            "![a cat](cat.png)"
        );
    }

    #[tokio::test]
    async fn test_headings() {
        assert_eq!(md("<h1>Title</h1><p>Text</p>").await, "# Title\n\nText");
        assert_eq!(md("<h3>Sub</h3>").await, "### Sub");
    }

    #[tokio::test]
    async fn test_entities_decoded() {
        assert_eq!(md("<p>Foo &amp; Bar</p>").await, "Foo & Bar");
    }

    #[tokio::test]
    async fn test_line_break() {
        assert_eq!(md("<p>a<br>b</p>").await, "a\nb");
    }

    #[tokio::test]
    async fn test_blockquote() {
        assert_eq!(md("<blockquote><p>quoted</p></blockquote>").await, "> quoted");
    }

    #[tokio::test]
    async fn test_code() {
        assert_eq!(md("<p>run <code>ls</code> now</p>").await, "run `ls` now");
        assert_eq!(md("<pre>let x = 1;</pre>").await, "```\nlet x = 1;\n```");
    }

    #[tokio::test]
    async fn test_plain_text_passes_through() {
        assert_eq!(md("just text").await, "just text");
    }

    #[tokio::test]
    async fn test_whitespace_between_blocks() {
        assert_eq!(md("<p>a</p>\n  <p>b</p>").await, "a\n\nb");
    }
}
