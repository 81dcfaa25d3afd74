//! Chapter extraction from spine documents

use super::container::Container;
use super::xml::{collapse_whitespace, expand_empty_elements};
use crate::error::ResourceError;
use crate::types::{ManifestItem, PackageDocument, ParsedChapter, SpineItem};
use ego_tree::NodeRef;
use rayon::prelude::*;
use scraper::{ElementRef, Html, Node};
use serde::{Deserialize, Serialize};

/// How chapter bodies are rendered
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ContentMode {
    /// Serialized body markup
    #[default]
    Html,

    /// Text only, paragraphs separated by a blank line
    PlainText,
}

/// Elements dropped from the output entirely
const SKIPPED_ELEMENTS: &[&str] = &["script", "style", "noscript", "template"];

/// Elements serialized without a closing tag
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

/// Elements that start a new line in plain text output
const BLOCK_ELEMENTS: &[&str] = &[
    "address", "article", "aside", "blockquote", "br", "dd", "div", "dl", "dt", "figcaption",
    "figure", "footer", "h1", "h2", "h3", "h4", "h5", "h6", "header", "hr", "li", "main", "nav",
    "ol", "p", "pre", "section", "table", "tr", "ul",
];

const HEADINGS: &[&str] = &["h1", "h2", "h3", "h4", "h5", "h6"];

/// Turns spine documents into numbered chapters
#[derive(Debug, Clone)]
pub struct ContentExtractor {
    mode: ContentMode,
    filter_spine: bool,
    strict_sanitization: bool,
}

impl ContentExtractor {
    pub fn new() -> Self {
        Self {
            mode: ContentMode::default(),
            filter_spine: true,
            strict_sanitization: true,
        }
    }

    pub fn with_mode(mut self, mode: ContentMode) -> Self {
        self.mode = mode;
        self
    }

    /// Drop navigation, cover and non-linear spine entries before numbering
    pub fn with_spine_filtering(mut self, filter: bool) -> Self {
        self.filter_spine = filter;
        self
    }

    /// Strip event-handler attributes from retained markup
    pub fn with_strict_sanitization(mut self, strict: bool) -> Self {
        self.strict_sanitization = strict;
        self
    }

    /// Whether a spine entry is reading content rather than front matter
    fn is_chapter_entry(
        &self,
        package: &PackageDocument,
        spine: &SpineItem,
        item: &ManifestItem,
    ) -> bool {
        if !self.filter_spine {
            return true;
        }
        spine.linear
            && item.is_document()
            && !item.has_property("nav")
            && package.guide_cover.as_deref() != Some(item.id.as_str())
    }

    /// Manifest items that become chapters, in reading order
    pub fn chapter_items<'a>(&self, package: &'a PackageDocument) -> Vec<&'a ManifestItem> {
        package
            .spine_items()
            .filter(|(spine, item)| {
                let keep = self.is_chapter_entry(package, spine, item);
                if !keep {
                    tracing::debug!(id = %item.id, "Skipping non-chapter spine entry");
                }
                keep
            })
            .map(|(_, item)| item)
            .collect()
    }

    /// Extract every chapter. Resources are loaded in parallel; results are
    /// indexed by spine position so numbering never depends on completion order.
    pub fn extract(
        &self,
        container: &Container,
        package: &PackageDocument,
    ) -> (Vec<ParsedChapter>, Vec<ResourceError>) {
        let items = self.chapter_items(package);

        let results: Vec<(ParsedChapter, Option<ResourceError>)> = items
            .par_iter()
            .enumerate()
            .map(|(index, item)| self.extract_one(container, item, index as u32 + 1))
            .collect();

        let mut chapters = Vec::with_capacity(results.len());
        let mut warnings = Vec::new();
        for (chapter, warning) in results {
            if let Some(warning) = warning {
                warnings.push(warning);
            }
            chapters.push(chapter);
        }
        (chapters, warnings)
    }

    fn extract_one(
        &self,
        container: &Container,
        item: &ManifestItem,
        number: u32,
    ) -> (ParsedChapter, Option<ResourceError>) {
        let Some(data) = container.read(&item.path) else {
            tracing::warn!(id = %item.id, path = %item.path, "Chapter resource missing");
            let err = ResourceError::Missing {
                id: item.id.clone(),
                path: item.path.clone(),
            };
            return (ParsedChapter::placeholder(number), Some(err));
        };

        let Ok(markup) = std::str::from_utf8(data) else {
            tracing::warn!(id = %item.id, path = %item.path, "Chapter resource is not UTF-8");
            let err = ResourceError::Unreadable {
                id: item.id.clone(),
                path: item.path.clone(),
            };
            return (ParsedChapter::placeholder(number), Some(err));
        };

        let chapter = self.parse_chapter(markup, number);
        tracing::debug!(
            number,
            id = %item.id,
            title = %chapter.title,
            chars = chapter.content.len(),
            "Extracted chapter"
        );
        (chapter, None)
    }

    /// Derive title and content from one document
    pub fn parse_chapter(&self, markup: &str, number: u32) -> ParsedChapter {
        let markup = expand_empty_elements(markup, VOID_ELEMENTS);
        let document = Html::parse_document(&markup);
        let root = document.root_element();
        let body = root
            .descendants()
            .filter_map(ElementRef::wrap)
            .find(|el| el.value().name() == "body")
            .unwrap_or(root);

        let heading = body
            .descendants()
            .filter_map(ElementRef::wrap)
            .filter(|el| HEADINGS.contains(&el.value().name()))
            .map(|el| (el.id(), collapse_whitespace(&el.text().collect::<String>())))
            .find(|(_, text)| !text.is_empty());

        let (title, heading_id) = match heading {
            Some((id, text)) => (text, Some(id)),
            None => (ParsedChapter::fallback_title(number), None),
        };

        let content = match self.mode {
            ContentMode::Html => {
                let mut out = String::new();
                for child in body.children() {
                    self.write_html(child, heading_id, &mut out);
                }
                out.trim().to_string()
            }
            ContentMode::PlainText => {
                let mut out = String::new();
                for child in body.children() {
                    write_text(child, heading_id, &mut out);
                }
                normalize_text(&out)
            }
        };

        ParsedChapter::new(number, title, content)
    }

    /// Serialize a node as HTML, leaving out the title heading and skipped elements
    fn write_html(&self, node: NodeRef<'_, Node>, skip: Option<ego_tree::NodeId>, out: &mut String) {
        if Some(node.id()) == skip {
            return;
        }
        match node.value() {
            Node::Text(text) => out.push_str(&escape_text(text)),
            Node::Element(el) => {
                let name = el.name();
                if SKIPPED_ELEMENTS.contains(&name) {
                    return;
                }
                out.push('<');
                out.push_str(name);
                // Attribute storage order is not stable across parses
                let mut attrs: Vec<(&str, &str)> = el.attrs().collect();
                attrs.sort_unstable();
                for (attr, value) in attrs {
                    if self.strict_sanitization && attr.to_ascii_lowercase().starts_with("on") {
                        continue;
                    }
                    out.push(' ');
                    out.push_str(attr);
                    out.push_str("=\"");
                    out.push_str(&escape_attr(value));
                    out.push('"');
                }
                out.push('>');
                if VOID_ELEMENTS.contains(&name) {
                    return;
                }
                for child in node.children() {
                    self.write_html(child, skip, out);
                }
                out.push_str("</");
                out.push_str(name);
                out.push('>');
            }
            _ => {}
        }
    }
}

impl Default for ContentExtractor {
    fn default() -> Self {
        Self::new()
    }
}

/// Collect text with line breaks at block boundaries
fn write_text(node: NodeRef<'_, Node>, skip: Option<ego_tree::NodeId>, out: &mut String) {
    if Some(node.id()) == skip {
        return;
    }
    match node.value() {
        Node::Text(text) => out.push_str(text),
        Node::Element(el) => {
            let name = el.name();
            if SKIPPED_ELEMENTS.contains(&name) {
                return;
            }
            let block = BLOCK_ELEMENTS.contains(&name);
            if block {
                out.push('\n');
            }
            for child in node.children() {
                write_text(child, skip, out);
            }
            if block {
                out.push('\n');
            }
        }
        _ => {}
    }
}

/// One paragraph per non-blank line, separated by a blank line
fn normalize_text(raw: &str) -> String {
    raw.lines()
        .map(collapse_whitespace)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn escape_text(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('\u{a0}', "&nbsp;")
}

fn escape_attr(s: &str) -> String {
    s.replace('&', "&amp;").replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::package::parse_package;
    use crate::fixture::{xhtml, EpubFixture};

    fn parse(markup: &str, mode: ContentMode) -> ParsedChapter {
        ContentExtractor::new().with_mode(mode).parse_chapter(markup, 7)
    }

    #[test]
    fn test_title_from_first_heading() {
        let doc = String::from_utf8(xhtml(
            "Head title",
            "<div><h2>  The\n Arrival </h2></div><p>Body</p><h1>Later</h1>",
        ))
        .unwrap();
        let chapter = parse(&doc, ContentMode::Html);
        assert_eq!(chapter.number, 7);
        assert_eq!(chapter.title, "The Arrival");
        assert_eq!(chapter.content, "<div></div><p>Body</p><h1>Later</h1>");
    }

    #[test]
    fn test_fallback_title() {
        let doc = String::from_utf8(xhtml("Ignored", "<p>No heading here</p><h3> </h3>")).unwrap();
        let chapter = parse(&doc, ContentMode::Html);
        assert_eq!(chapter.title, "Chapter 7");
        assert_eq!(chapter.content, "<p>No heading here</p><h3> </h3>");
    }

    #[test]
    fn test_plain_text_paragraphs() {
        let doc = String::from_utf8(xhtml(
            "t",
            "<h1>Title</h1><p>First   line</p>\n<p>Second <em>line</em></p><br/>tail",
        ))
        .unwrap();
        let chapter = parse(&doc, ContentMode::PlainText);
        assert_eq!(chapter.title, "Title");
        assert_eq!(chapter.content, "First line\n\nSecond line\n\ntail");
    }

    #[test]
    fn test_html_sanitization() {
        let doc = String::from_utf8(xhtml(
            "t",
            r#"<p onclick="evil()" class="x">A &amp; B</p><script>alert(1)</script><img src="a.png" alt="q&quot;"/>"#,
        ))
        .unwrap();
        let chapter = parse(&doc, ContentMode::Html);
        assert_eq!(
            chapter.content,
            r#"<p class="x">A &amp; B</p><img alt="q&quot;" src="a.png">"#
        );

        let lenient = ContentExtractor::new()
            .with_strict_sanitization(false)
            .parse_chapter(&doc, 1);
        assert!(lenient.content.contains("onclick"));
        assert!(!lenient.content.contains("alert"));
    }

    #[test]
    fn test_empty_body() {
        let doc = String::from_utf8(xhtml("t", "")).unwrap();
        let chapter = parse(&doc, ContentMode::PlainText);
        assert_eq!(chapter.title, "Chapter 7");
        assert_eq!(chapter.content, "");
    }

    const SELF_CLOSED_HEAD: &str = concat!(
        r#"<?xml version="1.0" encoding="utf-8"?>"#,
        r#"<html xmlns="http://www.w3.org/1999/xhtml"><head><title/>"#,
        r#"<script type="text/javascript" src="a.js"/>"#,
        r#"<link rel="stylesheet" href="s.css"/></head>"#,
        r#"<body><h1>Real Title</h1><p>Body text</p></body></html>"#,
    );

    #[test]
    fn test_self_closed_head_elements() {
        let chapter = parse(SELF_CLOSED_HEAD, ContentMode::Html);
        assert_eq!(chapter.title, "Real Title");
        assert_eq!(chapter.content, "<p>Body text</p>");

        let text = parse(SELF_CLOSED_HEAD, ContentMode::PlainText);
        assert_eq!(text.content, "Body text");
    }

    #[test]
    fn test_self_closed_body_elements_keep_siblings() {
        let doc = String::from_utf8(xhtml(
            "t",
            r#"<h2>Sep</h2><div class="sep"/><p>A</p><p>B</p><a id="x"/><p>C<br/>D</p>"#,
        ))
        .unwrap();
        let chapter = parse(&doc, ContentMode::Html);
        assert_eq!(chapter.title, "Sep");
        assert_eq!(
            chapter.content,
            r#"<div class="sep"></div><p>A</p><p>B</p><a id="x"></a><p>C<br>D</p>"#
        );
    }

    fn open(fixture: EpubFixture) -> (Container, PackageDocument) {
        let data = fixture.build();
        let container = Container::open(&data).unwrap();
        let (package, _) =
            parse_package(container.package_path(), container.package_document()).unwrap();
        (container, package)
    }

    #[test]
    fn test_spine_filtering() {
        let (container, package) = open(
            EpubFixture::new("Book")
                .cover_page()
                .nav_document()
                .chapter("One", "<p>1</p>")
                .non_linear_chapter("Notes", "<p>n</p>")
                .chapter("Two", "<p>2</p>"),
        );

        let (chapters, warnings) = ContentExtractor::new().extract(&container, &package);
        assert!(warnings.is_empty());
        let summary: Vec<_> = chapters
            .iter()
            .map(|c| (c.number, c.title.as_str()))
            .collect();
        assert_eq!(summary, vec![(1, "One"), (2, "Two")]);

        let (unfiltered, _) = ContentExtractor::new()
            .with_spine_filtering(false)
            .extract(&container, &package);
        assert_eq!(unfiltered.len(), 5);
        assert_eq!(unfiltered[0].title, "Chapter 1");
        assert_eq!(unfiltered[4].number, 5);
    }

    #[test]
    fn test_missing_and_unreadable_resources_degrade() {
        let (container, package) = open(
            EpubFixture::new("Book")
                .chapter("One", "<p>1</p>")
                .missing_chapter()
                .raw_chapter(vec![0xff, 0xfe, 0x00, 0x80])
                .chapter("Four", "<p>4</p>"),
        );

        let (chapters, warnings) = ContentExtractor::new()
            .with_mode(ContentMode::PlainText)
            .extract(&container, &package);

        let summary: Vec<_> = chapters
            .iter()
            .map(|c| (c.number, c.title.as_str(), c.content.as_str()))
            .collect();
        assert_eq!(
            summary,
            vec![
                (1, "One", "1"),
                (2, "Chapter 2", ""),
                (3, "Chapter 3", ""),
                (4, "Four", "4"),
            ]
        );
        assert_eq!(warnings.len(), 2);
        assert!(matches!(warnings[0], ResourceError::Missing { ref id, .. } if id == "ch2"));
        assert!(matches!(warnings[1], ResourceError::Unreadable { ref id, .. } if id == "ch3"));
    }
}
