//! Package document (OPF) parser

use super::xml;
use crate::error::{PackageError, ResourceError};
use crate::types::{ManifestItem, PackageDocument, SpineItem};
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use std::collections::HashSet;

/// Metadata elements captured from the `<metadata>` block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MetaField {
    Title,
    Creator,
    Description,
}

impl MetaField {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "title" => Some(Self::Title),
            "creator" => Some(Self::Creator),
            "description" => Some(Self::Description),
            _ => None,
        }
    }
}

#[derive(Default)]
struct Collected {
    title: Option<String>,
    author: Option<String>,
    description: Option<String>,
    cover_ref: Option<String>,
    guide_cover_href: Option<String>,
    items: Vec<ManifestItem>,
    itemrefs: Vec<SpineItem>,
    spine_seen: bool,
}

impl Collected {
    fn store(&mut self, field: MetaField, value: String) {
        let value = xml::collapse_whitespace(&value);
        if value.is_empty() {
            return;
        }
        let slot = match field {
            MetaField::Title => &mut self.title,
            MetaField::Creator => &mut self.author,
            MetaField::Description => &mut self.description,
        };
        // First occurrence wins
        slot.get_or_insert(value);
    }
}

/// Parse a package document located at `package_path` inside the archive.
///
/// Returns the document and the recoverable spine problems found.
pub fn parse_package(
    package_path: &str,
    data: &[u8],
) -> Result<(PackageDocument, Vec<ResourceError>), PackageError> {
    let base_dir = package_path
        .rsplit_once('/')
        .map(|(dir, _)| dir)
        .unwrap_or("");

    let collected = collect(data, base_dir)?;

    let title = collected.title.ok_or(PackageError::MissingTitle)?;
    if !collected.spine_seen {
        return Err(PackageError::MissingSpine);
    }

    let mut doc = PackageDocument::new(title);
    doc.author = collected.author;
    doc.description = collected.description;

    for item in collected.items {
        let id = item.id.clone();
        if !doc.add_item(item) {
            tracing::warn!(id = %id, "Ignoring repeated manifest id");
        }
    }

    if let Some(cover_ref) = &collected.cover_ref {
        match doc.item_mut(cover_ref) {
            Some(item) => item.is_cover_image = true,
            None => tracing::warn!(id = %cover_ref, "Cover metadata references unknown manifest id"),
        }
    }

    if let Some(href) = &collected.guide_cover_href {
        doc.guide_cover = doc.item_by_path(href).map(|item| item.id.clone());
    }

    let mut warnings = Vec::new();
    let mut seen = HashSet::new();
    for itemref in collected.itemrefs {
        if doc.item(&itemref.idref).is_none() {
            tracing::warn!(idref = %itemref.idref, "Skipping spine entry with unknown manifest id");
            warnings.push(ResourceError::UnknownSpineId(itemref.idref));
            continue;
        }
        if !seen.insert(itemref.idref.clone()) {
            tracing::warn!(idref = %itemref.idref, "Skipping repeated spine entry");
            warnings.push(ResourceError::DuplicateSpineId(itemref.idref));
            continue;
        }
        doc.spine.push(itemref);
    }

    if doc.spine.is_empty() {
        return Err(PackageError::EmptySpine);
    }

    tracing::debug!(
        title = %doc.title,
        manifest = doc.manifest.len(),
        spine = doc.spine.len(),
        "Parsed package document"
    );
    Ok((doc, warnings))
}

/// Walk the XML event stream once, gathering every block
fn collect(data: &[u8], base_dir: &str) -> Result<Collected, PackageError> {
    let mut reader = Reader::from_reader(data);
    reader.config_mut().trim_text(true);

    let mut out = Collected::default();
    let mut in_metadata = false;
    let mut capture: Option<(MetaField, String)> = None;
    let mut buf = Vec::new();

    loop {
        let event = reader
            .read_event_into(&mut buf)
            .map_err(|e| PackageError::Malformed(e.to_string()))?;

        match event {
            Event::Start(e) => {
                let name = xml::local_name(&e).into_owned();
                match name.as_str() {
                    "metadata" => in_metadata = true,
                    "spine" => out.spine_seen = true,
                    _ => match MetaField::from_name(&name)
                        .filter(|_| in_metadata && capture.is_none())
                    {
                        Some(field) => capture = Some((field, String::new())),
                        None => handle_element(&e, &name, in_metadata, base_dir, &mut out),
                    },
                }
            }
            Event::Empty(e) => {
                let name = xml::local_name(&e).into_owned();
                if name == "spine" {
                    out.spine_seen = true;
                } else {
                    handle_element(&e, &name, in_metadata, base_dir, &mut out);
                }
            }
            Event::Text(t) => {
                if let Some((_, text)) = capture.as_mut() {
                    text.push_str(&xml::text(&t));
                }
            }
            Event::CData(c) => {
                if let Some((_, text)) = capture.as_mut() {
                    text.push_str(&String::from_utf8_lossy(&c));
                }
            }
            Event::End(e) => {
                let name = String::from_utf8_lossy(e.local_name().into_inner()).into_owned();
                if name == "metadata" {
                    in_metadata = false;
                } else if let Some(field) = capture.as_ref().map(|(f, _)| *f) {
                    if MetaField::from_name(&name) == Some(field) {
                        if let Some((field, text)) = capture.take() {
                            out.store(field, text);
                        }
                    } else if let Some((_, text)) = capture.as_mut() {
                        // Nested inline markup inside a metadata value
                        text.push(' ');
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(out)
}

fn handle_element(
    e: &BytesStart<'_>,
    name: &str,
    in_metadata: bool,
    base_dir: &str,
    out: &mut Collected,
) {
    match name {
        "meta" if in_metadata => {
            if xml::attr(e, "name").as_deref() == Some("cover") {
                if let Some(content) = xml::attr(e, "content") {
                    out.cover_ref.get_or_insert(content.trim().to_string());
                }
            }
        }
        "item" => {
            let (Some(id), Some(href)) = (xml::attr(e, "id"), xml::attr(e, "href")) else {
                tracing::warn!("Ignoring manifest item without id or href");
                return;
            };
            let properties: Vec<String> = xml::attr(e, "properties")
                .map(|p| p.split_whitespace().map(str::to_string).collect())
                .unwrap_or_default();
            let is_cover_image = properties.iter().any(|p| p == "cover-image");
            out.items.push(ManifestItem {
                id,
                path: resolve_href(base_dir, &href),
                media_type: xml::attr(e, "media-type")
                    .map(|m| m.trim().to_ascii_lowercase())
                    .unwrap_or_default(),
                properties,
                is_cover_image,
            });
        }
        "itemref" => {
            if let Some(idref) = xml::attr(e, "idref") {
                let linear = xml::attr(e, "linear")
                    .map(|l| l.trim() != "no")
                    .unwrap_or(true);
                out.itemrefs.push(SpineItem { idref, linear });
            }
        }
        "reference" => {
            if xml::attr(e, "type").as_deref() == Some("cover") {
                if let Some(href) = xml::attr(e, "href") {
                    out.guide_cover_href
                        .get_or_insert_with(|| resolve_href(base_dir, &href));
                }
            }
        }
        _ => {}
    }
}

/// Resolve a manifest href against the package directory into an archive path.
///
/// Strips any fragment, percent-decodes, and normalizes `.` and `..` segments.
pub fn resolve_href(base_dir: &str, href: &str) -> String {
    let href = href.split('#').next().unwrap_or_default();
    let decoded = urlencoding::decode(href)
        .map(|d| d.into_owned())
        .unwrap_or_else(|_| href.to_string());

    let mut segments: Vec<&str> = Vec::new();
    let joined;
    let full = if let Some(absolute) = decoded.strip_prefix('/') {
        absolute
    } else if base_dir.is_empty() {
        decoded.as_str()
    } else {
        joined = format!("{}/{}", base_dir, decoded);
        joined.as_str()
    };

    for segment in full.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    segments.join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    const OPF: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<package xmlns="http://www.idpf.org/2007/opf" version="2.0">
  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:opf="http://www.idpf.org/2007/opf">
    <dc:title>  The   Long Road </dc:title>
    <dc:creator opf:role="aut">A. Writer</dc:creator>
    <dc:creator>B. Second</dc:creator>
    <dc:description>Travel &amp; &lt;adventure&gt;</dc:description>
    <meta name="cover" content="cover-img"/>
  </metadata>
  <manifest>
    <item id="ch1" href="text/ch%201.xhtml" media-type="application/xhtml+xml"/>
    <item id="ch2" href="../shared/ch2.xhtml#start" media-type="application/xhtml+xml"/>
    <item id="cover-img" href="images/cover.png" media-type="image/png"/>
  </manifest>
  <spine toc="ncx">
    <itemref idref="ch1"/>
    <itemref idref="ghost"/>
    <itemref idref="ch2" linear="no"/>
    <itemref idref="ch1"/>
  </spine>
</package>"#;

    #[test]
    fn test_parse_metadata() {
        let (doc, _) = parse_package("OEBPS/content.opf", OPF.as_bytes()).unwrap();
        assert_eq!(doc.title, "The Long Road");
        assert_eq!(doc.author.as_deref(), Some("A. Writer"));
        assert_eq!(doc.description.as_deref(), Some("Travel & <adventure>"));
    }

    #[test]
    fn test_parse_manifest_paths() {
        let (doc, _) = parse_package("OEBPS/content.opf", OPF.as_bytes()).unwrap();
        assert_eq!(doc.item("ch1").unwrap().path, "OEBPS/text/ch 1.xhtml");
        assert_eq!(doc.item("ch2").unwrap().path, "shared/ch2.xhtml");
        let cover = doc.item("cover-img").unwrap();
        assert!(cover.is_cover_image);
        assert_eq!(cover.media_type, "image/png");
    }

    #[test]
    fn test_spine_skips_unknown_and_duplicate_ids() {
        let (doc, warnings) = parse_package("OEBPS/content.opf", OPF.as_bytes()).unwrap();
        let ids: Vec<_> = doc.spine.iter().map(|s| s.idref.as_str()).collect();
        assert_eq!(ids, vec!["ch1", "ch2"]);
        assert!(doc.spine[0].linear);
        assert!(!doc.spine[1].linear);
        assert_eq!(
            warnings,
            vec![
                ResourceError::UnknownSpineId("ghost".to_string()),
                ResourceError::DuplicateSpineId("ch1".to_string()),
            ]
        );
    }

    #[test]
    fn test_missing_title_is_fatal() {
        let opf = OPF.replace("<dc:title>  The   Long Road </dc:title>", "<dc:title> </dc:title>");
        let err = parse_package("content.opf", opf.as_bytes()).unwrap_err();
        assert!(matches!(err, PackageError::MissingTitle));
    }

    #[test]
    fn test_missing_spine_is_fatal() {
        let opf = r#"<package><metadata><dc:title>T</dc:title></metadata><manifest/></package>"#;
        let err = parse_package("content.opf", opf.as_bytes()).unwrap_err();
        assert!(matches!(err, PackageError::MissingSpine));
    }

    #[test]
    fn test_spine_of_unknown_ids_is_empty() {
        let opf = r#"<package><metadata><dc:title>T</dc:title></metadata>
            <manifest/><spine><itemref idref="x"/></spine></package>"#;
        let err = parse_package("content.opf", opf.as_bytes()).unwrap_err();
        assert!(matches!(err, PackageError::EmptySpine));
    }

    #[test]
    fn test_malformed_xml() {
        let opf = r#"<package><metadata><dc:title>T</dc:creator></metadata></package>"#;
        let err = parse_package("content.opf", opf.as_bytes()).unwrap_err();
        assert!(matches!(err, PackageError::Malformed(_)));
    }

    #[test]
    fn test_cover_image_property() {
        let opf = r#"<package><metadata><dc:title>T</dc:title></metadata>
            <manifest>
              <item id="c" href="c.xhtml" media-type="application/xhtml+xml"/>
              <item id="img" href="img.jpg" media-type="image/jpeg" properties="cover-image"/>
            </manifest>
            <spine><itemref idref="c"/></spine></package>"#;
        let (doc, _) = parse_package("content.opf", opf.as_bytes()).unwrap();
        let img = doc.item("img").unwrap();
        assert!(img.is_cover_image);
        assert!(img.has_property("cover-image"));
        assert_eq!(img.path, "img.jpg");
    }

    #[test]
    fn test_guide_cover_reference() {
        let opf = r#"<package><metadata><dc:title>T</dc:title></metadata>
            <manifest>
              <item id="cov" href="Text/cover.xhtml" media-type="application/xhtml+xml"/>
              <item id="c1" href="Text/c1.xhtml" media-type="application/xhtml+xml"/>
            </manifest>
            <spine><itemref idref="cov"/><itemref idref="c1"/></spine>
            <guide><reference type="cover" href="Text/cover.xhtml"/></guide></package>"#;
        let (doc, _) = parse_package("OPS/content.opf", opf.as_bytes()).unwrap();
        assert_eq!(doc.guide_cover.as_deref(), Some("cov"));
    }

    #[test]
    fn test_resolve_href() {
        assert_eq!(resolve_href("OEBPS", "ch1.xhtml"), "OEBPS/ch1.xhtml");
        assert_eq!(resolve_href("", "ch1.xhtml"), "ch1.xhtml");
        assert_eq!(resolve_href("a/b", "../c/./d.xhtml"), "a/c/d.xhtml");
        assert_eq!(resolve_href("OEBPS", "/root.xhtml"), "root.xhtml");
        assert_eq!(resolve_href("OEBPS", "my%20file.xhtml#frag"), "OEBPS/my file.xhtml");
    }
}
