//! In-memory EPUB builder for tests and benchmarks
//!
//! Produces small OCF archives with an EPUB 3 package document. Each builder
//! method maps to one structural feature the decoder has to cope with, so tests
//! read as a list of the quirks present in the book under test.

use std::io::{Cursor, Write};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

const DEFAULT_CONTAINER: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
  <rootfiles>
    <rootfile full-path="OEBPS/content.opf" media-type="application/oebps-package+xml"/>
  </rootfiles>
</container>"#;

#[derive(Debug, Clone)]
struct Resource {
    id: String,
    href: String,
    media_type: String,
    properties: Option<String>,
    data: Option<Vec<u8>>,
}

#[derive(Debug, Clone)]
struct SpineRef {
    idref: String,
    linear: bool,
}

#[derive(Debug, Clone)]
enum ContainerXml {
    Default,
    Missing,
    Custom(String),
}

/// Builder for a synthetic EPUB archive
#[derive(Debug, Clone)]
pub struct EpubFixture {
    title: Option<String>,
    author: Option<String>,
    description: Option<String>,
    resources: Vec<Resource>,
    spine: Vec<SpineRef>,
    cover_meta: Option<String>,
    guide_cover: Option<String>,
    container: ContainerXml,
    package_xml: Option<String>,
    chapter_count: usize,
}

impl EpubFixture {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            author: None,
            description: None,
            resources: Vec::new(),
            spine: Vec::new(),
            cover_meta: None,
            guide_cover: None,
            container: ContainerXml::Default,
            package_xml: None,
            chapter_count: 0,
        }
    }

    /// Omit `dc:title`
    pub fn without_title(mut self) -> Self {
        self.title = None;
        self
    }

    pub fn author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Add a spine chapter with an `<h1>` title followed by `body` markup
    pub fn chapter(self, title: &str, body: &str) -> Self {
        let markup = format!("<h1>{}</h1>{}", title, body);
        self.document_chapter(&markup, true)
    }

    /// Add a spine chapter without any heading
    pub fn untitled_chapter(self, body: &str) -> Self {
        self.document_chapter(body, true)
    }

    /// Add a chapter marked `linear="no"`
    pub fn non_linear_chapter(self, title: &str, body: &str) -> Self {
        let markup = format!("<h1>{}</h1>{}", title, body);
        self.document_chapter(&markup, false)
    }

    /// Add a spine chapter whose file holds these exact bytes
    pub fn raw_chapter(mut self, data: Vec<u8>) -> Self {
        let (id, href) = self.next_chapter_name();
        self.push_spine_resource(id, href, "application/xhtml+xml", None, Some(data), true);
        self
    }

    /// Add a spine chapter that is declared but absent from the archive
    pub fn missing_chapter(mut self) -> Self {
        let (id, href) = self.next_chapter_name();
        self.push_spine_resource(id, href, "application/xhtml+xml", None, None, true);
        self
    }

    /// Add an itemref pointing at an id that is not in the manifest
    pub fn unknown_spine_ref(mut self, idref: &str) -> Self {
        self.spine.push(SpineRef {
            idref: idref.to_string(),
            linear: true,
        });
        self
    }

    /// Add an EPUB 3 navigation document to the spine
    pub fn nav_document(mut self) -> Self {
        let data = xhtml("Contents", "<nav><ol><li>Contents</li></ol></nav>");
        self.push_spine_resource(
            "nav".to_string(),
            "nav.xhtml".to_string(),
            "application/xhtml+xml",
            Some("nav"),
            Some(data),
            true,
        );
        self
    }

    /// Add a cover page to the spine and point the guide at it
    pub fn cover_page(mut self) -> Self {
        let data = xhtml("Cover", r#"<div><img src="cover.jpg" alt="cover"/></div>"#);
        self.push_spine_resource(
            "cover-page".to_string(),
            "cover.xhtml".to_string(),
            "application/xhtml+xml",
            None,
            Some(data),
            true,
        );
        self.guide_cover = Some("cover.xhtml".to_string());
        self
    }

    /// Add an image flagged with the EPUB 3 `cover-image` property
    pub fn cover_image(mut self, data: &[u8], media_type: &str) -> Self {
        self.resources.push(Resource {
            id: "cover-image".to_string(),
            href: format!("images/cover.{}", extension(media_type)),
            media_type: media_type.to_string(),
            properties: Some("cover-image".to_string()),
            data: Some(data.to_vec()),
        });
        self
    }

    /// Add an image referenced by the EPUB 2 `<meta name="cover">` entry
    pub fn cover_meta(mut self, data: &[u8], media_type: &str) -> Self {
        self.resources.push(Resource {
            id: "cover-meta".to_string(),
            href: format!("images/cover-meta.{}", extension(media_type)),
            media_type: media_type.to_string(),
            properties: None,
            data: Some(data.to_vec()),
        });
        self.cover_meta = Some("cover-meta".to_string());
        self
    }

    /// Flag a cover image that is absent from the archive
    pub fn missing_cover_image(mut self) -> Self {
        self.resources.push(Resource {
            id: "cover-image".to_string(),
            href: "images/cover.png".to_string(),
            media_type: "image/png".to_string(),
            properties: Some("cover-image".to_string()),
            data: None,
        });
        self
    }

    /// Add a non-cover image to the manifest
    pub fn image(mut self, name: &str, data: &[u8], media_type: &str) -> Self {
        self.resources.push(Resource {
            id: name.to_string(),
            href: format!("images/{}", name),
            media_type: media_type.to_string(),
            properties: None,
            data: Some(data.to_vec()),
        });
        self
    }

    /// Replace `META-INF/container.xml`
    pub fn with_container_xml(mut self, xml: &str) -> Self {
        self.container = ContainerXml::Custom(xml.to_string());
        self
    }

    /// Leave `META-INF/container.xml` out of the archive
    pub fn without_container(mut self) -> Self {
        self.container = ContainerXml::Missing;
        self
    }

    /// Replace the generated package document
    pub fn with_package_xml(mut self, xml: &str) -> Self {
        self.package_xml = Some(xml.to_string());
        self
    }

    fn next_chapter_name(&mut self) -> (String, String) {
        self.chapter_count += 1;
        (
            format!("ch{}", self.chapter_count),
            format!("text/ch{}.xhtml", self.chapter_count),
        )
    }

    fn document_chapter(mut self, body: &str, linear: bool) -> Self {
        let (id, href) = self.next_chapter_name();
        let data = xhtml(&id, body);
        self.push_spine_resource(id, href, "application/xhtml+xml", None, Some(data), linear);
        self
    }

    fn push_spine_resource(
        &mut self,
        id: String,
        href: String,
        media_type: &str,
        properties: Option<&str>,
        data: Option<Vec<u8>>,
        linear: bool,
    ) {
        self.spine.push(SpineRef {
            idref: id.clone(),
            linear,
        });
        self.resources.push(Resource {
            id,
            href,
            media_type: media_type.to_string(),
            properties: properties.map(str::to_string),
            data,
        });
    }

    /// Render the package document
    pub fn package_xml(&self) -> String {
        if let Some(xml) = &self.package_xml {
            return xml.clone();
        }

        let mut opf = String::from(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<package xmlns="http://www.idpf.org/2007/opf" version="3.0" unique-identifier="uid">
  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/">
    <dc:identifier id="uid">urn:uuid:fixture</dc:identifier>
    <dc:language>en</dc:language>
"#,
        );
        if let Some(title) = &self.title {
            opf.push_str(&format!("    <dc:title>{}</dc:title>\n", escape(title)));
        }
        if let Some(author) = &self.author {
            opf.push_str(&format!("    <dc:creator>{}</dc:creator>\n", escape(author)));
        }
        if let Some(description) = &self.description {
            opf.push_str(&format!(
                "    <dc:description>{}</dc:description>\n",
                escape(description)
            ));
        }
        if let Some(cover) = &self.cover_meta {
            opf.push_str(&format!("    <meta name=\"cover\" content=\"{}\"/>\n", cover));
        }
        opf.push_str("  </metadata>\n  <manifest>\n");
        for resource in &self.resources {
            let properties = resource
                .properties
                .as_ref()
                .map(|p| format!(" properties=\"{}\"", p))
                .unwrap_or_default();
            opf.push_str(&format!(
                "    <item id=\"{}\" href=\"{}\" media-type=\"{}\"{}/>\n",
                resource.id, resource.href, resource.media_type, properties
            ));
        }
        opf.push_str("  </manifest>\n  <spine>\n");
        for itemref in &self.spine {
            let linear = if itemref.linear { "" } else { " linear=\"no\"" };
            opf.push_str(&format!(
                "    <itemref idref=\"{}\"{}/>\n",
                itemref.idref, linear
            ));
        }
        opf.push_str("  </spine>\n");
        if let Some(href) = &self.guide_cover {
            opf.push_str(&format!(
                "  <guide>\n    <reference type=\"cover\" title=\"Cover\" href=\"{}\"/>\n  </guide>\n",
                href
            ));
        }
        opf.push_str("</package>\n");
        opf
    }

    /// Write the archive
    pub fn build(&self) -> Vec<u8> {
        let mut output = Vec::new();
        {
            let mut writer = ZipWriter::new(Cursor::new(&mut output));
            let stored = FileOptions::default().compression_method(CompressionMethod::Stored);
            let deflated = FileOptions::default().compression_method(CompressionMethod::Deflated);

            let mut add = |name: &str, data: &[u8], options: FileOptions| {
                writer.start_file(name, options).expect("in-memory zip write");
                writer.write_all(data).expect("in-memory zip write");
            };

            add("mimetype", b"application/epub+zip", stored);
            match &self.container {
                ContainerXml::Default => {
                    add("META-INF/container.xml", DEFAULT_CONTAINER.as_bytes(), deflated)
                }
                ContainerXml::Custom(xml) => add("META-INF/container.xml", xml.as_bytes(), deflated),
                ContainerXml::Missing => {}
            }
            add("OEBPS/content.opf", self.package_xml().as_bytes(), deflated);
            for resource in &self.resources {
                if let Some(data) = &resource.data {
                    add(&format!("OEBPS/{}", resource.href), data, deflated);
                }
            }

            writer.finish().expect("in-memory zip write");
        }
        output
    }
}

/// Wrap body markup in a minimal XHTML document
pub fn xhtml(title: &str, body: &str) -> Vec<u8> {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE html>
<html xmlns="http://www.w3.org/1999/xhtml" xmlns:epub="http://www.idpf.org/2007/ops">
<head><title>{}</title></head>
<body>{}</body>
</html>"#,
        escape(title),
        body
    )
    .into_bytes()
}

fn escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn extension(media_type: &str) -> &str {
    match media_type {
        "image/jpeg" => "jpg",
        "image/svg+xml" => "svg",
        other => other.rsplit('/').next().unwrap_or("bin"),
    }
}

/// Smallest valid PNG: 1x1 transparent pixel
pub const TINY_PNG: &[u8] = &[
    0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44, 0x52,
    0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x06, 0x00, 0x00, 0x00, 0x1F, 0x15, 0xC4,
    0x89, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x44, 0x41, 0x54, 0x78, 0x9C, 0x63, 0x00, 0x01, 0x00, 0x00,
    0x05, 0x00, 0x01, 0x0D, 0x0A, 0x2D, 0xB4, 0x00, 0x00, 0x00, 0x00, 0x49, 0x45, 0x4E, 0x44, 0xAE,
    0x42, 0x60, 0x82,
];
