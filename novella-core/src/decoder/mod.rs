//! Decoders for turning uploaded files into parsed books

mod container;
mod content;
mod cover;
mod epub;
mod package;
mod xml;

pub use container::{
    has_zip_signature, ArchiveEntry, Container, ContainerLimits, CONTAINER_PATH, ZIP_SIGNATURE,
};
pub use content::{ContentExtractor, ContentMode};
pub use cover::{
    cover_item, decode_data_uri, encode_data_uri, extension_for_mime, resolve_cover,
    sniff_image_mime, FALLBACK_IMAGE_MIME,
};
pub use epub::EpubDecoder;
pub use package::{parse_package, resolve_href};

/// Extension accepted for uploads, compared case-insensitively
pub const EPUB_EXTENSION: &str = "epub";

/// Whether a file name carries the EPUB extension
pub fn has_supported_extension(filename: &str) -> bool {
    std::path::Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|ext| ext.eq_ignore_ascii_case(EPUB_EXTENSION))
        .unwrap_or(false)
}
