//! Cover image resolution and data URI encoding

use super::container::Container;
use crate::error::StorageError;
use crate::types::{ManifestItem, PackageDocument};
use base64::{engine::general_purpose::STANDARD, Engine};

/// MIME type used when neither the manifest nor the bytes identify the image
pub const FALLBACK_IMAGE_MIME: &str = "image/jpeg";

/// Pick the cover entry: an explicit `cover-image` property first, then the
/// `<meta name="cover">` cross-reference. Ties go to manifest order.
pub fn cover_item(package: &PackageDocument) -> Option<&ManifestItem> {
    package
        .manifest
        .iter()
        .find(|item| item.has_property("cover-image"))
        .or_else(|| package.manifest.iter().find(|item| item.is_cover_image))
}

/// Resolve the cover as a data URI.
///
/// `Ok(None)` when the package flags no cover; an error when a flagged cover
/// cannot be loaded. An item reached only through `<meta name="cover">` must
/// be an image by media type or by content.
pub fn resolve_cover(
    container: &Container,
    package: &PackageDocument,
) -> Result<Option<String>, StorageError> {
    let Some(item) = cover_item(package) else {
        tracing::debug!("Package flags no cover image");
        return Ok(None);
    };

    let data = container
        .read(&item.path)
        .filter(|data| !data.is_empty())
        .ok_or_else(|| StorageError::NotFound(item.path.clone()))?;

    let declared = item.has_property("cover-image") || item.is_image();
    if !declared && sniff_image_mime(data).is_none() {
        tracing::warn!(
            id = %item.id,
            media_type = %item.media_type,
            "Cover reference is not an image"
        );
        return Err(StorageError::NotAnImage {
            path: item.path.clone(),
            media_type: item.media_type.clone(),
        });
    }

    let mime = cover_mime(item, data);
    tracing::debug!(id = %item.id, mime = %mime, bytes = data.len(), "Resolved cover image");
    Ok(Some(encode_data_uri(&mime, data)))
}

/// MIME type for the cover: the manifest's if it names an image, else sniffed
fn cover_mime(item: &ManifestItem, data: &[u8]) -> String {
    if item.is_image() {
        return match item.media_type.as_str() {
            "image/jpg" => "image/jpeg".to_string(),
            other => other.to_string(),
        };
    }
    sniff_image_mime(data)
        .unwrap_or(FALLBACK_IMAGE_MIME)
        .to_string()
}

/// Recognize common image formats from their leading bytes
pub fn sniff_image_mime(data: &[u8]) -> Option<&'static str> {
    if data.starts_with(b"\x89PNG\r\n\x1a\n") {
        Some("image/png")
    } else if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
        Some("image/jpeg")
    } else if data.starts_with(b"GIF87a") || data.starts_with(b"GIF89a") {
        Some("image/gif")
    } else if data.len() >= 12 && &data[0..4] == b"RIFF" && &data[8..12] == b"WEBP" {
        Some("image/webp")
    } else {
        let head = String::from_utf8_lossy(&data[..data.len().min(256)]);
        let head = head.trim_start();
        if head.starts_with("<svg") || (head.starts_with("<?xml") && head.contains("<svg")) {
            Some("image/svg+xml")
        } else {
            None
        }
    }
}

/// Encode bytes as `data:<mime>;base64,<payload>`
pub fn encode_data_uri(mime: &str, data: &[u8]) -> String {
    format!("data:{};base64,{}", mime, STANDARD.encode(data))
}

/// Split a base64 data URI back into its MIME type and bytes
pub fn decode_data_uri(uri: &str) -> Result<(String, Vec<u8>), StorageError> {
    let rest = uri
        .strip_prefix("data:")
        .ok_or_else(|| StorageError::InvalidDataUri("missing data: prefix".to_string()))?;
    let (header, payload) = rest
        .split_once(',')
        .ok_or_else(|| StorageError::InvalidDataUri("missing payload".to_string()))?;
    let mime = header
        .strip_suffix(";base64")
        .ok_or_else(|| StorageError::InvalidDataUri("payload is not base64".to_string()))?;
    let data = STANDARD
        .decode(payload)
        .map_err(|e| StorageError::InvalidDataUri(e.to_string()))?;
    Ok((mime.to_string(), data))
}

/// File extension for an image MIME type
pub fn extension_for_mime(mime: &str) -> &str {
    match mime {
        "image/jpeg" => "jpg",
        "image/svg+xml" => "svg",
        other => other
            .strip_prefix("image/")
            .filter(|sub| !sub.is_empty() && sub.chars().all(|c| c.is_ascii_alphanumeric()))
            .unwrap_or("img"),
    }
}
