//! EPUB decoder: container, package, chapters and cover in one pass

use super::container::{Container, ContainerLimits};
use super::content::{ContentExtractor, ContentMode};
use super::cover::resolve_cover;
use super::package::parse_package;
use crate::error::{NovellaError, PackageError};
use crate::types::{ParseOutcome, ParsedBook};

/// Decoder for EPUB 2/3 uploads
#[derive(Debug, Clone, Default)]
pub struct EpubDecoder {
    extractor: ContentExtractor,
    limits: ContainerLimits,
}

impl EpubDecoder {
    pub fn new() -> Self {
        Self {
            extractor: ContentExtractor::new(),
            limits: ContainerLimits::default(),
        }
    }

    /// Bound the decompressed size of uploads
    pub fn with_limits(mut self, limits: ContainerLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Render chapter bodies as markup or plain text
    pub fn with_content_mode(mut self, mode: ContentMode) -> Self {
        self.extractor = self.extractor.with_mode(mode);
        self
    }

    /// Toggle removal of nav, cover and non-linear spine entries
    pub fn with_spine_filtering(mut self, filter: bool) -> Self {
        self.extractor = self.extractor.with_spine_filtering(filter);
        self
    }

    /// Set strict sanitization mode
    pub fn with_strict_sanitization(mut self, strict: bool) -> Self {
        self.extractor = self.extractor.with_strict_sanitization(strict);
        self
    }

    /// Parse an in-memory EPUB.
    ///
    /// Fails only on container or package problems; everything after the
    /// package document degrades into warnings.
    pub fn parse(&self, data: &[u8]) -> Result<ParseOutcome, NovellaError> {
        let container = Container::open_with_limits(data, self.limits)?;
        let (package, mut warnings) =
            parse_package(container.package_path(), container.package_document())?;

        // Cover and chapters only read the container, so they run side by side
        let (cover, (chapters, chapter_warnings)) = rayon::join(
            || resolve_cover(&container, &package),
            || self.extractor.extract(&container, &package),
        );
        warnings.extend(chapter_warnings);

        if chapters.is_empty() {
            return Err(PackageError::EmptySpine.into());
        }

        let (cover_data_uri, cover_warning) = match cover {
            Ok(uri) => (uri, None),
            Err(e) => {
                tracing::warn!("Cover image unavailable, continuing without it: {}", e);
                (None, Some(e.to_string()))
            }
        };

        let book = ParsedBook {
            title: package.title,
            author: package.author,
            description: package.description,
            cover_data_uri,
            chapters,
        };

        tracing::info!(
            title = %book.title,
            chapters = book.chapters.len(),
            warnings = warnings.len(),
            has_cover = book.cover_data_uri.is_some(),
            "Parsed EPUB"
        );

        Ok(ParseOutcome {
            book,
            warnings,
            cover_warning,
        })
    }
}
