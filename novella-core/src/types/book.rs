//! The parsed book handed from the decoder to the importer

use super::ParsedChapter;
use crate::error::ResourceError;
use serde::{Deserialize, Serialize};

/// Metadata, cover and ordered chapters of an uploaded EPUB
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ParsedBook {
    /// Book title
    pub title: String,

    /// Primary author
    pub author: Option<String>,

    /// Book description/summary
    pub description: Option<String>,

    /// Cover image as `data:<mime>;base64,<payload>`
    pub cover_data_uri: Option<String>,

    /// Chapters numbered contiguously from 1
    pub chapters: Vec<ParsedChapter>,
}

impl ParsedBook {
    /// Create a book with no cover and no chapters
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            author: None,
            description: None,
            cover_data_uri: None,
            chapters: Vec::new(),
        }
    }

    /// Get the book title
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Number of chapters
    pub fn chapter_count(&self) -> usize {
        self.chapters.len()
    }
}

/// A parsed book together with the recoverable problems met along the way
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseOutcome {
    pub book: ParsedBook,

    /// Chapters that degraded and spine entries that were skipped
    pub warnings: Vec<ResourceError>,

    /// Why a flagged cover could not be loaded
    pub cover_warning: Option<String>,
}
