//! Rows owned by the content store

use super::Language;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Publication status of a novel
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum NovelStatus {
    #[default]
    Ongoing,
    Completed,
}

/// A stored novel header
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoredNovel {
    pub id: String,
    pub title: String,
    pub author: Option<String>,
    pub description: Option<String>,
    pub cover_url: Option<String>,
    pub genre: Vec<String>,
    pub status: NovelStatus,
    pub is_official: bool,
    pub is_must_read: bool,
    pub view_count: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields for creating a novel header
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewNovel {
    pub title: String,
    pub author: Option<String>,
    pub description: Option<String>,
    pub cover_url: Option<String>,
    pub genre: Vec<String>,
    pub status: NovelStatus,
    pub is_official: bool,
    pub is_must_read: bool,
}

impl NewNovel {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            author: None,
            description: None,
            cover_url: None,
            genre: Vec::new(),
            status: NovelStatus::Ongoing,
            is_official: false,
            is_must_read: false,
        }
    }
}

/// A stored chapter with one content slot per language
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoredChapter {
    pub id: String,
    pub novel_id: String,
    pub number: u32,
    pub title: String,
    pub content_en: Option<String>,
    pub content_id: Option<String>,
    pub epub_en_url: Option<String>,
    pub epub_id_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl StoredChapter {
    /// Content for a language track
    pub fn content(&self, language: Language) -> Option<&str> {
        match language {
            Language::En => self.content_en.as_deref(),
            Language::Id => self.content_id.as_deref(),
        }
    }

    /// External source URL for a language track
    pub fn external_url(&self, language: Language) -> Option<&str> {
        match language {
            Language::En => self.epub_en_url.as_deref(),
            Language::Id => self.epub_id_url.as_deref(),
        }
    }

    /// Languages that have content on this chapter
    pub fn languages(&self) -> Vec<Language> {
        Language::ALL
            .into_iter()
            .filter(|&l| self.content(l).is_some())
            .collect()
    }
}

/// Fields for inserting a chapter
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewChapter {
    pub number: u32,
    pub title: String,
    pub content_en: Option<String>,
    pub content_id: Option<String>,
    pub epub_en_url: Option<String>,
    pub epub_id_url: Option<String>,
}

impl NewChapter {
    /// A chapter carrying only one language's content
    pub fn for_language(
        number: u32,
        title: impl Into<String>,
        language: Language,
        content: impl Into<String>,
        source_url: Option<String>,
    ) -> Self {
        let content = Some(content.into());
        let (content_en, content_id) = match language {
            Language::En => (content, None),
            Language::Id => (None, content),
        };
        let (epub_en_url, epub_id_url) = match language {
            Language::En => (source_url, None),
            Language::Id => (None, source_url),
        };
        Self {
            number,
            title: title.into(),
            content_en,
            content_id,
            epub_en_url,
            epub_id_url,
        }
    }
}

/// Partial update of a stored chapter. `None` leaves a field untouched;
/// `Some(None)` clears it.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChapterPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_en: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_id: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub epub_en_url: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub epub_id_url: Option<Option<String>>,
}

impl ChapterPatch {
    /// Set one language's content, and its source URL when given
    pub fn language_content(
        language: Language,
        content: impl Into<String>,
        source_url: Option<String>,
    ) -> Self {
        let content = Some(Some(content.into()));
        let url = source_url.map(Some);
        match language {
            Language::En => Self {
                content_en: content,
                epub_en_url: url,
                ..Self::default()
            },
            Language::Id => Self {
                content_id: content,
                epub_id_url: url,
                ..Self::default()
            },
        }
    }

    /// Languages whose fields this patch writes
    pub fn touched_languages(&self) -> Vec<Language> {
        let mut touched = Vec::new();
        if self.content_en.is_some() || self.epub_en_url.is_some() {
            touched.push(Language::En);
        }
        if self.content_id.is_some() || self.epub_id_url.is_some() {
            touched.push(Language::Id);
        }
        touched
    }

    /// Apply the patch in place
    pub fn apply_to(&self, chapter: &mut StoredChapter) {
        if let Some(title) = &self.title {
            chapter.title = title.clone();
        }
        if let Some(v) = &self.content_en {
            chapter.content_en = v.clone();
        }
        if let Some(v) = &self.content_id {
            chapter.content_id = v.clone();
        }
        if let Some(v) = &self.epub_en_url {
            chapter.epub_en_url = v.clone();
        }
        if let Some(v) = &self.epub_id_url {
            chapter.epub_id_url = v.clone();
        }
    }
}
