//! Content store for novel and chapter records

use crate::error::StoreError;
use crate::types::{ChapterPatch, NewChapter, NewNovel, StoredChapter, StoredNovel};
use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use tokio::sync::RwLock;
use uuid::Uuid;

#[cfg(test)]
pub(crate) mod recording;

/// Result type for content store operations
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Create/read/update access to stored novels and chapters
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Insert a novel header and return the stored row
    async fn create_novel(&self, novel: NewNovel) -> StoreResult<StoredNovel>;

    /// Fetch a novel header
    async fn get_novel(&self, novel_id: &str) -> StoreResult<Option<StoredNovel>>;

    /// All novels, most recently created first
    async fn list_novels(&self) -> StoreResult<Vec<StoredNovel>>;

    /// Insert chapters for a novel
    async fn create_chapters(
        &self,
        novel_id: &str,
        chapters: Vec<NewChapter>,
    ) -> StoreResult<Vec<StoredChapter>>;

    /// Apply a partial update to one chapter
    async fn update_chapter(&self, chapter_id: &str, patch: ChapterPatch)
        -> StoreResult<StoredChapter>;

    /// Chapters of a novel ordered by number
    async fn list_chapters(&self, novel_id: &str) -> StoreResult<Vec<StoredChapter>>;
}

/// Serializable contents of a [`MemoryContentStore`]
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub novels: HashMap<String, StoredNovel>,
    pub chapters: HashMap<String, StoredChapter>,
}

/// In-process content store with optional JSON persistence
#[derive(Debug, Default)]
pub struct MemoryContentStore {
    inner: RwLock<Snapshot>,
}

impl MemoryContentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_snapshot(snapshot: Snapshot) -> Self {
        Self {
            inner: RwLock::new(snapshot),
        }
    }

    /// Load from a JSON file; a missing file is an empty store
    pub async fn load(path: &Path) -> std::io::Result<Self> {
        match tokio::fs::read_to_string(path).await {
            Ok(data) => {
                let snapshot: Snapshot = serde_json::from_str(&data)
                    .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
                Ok(Self::from_snapshot(snapshot))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e),
        }
    }

    /// Save to a JSON file atomically
    /// Writes to a temp file then renames to avoid partial writes
    pub async fn save(&self, path: &Path) -> std::io::Result<()> {
        let data = {
            let inner = self.inner.read().await;
            serde_json::to_string_pretty(&*inner)
                .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?
        };

        let temp_path = path.with_extension("json.tmp");
        tokio::fs::write(&temp_path, &data).await?;
        tokio::fs::rename(&temp_path, path).await?;
        Ok(())
    }

    /// Copy of the current contents
    pub async fn snapshot(&self) -> Snapshot {
        self.inner.read().await.clone()
    }

    /// Total number of chapter rows across all novels
    pub async fn chapter_count(&self) -> usize {
        self.inner.read().await.chapters.len()
    }
}

#[async_trait]
impl ContentStore for MemoryContentStore {
    async fn create_novel(&self, novel: NewNovel) -> StoreResult<StoredNovel> {
        let now = Utc::now();
        let stored = StoredNovel {
            id: Uuid::new_v4().to_string(),
            title: novel.title,
            author: novel.author,
            description: novel.description,
            cover_url: novel.cover_url,
            genre: novel.genre,
            status: novel.status,
            is_official: novel.is_official,
            is_must_read: novel.is_must_read,
            view_count: 0,
            created_at: now,
            updated_at: now,
        };
        self.inner
            .write()
            .await
            .novels
            .insert(stored.id.clone(), stored.clone());
        Ok(stored)
    }

    async fn get_novel(&self, novel_id: &str) -> StoreResult<Option<StoredNovel>> {
        Ok(self.inner.read().await.novels.get(novel_id).cloned())
    }

    async fn list_novels(&self) -> StoreResult<Vec<StoredNovel>> {
        let mut novels: Vec<StoredNovel> =
            self.inner.read().await.novels.values().cloned().collect();
        novels.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        Ok(novels)
    }

    async fn create_chapters(
        &self,
        novel_id: &str,
        chapters: Vec<NewChapter>,
    ) -> StoreResult<Vec<StoredChapter>> {
        let mut inner = self.inner.write().await;
        if !inner.novels.contains_key(novel_id) {
            return Err(StoreError::NovelNotFound(novel_id.to_string()));
        }

        // Reject the whole batch if any number is taken, like a unique index would
        let mut taken: HashSet<u32> = inner
            .chapters
            .values()
            .filter(|c| c.novel_id == novel_id)
            .map(|c| c.number)
            .collect();
        for chapter in &chapters {
            if !taken.insert(chapter.number) {
                return Err(StoreError::DuplicateChapter {
                    novel_id: novel_id.to_string(),
                    number: chapter.number,
                });
            }
        }

        let now = Utc::now();
        let mut created = Vec::with_capacity(chapters.len());
        for chapter in chapters {
            let stored = StoredChapter {
                id: Uuid::new_v4().to_string(),
                novel_id: novel_id.to_string(),
                number: chapter.number,
                title: chapter.title,
                content_en: chapter.content_en,
                content_id: chapter.content_id,
                epub_en_url: chapter.epub_en_url,
                epub_id_url: chapter.epub_id_url,
                created_at: now,
                updated_at: now,
            };
            inner.chapters.insert(stored.id.clone(), stored.clone());
            created.push(stored);
        }
        Ok(created)
    }

    async fn update_chapter(
        &self,
        chapter_id: &str,
        patch: ChapterPatch,
    ) -> StoreResult<StoredChapter> {
        let mut inner = self.inner.write().await;
        let chapter = inner
            .chapters
            .get_mut(chapter_id)
            .ok_or_else(|| StoreError::ChapterNotFound(chapter_id.to_string()))?;
        patch.apply_to(chapter);
        chapter.updated_at = Utc::now();
        Ok(chapter.clone())
    }

    async fn list_chapters(&self, novel_id: &str) -> StoreResult<Vec<StoredChapter>> {
        let mut chapters: Vec<StoredChapter> = self
            .inner
            .read()
            .await
            .chapters
            .values()
            .filter(|c| c.novel_id == novel_id)
            .cloned()
            .collect();
        chapters.sort_by_key(|c| c.number);
        Ok(chapters)
    }
}
