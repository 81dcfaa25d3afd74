//! Store wrapper for tests: counts calls and fails chosen chapter numbers

use super::{ContentStore, MemoryContentStore, StoreResult};
use crate::error::StoreError;
use crate::types::{ChapterPatch, NewChapter, NewNovel, StoredChapter, StoredNovel};
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Default)]
pub(crate) struct RecordingStore {
    pub inner: MemoryContentStore,
    calls: AtomicUsize,
    failing: HashSet<u32>,
}

impl RecordingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject creates and updates for these chapter numbers
    pub fn failing_on(numbers: impl IntoIterator<Item = u32>) -> Self {
        Self {
            failing: numbers.into_iter().collect(),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn record(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }

    fn check(&self, number: u32) -> StoreResult<()> {
        if self.failing.contains(&number) {
            return Err(StoreError::Backend(format!("injected failure for chapter {}", number)));
        }
        Ok(())
    }
}

#[async_trait]
impl ContentStore for RecordingStore {
    async fn create_novel(&self, novel: NewNovel) -> StoreResult<StoredNovel> {
        self.record();
        self.inner.create_novel(novel).await
    }

    async fn get_novel(&self, novel_id: &str) -> StoreResult<Option<StoredNovel>> {
        self.record();
        self.inner.get_novel(novel_id).await
    }

    async fn list_novels(&self) -> StoreResult<Vec<StoredNovel>> {
        self.record();
        self.inner.list_novels().await
    }

    async fn create_chapters(
        &self,
        novel_id: &str,
        chapters: Vec<NewChapter>,
    ) -> StoreResult<Vec<StoredChapter>> {
        self.record();
        for chapter in &chapters {
            self.check(chapter.number)?;
        }
        self.inner.create_chapters(novel_id, chapters).await
    }

    async fn update_chapter(
        &self,
        chapter_id: &str,
        patch: ChapterPatch,
    ) -> StoreResult<StoredChapter> {
        self.record();
        let number = self
            .inner
            .snapshot()
            .await
            .chapters
            .get(chapter_id)
            .map(|c| c.number);
        if let Some(number) = number {
            self.check(number)?;
        }
        self.inner.update_chapter(chapter_id, patch).await
    }

    async fn list_chapters(&self, novel_id: &str) -> StoreResult<Vec<StoredChapter>> {
        self.record();
        self.inner.list_chapters(novel_id).await
    }
}
