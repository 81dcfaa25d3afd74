//! Import orchestration: parse an upload, store its cover, reconcile chapters

use crate::decoder::{decode_data_uri, extension_for_mime, has_supported_extension, EpubDecoder};
use crate::error::{NovellaError, ReconciliationError, Result, StoreError};
use crate::reconcile::{self, ReconcileOutcome};
use crate::storage::StorageProvider;
use crate::store::ContentStore;
use crate::types::{Language, NewNovel, ParseOutcome, ParsedBook};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Stage of an import, logged on every transition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportPhase {
    Idle,
    Parsing,
    ExtractingCover,
    ExtractingChapters,
    Reconciling,
    Done,
    Failed,
}

impl fmt::Display for ImportPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Parsing => "parsing",
            Self::ExtractingCover => "extracting_cover",
            Self::ExtractingChapters => "extracting_chapters",
            Self::Reconciling => "reconciling",
            Self::Done => "done",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

impl ImportPhase {
    /// Whether the import state machine allows moving from `self` to `next`.
    /// `Failed` only follows `Parsing`; later problems degrade the report.
    pub fn can_advance_to(self, next: ImportPhase) -> bool {
        use ImportPhase::*;
        matches!(
            (self, next),
            (Idle, Parsing)
                | (Parsing, ExtractingCover | ExtractingChapters | Failed)
                | (ExtractingCover, ExtractingChapters | Reconciling)
                | (ExtractingChapters, ExtractingCover | Reconciling)
                | (Reconciling, Done)
        )
    }
}

/// Phase of one import call, logged on every move
#[derive(Debug)]
struct Progress {
    phase: ImportPhase,
}

impl Progress {
    fn new() -> Self {
        Self {
            phase: ImportPhase::Idle,
        }
    }

    fn advance(&mut self, next: ImportPhase) {
        debug_assert!(
            self.phase.can_advance_to(next),
            "import cannot move from {} to {}",
            self.phase,
            next
        );
        tracing::info!(from = %self.phase, phase = %next, "Import phase");
        self.phase = next;
    }

    /// Record a fatal parse error
    fn fail(&mut self, error: NovellaError) -> NovellaError {
        self.advance(ImportPhase::Failed);
        tracing::warn!(error = %error, "Import failed");
        error
    }

    /// Surface a content store error without leaving the current phase
    fn store_error(&self, error: StoreError) -> NovellaError {
        tracing::warn!(phase = %self.phase, error = %error, "Content store call failed");
        error.into()
    }
}

/// Result of one import call
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    pub novel_id: String,
    pub title: String,
    pub language: Language,
    pub created: Vec<u32>,
    pub updated: Vec<u32>,
    pub failed: Vec<u32>,
    /// Recoverable problems met while parsing or storing the cover
    pub warnings: Vec<String>,
    pub cover_stored: bool,
    pub summary: String,
}

impl ImportReport {
    fn new(
        novel_id: String,
        title: String,
        language: Language,
        outcome: ReconcileOutcome,
        warnings: Vec<String>,
        cover_stored: bool,
    ) -> Self {
        let summary = format!(
            "{} chapters created, {} updated, {} failed to save",
            outcome.created.len(),
            outcome.updated.len(),
            outcome.failed.len()
        );
        Self {
            novel_id,
            title,
            language,
            created: outcome.created,
            updated: outcome.updated,
            failed: outcome.failed,
            warnings,
            cover_stored,
            summary,
        }
    }

    /// Whether every chapter instruction succeeded
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Drives uploads through parsing and into the two collaborators
#[derive(Clone)]
pub struct Importer {
    decoder: EpubDecoder,
    store: Arc<dyn ContentStore>,
    storage: Arc<dyn StorageProvider>,
}

impl Importer {
    pub fn new(store: Arc<dyn ContentStore>, storage: Arc<dyn StorageProvider>) -> Self {
        Self {
            decoder: EpubDecoder::new(),
            store,
            storage,
        }
    }

    /// Use a configured decoder instead of the default one
    pub fn with_decoder(mut self, decoder: EpubDecoder) -> Self {
        self.decoder = decoder;
        self
    }

    /// Create a novel from an upload and store its chapters under `language`
    pub async fn import_new_novel(
        &self,
        filename: &str,
        data: Vec<u8>,
        language: Language,
    ) -> Result<ImportReport> {
        let mut progress = Progress::new();
        let mut warnings = extension_warning(filename);
        let parsed = self.parse(&mut progress, data).await?;
        warnings.extend(collect_warnings(&parsed));
        let book = parsed.book;

        progress.advance(ImportPhase::ExtractingCover);
        let cover_url = match &book.cover_data_uri {
            Some(uri) => match self.store_cover(uri).await {
                Ok(url) => Some(url),
                Err(e) => {
                    tracing::warn!("Cover upload failed, novel will have no cover: {}", e);
                    warnings.push(format!("cover upload failed: {}", e));
                    None
                }
            },
            None => None,
        };
        let cover_stored = cover_url.is_some();

        let novel = self
            .store
            .create_novel(new_novel(&book, cover_url))
            .await
            .map_err(|e| progress.store_error(e))?;
        tracing::info!(novel_id = %novel.id, title = %novel.title, "Created novel");

        progress.advance(ImportPhase::Reconciling);
        let plan = reconcile::plan(&[], &book.chapters, language, None);
        let outcome = reconcile::apply(self.store.as_ref(), &novel.id, plan).await;

        let report = ImportReport::new(
            novel.id,
            book.title,
            language,
            outcome,
            warnings,
            cover_stored,
        );
        finish(&mut progress, &report);
        Ok(report)
    }

    /// Add (or refresh) one language track of an existing novel
    pub async fn add_language(
        &self,
        novel_id: &str,
        filename: &str,
        data: Vec<u8>,
        language: Language,
        source_url: Option<&str>,
    ) -> Result<ImportReport> {
        let mut progress = Progress::new();
        let mut warnings = extension_warning(filename);
        let parsed = self.parse(&mut progress, data).await?;
        warnings.extend(collect_warnings(&parsed));
        let book = parsed.book;

        let Some(novel) = self
            .store
            .get_novel(novel_id)
            .await
            .map_err(|e| progress.store_error(e))?
        else {
            tracing::warn!(novel_id, "Rejecting language import for unknown novel");
            return Err(StoreError::NovelNotFound(novel_id.to_string()).into());
        };

        progress.advance(ImportPhase::Reconciling);
        let existing = self
            .store
            .list_chapters(&novel.id)
            .await
            .map_err(|e| progress.store_error(e))?;

        let plan = reconcile::plan(&existing, &book.chapters, language, source_url);
        let outcome = reconcile::apply(self.store.as_ref(), &novel.id, plan).await;

        let report = ImportReport::new(novel.id, novel.title, language, outcome, warnings, false);
        finish(&mut progress, &report);
        Ok(report)
    }

    /// Parse on a blocking thread; nothing has been written if this fails
    async fn parse(&self, progress: &mut Progress, data: Vec<u8>) -> Result<ParseOutcome> {
        progress.advance(ImportPhase::Parsing);
        let decoder = self.decoder.clone();
        let parsed = tokio::task::spawn_blocking(move || decoder.parse(&data))
            .await
            .map_err(|e| NovellaError::Task(e.to_string()))
            .and_then(|r| r)
            .map_err(|e| progress.fail(e))?;

        // Chapters and cover come out of the same decoder pass
        progress.advance(ImportPhase::ExtractingChapters);
        Ok(parsed)
    }

    async fn store_cover(&self, data_uri: &str) -> Result<String> {
        let (mime, bytes) = decode_data_uri(data_uri)?;
        let path = format!(
            "covers/{}-cover.{}",
            uuid::Uuid::new_v4(),
            extension_for_mime(&mime)
        );
        let url = self.storage.upload_blob(&path, bytes, &mime).await?;
        tracing::debug!(path = %path, url = %url, "Stored cover image");
        Ok(url)
    }
}

fn finish(progress: &mut Progress, report: &ImportReport) {
    if !report.is_complete() {
        let err = ReconciliationError {
            failed: report.failed.clone(),
        };
        tracing::warn!(novel_id = %report.novel_id, failed = ?err.failed, "{}", err);
    }
    progress.advance(ImportPhase::Done);
    tracing::info!(
        novel_id = %report.novel_id,
        language = %report.language,
        "{}",
        report.summary
    );
}

fn extension_warning(filename: &str) -> Vec<String> {
    if has_supported_extension(filename) {
        Vec::new()
    } else {
        tracing::warn!(filename, "Upload does not have an .epub extension");
        vec![format!("'{}' does not have an .epub extension", filename)]
    }
}

fn collect_warnings(parsed: &ParseOutcome) -> Vec<String> {
    parsed
        .warnings
        .iter()
        .map(ToString::to_string)
        .chain(parsed.cover_warning.iter().map(|w| format!("cover skipped: {}", w)))
        .collect()
}

fn new_novel(book: &ParsedBook, cover_url: Option<String>) -> NewNovel {
    NewNovel {
        author: book.author.clone(),
        description: book.description.clone(),
        cover_url,
        ..NewNovel::new(book.title.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{FileFormatError, PackageError};
    use crate::fixture::{EpubFixture, TINY_PNG};
    use crate::storage::MemoryStorage;
    use crate::store::recording::RecordingStore;
    use crate::store::MemoryContentStore;
    use crate::types::NovelStatus;

    fn book(prefix: &str, count: u32) -> Vec<u8> {
        let mut fixture = EpubFixture::new("Tides").author("R. Author");
        for n in 1..=count {
            fixture = fixture.chapter(&format!("Ch{}", n), &format!("<p>{}{}</p>", prefix, n));
        }
        fixture.cover_image(TINY_PNG, "image/png").build()
    }

    fn importer() -> (Importer, Arc<MemoryContentStore>, Arc<MemoryStorage>) {
        let store = Arc::new(MemoryContentStore::new());
        let storage = Arc::new(MemoryStorage::new());
        let importer = Importer::new(store.clone(), storage.clone());
        (importer, store, storage)
    }

    #[tokio::test]
    async fn test_import_new_novel() {
        let (importer, store, storage) = importer();
        let report = importer
            .import_new_novel("tides.epub", book("Hello", 3), Language::En)
            .await
            .unwrap();

        assert_eq!(report.title, "Tides");
        assert_eq!(report.created, vec![1, 2, 3]);
        assert!(report.updated.is_empty());
        assert!(report.cover_stored);
        assert!(report.warnings.is_empty());
        assert_eq!(report.summary, "3 chapters created, 0 updated, 0 failed to save");

        let novel = store.get_novel(&report.novel_id).await.unwrap().unwrap();
        assert_eq!(novel.author.as_deref(), Some("R. Author"));
        assert_eq!(novel.status, NovelStatus::Ongoing);
        assert!(novel.genre.is_empty());
        assert_eq!(novel.view_count, 0);

        let paths = storage.paths();
        assert_eq!(paths.len(), 1);
        assert!(paths[0].starts_with("covers/") && paths[0].ends_with("-cover.png"));
        assert_eq!(storage.mime_type(&paths[0]).as_deref(), Some("image/png"));
        assert_eq!(novel.cover_url, Some(format!("memory://novella/{}", paths[0])));
    }

    #[tokio::test]
    async fn test_import_without_cover() {
        let (importer, store, storage) = importer();
        let data = EpubFixture::new("Plain").chapter("One", "<p>1</p>").build();
        let report = importer
            .import_new_novel("plain.epub", data, Language::Id)
            .await
            .unwrap();

        assert!(!report.cover_stored);
        assert!(storage.paths().is_empty());
        let novel = store.get_novel(&report.novel_id).await.unwrap().unwrap();
        assert!(novel.cover_url.is_none());

        let chapters = store.list_chapters(&report.novel_id).await.unwrap();
        assert_eq!(chapters[0].content(Language::Id), Some("<p>1</p>"));
        assert_eq!(chapters[0].content(Language::En), None);
    }

    #[tokio::test]
    async fn test_missing_cover_bytes_is_a_warning() {
        let (importer, _, storage) = importer();
        let data = EpubFixture::new("Broken Cover")
            .chapter("One", "<p>1</p>")
            .missing_cover_image()
            .build();
        let report = importer
            .import_new_novel("b.epub", data, Language::En)
            .await
            .unwrap();

        assert!(!report.cover_stored);
        assert!(storage.paths().is_empty());
        assert!(report.warnings.iter().any(|w| w.starts_with("cover skipped")));
    }

    #[tokio::test]
    async fn test_extension_is_advisory() {
        let (importer, _, _) = importer();
        let report = importer
            .import_new_novel("upload.bin", book("x", 1), Language::En)
            .await
            .unwrap();
        assert_eq!(report.created, vec![1]);
        assert!(report.warnings[0].contains("upload.bin"));
    }

    #[tokio::test]
    async fn test_missing_container_makes_no_store_calls() {
        let store = Arc::new(RecordingStore::new());
        let storage = Arc::new(MemoryStorage::new());
        let importer = Importer::new(store.clone(), storage.clone());

        let data = EpubFixture::new("No Container")
            .chapter("One", "<p>1</p>")
            .without_container()
            .build();
        let err = importer
            .import_new_novel("n.epub", data, Language::En)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            NovellaError::FileFormat(FileFormatError::MissingContainer)
        ));
        assert_eq!(store.calls(), 0);
        assert!(storage.paths().is_empty());
    }

    #[tokio::test]
    async fn test_not_a_zip_is_rejected() {
        let store = Arc::new(RecordingStore::new());
        let importer = Importer::new(store.clone(), Arc::new(MemoryStorage::new()));
        let err = importer
            .add_language("any", "x.epub", b"not a zip".to_vec(), Language::Id, None)
            .await
            .unwrap_err();
        assert!(err.is_parse_failure());
        assert_eq!(store.calls(), 0);
    }

    #[tokio::test]
    async fn test_untitled_package_fails() {
        let (importer, store, _) = importer();
        let data = EpubFixture::new("x").without_title().chapter("One", "").build();
        let err = importer
            .import_new_novel("x.epub", data, Language::En)
            .await
            .unwrap_err();
        assert!(matches!(err, NovellaError::Package(PackageError::MissingTitle)));
        assert!(store.list_novels().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_add_language_merges_by_number() {
        let (importer, store, _) = importer();
        let first = importer
            .import_new_novel("en.epub", book("Hello", 3), Language::En)
            .await
            .unwrap();

        let url = "https://example.com/tides-id.epub";
        let second = importer
            .add_language(&first.novel_id, "id.epub", book("Halo", 2), Language::Id, Some(url))
            .await
            .unwrap();

        assert_eq!(second.updated, vec![1, 2]);
        assert!(second.created.is_empty());
        assert_eq!(second.summary, "0 chapters created, 2 updated, 0 failed to save");

        let chapters = store.list_chapters(&first.novel_id).await.unwrap();
        assert_eq!(chapters.len(), 3);
        assert_eq!(chapters[0].content(Language::En), Some("<p>Hello1</p>"));
        assert_eq!(chapters[0].content(Language::Id), Some("<p>Halo1</p>"));
        assert_eq!(chapters[1].external_url(Language::Id), Some(url));
        assert_eq!(chapters[2].content(Language::Id), None);
    }

    #[tokio::test]
    async fn test_add_language_twice_is_stable() {
        let (importer, store, _) = importer();
        let first = importer
            .import_new_novel("en.epub", book("Hello", 2), Language::En)
            .await
            .unwrap();

        for _ in 0..2 {
            importer
                .add_language(&first.novel_id, "id.epub", book("Halo", 2), Language::Id, None)
                .await
                .unwrap();
        }
        assert_eq!(store.chapter_count().await, 2);
    }

    #[tokio::test]
    async fn test_add_language_to_unknown_novel() {
        let (importer, store, _) = importer();
        let err = importer
            .add_language("ghost", "id.epub", book("Halo", 1), Language::Id, None)
            .await
            .unwrap_err();
        assert!(!err.is_parse_failure());
        assert!(matches!(err, NovellaError::Store(StoreError::NovelNotFound(id)) if id == "ghost"));
        assert_eq!(store.chapter_count().await, 0);
    }

    #[test]
    fn test_failed_only_follows_parsing() {
        use ImportPhase::*;
        assert!(Parsing.can_advance_to(Failed));
        for phase in [Idle, ExtractingCover, ExtractingChapters, Reconciling, Done] {
            assert!(!phase.can_advance_to(Failed), "{} -> failed", phase);
        }
        assert!(ExtractingChapters.can_advance_to(ExtractingCover));
        assert!(ExtractingCover.can_advance_to(Reconciling));
        assert!(!Idle.can_advance_to(Reconciling));
        assert!(!Done.can_advance_to(Parsing));
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "import cannot move from reconciling to failed")]
    fn test_illegal_transition_is_caught() {
        let mut progress = Progress::new();
        progress.advance(ImportPhase::Parsing);
        progress.advance(ImportPhase::ExtractingChapters);
        progress.advance(ImportPhase::Reconciling);
        progress.fail(NovellaError::Task("late".to_string()));
    }

    #[tokio::test]
    async fn test_partial_failures_are_reported() {
        let store = Arc::new(RecordingStore::failing_on([2]));
        let importer = Importer::new(store.clone(), Arc::new(MemoryStorage::new()));
        let report = importer
            .import_new_novel("f.epub", book("x", 3), Language::En)
            .await
            .unwrap();

        assert_eq!(report.created, vec![1, 3]);
        assert_eq!(report.failed, vec![2]);
        assert!(!report.is_complete());
        assert_eq!(report.summary, "2 chapters created, 0 updated, 1 failed to save");
    }
}
