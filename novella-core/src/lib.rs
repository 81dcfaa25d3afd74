//! Novella Core Library
//!
//! This crate turns uploaded EPUB files into an ordered list of chapters plus
//! book metadata, and merges those chapters into stored novels one language
//! track at a time. Parsing never touches storage; the [`import::Importer`]
//! only writes once a parse has succeeded.

pub mod decoder;
pub mod error;
pub mod import;
pub mod reconcile;
pub mod storage;
pub mod store;
pub mod types;

#[cfg(any(test, feature = "fixture"))]
pub mod fixture;

pub use decoder::{ContainerLimits, ContentMode, EpubDecoder};
pub use error::{
    FileFormatError, NovellaError, PackageError, ReconciliationError, ResourceError, Result,
    StorageError, StoreError,
};
pub use import::{ImportPhase, ImportReport, Importer};
pub use reconcile::{ReconcileOutcome, ReconcilePlan};
pub use storage::{LocalStorage, MemoryStorage, StorageProvider};
pub use store::{ContentStore, MemoryContentStore};
pub use types::{
    ChapterPatch, Language, NewChapter, NewNovel, NovelStatus, ParseOutcome, ParsedBook,
    ParsedChapter, StoredChapter, StoredNovel,
};
