//! Error types for Novella Core

use thiserror::Error;

/// Result type alias using NovellaError
pub type Result<T> = std::result::Result<T, NovellaError>;

/// Top-level error type for all Novella operations
#[derive(Debug, Error)]
pub enum NovellaError {
    #[error("File format error: {0}")]
    FileFormat(#[from] FileFormatError),

    #[error("Package error: {0}")]
    Package(#[from] PackageError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Content store error: {0}")]
    Store(#[from] StoreError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Background task failed: {0}")]
    Task(String),
}

impl NovellaError {
    /// Whether the error aborted an import before anything was persisted
    pub fn is_parse_failure(&self) -> bool {
        matches!(self, Self::FileFormat(_) | Self::Package(_))
    }
}

/// The upload is not a readable OCF container
#[derive(Debug, Error)]
pub enum FileFormatError {
    #[error("missing ZIP local file header signature")]
    MissingSignature,

    #[error("unreadable ZIP archive: {0}")]
    InvalidArchive(String),

    #[error("missing container descriptor META-INF/container.xml")]
    MissingContainer,

    #[error("container descriptor has no rootfile pointer")]
    MissingRootfile,

    #[error("malformed container descriptor: {0}")]
    MalformedContainer(String),

    #[error("package document not found in archive: {0}")]
    MissingPackage(String),

    #[error("archive entry {path} expands past {limit} bytes")]
    EntryTooLarge { path: String, limit: u64 },

    #[error("archive expands past {limit} bytes")]
    ArchiveTooLarge { limit: u64 },
}

/// The package document is unusable
#[derive(Debug, Error)]
pub enum PackageError {
    #[error("package document has no title")]
    MissingTitle,

    #[error("package document has no spine")]
    MissingSpine,

    #[error("spine has no readable entries")]
    EmptySpine,

    #[error("malformed package document: {0}")]
    Malformed(String),
}

/// A manifest-referenced resource could not be used; the import continues
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResourceError {
    #[error("spine references unknown manifest id '{0}'")]
    UnknownSpineId(String),

    #[error("spine lists manifest id '{0}' more than once")]
    DuplicateSpineId(String),

    #[error("resource '{path}' for manifest id '{id}' is missing from the archive")]
    Missing { id: String, path: String },

    #[error("resource '{path}' for manifest id '{id}' is not valid UTF-8")]
    Unreadable { id: String, path: String },
}

/// Errors that occur during object storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Backend error: {0}")]
    BackendError(String),

    #[error("Invalid data URI: {0}")]
    InvalidDataUri(String),

    #[error("Not an image: {path} ({media_type})")]
    NotAnImage { path: String, media_type: String },
}

/// Errors returned by the content store collaborator
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("Novel not found: {0}")]
    NovelNotFound(String),

    #[error("Chapter not found: {0}")]
    ChapterNotFound(String),

    #[error("Chapter {number} already exists for novel {novel_id}")]
    DuplicateChapter { novel_id: String, number: u32 },

    #[error("Backend error: {0}")]
    Backend(String),
}

/// Aggregate of per-chapter write failures from one reconciliation pass
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{} chapters failed to save", failed.len())]
pub struct ReconciliationError {
    /// Chapter numbers whose create/update instruction failed
    pub failed: Vec<u32>,
}
