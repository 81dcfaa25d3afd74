//! Core types shared by the decoder, the reconciler and the stores

mod book;
mod chapter;
mod language;
mod package;
mod record;

pub use book::{ParseOutcome, ParsedBook};
pub use chapter::ParsedChapter;
pub use language::Language;
pub use package::{ManifestItem, PackageDocument, SpineItem};
pub use record::{ChapterPatch, NewChapter, NewNovel, NovelStatus, StoredChapter, StoredNovel};
