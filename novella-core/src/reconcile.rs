//! Merge a parsed chapter sequence into the stored chapters of a novel
//!
//! Planning is pure: it looks at the rows that already exist and decides,
//! per chapter number, whether to insert a row or patch one language slot.
//! Applying the plan is a separate sequential pass against a [`ContentStore`].

use crate::error::ReconciliationError;
use crate::store::ContentStore;
use crate::types::{ChapterPatch, Language, NewChapter, ParsedChapter, StoredChapter};
use serde::Serialize;
use std::collections::HashMap;

/// Patch for an existing row
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChapterUpdate {
    pub chapter_id: String,
    pub number: u32,
    pub patch: ChapterPatch,
}

/// Create and update instructions for one import
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcilePlan {
    pub to_create: Vec<NewChapter>,
    pub to_update: Vec<ChapterUpdate>,
}

impl ReconcilePlan {
    pub fn is_empty(&self) -> bool {
        self.to_create.is_empty() && self.to_update.is_empty()
    }

    /// Number of store calls applying this plan will make
    pub fn len(&self) -> usize {
        self.to_create.len() + self.to_update.len()
    }
}

/// Chapter numbers touched by [`apply`], split by result
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileOutcome {
    pub created: Vec<u32>,
    pub updated: Vec<u32>,
    pub failed: Vec<u32>,
}

impl ReconcileOutcome {
    /// Aggregate error when any instruction failed
    pub fn error(&self) -> Option<ReconciliationError> {
        if self.failed.is_empty() {
            None
        } else {
            Some(ReconciliationError {
                failed: self.failed.clone(),
            })
        }
    }
}

/// Decide which chapters to create and which to patch.
///
/// A number that already has a row gets an update writing only `language`'s
/// content (and source URL, when one is given). Any other number gets a new
/// row whose other-language fields are empty. Rows the parse does not
/// mention are left out of the plan.
pub fn plan(
    existing: &[StoredChapter],
    parsed: &[ParsedChapter],
    language: Language,
    source_url: Option<&str>,
) -> ReconcilePlan {
    let mut by_number: HashMap<u32, &StoredChapter> = HashMap::with_capacity(existing.len());
    for chapter in existing {
        by_number.entry(chapter.number).or_insert(chapter);
    }

    let mut result = ReconcilePlan::default();
    for chapter in parsed {
        let source_url = source_url.map(str::to_string);
        match by_number.get(&chapter.number) {
            Some(row) => result.to_update.push(ChapterUpdate {
                chapter_id: row.id.clone(),
                number: chapter.number,
                patch: ChapterPatch::language_content(
                    language,
                    chapter.content.clone(),
                    source_url,
                ),
            }),
            None => result.to_create.push(NewChapter::for_language(
                chapter.number,
                chapter.title.clone(),
                language,
                chapter.content.clone(),
                source_url,
            )),
        }
    }

    tracing::debug!(
        language = %language,
        create = result.to_create.len(),
        update = result.to_update.len(),
        "Planned reconciliation"
    );
    result
}

/// Issue the plan against the store, one call per chapter.
///
/// A failed call is logged and recorded; the remaining instructions still run.
pub async fn apply(
    store: &dyn ContentStore,
    novel_id: &str,
    plan: ReconcilePlan,
) -> ReconcileOutcome {
    let mut outcome = ReconcileOutcome::default();

    for chapter in plan.to_create {
        let number = chapter.number;
        match store.create_chapters(novel_id, vec![chapter]).await {
            Ok(_) => {
                tracing::debug!(novel_id, number, "Created chapter");
                outcome.created.push(number);
            }
            Err(e) => {
                tracing::warn!(novel_id, number, error = %e, "Failed to create chapter");
                outcome.failed.push(number);
            }
        }
    }

    for update in plan.to_update {
        match store.update_chapter(&update.chapter_id, update.patch).await {
            Ok(_) => {
                tracing::debug!(novel_id, number = update.number, "Updated chapter");
                outcome.updated.push(update.number);
            }
            Err(e) => {
                tracing::warn!(
                    novel_id,
                    number = update.number,
                    error = %e,
                    "Failed to update chapter"
                );
                outcome.failed.push(update.number);
            }
        }
    }

    outcome.failed.sort_unstable();
    outcome
}
