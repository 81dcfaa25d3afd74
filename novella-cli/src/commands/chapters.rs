//! Chapters command implementation

use super::library::LibraryDir;
use anyhow::{Context, Result};
use novella_core::{ContentStore, Language};
use serde::Serialize;
use std::path::Path;

#[derive(Serialize)]
struct ChapterRow {
    number: u32,
    title: String,
    languages: Vec<Language>,
}

/// List the chapters of a novel
pub async fn chapters(library: &Path, novel_id: &str, json: bool) -> Result<()> {
    let store = LibraryDir::new(library).load().await?;

    let novel = store
        .get_novel(novel_id)
        .await?
        .with_context(|| format!("Novel not found: {}", novel_id))?;
    let rows: Vec<ChapterRow> = store
        .list_chapters(novel_id)
        .await?
        .into_iter()
        .map(|c| ChapterRow {
            number: c.number,
            languages: c.languages(),
            title: c.title,
        })
        .collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    println!("{} ({} chapters)", novel.title, rows.len());
    for row in &rows {
        let languages: Vec<&str> = row.languages.iter().map(|l| l.code()).collect();
        println!("  {:>4}. {} [{}]", row.number, row.title, languages.join(", "));
    }
    Ok(())
}
