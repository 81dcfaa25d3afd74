//! Info command implementation

use anyhow::{Context, Result};
use novella_core::{ContentMode, EpubDecoder, ParseOutcome};
use serde::Serialize;
use std::path::Path;

/// Book info output
#[derive(Serialize)]
struct BookInfo {
    title: String,
    author: Option<String>,
    description: Option<String>,
    has_cover: bool,
    chapters: Vec<ChapterInfo>,
    warnings: Vec<String>,
}

#[derive(Serialize)]
struct ChapterInfo {
    number: u32,
    title: String,
    length: usize,
}

impl From<&ParseOutcome> for BookInfo {
    fn from(outcome: &ParseOutcome) -> Self {
        let book = &outcome.book;
        Self {
            title: book.title.clone(),
            author: book.author.clone(),
            description: book.description.clone(),
            has_cover: book.cover_data_uri.is_some(),
            chapters: book
                .chapters
                .iter()
                .map(|c| ChapterInfo {
                    number: c.number,
                    title: c.title.clone(),
                    length: c.content.chars().count(),
                })
                .collect(),
            warnings: super::validate::warnings(outcome),
        }
    }
}

/// Parse an EPUB from disk
pub(crate) fn parse_file(input: &str, plain_text: bool) -> Result<ParseOutcome> {
    let data =
        std::fs::read(Path::new(input)).with_context(|| format!("Failed to open input file: {}", input))?;

    let mode = if plain_text {
        ContentMode::PlainText
    } else {
        ContentMode::Html
    };
    EpubDecoder::new()
        .with_content_mode(mode)
        .parse(&data)
        .with_context(|| format!("Failed to decode {}", input))
}

/// Display information about an EPUB
pub fn info(input: &str, json: bool, plain_text: bool, dump: bool) -> Result<()> {
    let outcome = parse_file(input, plain_text)?;

    if dump {
        println!("{}", serde_json::to_string_pretty(&outcome.book)?);
        return Ok(());
    }

    let info = BookInfo::from(&outcome);

    if json {
        println!("{}", serde_json::to_string_pretty(&info)?);
    } else {
        println!("Title:       {}", info.title);
        if let Some(author) = &info.author {
            println!("Author:      {}", author);
        }
        if let Some(desc) = &info.description {
            println!("Description: {}", desc);
        }
        println!("Cover:       {}", if info.has_cover { "yes" } else { "no" });
        println!("Chapters:    {}", info.chapters.len());
        for chapter in &info.chapters {
            println!("  {:>4}. {} ({} chars)", chapter.number, chapter.title, chapter.length);
        }
        for warning in &info.warnings {
            println!("Warning:     {}", warning);
        }
    }

    Ok(())
}
