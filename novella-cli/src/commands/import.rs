//! Import command implementation

use super::library::LibraryDir;
use anyhow::{bail, Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use novella_core::{ContentMode, EpubDecoder, ImportReport, Importer, Language, LocalStorage};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

pub struct ImportOptions {
    pub language: Language,
    pub novel: Option<String>,
    pub source_url: Option<String>,
    pub plain_text: bool,
}

/// Import an EPUB into a library directory
pub async fn import(input: &str, library: &Path, options: ImportOptions) -> Result<()> {
    let input_path = Path::new(input);
    let data = tokio::fs::read(input_path)
        .await
        .with_context(|| format!("Failed to open input file: {}", input))?;
    let filename = input_path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(input)
        .to_string();

    let library = LibraryDir::new(library);
    let store = Arc::new(library.load().await?);
    let storage = Arc::new(LocalStorage::new(library.assets_path(), library.assets_url()?));

    let mode = if options.plain_text {
        ContentMode::PlainText
    } else {
        ContentMode::Html
    };
    let importer = Importer::new(store.clone(), storage)
        .with_decoder(EpubDecoder::new().with_content_mode(mode));

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .context("Invalid progress template")?,
    );
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner.set_message(format!("Importing {} ({})", filename, options.language));

    let result = match &options.novel {
        Some(novel_id) => {
            importer
                .add_language(
                    novel_id,
                    &filename,
                    data,
                    options.language,
                    options.source_url.as_deref(),
                )
                .await
        }
        None => {
            if options.source_url.is_some() {
                tracing::warn!("--source-url only applies when adding a language with --novel");
            }
            importer
                .import_new_novel(&filename, data, options.language)
                .await
        }
    };
    spinner.finish_and_clear();

    let report = result.with_context(|| format!("Failed to import {}", input))?;
    library.save(&store).await?;
    print_report(&report);

    if !report.is_complete() {
        bail!("{} chapters failed to save", report.failed.len());
    }
    Ok(())
}

fn print_report(report: &ImportReport) {
    println!("Novel:    {} ({})", report.title, report.novel_id);
    println!("Language: {}", report.language.display_name());
    println!("Result:   {}", report.summary);
    if report.cover_stored {
        println!("Cover:    stored");
    }
    if !report.failed.is_empty() {
        let failed: Vec<String> = report.failed.iter().map(u32::to_string).collect();
        println!("Failed:   {}", failed.join(", "));
    }
    for warning in &report.warnings {
        println!("Warning:  {}", warning);
    }
}
