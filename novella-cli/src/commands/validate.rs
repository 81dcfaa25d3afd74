//! Validate command implementation

use anyhow::{bail, Result};
use novella_core::ParseOutcome;

/// Recoverable problems, cover first
pub(crate) fn warnings(outcome: &ParseOutcome) -> Vec<String> {
    outcome
        .cover_warning
        .iter()
        .map(|w| format!("cover skipped: {}", w))
        .chain(outcome.warnings.iter().map(ToString::to_string))
        .collect()
}

/// Validate an EPUB file
pub fn validate(input: &str, strict: bool) -> Result<()> {
    let outcome = match super::info::parse_file(input, false) {
        Ok(outcome) => outcome,
        Err(e) => {
            eprintln!("Invalid EPUB file: {:#}", e);
            bail!("Validation failed for {}", input);
        }
    };

    let warnings = warnings(&outcome);
    println!("Valid EPUB file");
    println!("  Title: {}", outcome.book.title);
    println!("  Chapters: {}", outcome.book.chapters.len());
    for warning in &warnings {
        println!("  Warning: {}", warning);
    }

    if strict && !warnings.is_empty() {
        bail!(
            "Validation failed for {}: {} warnings in strict mode",
            input,
            warnings.len()
        );
    }

    Ok(())
}
