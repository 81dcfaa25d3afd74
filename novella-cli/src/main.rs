//! Novella CLI - inspect EPUBs and import them into a local library

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use novella_core::Language;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "novella")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Display information about an EPUB
    Info {
        /// Input file path
        input: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,

        /// Extract chapter bodies as plain text instead of HTML
        #[arg(long)]
        text: bool,

        /// Print the whole parsed book, chapter bodies included, as JSON
        #[arg(long)]
        dump: bool,
    },

    /// Validate an EPUB file
    Validate {
        /// Input file path
        input: String,

        /// Treat recoverable problems as failures
        #[arg(long)]
        strict: bool,
    },

    /// Import an EPUB into a library directory
    Import {
        /// Input file path
        input: String,

        /// Library directory (created if missing)
        #[arg(short, long)]
        library: PathBuf,

        /// Language of the chapters in this file (en, id)
        #[arg(short = 'L', long, default_value = "en")]
        language: Language,

        /// Add the language to this existing novel instead of creating one
        #[arg(short, long)]
        novel: Option<String>,

        /// Where the EPUB can be downloaded from, stored with the language's chapters
        #[arg(long)]
        source_url: Option<String>,

        /// Extract chapter bodies as plain text instead of HTML
        #[arg(long)]
        text: bool,
    },

    /// List the chapters of a novel in a library
    Chapters {
        /// Library directory
        #[arg(short, long)]
        library: PathBuf,

        /// Novel id
        #[arg(short, long)]
        novel: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose {
        "novella_cli=debug,novella_core=debug"
    } else {
        "novella_cli=info"
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(filter))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match cli.command {
        Commands::Info {
            input,
            json,
            text,
            dump,
        } => commands::info(&input, json, text, dump),

        Commands::Validate { input, strict } => commands::validate(&input, strict),

        Commands::Import {
            input,
            library,
            language,
            novel,
            source_url,
            text,
        } => {
            let options = commands::ImportOptions {
                language,
                novel,
                source_url,
                plain_text: text,
            };
            commands::import(&input, &library, options).await
        }

        Commands::Chapters {
            library,
            novel,
            json,
        } => commands::chapters(&library, &novel, json).await,
    }
}
