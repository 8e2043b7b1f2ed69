//! diglot - bilingual EPUB composer

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use serde::Serialize;

use diglot::{
    ComposeConfig, ComposeInput, Composition, Diagnostic, Error, Metadata, Strategy,
    compose_to_path, read_markdown,
};

const PRIMARY_FILES: [&str; 2] = ["originalbook.md", "original.md"];
const SECONDARY_FILE: &str = "translatedcontent.md";
const OUTPUT_FILE: &str = "final.epub";
const PROGRESS_FILE: &str = "composingservice-progress.json";

#[derive(Parser)]
#[command(name = "diglot")]
#[command(version, about = "Compose bilingual EPUB books from parallel markdown", long_about = None)]
#[command(after_help = "EXAMPLES:
    diglot build en.md vi.md -o book.epub --lang en --secondary-lang vi
    diglot job books/clean-code --strategy paragraph-by-paragraph
    diglot strategies")]
struct Cli {
    /// Only log errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Log debug output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compose an EPUB from a primary and an optional translated document
    Build {
        /// Source-language markdown
        #[arg(value_name = "PRIMARY")]
        primary: PathBuf,

        /// Translated markdown
        #[arg(value_name = "SECONDARY")]
        secondary: Option<PathBuf>,

        /// Output EPUB file
        #[arg(short, long, value_name = "FILE")]
        output: PathBuf,

        /// Base directory for image references (defaults to the primary file's directory)
        #[arg(long, value_name = "DIR")]
        images: Option<PathBuf>,

        /// Write diagnostics as JSON
        #[arg(long, value_name = "FILE")]
        report: Option<PathBuf>,

        #[command(flatten)]
        book: BookArgs,
    },

    /// Compose the book in a job directory and record progress
    Job {
        /// Directory holding originalbook.md (or original.md) and translatedcontent.md
        #[arg(value_name = "DIR")]
        dir: PathBuf,

        #[command(flatten)]
        book: BookArgs,
    },

    /// List available composition strategies
    Strategies,
}

#[derive(Args)]
struct BookArgs {
    /// Book title (defaults to the first top-level header)
    #[arg(long, env = "DIGLOT_TITLE")]
    title: Option<String>,

    /// Author, may be repeated
    #[arg(long = "author", env = "DIGLOT_AUTHOR", value_delimiter = ',')]
    authors: Vec<String>,

    /// Language code of the primary document
    #[arg(long, env = "DIGLOT_PRIMARY_LANG", default_value = "en")]
    lang: String,

    /// Language code of the translation
    #[arg(long, env = "DIGLOT_SECONDARY_LANG")]
    secondary_lang: Option<String>,

    /// Composition strategy
    #[arg(long, env = "DIGLOT_STRATEGY", default_value_t = Strategy::default())]
    strategy: Strategy,

    /// Fail on images that cannot be bundled instead of skipping them
    #[arg(long, env = "DIGLOT_STRICT_ASSETS")]
    strict_assets: bool,

    /// Separator between the two languages on combined header lines
    #[arg(long, env = "DIGLOT_HEADER_SEPARATOR")]
    header_separator: Option<String>,

    /// Deflate compression level (0-9)
    #[arg(long, value_parser = clap::value_parser!(u32).range(0..=9))]
    compression_level: Option<u32>,

    /// Stylesheet replacing the built-in one
    #[arg(long, value_name = "FILE")]
    stylesheet: Option<PathBuf>,
}

impl BookArgs {
    fn metadata(&self) -> Metadata {
        let mut metadata = Metadata::new(self.title.clone().unwrap_or_default())
            .with_language(&self.lang);
        for author in &self.authors {
            metadata = metadata.with_author(author.trim());
        }
        if let Some(lang) = &self.secondary_lang {
            metadata = metadata.with_secondary_language(lang);
        }
        metadata
    }

    fn config(&self) -> diglot::Result<ComposeConfig> {
        let mut config = ComposeConfig::new()
            .with_strategy(self.strategy)
            .with_strict_assets(self.strict_assets);
        if let Some(separator) = &self.header_separator {
            config = config.with_header_separator(separator);
        }
        if let Some(level) = self.compression_level {
            config = config.with_compression_level(level);
        }
        if let Some(path) = &self.stylesheet {
            config = config.with_stylesheet(fs::read_to_string(path)?);
        }
        Ok(config)
    }
}

/// The record written next to a job's output.
#[derive(Serialize)]
struct ProgressRecord<'a> {
    status: &'static str,
    composer: &'a str,
    chapter_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    output_file: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    diagnostics: &'a [Diagnostic],
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_filter = if cli.quiet {
        "error"
    } else if cli.verbose {
        "debug"
    } else {
        "warn"
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    let result = match &cli.command {
        Commands::Build {
            primary,
            secondary,
            output,
            images,
            report,
            book,
        } => build(
            primary,
            secondary.as_deref(),
            output,
            images.as_deref(),
            report.as_deref(),
            book,
            cli.quiet,
        ),
        Commands::Job { dir, book } => job(dir, book, cli.quiet),
        Commands::Strategies => {
            for strategy in Strategy::ALL {
                let marker = if strategy == Strategy::default() {
                    " (default)"
                } else {
                    ""
                };
                println!("{strategy}{marker}");
            }
            Ok(())
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn build(
    primary: &Path,
    secondary: Option<&Path>,
    output: &Path,
    images: Option<&Path>,
    report: Option<&Path>,
    book: &BookArgs,
    quiet: bool,
) -> diglot::Result<()> {
    let primary_text = read_markdown(primary)?;
    let secondary_text = secondary.map(read_markdown).transpose()?;
    let image_root = images
        .or_else(|| primary.parent())
        .unwrap_or_else(|| Path::new("."));

    let metadata = book.metadata();
    let input = ComposeInput {
        primary: &primary_text,
        secondary: secondary_text.as_deref(),
        image_root,
        metadata: &metadata,
    };
    let composition = compose_to_path(&input, &book.config()?, output)?;

    if let Some(report) = report {
        let json = serde_json::to_string_pretty(&composition.diagnostics).map_err(io::Error::from)?;
        fs::write(report, json)?;
    }
    if !quiet {
        print_summary(output, &composition);
    }
    Ok(())
}

fn job(dir: &Path, book: &BookArgs, quiet: bool) -> diglot::Result<()> {
    let config = book.config()?;
    let output = dir.join(OUTPUT_FILE);

    let result = compose_job(dir, book, &config, &output);
    let record = match &result {
        Ok(composition) => ProgressRecord {
            status: "completed",
            composer: composition.strategy.name(),
            chapter_count: composition.chapter_count,
            output_file: Some(OUTPUT_FILE),
            error: None,
            diagnostics: &composition.diagnostics,
        },
        Err(e) => ProgressRecord {
            status: "failed",
            composer: config.strategy.name(),
            chapter_count: 0,
            output_file: None,
            error: Some(e.to_string()),
            diagnostics: &[],
        },
    };
    let json = serde_json::to_string_pretty(&record).map_err(io::Error::from)?;
    fs::write(dir.join(PROGRESS_FILE), json)?;

    let composition = result?;
    if !quiet {
        print_summary(&output, &composition);
    }
    Ok(())
}

fn compose_job(
    dir: &Path,
    book: &BookArgs,
    config: &ComposeConfig,
    output: &Path,
) -> diglot::Result<Composition> {
    let primary_path = PRIMARY_FILES
        .iter()
        .map(|name| dir.join(name))
        .find(|path| path.is_file())
        .ok_or(Error::InputMissing)?;
    let primary = read_markdown(&primary_path)?;

    let secondary_path = dir.join(SECONDARY_FILE);
    let secondary = if secondary_path.is_file() {
        Some(read_markdown(&secondary_path)?)
    } else {
        log::info!("{} not found, composing primary only", SECONDARY_FILE);
        None
    };

    let metadata = book.metadata();
    let input = ComposeInput {
        primary: &primary,
        secondary: secondary.as_deref(),
        image_root: dir,
        metadata: &metadata,
    };
    compose_to_path(&input, config, output)
}

fn print_summary(output: &Path, composition: &Composition) {
    println!(
        "{}: {} chapters ({})",
        output.display(),
        composition.chapter_count,
        composition.strategy
    );
    if !composition.diagnostics.is_empty() {
        println!("{} warnings", composition.diagnostics.len());
    }
}
