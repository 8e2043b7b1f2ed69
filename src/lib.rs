//! # diglot
//!
//! Compose side-by-side bilingual EPUB books from a markdown text and its
//! translation.
//!
//! ## Features
//!
//! - Position-based section alignment that never compares translated titles
//! - Dual-language headers and language-tagged body containers
//! - Three composition strategies: simple, positional and paragraph-by-paragraph
//! - Image bundling with deduplication and non-fatal diagnostics
//! - Deterministic EPUB 3 output with an NCX fallback for older readers
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::path::Path;
//! use diglot::{ComposeConfig, ComposeInput, Metadata, Strategy, compose_to_path, read_markdown};
//!
//! let primary = read_markdown(Path::new("book/original.md"))?;
//! let secondary = read_markdown(Path::new("book/translatedcontent.md"))?;
//! let metadata = Metadata::new("Clean Code")
//!     .with_author("Robert C. Martin")
//!     .with_language("en")
//!     .with_secondary_language("vi");
//!
//! let input = ComposeInput {
//!     primary: &primary,
//!     secondary: Some(&secondary),
//!     image_root: Path::new("book"),
//!     metadata: &metadata,
//! };
//! let config = ComposeConfig::new().with_strategy(Strategy::ParagraphByParagraph);
//!
//! let book = compose_to_path(&input, &config, Path::new("book/final.epub"))?;
//! for diagnostic in &book.diagnostics {
//!     eprintln!("warning: {diagnostic}");
//! }
//! # Ok::<(), diglot::Error>(())
//! ```
//!
//! ## Pipeline
//!
//! Each stage is usable on its own:
//!
//! 1. [`markdown::parse_sections`] splits each document into flat sections
//! 2. [`compose::align`] pairs sections by position
//! 3. [`compose::merge`] combines each pair into one merged section
//! 4. [`export::render_section`] renders XHTML with language containers
//! 5. [`export::resolve_assets`] bundles images
//! 6. [`export::assemble`] validates and writes the EPUB container

pub mod compose;
pub mod config;
pub mod error;
pub mod export;
pub mod markdown;
pub mod model;
pub mod pipeline;
pub mod util;

pub use config::{ComposeConfig, ParseStrategyError, Strategy};
pub use error::{Error, Result};
pub use model::{AlignedPair, Diagnostic, Document, MergedSection, Metadata, Section, Side};
pub use pipeline::{ComposeInput, Composition, compose, compose_to_path, read_markdown};
