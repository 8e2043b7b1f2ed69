//! Rendering merged sections and packaging them as EPUB.
//!
//! Three passes run in order for every book:
//!
//! - [`render_section`]: merged markdown to an XHTML fragment per chapter
//! - [`resolve_assets`]: bundle referenced images and rewrite their `src`
//! - [`assemble`]: build, validate and serialize the EPUB container
//!
//! # Example
//!
//! ```
//! use std::path::Path;
//! use diglot::export::{RenderContext, assemble, render_section, resolve_assets};
//! use diglot::compose::{MergeContext, align, merge};
//! use diglot::markdown::parse_sections;
//! use diglot::{ComposeConfig, Metadata, Strategy};
//!
//! let config = ComposeConfig::default();
//! let metadata = Metadata::new("Book").with_language("en").with_secondary_language("vi");
//! let merge_ctx = MergeContext::new(&config, &metadata);
//! let render_ctx = RenderContext::new("en", "vi");
//!
//! let pairs = align(&parse_sections("# One\nHello"), &parse_sections("# Một\nXin chào"));
//! let mut diagnostics = Vec::new();
//! let chapters: Vec<_> = pairs
//!     .iter()
//!     .enumerate()
//!     .map(|(i, pair)| merge(pair, i, Strategy::DualLanguagePositional, &merge_ctx))
//!     .map(|merged| render_section(&merged, &render_ctx, &mut diagnostics))
//!     .collect();
//!
//! let resolution = resolve_assets(chapters, Path::new("."), false)?;
//! let epub = assemble(resolution.chapters, resolution.assets, &metadata, &config)?;
//! assert!(epub.starts_with(b"PK"));
//! # Ok::<(), diglot::Error>(())
//! ```

mod assets;
mod epub;
mod html_synth;

pub use assets::{ImageAsset, Resolution, image_media_type, resolve_assets};
pub use epub::{DEFAULT_STYLESHEET, EpubPackage, ManifestEntry, NavEntry, assemble};
pub use html_synth::{RenderContext, RenderedChapter, render_section, xhtml_document};
