//! End-to-end composition of a bilingual book.
//!
//! The pipeline is a pure function of its inputs: two markdown texts, an
//! image directory and metadata go in; EPUB bytes and diagnostics come out.
//! Locating inputs and persisting results belongs to the caller.

use std::fs;
use std::path::Path;

use crate::compose::{MergeContext, align, align_single, merge};
use crate::config::{ComposeConfig, Strategy};
use crate::error::{Error, Result};
use crate::export::{RenderContext, assemble, render_section, resolve_assets};
use crate::markdown::{parse_sections, plain_text};
use crate::model::{Diagnostic, Document, Metadata};
use crate::util::decode_text;

/// Inputs for one book.
#[derive(Debug, Clone, Copy)]
pub struct ComposeInput<'a> {
    /// Source-language markdown. Required.
    pub primary: &'a str,
    /// Translated markdown. Absent or blank input yields a single-language book.
    pub secondary: Option<&'a str>,
    /// Base directory for relative image references.
    pub image_root: &'a Path,
    pub metadata: &'a Metadata,
}

/// A composed book.
#[derive(Debug, Clone)]
pub struct Composition {
    pub epub: Vec<u8>,
    /// Non-fatal findings, in pipeline order.
    pub diagnostics: Vec<Diagnostic>,
    pub chapter_count: usize,
    /// The strategy actually applied.
    pub strategy: Strategy,
}

/// Compose an EPUB from a pair of markdown documents.
///
/// # Example
///
/// ```
/// use std::path::Path;
/// use diglot::{ComposeConfig, ComposeInput, Metadata, compose};
///
/// let metadata = Metadata::new("Clean Code").with_language("en").with_secondary_language("vi");
/// let input = ComposeInput {
///     primary: "# Intro\nHello\n## Chapter 1\nText",
///     secondary: Some("# Giới thiệu\nXin chào"),
///     image_root: Path::new("."),
///     metadata: &metadata,
/// };
///
/// let book = compose(&input, &ComposeConfig::default())?;
/// assert_eq!(book.chapter_count, 2);
/// assert_eq!(book.diagnostics.len(), 1);
/// # Ok::<(), diglot::Error>(())
/// ```
pub fn compose(input: &ComposeInput<'_>, config: &ComposeConfig) -> Result<Composition> {
    let primary = parse_sections(input.primary);
    if primary.is_empty() {
        return Err(Error::InputMissing);
    }

    let secondary = input
        .secondary
        .map(parse_sections)
        .filter(|doc| !doc.is_empty());

    let strategy = match &secondary {
        Some(_) => config.strategy,
        None => {
            if config.strategy.is_bilingual() {
                log::info!("no secondary document, composing a single-language book");
            }
            Strategy::Simple
        }
    };
    log::info!("composing with strategy {strategy}");

    let pairs = match &secondary {
        Some(secondary) if strategy.is_bilingual() => align(&primary, secondary),
        _ => align_single(&primary),
    };

    let mut diagnostics = Vec::new();
    if strategy.is_bilingual() {
        for (index, pair) in pairs.iter().enumerate().filter(|(_, p)| !p.matched) {
            let Some(side) = pair.present_side() else {
                continue;
            };
            let title = pair.section(side).map(|s| s.title.clone()).unwrap_or_default();
            let diagnostic = Diagnostic::UnmatchedSection {
                pair: index,
                side,
                title,
            };
            log::warn!("{diagnostic}");
            diagnostics.push(diagnostic);
        }
    }

    let metadata = with_default_title(input.metadata, &primary);
    let merge_ctx = MergeContext::new(config, &metadata);
    let render_ctx = RenderContext::new(metadata.primary_lang(), metadata.secondary_lang());

    let chapters: Vec<_> = pairs
        .iter()
        .enumerate()
        .map(|(index, pair)| merge(pair, index, strategy, &merge_ctx))
        .map(|merged| render_section(&merged, &render_ctx, &mut diagnostics))
        .collect();

    let resolution = resolve_assets(chapters, input.image_root, config.strict_assets)?;
    diagnostics.extend(resolution.diagnostics);
    let chapter_count = resolution.chapters.len();

    let epub = assemble(resolution.chapters, resolution.assets, &metadata, config)?;

    Ok(Composition {
        epub,
        diagnostics,
        chapter_count,
        strategy,
    })
}

/// Compose a book and write it to `output`.
///
/// The package is written to a temporary sibling file and renamed into
/// place, so a failed run never leaves a partial EPUB at `output`.
pub fn compose_to_path(
    input: &ComposeInput<'_>,
    config: &ComposeConfig,
    output: &Path,
) -> Result<Composition> {
    let composition = compose(input, config)?;

    let file_name = output
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "book.epub".to_string());
    let partial = output.with_file_name(format!(".{file_name}.partial"));

    let written = fs::write(&partial, &composition.epub).and_then(|()| fs::rename(&partial, output));
    if let Err(e) = written {
        let _ = fs::remove_file(&partial);
        return Err(e.into());
    }

    log::info!("wrote {}", output.display());
    Ok(composition)
}

/// Read a markdown file, decoding legacy encodings when it is not UTF-8.
pub fn read_markdown(path: &Path) -> Result<String> {
    let bytes = fs::read(path)?;
    Ok(decode_text(&bytes, None).into_owned())
}

/// Fall back to the first top-level header of the primary document when no
/// title was supplied.
fn with_default_title(metadata: &Metadata, primary: &Document) -> Metadata {
    let mut metadata = metadata.clone();
    if metadata.title.trim().is_empty()
        && let Some(section) = primary.iter().find(|s| s.level == 1)
    {
        metadata.title = plain_text(&section.title);
    }
    metadata
}
