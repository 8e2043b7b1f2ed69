//! Non-fatal findings collected while composing a book.

use thiserror::Error;

use super::section::Side;

/// A recoverable problem that was worked around.
///
/// The pipeline never aborts for these; callers decide whether to log,
/// surface or ignore them.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[cfg_attr(
    feature = "cli",
    derive(serde::Serialize),
    serde(tag = "kind", rename_all = "snake_case")
)]
pub enum Diagnostic {
    /// A tail section of the longer document had no counterpart.
    #[error("section {pair} '{title}' has no {} counterpart", .side.other())]
    UnmatchedSection {
        pair: usize,
        side: Side,
        title: String,
    },

    /// An image was dropped because its extension has no known media type.
    #[error("chapter {chapter}: unsupported image type '{extension}' for {reference}")]
    UnsupportedAssetType {
        chapter: usize,
        reference: String,
        extension: String,
    },

    /// An image was dropped because it could not be found or read.
    #[error("chapter {chapter}: image {reference} skipped: {reason}")]
    MalformedAssetReference {
        chapter: usize,
        reference: String,
        reason: String,
    },

    /// A block was emitted as plain escaped text instead of markup.
    #[error("chapter {chapter}: block rendered as plain text: {reason}")]
    RenderFallback { chapter: usize, reason: String },
}

impl Diagnostic {
    /// Stable name of the diagnostic kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Diagnostic::UnmatchedSection { .. } => "unmatched_section",
            Diagnostic::UnsupportedAssetType { .. } => "unsupported_asset_type",
            Diagnostic::MalformedAssetReference { .. } => "malformed_asset_reference",
            Diagnostic::RenderFallback { .. } => "render_fallback",
        }
    }
}
