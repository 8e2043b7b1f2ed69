//! Error types for diglot operations.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that abort composition of a book.
///
/// Problems confined to a single section or image are reported as
/// [`Diagnostic`](crate::Diagnostic)s instead; the asset variants here are
/// only raised when [`ComposeConfig::strict_assets`](crate::ComposeConfig)
/// is set.
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("XML parsing error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("primary document is missing or empty")]
    InputMissing,

    #[error("unsupported image type '{extension}' for {reference}")]
    UnsupportedAssetType { reference: String, extension: String },

    #[error("image {reference} does not resolve under {}: {reason}", .root.display())]
    MalformedAssetReference {
        reference: String,
        root: PathBuf,
        reason: String,
    },

    /// Raised only through the `?` conversion by callers of
    /// [`markdown::render_block`](crate::markdown::render_block) and
    /// [`markdown::render_inline`](crate::markdown::render_inline).
    /// [`compose`](crate::pipeline::compose) never returns it: blocks that fail to
    /// render become [`Diagnostic::RenderFallback`](crate::Diagnostic).
    #[error("render error: {0}")]
    Render(#[from] crate::markdown::RenderError),

    #[error("package integrity violation: {0}")]
    PackageIntegrity(String),
}

pub type Result<T> = std::result::Result<T, Error>;
