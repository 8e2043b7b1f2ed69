//! Core data types shared by every pipeline stage.
//!
//! Data flows strictly forward: [`Document`]s are paired into
//! [`AlignedPair`]s, merged into [`MergedSection`]s and then rendered.
//! Nothing here performs I/O.

mod diagnostic;
mod merged;
mod metadata;
mod section;

pub use diagnostic::Diagnostic;
pub use merged::{BodyBlock, HeaderLine, HeaderSegment, MergedSection};
pub use metadata::Metadata;
pub use section::{AlignedPair, Document, Section, Side};
