//! Section alignment and dual-language merging.
//!
//! [`align`] pairs the sections of two documents by position and
//! [`merge`] turns each pair into a [`MergedSection`](crate::model::MergedSection)
//! according to the selected [`Strategy`](crate::Strategy).

mod align;
mod merge;

pub use align::{align, align_single};
pub use merge::{MergeContext, merge};
