//! Position-based pairing of two parsed documents.
//!
//! Sections are paired purely by index. Titles are never compared since a
//! translated title is not expected to match its source. When one document
//! is longer, its tail is appended as unmatched pairs. A translation that
//! drops a section therefore shifts every later pairing by one; this is a
//! known limitation of positional alignment.

use crate::model::{AlignedPair, Document, Side};

/// Pair the sections of two documents by position.
///
/// # Example
///
/// ```
/// use diglot::compose::align;
/// use diglot::markdown::parse_sections;
///
/// let en = parse_sections("# Intro\n## One\n## Two\n");
/// let vi = parse_sections("# Giới thiệu\n## Một\n");
/// let pairs = align(&en, &vi);
/// assert_eq!(pairs.len(), 3);
/// assert!(pairs[1].matched);
/// assert!(!pairs[2].matched);
/// ```
pub fn align(primary: &Document, secondary: &Document) -> Vec<AlignedPair> {
    let shared = primary.len().min(secondary.len());
    let mut pairs = Vec::with_capacity(primary.len().max(secondary.len()));

    for (p, s) in primary.iter().zip(secondary.iter()) {
        pairs.push(AlignedPair::matched(p.clone(), s.clone()));
    }

    let (side, longer) = if primary.len() > shared {
        (Side::Primary, primary)
    } else {
        (Side::Secondary, secondary)
    };
    for section in longer.iter().skip(shared) {
        pairs.push(AlignedPair::unmatched(side, section.clone()));
    }

    if primary.len() != secondary.len() {
        log::debug!(
            "aligned {} pairs, {} unmatched {} sections",
            pairs.len(),
            pairs.len() - shared,
            side
        );
    }
    pairs
}

/// One unmatched primary pair per section, for single-language books.
pub fn align_single(primary: &Document) -> Vec<AlignedPair> {
    primary
        .iter()
        .map(|section| AlignedPair::unmatched(Side::Primary, section.clone()))
        .collect()
}
