//! Merged section representation consumed by the renderer.

use super::section::Side;

/// One piece of a header line, tagged with its language.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderSegment {
    pub side: Side,
    /// Inline markdown of the header text.
    pub text: String,
}

/// A single rendered header line.
///
/// Level-1 pairs produce one line per language; other levels produce one
/// combined line holding both segments joined by `separator`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderLine {
    pub level: u8,
    pub segments: Vec<HeaderSegment>,
    pub separator: String,
}

impl HeaderLine {
    pub fn single(level: u8, side: Side, text: impl Into<String>) -> Self {
        Self {
            level,
            segments: vec![HeaderSegment {
                side,
                text: text.into(),
            }],
            separator: String::new(),
        }
    }

    /// The full header text, segments joined by the separator.
    pub fn text(&self) -> String {
        let parts: Vec<&str> = self.segments.iter().map(|s| s.text.as_str()).collect();
        parts.join(&self.separator)
    }

    /// The language of the line, or `None` for a combined line.
    pub fn side(&self) -> Option<Side> {
        match self.segments.as_slice() {
            [only] => Some(only.side),
            _ => None,
        }
    }
}

/// A blank-line delimited markdown block from one side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BodyBlock {
    pub side: Side,
    pub lines: Vec<String>,
}

impl BodyBlock {
    pub fn new(side: Side, lines: Vec<String>) -> Self {
        Self { side, lines }
    }
}

/// The combined header and body of one aligned pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergedSection {
    pub header_lines: Vec<HeaderLine>,
    pub body_blocks: Vec<BodyBlock>,
    /// Index of the aligned pair this section was merged from.
    pub source_pair_index: usize,
    /// Inline markdown used as the navigation label.
    pub nav_label: String,
}

impl MergedSection {
    /// True if any body block came from `side`.
    pub fn has_blocks_from(&self, side: Side) -> bool {
        self.body_blocks.iter().any(|b| b.side == side)
    }
}
