//! Parsed markdown sections and their positional pairing.

use std::fmt;

/// Which of the two input documents a piece of content came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "cli", derive(serde::Serialize), serde(rename_all = "snake_case"))]
pub enum Side {
    /// The source-language document.
    Primary,
    /// The translation.
    Secondary,
}

impl Side {
    /// CSS class used for this side's containers.
    pub fn class_name(self) -> &'static str {
        match self {
            Side::Primary => "primary",
            Side::Secondary => "secondary",
        }
    }

    pub fn other(self) -> Side {
        match self {
            Side::Primary => Side::Secondary,
            Side::Secondary => Side::Primary,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.class_name())
    }
}

/// A header-delimited slice of a markdown document.
///
/// Sections are flat: a level-3 header following a level-2 header starts a
/// sibling section, never a child.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    /// Header level 1-6, or 0 for the preamble before the first header.
    pub level: u8,
    /// Header text with the `#` markers removed. Empty for level 0.
    pub title: String,
    /// Raw markdown lines following the header, verbatim.
    pub body: Vec<String>,
    /// Position in the source document. Gapless and increasing from 0.
    pub source_index: usize,
}

impl Section {
    pub fn is_preamble(&self) -> bool {
        self.level == 0
    }

    /// True when the body holds nothing but blank lines.
    pub fn is_body_blank(&self) -> bool {
        self.body.iter().all(|line| line.trim().is_empty())
    }
}

/// An ordered sequence of sections produced by one parse.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Document {
    pub sections: Vec<Section>,
}

impl Document {
    pub fn len(&self) -> usize {
        self.sections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Section> {
        self.sections.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Section> {
        self.sections.iter()
    }
}

/// Two sections associated purely by their position.
///
/// Exactly one side is absent only when `matched` is false.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlignedPair {
    pub primary: Option<Section>,
    pub secondary: Option<Section>,
    pub matched: bool,
}

impl AlignedPair {
    pub fn matched(primary: Section, secondary: Section) -> Self {
        Self {
            primary: Some(primary),
            secondary: Some(secondary),
            matched: true,
        }
    }

    /// A pair carrying a single section with no counterpart.
    pub fn unmatched(side: Side, section: Section) -> Self {
        match side {
            Side::Primary => Self {
                primary: Some(section),
                secondary: None,
                matched: false,
            },
            Side::Secondary => Self {
                primary: None,
                secondary: Some(section),
                matched: false,
            },
        }
    }

    pub fn section(&self, side: Side) -> Option<&Section> {
        match side {
            Side::Primary => self.primary.as_ref(),
            Side::Secondary => self.secondary.as_ref(),
        }
    }

    /// The side that is present on an unmatched pair.
    pub fn present_side(&self) -> Option<Side> {
        match (&self.primary, &self.secondary) {
            (Some(_), None) => Some(Side::Primary),
            (None, Some(_)) => Some(Side::Secondary),
            _ => None,
        }
    }
}
