//! Composition settings.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// How the two documents are combined into chapters.
///
/// The set is closed; strategies are selected by name at call time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Strategy {
    /// Primary document only, one chapter per section.
    Simple,
    /// Sections paired by position; primary blocks followed by secondary blocks.
    #[default]
    DualLanguagePositional,
    /// Sections paired by position; blocks interleaved one-for-one.
    ParagraphByParagraph,
}

impl Strategy {
    pub const ALL: [Strategy; 3] = [
        Strategy::Simple,
        Strategy::DualLanguagePositional,
        Strategy::ParagraphByParagraph,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Strategy::Simple => "simple",
            Strategy::DualLanguagePositional => "dual-language-positional",
            Strategy::ParagraphByParagraph => "paragraph-by-paragraph",
        }
    }

    /// Whether the strategy reads the secondary document at all.
    pub fn is_bilingual(self) -> bool {
        !matches!(self, Strategy::Simple)
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown strategy '{0}' (expected simple, dual-language-positional or paragraph-by-paragraph)")]
pub struct ParseStrategyError(String);

impl FromStr for Strategy {
    type Err = ParseStrategyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('_', "-");
        match normalized.as_str() {
            "simple" | "simple-markdown" => Ok(Strategy::Simple),
            "dual-language-positional" | "dual-language" | "positional" => {
                Ok(Strategy::DualLanguagePositional)
            }
            "paragraph-by-paragraph" | "paragraph" => Ok(Strategy::ParagraphByParagraph),
            _ => Err(ParseStrategyError(s.to_string())),
        }
    }
}

/// Settings for one composition run.
///
/// # Example
///
/// ```
/// use diglot::{ComposeConfig, Strategy};
///
/// let config = ComposeConfig::new()
///     .with_strategy(Strategy::ParagraphByParagraph)
///     .with_strict_assets(true);
/// assert_eq!(config.header_separator, " / ");
/// ```
#[derive(Debug, Clone)]
pub struct ComposeConfig {
    pub strategy: Strategy,
    /// Joins primary and secondary text on combined header lines.
    pub header_separator: String,
    /// Appended to the header of a section with no counterpart.
    /// `{lang}` is replaced by the language code of the present side.
    pub unmatched_marker: String,
    /// Navigation label for an untitled preamble section.
    pub preamble_label: String,
    /// Treat unsupported or missing images as fatal errors.
    pub strict_assets: bool,
    /// Compression level for deflate (0-9, default 6).
    pub compression_level: Option<u32>,
    /// Replaces the built-in stylesheet.
    pub stylesheet: Option<String>,
}

impl Default for ComposeConfig {
    fn default() -> Self {
        Self {
            strategy: Strategy::default(),
            header_separator: " / ".to_string(),
            unmatched_marker: "({lang} only)".to_string(),
            preamble_label: "Introduction".to_string(),
            strict_assets: false,
            compression_level: None,
            stylesheet: None,
        }
    }
}

impl ComposeConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_header_separator(mut self, separator: impl Into<String>) -> Self {
        self.header_separator = separator.into();
        self
    }

    pub fn with_unmatched_marker(mut self, marker: impl Into<String>) -> Self {
        self.unmatched_marker = marker.into();
        self
    }

    pub fn with_preamble_label(mut self, label: impl Into<String>) -> Self {
        self.preamble_label = label.into();
        self
    }

    pub fn with_strict_assets(mut self, strict: bool) -> Self {
        self.strict_assets = strict;
        self
    }

    pub fn with_compression_level(mut self, level: u32) -> Self {
        self.compression_level = Some(level.min(9));
        self
    }

    pub fn with_stylesheet(mut self, css: impl Into<String>) -> Self {
        self.stylesheet = Some(css.into());
        self
    }

    /// The marker text for a section in `lang` with no counterpart.
    pub fn marker_for(&self, lang: &str) -> String {
        self.unmatched_marker.replace("{lang}", lang)
    }
}
