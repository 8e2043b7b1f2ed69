//! Splits a markdown document into flat, header-delimited sections.
//!
//! Only ATX headers (`#` to `######` followed by a space) are recognized.
//! Everything else is copied into the current section's body untouched;
//! no markdown semantics are interpreted here beyond header detection and
//! skipping lines inside closed code fences.

use std::sync::LazyLock;

use regex::Regex;

use crate::model::{Document, Section};

use super::fence::fence_roles;

static ATX_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^ {0,3}(#{1,6})[ \t]+(.*?)(?:[ \t]+#+)?[ \t]*$").expect("valid header pattern")
});

/// Header level and title of an ATX header line.
pub fn parse_header(line: &str) -> Option<(u8, &str)> {
    let caps = ATX_HEADER.captures(line)?;
    let level = caps.get(1)?.as_str().len() as u8;
    let title = caps.get(2).map_or("", |m| m.as_str());
    Some((level, title.trim()))
}

/// Parse markdown text into a [`Document`].
///
/// Text before the first header becomes a level-0 section unless it is
/// blank. Whitespace-only input produces an empty document; any other input
/// without headers produces exactly one level-0 section. Never fails.
///
/// # Example
///
/// ```
/// use diglot::markdown::parse_sections;
///
/// let doc = parse_sections("Preface\n\n# Intro\nHello\n## Part\nWorld\n");
/// assert_eq!(doc.len(), 3);
/// assert_eq!(doc.sections[0].level, 0);
/// assert_eq!(doc.sections[1].title, "Intro");
/// assert_eq!(doc.sections[2].level, 2);
/// ```
pub fn parse_sections(text: &str) -> Document {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    if text.trim().is_empty() {
        return Document::default();
    }

    let lines: Vec<&str> = text.lines().collect();
    let roles = fence_roles(&lines);

    let mut sections = Vec::new();
    let mut current = Section {
        level: 0,
        title: String::new(),
        body: Vec::new(),
        source_index: 0,
    };

    for (line, role) in lines.iter().zip(&roles) {
        let header = if role.is_fenced() {
            None
        } else {
            parse_header(line)
        };

        match header {
            Some((level, title)) => {
                let finished = std::mem::replace(
                    &mut current,
                    Section {
                        level,
                        title: title.to_string(),
                        body: Vec::new(),
                        source_index: 0,
                    },
                );
                push_section(&mut sections, finished);
            }
            None => current.body.push((*line).to_string()),
        }
    }
    push_section(&mut sections, current);

    log::debug!("parsed {} sections from {} lines", sections.len(), lines.len());
    Document { sections }
}

/// Append a finished section, dropping a blank preamble and assigning the
/// next source index.
fn push_section(sections: &mut Vec<Section>, mut section: Section) {
    if section.is_preamble() && section.is_body_blank() {
        return;
    }
    section.source_index = sections.len();
    sections.push(section);
}
