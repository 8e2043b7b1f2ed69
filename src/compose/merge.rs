//! Merging one aligned pair into a single dual-language section.

use crate::config::{ComposeConfig, Strategy};
use crate::markdown::{contains_image, plain_text, split_blocks};
use crate::model::{
    AlignedPair, BodyBlock, HeaderLine, HeaderSegment, MergedSection, Metadata, Section, Side,
};

/// Language codes and header settings shared by every merge of one book.
#[derive(Debug, Clone)]
pub struct MergeContext<'a> {
    pub primary_lang: &'a str,
    pub secondary_lang: &'a str,
    pub separator: &'a str,
    pub unmatched_marker: &'a str,
    pub preamble_label: &'a str,
}

impl<'a> MergeContext<'a> {
    pub fn new(config: &'a ComposeConfig, metadata: &'a Metadata) -> Self {
        Self {
            primary_lang: metadata.primary_lang(),
            secondary_lang: metadata.secondary_lang(),
            separator: &config.header_separator,
            unmatched_marker: &config.unmatched_marker,
            preamble_label: &config.preamble_label,
        }
    }

    fn lang(&self, side: Side) -> &'a str {
        match side {
            Side::Primary => self.primary_lang,
            Side::Secondary => self.secondary_lang,
        }
    }

    fn marker(&self, side: Side) -> String {
        self.unmatched_marker.replace("{lang}", self.lang(side))
    }
}

/// Merge the pair at `index` into a [`MergedSection`].
///
/// A matched pair where either side is a level-1 header keeps one header
/// line per language; deeper levels share one combined line. An unmatched
/// pair passes its single side through with a language marker appended to
/// the header. Body blocks are ordered according to `strategy`.
///
/// # Example
///
/// ```
/// use diglot::compose::{MergeContext, align, merge};
/// use diglot::markdown::parse_sections;
/// use diglot::{ComposeConfig, Metadata, Strategy};
///
/// let config = ComposeConfig::default();
/// let metadata = Metadata::new("Book").with_language("en").with_secondary_language("vi");
/// let ctx = MergeContext::new(&config, &metadata);
///
/// let pairs = align(
///     &parse_sections("## Chapter 1\nHello"),
///     &parse_sections("## Chương 1\nXin chào"),
/// );
/// let merged = merge(&pairs[0], 0, Strategy::DualLanguagePositional, &ctx);
/// assert_eq!(merged.header_lines[0].text(), "Chapter 1 / Chương 1");
/// assert_eq!(merged.body_blocks.len(), 2);
/// ```
pub fn merge(
    pair: &AlignedPair,
    index: usize,
    strategy: Strategy,
    ctx: &MergeContext<'_>,
) -> MergedSection {
    match (&pair.primary, &pair.secondary) {
        (Some(primary), Some(secondary)) if strategy.is_bilingual() => {
            merge_matched(primary, secondary, index, strategy, ctx)
        }
        (Some(primary), _) => pass_through(Side::Primary, primary, index, strategy, ctx),
        (None, Some(secondary)) => {
            pass_through(Side::Secondary, secondary, index, strategy, ctx)
        }
        (None, None) => MergedSection {
            header_lines: Vec::new(),
            body_blocks: Vec::new(),
            source_pair_index: index,
            nav_label: ctx.preamble_label.to_string(),
        },
    }
}

fn merge_matched(
    primary: &Section,
    secondary: &Section,
    index: usize,
    strategy: Strategy,
    ctx: &MergeContext<'_>,
) -> MergedSection {
    let titled: Vec<(Side, &Section)> = [(Side::Primary, primary), (Side::Secondary, secondary)]
        .into_iter()
        .filter(|(_, section)| !section.title.is_empty())
        .collect();

    let header_lines = if primary.level == 1 || secondary.level == 1 {
        titled
            .iter()
            .map(|&(side, section)| HeaderLine::single(section.level, side, &section.title))
            .collect()
    } else if let Some(&(_, first)) = titled.first() {
        // The primary level wins unless only the secondary side has a title
        let level = if primary.title.is_empty() {
            first.level
        } else {
            primary.level
        };
        vec![HeaderLine {
            level,
            segments: titled
                .iter()
                .map(|&(side, section)| HeaderSegment {
                    side,
                    text: section.title.clone(),
                })
                .collect(),
            separator: ctx.separator.to_string(),
        }]
    } else {
        Vec::new()
    };

    // A title with no visible text, such as a bare image, cannot label a
    // navigation entry
    let nav_label = titled
        .iter()
        .map(|(_, s)| &s.title)
        .find(|title| !plain_text(title).is_empty())
        .map_or_else(|| ctx.preamble_label.to_string(), Clone::clone);

    let primary_blocks = split_blocks(&primary.body);
    let secondary_blocks = split_blocks(&secondary.body);
    let body_blocks = match strategy {
        Strategy::ParagraphByParagraph => interleave(primary_blocks, secondary_blocks),
        _ => primary_blocks
            .into_iter()
            .map(|lines| BodyBlock::new(Side::Primary, lines))
            .chain(
                secondary_blocks
                    .into_iter()
                    .map(|lines| BodyBlock::new(Side::Secondary, lines)),
            )
            .collect(),
    };

    MergedSection {
        header_lines,
        body_blocks,
        source_pair_index: index,
        nav_label,
    }
}

/// Blocks alternate primary then secondary at each index. A figure is kept
/// once, from the primary side when it has one.
fn interleave(primary: Vec<Vec<String>>, secondary: Vec<Vec<String>>) -> Vec<BodyBlock> {
    let count = primary.len().max(secondary.len());
    let mut primary = primary.into_iter();
    let mut secondary = secondary.into_iter();
    let mut blocks = Vec::with_capacity(count * 2);

    for _ in 0..count {
        match (primary.next(), secondary.next()) {
            (Some(p), Some(s)) => {
                if contains_image(&p) || contains_image(&s) {
                    blocks.push(BodyBlock::new(Side::Primary, p));
                } else {
                    blocks.push(BodyBlock::new(Side::Primary, p));
                    blocks.push(BodyBlock::new(Side::Secondary, s));
                }
            }
            (Some(p), None) => blocks.push(BodyBlock::new(Side::Primary, p)),
            (None, Some(s)) => blocks.push(BodyBlock::new(Side::Secondary, s)),
            (None, None) => break,
        }
    }

    blocks
}

fn pass_through(
    side: Side,
    section: &Section,
    index: usize,
    strategy: Strategy,
    ctx: &MergeContext<'_>,
) -> MergedSection {
    let (header_lines, nav_label) = if section.title.is_empty() {
        (Vec::new(), ctx.preamble_label.to_string())
    } else {
        let text = if strategy.is_bilingual() {
            format!("{} {}", section.title, ctx.marker(side))
        } else {
            section.title.clone()
        };
        let nav_label = if plain_text(&text).is_empty() {
            ctx.preamble_label.to_string()
        } else {
            text.clone()
        };
        (
            vec![HeaderLine::single(section.level, side, text)],
            nav_label,
        )
    };

    MergedSection {
        header_lines,
        body_blocks: split_blocks(&section.body)
            .into_iter()
            .map(|lines| BodyBlock::new(side, lines))
            .collect(),
        source_pair_index: index,
        nav_label,
    }
}
