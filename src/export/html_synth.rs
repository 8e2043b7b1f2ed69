//! HTML Synthesizer - converts merged sections to XHTML.
//!
//! Each merged section becomes one chapter fragment. Runs of consecutive
//! blocks from the same language are wrapped in a container carrying the
//! side's class and language, so the stylesheet can present the two texts
//! distinctly:
//!
//! ```text
//! <h2><span class="primary" ...>Chapter 1</span> / <span class="secondary" ...>Chương 1</span></h2>
//! <div class="primary" lang="en" xml:lang="en"><p>...</p></div>
//! <div class="secondary" lang="vi" xml:lang="vi"><p>...</p></div>
//! ```
//!
//! Image `src` attributes are left exactly as written in the markdown; the
//! asset resolver rewrites them afterwards.

use crate::markdown::{escape_xml, plain_text, push_escaped, render_block, render_inline};
use crate::model::{Diagnostic, HeaderLine, MergedSection, Side};

/// Language codes used for `lang` attributes.
#[derive(Debug, Clone, Copy)]
pub struct RenderContext<'a> {
    pub primary_lang: &'a str,
    pub secondary_lang: &'a str,
}

impl<'a> RenderContext<'a> {
    pub fn new(primary_lang: &'a str, secondary_lang: &'a str) -> Self {
        Self {
            primary_lang,
            secondary_lang,
        }
    }

    fn lang(&self, side: Side) -> &'a str {
        match side {
            Side::Primary => self.primary_lang,
            Side::Secondary => self.secondary_lang,
        }
    }

    /// ` class=".." lang=".." xml:lang=".."` for `side`.
    fn side_attrs(&self, out: &mut String, side: Side) {
        let lang = self.lang(side);
        out.push_str(" class=\"");
        out.push_str(side.class_name());
        out.push_str("\" lang=\"");
        push_escaped(out, lang);
        out.push_str("\" xml:lang=\"");
        push_escaped(out, lang);
        out.push('"');
    }
}

/// A rendered chapter body, before asset resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedChapter {
    /// Index of the aligned pair this chapter came from.
    pub pair_index: usize,
    /// Plain-text navigation label.
    pub title: String,
    /// Well-formed XHTML fragment.
    pub body: String,
}

/// Render a merged section to an XHTML fragment.
///
/// Blocks whose inline markup cannot be converted are emitted as escaped
/// plain text and reported through `diagnostics`.
pub fn render_section(
    section: &MergedSection,
    ctx: &RenderContext<'_>,
    diagnostics: &mut Vec<Diagnostic>,
) -> RenderedChapter {
    let chapter = section.source_pair_index;
    let mut out = String::new();

    for line in &section.header_lines {
        render_header(&mut out, line, ctx, chapter, diagnostics);
    }

    let mut open: Option<Side> = None;
    for block in &section.body_blocks {
        if open != Some(block.side) {
            if open.is_some() {
                out.push_str("</div>\n");
            }
            out.push_str("<div");
            ctx.side_attrs(&mut out, block.side);
            out.push_str(">\n");
            open = Some(block.side);
        }

        match render_block(&block.lines) {
            Ok(html) => out.push_str(&html),
            Err(err) => {
                log::warn!("chapter {chapter}: {err}, rendering block as plain text");
                diagnostics.push(Diagnostic::RenderFallback {
                    chapter,
                    reason: err.to_string(),
                });
                out.push_str("<p>");
                push_escaped(&mut out, &block.lines.join("\n"));
                out.push_str("</p>\n");
            }
        }
    }
    if open.is_some() {
        out.push_str("</div>\n");
    }

    RenderedChapter {
        pair_index: chapter,
        title: plain_text(&section.nav_label),
        body: out,
    }
}

fn render_header(
    out: &mut String,
    line: &HeaderLine,
    ctx: &RenderContext<'_>,
    chapter: usize,
    diagnostics: &mut Vec<Diagnostic>,
) {
    let level = line.level.clamp(1, 6);
    out.push_str(&format!("<h{level}"));

    match line.side() {
        Some(side) => {
            ctx.side_attrs(out, side);
            out.push('>');
            inline_or_escaped(out, &line.text(), chapter, diagnostics);
        }
        None => {
            out.push('>');
            for (i, segment) in line.segments.iter().enumerate() {
                if i > 0 {
                    push_escaped(out, &line.separator);
                }
                out.push_str("<span");
                ctx.side_attrs(out, segment.side);
                out.push('>');
                inline_or_escaped(out, &segment.text, chapter, diagnostics);
                out.push_str("</span>");
            }
        }
    }

    out.push_str(&format!("</h{level}>\n"));
}

fn inline_or_escaped(
    out: &mut String,
    text: &str,
    chapter: usize,
    diagnostics: &mut Vec<Diagnostic>,
) {
    match render_inline(text) {
        Ok(html) => out.push_str(&html),
        Err(err) => {
            diagnostics.push(Diagnostic::RenderFallback {
                chapter,
                reason: err.to_string(),
            });
            push_escaped(out, text);
        }
    }
}

/// Wrap a chapter fragment in a complete EPUB3 XHTML content document.
pub fn xhtml_document(
    fragment: &str,
    title: &str,
    lang: &str,
    stylesheet_href: Option<&str>,
) -> String {
    let lang = escape_xml(lang);
    let mut doc = String::with_capacity(fragment.len() + 512);

    doc.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<!DOCTYPE html>\n");
    doc.push_str(&format!(
        "<html xmlns=\"http://www.w3.org/1999/xhtml\" xmlns:epub=\"http://www.idpf.org/2007/ops\" lang=\"{lang}\" xml:lang=\"{lang}\">\n"
    ));
    doc.push_str("<head>\n  <meta charset=\"UTF-8\"/>\n  <title>");
    push_escaped(&mut doc, title);
    doc.push_str("</title>\n");
    if let Some(href) = stylesheet_href {
        doc.push_str("  <link rel=\"stylesheet\" type=\"text/css\" href=\"");
        push_escaped(&mut doc, href);
        doc.push_str("\"/>\n");
    }
    doc.push_str("</head>\n<body>\n<section class=\"chapter\" epub:type=\"chapter\">\n");
    doc.push_str(fragment);
    doc.push_str("</section>\n</body>\n</html>\n");

    doc
}
