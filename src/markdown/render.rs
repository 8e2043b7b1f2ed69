//! Markdown to XHTML through `pulldown-cmark` events.
//!
//! Each body block is parsed on its own and written as an XHTML fragment.
//! Every text event passes through [`push_escaped`], so the output is
//! well-formed regardless of the input. Image `src` values are written as
//! they appear in the markdown; the asset resolver rewrites them later.
//!
//! Raw HTML and constructs without an XHTML mapping are reported as
//! [`RenderError`] so the caller can fall back to escaped text.

use std::sync::LazyLock;

use pulldown_cmark::{CodeBlockKind, CowStr, Event, Options, Parser, Tag};
use regex::Regex;
use thiserror::Error;

use super::blocks::is_figure;
use super::escape::push_escaped;

static URL_SCHEME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9+.\-]*:").expect("valid scheme pattern"));

/// Markdown that cannot be converted to XHTML.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    #[error("raw HTML is not supported: {0}")]
    RawHtml(String),

    #[error("unsupported markdown construct: {0}")]
    Unsupported(String),
}

/// Render one blank-line separated block to an XHTML fragment.
///
/// A block holding nothing but one image becomes a figure container.
///
/// # Example
///
/// ```
/// use diglot::markdown::render_block;
///
/// let html = render_block(&["Some *emphasis* & `code`"]).unwrap();
/// assert_eq!(html, "<p>Some <em>emphasis</em> &amp; <code>code</code></p>\n");
/// ```
pub fn render_block<S: AsRef<str>>(lines: &[S]) -> Result<String, RenderError> {
    let text = lines
        .iter()
        .map(|l| l.as_ref())
        .collect::<Vec<_>>()
        .join("\n");

    let mut writer = XhtmlWriter::new(text.len());
    writer.figure = is_figure(&text);
    writer.run(Parser::new_ext(&text, Options::ENABLE_STRIKETHROUGH))?;
    Ok(writer.out)
}

/// Render single-line inline markdown, such as a header title.
///
/// # Example
///
/// ```
/// use diglot::markdown::render_inline;
///
/// let html = render_inline("**Bold** & `code`").unwrap();
/// assert_eq!(html, "<strong>Bold</strong> &amp; <code>code</code>");
/// ```
pub fn render_inline(text: &str) -> Result<String, RenderError> {
    let source = inline_source(text);
    let mut writer = XhtmlWriter::new(text.len());
    writer.heading_markup = false;
    writer.run(Parser::new_ext(&source, Options::ENABLE_STRIKETHROUGH))?;
    Ok(writer.out)
}

/// Inline markdown reduced to its visible text.
///
/// Used for navigation labels and document titles, where markup is not
/// allowed. Image alt text counts as visible. Raw HTML is kept as literal
/// text, matching the escaped fallback used for headers.
pub fn plain_text(text: &str) -> String {
    let source = inline_source(text);
    let mut visible = String::with_capacity(text.len());
    for event in Parser::new_ext(&source, Options::ENABLE_STRIKETHROUGH) {
        match event {
            Event::Text(t) | Event::Code(t) | Event::InlineHtml(t) | Event::Html(t) => {
                visible.push_str(&t)
            }
            Event::SoftBreak | Event::HardBreak => visible.push(' '),
            _ => {}
        }
    }
    visible.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// The `<img>` element emitted for an image reference.
fn image_tag(out: &mut String, src: &str, alt: &str) {
    out.push_str("<img src=\"");
    push_escaped(out, src);
    out.push_str("\" alt=\"");
    push_escaped(out, alt);
    out.push_str("\"/>");
}

/// Wrap inline text in an ATX heading so no block syntax applies to it.
/// The trailing ` #` closes the heading, keeping a literal final `#`.
fn inline_source(text: &str) -> String {
    let line = text.replace(['\r', '\n'], " ");
    format!("# {line} #")
}

/// What an `End` event emits.
enum Close<'a> {
    Markup(&'static str),
    Owned(String),
    Image(CowStr<'a>),
    Nothing,
}

struct XhtmlWriter<'a> {
    out: String,
    stack: Vec<Close<'a>>,
    /// Alt text of the image being read, if any.
    alt: Option<String>,
    /// Render the next paragraph as a figure container.
    figure: bool,
    /// Emit `<hN>` for headings; off when rendering a header's content.
    heading_markup: bool,
}

impl<'a> XhtmlWriter<'a> {
    fn new(capacity: usize) -> Self {
        Self {
            out: String::with_capacity(capacity + capacity / 4),
            stack: Vec::new(),
            alt: None,
            figure: false,
            heading_markup: true,
        }
    }

    fn run<I: Iterator<Item = Event<'a>>>(&mut self, events: I) -> Result<(), RenderError> {
        for event in events {
            match event {
                Event::Start(tag) => self.start(tag)?,
                Event::End(_) => self.end(),
                Event::Text(text) => self.text(&text),
                Event::Code(code) => match self.alt.as_mut() {
                    Some(alt) => alt.push_str(&code),
                    None => {
                        self.out.push_str("<code>");
                        push_escaped(&mut self.out, &code);
                        self.out.push_str("</code>");
                    }
                },
                Event::SoftBreak => match self.alt.as_mut() {
                    Some(alt) => alt.push(' '),
                    None => self.out.push('\n'),
                },
                Event::HardBreak => match self.alt.as_mut() {
                    Some(alt) => alt.push(' '),
                    None => self.out.push_str("<br/>\n"),
                },
                Event::Rule => self.out.push_str("<hr/>\n"),
                Event::Html(html) | Event::InlineHtml(html) => {
                    return Err(RenderError::RawHtml(html.trim().to_string()));
                }
                other => return Err(RenderError::Unsupported(format!("{other:?}"))),
            }
        }
        Ok(())
    }

    fn text(&mut self, text: &str) {
        match self.alt.as_mut() {
            Some(alt) => alt.push_str(text),
            None => push_escaped(&mut self.out, text),
        }
    }

    fn start(&mut self, tag: Tag<'a>) -> Result<(), RenderError> {
        // Markup inside alt text is dropped
        if self.alt.is_some() {
            self.stack.push(Close::Nothing);
            return Ok(());
        }

        let close = match tag {
            Tag::Paragraph if std::mem::take(&mut self.figure) => {
                self.out.push_str("<div class=\"figure\">");
                Close::Markup("</div>\n")
            }
            Tag::Paragraph => {
                self.out.push_str("<p>");
                Close::Markup("</p>\n")
            }
            Tag::Heading { level, .. } if self.heading_markup => {
                let level = level as usize;
                self.out.push_str(&format!("<h{level}>"));
                Close::Owned(format!("</h{level}>\n"))
            }
            Tag::Heading { .. } => Close::Nothing,
            Tag::BlockQuote(_) => {
                self.out.push_str("<blockquote>\n");
                Close::Markup("</blockquote>\n")
            }
            Tag::CodeBlock(kind) => {
                self.out.push_str("<pre><code");
                if let CodeBlockKind::Fenced(info) = &kind
                    && let Some(language) = info.split_whitespace().next()
                {
                    self.out.push_str(" class=\"language-");
                    push_escaped(&mut self.out, language);
                    self.out.push('"');
                }
                self.out.push('>');
                Close::Markup("</code></pre>\n")
            }
            Tag::List(Some(start)) => {
                if start == 1 {
                    self.out.push_str("<ol>\n");
                } else {
                    self.out.push_str(&format!("<ol start=\"{start}\">\n"));
                }
                Close::Markup("</ol>\n")
            }
            Tag::List(None) => {
                self.out.push_str("<ul>\n");
                Close::Markup("</ul>\n")
            }
            Tag::Item => {
                self.out.push_str("<li>");
                Close::Markup("</li>\n")
            }
            Tag::Emphasis => {
                self.out.push_str("<em>");
                Close::Markup("</em>")
            }
            Tag::Strong => {
                self.out.push_str("<strong>");
                Close::Markup("</strong>")
            }
            Tag::Strikethrough => {
                self.out.push_str("<del>");
                Close::Markup("</del>")
            }
            Tag::Link { dest_url, .. } if URL_SCHEME.is_match(&dest_url) => {
                self.out.push_str("<a href=\"");
                push_escaped(&mut self.out, &dest_url);
                self.out.push_str("\">");
                Close::Markup("</a>")
            }
            // Other documents are renamed inside the package
            Tag::Link { .. } => Close::Nothing,
            Tag::Image { dest_url, .. } => {
                self.alt = Some(String::new());
                Close::Image(dest_url)
            }
            Tag::HtmlBlock => return Err(RenderError::RawHtml("HTML block".to_string())),
            other => return Err(RenderError::Unsupported(format!("{other:?}"))),
        };
        self.stack.push(close);
        Ok(())
    }

    fn end(&mut self) {
        match self.stack.pop() {
            Some(Close::Markup(markup)) => self.out.push_str(markup),
            Some(Close::Owned(markup)) => self.out.push_str(&markup),
            Some(Close::Image(src)) => {
                let alt = self.alt.take().unwrap_or_default();
                image_tag(&mut self.out, &src, &alt);
            }
            Some(Close::Nothing) | None => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    fn block(text: &str) -> String {
        let lines: Vec<&str> = text.lines().collect();
        render_block(&lines).unwrap()
    }

    #[test]
    fn test_text_is_escaped() {
        assert_eq!(
            render_inline("a < b & \"c\"").unwrap(),
            "a &lt; b &amp; &quot;c&quot;"
        );
    }

    #[test]
    fn test_emphasis() {
        assert_eq!(render_inline("*em*").unwrap(), "<em>em</em>");
        assert_eq!(render_inline("_em_").unwrap(), "<em>em</em>");
        assert_eq!(render_inline("**strong**").unwrap(), "<strong>strong</strong>");
        assert_eq!(
            render_inline("*a **b** c*").unwrap(),
            "<em>a <strong>b</strong> c</em>"
        );
        assert_eq!(render_inline("~~gone~~").unwrap(), "<del>gone</del>");
    }

    #[test]
    fn test_unclosed_delimiters_are_literal() {
        assert_eq!(render_inline("use *args freely").unwrap(), "use *args freely");
        assert_eq!(render_inline("5 * 3 = 15").unwrap(), "5 * 3 = 15");
        assert_eq!(render_inline("snake_case_name").unwrap(), "snake_case_name");
        assert_eq!(render_inline(r"\*not em\*").unwrap(), "*not em*");
        assert_eq!(render_inline("`open").unwrap(), "`open");
    }

    #[test]
    fn test_many_unclosed_openers_render_quickly() {
        let text = "*a _b ".repeat(1000);
        let start = Instant::now();
        let html = render_block(&[text.as_str()]).unwrap();
        assert!(start.elapsed() < Duration::from_secs(2));
        assert_eq!(html.matches('*').count(), 1000);
        assert!(!html.contains("<em>"));
    }

    #[test]
    fn test_inline_keeps_block_syntax_literal() {
        assert_eq!(render_inline("1. Introduction").unwrap(), "1. Introduction");
        assert_eq!(render_inline("- dash").unwrap(), "- dash");
        assert_eq!(render_inline("Issue #").unwrap(), "Issue #");
    }

    #[test]
    fn test_code_spans() {
        assert_eq!(
            render_inline("run `a < b`").unwrap(),
            "run <code>a &lt; b</code>"
        );
        assert_eq!(render_inline("`*not em*`").unwrap(), "<code>*not em*</code>");
    }

    #[test]
    fn test_links() {
        assert_eq!(
            render_inline("[site](https://example.com)").unwrap(),
            "<a href=\"https://example.com\">site</a>"
        );
        assert_eq!(
            render_inline("see [*next*](chapter2.md)").unwrap(),
            "see <em>next</em>"
        );
    }

    #[test]
    fn test_images() {
        assert_eq!(
            render_inline("![fig](images/fig1.png)").unwrap(),
            "<img src=\"images/fig1.png\" alt=\"fig\"/>"
        );
        assert_eq!(
            render_inline("![a *\"q\"*](x.jpg \"Title\")").unwrap(),
            "<img src=\"x.jpg\" alt=\"a &quot;q&quot;\"/>"
        );
    }

    #[test]
    fn test_raw_html_is_error() {
        assert_eq!(
            render_block(&["a <b>bold</b> word"]),
            Err(RenderError::RawHtml("<b>".to_string()))
        );
        assert!(matches!(
            render_block(&["<div>", "block", "</div>"]),
            Err(RenderError::RawHtml(_))
        ));
    }

    #[test]
    fn test_paragraph_and_breaks() {
        assert_eq!(block("one  \ntwo"), "<p>one<br/>\ntwo</p>\n");
        assert_eq!(block("one\ntwo"), "<p>one\ntwo</p>\n");
    }

    #[test]
    fn test_lists() {
        assert_eq!(block("- a\n- *b*"), "<ul>\n<li>a</li>\n<li><em>b</em></li>\n</ul>\n");
        assert_eq!(
            block("3. three\n4. four"),
            "<ol start=\"3\">\n<li>three</li>\n<li>four</li>\n</ol>\n"
        );
    }

    #[test]
    fn test_code_blocks() {
        assert_eq!(
            block("```rust\nif a < b {}\n```"),
            "<pre><code class=\"language-rust\">if a &lt; b {}\n</code></pre>\n"
        );
        assert_eq!(block("    let x = 1;"), "<pre><code>let x = 1;\n</code></pre>\n");
    }

    #[test]
    fn test_quote_and_rule() {
        assert_eq!(block("> quoted"), "<blockquote>\n<p>quoted</p>\n</blockquote>\n");
        assert_eq!(block("---"), "<hr/>\n");
        assert_eq!(block("* * *"), "<hr/>\n");
    }

    #[test]
    fn test_figure() {
        assert_eq!(
            block("![fig](images/fig1.png)"),
            "<div class=\"figure\"><img src=\"images/fig1.png\" alt=\"fig\"/></div>\n"
        );
        assert_eq!(
            block("See ![fig](a.png) here"),
            "<p>See <img src=\"a.png\" alt=\"fig\"/> here</p>\n"
        );
    }

    #[test]
    fn test_forbidden_characters_removed() {
        let html = block("Page one\u{c}page two\u{1}");
        assert_eq!(html, "<p>Page one page two</p>\n");
        let code = block("```\nnul\u{8}byte\n```");
        assert!(!code.contains('\u{8}'));
    }

    #[test]
    fn test_plain_text() {
        assert_eq!(plain_text("Chapter *One* & `Two`"), "Chapter One & Two");
        assert_eq!(plain_text("Broken *emphasis"), "Broken *emphasis");
        assert_eq!(plain_text("Giới thiệu"), "Giới thiệu");
        assert_eq!(plain_text("[](other.md)"), "");
        assert_eq!(plain_text("![](cover.png)"), "");
        assert_eq!(plain_text("Symbols & <Tags>"), "Symbols & <Tags>");
    }
}
