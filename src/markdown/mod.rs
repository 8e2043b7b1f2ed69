//! Markdown handling for section bodies and headers.
//!
//! The design separates section splitting from rendering:
//!
//! - [`parser`]: Splits a document into flat, header-delimited sections
//! - [`blocks`]: Blank-line block splitting and image detection
//! - `render`: Markdown to XHTML driven by `pulldown-cmark` events
//! - `escape`: XML escaping shared by every renderer
//!
//! Closed code fences are recognized everywhere, so a `#` line inside a
//! fenced block never starts a section and blank lines inside one never
//! split a block.

mod escape;
mod fence;
mod render;

pub mod blocks;
pub mod parser;

pub use blocks::{contains_image, is_figure, split_blocks};
pub use escape::{escape_xml, is_xml_char, push_escaped};
pub use parser::{parse_header, parse_sections};
pub use render::{RenderError, plain_text, render_block, render_inline};
