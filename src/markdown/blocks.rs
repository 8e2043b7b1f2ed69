//! Block-level structure of section bodies.
//!
//! Blocks are separated by blank lines. A closed fenced code block always
//! forms a block of its own, including any blank lines inside it.

use std::sync::LazyLock;

use regex::Regex;

use super::fence::{FenceRole, fence_roles};

static IMAGE_REF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"!\[[^\]]*\]\([^)\s]+").expect("valid image pattern"));

static IMAGE_ONLY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^!\[[^\]]*\]\([^)\s]+(?:\s+"[^"]*")?\)$"#).expect("valid figure pattern")
});

/// Split body lines into blank-line separated blocks.
pub fn split_blocks<S: AsRef<str>>(lines: &[S]) -> Vec<Vec<String>> {
    let roles = fence_roles(lines);
    let mut blocks = Vec::new();
    let mut current: Vec<String> = Vec::new();

    for (line, role) in lines.iter().zip(roles) {
        let line = line.as_ref();
        match role {
            FenceRole::Open => {
                flush(&mut blocks, &mut current);
                current.push(line.to_string());
            }
            FenceRole::Inside => current.push(line.to_string()),
            FenceRole::Close => {
                current.push(line.to_string());
                flush(&mut blocks, &mut current);
            }
            FenceRole::Outside if line.trim().is_empty() => flush(&mut blocks, &mut current),
            FenceRole::Outside => current.push(line.to_string()),
        }
    }
    flush(&mut blocks, &mut current);

    blocks
}

fn flush(blocks: &mut Vec<Vec<String>>, current: &mut Vec<String>) {
    if !current.is_empty() {
        blocks.push(std::mem::take(current));
    }
}

/// Whether any line of the block references an image.
pub fn contains_image<S: AsRef<str>>(lines: &[S]) -> bool {
    lines.iter().any(|line| IMAGE_REF.is_match(line.as_ref()))
}

/// Whether a block is nothing but a single image reference.
pub fn is_figure(text: &str) -> bool {
    IMAGE_ONLY.is_match(text.trim())
}
