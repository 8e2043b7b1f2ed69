//! Fenced code block detection shared by the section parser and block splitter.
//!
//! Only *closed* fences count. An opening fence with no matching closing
//! fence is ordinary text, so a single stray fence cannot swallow the rest
//! of a document.

/// Role of a line with respect to fenced code blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FenceRole {
    Outside,
    Open,
    Inside,
    Close,
}

impl FenceRole {
    pub(crate) fn is_fenced(self) -> bool {
        !matches!(self, FenceRole::Outside)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Fence {
    pub ch: char,
    pub len: usize,
}

/// Parse an opening fence (three or more backticks or tildes, indented at
/// most three spaces).
pub(crate) fn fence_marker(line: &str) -> Option<Fence> {
    let rest = line.trim_start_matches(' ');
    if line.len() - rest.len() > 3 {
        return None;
    }

    let ch = rest.chars().next()?;
    if ch != '`' && ch != '~' {
        return None;
    }

    let len = rest.bytes().take_while(|&b| b == ch as u8).count();
    if len < 3 {
        return None;
    }

    // Backtick info strings may not contain backticks
    if ch == '`' && rest[len..].contains('`') {
        return None;
    }

    Some(Fence { ch, len })
}

/// Whether `line` closes a block opened by `open`.
fn closes(open: Fence, line: &str) -> bool {
    let rest = line.trim_start_matches(' ');
    if line.len() - rest.len() > 3 {
        return false;
    }
    let run = rest.trim_end();
    run.len() >= open.len && run.bytes().all(|b| b == open.ch as u8)
}

/// Classify every line as outside, opening, inside or closing a fenced block.
pub(crate) fn fence_roles<S: AsRef<str>>(lines: &[S]) -> Vec<FenceRole> {
    let mut roles = vec![FenceRole::Outside; lines.len()];
    let mut i = 0;

    while i < lines.len() {
        if let Some(open) = fence_marker(lines[i].as_ref())
            && let Some(offset) = lines[i + 1..]
                .iter()
                .position(|line| closes(open, line.as_ref()))
        {
            let close = i + 1 + offset;
            roles[i] = FenceRole::Open;
            for role in &mut roles[i + 1..close] {
                *role = FenceRole::Inside;
            }
            roles[close] = FenceRole::Close;
            i = close + 1;
            continue;
        }
        i += 1;
    }

    roles
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fence_marker() {
        assert_eq!(fence_marker("```"), Some(Fence { ch: '`', len: 3 }));
        assert_eq!(fence_marker("~~~~ rust"), Some(Fence { ch: '~', len: 4 }));
        assert_eq!(fence_marker("   ```python"), Some(Fence { ch: '`', len: 3 }));
        assert_eq!(fence_marker("    ```"), None);
        assert_eq!(fence_marker("``"), None);
        assert_eq!(fence_marker("``` a`b"), None);
        assert_eq!(fence_marker("text"), None);
    }

    #[test]
    fn test_closed_fence_roles() {
        let lines = ["intro", "```", "# not a header", "```", "after"];
        assert_eq!(
            fence_roles(&lines),
            vec![
                FenceRole::Outside,
                FenceRole::Open,
                FenceRole::Inside,
                FenceRole::Close,
                FenceRole::Outside,
            ]
        );
    }

    #[test]
    fn test_unterminated_fence_is_plain_text() {
        let lines = ["```", "# Header", "text"];
        assert!(fence_roles(&lines).iter().all(|r| !r.is_fenced()));
    }

    #[test]
    fn test_closing_fence_must_match_char_and_length() {
        let lines = ["````", "```", "~~~~", "````"];
        assert_eq!(
            fence_roles(&lines),
            vec![
                FenceRole::Open,
                FenceRole::Inside,
                FenceRole::Inside,
                FenceRole::Close,
            ]
        );
    }
}
