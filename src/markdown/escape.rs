//! XML escaping for text and attribute content.
//!
//! Everything the renderer emits passes through these functions, so the
//! five reserved characters never reach a content document unescaped and
//! characters outside the XML `Char` production never reach it at all.

/// Whether XML 1.0 allows `c` in a document.
#[inline]
pub fn is_xml_char(c: char) -> bool {
    matches!(c,
        '\t' | '\n' | '\r'
        | '\u{20}'..='\u{D7FF}'
        | '\u{E000}'..='\u{FFFD}'
        | '\u{10000}'..='\u{10FFFF}')
}

/// Append `c` to `out`, escaped for XML text or attribute content.
///
/// Vertical tab and form feed become a space; other characters XML does
/// not allow are dropped.
#[inline]
pub fn push_escaped_char(out: &mut String, c: char) {
    match c {
        '&' => out.push_str("&amp;"),
        '<' => out.push_str("&lt;"),
        '>' => out.push_str("&gt;"),
        '"' => out.push_str("&quot;"),
        '\'' => out.push_str("&#39;"),
        '\u{b}' | '\u{c}' => out.push(' '),
        c if !is_xml_char(c) => {}
        _ => out.push(c),
    }
}

/// Append `s` to `out`, escaped for XML text or attribute content.
pub fn push_escaped(out: &mut String, s: &str) {
    out.reserve(s.len());
    for c in s.chars() {
        push_escaped_char(out, c);
    }
}

/// Escape XML special characters.
///
/// # Examples
///
/// ```
/// use diglot::markdown::escape_xml;
///
/// assert_eq!(escape_xml("Tom & \"Jerry\""), "Tom &amp; &quot;Jerry&quot;");
/// ```
pub fn escape_xml(s: &str) -> String {
    let mut result = String::with_capacity(s.len() + s.len() / 10);
    push_escaped(&mut result, s);
    result
}
