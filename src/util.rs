//! Text decoding and identifier helpers.

use std::borrow::Cow;

use crate::model::Metadata;

/// Decode bytes to a string, handling legacy encodings.
///
/// This function:
/// 1. First tries UTF-8 (handles BOM automatically via encoding_rs)
/// 2. If malformed, tries the hint encoding
/// 3. Falls back to Windows-1252, which is what hand-edited markdown saved
///    by older Windows editors usually is
///
/// Uses `Cow<str>` to avoid allocation when the input is valid UTF-8.
///
/// # Examples
///
/// ```
/// use diglot::util::decode_text;
///
/// assert_eq!(decode_text("Xin chào".as_bytes(), None), "Xin chào");
/// assert_eq!(decode_text(b"caf\xe9", None), "café");
/// ```
pub fn decode_text<'a>(bytes: &'a [u8], hint_encoding: Option<&str>) -> Cow<'a, str> {
    let (result, _encoding, malformed) = encoding_rs::UTF_8.decode(bytes);

    if !malformed {
        return result;
    }

    if let Some(name) = hint_encoding
        && let Some(encoding) = encoding_rs::Encoding::for_label(name.as_bytes())
    {
        log::debug!("input is not UTF-8, decoding as {}", encoding.name());
        let (result, _, _) = encoding.decode(bytes);
        return result;
    }

    log::debug!("input is not UTF-8, decoding as windows-1252");
    let (result, _, _) = encoding_rs::WINDOWS_1252.decode(bytes);
    result
}

/// A `urn:uuid:` identifier derived from the book's title, authors and
/// languages.
///
/// The digest is laid out as a name-based (version 5) UUID so identical
/// metadata always yields the same package identifier.
pub fn stable_identifier(metadata: &Metadata) -> String {
    let mut hasher = sha1_smol::Sha1::new();
    hasher.update(metadata.title.as_bytes());
    for author in &metadata.authors {
        hasher.update(b"\x1f");
        hasher.update(author.as_bytes());
    }
    hasher.update(b"\x1e");
    hasher.update(metadata.primary_lang().as_bytes());
    hasher.update(b"\x1e");
    hasher.update(metadata.secondary_lang().as_bytes());

    let digest = hasher.digest().bytes();
    let mut b = [0u8; 16];
    b.copy_from_slice(&digest[..16]);
    b[6] = (b[6] & 0x0f) | 0x50;
    b[8] = (b[8] & 0x3f) | 0x80;

    format!(
        "urn:uuid:{:02x}{:02x}{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}{:02x}{:02x}{:02x}{:02x}",
        b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7], b[8], b[9], b[10], b[11], b[12], b[13], b[14], b[15]
    )
}
