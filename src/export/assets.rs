//! Image discovery and bundling.
//!
//! Rendered chapters reference images exactly as written in the markdown.
//! This pass finds every `<img>` element, loads each distinct reference
//! once from the image root, assigns it a package id and rewrites `src` to
//! the file's location inside the package. Images that cannot be bundled
//! are removed from the chapter and reported as diagnostics, or abort the
//! book when strict asset handling is requested.

use std::borrow::Cow;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::sync::LazyLock;

use percent_encoding::{AsciiSet, CONTROLS, percent_decode_str, utf8_percent_encode};
use regex::Regex;

use crate::error::{Error, Result};
use crate::markdown::push_escaped;
use crate::model::Diagnostic;

use super::html_synth::RenderedChapter;

static IMG_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<img src="([^"]*)" alt="([^"]*)"/>"#).expect("valid img pattern")
});

static URL_SCHEME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9+.\-]*:").expect("valid scheme pattern"));

/// Characters escaped in package hrefs.
const HREF_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'\\')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// An image bundled into the package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageAsset {
    /// The reference as written in the markdown.
    pub original_ref: String,
    /// Location of the file on disk.
    pub resolved_path: PathBuf,
    /// Manifest id (`img_{n}`).
    pub package_id: String,
    /// Package-relative href, percent-encoded.
    pub href: String,
    /// File name inside the package's `images/` directory.
    pub file_name: String,
    pub media_type: &'static str,
    pub data: Vec<u8>,
}

/// Chapters with rewritten image references plus the bundled assets.
#[derive(Debug, Clone)]
pub struct Resolution {
    pub chapters: Vec<RenderedChapter>,
    /// Assets in order of first appearance.
    pub assets: Vec<ImageAsset>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Resolve every image referenced by `chapters` against `image_root`.
///
/// With `strict_assets` set, the first image that cannot be bundled is
/// returned as an error instead of a diagnostic.
pub fn resolve_assets(
    chapters: Vec<RenderedChapter>,
    image_root: &Path,
    strict_assets: bool,
) -> Result<Resolution> {
    let mut resolver = AssetResolver {
        root: image_root,
        strict: strict_assets,
        assets: Vec::new(),
        seen: HashMap::new(),
        file_names: HashSet::new(),
        diagnostics: Vec::new(),
    };

    let mut resolved = Vec::with_capacity(chapters.len());
    for mut chapter in chapters {
        chapter.body = resolver.rewrite(&chapter.body, chapter.pair_index)?;
        resolved.push(chapter);
    }

    log::debug!(
        "resolved {} images, {} skipped",
        resolver.assets.len(),
        resolver.diagnostics.len()
    );
    Ok(Resolution {
        chapters: resolved,
        assets: resolver.assets,
        diagnostics: resolver.diagnostics,
    })
}

/// Media type for a supported image extension.
pub fn image_media_type(extension: &str) -> Option<&'static str> {
    match extension.to_ascii_lowercase().as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "gif" => Some("image/gif"),
        "svg" => Some("image/svg+xml"),
        _ => None,
    }
}

/// Why a reference could not be bundled.
enum Problem {
    Unsupported(String),
    Malformed(String),
}

struct AssetResolver<'a> {
    root: &'a Path,
    strict: bool,
    assets: Vec<ImageAsset>,
    /// Outcome per original reference: the asset index, or `None` if dropped.
    seen: HashMap<String, Option<usize>>,
    file_names: HashSet<String>,
    diagnostics: Vec<Diagnostic>,
}

impl AssetResolver<'_> {
    fn rewrite(&mut self, body: &str, chapter: usize) -> Result<String> {
        let mut out = String::with_capacity(body.len());
        let mut last = 0;

        for caps in IMG_TAG.captures_iter(body) {
            let (Some(whole), Some(src), Some(alt)) = (caps.get(0), caps.get(1), caps.get(2))
            else {
                continue;
            };
            out.push_str(&body[last..whole.start()]);
            last = whole.end();

            let reference = quick_xml::escape::unescape(src.as_str())
                .unwrap_or(Cow::Borrowed(src.as_str()));
            if let Some(index) = self.lookup(&reference, chapter)? {
                out.push_str("<img src=\"");
                push_escaped(&mut out, &self.assets[index].href);
                out.push_str("\" alt=\"");
                out.push_str(alt.as_str());
                out.push_str("\"/>");
            }
        }
        out.push_str(&body[last..]);

        // Figures whose only image was dropped
        Ok(out.replace("<div class=\"figure\"></div>\n", ""))
    }

    fn lookup(&mut self, reference: &str, chapter: usize) -> Result<Option<usize>> {
        if let Some(&entry) = self.seen.get(reference) {
            return Ok(entry);
        }

        let entry = match self.load(reference) {
            Ok(asset) => {
                self.assets.push(asset);
                Some(self.assets.len() - 1)
            }
            Err(problem) => {
                self.report(problem, reference, chapter)?;
                None
            }
        };
        self.seen.insert(reference.to_string(), entry);
        Ok(entry)
    }

    fn report(&mut self, problem: Problem, reference: &str, chapter: usize) -> Result<()> {
        if self.strict {
            return Err(match problem {
                Problem::Unsupported(extension) => Error::UnsupportedAssetType {
                    reference: reference.to_string(),
                    extension,
                },
                Problem::Malformed(reason) => Error::MalformedAssetReference {
                    reference: reference.to_string(),
                    root: self.root.to_path_buf(),
                    reason,
                },
            });
        }

        let diagnostic = match problem {
            Problem::Unsupported(extension) => Diagnostic::UnsupportedAssetType {
                chapter,
                reference: reference.to_string(),
                extension,
            },
            Problem::Malformed(reason) => Diagnostic::MalformedAssetReference {
                chapter,
                reference: reference.to_string(),
                reason,
            },
        };
        log::warn!("{diagnostic}");
        self.diagnostics.push(diagnostic);
        Ok(())
    }

    fn load(&mut self, reference: &str) -> std::result::Result<ImageAsset, Problem> {
        if URL_SCHEME.is_match(reference) || reference.starts_with("//") {
            return Err(Problem::Malformed("remote images are not bundled".into()));
        }

        let decoded = percent_decode_str(reference)
            .decode_utf8()
            .map_err(|_| Problem::Malformed("invalid UTF-8 in percent-encoded path".into()))?;
        let decoded = sanitize_path(&decoded);

        let extension = Path::new(&decoded)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_ascii_lowercase();
        let media_type =
            image_media_type(&extension).ok_or_else(|| Problem::Unsupported(extension.clone()))?;

        let relative = normalize_relative(&decoded)?;
        let resolved_path = self.root.join(&relative);
        if !resolved_path.is_file() {
            return Err(Problem::Malformed("file not found".into()));
        }
        let data = fs::read(&resolved_path).map_err(|e| Problem::Malformed(e.to_string()))?;

        let file_name = self.unique_file_name(&relative);
        let href = format!("images/{}", utf8_percent_encode(&file_name, HREF_SEGMENT));

        Ok(ImageAsset {
            original_ref: reference.to_string(),
            resolved_path,
            package_id: format!("img_{}", self.assets.len()),
            href,
            file_name,
            media_type,
            data,
        })
    }

    /// The file's own name, with `-{n}` before the extension on collision.
    fn unique_file_name(&mut self, relative: &Path) -> String {
        let name = relative
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "image".to_string());

        let mut candidate = name.clone();
        let mut n = 1;
        while self.file_names.contains(&candidate) {
            candidate = match name.rsplit_once('.') {
                Some((stem, ext)) => format!("{stem}-{n}.{ext}"),
                None => format!("{name}-{n}"),
            };
            n += 1;
        }
        self.file_names.insert(candidate.clone());
        candidate
    }
}

/// Normalize path separators in a markdown reference.
fn sanitize_path(path: &str) -> String {
    path.replace('\\', "/")
}

/// Resolve `.` and `..` lexically, rejecting paths that leave the root.
fn normalize_relative(path: &str) -> std::result::Result<PathBuf, Problem> {
    let mut normalized = PathBuf::new();
    for component in Path::new(path).components() {
        match component {
            Component::Normal(part) => normalized.push(part),
            Component::CurDir => {}
            Component::ParentDir => {
                if !normalized.pop() {
                    return Err(Problem::Malformed("path escapes the image root".into()));
                }
            }
            Component::RootDir | Component::Prefix(_) => {
                return Err(Problem::Malformed("absolute paths are not allowed".into()));
            }
        }
    }
    if normalized.as_os_str().is_empty() {
        return Err(Problem::Malformed("empty path".into()));
    }
    Ok(normalized)
}
