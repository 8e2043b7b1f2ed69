//! EPUB assembler.
//!
//! Builds an in-memory [`EpubPackage`] from rendered chapters and resolved
//! images, checks its referential integrity and serializes it as an EPUB 3
//! container with an NCX table of contents for EPUB 2 readers.

use std::collections::{HashMap, HashSet};
use std::io::{Cursor, Seek, Write};

use quick_xml::Reader;
use quick_xml::events::Event;
use zip::CompressionMethod;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

use crate::config::ComposeConfig;
use crate::error::{Error, Result};
use crate::markdown::{escape_xml, is_xml_char};
use crate::model::Metadata;
use crate::util::stable_identifier;

use super::assets::ImageAsset;
use super::html_synth::{RenderedChapter, xhtml_document};

const XHTML: &str = "application/xhtml+xml";
const NAV_ID: &str = "nav";
const NCX_ID: &str = "ncx";
const STYLE_ID: &str = "style";
const STYLE_HREF: &str = "style.css";

/// Fixed `dcterms:modified` used when the caller supplies none, so repeated
/// runs produce identical packages.
const DEFAULT_MODIFIED: &str = "2024-01-01T00:00:00Z";

/// Built-in stylesheet. Secondary-language text is set in a contrasting
/// italic so the two texts are easy to tell apart.
pub const DEFAULT_STYLESHEET: &str = r#"body {
  font-family: serif;
  line-height: 1.5;
  margin: 0 5%;
}

h1, h2, h3, h4, h5, h6 {
  line-height: 1.25;
  margin: 1.2em 0 0.6em;
}

.secondary {
  font-style: italic;
  color: #2E86AB;
}

h1.secondary, h2.secondary, h3.secondary, h4.secondary, h5.secondary, h6.secondary {
  margin-top: 0.2em;
}

div.primary, div.secondary {
  margin-bottom: 1em;
}

div.figure {
  text-align: center;
  margin: 1em 0;
}

div.figure img {
  max-width: 100%;
}

pre {
  white-space: pre-wrap;
  font-family: monospace;
  font-style: normal;
}

blockquote {
  margin: 1em 2em;
}
"#;

/// Container.xml template.
const CONTAINER_XML: &[u8] = br#"<?xml version="1.0" encoding="UTF-8"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
  <rootfiles>
    <rootfile full-path="OEBPS/content.opf" media-type="application/oebps-package+xml"/>
  </rootfiles>
</container>
"#;

/// One `<item>` of the package manifest. Hrefs are relative to `OEBPS/`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestEntry {
    pub id: String,
    pub href: String,
    pub media_type: String,
    pub properties: Option<&'static str>,
}

/// One entry of the navigation document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavEntry {
    pub label: String,
    /// Manifest id of the target chapter.
    pub target: String,
}

/// A complete book, ready to be validated and written.
#[derive(Debug, Clone)]
pub struct EpubPackage {
    pub metadata: Metadata,
    /// `(manifest id, XHTML document)` in reading order.
    pub chapters: Vec<(String, String)>,
    pub manifest: Vec<ManifestEntry>,
    pub spine: Vec<String>,
    pub nav: Vec<NavEntry>,
    pub assets: Vec<ImageAsset>,
    pub stylesheet: String,
}

impl EpubPackage {
    /// Build the package structure. Chapters keep the given order, which
    /// becomes both spine and navigation order.
    pub fn build(
        chapters: Vec<RenderedChapter>,
        assets: Vec<ImageAsset>,
        metadata: &Metadata,
        stylesheet: Option<&str>,
    ) -> Self {
        let mut metadata = metadata.clone();
        if metadata.identifier.is_empty() {
            metadata.identifier = stable_identifier(&metadata);
        }
        if metadata.title.trim().is_empty() {
            metadata.title = "Untitled".to_string();
        }

        let mut manifest = Vec::with_capacity(chapters.len() + assets.len() + 3);
        let mut documents = Vec::with_capacity(chapters.len());
        let mut spine = Vec::with_capacity(chapters.len());
        let mut nav = Vec::with_capacity(chapters.len());

        for (i, chapter) in chapters.into_iter().enumerate() {
            let id = format!("chapter_{i}");
            manifest.push(ManifestEntry {
                id: id.clone(),
                href: format!("chapter_{i}.xhtml"),
                media_type: XHTML.to_string(),
                properties: None,
            });
            let document = xhtml_document(
                &chapter.body,
                &chapter.title,
                metadata.primary_lang(),
                Some(STYLE_HREF),
            );
            documents.push((id.clone(), document));
            spine.push(id.clone());
            nav.push(NavEntry {
                label: chapter.title,
                target: id,
            });
        }

        for asset in &assets {
            manifest.push(ManifestEntry {
                id: asset.package_id.clone(),
                href: asset.href.clone(),
                media_type: asset.media_type.to_string(),
                properties: None,
            });
        }

        manifest.push(ManifestEntry {
            id: NAV_ID.to_string(),
            href: "nav.xhtml".to_string(),
            media_type: XHTML.to_string(),
            properties: Some("nav"),
        });
        manifest.push(ManifestEntry {
            id: NCX_ID.to_string(),
            href: "toc.ncx".to_string(),
            media_type: "application/x-dtbncx+xml".to_string(),
            properties: None,
        });
        manifest.push(ManifestEntry {
            id: STYLE_ID.to_string(),
            href: STYLE_HREF.to_string(),
            media_type: "text/css".to_string(),
            properties: None,
        });

        Self {
            metadata,
            chapters: documents,
            manifest,
            spine,
            nav,
            assets,
            stylesheet: stylesheet.unwrap_or(DEFAULT_STYLESHEET).to_string(),
        }
    }

    /// Check referential integrity.
    ///
    /// Every id is unique, every spine and nav id exists, every resource a
    /// chapter references is in the manifest and every manifest entry is
    /// referenced by the spine, the navigation or a chapter. Chapters hold
    /// only characters XML allows.
    pub fn validate(&self) -> Result<()> {
        let mut by_href: HashMap<&str, &str> = HashMap::new();
        let mut ids: HashSet<&str> = HashSet::new();
        for entry in &self.manifest {
            if !ids.insert(&entry.id) {
                return Err(integrity(format!("duplicate manifest id '{}'", entry.id)));
            }
            if by_href.insert(&entry.href, &entry.id).is_some() {
                return Err(integrity(format!("duplicate manifest href '{}'", entry.href)));
            }
        }

        let mut referenced: HashSet<&str> = HashSet::from([NAV_ID, NCX_ID]);
        for id in &self.spine {
            if !ids.contains(id.as_str()) {
                return Err(integrity(format!("spine references unknown id '{id}'")));
            }
            referenced.insert(id);
        }
        for entry in &self.nav {
            if !ids.contains(entry.target.as_str()) {
                return Err(integrity(format!(
                    "navigation entry '{}' targets unknown id '{}'",
                    entry.label, entry.target
                )));
            }
        }

        for (id, document) in &self.chapters {
            if !ids.contains(id.as_str()) {
                return Err(integrity(format!("chapter '{id}' has no manifest entry")));
            }
            if let Some(c) = document.chars().find(|&c| !is_xml_char(c)) {
                return Err(integrity(format!(
                    "chapter '{id}' contains U+{:04X}, which XML does not allow",
                    c as u32
                )));
            }
            for href in resource_references(document)? {
                match by_href.get(href.as_str()) {
                    Some(&target) => {
                        referenced.insert(target);
                    }
                    None => {
                        return Err(integrity(format!(
                            "chapter '{id}' references '{href}', which is not in the manifest"
                        )));
                    }
                }
            }
        }

        if let Some(entry) = self.manifest.iter().find(|e| !referenced.contains(e.id.as_str())) {
            return Err(integrity(format!(
                "manifest entry '{}' is never referenced",
                entry.id
            )));
        }

        Ok(())
    }

    /// Serialize the package as an EPUB container.
    pub fn write_to<W: Write + Seek>(&self, writer: W, compression_level: Option<u32>) -> Result<()> {
        let mut zip = ZipWriter::new(writer);

        let compression_level = compression_level.unwrap_or(6);
        let stored = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
        let deflated = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .compression_level(Some(compression_level as i64));

        // Must be first and uncompressed
        zip.start_file("mimetype", stored)?;
        zip.write_all(b"application/epub+zip")?;

        zip.start_file("META-INF/container.xml", deflated)?;
        zip.write_all(CONTAINER_XML)?;

        zip.start_file("OEBPS/content.opf", deflated)?;
        zip.write_all(generate_opf(&self.metadata, &self.manifest, &self.spine).as_bytes())?;

        zip.start_file("OEBPS/nav.xhtml", deflated)?;
        zip.write_all(self.generate_nav().as_bytes())?;

        zip.start_file("OEBPS/toc.ncx", deflated)?;
        zip.write_all(self.generate_ncx().as_bytes())?;

        zip.start_file(format!("OEBPS/{STYLE_HREF}"), deflated)?;
        zip.write_all(self.stylesheet.as_bytes())?;

        for (id, document) in &self.chapters {
            zip.start_file(format!("OEBPS/{}", self.href_of(id)), deflated)?;
            zip.write_all(document.as_bytes())?;
        }

        for asset in &self.assets {
            // Already-compressed formats gain nothing from deflate
            let options = if asset.media_type == "image/svg+xml" {
                deflated
            } else {
                stored
            };
            zip.start_file(format!("OEBPS/images/{}", asset.file_name), options)?;
            zip.write_all(&asset.data)?;
        }

        zip.finish()?;
        Ok(())
    }

    fn href_of<'a>(&'a self, id: &str) -> &'a str {
        self.manifest
            .iter()
            .find(|e| e.id == id)
            .map_or("", |e| e.href.as_str())
    }

    /// Generate the EPUB 3 navigation document.
    fn generate_nav(&self) -> String {
        let lang = escape_xml(self.metadata.primary_lang());
        let title = escape_xml(&self.metadata.title);

        let mut nav = String::new();
        nav.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<!DOCTYPE html>\n");
        nav.push_str(&format!(
            "<html xmlns=\"http://www.w3.org/1999/xhtml\" xmlns:epub=\"http://www.idpf.org/2007/ops\" lang=\"{lang}\" xml:lang=\"{lang}\">\n"
        ));
        nav.push_str(&format!(
            "<head>\n  <meta charset=\"UTF-8\"/>\n  <title>{title}</title>\n</head>\n<body>\n"
        ));
        nav.push_str("  <nav epub:type=\"toc\" id=\"toc\">\n");
        nav.push_str(&format!("    <h1>{title}</h1>\n    <ol>\n"));
        for entry in &self.nav {
            nav.push_str(&format!(
                "      <li><a href=\"{}\">{}</a></li>\n",
                escape_xml(self.href_of(&entry.target)),
                escape_xml(&entry.label)
            ));
        }
        nav.push_str("    </ol>\n  </nav>\n</body>\n</html>\n");
        nav
    }

    /// Generate toc.ncx from the navigation entries.
    fn generate_ncx(&self) -> String {
        let mut ncx = String::new();

        ncx.push_str(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE ncx PUBLIC "-//NISO//DTD ncx 2005-1//EN" "http://www.daisy.org/z3986/2005/ncx-2005-1.dtd">
<ncx xmlns="http://www.daisy.org/z3986/2005/ncx/" version="2005-1">
  <head>
    <meta name="dtb:uid" content=""#,
        );
        ncx.push_str(&escape_xml(&self.metadata.identifier));
        ncx.push_str(
            r#""/>
    <meta name="dtb:depth" content="1"/>
    <meta name="dtb:totalPageCount" content="0"/>
    <meta name="dtb:maxPageNumber" content="0"/>
  </head>
  <docTitle>
    <text>"#,
        );
        ncx.push_str(&escape_xml(&self.metadata.title));
        ncx.push_str(
            r#"</text>
  </docTitle>
  <navMap>
"#,
        );

        for (i, entry) in self.nav.iter().enumerate() {
            let play_order = i + 1;
            ncx.push_str(&format!(
                "    <navPoint id=\"navPoint-{play_order}\" playOrder=\"{play_order}\">\n"
            ));
            ncx.push_str(&format!(
                "      <navLabel><text>{}</text></navLabel>\n",
                escape_xml(&entry.label)
            ));
            ncx.push_str(&format!(
                "      <content src=\"{}\"/>\n",
                escape_xml(self.href_of(&entry.target))
            ));
            ncx.push_str("    </navPoint>\n");
        }

        ncx.push_str("  </navMap>\n</ncx>\n");
        ncx
    }
}

/// Build, validate and serialize a book into EPUB bytes.
///
/// Nothing is serialized when validation fails.
pub fn assemble(
    chapters: Vec<RenderedChapter>,
    assets: Vec<ImageAsset>,
    metadata: &Metadata,
    config: &ComposeConfig,
) -> Result<Vec<u8>> {
    let package = EpubPackage::build(chapters, assets, metadata, config.stylesheet.as_deref());
    package.validate()?;

    let mut cursor = Cursor::new(Vec::new());
    package.write_to(&mut cursor, config.compression_level)?;

    let bytes = cursor.into_inner();
    log::info!(
        "assembled EPUB: {} chapters, {} images, {} bytes",
        package.chapters.len(),
        package.assets.len(),
        bytes.len()
    );
    Ok(bytes)
}

fn integrity(message: String) -> Error {
    Error::PackageIntegrity(message)
}

/// Package resources referenced by a chapter: `img/@src` and `link/@href`.
fn resource_references(document: &str) -> Result<Vec<String>> {
    let mut reader = Reader::from_str(document);
    let mut refs = Vec::new();

    loop {
        match reader.read_event()? {
            Event::Start(e) | Event::Empty(e) => {
                let wanted: &[u8] = match e.name().as_ref() {
                    b"img" => b"src",
                    b"link" => b"href",
                    _ => continue,
                };
                for attr in e.attributes().flatten() {
                    if attr.key.as_ref() == wanted {
                        let raw = String::from_utf8_lossy(&attr.value);
                        let value = quick_xml::escape::unescape(&raw)
                            .map(|v| v.into_owned())
                            .unwrap_or_else(|_| raw.to_string());
                        refs.push(value);
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(refs)
}

/// Generate content.opf from metadata and manifest.
fn generate_opf(metadata: &Metadata, manifest: &[ManifestEntry], spine: &[String]) -> String {
    let mut opf = String::new();
    let primary_lang = escape_xml(metadata.primary_lang());

    opf.push_str(&format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<package xmlns="http://www.idpf.org/2007/opf" version="3.0" unique-identifier="BookId" xml:lang="{primary_lang}">
  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/">
"#
    ));

    opf.push_str(&format!(
        "    <dc:identifier id=\"BookId\">{}</dc:identifier>\n",
        escape_xml(&metadata.identifier)
    ));
    opf.push_str(&format!(
        "    <dc:title id=\"title1\">{}</dc:title>\n",
        escape_xml(&metadata.title)
    ));
    for (i, author) in metadata.authors.iter().enumerate() {
        opf.push_str(&format!(
            "    <dc:creator id=\"creator{}\">{}</dc:creator>\n",
            i + 1,
            escape_xml(author)
        ));
    }

    // Both languages of the book, primary first
    opf.push_str(&format!("    <dc:language>{primary_lang}</dc:language>\n"));
    if let Some(secondary) = metadata.secondary_language.as_deref()
        && !secondary.is_empty()
        && secondary != metadata.primary_lang()
    {
        opf.push_str(&format!(
            "    <dc:language>{}</dc:language>\n",
            escape_xml(secondary)
        ));
    }

    if let Some(ref description) = metadata.description {
        opf.push_str(&format!(
            "    <dc:description>{}</dc:description>\n",
            escape_xml(description)
        ));
    }

    // dcterms:modified (required for EPUB3)
    opf.push_str(&format!(
        "    <meta property=\"dcterms:modified\">{}</meta>\n",
        escape_xml(metadata.modified.as_deref().unwrap_or(DEFAULT_MODIFIED))
    ));
    opf.push_str("  </metadata>\n");

    opf.push_str("  <manifest>\n");
    for item in manifest {
        let properties = item
            .properties
            .map(|p| format!(" properties=\"{p}\""))
            .unwrap_or_default();
        opf.push_str(&format!(
            "    <item id=\"{}\" href=\"{}\" media-type=\"{}\"{}/>\n",
            escape_xml(&item.id),
            escape_xml(&item.href),
            escape_xml(&item.media_type),
            properties
        ));
    }
    opf.push_str("  </manifest>\n");

    opf.push_str("  <spine toc=\"ncx\">\n");
    for id in spine {
        opf.push_str(&format!("    <itemref idref=\"{}\"/>\n", escape_xml(id)));
    }
    opf.push_str("  </spine>\n");

    opf.push_str("</package>\n");
    opf
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn chapter(i: usize, body: &str) -> RenderedChapter {
        RenderedChapter {
            pair_index: i,
            title: format!("Chapter {i}"),
            body: body.to_string(),
        }
    }

    fn asset(id: &str, name: &str) -> ImageAsset {
        ImageAsset {
            original_ref: name.to_string(),
            resolved_path: PathBuf::from(name),
            package_id: id.to_string(),
            href: format!("images/{name}"),
            file_name: name.to_string(),
            media_type: "image/png",
            data: b"png".to_vec(),
        }
    }

    fn metadata() -> Metadata {
        Metadata::new("Dual & Book")
            .with_author("Author")
            .with_language("en")
            .with_secondary_language("vi")
    }

    fn package() -> EpubPackage {
        EpubPackage::build(
            vec![
                chapter(0, "<p>zero</p>\n"),
                chapter(1, "<img src=\"images/fig1.png\" alt=\"\"/>\n"),
            ],
            vec![asset("img_0", "fig1.png")],
            &metadata(),
            None,
        )
    }

    #[test]
    fn test_build_ids_and_order() {
        let package = package();
        let ids: Vec<&str> = package.manifest.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["chapter_0", "chapter_1", "img_0", "nav", "ncx", "style"]);
        assert_eq!(package.spine, vec!["chapter_0", "chapter_1"]);
        let targets: Vec<&str> = package.nav.iter().map(|n| n.target.as_str()).collect();
        assert_eq!(targets, package.spine.iter().map(String::as_str).collect::<Vec<_>>());
        assert!(package.metadata.identifier.starts_with("urn:uuid:"));
        package.validate().unwrap();
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let mut package = package();
        package.manifest[2].id = "chapter_0".to_string();
        let err = package.validate().unwrap_err();
        assert!(err.to_string().contains("duplicate manifest id 'chapter_0'"));
    }

    #[test]
    fn test_dangling_spine_rejected() {
        let mut package = package();
        package.spine.push("chapter_9".to_string());
        assert!(matches!(package.validate(), Err(Error::PackageIntegrity(_))));
    }

    #[test]
    fn test_unmanifested_image_rejected() {
        let package = EpubPackage::build(
            vec![chapter(0, "<img src=\"images/missing.png\" alt=\"\"/>\n")],
            Vec::new(),
            &metadata(),
            None,
        );
        let err = package.validate().unwrap_err();
        assert!(err.to_string().contains("images/missing.png"));
    }

    #[test]
    fn test_forbidden_character_rejected() {
        let package = EpubPackage::build(
            vec![chapter(0, "<p>page\u{c}break</p>\n")],
            Vec::new(),
            &metadata(),
            None,
        );
        let err = package.validate().unwrap_err();
        assert!(err.to_string().contains("contains U+000C"));
    }

    #[test]
    fn test_unreferenced_asset_rejected() {
        let package = EpubPackage::build(
            vec![chapter(0, "<p>no images</p>\n")],
            vec![asset("img_0", "fig1.png")],
            &metadata(),
            None,
        );
        let err = package.validate().unwrap_err();
        assert!(err.to_string().contains("'img_0' is never referenced"));
    }

    #[test]
    fn test_opf_declares_both_languages() {
        let package = package();
        let opf = generate_opf(&package.metadata, &package.manifest, &package.spine);

        assert!(opf.contains("version=\"3.0\""));
        assert!(opf.contains("<dc:title id=\"title1\">Dual &amp; Book</dc:title>"));
        assert!(opf.contains("<dc:language>en</dc:language>\n    <dc:language>vi</dc:language>"));
        assert!(opf.contains("<meta property=\"dcterms:modified\">2024-01-01T00:00:00Z</meta>"));
        assert!(opf.contains(
            "<item id=\"nav\" href=\"nav.xhtml\" media-type=\"application/xhtml+xml\" properties=\"nav\"/>"
        ));
        assert!(opf.contains("<spine toc=\"ncx\">\n    <itemref idref=\"chapter_0\"/>"));
    }

    #[test]
    fn test_nav_and_ncx_follow_chapter_order() {
        let package = package();
        let nav = package.generate_nav();
        let first = nav.find("chapter_0.xhtml").unwrap();
        let second = nav.find("chapter_1.xhtml").unwrap();
        assert!(first < second);
        assert!(nav.contains("<a href=\"chapter_1.xhtml\">Chapter 1</a>"));

        let ncx = package.generate_ncx();
        assert!(ncx.contains("playOrder=\"2\""));
        assert!(ncx.contains("<content src=\"chapter_1.xhtml\"/>"));
    }

    #[test]
    fn test_custom_stylesheet() {
        let package = EpubPackage::build(
            vec![chapter(0, "<p>x</p>\n")],
            Vec::new(),
            &metadata(),
            Some("body { color: red; }"),
        );
        assert_eq!(package.stylesheet, "body { color: red; }");
    }

    #[test]
    fn test_assemble_writes_mimetype_first() {
        let bytes = assemble(
            vec![chapter(0, "<p>zero</p>\n")],
            Vec::new(),
            &metadata(),
            &ComposeConfig::default(),
        )
        .unwrap();
        assert_eq!(&bytes[0..4], b"PK\x03\x04");
        assert_eq!(&bytes[30..38], b"mimetype");

        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        let first = archive.by_index(0).unwrap();
        assert_eq!(first.name(), "mimetype");
        assert_eq!(first.compression(), CompressionMethod::Stored);
    }
}
