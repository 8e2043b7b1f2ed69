//! End-to-end composition tests.
//!
//! Each test composes a book from markdown strings and inspects the
//! produced EPUB by reading it back with the zip crate.

use std::fs;
use std::io::{Cursor, Read};
use std::path::Path;
use std::time::{Duration, Instant};

use diglot::{
    ComposeConfig, ComposeInput, Composition, Diagnostic, Error, Metadata, Side, Strategy,
    compose,
};
use quick_xml::Reader;
use quick_xml::events::Event;
use tempfile::TempDir;
use zip::ZipArchive;

const EN: &str = "# Intro\nWelcome.\n\n## Chapter 1\nFirst paragraph.\n\n![fig](images/fig1.png)\n\n## Chapter 2\nThe end.\n";
const VI: &str = "# Giới thiệu\nChào mừng.\n\n## Chương 1\nĐoạn đầu tiên.\n";

fn metadata() -> Metadata {
    Metadata::new("Dual Book")
        .with_author("Author")
        .with_language("en")
        .with_secondary_language("vi")
}

fn image_dir() -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::create_dir_all(dir.path().join("images")).unwrap();
    fs::write(dir.path().join("images/fig1.png"), b"\x89PNG\r\n\x1a\nfig").unwrap();
    dir
}

fn read_entry(epub: &[u8], name: &str) -> String {
    let mut archive = ZipArchive::new(Cursor::new(epub)).unwrap();
    let mut file = archive.by_name(name).unwrap();
    let mut content = String::new();
    file.read_to_string(&mut content).unwrap();
    content
}

fn entry_names(epub: &[u8]) -> Vec<String> {
    let archive = ZipArchive::new(Cursor::new(epub)).unwrap();
    archive.file_names().map(String::from).collect()
}

/// Parse `xml` with quick-xml and check every character against the XML
/// `Char` production, which quick-xml does not enforce.
fn assert_strict_xml(name: &str, xml: &str) {
    if let Some(c) = xml.chars().find(|&c| !diglot::markdown::is_xml_char(c)) {
        panic!("{name}: character U+{:04X} is not allowed in XML", c as u32);
    }
    let mut reader = Reader::from_str(xml);
    let mut depth = 0usize;
    loop {
        match reader.read_event() {
            Ok(Event::Start(_)) => depth += 1,
            Ok(Event::End(_)) => depth -= 1,
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => panic!("{name}: malformed XML: {e}"),
        }
    }
    assert_eq!(depth, 0, "{name}: unbalanced elements");
}

/// Run [`assert_strict_xml`] over every XML document in the package.
fn assert_package_strict_xml(epub: &[u8]) {
    for name in entry_names(epub) {
        if [".xhtml", ".opf", ".ncx", ".xml"].iter().any(|ext| name.ends_with(ext)) {
            assert_strict_xml(&name, &read_entry(epub, &name));
        }
    }
}

fn compose_book(
    primary: &str,
    secondary: Option<&str>,
    root: &Path,
    config: &ComposeConfig,
) -> diglot::Result<Composition> {
    let metadata = metadata();
    let input = ComposeInput {
        primary,
        secondary,
        image_root: root,
        metadata: &metadata,
    };
    compose(&input, config)
}

// ============================================================================
// Alignment and Header Scenarios
// ============================================================================

#[test]
fn test_unmatched_tail_appended() {
    let root = image_dir();
    let book = compose_book(EN, Some(VI), root.path(), &ComposeConfig::default()).unwrap();

    assert_eq!(book.chapter_count, 3);
    assert_eq!(book.strategy, Strategy::DualLanguagePositional);

    let intro = read_entry(&book.epub, "OEBPS/chapter_0.xhtml");
    assert!(intro.contains("<h1 class=\"primary\" lang=\"en\" xml:lang=\"en\">Intro</h1>"));
    assert!(intro.contains("<h1 class=\"secondary\" lang=\"vi\" xml:lang=\"vi\">Giới thiệu</h1>"));

    let chapter1 = read_entry(&book.epub, "OEBPS/chapter_1.xhtml");
    assert!(chapter1.contains(">Chapter 1</span> / <span class=\"secondary\""));
    assert!(chapter1.contains(">Chương 1</span></h2>"));

    let chapter2 = read_entry(&book.epub, "OEBPS/chapter_2.xhtml");
    assert!(chapter2.contains("Chapter 2 (en only)</h2>"));
    assert!(!chapter2.contains("class=\"secondary\""));

    let unmatched: Vec<&Diagnostic> = book
        .diagnostics
        .iter()
        .filter(|d| matches!(d, Diagnostic::UnmatchedSection { .. }))
        .collect();
    assert_eq!(
        unmatched,
        vec![&Diagnostic::UnmatchedSection {
            pair: 2,
            side: Side::Primary,
            title: "Chapter 2".to_string(),
        }]
    );
}

#[test]
fn test_primary_blocks_precede_secondary_blocks() {
    let root = image_dir();
    let book = compose_book(EN, Some(VI), root.path(), &ComposeConfig::default()).unwrap();
    let intro = read_entry(&book.epub, "OEBPS/chapter_0.xhtml");

    let welcome = intro.find("Welcome.").unwrap();
    let chao = intro.find("Chào mừng.").unwrap();
    assert!(welcome < chao);
    assert!(intro.contains("<div class=\"secondary\" lang=\"vi\" xml:lang=\"vi\">\n<p>Chào mừng.</p>"));
}

#[test]
fn test_paragraph_by_paragraph_strategy() {
    let root = image_dir();
    let config = ComposeConfig::new().with_strategy(Strategy::ParagraphByParagraph);
    let book = compose_book(
        "## A\none\n\ntwo\n",
        Some("## B\nmột\n\nhai\n"),
        root.path(),
        &config,
    )
    .unwrap();

    let chapter = read_entry(&book.epub, "OEBPS/chapter_0.xhtml");
    let positions: Vec<usize> = ["one", "một", "two", "hai"]
        .iter()
        .map(|text| chapter.find(&format!("<p>{text}</p>")).unwrap())
        .collect();
    assert!(positions.windows(2).all(|w| w[0] < w[1]));
    assert_eq!(book.strategy, Strategy::ParagraphByParagraph);
}

// ============================================================================
// Images
// ============================================================================

#[test]
fn test_repeated_image_bundled_once() {
    let root = image_dir();
    let book = compose_book(EN, Some(VI), root.path(), &ComposeConfig::default()).unwrap();

    let opf = read_entry(&book.epub, "OEBPS/content.opf");
    assert_eq!(opf.matches("media-type=\"image/png\"").count(), 1);
    assert!(opf.contains("<item id=\"img_0\" href=\"images/fig1.png\" media-type=\"image/png\"/>"));

    let chapter1 = read_entry(&book.epub, "OEBPS/chapter_1.xhtml");
    assert_eq!(chapter1.matches("<img src=\"images/fig1.png\"").count(), 1);
    assert!(entry_names(&book.epub).contains(&"OEBPS/images/fig1.png".to_string()));
}

#[test]
fn test_missing_image_dropped_with_diagnostic() {
    let root = TempDir::new().unwrap();
    let book = compose_book(EN, Some(VI), root.path(), &ComposeConfig::default()).unwrap();

    let missing: Vec<&Diagnostic> = book
        .diagnostics
        .iter()
        .filter(|d| matches!(d, Diagnostic::MalformedAssetReference { .. }))
        .collect();
    assert_eq!(missing.len(), 1);

    let chapter1 = read_entry(&book.epub, "OEBPS/chapter_1.xhtml");
    assert!(!chapter1.contains("<img"));
    assert!(!read_entry(&book.epub, "OEBPS/content.opf").contains("image/png"));
}

#[test]
fn test_strict_assets_aborts() {
    let root = TempDir::new().unwrap();
    let config = ComposeConfig::new().with_strict_assets(true);
    let err = compose_book(EN, Some(VI), root.path(), &config).unwrap_err();
    assert!(matches!(err, Error::MalformedAssetReference { .. }));
}

// ============================================================================
// Single-language Output
// ============================================================================

#[test]
fn test_empty_secondary_gives_single_language_book() {
    let root = image_dir();
    let book = compose_book(EN, Some(""), root.path(), &ComposeConfig::default()).unwrap();

    assert_eq!(book.chapter_count, 3);
    assert!(book.diagnostics.is_empty());
    assert_eq!(book.strategy, Strategy::Simple);
    for i in 0..3 {
        let chapter = read_entry(&book.epub, &format!("OEBPS/chapter_{i}.xhtml"));
        assert!(!chapter.contains("class=\"secondary\""));
        assert!(!chapter.contains("only)"));
    }
}

#[test]
fn test_missing_primary() {
    let root = image_dir();
    let err = compose_book("\n\n", Some(VI), root.path(), &ComposeConfig::default()).unwrap_err();
    assert!(matches!(err, Error::InputMissing));
}

#[test]
fn test_render_fallback_is_reported() {
    let root = image_dir();
    let book = compose_book(
        "## A\npress <kbd>Enter</kbd>\n",
        Some("## B\nbình thường\n"),
        root.path(),
        &ComposeConfig::default(),
    )
    .unwrap();

    assert!(matches!(
        book.diagnostics.as_slice(),
        [Diagnostic::RenderFallback { chapter: 0, .. }]
    ));
    let chapter = read_entry(&book.epub, "OEBPS/chapter_0.xhtml");
    assert!(chapter.contains("<p>press &lt;kbd&gt;Enter&lt;/kbd&gt;</p>"));
    assert_package_strict_xml(&book.epub);
}

// ============================================================================
// Hostile Input
// ============================================================================

#[test]
fn test_unclosed_emphasis_completes() {
    let root = image_dir();
    let paragraph = "stray *star and _underscore ".repeat(1000);
    let primary = format!("## A\n{paragraph}\n");
    let secondary = format!("## B\n{paragraph}\n");

    let start = Instant::now();
    let book = compose_book(&primary, Some(&secondary), root.path(), &ComposeConfig::default())
        .unwrap();
    assert!(start.elapsed() < Duration::from_secs(5));

    assert!(book.diagnostics.is_empty());
    let chapter = read_entry(&book.epub, "OEBPS/chapter_0.xhtml");
    assert!(!chapter.contains("<em>"));
    assert_package_strict_xml(&book.epub);
}

#[test]
fn test_control_characters_never_reach_the_package() {
    let root = image_dir();
    let book = compose_book(
        "# A\u{1}\nPage one\u{c}page two\n\n```\nbell\u{7}\n```\n",
        Some("# B\nTrang một\u{b}trang hai\n"),
        root.path(),
        &ComposeConfig::default(),
    )
    .unwrap();

    let chapter = read_entry(&book.epub, "OEBPS/chapter_0.xhtml");
    assert!(chapter.contains("<p>Page one page two</p>"));
    assert!(chapter.contains("<p>Trang một trang hai</p>"));
    assert_package_strict_xml(&book.epub);
}

#[test]
fn test_every_document_is_strict_xml() {
    let root = image_dir();
    let book = compose_book(EN, Some(VI), root.path(), &ComposeConfig::default()).unwrap();
    assert_package_strict_xml(&book.epub);
}

#[test]
fn test_untitled_header_gets_navigation_label() {
    let root = image_dir();
    let config = ComposeConfig::new().with_strategy(Strategy::Simple);
    let book = compose_book("## [](other.md)\ntext\n", None, root.path(), &config).unwrap();

    let nav = read_entry(&book.epub, "OEBPS/nav.xhtml");
    assert!(nav.contains("<a href=\"chapter_0.xhtml\">Introduction</a>"));
    assert!(!nav.contains("></a>"));
    let ncx = read_entry(&book.epub, "OEBPS/toc.ncx");
    assert!(ncx.contains("<text>Introduction</text>"));
}

// ============================================================================
// Determinism
// ============================================================================

#[test]
fn test_identical_inputs_give_identical_bytes() {
    let root = image_dir();
    let first = compose_book(EN, Some(VI), root.path(), &ComposeConfig::default()).unwrap();
    let second = compose_book(EN, Some(VI), root.path(), &ComposeConfig::default()).unwrap();
    assert_eq!(first.epub, second.epub);
}
