//! Presentation writer: outline text plus pictures → `.pptx`.
//!
//! The assembler starts from a template package (stripped of its slides) or
//! the built-in blank package, then appends:
//!
//! - a title slide when the outline carries a `Title:` line
//! - one slide per outline block, with a title box, a content box and at
//!   most one picture
//! - a `Code Example` slide right after any block holding a fenced snippet
//!
//! Picture problems are logged and skipped; only package I/O fails the call.

pub mod outline;

mod media;
mod package;
mod skeleton;
mod xml;

pub use outline::{ContentLine, DeckOutline, SlideBlock};

#[cfg(test)]
pub(crate) use package::testing::read_entries as package_entries;

use crate::error::{DocumentError, DocumentResult};
use crate::types::AssemblyReport;
use package::{LayoutInfo, Package, IMAGE_REL_ID};
use std::path::{Path, PathBuf};
use xml::{Frame, Para, SlideXml, TextStyle};

/// Subtitle placed on the title slide when the layout offers one.
pub const SUBTITLE: &str = "Generated Presentation";

/// Title of the slide holding a block's code snippet.
pub const CODE_SLIDE_TITLE: &str = "Code Example";

const TITLE_SIZE_PT: u32 = 32;
const BODY_SIZE_PT: u32 = 20;
const CODE_SIZE_PT: u32 = 10;
const CODE_FONT: &str = "Courier New";
const CODE_FILL: &str = "282828";
const CODE_COLOR: &str = "FFFFFF";

fn title_frame() -> Frame {
    Frame::inches(1.0, 0.3, 8.0, 1.0)
}

fn content_frame() -> Frame {
    Frame::inches(0.5, 1.0, 6.0, 5.0)
}

fn picture_frame() -> Frame {
    Frame::inches(6.5, 1.0, 3.0, 4.0)
}

fn code_frame() -> Frame {
    Frame::inches(1.0, 1.5, 8.0, 5.0)
}

/// Used for the deck title when the title layout has no title placeholder.
fn deck_title_frame() -> Frame {
    Frame::inches(0.25, 0.5, 9.0, 1.5)
}

fn heading(text: &str) -> Para {
    Para {
        text: text.to_string(),
        style: TextStyle {
            size_pt: Some(TITLE_SIZE_PT),
            bold: true,
            ..TextStyle::default()
        },
        centered: true,
        bullet: false,
    }
}

/// Writes presentation files.
#[derive(Debug, Clone, Default)]
pub struct DocumentAssembler {
    template: Option<PathBuf>,
    cleanup_dir: Option<PathBuf>,
}

impl DocumentAssembler {
    /// `template` is used when it exists and can be read; otherwise the
    /// blank package is used.
    pub fn new(template: Option<PathBuf>) -> Self {
        Self {
            template,
            cleanup_dir: None,
        }
    }

    /// Remove `dir` (best effort) once the document is saved.
    pub fn with_cleanup_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cleanup_dir = Some(dir.into());
        self
    }

    /// Build the deck for `outline_text` and write it to `output`.
    ///
    /// `images` holds one entry per image suggestion, in outline order; a
    /// `None` entry is a suggestion nothing was downloaded for.
    pub fn assemble(
        &self,
        outline_text: &str,
        images: &[Option<PathBuf>],
        output: &Path,
    ) -> DocumentResult<AssemblyReport> {
        let outline = DeckOutline::parse(outline_text);
        let mut package = self.load_package()?;
        let mut report = AssemblyReport::default();

        if let Some(title) = &outline.title {
            let layout = package
                .title_layout()
                .cloned()
                .ok_or_else(|| DocumentError::xml("presentation", "no slide layouts"))?;
            add_title_slide(&mut package, &layout, title)?;
        }

        let blank = package
            .blank_layout()
            .cloned()
            .ok_or_else(|| DocumentError::xml("presentation", "no slide layouts"))?;

        let mut images = images.iter();
        for block in &outline.blocks {
            add_block_slides(&mut package, &blank.part, block, &mut images, &mut report)?;
        }

        if images.len() > 0 {
            tracing::debug!(unused = images.len(), "More pictures than image suggestions");
        }

        if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        package.save(output)?;
        report.slide_count = package.slide_count();

        tracing::info!(
            path = %output.display(),
            slides = report.slide_count,
            pictures = report.pictures_placed,
            skipped = report.pictures_skipped,
            "Presentation saved"
        );

        self.cleanup();
        Ok(report)
    }

    fn load_package(&self) -> DocumentResult<Package> {
        let Some(path) = &self.template else {
            return Package::blank();
        };

        if !path.is_file() {
            tracing::warn!(template = %path.display(), "Template not found, using blank presentation");
            return Package::blank();
        }

        match Package::open(path) {
            Ok(package) => {
                tracing::debug!(
                    template = %path.display(),
                    layouts = package.layouts().len(),
                    title_layout = package.title_layout().and_then(|l| l.name.as_deref()).unwrap_or("-"),
                    "Loaded template"
                );
                Ok(package)
            }
            Err(e) => {
                tracing::warn!(template = %path.display(), error = %e, "Unusable template, using blank presentation");
                Package::blank()
            }
        }
    }

    fn cleanup(&self) {
        let Some(dir) = &self.cleanup_dir else {
            return;
        };
        match std::fs::remove_dir_all(dir) {
            Ok(()) => tracing::debug!(dir = %dir.display(), "Removed image directory"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(dir = %dir.display(), error = %e, "Failed to remove image directory"),
        }
    }
}

fn add_title_slide(package: &mut Package, layout: &LayoutInfo, title: &str) -> DocumentResult<()> {
    let mut slide = SlideXml::new();
    match layout.placeholder(&["ctrTitle", "title"]) {
        Some(ph) => slide.placeholder(ph, title)?,
        None => slide.text_box(deck_title_frame(), &[heading(title)], None)?,
    }
    if let Some(ph) = layout.placeholder(&["subTitle"]) {
        slide.placeholder(ph, SUBTITLE)?;
    }
    package.add_slide(&layout.part, slide.finish(), None)
}

fn add_block_slides<'a>(
    package: &mut Package,
    layout_part: &str,
    block: &SlideBlock,
    images: &mut impl Iterator<Item = &'a Option<PathBuf>>,
    report: &mut AssemblyReport,
) -> DocumentResult<()> {
    let mut slide = SlideXml::new();
    slide.text_box(title_frame(), &[heading(&block.title)], None)?;

    if !block.lines.is_empty() {
        let body_style = TextStyle {
            size_pt: Some(BODY_SIZE_PT),
            ..TextStyle::default()
        };
        let paragraphs: Vec<Para> = block
            .lines
            .iter()
            .map(|line| Para {
                text: line.text().to_string(),
                style: body_style.clone(),
                centered: false,
                bullet: matches!(line, ContentLine::Bullet(_)),
            })
            .collect();
        slide.text_box(content_frame(), &paragraphs, None)?;
    }

    // Each suggestion owns one image entry; the first usable one is placed.
    let mut media_part = None;
    for suggestion in &block.image_suggestions {
        let entry = images.next();
        if media_part.is_some() {
            report.pictures_skipped += 1;
            continue;
        }
        let Some(Some(path)) = entry else {
            tracing::warn!(slide = %block.title, suggestion = %suggestion, "No picture for image suggestion");
            report.pictures_skipped += 1;
            continue;
        };

        match media::load_picture(path) {
            Ok(blob) => {
                let part = package.add_media(blob.ext, blob.bytes);
                slide.picture(picture_frame(), IMAGE_REL_ID, suggestion)?;
                media_part = Some(part);
                report.pictures_placed += 1;
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Skipping picture");
                report.pictures_skipped += 1;
            }
        }
    }

    package.add_slide(layout_part, slide.finish(), media_part.as_deref())?;

    if let Some(code) = &block.code {
        let mut slide = SlideXml::new();
        slide.text_box(title_frame(), &[heading(CODE_SLIDE_TITLE)], None)?;
        let code_para = Para::plain(
            code.as_str(),
            TextStyle {
                size_pt: Some(CODE_SIZE_PT),
                bold: false,
                font: Some(CODE_FONT),
                color: Some(CODE_COLOR),
            },
        );
        slide.text_box(code_frame(), &[code_para], Some(CODE_FILL))?;
        package.add_slide(layout_part, slide.finish(), None)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::package::testing::{read_entries, write_template};
    use super::*;
    use crate::photos::fetcher::testing::TINY_PNG;
    use once_cell::sync::Lazy;
    use regex::Regex;
    use std::collections::BTreeMap;

    static TEXT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<a:t>(.*?)</a:t>").unwrap());

    const OUTLINE: &str = "Title: Ownership in Rust
---
Slide 1: Owners
- Every value has one owner
- Dropping the owner frees the value
Image Suggestion: a key on a ring
---
Slide 2: Moves
Assignment moves the value.
```rust
let a = vec![1];
let b = a;
```
---
Slide 3: Borrowing
- References borrow without owning
Image Suggestion: a library card
---
";

    fn slide_texts(entries: &BTreeMap<String, String>) -> Vec<Vec<String>> {
        (1..)
            .map_while(|n| entries.get(&format!("ppt/slides/slide{n}.xml")))
            .map(|xml| {
                TEXT_RE
                    .captures_iter(xml)
                    .map(|c| c[1].to_string())
                    .collect()
            })
            .collect()
    }

    fn png_in(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, TINY_PNG).unwrap();
        path
    }

    #[test]
    fn test_assemble_blank_deck() {
        let dir = tempfile::tempdir().unwrap();
        let images = vec![
            Some(png_in(dir.path(), "key.png")),
            Some(png_in(dir.path(), "card.png")),
        ];
        let output = dir.path().join("out/deck.pptx");

        let report = DocumentAssembler::new(None)
            .assemble(OUTLINE, &images, &output)
            .unwrap();
        assert_eq!(report.slide_count, 5);
        assert_eq!(report.pictures_placed, 2);
        assert_eq!(report.pictures_skipped, 0);

        let entries = read_entries(&output);
        let texts = slide_texts(&entries);
        assert_eq!(texts.len(), 5);
        assert_eq!(texts[0], vec!["Ownership in Rust", SUBTITLE]);
        assert_eq!(
            texts[1],
            vec!["Owners", "Every value has one owner", "Dropping the owner frees the value"]
        );
        assert_eq!(texts[2], vec!["Moves", "Assignment moves the value."]);
        assert_eq!(texts[3], vec![CODE_SLIDE_TITLE, "let a = vec![1];", "let b = a;"]);
        assert_eq!(texts[4], vec!["Borrowing", "References borrow without owning"]);

        let title_slide = &entries["ppt/slides/slide1.xml"];
        assert!(title_slide.contains(r#"<p:ph type="ctrTitle"/>"#));
        assert!(entries["ppt/slides/_rels/slide1.xml.rels"].contains("slideLayout1.xml"));
        assert!(entries["ppt/slides/_rels/slide2.xml.rels"].contains("slideLayout2.xml"));

        let code_slide = &entries["ppt/slides/slide4.xml"];
        assert!(code_slide.contains(r#"<a:latin typeface="Courier New"/>"#));
        assert!(code_slide.contains(r#"<a:srgbClr val="282828"/>"#));

        assert!(entries.contains_key("ppt/media/image1.png"));
        assert!(entries.contains_key("ppt/media/image2.png"));
        assert!(entries["ppt/slides/_rels/slide5.xml.rels"].contains("../media/image2.png"));
    }

    #[test]
    fn test_images_follow_suggestion_order_with_gaps() {
        let dir = tempfile::tempdir().unwrap();
        let images = vec![None, Some(png_in(dir.path(), "card.png"))];
        let output = dir.path().join("deck.pptx");

        let report = DocumentAssembler::new(None)
            .assemble(OUTLINE, &images, &output)
            .unwrap();
        assert_eq!(report.pictures_placed, 1);
        assert_eq!(report.pictures_skipped, 1);

        let entries = read_entries(&output);
        assert!(!entries["ppt/slides/slide2.xml"].contains("<p:pic>"));
        assert!(entries["ppt/slides/slide5.xml"].contains("<p:pic>"));
        assert!(entries["ppt/slides/_rels/slide5.xml.rels"].contains("../media/image1.png"));
    }

    #[test]
    fn test_fewer_images_than_suggestions() {
        let dir = tempfile::tempdir().unwrap();
        let images = vec![Some(png_in(dir.path(), "key.png"))];
        let output = dir.path().join("deck.pptx");

        let report = DocumentAssembler::new(None)
            .assemble(OUTLINE, &images, &output)
            .unwrap();
        assert_eq!(report.pictures_placed, 1);
        assert_eq!(report.pictures_skipped, 1);

        let entries = read_entries(&output);
        assert!(entries["ppt/slides/slide2.xml"].contains("<p:pic>"));
        assert!(!entries["ppt/slides/slide5.xml"].contains("<p:pic>"));
    }

    #[test]
    fn test_missing_picture_file_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let images = vec![Some(dir.path().join("gone.png")), None];
        let output = dir.path().join("deck.pptx");

        let report = DocumentAssembler::new(None)
            .assemble(OUTLINE, &images, &output)
            .unwrap();
        assert_eq!(report.slide_count, 5);
        assert_eq!(report.pictures_placed, 0);
        assert_eq!(report.pictures_skipped, 2);
    }

    #[test]
    fn test_zero_separators_gives_title_slide_only() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("deck.pptx");
        let text = "Title: Just a title\nSlide 1: Intro\n- a point\nImage Suggestion: sunrise";

        let report = DocumentAssembler::new(None)
            .assemble(text, &[], &output)
            .unwrap();
        assert_eq!(report.slide_count, 1);
        assert_eq!(report.pictures_skipped, 0);

        let texts = slide_texts(&read_entries(&output));
        assert_eq!(texts, vec![vec!["Just a title".to_string(), SUBTITLE.to_string()]]);
    }

    #[test]
    fn test_empty_outline_still_writes_a_package() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("deck.pptx");

        let report = DocumentAssembler::new(None)
            .assemble("", &[], &output)
            .unwrap();
        assert_eq!(report.slide_count, 0);
        let entries = read_entries(&output);
        assert!(entries.contains_key("ppt/presentation.xml"));
        assert!(!entries["ppt/presentation.xml"].contains("sldIdLst"));
    }

    #[test]
    fn test_identical_input_gives_identical_slides() {
        let dir = tempfile::tempdir().unwrap();
        let images = vec![Some(png_in(dir.path(), "key.png")), None];
        let assembler = DocumentAssembler::new(None);

        let first = dir.path().join("a.pptx");
        let second = dir.path().join("b.pptx");
        let r1 = assembler.assemble(OUTLINE, &images, &first).unwrap();
        let r2 = assembler.assemble(OUTLINE, &images, &second).unwrap();

        assert_eq!(r1, r2);
        assert_eq!(read_entries(&first), read_entries(&second));
    }

    #[test]
    fn test_missing_template_falls_back_to_blank() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("deck.pptx");

        let report = DocumentAssembler::new(Some(dir.path().join("nope.pptx")))
            .assemble(OUTLINE, &[], &output)
            .unwrap();
        assert_eq!(report.slide_count, 5);
        assert!(read_entries(&output).contains_key("ppt/slideLayouts/slideLayout2.xml"));
    }

    #[test]
    fn test_broken_template_falls_back_to_blank() {
        let dir = tempfile::tempdir().unwrap();
        let template = dir.path().join("broken.pptx");
        std::fs::write(&template, b"PK but not really").unwrap();
        let output = dir.path().join("deck.pptx");

        let report = DocumentAssembler::new(Some(template))
            .assemble(OUTLINE, &[], &output)
            .unwrap();
        assert_eq!(report.slide_count, 5);
    }

    #[test]
    fn test_template_slides_are_replaced() {
        let dir = tempfile::tempdir().unwrap();
        let template = dir.path().join("dark.pptx");
        write_template(&template, 4);
        let output = dir.path().join("deck.pptx");

        let report = DocumentAssembler::new(Some(template))
            .assemble("Title: Fresh\n---\nSlide 1: Only\n- one\n---", &[], &output)
            .unwrap();
        assert_eq!(report.slide_count, 2);

        let entries = read_entries(&output);
        assert!(!entries.contains_key("ppt/slides/slide3.xml"));
        assert!(!entries.contains_key("ppt/notesSlides/notesSlide1.xml"));
        assert!(!entries.values().any(|xml| xml.contains("old slide")));
        assert_eq!(entries["ppt/presentation.xml"].matches("<p:sldId ").count(), 2);
        assert_eq!(slide_texts(&entries)[1], vec!["Only", "one"]);
    }

    #[test]
    fn test_cleanup_dir_removed_after_save() {
        let dir = tempfile::tempdir().unwrap();
        let images_dir = dir.path().join("images/presentation_1234");
        std::fs::create_dir_all(&images_dir).unwrap();
        let images = vec![Some(png_in(&images_dir, "key.png"))];
        let output = dir.path().join("deck.pptx");

        DocumentAssembler::new(None)
            .with_cleanup_dir(&images_dir)
            .assemble(OUTLINE, &images, &output)
            .unwrap();
        assert!(output.exists());
        assert!(!images_dir.exists());
    }

    #[test]
    fn test_title_text_is_escaped() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("deck.pptx");
        DocumentAssembler::new(None)
            .assemble("Title: Q&A <live>\n---\nSlide 1: R&D\n- a < b\n---", &[], &output)
            .unwrap();

        let entries = read_entries(&output);
        assert!(entries["ppt/slides/slide1.xml"].contains("Q&amp;A &lt;live&gt;"));
        assert!(entries["ppt/slides/slide2.xml"].contains("<a:t>a &lt; b</a:t>"));
    }

    #[test]
    fn test_control_characters_do_not_corrupt_slides() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("deck.pptx");
        DocumentAssembler::new(None)
            .assemble(
                "Title: T\n---\nSlide 1: A\n- form\u{0C}feed and \u{1B}[0m esc\n---",
                &[],
                &output,
            )
            .unwrap();

        let entries = read_entries(&output);
        let slide = &entries["ppt/slides/slide2.xml"];
        assert!(!slide.chars().any(|c| matches!(c, '\u{0}'..='\u{8}' | '\u{B}' | '\u{C}' | '\u{E}'..='\u{1F}')));

        let mut reader = quick_xml::Reader::from_str(slide);
        let mut texts = Vec::new();
        loop {
            match reader.read_event().unwrap() {
                quick_xml::events::Event::Text(t) => texts.push(t.unescape().unwrap().into_owned()),
                quick_xml::events::Event::Eof => break,
                _ => {}
            }
        }
        assert!(texts.contains(&"formfeed and [0m esc".to_string()));
    }
}
