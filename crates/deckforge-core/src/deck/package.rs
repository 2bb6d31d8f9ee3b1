//! In-memory OOXML presentation package.
//!
//! Parts are kept as raw bytes keyed by zip entry name. Only the content
//! types, the presentation relationships and `presentation.xml` itself are
//! parsed and regenerated; every other template part round-trips untouched.

use super::media::content_type;
use super::skeleton;
use super::xml::{escape_xml, PlaceholderRef};
use crate::error::{DocumentError, DocumentResult};
use once_cell::sync::Lazy;
use quick_xml::events::Event;
use quick_xml::Reader;
use regex::Regex;
use std::collections::BTreeMap;
use std::fmt::Write as FmtWrite;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

const CONTENT_TYPES: &str = "[Content_Types].xml";
const PRESENTATION: &str = "ppt/presentation.xml";
const PRESENTATION_RELS: &str = "ppt/_rels/presentation.xml.rels";

const CT_NS: &str = "http://schemas.openxmlformats.org/package/2006/content-types";
const RELS_NS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";
const REL_SLIDE: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/slide";
const REL_LAYOUT: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideLayout";
const REL_IMAGE: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/image";
const CT_SLIDE: &str = "application/vnd.openxmlformats-officedocument.presentationml.slide+xml";

/// Relationship id of the picture on a generated slide (rId1 is the layout).
pub(crate) const IMAGE_REL_ID: &str = "rId2";

/// First slide id PowerPoint accepts.
const FIRST_SLIDE_ID: u32 = 256;

/// Largest single part accepted from a template.
const MAX_PART_BYTES: u64 = 64 * 1024 * 1024;
/// Up-front allocation cap; sizes declared in the archive are not trusted.
const PREALLOC_LIMIT: u64 = 1024 * 1024;

static SLD_ID_LST_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)<p:sldIdLst\s*/>|<p:sldIdLst>.*?</p:sldIdLst>").expect("sldIdLst pattern is valid")
});
static SECTION_SLD_ID_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<p14:sldId\s[^>]*/>").expect("section slide pattern is valid"));
static CUSTOM_SHOWS_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)<p:custShowLst>.*?</p:custShowLst>").expect("custom show pattern is valid")
});
static LAYOUT_PART_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^ppt/slideLayouts/slideLayout(\d+)\.xml$").expect("layout pattern is valid")
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Relationship {
    pub id: String,
    pub rel_type: String,
    pub target: String,
    pub external: bool,
}

/// A slide layout and the placeholders it declares.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct LayoutInfo {
    /// Zip entry name, e.g. `ppt/slideLayouts/slideLayout1.xml`
    pub part: String,
    /// The `type` attribute of `p:sldLayout`, if present
    pub layout_type: Option<String>,
    pub name: Option<String>,
    pub placeholders: Vec<PlaceholderRef>,
}

impl LayoutInfo {
    /// First placeholder whose type is one of `types`.
    pub(crate) fn placeholder(&self, types: &[&str]) -> Option<&PlaceholderRef> {
        types
            .iter()
            .find_map(|t| self.placeholders.iter().find(|ph| ph.ph_type == *t))
    }
}

pub(crate) struct Package {
    parts: BTreeMap<String, Vec<u8>>,
    defaults: BTreeMap<String, String>,
    overrides: BTreeMap<String, String>,
    pres_rels: Vec<Relationship>,
    layouts: Vec<LayoutInfo>,
    /// Presentation relationship id of each added slide, in order
    slides: Vec<String>,
    media_count: usize,
}

impl Package {
    /// The built-in blank package.
    pub(crate) fn blank() -> DocumentResult<Self> {
        let parts = skeleton::parts()
            .into_iter()
            .map(|(name, xml)| (name.to_string(), xml.as_bytes().to_vec()))
            .collect();
        Self::from_parts(parts)
    }

    /// Load a template package and remove every slide it contains.
    pub(crate) fn open(path: &Path) -> DocumentResult<Self> {
        let file = File::open(path)?;
        let mut archive = zip::ZipArchive::new(file)?;

        let mut parts = BTreeMap::new();
        for i in 0..archive.len() {
            let mut entry = archive.by_index(i)?;
            if entry.is_dir() {
                continue;
            }
            let name = entry.name().to_string();
            let declared = entry.size();
            let bytes = read_part(&mut entry, declared, MAX_PART_BYTES)?.ok_or_else(|| {
                DocumentError::Template {
                    path: path.to_path_buf(),
                    message: format!("part {name} exceeds {MAX_PART_BYTES} bytes"),
                }
            })?;
            parts.insert(name, bytes);
        }

        for required in [CONTENT_TYPES, PRESENTATION, PRESENTATION_RELS] {
            if !parts.contains_key(required) {
                return Err(DocumentError::Template {
                    path: path.to_path_buf(),
                    message: format!("missing part {required}"),
                });
            }
        }

        let mut package = Self::from_parts(parts)?;
        if package.layouts.is_empty() {
            return Err(DocumentError::Template {
                path: path.to_path_buf(),
                message: "no slide layouts".to_string(),
            });
        }
        package.strip_slides()?;
        Ok(package)
    }

    fn from_parts(parts: BTreeMap<String, Vec<u8>>) -> DocumentResult<Self> {
        let (defaults, overrides) = parse_content_types(part(&parts, CONTENT_TYPES)?)?;
        let pres_rels = parse_rels(PRESENTATION_RELS, part(&parts, PRESENTATION_RELS)?)?;

        let mut numbered: Vec<(u32, &String)> = parts
            .keys()
            .filter_map(|name| {
                let caps = LAYOUT_PART_RE.captures(name)?;
                let n = caps.get(1)?.as_str().parse().ok()?;
                Some((n, name))
            })
            .collect();
        numbered.sort();

        let layouts = numbered
            .into_iter()
            .map(|(_, name)| parse_layout(name, part(&parts, name)?))
            .collect::<DocumentResult<Vec<_>>>()?;

        Ok(Self {
            parts,
            defaults,
            overrides,
            pres_rels,
            layouts,
            slides: Vec::new(),
            media_count: 0,
        })
    }

    /// Remove slide relationships, slide and notes-slide parts, their
    /// content-type overrides and the slide id list.
    fn strip_slides(&mut self) -> DocumentResult<()> {
        let before = self.pres_rels.len();
        self.pres_rels.retain(|rel| rel.rel_type != REL_SLIDE);
        let removed = before - self.pres_rels.len();

        let is_slide_part =
            |name: &str| name.starts_with("ppt/slides/") || name.starts_with("ppt/notesSlides/");
        self.parts.retain(|name, _| !is_slide_part(name.as_str()));
        self.overrides
            .retain(|name, _| !is_slide_part(name.trim_start_matches('/')));

        let xml = String::from_utf8(part(&self.parts, PRESENTATION)?.to_vec())
            .map_err(|e| DocumentError::xml(PRESENTATION, e))?;
        let xml = SLD_ID_LST_RE.replace_all(&xml, "");
        let xml = SECTION_SLD_ID_RE.replace_all(&xml, "");
        let xml = CUSTOM_SHOWS_RE.replace_all(&xml, "");
        self.parts
            .insert(PRESENTATION.to_string(), xml.into_owned().into_bytes());

        tracing::debug!(removed, "Stripped template slides");
        Ok(())
    }

    pub(crate) fn layouts(&self) -> &[LayoutInfo] {
        &self.layouts
    }

    /// Layout used for the title slide: `type="title"`, else the first.
    pub(crate) fn title_layout(&self) -> Option<&LayoutInfo> {
        self.layout_of_type("title").or_else(|| self.layouts.first())
    }

    /// Layout used for content slides: `type="blank"`, else the seventh
    /// (the blank slot of the stock Office master), else the last.
    pub(crate) fn blank_layout(&self) -> Option<&LayoutInfo> {
        self.layout_of_type("blank")
            .or_else(|| self.layouts.get(6))
            .or_else(|| self.layouts.last())
    }

    fn layout_of_type(&self, layout_type: &str) -> Option<&LayoutInfo> {
        self.layouts
            .iter()
            .find(|l| l.layout_type.as_deref() == Some(layout_type))
    }

    pub(crate) fn slide_count(&self) -> usize {
        self.slides.len()
    }

    /// Store picture bytes as a new media part and return its entry name.
    pub(crate) fn add_media(&mut self, ext: &str, bytes: Vec<u8>) -> String {
        let name = loop {
            self.media_count += 1;
            let candidate = format!("ppt/media/image{}.{ext}", self.media_count);
            if !self.parts.contains_key(&candidate) {
                break candidate;
            }
        };

        self.defaults
            .entry(ext.to_string())
            .or_insert_with(|| content_type(ext).to_string());
        self.parts.insert(name.clone(), bytes);
        name
    }

    /// Append a slide built on `layout_part`, optionally linking a media
    /// part under [`IMAGE_REL_ID`].
    pub(crate) fn add_slide(
        &mut self,
        layout_part: &str,
        slide_xml: String,
        media_part: Option<&str>,
    ) -> DocumentResult<()> {
        let n = self.slides.len() + 1;
        let slide_part = format!("ppt/slides/slide{n}.xml");
        let rels_part = format!("ppt/slides/_rels/slide{n}.xml.rels");

        let mut rels = vec![Relationship {
            id: "rId1".to_string(),
            rel_type: REL_LAYOUT.to_string(),
            target: format!("../{}", layout_part.trim_start_matches("ppt/")),
            external: false,
        }];
        if let Some(media) = media_part {
            rels.push(Relationship {
                id: IMAGE_REL_ID.to_string(),
                rel_type: REL_IMAGE.to_string(),
                target: format!("../{}", media.trim_start_matches("ppt/")),
                external: false,
            });
        }

        self.parts
            .insert(rels_part.clone(), write_rels(&rels, &rels_part)?.into_bytes());
        self.parts.insert(slide_part, slide_xml.into_bytes());
        self.overrides
            .insert(format!("/ppt/slides/slide{n}.xml"), CT_SLIDE.to_string());

        let rel_id = self.next_pres_rel_id();
        self.pres_rels.push(Relationship {
            id: rel_id.clone(),
            rel_type: REL_SLIDE.to_string(),
            target: format!("slides/slide{n}.xml"),
            external: false,
        });
        self.slides.push(rel_id);
        Ok(())
    }

    fn next_pres_rel_id(&self) -> String {
        let max = self
            .pres_rels
            .iter()
            .filter_map(|rel| rel.id.strip_prefix("rId")?.parse::<u32>().ok())
            .max()
            .unwrap_or(0);
        format!("rId{}", max + 1)
    }

    /// `presentation.xml` with the slide id list for the added slides.
    fn presentation_xml(&self) -> DocumentResult<String> {
        let xml = String::from_utf8(part(&self.parts, PRESENTATION)?.to_vec())
            .map_err(|e| DocumentError::xml(PRESENTATION, e))?;
        if self.slides.is_empty() {
            return Ok(xml);
        }

        let mut list = String::from("<p:sldIdLst>");
        for (i, rel_id) in self.slides.iter().enumerate() {
            write!(
                list,
                r#"<p:sldId id="{}" r:id="{rel_id}"/>"#,
                FIRST_SLIDE_ID + i as u32
            )
            .map_err(|e| DocumentError::xml(PRESENTATION, e))?;
        }
        list.push_str("</p:sldIdLst>");

        let at = xml
            .find("<p:sldSz")
            .or_else(|| xml.find("<p:notesSz"))
            .ok_or_else(|| DocumentError::xml(PRESENTATION, "no p:sldSz or p:notesSz element"))?;
        let mut out = String::with_capacity(xml.len() + list.len());
        out.push_str(&xml[..at]);
        out.push_str(&list);
        out.push_str(&xml[at..]);
        Ok(out)
    }

    fn content_types_xml(&self) -> DocumentResult<String> {
        let fmt = |e| DocumentError::xml(CONTENT_TYPES, e);
        let mut xml = String::from(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
        xml.push('\n');
        write!(xml, r#"<Types xmlns="{CT_NS}">"#).map_err(fmt)?;
        for (ext, ct) in &self.defaults {
            write!(
                xml,
                r#"<Default Extension="{}" ContentType="{}"/>"#,
                escape_xml(ext),
                escape_xml(ct)
            )
            .map_err(fmt)?;
        }
        for (name, ct) in &self.overrides {
            write!(
                xml,
                r#"<Override PartName="{}" ContentType="{}"/>"#,
                escape_xml(name),
                escape_xml(ct)
            )
            .map_err(fmt)?;
        }
        xml.push_str("</Types>");
        Ok(xml)
    }

    /// Write the package to `path`.
    pub(crate) fn save(&self, path: &Path) -> DocumentResult<()> {
        let mut generated: BTreeMap<&str, Vec<u8>> = BTreeMap::new();
        generated.insert(PRESENTATION, self.presentation_xml()?.into_bytes());
        generated.insert(
            PRESENTATION_RELS,
            write_rels(&self.pres_rels, PRESENTATION_RELS)?.into_bytes(),
        );

        let file = File::create(path)?;
        let mut zip = zip::ZipWriter::new(file);
        let options = zip::write::SimpleFileOptions::default()
            .compression_method(zip::CompressionMethod::Deflated)
            .last_modified_time(zip::DateTime::default());

        // Content types must come first for some readers.
        zip.start_file(CONTENT_TYPES, options)?;
        zip.write_all(self.content_types_xml()?.as_bytes())?;

        for (name, bytes) in &self.parts {
            if name == CONTENT_TYPES {
                continue;
            }
            let bytes = generated.get(name.as_str()).unwrap_or(bytes);
            zip.start_file(name.as_str(), options)?;
            zip.write_all(bytes)?;
        }
        zip.finish()?;
        Ok(())
    }
}

fn part<'a>(parts: &'a BTreeMap<String, Vec<u8>>, name: &str) -> DocumentResult<&'a [u8]> {
    parts
        .get(name)
        .map(Vec::as_slice)
        .ok_or_else(|| DocumentError::xml(name, "part is missing"))
}

type ContentTypes = (BTreeMap<String, String>, BTreeMap<String, String>);

fn parse_content_types(xml: &[u8]) -> DocumentResult<ContentTypes> {
    let err = |e: &dyn std::fmt::Display| DocumentError::xml(CONTENT_TYPES, e);
    let mut defaults = BTreeMap::new();
    let mut overrides = BTreeMap::new();

    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e)) => {
                let target = match e.local_name().as_ref() {
                    b"Default" => Some((b"Extension".as_slice(), &mut defaults)),
                    b"Override" => Some((b"PartName".as_slice(), &mut overrides)),
                    _ => None,
                };

                if let Some((key_attr, map)) = target {
                    let mut key = None;
                    let mut content_type = None;
                    for attr in e.attributes() {
                        let attr = attr.map_err(|e| err(&e))?;
                        let value = attr.unescape_value().map_err(|e| err(&e))?.to_string();
                        match attr.key.as_ref() {
                            k if k == key_attr => key = Some(value),
                            b"ContentType" => content_type = Some(value),
                            _ => {}
                        }
                    }
                    if let (Some(k), Some(ct)) = (key, content_type) {
                        map.insert(k, ct);
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(err(&e)),
            _ => {}
        }
        buf.clear();
    }

    Ok((defaults, overrides))
}

fn parse_rels(part_name: &str, xml: &[u8]) -> DocumentResult<Vec<Relationship>> {
    let err = |e: &dyn std::fmt::Display| DocumentError::xml(part_name, e);
    let mut rels = Vec::new();

    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e))
                if e.local_name().as_ref() == b"Relationship" =>
            {
                let mut id = None;
                let mut rel_type = None;
                let mut target = None;
                let mut external = false;
                for attr in e.attributes() {
                    let attr = attr.map_err(|e| err(&e))?;
                    let value = attr.unescape_value().map_err(|e| err(&e))?.to_string();
                    match attr.key.as_ref() {
                        b"Id" => id = Some(value),
                        b"Type" => rel_type = Some(value),
                        b"Target" => target = Some(value),
                        b"TargetMode" => external = value == "External",
                        _ => {}
                    }
                }
                if let (Some(id), Some(rel_type), Some(target)) = (id, rel_type, target) {
                    rels.push(Relationship {
                        id,
                        rel_type,
                        target,
                        external,
                    });
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(err(&e)),
            _ => {}
        }
        buf.clear();
    }

    Ok(rels)
}

fn write_rels(rels: &[Relationship], part_name: &str) -> DocumentResult<String> {
    let fmt = |e| DocumentError::xml(part_name, e);
    let mut xml = String::from(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
    xml.push('\n');
    write!(xml, r#"<Relationships xmlns="{RELS_NS}">"#).map_err(fmt)?;
    for rel in rels {
        write!(
            xml,
            r#"<Relationship Id="{}" Type="{}" Target="{}""#,
            escape_xml(&rel.id),
            escape_xml(&rel.rel_type),
            escape_xml(&rel.target)
        )
        .map_err(fmt)?;
        if rel.external {
            xml.push_str(r#" TargetMode="External""#);
        }
        xml.push_str("/>");
    }
    xml.push_str("</Relationships>");
    Ok(xml)
}

fn parse_layout(part_name: &str, xml: &[u8]) -> DocumentResult<LayoutInfo> {
    let err = |e: &dyn std::fmt::Display| DocumentError::xml(part_name, e);
    let mut layout = LayoutInfo {
        part: part_name.to_string(),
        layout_type: None,
        name: None,
        placeholders: Vec::new(),
    };

    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e)) => {
                let local = e.local_name();
                let element = local.as_ref();
                if matches!(element, b"sldLayout" | b"cSld" | b"ph") {
                    let mut ph_type = None;
                    let mut idx = None;
                    for attr in e.attributes() {
                        let attr = attr.map_err(|e| err(&e))?;
                        let value = attr.unescape_value().map_err(|e| err(&e))?.to_string();
                        match (element, attr.key.as_ref()) {
                            (b"ph", b"type") => ph_type = Some(value),
                            (b"ph", b"idx") => idx = Some(value),
                            (b"sldLayout", b"type") => layout.layout_type = Some(value),
                            (b"cSld", b"name") => layout.name = Some(value),
                            _ => {}
                        }
                    }
                    if element == b"ph" {
                        layout.placeholders.push(PlaceholderRef {
                            // an untyped placeholder is a generic object slot
                            ph_type: ph_type.unwrap_or_else(|| "obj".to_string()),
                            idx,
                        });
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(err(&e)),
            _ => {}
        }
        buf.clear();
    }

    Ok(layout)
}

/// Read one archive entry, refusing anything larger than `limit`.
fn read_part(reader: impl Read, declared: u64, limit: u64) -> std::io::Result<Option<Vec<u8>>> {
    let mut bytes = Vec::with_capacity(declared.min(PREALLOC_LIMIT) as usize);
    reader.take(limit + 1).read_to_end(&mut bytes)?;
    Ok((bytes.len() as u64 <= limit).then_some(bytes))
}
