//! DrawingML/PresentationML fragments for generated slides.
//!
//! Shapes are written straight into a `String` with `write!`; positions are
//! in EMUs (914400 per inch).

use super::skeleton::NS_DECL;
use crate::error::{DocumentError, DocumentResult};
use std::fmt::Write as FmtWrite;

pub(crate) const EMU_PER_INCH: i64 = 914_400;

/// Convert inches to EMUs.
pub(crate) fn inches(value: f64) -> i64 {
    (value * EMU_PER_INCH as f64).round() as i64
}

/// Characters XML 1.0 does not allow anywhere in a document, even escaped.
fn is_forbidden_in_xml(c: char) -> bool {
    matches!(
        c,
        '\u{0}'..='\u{8}' | '\u{B}' | '\u{C}' | '\u{E}'..='\u{1F}' | '\u{FFFE}' | '\u{FFFF}'
    )
}

/// Escape XML special characters and drop characters XML cannot carry.
pub(crate) fn escape_xml(s: &str) -> String {
    if s.chars().any(is_forbidden_in_xml) {
        let cleaned: String = s.chars().filter(|c| !is_forbidden_in_xml(*c)).collect();
        quick_xml::escape::escape(cleaned.as_str()).into_owned()
    } else {
        quick_xml::escape::escape(s).into_owned()
    }
}

/// Position and size of a shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Frame {
    pub x: i64,
    pub y: i64,
    pub cx: i64,
    pub cy: i64,
}

impl Frame {
    pub(crate) fn inches(x: f64, y: f64, cx: f64, cy: f64) -> Self {
        Self {
            x: inches(x),
            y: inches(y),
            cx: inches(cx),
            cy: inches(cy),
        }
    }
}

/// Character formatting for one paragraph.
#[derive(Debug, Clone, Default)]
pub(crate) struct TextStyle {
    pub size_pt: Option<u32>,
    pub bold: bool,
    pub font: Option<&'static str>,
    /// RGB hex, e.g. "FFFFFF"
    pub color: Option<&'static str>,
}

/// One paragraph of a text box. Embedded newlines become line breaks.
#[derive(Debug, Clone)]
pub(crate) struct Para {
    pub text: String,
    pub style: TextStyle,
    pub centered: bool,
    pub bullet: bool,
}

impl Para {
    pub(crate) fn plain(text: impl Into<String>, style: TextStyle) -> Self {
        Self {
            text: text.into(),
            style,
            centered: false,
            bullet: false,
        }
    }
}

/// Which layout placeholder a shape fills.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct PlaceholderRef {
    pub ph_type: String,
    pub idx: Option<String>,
}

/// Accumulates the shapes of one slide.
pub(crate) struct SlideXml {
    body: String,
    next_id: u32,
}

fn fmt_err(e: std::fmt::Error) -> DocumentError {
    DocumentError::xml("slide", e)
}

impl SlideXml {
    pub(crate) fn new() -> Self {
        Self {
            body: String::with_capacity(2048),
            // id 1 is the group shape of the tree
            next_id: 2,
        }
    }

    fn take_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// A free-standing text box, optionally on a solid fill.
    pub(crate) fn text_box(
        &mut self,
        frame: Frame,
        paragraphs: &[Para],
        fill: Option<&str>,
    ) -> DocumentResult<()> {
        let id = self.take_id();
        let xml = &mut self.body;

        xml.push_str("<p:sp><p:nvSpPr>");
        write!(xml, r#"<p:cNvPr id="{id}" name="TextBox {id}"/>"#).map_err(fmt_err)?;
        xml.push_str(r#"<p:cNvSpPr txBox="1"/><p:nvPr/></p:nvSpPr>"#);

        xml.push_str("<p:spPr><a:xfrm>");
        write!(xml, r#"<a:off x="{}" y="{}"/>"#, frame.x, frame.y).map_err(fmt_err)?;
        write!(xml, r#"<a:ext cx="{}" cy="{}"/>"#, frame.cx, frame.cy).map_err(fmt_err)?;
        xml.push_str(r#"</a:xfrm><a:prstGeom prst="rect"><a:avLst/></a:prstGeom>"#);
        match fill {
            Some(color) => {
                write!(xml, r#"<a:solidFill><a:srgbClr val="{color}"/></a:solidFill>"#)
                    .map_err(fmt_err)?
            }
            None => xml.push_str("<a:noFill/>"),
        }
        xml.push_str("</p:spPr>");

        xml.push_str(r#"<p:txBody><a:bodyPr wrap="square" rtlCol="0"><a:spAutoFit/></a:bodyPr><a:lstStyle/>"#);
        write_paragraphs(xml, paragraphs)?;
        xml.push_str("</p:txBody></p:sp>");
        Ok(())
    }

    /// A shape that inherits position and formatting from a layout placeholder.
    pub(crate) fn placeholder(&mut self, ph: &PlaceholderRef, text: &str) -> DocumentResult<()> {
        let id = self.take_id();
        let xml = &mut self.body;

        xml.push_str("<p:sp><p:nvSpPr>");
        write!(xml, r#"<p:cNvPr id="{id}" name="Placeholder {id}"/>"#).map_err(fmt_err)?;
        xml.push_str(r#"<p:cNvSpPr><a:spLocks noGrp="1"/></p:cNvSpPr><p:nvPr>"#);
        write!(xml, r#"<p:ph type="{}""#, escape_xml(&ph.ph_type)).map_err(fmt_err)?;
        if let Some(idx) = &ph.idx {
            write!(xml, r#" idx="{}""#, escape_xml(idx)).map_err(fmt_err)?;
        }
        xml.push_str("/></p:nvPr></p:nvSpPr><p:spPr/>");
        xml.push_str("<p:txBody><a:bodyPr/><a:lstStyle/>");
        write_paragraphs(xml, &[Para::plain(text, TextStyle::default())])?;
        xml.push_str("</p:txBody></p:sp>");
        Ok(())
    }

    /// A picture stretched into `frame`, referencing an image relationship.
    pub(crate) fn picture(&mut self, frame: Frame, rel_id: &str, descr: &str) -> DocumentResult<()> {
        let id = self.take_id();
        let xml = &mut self.body;

        xml.push_str("<p:pic><p:nvPicPr>");
        write!(
            xml,
            r#"<p:cNvPr id="{id}" name="Picture {id}" descr="{}"/>"#,
            escape_xml(descr)
        )
        .map_err(fmt_err)?;
        xml.push_str(r#"<p:cNvPicPr><a:picLocks noChangeAspect="1"/></p:cNvPicPr><p:nvPr/></p:nvPicPr>"#);
        write!(
            xml,
            r#"<p:blipFill><a:blip r:embed="{rel_id}"/><a:stretch><a:fillRect/></a:stretch></p:blipFill>"#
        )
        .map_err(fmt_err)?;
        xml.push_str("<p:spPr><a:xfrm>");
        write!(xml, r#"<a:off x="{}" y="{}"/>"#, frame.x, frame.y).map_err(fmt_err)?;
        write!(xml, r#"<a:ext cx="{}" cy="{}"/>"#, frame.cx, frame.cy).map_err(fmt_err)?;
        xml.push_str(r#"</a:xfrm><a:prstGeom prst="rect"><a:avLst/></a:prstGeom></p:spPr></p:pic>"#);
        Ok(())
    }

    /// Wrap the shapes into a complete `p:sld` document.
    pub(crate) fn finish(self) -> String {
        let mut xml = String::with_capacity(self.body.len() + 512);
        xml.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
        xml.push('\n');
        xml.push_str("<p:sld ");
        xml.push_str(NS_DECL);
        xml.push_str("><p:cSld><p:spTree>");
        xml.push_str(r#"<p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr>"#);
        xml.push_str(r#"<p:grpSpPr><a:xfrm><a:off x="0" y="0"/><a:ext cx="0" cy="0"/><a:chOff x="0" y="0"/><a:chExt cx="0" cy="0"/></a:xfrm></p:grpSpPr>"#);
        xml.push_str(&self.body);
        xml.push_str("</p:spTree></p:cSld><p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr></p:sld>");
        xml
    }
}

fn write_paragraphs(xml: &mut String, paragraphs: &[Para]) -> DocumentResult<()> {
    if paragraphs.is_empty() {
        xml.push_str("<a:p/>");
        return Ok(());
    }

    for para in paragraphs {
        xml.push_str("<a:p>");
        if para.bullet {
            xml.push_str(r#"<a:pPr marL="285750" lvl="0" indent="-285750"><a:buFont typeface="Arial"/><a:buChar char="&#8226;"/></a:pPr>"#);
        } else if para.centered {
            xml.push_str(r#"<a:pPr algn="ctr"/>"#);
        }

        let rpr = run_properties(&para.style)?;
        for (i, line) in para.text.split('\n').enumerate() {
            if i > 0 {
                write!(xml, "<a:br>{rpr}</a:br>").map_err(fmt_err)?;
            }
            write!(xml, "<a:r>{rpr}<a:t>{}</a:t></a:r>", escape_xml(line)).map_err(fmt_err)?;
        }
        xml.push_str("</a:p>");
    }
    Ok(())
}

fn run_properties(style: &TextStyle) -> DocumentResult<String> {
    let mut rpr = String::from(r#"<a:rPr lang="en-US" dirty="0""#);
    if let Some(size) = style.size_pt {
        write!(rpr, r#" sz="{}""#, size * 100).map_err(fmt_err)?;
    }
    if style.bold {
        rpr.push_str(r#" b="1""#);
    }
    rpr.push('>');
    if let Some(color) = style.color {
        write!(rpr, r#"<a:solidFill><a:srgbClr val="{color}"/></a:solidFill>"#).map_err(fmt_err)?;
    }
    if let Some(font) = style.font {
        let font = escape_xml(font);
        write!(rpr, r#"<a:latin typeface="{font}"/><a:cs typeface="{font}"/>"#).map_err(fmt_err)?;
    }
    rpr.push_str("</a:rPr>");
    Ok(rpr)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inches_to_emu() {
        assert_eq!(inches(1.0), 914_400);
        assert_eq!(inches(6.5), 5_943_600);
        assert_eq!(inches(0.3), 274_320);
    }

    #[test]
    fn test_escape_xml() {
        assert_eq!(escape_xml(r#"<a & "b">"#), "&lt;a &amp; &quot;b&quot;&gt;");
    }

    #[test]
    fn test_escape_xml_drops_control_characters() {
        assert_eq!(escape_xml("form\u{0C}feed \u{1B}[0m\u{0}"), "formfeed [0m");
        assert_eq!(escape_xml("tab\tand\nnewline"), "tab\tand\nnewline");
    }

    #[test]
    fn test_text_box_bold_centered() {
        let mut slide = SlideXml::new();
        let para = Para {
            text: "R&D".to_string(),
            style: TextStyle {
                size_pt: Some(32),
                bold: true,
                ..TextStyle::default()
            },
            centered: true,
            bullet: false,
        };
        slide
            .text_box(Frame::inches(1.0, 0.3, 8.0, 1.0), &[para], None)
            .unwrap();
        let xml = slide.finish();
        assert!(xml.contains(r#"sz="3200" b="1""#));
        assert!(xml.contains(r#"<a:pPr algn="ctr"/>"#));
        assert!(xml.contains("<a:t>R&amp;D</a:t>"));
        assert!(xml.contains(r#"<p:cNvPr id="2""#));
    }

    #[test]
    fn test_multiline_paragraph_uses_breaks() {
        let mut slide = SlideXml::new();
        let para = Para::plain("a\nb", TextStyle::default());
        slide
            .text_box(Frame::inches(0.0, 0.0, 1.0, 1.0), &[para], Some("282828"))
            .unwrap();
        let xml = slide.finish();
        assert_eq!(xml.matches("<a:br>").count(), 1);
        assert!(xml.contains(r#"<a:srgbClr val="282828"/>"#));
    }

    #[test]
    fn test_placeholder_and_picture_ids_increment() {
        let mut slide = SlideXml::new();
        let ph = PlaceholderRef {
            ph_type: "subTitle".to_string(),
            idx: Some("1".to_string()),
        };
        slide.placeholder(&ph, "Generated Presentation").unwrap();
        slide
            .picture(Frame::inches(6.5, 1.0, 3.0, 4.0), "rId2", "a river")
            .unwrap();
        let xml = slide.finish();
        assert!(xml.contains(r#"<p:ph type="subTitle" idx="1"/>"#));
        assert!(xml.contains(r#"<a:blip r:embed="rId2"/>"#));
        assert!(xml.contains(r#"<p:cNvPr id="3" name="Picture 3""#));
    }
}
