use std::collections::{HashMap, HashSet};
use std::fmt::Write as _;
use std::io::{Cursor, Write};
use std::path::Path;

use zip::write::{SimpleFileOptions, ZipWriter};

use super::{
    PML_NS, REL_NS, RT_IMAGE, RT_SLIDE, RT_SLIDE_LAYOUT, main_part_from, parse_rels_xml, pml,
    rels_path, relative_target,
};
use crate::error::Error;
use crate::model::{
    Alignment, ArrowHead, Color, Deck, Fill, Font, ImageData, ImageId, LineStyle, Paragraph,
    Shadow, Shape, ShapeContent, Slide, SlideOrigin, TextBody, Transform, image_content_type,
};

const CT_NS: &str = "http://schemas.openxmlformats.org/package/2006/content-types";
const CT_SLIDE: &str = "application/vnd.openxmlformats-officedocument.presentationml.slide+xml";
const CONTENT_TYPES: &str = "[Content_Types].xml";

fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

/// Write `deck` as a `.pptx` file.
pub fn save(deck: &Deck, path: &Path) -> Result<(), Error> {
    let bytes = to_bytes(deck)?;
    std::fs::write(path, bytes).map_err(|e| {
        Error::Io(std::io::Error::new(e.kind(), format!("{}: {}", e, path.display())))
    })
}

/// Serialize `deck` to `.pptx` bytes.
///
/// Template parts are copied unchanged except for the presentation part, its
/// relationships and the content types, into which generated slides are spliced.
pub fn to_bytes(deck: &Deck) -> Result<Vec<u8>, Error> {
    let part_text = |name: &str| {
        deck.parts
            .iter()
            .find(|p| p.name == name)
            .and_then(|p| std::str::from_utf8(&p.data).ok())
    };
    let main = main_part_from(part_text("_rels/.rels"));
    let main_rels = rels_path(&main);
    let pres_text = part_text(&main)
        .ok_or_else(|| Error::InvalidPptx(format!("missing {main}")))?;
    let content_types = part_text(CONTENT_TYPES)
        .ok_or_else(|| Error::InvalidPptx(format!("missing {CONTENT_TYPES}")))?;
    let pres_rels_text = part_text(&main_rels).unwrap_or(EMPTY_RELS);

    let existing: HashSet<&str> = deck.parts.iter().map(|p| p.name.as_str()).collect();
    let mut media = MediaStore::new(&existing);
    let mut next_slide = next_number(&existing, "ppt/slides/slide", ".xml");
    let mut new_parts: Vec<(String, Vec<u8>)> = Vec::new();
    let mut new_slides: Vec<String> = Vec::new();

    for slide in deck.slides.iter().filter(|s| s.origin == SlideOrigin::Generated) {
        let part = format!("ppt/slides/slide{next_slide}.xml");
        next_slide += 1;
        let layout = deck.layouts.get(slide.layout).ok_or_else(|| {
            Error::InvalidPptx(format!(
                "generated slide uses layout {} but the master has {} layouts",
                slide.layout,
                deck.layouts.len()
            ))
        })?;

        // rId1 is the layout; images follow in first-use order
        let mut rels = format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="{RT_SLIDE_LAYOUT}" Target="{}"/>"#,
            escape_xml(&relative_target(&part, layout))
        );
        let mut image_rids: HashMap<ImageId, String> = HashMap::new();
        for id in referenced_images(slide) {
            let image = slide
                .image(id)
                .ok_or_else(|| Error::Misuse(format!("{part} references missing image {}", id.0)))?;
            let media_part = media.add(image, &mut new_parts);
            let rid = format!("rId{}", image_rids.len() + 2);
            let _ = write!(
                rels,
                r#"<Relationship Id="{rid}" Type="{RT_IMAGE}" Target="{}"/>"#,
                escape_xml(&relative_target(&part, &media_part))
            );
            image_rids.insert(id, rid);
        }
        rels.push_str("</Relationships>");

        let xml = write_slide(slide, &image_rids)?;
        new_parts.push((rels_path(&part), rels.into_bytes()));
        new_parts.push((part.clone(), xml.into_bytes()));
        new_slides.push(part);
    }

    let (pres_xml, pres_rels) = splice_presentation(&main, pres_text, pres_rels_text, &new_slides)?;
    let content_types = splice_content_types(content_types, &new_slides, &media.extensions)?;

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options =
        SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);
    zip.start_file(CONTENT_TYPES, options)?;
    zip.write_all(content_types.as_bytes())?;
    for part in &deck.parts {
        let data: &[u8] = if part.name == CONTENT_TYPES {
            continue;
        } else if part.name == main {
            pres_xml.as_bytes()
        } else if part.name == main_rels {
            pres_rels.as_bytes()
        } else {
            &part.data
        };
        zip.start_file(part.name.as_str(), options)?;
        zip.write_all(data)?;
    }
    if !new_slides.is_empty() && !existing.contains(main_rels.as_str()) {
        zip.start_file(main_rels.as_str(), options)?;
        zip.write_all(pres_rels.as_bytes())?;
    }
    for (name, data) in &new_parts {
        zip.start_file(name.as_str(), options)?;
        zip.write_all(data)?;
    }
    let cursor = zip.finish()?;
    log::debug!(
        "Wrote {} generated slide(s) and {} media part(s)",
        new_slides.len(),
        media.written
    );
    Ok(cursor.into_inner())
}

const EMPTY_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"></Relationships>"#;

/// Smallest N above every existing `{prefix}N{suffix}` part.
fn next_number(existing: &HashSet<&str>, prefix: &str, suffix: &str) -> usize {
    existing
        .iter()
        .filter_map(|name| name.strip_prefix(prefix))
        .filter_map(|rest| {
            let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
            let tail = &rest[digits.len()..];
            if suffix.is_empty() || tail == suffix {
                digits.parse::<usize>().ok()
            } else {
                None
            }
        })
        .max()
        .unwrap_or(0)
        + 1
}

/// Media parts written so far; identical bytes share one part.
struct MediaStore<'d> {
    by_content: HashMap<(&'d [u8], &'d str), String>,
    next: usize,
    written: usize,
    extensions: Vec<String>,
}

impl<'d> MediaStore<'d> {
    fn new(existing: &HashSet<&str>) -> Self {
        Self {
            by_content: HashMap::new(),
            next: next_number(existing, "ppt/media/image", ""),
            written: 0,
            extensions: Vec::new(),
        }
    }

    fn add(&mut self, image: &'d ImageData, new_parts: &mut Vec<(String, Vec<u8>)>) -> String {
        let key = (&image.bytes[..], image.extension.as_str());
        if let Some(name) = self.by_content.get(&key) {
            return name.clone();
        }
        let name = format!("ppt/media/image{}.{}", self.next, image.extension);
        self.next += 1;
        self.written += 1;
        new_parts.push((name.clone(), image.bytes.to_vec()));
        if !self.extensions.iter().any(|e| *e == image.extension) {
            self.extensions.push(image.extension.clone());
        }
        self.by_content.insert(key, name.clone());
        name
    }
}

/// Images used by pictures and picture fills, in first-use order.
fn referenced_images(slide: &Slide) -> Vec<ImageId> {
    fn visit(shape: &Shape, out: &mut Vec<ImageId>) {
        let used = match &shape.content {
            ShapeContent::Picture(pic) => Some(pic.image),
            ShapeContent::AutoShape(sp) => match sp.fill {
                Fill::Picture(id) => Some(id),
                _ => None,
            },
            ShapeContent::Group(group) => {
                for child in &group.children {
                    visit(child, out);
                }
                None
            }
            _ => None,
        };
        if let Some(id) = used
            && !out.contains(&id)
        {
            out.push(id);
        }
    }
    let mut out = Vec::new();
    for shape in &slide.shapes {
        visit(shape, &mut out);
    }
    out
}

fn write_slide(slide: &Slide, image_rids: &HashMap<ImageId, String>) -> Result<String, Error> {
    let mut xml = String::with_capacity(4096);
    xml.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
    xml.push('\n');
    let _ = write!(
        xml,
        r#"<p:sld xmlns:a="{DML}" xmlns:r="{REL_NS}" xmlns:p="{PML_NS}"><p:cSld><p:spTree>"#,
        DML = super::DML_NS
    );
    xml.push_str(
        r#"<p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr><a:xfrm><a:off x="0" y="0"/><a:ext cx="0" cy="0"/><a:chOff x="0" y="0"/><a:chExt cx="0" cy="0"/></a:xfrm></p:grpSpPr>"#,
    );
    for shape in &slide.shapes {
        write_shape(&mut xml, shape, image_rids)?;
    }
    xml.push_str(r#"</p:spTree></p:cSld><p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr></p:sld>"#);
    Ok(xml)
}

fn write_shape(
    xml: &mut String,
    shape: &Shape,
    image_rids: &HashMap<ImageId, String>,
) -> Result<(), Error> {
    let name = escape_xml(&shape.name);
    match &shape.content {
        ShapeContent::Picture(pic) => {
            let rid = image_rids.get(&pic.image).ok_or_else(|| {
                Error::Misuse(format!("picture '{}' has no image relationship", shape.name))
            })?;
            let _ = write!(
                xml,
                r#"<p:pic><p:nvPicPr><p:cNvPr id="{}" name="{name}" descr="{}"/><p:cNvPicPr><a:picLocks noChangeAspect="1"/></p:cNvPicPr><p:nvPr/></p:nvPicPr><p:blipFill><a:blip r:embed="{rid}"/>"#,
                shape.id,
                escape_xml(&pic.description)
            );
            let c = pic.crop;
            if c.left != 0.0 || c.top != 0.0 || c.right != 0.0 || c.bottom != 0.0 {
                let pct = |v: f64| (v * 100_000.0).round() as i64;
                let _ = write!(
                    xml,
                    r#"<a:srcRect l="{}" t="{}" r="{}" b="{}"/>"#,
                    pct(c.left),
                    pct(c.top),
                    pct(c.right),
                    pct(c.bottom)
                );
            }
            xml.push_str(r#"<a:stretch><a:fillRect/></a:stretch></p:blipFill><p:spPr>"#);
            write_xfrm(xml, &shape.transform);
            xml.push_str(r#"<a:prstGeom prst="rect"><a:avLst/></a:prstGeom>"#);
            write_line(xml, &pic.line);
            write_shadow(xml, &shape.shadow);
            xml.push_str("</p:spPr></p:pic>");
        }
        ShapeContent::AutoShape(sp) => {
            let _ = write!(
                xml,
                r#"<p:sp><p:nvSpPr><p:cNvPr id="{}" name="{name}"/>{}<p:nvPr/></p:nvSpPr><p:spPr>"#,
                shape.id,
                if sp.text_box {
                    r#"<p:cNvSpPr txBox="1"/>"#
                } else {
                    "<p:cNvSpPr/>"
                }
            );
            write_xfrm(xml, &shape.transform);
            let _ = write!(
                xml,
                r#"<a:prstGeom prst="{}"><a:avLst/></a:prstGeom>"#,
                escape_xml(sp.preset.as_deref().unwrap_or("rect"))
            );
            write_fill(xml, &sp.fill, image_rids);
            write_line(xml, &sp.line);
            write_shadow(xml, &shape.shadow);
            xml.push_str("</p:spPr>");
            if !sp.text_box {
                xml.push_str(
                    r#"<p:style><a:lnRef idx="1"><a:schemeClr val="accent1"/></a:lnRef><a:fillRef idx="3"><a:schemeClr val="accent1"/></a:fillRef><a:effectRef idx="2"><a:schemeClr val="accent1"/></a:effectRef><a:fontRef idx="minor"><a:schemeClr val="lt1"/></a:fontRef></p:style>"#,
                );
            }
            write_text_body(xml, sp.text.as_ref(), sp.text_box);
            xml.push_str("</p:sp>");
        }
        ShapeContent::Connector(cxn) => {
            let _ = write!(
                xml,
                r#"<p:cxnSp><p:nvCxnSpPr><p:cNvPr id="{}" name="{name}"/><p:cNvCxnSpPr/><p:nvPr/></p:nvCxnSpPr><p:spPr>"#,
                shape.id
            );
            write_xfrm(xml, &shape.transform);
            let _ = write!(
                xml,
                r#"<a:prstGeom prst="{}"><a:avLst/></a:prstGeom>"#,
                escape_xml(&cxn.preset)
            );
            write_line(xml, &cxn.line);
            write_shadow(xml, &shape.shadow);
            xml.push_str(
                r#"</p:spPr><p:style><a:lnRef idx="1"><a:schemeClr val="accent1"/></a:lnRef><a:fillRef idx="0"><a:schemeClr val="accent1"/></a:fillRef><a:effectRef idx="0"><a:schemeClr val="accent1"/></a:effectRef><a:fontRef idx="minor"><a:schemeClr val="tx1"/></a:fontRef></p:style></p:cxnSp>"#,
            );
        }
        ShapeContent::Group(group) => {
            let t = &shape.transform;
            let _ = write!(
                xml,
                r#"<p:grpSp><p:nvGrpSpPr><p:cNvPr id="{}" name="{name}"/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr><a:xfrm><a:off x="{}" y="{}"/><a:ext cx="{}" cy="{}"/><a:chOff x="{}" y="{}"/><a:chExt cx="{}" cy="{}"/></a:xfrm></p:grpSpPr>"#,
                shape.id,
                t.x,
                t.y,
                t.cx,
                t.cy,
                group.child_x,
                group.child_y,
                group.child_cx,
                group.child_cy
            );
            for child in &group.children {
                write_shape(xml, child, image_rids)?;
            }
            xml.push_str("</p:grpSp>");
        }
        ShapeContent::Graphic(kind) | ShapeContent::Other(kind) => {
            return Err(Error::Misuse(format!(
                "shape '{}' ({kind}) cannot be written to a generated slide",
                shape.name
            )));
        }
    }
    Ok(())
}

fn write_xfrm(xml: &mut String, t: &Transform) {
    xml.push_str("<a:xfrm");
    let rot = ((t.rotation * 60_000.0).round() as i64).rem_euclid(21_600_000);
    if rot != 0 {
        let _ = write!(xml, r#" rot="{rot}""#);
    }
    if t.flip_h {
        xml.push_str(r#" flipH="1""#);
    }
    if t.flip_v {
        xml.push_str(r#" flipV="1""#);
    }
    let _ = write!(
        xml,
        r#"><a:off x="{}" y="{}"/><a:ext cx="{}" cy="{}"/></a:xfrm>"#,
        t.x, t.y, t.cx, t.cy
    );
}

fn write_color(xml: &mut String, color: &Color) {
    match color {
        Color::Rgb([r, g, b]) => {
            let _ = write!(xml, r#"<a:srgbClr val="{r:02X}{g:02X}{b:02X}"/>"#);
        }
        Color::Theme { scheme, brightness } => {
            let _ = write!(xml, r#"<a:schemeClr val="{}""#, escape_xml(scheme));
            let pct = |v: f64| (v * 100_000.0).round() as i64;
            if *brightness > 0.0 {
                let _ = write!(
                    xml,
                    r#"><a:lumMod val="{}"/><a:lumOff val="{}"/></a:schemeClr>"#,
                    pct(1.0 - brightness),
                    pct(*brightness)
                );
            } else if *brightness < 0.0 {
                let _ = write!(
                    xml,
                    r#"><a:lumMod val="{}"/></a:schemeClr>"#,
                    pct(1.0 + brightness)
                );
            } else {
                xml.push_str("/>");
            }
        }
    }
}

fn write_fill(xml: &mut String, fill: &Fill, image_rids: &HashMap<ImageId, String>) {
    match fill {
        Fill::Inherit | Fill::Unsupported(_) => {}
        Fill::NoFill => xml.push_str("<a:noFill/>"),
        Fill::Solid(color) => {
            xml.push_str("<a:solidFill>");
            write_color(xml, color);
            xml.push_str("</a:solidFill>");
        }
        Fill::Picture(id) => match image_rids.get(id) {
            Some(rid) => {
                let _ = write!(
                    xml,
                    r#"<a:blipFill><a:blip r:embed="{rid}"/><a:stretch><a:fillRect/></a:stretch></a:blipFill>"#
                );
            }
            None => log::warn!("Picture fill references image {} with no relationship", id.0),
        },
    }
}

fn write_arrow(xml: &mut String, tag: &str, arrow: &ArrowHead) {
    let _ = write!(xml, r#"<a:{tag} type="{}""#, arrow.kind.attr());
    if let Some(w) = arrow.width {
        let _ = write!(xml, r#" w="{}""#, w.attr());
    }
    if let Some(len) = arrow.length {
        let _ = write!(xml, r#" len="{}""#, len.attr());
    }
    xml.push_str("/>");
}

fn write_line(xml: &mut String, line: &LineStyle) {
    if line.is_inherited() {
        return;
    }
    xml.push_str("<a:ln");
    if let Some(w) = line.width {
        let _ = write!(xml, r#" w="{w}""#);
    }
    xml.push('>');
    match &line.fill {
        Fill::NoFill => xml.push_str("<a:noFill/>"),
        Fill::Solid(color) => {
            xml.push_str("<a:solidFill>");
            write_color(xml, color);
            xml.push_str("</a:solidFill>");
        }
        Fill::Inherit | Fill::Picture(_) | Fill::Unsupported(_) => {}
    }
    if let Some(dash) = line.dash {
        let _ = write!(xml, r#"<a:prstDash val="{}"/>"#, dash.preset());
    }
    if let Some(head) = &line.head {
        write_arrow(xml, "headEnd", head);
    }
    if let Some(tail) = &line.tail {
        write_arrow(xml, "tailEnd", tail);
    }
    xml.push_str("</a:ln>");
}

fn write_shadow(xml: &mut String, shadow: &Shadow) {
    match shadow {
        Shadow::Inherit => {}
        Shadow::Off => xml.push_str("<a:effectLst/>"),
        Shadow::Outer(outer) => {
            xml.push_str("<a:effectLst><a:outerShdw");
            if let Some(blur) = outer.blur_radius {
                let _ = write!(xml, r#" blurRad="{blur}""#);
            }
            if let Some(dist) = outer.distance {
                let _ = write!(xml, r#" dist="{dist}""#);
            }
            if let Some(dir) = outer.direction {
                let _ = write!(xml, r#" dir="{}""#, (dir * 60_000.0).round() as i64);
            }
            xml.push_str(r#" algn="ctr" rotWithShape="0">"#);
            match &outer.color {
                Some(color) => write_color(xml, color),
                None => xml.push_str(r#"<a:prstClr val="black"><a:alpha val="40000"/></a:prstClr>"#),
            }
            xml.push_str("</a:outerShdw></a:effectLst>");
        }
    }
}

fn write_text_body(xml: &mut String, body: Option<&TextBody>, text_box: bool) {
    if text_box {
        xml.push_str(r#"<p:txBody><a:bodyPr wrap="none" rtlCol="0"><a:spAutoFit/></a:bodyPr><a:lstStyle/>"#);
    } else {
        xml.push_str(r#"<p:txBody><a:bodyPr rtlCol="0" anchor="ctr"/><a:lstStyle/>"#);
    }
    match body.filter(|b| !b.paragraphs.is_empty()) {
        Some(body) => {
            for paragraph in &body.paragraphs {
                write_paragraph(xml, paragraph);
            }
        }
        None => xml.push_str("<a:p/>"),
    }
    xml.push_str("</p:txBody>");
}

fn write_paragraph(xml: &mut String, paragraph: &Paragraph) {
    xml.push_str("<a:p>");
    if let Some(alignment) = paragraph.alignment {
        let algn = match alignment {
            Alignment::Left => "l",
            Alignment::Center => "ctr",
            Alignment::Right => "r",
            Alignment::Justify => "just",
            Alignment::Distributed => "dist",
        };
        let _ = write!(xml, r#"<a:pPr algn="{algn}"/>"#);
    }
    for run in &paragraph.runs {
        // a newline inside a run is a soft line break
        for (i, line) in run.text.split('\n').enumerate() {
            if i > 0 {
                xml.push_str("<a:br>");
                write_run_properties(xml, &run.font);
                xml.push_str("</a:br>");
            }
            if line.is_empty() && (i > 0 || run.text.contains('\n')) {
                continue;
            }
            xml.push_str("<a:r>");
            write_run_properties(xml, &run.font);
            let _ = write!(xml, "<a:t>{}</a:t></a:r>", escape_xml(line));
        }
    }
    xml.push_str("</a:p>");
}

fn write_run_properties(xml: &mut String, font: &Font) {
    xml.push_str("<a:rPr");
    if let Some(lang) = &font.language {
        let _ = write!(xml, r#" lang="{}""#, escape_xml(lang));
    }
    if let Some(size) = font.size {
        let _ = write!(xml, r#" sz="{}""#, (size * 100.0).round() as i64);
    }
    if let Some(b) = font.bold {
        let _ = write!(xml, r#" b="{}""#, u8::from(b));
    }
    if let Some(i) = font.italic {
        let _ = write!(xml, r#" i="{}""#, u8::from(i));
    }
    if let Some(u) = font.underline {
        xml.push_str(if u { r#" u="sng""# } else { r#" u="none""# });
    }
    xml.push_str(r#" dirty="0">"#);
    if let Some(color) = &font.color {
        xml.push_str("<a:solidFill>");
        write_color(xml, color);
        xml.push_str("</a:solidFill>");
    }
    if let Some(family) = &font.family {
        let _ = write!(xml, r#"<a:latin typeface="{}"/>"#, escape_xml(family));
    }
    if let Some(family) = &font.east_asian_family {
        let _ = write!(xml, r#"<a:ea typeface="{}"/>"#, escape_xml(family));
    }
    xml.push_str("</a:rPr>");
}

/// Qualified tag name of an element as written in the source text.
fn qualified_name<'t>(text: &'t str, node: roxmltree::Node) -> &'t str {
    let start = &text[node.range().start + 1..];
    let end = start
        .find(|c: char| c.is_whitespace() || c == '>' || c == '/')
        .unwrap_or(start.len());
    &start[..end]
}

/// Insert `content` as the last children of `node`, expanding `<x/>` if needed.
fn insert_into(text: &str, node: roxmltree::Node, content: &str) -> String {
    let range = node.range();
    let element = &text[range.clone()];
    let mut out = String::with_capacity(text.len() + content.len() + 32);
    if element.ends_with("/>") {
        let qname = qualified_name(text, node);
        out.push_str(&text[..range.end - 2]);
        out.push('>');
        out.push_str(content);
        let _ = write!(out, "</{qname}>");
    } else {
        let close = range.start + element.rfind("</").unwrap_or(element.len());
        out.push_str(&text[..close]);
        out.push_str(content);
        out.push_str(&text[close..range.end]);
    }
    out.push_str(&text[range.end..]);
    out
}

fn splice_presentation(
    main: &str,
    pres_text: &str,
    rels_text: &str,
    new_slides: &[String],
) -> Result<(String, String), Error> {
    if new_slides.is_empty() {
        return Ok((pres_text.to_string(), rels_text.to_string()));
    }
    let rels = parse_rels_xml(rels_text);
    let mut next_rid = rels
        .iter()
        .filter_map(|r| r.id.strip_prefix("rId"))
        .filter_map(|n| n.parse::<usize>().ok())
        .max()
        .unwrap_or(0)
        + 1;

    let pres = roxmltree::Document::parse(pres_text)?;
    let root = pres.root_element();
    let prefix = qualified_name(pres_text, root)
        .split_once(':')
        .map(|(p, _)| format!("{p}:"))
        .unwrap_or_default();
    let r_prefix = root
        .namespaces()
        .find(|ns| ns.uri() == REL_NS)
        .and_then(|ns| ns.name())
        .map(String::from);
    let sld_id_lst = pml(root, "sldIdLst");
    let mut next_id = sld_id_lst
        .into_iter()
        .flat_map(|lst| lst.children())
        .filter_map(|n| n.attribute("id"))
        .filter_map(|v| v.parse::<u32>().ok())
        .max()
        .map(|m| m + 1)
        .unwrap_or(256)
        .max(256);

    let mut ids = String::new();
    let mut new_rels = String::new();
    for part in new_slides {
        let rid = format!("rId{next_rid}");
        next_rid += 1;
        match &r_prefix {
            Some(r) => {
                let _ = write!(ids, r#"<{prefix}sldId id="{next_id}" {r}:id="{rid}"/>"#);
            }
            None => {
                let _ = write!(
                    ids,
                    r#"<{prefix}sldId xmlns:r="{REL_NS}" id="{next_id}" r:id="{rid}"/>"#
                );
            }
        }
        next_id += 1;
        let _ = write!(
            new_rels,
            r#"<Relationship Id="{rid}" Type="{RT_SLIDE}" Target="{}"/>"#,
            escape_xml(&relative_target(main, part))
        );
    }

    let pres_xml = match sld_id_lst {
        Some(lst) => insert_into(pres_text, lst, &ids),
        None => {
            // sldIdLst precedes sldSz and everything after it
            let anchor = ["sldSz", "notesSz", "embeddedFontLst", "custShowLst", "defaultTextStyle"]
                .iter()
                .find_map(|name| pml(root, name))
                .map(|n| n.range().start)
                .ok_or_else(|| {
                    Error::InvalidPptx(format!("{main} has no place for a slide list"))
                })?;
            format!(
                "{}<{prefix}sldIdLst>{ids}</{prefix}sldIdLst>{}",
                &pres_text[..anchor],
                &pres_text[anchor..]
            )
        }
    };

    let rels_doc = roxmltree::Document::parse(rels_text)?;
    let rels_xml = insert_into(rels_text, rels_doc.root_element(), &new_rels);
    Ok((pres_xml, rels_xml))
}

fn splice_content_types(
    text: &str,
    new_slides: &[String],
    extensions: &[String],
) -> Result<String, Error> {
    let doc = roxmltree::Document::parse(text)?;
    let root = doc.root_element();
    let known: HashSet<String> = root
        .children()
        .filter(|n| n.tag_name().name() == "Default" && n.tag_name().namespace() == Some(CT_NS))
        .filter_map(|n| n.attribute("Extension"))
        .map(|e| e.to_ascii_lowercase())
        .collect();

    let mut entries = String::new();
    for ext in extensions {
        if known.contains(&ext.to_ascii_lowercase()) {
            continue;
        }
        let _ = write!(
            entries,
            r#"<Default Extension="{}" ContentType="{}"/>"#,
            escape_xml(ext),
            escape_xml(&image_content_type(ext))
        );
    }
    for part in new_slides {
        let _ = write!(
            entries,
            r#"<Override PartName="/{}" ContentType="{CT_SLIDE}"/>"#,
            escape_xml(part)
        );
    }
    if entries.is_empty() {
        return Ok(text.to_string());
    }
    Ok(insert_into(text, root, &entries))
}
