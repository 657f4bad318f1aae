mod shapes;
mod writer;

pub use writer::{save, to_bytes};

use std::collections::HashMap;
use std::io::{Read, Seek};
use std::path::Path;

use crate::error::Error;
use crate::model::{Deck, Part, Slide, SlideOrigin, Transform};

pub(crate) const PML_NS: &str = "http://schemas.openxmlformats.org/presentationml/2006/main";
pub(crate) const DML_NS: &str = "http://schemas.openxmlformats.org/drawingml/2006/main";
pub(crate) const REL_NS: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const MC_NS: &str = "http://schemas.openxmlformats.org/markup-compatibility/2006";

pub(crate) const RT_OFFICE_DOCUMENT: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument";
pub(crate) const RT_SLIDE: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/slide";
pub(crate) const RT_SLIDE_LAYOUT: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideLayout";
pub(crate) const RT_IMAGE: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/image";

/// 10in x 7.5in, the size PowerPoint assumes when `p:sldSz` is missing.
const DEFAULT_SLIDE_SIZE: (i64, i64) = (9_144_000, 6_858_000);

pub(crate) fn pml<'a>(node: roxmltree::Node<'a, 'a>, name: &str) -> Option<roxmltree::Node<'a, 'a>> {
    node.children()
        .find(|n| n.tag_name().name() == name && n.tag_name().namespace() == Some(PML_NS))
}

pub(crate) fn dml<'a>(node: roxmltree::Node<'a, 'a>, name: &str) -> Option<roxmltree::Node<'a, 'a>> {
    node.children()
        .find(|n| n.tag_name().name() == name && n.tag_name().namespace() == Some(DML_NS))
}

pub(crate) fn emu_attr(node: roxmltree::Node, attr: &str) -> Option<i64> {
    node.attribute(attr).and_then(|v| v.trim().parse::<i64>().ok())
}

pub(crate) fn bool_attr(node: roxmltree::Node, attr: &str) -> Option<bool> {
    node.attribute(attr).map(|v| matches!(v, "1" | "true" | "on"))
}

#[derive(Clone, Debug, PartialEq)]
pub(crate) struct Relationship {
    pub id: String,
    pub rel_type: String,
    pub target: String,
    pub external: bool,
}

pub(crate) fn parse_rels_xml(xml_content: &str) -> Vec<Relationship> {
    let Ok(xml) = roxmltree::Document::parse(xml_content) else {
        return Vec::new();
    };
    xml.root_element()
        .children()
        .filter(|n| n.tag_name().name() == "Relationship")
        .filter_map(|n| {
            Some(Relationship {
                id: n.attribute("Id")?.to_string(),
                rel_type: n.attribute("Type").unwrap_or("").to_string(),
                target: n.attribute("Target")?.to_string(),
                external: n.attribute("TargetMode") == Some("External"),
            })
        })
        .collect()
}

/// "ppt/slides/slide1.xml" -> "ppt/slides/_rels/slide1.xml.rels"
pub(crate) fn rels_path(part: &str) -> String {
    match part.rsplit_once('/') {
        Some((dir, file)) => format!("{dir}/_rels/{file}.rels"),
        None => format!("_rels/{part}.rels"),
    }
}

/// Resolve a relationship target against the part that owns the relationship.
pub(crate) fn resolve_target(source_part: &str, target: &str) -> String {
    if let Some(abs) = target.strip_prefix('/') {
        return abs.to_string();
    }
    let mut segments: Vec<&str> = match source_part.rsplit_once('/') {
        Some((dir, _)) => dir.split('/').filter(|s| !s.is_empty()).collect(),
        None => Vec::new(),
    };
    for seg in target.split('/') {
        match seg {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            s => segments.push(s),
        }
    }
    segments.join("/")
}

/// Relative target from `source_part` to `target_part`, both package paths.
pub(crate) fn relative_target(source_part: &str, target_part: &str) -> String {
    let source_dir: Vec<&str> = match source_part.rsplit_once('/') {
        Some((dir, _)) => dir.split('/').collect(),
        None => Vec::new(),
    };
    let target: Vec<&str> = target_part.split('/').collect();
    let common = source_dir
        .iter()
        .zip(&target)
        .take_while(|(a, b)| a == b)
        .count();
    let mut out: Vec<&str> = vec![".."; source_dir.len() - common];
    out.extend(&target[common..]);
    out.join("/")
}

/// All parts of an OPC package, in archive order, with lookup by name.
struct Package {
    parts: Vec<Part>,
    index: HashMap<String, usize>,
}

impl Package {
    fn read<R: Read + Seek>(zip: &mut zip::ZipArchive<R>) -> Result<Self, Error> {
        let mut parts = Vec::with_capacity(zip.len());
        for i in 0..zip.len() {
            let mut entry = zip.by_index(i)?;
            if entry.is_dir() {
                continue;
            }
            let mut data = Vec::with_capacity(entry.size() as usize);
            entry.read_to_end(&mut data)?;
            parts.push(Part {
                name: entry.name().trim_start_matches('/').to_string(),
                data,
            });
        }
        Ok(Self::from_parts(parts))
    }

    fn from_parts(parts: Vec<Part>) -> Self {
        let index = parts
            .iter()
            .enumerate()
            .map(|(i, p)| (p.name.clone(), i))
            .collect();
        Self { parts, index }
    }

    fn get(&self, name: &str) -> Option<&[u8]> {
        self.index.get(name).map(|&i| self.parts[i].data.as_slice())
    }

    fn text(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(|data| std::str::from_utf8(data).ok())
    }

    fn relationships(&self, part: &str) -> Vec<Relationship> {
        self.text(&rels_path(part))
            .map(parse_rels_xml)
            .unwrap_or_default()
    }

    fn main_part(&self) -> String {
        main_part_from(self.text("_rels/.rels"))
    }

    fn into_parts(self) -> Vec<Part> {
        self.parts
    }
}

/// Main presentation part named by the package root relationships.
pub(crate) fn main_part_from(root_rels: Option<&str>) -> String {
    let root = root_rels.map(parse_rels_xml).unwrap_or_default();
    root.iter()
        .find(|r| r.rel_type == RT_OFFICE_DOCUMENT)
        .map(|r| resolve_target("", &r.target))
        .unwrap_or_else(|| "ppt/presentation.xml".to_string())
}

/// Placeholder frames a slide placeholder without its own `a:xfrm` inherits.
#[derive(Clone, Debug, Default)]
pub(crate) struct InheritedFrames {
    entries: Vec<(Option<String>, String, Transform)>,
}

impl InheritedFrames {
    fn collect(package: &Package, part: &str) -> Self {
        let mut entries = Vec::new();
        if let Some(text) = package.text(part)
            && let Ok(xml) = roxmltree::Document::parse(text)
        {
            for node in xml.descendants() {
                if node.tag_name().name() != "ph" || node.tag_name().namespace() != Some(PML_NS) {
                    continue;
                }
                let Some(shape) = node.ancestors().find(|a| {
                    matches!(a.tag_name().name(), "sp" | "pic" | "graphicFrame")
                        && a.tag_name().namespace() == Some(PML_NS)
                }) else {
                    continue;
                };
                if let Some(transform) = shapes::shape_transform(shape) {
                    entries.push((
                        node.attribute("idx").map(String::from),
                        normalize_ph_type(node.attribute("type")),
                        transform,
                    ));
                }
            }
        }
        Self { entries }
    }

    fn chain(mut self, fallback: InheritedFrames) -> Self {
        self.entries.extend(fallback.entries);
        self
    }

    pub(crate) fn lookup(&self, idx: Option<&str>, ph_type: Option<&str>) -> Option<Transform> {
        let ph_type = normalize_ph_type(ph_type);
        idx.and_then(|idx| {
            self.entries
                .iter()
                .find(|(i, _, _)| i.as_deref() == Some(idx))
        })
        .or_else(|| self.entries.iter().find(|(_, t, _)| *t == ph_type))
        .map(|(_, _, t)| *t)
    }
}

fn normalize_ph_type(ph_type: Option<&str>) -> String {
    match ph_type.unwrap_or("body") {
        "ctrTitle" => "title".to_string(),
        "subTitle" | "obj" => "body".to_string(),
        t => t.to_string(),
    }
}

/// Open a `.pptx` file into an in-memory deck.
pub fn open(path: &Path) -> Result<Deck, Error> {
    let file = std::fs::File::open(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound | std::io::ErrorKind::PermissionDenied => Error::Io(
            std::io::Error::new(e.kind(), format!("{}: {}", e, path.display())),
        ),
        _ => Error::Io(e),
    })?;
    let mut zip = zip::ZipArchive::new(file)
        .map_err(|_| Error::InvalidPptx("file is not a ZIP archive".into()))?;
    read_deck(&mut zip)
}

pub fn open_bytes(bytes: &[u8]) -> Result<Deck, Error> {
    let mut zip = zip::ZipArchive::new(std::io::Cursor::new(bytes))
        .map_err(|_| Error::InvalidPptx("data is not a ZIP archive".into()))?;
    read_deck(&mut zip)
}

fn read_deck<R: Read + Seek>(zip: &mut zip::ZipArchive<R>) -> Result<Deck, Error> {
    let package = Package::read(zip)?;
    let main = package.main_part();
    let pres_text = package.text(&main).ok_or_else(|| {
        Error::InvalidPptx(format!("missing {main} (is this a PPTX file?)"))
    })?;
    let pres = roxmltree::Document::parse(pres_text)?;
    let root = pres.root_element();
    if root.tag_name().name() != "presentation" || root.tag_name().namespace() != Some(PML_NS) {
        return Err(Error::InvalidPptx(format!("{main} is not a presentation part")));
    }

    let (slide_width, slide_height) = pml(root, "sldSz")
        .and_then(|sz| Some((emu_attr(sz, "cx")?, emu_attr(sz, "cy")?)))
        .unwrap_or(DEFAULT_SLIDE_SIZE);

    let pres_rels = package.relationships(&main);
    let target_of = |rid: &str| {
        pres_rels
            .iter()
            .find(|r| r.id == rid && !r.external)
            .map(|r| resolve_target(&main, &r.target))
    };

    let master = pml(root, "sldMasterIdLst")
        .and_then(|lst| lst.children().find(|n| n.is_element()))
        .and_then(|n| n.attribute((REL_NS, "id")))
        .and_then(target_of);
    let layouts: Vec<String> = match &master {
        Some(master) => master_layouts(&package, master)?,
        None => Vec::new(),
    };
    let master_frames = master
        .as_deref()
        .map(|m| InheritedFrames::collect(&package, m))
        .unwrap_or_default();

    let slide_parts: Vec<String> = pml(root, "sldIdLst")
        .into_iter()
        .flat_map(|lst| lst.children())
        .filter(|n| n.tag_name().name() == "sldId")
        .filter_map(|n| n.attribute((REL_NS, "id")))
        .map(|rid| {
            target_of(rid).ok_or_else(|| {
                Error::InvalidPptx(format!("slide relationship {rid} not found in {main}"))
            })
        })
        .collect::<Result<_, _>>()?;

    let mut slides = Vec::with_capacity(slide_parts.len());
    for part in &slide_parts {
        let text = package
            .text(part)
            .ok_or_else(|| Error::InvalidPptx(format!("missing slide part {part}")))?;
        let rels = package.relationships(part);
        let layout_part = rels
            .iter()
            .find(|r| r.rel_type == RT_SLIDE_LAYOUT)
            .map(|r| resolve_target(part, &r.target));
        let layout = layout_part
            .as_deref()
            .and_then(|lp| layouts.iter().position(|l| l == lp))
            .unwrap_or(0);
        let frames = layout_part
            .as_deref()
            .map(|lp| InheritedFrames::collect(&package, lp))
            .unwrap_or_default()
            .chain(master_frames.clone());

        let xml = roxmltree::Document::parse(text)?;
        let sp_tree = pml(xml.root_element(), "cSld")
            .and_then(|c| pml(c, "spTree"))
            .ok_or_else(|| Error::InvalidPptx(format!("{part} has no p:cSld/p:spTree")))?;
        let mut ctx = shapes::SlideContext::new(part, &rels, &package, &frames);
        let shapes = shapes::parse_sp_tree(sp_tree, &mut ctx);
        log::debug!("{part}: {} top-level shapes, layout {layout}", shapes.len());
        slides.push(Slide {
            origin: SlideOrigin::Package(part.clone()),
            layout,
            shapes,
            images: ctx.into_images(),
        });
    }

    drop(pres);
    Ok(Deck {
        slide_width,
        slide_height,
        slides,
        layouts,
        parts: package.into_parts(),
    })
}

fn master_layouts(package: &Package, master: &str) -> Result<Vec<String>, Error> {
    let Some(text) = package.text(master) else {
        return Err(Error::InvalidPptx(format!("missing slide master {master}")));
    };
    let xml = roxmltree::Document::parse(text)?;
    let rels = package.relationships(master);
    Ok(pml(xml.root_element(), "sldLayoutIdLst")
        .into_iter()
        .flat_map(|lst| lst.children())
        .filter(|n| n.tag_name().name() == "sldLayoutId")
        .filter_map(|n| n.attribute((REL_NS, "id")))
        .filter_map(|rid| rels.iter().find(|r| r.id == rid))
        .map(|r| resolve_target(master, &r.target))
        .collect())
}

/// Children of `mc:AlternateContent` to read in its place: the fallback branch.
pub(crate) fn alternate_content_fallback<'a>(
    node: roxmltree::Node<'a, 'a>,
) -> Option<roxmltree::Node<'a, 'a>> {
    node.children()
        .find(|n| n.tag_name().name() == "Fallback" && n.tag_name().namespace() == Some(MC_NS))
}

pub(crate) fn is_alternate_content(node: roxmltree::Node) -> bool {
    node.tag_name().name() == "AlternateContent" && node.tag_name().namespace() == Some(MC_NS)
}
