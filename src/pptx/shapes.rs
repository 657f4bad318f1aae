use std::collections::HashMap;

use super::{
    DML_NS, InheritedFrames, PML_NS, Package, REL_NS, RT_IMAGE, Relationship,
    alternate_content_fallback, bool_attr, dml, emu_attr, is_alternate_content, pml,
    resolve_target,
};
use crate::model::{
    Alignment, ArrowHead, ArrowSize, ArrowType, AutoShape, Color, Connector, Crop, DashStyle,
    Fill, Font, Group, ImageData, ImageId, LineStyle, OuterShadow, Paragraph, Picture,
    PlaceholderKind, Shadow, Shape, ShapeContent, TextBody, TextRun, Transform,
};

/// 60000ths of a degree per degree, the unit of `rot` and `dir`.
const ANGLE_UNIT: f64 = 60_000.0;
/// Percentages (`lumMod`, `srcRect`) are in 1000ths of a percent.
const PERCENT_UNIT: f64 = 100_000.0;

pub(super) struct SlideContext<'a> {
    part: &'a str,
    rels: &'a [Relationship],
    package: &'a Package,
    inherited: &'a InheritedFrames,
    images: Vec<ImageData>,
    loaded: HashMap<String, ImageId>,
}

impl<'a> SlideContext<'a> {
    pub(super) fn new(
        part: &'a str,
        rels: &'a [Relationship],
        package: &'a Package,
        inherited: &'a InheritedFrames,
    ) -> Self {
        Self {
            part,
            rels,
            package,
            inherited,
            images: Vec::new(),
            loaded: HashMap::new(),
        }
    }

    pub(super) fn into_images(self) -> Vec<ImageData> {
        self.images
    }

    /// Image behind an `r:embed` id, loaded once per slide.
    fn image(&mut self, rid: &str) -> Option<ImageId> {
        let rel = self
            .rels
            .iter()
            .find(|r| r.id == rid && r.rel_type == RT_IMAGE && !r.external)?;
        let target = resolve_target(self.part, &rel.target);
        if let Some(&id) = self.loaded.get(&target) {
            return Some(id);
        }
        let Some(data) = self.package.get(&target) else {
            log::warn!("{}: image part {} for {} is missing", self.part, target, rid);
            return None;
        };
        let ext = target
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .unwrap_or_else(|| "png".to_string());
        self.images.push(ImageData::sniff(data.to_vec(), &ext));
        let id = ImageId(self.images.len() - 1);
        self.loaded.insert(target, id);
        Some(id)
    }
}

fn is_pml(node: roxmltree::Node, name: &str) -> bool {
    node.tag_name().name() == name && node.tag_name().namespace() == Some(PML_NS)
}

/// Shapes of an spTree (or of a grpSp, which has the same layout).
pub(super) fn parse_sp_tree(tree: roxmltree::Node, ctx: &mut SlideContext) -> Vec<Shape> {
    let mut shapes = Vec::new();
    for node in tree.children().filter(|n| n.is_element()) {
        if is_alternate_content(node) {
            if let Some(fallback) = alternate_content_fallback(node) {
                shapes.extend(parse_sp_tree(fallback, ctx));
            }
            continue;
        }
        if matches!(
            node.tag_name().name(),
            "nvGrpSpPr" | "grpSpPr" | "extLst"
        ) {
            continue;
        }
        shapes.push(parse_shape(node, ctx));
    }
    shapes
}

fn parse_shape(node: roxmltree::Node, ctx: &mut SlideContext) -> Shape {
    let c_nv_pr = node
        .children()
        .find(|n| n.tag_name().name().starts_with("nv"))
        .and_then(|nv| pml(nv, "cNvPr"));
    let id = c_nv_pr
        .and_then(|n| n.attribute("id"))
        .and_then(|v| v.parse::<u32>().ok())
        .unwrap_or(0);
    let name = c_nv_pr
        .and_then(|n| n.attribute("name"))
        .unwrap_or("")
        .to_string();
    let ph = node
        .children()
        .find(|n| n.tag_name().name().starts_with("nv"))
        .and_then(|nv| pml(nv, "nvPr"))
        .and_then(|nv_pr| pml(nv_pr, "ph"));
    let placeholder = ph.map(|ph| match ph.attribute("type") {
        Some("pic") => PlaceholderKind::Picture,
        Some("title") | Some("ctrTitle") => PlaceholderKind::Title,
        Some("body") | None => PlaceholderKind::Body,
        Some(other) => PlaceholderKind::Other(other.to_string()),
    });

    let transform = shape_transform(node)
        .or_else(|| {
            ph.and_then(|ph| ctx.inherited.lookup(ph.attribute("idx"), ph.attribute("type")))
        })
        .unwrap_or_default();
    let sp_pr = pml(node, "spPr");
    let shadow = sp_pr.map(parse_shadow).unwrap_or_default();

    let content = match node.tag_name().name() {
        "sp" if node.tag_name().namespace() == Some(PML_NS) => {
            let text_box = node
                .children()
                .find(|n| is_pml(*n, "nvSpPr"))
                .and_then(|nv| pml(nv, "cNvSpPr"))
                .and_then(|c| bool_attr(c, "txBox"))
                .unwrap_or(false);
            ShapeContent::AutoShape(AutoShape {
                text_box,
                preset: sp_pr.and_then(preset_geometry),
                text: pml(node, "txBody").map(parse_text_body),
                fill: sp_pr.map(|pr| parse_fill(pr, ctx)).unwrap_or(Fill::Inherit),
                line: sp_pr.map(|pr| parse_line(pr, ctx)).unwrap_or_default(),
            })
        }
        "pic" if node.tag_name().namespace() == Some(PML_NS) => {
            let blip_fill = pml(node, "blipFill");
            let image = blip_fill
                .and_then(|bf| dml(bf, "blip"))
                .and_then(|blip| blip.attribute((REL_NS, "embed")))
                .and_then(|rid| ctx.image(rid));
            match image {
                Some(image) => ShapeContent::Picture(Picture {
                    image,
                    description: c_nv_pr
                        .and_then(|n| n.attribute("descr"))
                        .unwrap_or("")
                        .to_string(),
                    crop: blip_fill
                        .and_then(|bf| dml(bf, "srcRect"))
                        .map(parse_crop)
                        .unwrap_or_default(),
                    line: sp_pr.map(|pr| parse_line(pr, ctx)).unwrap_or_default(),
                }),
                None => ShapeContent::Other("pic (linked or missing image)".to_string()),
            }
        }
        "cxnSp" if node.tag_name().namespace() == Some(PML_NS) => {
            ShapeContent::Connector(Connector {
                preset: sp_pr
                    .and_then(preset_geometry)
                    .unwrap_or_else(|| "straightConnector1".to_string()),
                line: sp_pr.map(|pr| parse_line(pr, ctx)).unwrap_or_default(),
            })
        }
        "grpSp" if node.tag_name().namespace() == Some(PML_NS) => {
            let xfrm = pml(node, "grpSpPr").and_then(|pr| dml(pr, "xfrm"));
            let ch_off = xfrm.and_then(|x| dml(x, "chOff"));
            let ch_ext = xfrm.and_then(|x| dml(x, "chExt"));
            ShapeContent::Group(Group {
                child_x: ch_off.and_then(|n| emu_attr(n, "x")).unwrap_or(transform.x),
                child_y: ch_off.and_then(|n| emu_attr(n, "y")).unwrap_or(transform.y),
                child_cx: ch_ext.and_then(|n| emu_attr(n, "cx")).unwrap_or(transform.cx),
                child_cy: ch_ext.and_then(|n| emu_attr(n, "cy")).unwrap_or(transform.cy),
                children: parse_sp_tree(node, ctx),
            })
        }
        "graphicFrame" if node.tag_name().namespace() == Some(PML_NS) => {
            let uri = dml(node, "graphic")
                .and_then(|g| dml(g, "graphicData"))
                .and_then(|gd| gd.attribute("uri"))
                .unwrap_or("unknown");
            ShapeContent::Graphic(uri.to_string())
        }
        other => ShapeContent::Other(other.to_string()),
    };

    Shape {
        id,
        name,
        transform,
        placeholder,
        shadow,
        content,
    }
}

/// Own transform of a shape element, if it declares one.
pub(super) fn shape_transform(node: roxmltree::Node) -> Option<Transform> {
    let xfrm = match node.tag_name().name() {
        "grpSp" => pml(node, "grpSpPr").and_then(|pr| dml(pr, "xfrm")),
        "graphicFrame" => pml(node, "xfrm"),
        _ => pml(node, "spPr").and_then(|pr| dml(pr, "xfrm")),
    }?;
    let off = dml(xfrm, "off")?;
    let ext = dml(xfrm, "ext")?;
    Some(Transform {
        x: emu_attr(off, "x").unwrap_or(0),
        y: emu_attr(off, "y").unwrap_or(0),
        cx: emu_attr(ext, "cx").unwrap_or(0),
        cy: emu_attr(ext, "cy").unwrap_or(0),
        rotation: emu_attr(xfrm, "rot").map(|r| r as f64 / ANGLE_UNIT).unwrap_or(0.0),
        flip_h: bool_attr(xfrm, "flipH").unwrap_or(false),
        flip_v: bool_attr(xfrm, "flipV").unwrap_or(false),
    })
}

fn preset_geometry(sp_pr: roxmltree::Node) -> Option<String> {
    dml(sp_pr, "prstGeom")
        .and_then(|g| g.attribute("prst"))
        .map(String::from)
}

fn parse_crop(src_rect: roxmltree::Node) -> Crop {
    let frac = |attr: &str| {
        emu_attr(src_rect, attr)
            .map(|v| v as f64 / PERCENT_UNIT)
            .unwrap_or(0.0)
    };
    Crop {
        left: frac("l"),
        top: frac("t"),
        right: frac("r"),
        bottom: frac("b"),
    }
}

/// First fill child of `parent` (`spPr`, `ln` or `rPr`).
fn parse_fill(parent: roxmltree::Node, ctx: &mut SlideContext) -> Fill {
    for node in parent.children() {
        if node.tag_name().namespace() != Some(DML_NS) {
            continue;
        }
        match node.tag_name().name() {
            "noFill" => return Fill::NoFill,
            "solidFill" => {
                return match parse_color(node) {
                    Some(color) => Fill::Solid(color),
                    None => Fill::Unsupported("solid fill with an unsupported color model".into()),
                };
            }
            "blipFill" => {
                let image = dml(node, "blip")
                    .and_then(|blip| blip.attribute((REL_NS, "embed")))
                    .and_then(|rid| ctx.image(rid));
                return match image {
                    Some(id) => Fill::Picture(id),
                    None => Fill::Unsupported("picture fill without an embedded image".into()),
                };
            }
            "gradFill" => return Fill::Unsupported("gradient fill".into()),
            "pattFill" => return Fill::Unsupported("pattern fill".into()),
            "grpFill" => return Fill::Unsupported("group fill".into()),
            _ => {}
        }
    }
    Fill::Inherit
}

/// Color held by a fill-like element (`solidFill`, `outerShdw`, ...).
fn parse_color(parent: roxmltree::Node) -> Option<Color> {
    let node = parent
        .children()
        .find(|n| n.is_element() && n.tag_name().namespace() == Some(DML_NS))?;
    match node.tag_name().name() {
        "srgbClr" => node.attribute("val").and_then(parse_hex_color).map(Color::Rgb),
        "sysClr" => node
            .attribute("lastClr")
            .and_then(parse_hex_color)
            .map(Color::Rgb),
        "schemeClr" => {
            let scheme = node.attribute("val")?.to_string();
            let modifier = |name: &str| {
                dml(node, name)
                    .and_then(|n| emu_attr(n, "val"))
                    .map(|v| v as f64 / PERCENT_UNIT)
            };
            let brightness = match (modifier("lumMod"), modifier("lumOff")) {
                (_, Some(off)) if off > 0.0 => off,
                (Some(m), _) if m < 1.0 => m - 1.0,
                _ => 0.0,
            };
            Some(Color::Theme { scheme, brightness })
        }
        "prstClr" => match node.attribute("val")? {
            "black" => Some(Color::Rgb([0, 0, 0])),
            "white" => Some(Color::Rgb([255, 255, 255])),
            _ => None,
        },
        _ => None,
    }
}

fn parse_hex_color(val: &str) -> Option<[u8; 3]> {
    if val.len() != 6 {
        return None;
    }
    let r = u8::from_str_radix(&val[0..2], 16).ok()?;
    let g = u8::from_str_radix(&val[2..4], 16).ok()?;
    let b = u8::from_str_radix(&val[4..6], 16).ok()?;
    Some([r, g, b])
}

fn parse_line(sp_pr: roxmltree::Node, ctx: &mut SlideContext) -> LineStyle {
    let Some(ln) = dml(sp_pr, "ln") else {
        return LineStyle::default();
    };
    let arrow = |name: &str| {
        dml(ln, name).map(|end| ArrowHead {
            kind: ArrowType::from_attr(end.attribute("type").unwrap_or("none")),
            width: end.attribute("w").and_then(ArrowSize::from_attr),
            length: end.attribute("len").and_then(ArrowSize::from_attr),
        })
    };
    LineStyle {
        width: emu_attr(ln, "w"),
        dash: dml(ln, "prstDash")
            .and_then(|d| d.attribute("val"))
            .and_then(DashStyle::from_preset),
        fill: parse_fill(ln, ctx),
        head: arrow("headEnd"),
        tail: arrow("tailEnd"),
    }
}

fn parse_shadow(sp_pr: roxmltree::Node) -> Shadow {
    let Some(effects) = dml(sp_pr, "effectLst") else {
        return Shadow::Inherit;
    };
    match dml(effects, "outerShdw") {
        Some(outer) => Shadow::Outer(OuterShadow {
            blur_radius: emu_attr(outer, "blurRad"),
            distance: emu_attr(outer, "dist"),
            direction: emu_attr(outer, "dir").map(|d| d as f64 / ANGLE_UNIT),
            color: parse_color(outer),
        }),
        None => Shadow::Off,
    }
}

fn parse_text_body(tx_body: roxmltree::Node) -> TextBody {
    let paragraphs = tx_body
        .children()
        .filter(|n| n.tag_name().name() == "p" && n.tag_name().namespace() == Some(DML_NS))
        .map(parse_paragraph)
        .collect();
    TextBody { paragraphs }
}

fn parse_paragraph(p: roxmltree::Node) -> Paragraph {
    let alignment = dml(p, "pPr")
        .and_then(|ppr| ppr.attribute("algn"))
        .and_then(|algn| match algn {
            "l" => Some(Alignment::Left),
            "ctr" => Some(Alignment::Center),
            "r" => Some(Alignment::Right),
            "just" => Some(Alignment::Justify),
            "dist" => Some(Alignment::Distributed),
            _ => None,
        });
    let mut runs = Vec::new();
    for node in p.children() {
        if node.tag_name().namespace() != Some(DML_NS) {
            continue;
        }
        match node.tag_name().name() {
            "r" | "fld" => runs.push(TextRun {
                text: dml(node, "t")
                    .and_then(|t| t.text())
                    .unwrap_or("")
                    .to_string(),
                font: dml(node, "rPr").map(parse_font).unwrap_or_default(),
            }),
            "br" => runs.push(TextRun {
                text: "\n".to_string(),
                font: dml(node, "rPr").map(parse_font).unwrap_or_default(),
            }),
            _ => {}
        }
    }
    Paragraph { alignment, runs }
}

fn parse_font(r_pr: roxmltree::Node) -> Font {
    let typeface = |name: &str| {
        dml(r_pr, name)
            .and_then(|n| n.attribute("typeface"))
            .map(String::from)
    };
    Font {
        family: typeface("latin"),
        east_asian_family: typeface("ea"),
        size: emu_attr(r_pr, "sz").map(|sz| sz as f64 / 100.0),
        bold: bool_attr(r_pr, "b"),
        italic: bool_attr(r_pr, "i"),
        underline: r_pr.attribute("u").map(|u| u != "none"),
        language: r_pr.attribute("lang").map(String::from),
        color: dml(r_pr, "solidFill").and_then(parse_color),
    }
}
