use crate::error::Error;
use crate::geometry::{BoundingBox, Point, rotated_bounding_box};
use crate::model::{
    Alignment, Color, Crop, Fill, Font, Group, ImageData, LineStyle, Shadow, Shape, ShapeContent,
    Slide, Transform, emu_to_cm,
};

/// Closed set of shape kinds the engine knows how to clone.
///
/// `Group` and `Unsupported` never survive extraction: groups are expanded into
/// their children and unsupported shapes abort the run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShapeKind {
    Image,
    TextBox,
    AutoShape,
    Connector,
    Group,
    Unsupported,
}

/// Fill as carried by a descriptor. Picture fills own their bytes so they can be
/// re-embedded into whichever slide the descriptor is drawn on.
#[derive(Clone, Debug, PartialEq)]
pub enum FillStyle {
    Inherit,
    NoFill,
    Solid(Color),
    Picture(ImageData),
    Unsupported(String),
}

#[derive(Clone, Debug, PartialEq)]
pub struct TextSlot {
    /// Trimmed, lowercased template text; the record field key.
    pub label: String,
    /// Template text as authored, drawn until a record overrides it.
    pub template_text: String,
    pub alignment: Alignment,
    pub font: Font,
    pub fill: FillStyle,
}

#[derive(Clone, Debug, PartialEq)]
pub enum DescriptorBody {
    Image {
        /// Normalized alt text; pictures without alt text never bind.
        label: Option<String>,
        image: ImageData,
        crop: Crop,
    },
    TextBox(TextSlot),
    AutoShape {
        preset: String,
        text: TextSlot,
    },
    Connector {
        begin: Point,
        end: Point,
    },
}

#[derive(Clone, Debug, PartialEq)]
pub struct ShapeDescriptor {
    pub name: String,
    /// Relative to the owning sample's origin once the sample is built.
    pub geometry: BoundingBox,
    pub rotation: f64,
    pub shadow: Shadow,
    pub line: LineStyle,
    pub body: DescriptorBody,
}

impl ShapeDescriptor {
    pub fn kind(&self) -> ShapeKind {
        match self.body {
            DescriptorBody::Image { .. } => ShapeKind::Image,
            DescriptorBody::TextBox(_) => ShapeKind::TextBox,
            DescriptorBody::AutoShape { .. } => ShapeKind::AutoShape,
            DescriptorBody::Connector { .. } => ShapeKind::Connector,
        }
    }

    /// Record field key this descriptor binds to, if any.
    pub fn label(&self) -> Option<&str> {
        match &self.body {
            DescriptorBody::Image { label, .. } => label.as_deref(),
            DescriptorBody::TextBox(slot) | DescriptorBody::AutoShape { text: slot, .. } => {
                Some(&slot.label)
            }
            DescriptorBody::Connector { .. } => None,
        }
    }

    /// Footprint of the shape once rotation is taken into account.
    pub fn footprint(&self) -> BoundingBox {
        rotated_bounding_box(&self.geometry, self.rotation)
    }

    pub(super) fn shift(&mut self, origin: Point) {
        self.geometry = self.geometry.relative_to(origin);
        if let DescriptorBody::Connector { begin, end } = &mut self.body {
            *begin = Point::new(begin.x - origin.x, begin.y - origin.y);
            *end = Point::new(end.x - origin.x, end.y - origin.y);
        }
    }
}

pub fn normalize_label(text: &str) -> String {
    text.trim().to_lowercase()
}

/// Pick the most specific kind for a native shape. `None` means the shape is an
/// empty layout placeholder and carries nothing worth cloning.
pub fn classify(shape: &Shape) -> Option<ShapeKind> {
    match &shape.content {
        ShapeContent::Group(_) => Some(ShapeKind::Group),
        ShapeContent::Picture(_) => Some(ShapeKind::Image),
        ShapeContent::Connector(_) => Some(ShapeKind::Connector),
        ShapeContent::AutoShape(sp) => {
            let has_text = sp
                .text
                .as_ref()
                .is_some_and(|body| !body.text().trim().is_empty());
            if shape.placeholder.is_some() {
                has_text.then_some(ShapeKind::TextBox)
            } else if sp.text_box {
                Some(ShapeKind::TextBox)
            } else if sp.preset.is_some() {
                Some(ShapeKind::AutoShape)
            } else {
                Some(ShapeKind::Unsupported)
            }
        }
        ShapeContent::Graphic(_) | ShapeContent::Other(_) => Some(ShapeKind::Unsupported),
    }
}

/// Maps coordinates from a group's child space into slide space.
#[derive(Clone, Copy, Debug)]
struct Frame {
    dx: f64,
    dy: f64,
    sx: f64,
    sy: f64,
}

impl Frame {
    const SLIDE: Frame = Frame {
        dx: 0.0,
        dy: 0.0,
        sx: 1.0,
        sy: 1.0,
    };

    fn x(&self, emu: i64) -> f64 {
        self.dx + emu as f64 * self.sx
    }

    fn y(&self, emu: i64) -> f64 {
        self.dy + emu as f64 * self.sy
    }

    fn enter(&self, group: &Group, xfrm: &Transform) -> Frame {
        let scale = |ext: i64, child_ext: i64| {
            if child_ext == 0 {
                1.0
            } else {
                ext as f64 / child_ext as f64
            }
        };
        let gsx = scale(xfrm.cx, group.child_cx);
        let gsy = scale(xfrm.cy, group.child_cy);
        Frame {
            dx: self.x(xfrm.x) - group.child_x as f64 * gsx * self.sx,
            dy: self.y(xfrm.y) - group.child_y as f64 * gsy * self.sy,
            sx: self.sx * gsx,
            sy: self.sy * gsy,
        }
    }

    fn bbox_cm(&self, xfrm: &Transform) -> BoundingBox {
        BoundingBox::new(
            self.x(xfrm.x) / crate::model::EMU_PER_CM,
            self.y(xfrm.y) / crate::model::EMU_PER_CM,
            emu_to_cm(xfrm.cx) * self.sx,
            emu_to_cm(xfrm.cy) * self.sy,
        )
    }
}

/// Extract descriptors for one native shape, in absolute slide coordinates.
///
/// Groups recurse into their children; empty placeholders yield nothing.
pub fn extract(shape: &Shape, slide: &Slide) -> Result<Vec<ShapeDescriptor>, Error> {
    let mut out = Vec::new();
    extract_into(shape, slide, Frame::SLIDE, &mut out)?;
    Ok(out)
}

fn extract_into(
    shape: &Shape,
    slide: &Slide,
    frame: Frame,
    out: &mut Vec<ShapeDescriptor>,
) -> Result<(), Error> {
    let Some(kind) = classify(shape) else {
        log::debug!("Dropping empty placeholder '{}'", shape.name);
        return Ok(());
    };
    log::debug!("Shape '{}' (id {}) classified as {:?}", shape.name, shape.id, kind);

    let geometry = frame.bbox_cm(&shape.transform);
    let base = |line: LineStyle, body: DescriptorBody| ShapeDescriptor {
        name: shape.name.clone(),
        geometry,
        rotation: shape.transform.rotation,
        shadow: shape.shadow.clone(),
        line,
        body,
    };

    match (kind, &shape.content) {
        (ShapeKind::Group, ShapeContent::Group(group)) => {
            if shape.transform.rotation != 0.0 {
                log::warn!(
                    "Group '{}' is rotated by {}°; its children are placed unrotated",
                    shape.name,
                    shape.transform.rotation
                );
            }
            let inner = frame.enter(group, &shape.transform);
            for child in &group.children {
                extract_into(child, slide, inner, out)?;
            }
        }
        (ShapeKind::Image, ShapeContent::Picture(pic)) => {
            let image = slide.image(pic.image).cloned().ok_or_else(|| {
                Error::Authoring(format!("picture '{}' references a missing image", shape.name))
            })?;
            let label = Some(normalize_label(&pic.description)).filter(|l| !l.is_empty());
            out.push(base(
                pic.line.clone(),
                DescriptorBody::Image {
                    label,
                    image,
                    crop: pic.crop,
                },
            ));
        }
        (ShapeKind::Connector, ShapeContent::Connector(cxn)) => {
            let t = &shape.transform;
            let (x0, x1) = (frame.x(t.x), frame.x(t.x + t.cx));
            let (y0, y1) = (frame.y(t.y), frame.y(t.y + t.cy));
            let (bx, ex) = if t.flip_h { (x1, x0) } else { (x0, x1) };
            let (by, ey) = if t.flip_v { (y1, y0) } else { (y0, y1) };
            let cm = crate::model::EMU_PER_CM;
            out.push(base(
                cxn.line.clone(),
                DescriptorBody::Connector {
                    begin: Point::new(bx / cm, by / cm),
                    end: Point::new(ex / cm, ey / cm),
                },
            ));
        }
        (ShapeKind::TextBox, ShapeContent::AutoShape(sp)) => {
            let slot = text_slot(shape, sp.text.as_ref(), &sp.fill, slide);
            out.push(base(sp.line.clone(), DescriptorBody::TextBox(slot)));
        }
        (ShapeKind::AutoShape, ShapeContent::AutoShape(sp)) => {
            let slot = text_slot(shape, sp.text.as_ref(), &sp.fill, slide);
            let preset = sp.preset.clone().unwrap_or_else(|| "rect".to_string());
            out.push(base(sp.line.clone(), DescriptorBody::AutoShape { preset, text: slot }));
        }
        (ShapeKind::Unsupported, content) => {
            return Err(Error::Authoring(format!(
                "shape '{}' (id {}) is not supported in a sample slide: {}",
                shape.name,
                shape.id,
                describe(content)
            )));
        }
        (kind, content) => {
            return Err(Error::Authoring(format!(
                "shape '{}' classified as {:?} but holds {}",
                shape.name,
                kind,
                describe(content)
            )));
        }
    }
    Ok(())
}

fn describe(content: &ShapeContent) -> String {
    match content {
        ShapeContent::Picture(_) => "a picture".to_string(),
        ShapeContent::AutoShape(sp) if sp.preset.is_none() => "a freeform shape".to_string(),
        ShapeContent::AutoShape(_) => "an auto shape".to_string(),
        ShapeContent::Connector(_) => "a connector".to_string(),
        ShapeContent::Group(_) => "a group".to_string(),
        ShapeContent::Graphic(uri) => format!("a graphic frame ({uri})"),
        ShapeContent::Other(tag) => format!("an unknown element <{tag}>"),
    }
}

fn text_slot(
    shape: &Shape,
    body: Option<&crate::model::TextBody>,
    fill: &Fill,
    slide: &Slide,
) -> TextSlot {
    let template_text = body.map(|b| b.text()).unwrap_or_default();
    let alignment = body
        .and_then(|b| b.first_paragraph())
        .and_then(|p| p.alignment)
        .unwrap_or(Alignment::Left);
    let font = body
        .and_then(|b| b.first_run())
        .map(|r| r.font.clone())
        .unwrap_or_default();
    TextSlot {
        label: normalize_label(&template_text),
        template_text,
        alignment,
        font,
        fill: fill_style(shape, fill, slide),
    }
}

fn fill_style(shape: &Shape, fill: &Fill, slide: &Slide) -> FillStyle {
    match fill {
        Fill::Inherit => FillStyle::Inherit,
        Fill::NoFill => FillStyle::NoFill,
        Fill::Solid(color) => FillStyle::Solid(color.clone()),
        Fill::Picture(id) => match slide.image(*id) {
            Some(image) => FillStyle::Picture(image.clone()),
            None => FillStyle::Unsupported(format!(
                "picture fill of '{}' references a missing image",
                shape.name
            )),
        },
        Fill::Unsupported(kind) => FillStyle::Unsupported(kind.clone()),
    }
}
