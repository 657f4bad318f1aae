use crate::canvas::SlideCanvas;
use crate::error::Error;
use crate::geometry::Point;
use crate::model::{Fill, ImageData, LineStyle, ShapeId};
use crate::sample::{DescriptorBody, FillStyle, ShapeDescriptor, TextSlot};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum DrawState {
    NotDrawn,
    Drawn(ShapeId),
}

/// One placement of one descriptor: draws it once, then rebinds its content.
///
/// A cloner is good for a single drawn shape. `draw` moves it from not-drawn to
/// drawn; `set_text` / `set_image` are only valid afterwards. Take a fresh
/// cloner from [`crate::sample::Sample::cloners`] for every placement.
#[derive(Debug)]
pub struct ShapeCloner<'s> {
    descriptor: &'s ShapeDescriptor,
    state: DrawState,
}

impl<'s> ShapeCloner<'s> {
    pub fn new(descriptor: &'s ShapeDescriptor) -> Self {
        Self {
            descriptor,
            state: DrawState::NotDrawn,
        }
    }

    pub fn descriptor(&self) -> &'s ShapeDescriptor {
        self.descriptor
    }

    /// Handle of the drawn shape, once drawn.
    pub fn handle(&self) -> Option<ShapeId> {
        match self.state {
            DrawState::Drawn(id) => Some(id),
            DrawState::NotDrawn => None,
        }
    }

    pub fn draw<C: SlideCanvas + ?Sized>(
        &mut self,
        canvas: &mut C,
        offset: Point,
    ) -> Result<ShapeId, Error> {
        if let DrawState::Drawn(id) = self.state {
            return Err(Error::Misuse(format!(
                "'{}' was already drawn as shape {}; take a fresh cloner per placement",
                self.descriptor.name, id.0
            )));
        }
        let d = self.descriptor;
        let frame = d.geometry.translated(offset);

        let id = match &d.body {
            DescriptorBody::Image { image, crop, .. } => {
                let image_id = canvas.add_image(image.clone());
                let id = canvas.add_picture(image_id, frame);
                canvas.set_crop(id, *crop)?;
                id
            }
            DescriptorBody::TextBox(slot) => {
                let id = canvas.add_text_box(frame);
                apply_text_style(canvas, id, slot)?;
                canvas.set_run_text(id, &slot.template_text)?;
                set_fill(canvas, id, &d.name, &slot.fill)?;
                id
            }
            DescriptorBody::AutoShape { preset, text } => {
                let id = canvas.add_auto_shape(preset, frame);
                apply_text_style(canvas, id, text)?;
                canvas.set_shape_text(id, &text.template_text)?;
                set_fill(canvas, id, &d.name, &text.fill)?;
                id
            }
            DescriptorBody::Connector { begin, end } => {
                canvas.add_connector(begin.offset(offset), end.offset(offset))
            }
        };

        set_line(canvas, id, &d.name, &d.line)?;
        if !matches!(d.body, DescriptorBody::Connector { .. }) {
            canvas.set_rotation(id, d.rotation)?;
        }
        canvas.set_shadow(id, d.shadow.clone())?;

        self.state = DrawState::Drawn(id);
        Ok(id)
    }

    /// Replace the drawn shape's text in place; geometry and style stay as drawn.
    pub fn set_text<C: SlideCanvas + ?Sized>(&self, canvas: &mut C, value: &str) -> Result<(), Error> {
        let id = self.drawn("set_text")?;
        match &self.descriptor.body {
            DescriptorBody::TextBox(_) => canvas.set_run_text(id, value),
            DescriptorBody::AutoShape { .. } => canvas.set_shape_text(id, value),
            DescriptorBody::Image { .. } | DescriptorBody::Connector { .. } => Err(Error::Misuse(
                format!("'{}' has no text to set", self.descriptor.name),
            )),
        }
    }

    /// Swap the drawn picture's image for `image`, added as a new slide resource.
    pub fn set_image<C: SlideCanvas + ?Sized>(
        &self,
        canvas: &mut C,
        image: ImageData,
    ) -> Result<(), Error> {
        let id = self.drawn("set_image")?;
        match &self.descriptor.body {
            DescriptorBody::Image { .. } => {
                let image_id = canvas.add_image(image);
                canvas.set_picture_image(id, image_id)
            }
            DescriptorBody::TextBox(_)
            | DescriptorBody::AutoShape { .. }
            | DescriptorBody::Connector { .. } => Err(Error::Misuse(format!(
                "'{}' is not a picture",
                self.descriptor.name
            ))),
        }
    }

    fn drawn(&self, op: &str) -> Result<ShapeId, Error> {
        match self.state {
            DrawState::Drawn(id) => Ok(id),
            DrawState::NotDrawn => Err(Error::Misuse(format!(
                "{op} called on '{}' before it was drawn",
                self.descriptor.name
            ))),
        }
    }
}

fn apply_text_style<C: SlideCanvas + ?Sized>(
    canvas: &mut C,
    id: ShapeId,
    slot: &TextSlot,
) -> Result<(), Error> {
    canvas.set_alignment(id, slot.alignment)?;
    canvas.set_run_font(id, &slot.font)
}

/// Transfer a descriptor fill. Picture fills re-embed their bytes into the target
/// slide; unsupported fills leave the target unstyled.
fn set_fill<C: SlideCanvas + ?Sized>(
    canvas: &mut C,
    id: ShapeId,
    name: &str,
    fill: &FillStyle,
) -> Result<(), Error> {
    let fill = match fill {
        FillStyle::Inherit => return Ok(()),
        FillStyle::NoFill => Fill::NoFill,
        FillStyle::Solid(color) => Fill::Solid(color.clone()),
        FillStyle::Picture(image) => Fill::Picture(canvas.add_image(image.clone())),
        FillStyle::Unsupported(kind) => {
            log::warn!("Fill of '{name}' ({kind}) cannot be copied; leaving it unstyled");
            return Ok(());
        }
    };
    canvas.set_fill(id, fill)
}

fn set_line<C: SlideCanvas + ?Sized>(
    canvas: &mut C,
    id: ShapeId,
    name: &str,
    line: &LineStyle,
) -> Result<(), Error> {
    if line.is_inherited() {
        return Ok(());
    }
    let mut line = line.clone();
    match &line.fill {
        Fill::Unsupported(kind) => {
            log::warn!("Outline fill of '{name}' ({kind}) cannot be copied; using the theme outline");
            line.fill = Fill::Inherit;
        }
        Fill::Picture(_) => {
            log::warn!("Outline of '{name}' uses a picture fill; using the theme outline");
            line.fill = Fill::Inherit;
        }
        Fill::Inherit | Fill::NoFill | Fill::Solid(_) => {}
    }
    canvas.set_line(id, line)
}
