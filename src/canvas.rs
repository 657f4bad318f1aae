//! Port between the cloning engine and the document model.
//!
//! The engine only speaks in centimeters and style values; everything that
//! touches the native shape representation happens behind [`SlideCanvas`].

use crate::error::Error;
use crate::geometry::{BoundingBox, Point};
use crate::model::{
    Alignment, AutoShape, Connector, Crop, Fill, Font, ImageData, ImageId, LineStyle, Paragraph,
    Picture, Shadow, Shape, ShapeContent, ShapeId, Slide, TextBody, TextRun, Transform, cm_to_emu,
};

pub trait SlideCanvas {
    /// Adds an independent image resource to the slide.
    fn add_image(&mut self, image: ImageData) -> ImageId;
    fn add_picture(&mut self, image: ImageId, frame: BoundingBox) -> ShapeId;
    fn add_text_box(&mut self, frame: BoundingBox) -> ShapeId;
    fn add_auto_shape(&mut self, preset: &str, frame: BoundingBox) -> ShapeId;
    /// Straight connector from `begin` to `end`.
    fn add_connector(&mut self, begin: Point, end: Point) -> ShapeId;

    fn set_rotation(&mut self, shape: ShapeId, degrees: f64) -> Result<(), Error>;
    fn set_crop(&mut self, shape: ShapeId, crop: Crop) -> Result<(), Error>;
    fn set_picture_image(&mut self, shape: ShapeId, image: ImageId) -> Result<(), Error>;
    fn set_alignment(&mut self, shape: ShapeId, alignment: Alignment) -> Result<(), Error>;
    fn set_run_font(&mut self, shape: ShapeId, font: &Font) -> Result<(), Error>;
    /// Rewrites the first run of the first paragraph, keeping its font.
    fn set_run_text(&mut self, shape: ShapeId, text: &str) -> Result<(), Error>;
    /// Replaces the whole text of the shape, one paragraph per line, keeping the
    /// first run's font and the first paragraph's alignment.
    fn set_shape_text(&mut self, shape: ShapeId, text: &str) -> Result<(), Error>;
    fn set_fill(&mut self, shape: ShapeId, fill: Fill) -> Result<(), Error>;
    fn set_line(&mut self, shape: ShapeId, line: LineStyle) -> Result<(), Error>;
    fn set_shadow(&mut self, shape: ShapeId, shadow: Shadow) -> Result<(), Error>;
}

fn frame_transform(frame: BoundingBox) -> Transform {
    Transform {
        x: cm_to_emu(frame.left),
        y: cm_to_emu(frame.top),
        cx: cm_to_emu(frame.width),
        cy: cm_to_emu(frame.height),
        ..Transform::default()
    }
}

impl Slide {
    fn next_shape_id(&self) -> u32 {
        // id 1 is the spTree itself
        self.shapes.iter().map(|s| s.id).max().unwrap_or(1) + 1
    }

    fn push_shape(&mut self, name: &str, transform: Transform, content: ShapeContent) -> ShapeId {
        let id = self.next_shape_id();
        self.shapes.push(Shape {
            id,
            name: format!("{name} {}", id - 1),
            transform,
            placeholder: None,
            shadow: Shadow::Inherit,
            content,
        });
        ShapeId(self.shapes.len() - 1)
    }

    fn shape_mut(&mut self, id: ShapeId) -> Result<&mut Shape, Error> {
        self.shapes
            .get_mut(id.0)
            .ok_or_else(|| Error::Misuse(format!("shape handle {} does not exist on this slide", id.0)))
    }

    fn auto_shape_mut(&mut self, id: ShapeId) -> Result<&mut AutoShape, Error> {
        match &mut self.shape_mut(id)?.content {
            ShapeContent::AutoShape(sp) => Ok(sp),
            _ => Err(Error::Misuse(format!("shape {} has no text frame", id.0))),
        }
    }

    fn first_paragraph_mut(&mut self, id: ShapeId) -> Result<&mut Paragraph, Error> {
        let sp = self.auto_shape_mut(id)?;
        let body = sp.text.get_or_insert_with(TextBody::default);
        if body.paragraphs.is_empty() {
            body.paragraphs.push(Paragraph::default());
        }
        Ok(&mut body.paragraphs[0])
    }

    fn first_run_mut(&mut self, id: ShapeId) -> Result<&mut TextRun, Error> {
        let para = self.first_paragraph_mut(id)?;
        if para.runs.is_empty() {
            para.runs.push(TextRun::default());
        }
        Ok(&mut para.runs[0])
    }
}

impl SlideCanvas for Slide {
    fn add_image(&mut self, image: ImageData) -> ImageId {
        self.images.push(image);
        ImageId(self.images.len() - 1)
    }

    fn add_picture(&mut self, image: ImageId, frame: BoundingBox) -> ShapeId {
        let content = ShapeContent::Picture(Picture {
            image,
            description: String::new(),
            crop: Crop::default(),
            line: LineStyle::default(),
        });
        self.push_shape("Picture", frame_transform(frame), content)
    }

    fn add_text_box(&mut self, frame: BoundingBox) -> ShapeId {
        let content = ShapeContent::AutoShape(AutoShape {
            text_box: true,
            preset: Some("rect".to_string()),
            text: Some(TextBody {
                paragraphs: vec![Paragraph::default()],
            }),
            fill: Fill::Inherit,
            line: LineStyle::default(),
        });
        self.push_shape("TextBox", frame_transform(frame), content)
    }

    fn add_auto_shape(&mut self, preset: &str, frame: BoundingBox) -> ShapeId {
        let content = ShapeContent::AutoShape(AutoShape {
            text_box: false,
            preset: Some(preset.to_string()),
            text: Some(TextBody::default()),
            fill: Fill::Inherit,
            line: LineStyle::default(),
        });
        self.push_shape("Shape", frame_transform(frame), content)
    }

    fn add_connector(&mut self, begin: Point, end: Point) -> ShapeId {
        let (bx, by) = (cm_to_emu(begin.x), cm_to_emu(begin.y));
        let (ex, ey) = (cm_to_emu(end.x), cm_to_emu(end.y));
        let transform = Transform {
            x: bx.min(ex),
            y: by.min(ey),
            cx: (ex - bx).abs(),
            cy: (ey - by).abs(),
            rotation: 0.0,
            flip_h: ex < bx,
            flip_v: ey < by,
        };
        let content = ShapeContent::Connector(Connector {
            preset: "straightConnector1".to_string(),
            line: LineStyle::default(),
        });
        self.push_shape("Connector", transform, content)
    }

    fn set_rotation(&mut self, shape: ShapeId, degrees: f64) -> Result<(), Error> {
        self.shape_mut(shape)?.transform.rotation = degrees;
        Ok(())
    }

    fn set_crop(&mut self, shape: ShapeId, crop: Crop) -> Result<(), Error> {
        match &mut self.shape_mut(shape)?.content {
            ShapeContent::Picture(pic) => {
                pic.crop = crop;
                Ok(())
            }
            _ => Err(Error::Misuse(format!("shape {} is not a picture", shape.0))),
        }
    }

    fn set_picture_image(&mut self, shape: ShapeId, image: ImageId) -> Result<(), Error> {
        if self.image(image).is_none() {
            return Err(Error::Misuse(format!("image {} does not exist on this slide", image.0)));
        }
        match &mut self.shape_mut(shape)?.content {
            ShapeContent::Picture(pic) => {
                pic.image = image;
                Ok(())
            }
            _ => Err(Error::Misuse(format!("shape {} is not a picture", shape.0))),
        }
    }

    fn set_alignment(&mut self, shape: ShapeId, alignment: Alignment) -> Result<(), Error> {
        self.first_paragraph_mut(shape)?.alignment = Some(alignment);
        Ok(())
    }

    fn set_run_font(&mut self, shape: ShapeId, font: &Font) -> Result<(), Error> {
        self.first_run_mut(shape)?.font = font.clone();
        Ok(())
    }

    fn set_run_text(&mut self, shape: ShapeId, text: &str) -> Result<(), Error> {
        self.first_run_mut(shape)?.text = text.to_string();
        Ok(())
    }

    fn set_shape_text(&mut self, shape: ShapeId, text: &str) -> Result<(), Error> {
        let sp = self.auto_shape_mut(shape)?;
        let body = sp.text.as_ref();
        let alignment = body.and_then(|b| b.first_paragraph()).and_then(|p| p.alignment);
        let font = body
            .and_then(|b| b.first_run())
            .map(|r| r.font.clone())
            .unwrap_or_default();
        let paragraphs = text
            .split('\n')
            .map(|line| Paragraph {
                alignment,
                runs: vec![TextRun {
                    text: line.to_string(),
                    font: font.clone(),
                }],
            })
            .collect();
        sp.text = Some(TextBody { paragraphs });
        Ok(())
    }

    fn set_fill(&mut self, shape: ShapeId, fill: Fill) -> Result<(), Error> {
        if let Fill::Picture(image) = fill
            && self.image(image).is_none()
        {
            return Err(Error::Misuse(format!("image {} does not exist on this slide", image.0)));
        }
        match &mut self.shape_mut(shape)?.content {
            ShapeContent::AutoShape(sp) => {
                sp.fill = fill;
                Ok(())
            }
            _ => Err(Error::Misuse(format!("shape {} cannot be filled", shape.0))),
        }
    }

    fn set_line(&mut self, shape: ShapeId, line: LineStyle) -> Result<(), Error> {
        match &mut self.shape_mut(shape)?.content {
            ShapeContent::Picture(pic) => pic.line = line,
            ShapeContent::AutoShape(sp) => sp.line = line,
            ShapeContent::Connector(cxn) => cxn.line = line,
            _ => return Err(Error::Misuse(format!("shape {} has no outline", shape.0))),
        }
        Ok(())
    }

    fn set_shadow(&mut self, shape: ShapeId, shadow: Shadow) -> Result<(), Error> {
        self.shape_mut(shape)?.shadow = shadow;
        Ok(())
    }
}
