mod descriptor;

pub use descriptor::{
    DescriptorBody, FillStyle, ShapeDescriptor, ShapeKind, TextSlot, classify, extract,
    normalize_label,
};

use std::collections::HashMap;

use crate::cloner::ShapeCloner;
use crate::error::Error;
use crate::geometry::{BoundingBox, union_all};
use crate::model::Slide;

/// Position-normalized template built from one sample slide.
///
/// Descriptor geometry is made relative to the sample's own bounding box once,
/// here, and never again.
#[derive(Clone, Debug)]
pub struct Sample {
    descriptors: Vec<ShapeDescriptor>,
    bbox: BoundingBox,
}

impl Sample {
    pub fn from_slide(slide: &Slide) -> Result<Sample, Error> {
        let mut descriptors = Vec::new();
        for shape in &slide.shapes {
            descriptors.extend(extract(shape, slide)?);
        }
        Self::from_descriptors(descriptors)
    }

    /// Build a sample from descriptors in absolute slide coordinates.
    pub fn from_descriptors(mut descriptors: Vec<ShapeDescriptor>) -> Result<Sample, Error> {
        let footprints: Vec<BoundingBox> = descriptors.iter().map(|d| d.footprint()).collect();
        let bbox = union_all(&footprints)
            .ok_or_else(|| Error::Authoring("no usable shape found in the sample slide".into()))?;
        let origin = bbox.origin();
        for d in &mut descriptors {
            d.shift(origin);
        }
        Ok(Sample { descriptors, bbox })
    }

    pub fn descriptors(&self) -> &[ShapeDescriptor] {
        &self.descriptors
    }

    /// Where the sample sat on its own slide (rotated extents included).
    pub fn bounding_box(&self) -> BoundingBox {
        self.bbox
    }

    pub fn width(&self) -> f64 {
        self.bbox.width
    }

    pub fn height(&self) -> f64 {
        self.bbox.height
    }

    /// Labeled text and image slots must bind to distinct record fields.
    /// Unlabeled pictures are static and never collide.
    pub fn check_labels(&self) -> Result<(), Error> {
        let mut seen: HashMap<&str, &str> = HashMap::new();
        for d in &self.descriptors {
            let Some(label) = d.label() else {
                continue;
            };
            if label.is_empty() {
                continue;
            }
            if let Some(first) = seen.insert(label, &d.name) {
                return Err(Error::Authoring(format!(
                    "label '{label}' is used by both '{first}' and '{}'",
                    d.name
                )));
            }
        }
        Ok(())
    }

    /// Fresh, undrawn cloners for one placement of the sample.
    pub fn cloners(&self) -> Vec<ShapeCloner<'_>> {
        self.descriptors.iter().map(ShapeCloner::new).collect()
    }
}
