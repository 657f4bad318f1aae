use crate::error::Error;
use crate::geometry::Point;

/// Slack for floor() so that exact fits computed from EMU-rounded sizes are not lost.
const FIT_EPSILON: f64 = 1e-9;

/// Horizontal/vertical pair in centimeters.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Spacing {
    pub x: f64,
    pub y: f64,
}

impl Spacing {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Grid parameters for one generation run.
///
/// Defaults: no margin between cells, no padding inside cells, as many samples
/// per slide as fit.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct LayoutConfig {
    /// Gap between adjacent cells; not applied after the last column/row.
    pub margin: Spacing,
    /// Inset on every side of each cell.
    pub padding: Spacing,
    /// Upper bound on samples per slide.
    pub per_slide: Option<usize>,
}

impl LayoutConfig {
    fn validate(&self) -> Result<(), Error> {
        for (name, v) in [
            ("margin x", self.margin.x),
            ("margin y", self.margin.y),
            ("padding x", self.padding.x),
            ("padding y", self.padding.y),
        ] {
            if !v.is_finite() || v < 0.0 {
                return Err(Error::Layout(format!("{name} must be a non-negative length, got {v}")));
            }
        }
        Ok(())
    }
}

/// Grid capacity and cell positions for one sample footprint on one slide size.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SlidePositioner {
    pub num_col: usize,
    pub num_row: usize,
    pub num_per_slide: usize,
    /// Top-left of the centered grid.
    pub start: Point,
    pitch: Point,
    padding: Spacing,
}

impl SlidePositioner {
    pub fn new(
        slide_size: (f64, f64),
        sample_size: (f64, f64),
        config: &LayoutConfig,
    ) -> Result<Self, Error> {
        config.validate()?;
        let (slide_w, slide_h) = slide_size;
        let (sample_w, sample_h) = sample_size;
        let pitch = Point::new(
            sample_w + config.padding.x * 2.0 + config.margin.x,
            sample_h + config.padding.y * 2.0 + config.margin.y,
        );
        if pitch.x <= 0.0 || pitch.y <= 0.0 {
            return Err(Error::Layout(format!(
                "sample footprint {sample_w:.2}x{sample_h:.2}cm with the given padding and margin occupies no area"
            )));
        }

        let fit = |slide: f64, margin: f64, pitch: f64| {
            let n = ((slide + margin) / pitch + FIT_EPSILON).floor();
            if n > 0.0 { n as usize } else { 0 }
        };
        let num_col = fit(slide_w, config.margin.x, pitch.x);
        let num_row = fit(slide_h, config.margin.y, pitch.y);
        let capacity = num_col * num_row;
        let num_per_slide = match config.per_slide {
            Some(cap) => cap.min(capacity),
            None => capacity,
        };
        if num_per_slide == 0 {
            return Err(Error::Layout(format!(
                "no sample fits on the slide: slide {slide_w:.2}x{slide_h:.2}cm, sample {sample_w:.2}x{sample_h:.2}cm, \
                 padding {:.2},{:.2}cm, margin {:.2},{:.2}cm, per-slide cap {:?}",
                config.padding.x, config.padding.y, config.margin.x, config.margin.y, config.per_slide
            )));
        }

        let start = Point::new(
            (slide_w - num_col as f64 * pitch.x + config.margin.x) / 2.0,
            (slide_h - num_row as f64 * pitch.y + config.margin.y) / 2.0,
        );
        Ok(Self {
            num_col,
            num_row,
            num_per_slide,
            start,
            pitch,
            padding: config.padding,
        })
    }

    /// Row-major cell for a flattened index within one slide.
    pub fn cell(&self, index: usize) -> (usize, usize) {
        (index % self.num_col, index / self.num_col)
    }

    /// Top-left at which the sample for `index` is drawn.
    pub fn position(&self, index: usize) -> Point {
        let (col, row) = self.cell(index);
        Point::new(
            self.start.x + col as f64 * self.pitch.x + self.padding.x,
            self.start.y + row as f64 * self.pitch.y + self.padding.y,
        )
    }

    /// Distance between the origins of neighbouring cells.
    pub fn pitch(&self) -> Point {
        self.pitch
    }
}

/// Grid plus the records split into one batch per output slide.
#[derive(Clone, Debug)]
pub struct LayoutPlan<'a, T> {
    pub positioner: SlidePositioner,
    batches: Vec<&'a [T]>,
}

impl<'a, T> LayoutPlan<'a, T> {
    pub fn new(
        slide_size: (f64, f64),
        sample_size: (f64, f64),
        records: &'a [T],
        config: &LayoutConfig,
    ) -> Result<Self, Error> {
        let positioner = SlidePositioner::new(slide_size, sample_size, config)?;
        let batches = records.chunks(positioner.num_per_slide).collect();
        Ok(Self { positioner, batches })
    }

    pub fn num_slides(&self) -> usize {
        self.batches.len()
    }

    pub fn batches(&self) -> &[&'a [T]] {
        &self.batches
    }

    /// Per slide, each record with the offset it is drawn at.
    pub fn placements(&self) -> impl Iterator<Item = Vec<(Point, &'a T)>> + '_ {
        self.batches.iter().map(move |batch| {
            batch
                .iter()
                .enumerate()
                .map(|(i, record)| (self.positioner.position(i), record))
                .collect()
        })
    }
}
