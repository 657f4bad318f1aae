use std::path::{Path, PathBuf};

use crate::cloner::ShapeCloner;
use crate::error::Error;
use crate::layout::{LayoutConfig, LayoutPlan};
use crate::model::{Deck, ImageData, Slide};
use crate::records::{FieldValue, Record, RecordSet, RejectedRow};
use crate::sample::{DescriptorBody, Sample};

#[derive(Clone, Debug, Default, PartialEq)]
pub struct GenerateOptions {
    pub layout: LayoutConfig,
    /// Index into the master's slide layouts used for every generated slide.
    pub blank_layout: usize,
    /// Directory that image paths in the data are resolved against. `None`
    /// leaves every picture showing its template image.
    pub image_root: Option<PathBuf>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct GroupSummary {
    pub sample: usize,
    pub records: usize,
    pub slides: usize,
    pub per_slide: usize,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SkippedGroup {
    pub sample: usize,
    pub records: usize,
    pub reason: String,
}

/// What a generation run did, and everything it had to leave out.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GenerationReport {
    pub groups: Vec<GroupSummary>,
    pub skipped: Vec<SkippedGroup>,
    pub rejected_rows: Vec<RejectedRow>,
}

impl GenerationReport {
    pub fn slides_added(&self) -> usize {
        self.groups.iter().map(|g| g.slides).sum()
    }

    pub fn records_drawn(&self) -> usize {
        self.groups.iter().map(|g| g.records).sum()
    }
}

/// Draws one sample-group: one new slide per batch, one sample per record.
#[derive(Debug)]
pub struct SlideDrawer<'a> {
    sample_index: usize,
    sample: Sample,
    plan: LayoutPlan<'a, Record>,
}

impl<'a> SlideDrawer<'a> {
    pub fn new(
        sample_index: usize,
        sample: Sample,
        records: &'a [Record],
        slide_size: (f64, f64),
        config: &LayoutConfig,
    ) -> Result<Self, Error> {
        let plan = LayoutPlan::new(slide_size, (sample.width(), sample.height()), records, config)
            .map_err(|e| match e {
                Error::Layout(msg) => Error::Layout(format!("sample {sample_index}: {msg}")),
                other => other,
            })?;
        Ok(Self {
            sample_index,
            sample,
            plan,
        })
    }

    pub fn sample(&self) -> &Sample {
        &self.sample
    }

    pub fn plan(&self) -> &LayoutPlan<'a, Record> {
        &self.plan
    }

    /// Append this group's slides to `deck`; returns how many were added.
    pub fn draw(
        &self,
        deck: &mut Deck,
        blank_layout: usize,
        image_root: Option<&Path>,
    ) -> Result<usize, Error> {
        for placements in self.plan.placements() {
            let slide = deck.add_slide(blank_layout);
            for (offset, record) in placements {
                let mut cloners = self.sample.cloners();
                for cloner in &mut cloners {
                    cloner.draw(slide, offset)?;
                }
                self.bind(slide, &cloners, record, image_root)?;
            }
        }
        Ok(self.plan.num_slides())
    }

    fn bind(
        &self,
        slide: &mut Slide,
        cloners: &[ShapeCloner<'_>],
        record: &Record,
        image_root: Option<&Path>,
    ) -> Result<(), Error> {
        for cloner in cloners {
            let descriptor = cloner.descriptor();
            let Some(label) = descriptor.label().filter(|l| !l.is_empty()) else {
                continue;
            };
            // no field keeps the template content
            let Some(value) = record.get(label) else {
                continue;
            };
            match &descriptor.body {
                DescriptorBody::TextBox(_) | DescriptorBody::AutoShape { .. } => {
                    cloner.set_text(slide, &value.to_string())?;
                }
                DescriptorBody::Image { .. } => {
                    let Some(root) = image_root else {
                        continue;
                    };
                    if let Some(image) = self.load_image(root, value, record, label) {
                        cloner.set_image(slide, image)?;
                    }
                }
                DescriptorBody::Connector { .. } => {}
            }
        }
        Ok(())
    }

    fn load_image(
        &self,
        root: &Path,
        value: &FieldValue,
        record: &Record,
        label: &str,
    ) -> Option<ImageData> {
        let FieldValue::Text(raw) = value else {
            log::warn!(
                "Sample {}, row {}: field '{}' holds {} rather than an image path; keeping the template image",
                self.sample_index,
                record.row,
                label,
                value
            );
            return None;
        };
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }
        let path = root.join(raw);
        match std::fs::read(&path) {
            Ok(bytes) => {
                let ext = path
                    .extension()
                    .and_then(|e| e.to_str())
                    .unwrap_or("png")
                    .to_ascii_lowercase();
                Some(ImageData::sniff(bytes, &ext))
            }
            Err(e) => {
                log::warn!(
                    "Sample {}, row {}: cannot read image for '{}' from {}: {}; keeping the template image",
                    self.sample_index,
                    record.row,
                    label,
                    path.display(),
                    e
                );
                None
            }
        }
    }
}

/// Fill `deck` with one tiled copy of its sample slides per record.
///
/// Template slides stay in place; generated slides are appended group by group
/// in ascending sample number. Every group is planned before the first slide is
/// added, so an authoring or layout error leaves `deck` untouched.
pub fn generate(
    deck: &mut Deck,
    records: &RecordSet,
    options: &GenerateOptions,
) -> Result<GenerationReport, Error> {
    let template_slides = deck.slides.len();
    if options.blank_layout >= deck.layouts.len() {
        return Err(Error::InvalidPptx(format!(
            "blank layout {} requested but the slide master has {} layouts",
            options.blank_layout,
            deck.layouts.len()
        )));
    }

    let mut report = GenerationReport::default();
    for rejected in &records.rejected {
        log::warn!("Skipping row {}: {}", rejected.row, rejected.reason);
        report.rejected_rows.push(rejected.clone());
    }

    let groups = records.group_by_sample();
    let slide_size = (deck.slide_width_cm(), deck.slide_height_cm());
    let mut drawers = Vec::with_capacity(groups.len());
    for (&sample_index, group) in &groups {
        if sample_index >= template_slides {
            let reason = format!(
                "sample {sample_index} requested by {} record(s) (first at row {}) but the template has only {template_slides} slide(s)",
                group.len(),
                group.first().map(|r| r.row).unwrap_or_default()
            );
            log::warn!("Skipping group: {reason}");
            report.skipped.push(SkippedGroup {
                sample: sample_index,
                records: group.len(),
                reason,
            });
            continue;
        }
        let sample = Sample::from_slide(&deck.slides[sample_index]).map_err(|e| match e {
            Error::Authoring(msg) => Error::Authoring(format!("sample slide {sample_index}: {msg}")),
            other => other,
        })?;
        sample.check_labels()?;
        let drawer = SlideDrawer::new(sample_index, sample, group, slide_size, &options.layout)?;
        let p = &drawer.plan().positioner;
        log::info!(
            "Sample {}: {} record(s), {}x{} grid, {} per slide, {} slide(s)",
            sample_index,
            group.len(),
            p.num_col,
            p.num_row,
            p.num_per_slide,
            drawer.plan().num_slides()
        );
        drawers.push(drawer);
    }

    for drawer in &drawers {
        let slides = drawer.draw(deck, options.blank_layout, options.image_root.as_deref())?;
        report.groups.push(GroupSummary {
            sample: drawer.sample_index,
            records: drawer.plan().batches().iter().map(|b| b.len()).sum(),
            slides,
            per_slide: drawer.plan().positioner.num_per_slide,
        });
    }

    log::info!(
        "Generated {} slide(s) for {} record(s); {} group(s) skipped, {} row(s) rejected",
        report.slides_added(),
        report.records_drawn(),
        report.skipped.len(),
        report.rejected_rows.len()
    );
    Ok(report)
}
