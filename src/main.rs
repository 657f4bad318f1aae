use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use slidetile::{GenerateOptions, LayoutConfig, Spacing};

/// Tile a sample slide once per spreadsheet row.
///
/// Each template slide is a sample; a row's `sample num` column picks which one
/// it is drawn from (0 when the column is missing). Text boxes and shapes whose
/// text matches a column header are filled with that row's value.
#[derive(Parser, Debug)]
#[command(name = "slidetile", author, version, about, long_about = None)]
struct Args {
    /// Template .pptx whose slides are the samples
    template: PathBuf,

    /// .xlsx workbook; the first sheet's first row is the header
    data: PathBuf,

    /// Output file [default: generated-<template> next to the template]
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Gap between neighbouring samples in cm, as X,Y
    #[arg(long, value_parser = parse_spacing, default_value = "0,0")]
    margin: Spacing,

    /// Inset around every sample in cm, as X,Y
    #[arg(long, value_parser = parse_spacing, default_value = "0,0")]
    padding: Spacing,

    /// Upper bound on samples per slide
    #[arg(long)]
    per_slide: Option<usize>,

    /// Slide layout (0-based, in master order) for generated slides
    #[arg(long, default_value_t = 0)]
    blank_layout: usize,

    /// Leave pictures as drawn in the template even when a column matches them
    #[arg(long)]
    no_images: bool,
}

fn parse_spacing(s: &str) -> Result<Spacing, String> {
    let (x, y) = match s.split_once(',') {
        Some((x, y)) => (x, y),
        None => (s, s),
    };
    let parse = |v: &str| {
        v.trim()
            .parse::<f64>()
            .map_err(|_| format!("'{v}' is not a length in cm"))
    };
    Ok(Spacing::new(parse(x)?, parse(y)?))
}

fn default_output(template: &Path) -> PathBuf {
    let name = template
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output.pptx".to_string());
    template.with_file_name(format!("generated-{name}"))
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let output = args
        .output
        .clone()
        .unwrap_or_else(|| default_output(&args.template));
    let image_root = (!args.no_images).then(|| {
        args.data
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default()
    });
    let options = GenerateOptions {
        layout: LayoutConfig {
            margin: args.margin,
            padding: args.padding,
            per_slide: args.per_slide,
        },
        blank_layout: args.blank_layout,
        image_root,
    };

    match slidetile::generate_deck(&args.template, &args.data, &output, &options) {
        Ok(report) => {
            for skipped in &report.skipped {
                eprintln!("warning: skipped sample {}: {}", skipped.sample, skipped.reason);
            }
            for row in &report.rejected_rows {
                eprintln!("warning: skipped row {}: {}", row.row, row.reason);
            }
            println!(
                "{} -> {} ({} slide(s) added)",
                args.template.display(),
                output.display(),
                report.slides_added()
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
