pub mod canvas;
pub mod cloner;
pub mod drawer;
mod error;
pub mod geometry;
pub mod layout;
pub mod model;
pub mod pptx;
pub mod records;
pub mod sample;

pub use drawer::{GenerateOptions, GenerationReport, generate};
pub use error::Error;
pub use layout::{LayoutConfig, Spacing};
pub use records::RecordSet;

use std::path::Path;
use std::time::Instant;

/// Read `template` and the `.xlsx` at `data`, tile every record onto new
/// slides, and write the result to `output`.
pub fn generate_deck(
    template: &Path,
    data: &Path,
    output: &Path,
    options: &GenerateOptions,
) -> Result<GenerationReport, Error> {
    let t0 = Instant::now();

    let mut deck = pptx::open(template)?;
    let records = records::read_xlsx(data)?;
    let t_read = t0.elapsed();

    let report = generate(&mut deck, &records, options)?;
    let t_draw = t0.elapsed();

    let bytes = pptx::to_bytes(&deck)?;
    std::fs::write(output, &bytes).map_err(|e| {
        Error::Io(std::io::Error::new(e.kind(), format!("{}: {}", e, output.display())))
    })?;
    let t_total = t0.elapsed();

    log::info!(
        "Timing: read={:.1}ms, draw={:.1}ms, write={:.1}ms, total={:.1}ms (output {} bytes)",
        t_read.as_secs_f64() * 1000.0,
        (t_draw - t_read).as_secs_f64() * 1000.0,
        (t_total - t_draw).as_secs_f64() * 1000.0,
        t_total.as_secs_f64() * 1000.0,
        bytes.len(),
    );

    Ok(report)
}
