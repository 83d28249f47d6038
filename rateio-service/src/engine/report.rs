use std::{
    io::Write,
    path::{Path, PathBuf},
};

use rateio_client::domain::Period;
use tempfile::NamedTempFile;

use super::{Allocation, EngineError};

const COLUMN_HEADER: [&str; 6] = [
    "Bloco",
    "Apartamento",
    "Leitura anterior (m³)",
    "Leitura atual (m³)",
    "Consumo unitário (m³)",
    "% rateio",
];

const BLANK_ROW: [&str; 3] = ["", "", ""];

/// `{output_dir}/{condominium}_{month}_{year}.csv`, month without padding.
pub fn report_path(output_dir: &Path, condominium_name: &str, current: Period) -> PathBuf {
    output_dir.join(format!(
        "{}_{}_{}.csv",
        condominium_name,
        current.month(),
        current.year()
    ))
}

/// Render the allocation report.
///
/// Layout:
/// - `Condominio:`, `Periodo:` (`MM/YYYY a MM/YYYY`), blank row
/// - `Volume total (m³):`, blank row
/// - column header, then one row per apartment in allocation order
pub fn render_report(
    condominium_name: &str,
    baseline: Period,
    current: Period,
    allocation: &Allocation,
) -> Result<Vec<u8>, EngineError> {
    let mut wtr = csv::WriterBuilder::new()
        .flexible(true)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    let range = format!("{baseline} a {current}");
    let total = allocation.total_consumption.to_string();

    wtr.write_record(["Condominio:", condominium_name])?;
    wtr.write_record(["Periodo:", range.as_str()])?;
    wtr.write_record(BLANK_ROW)?;
    wtr.write_record(["Volume total (m³):", total.as_str()])?;
    wtr.write_record(BLANK_ROW)?;
    wtr.write_record(COLUMN_HEADER)?;

    for row in &allocation.rows {
        wtr.write_record([
            row.apartment.block.clone(),
            row.apartment.formatted_number(),
            row.previous_value.to_string(),
            row.current_value.to_string(),
            row.consumption.to_string(),
            row.share_display(),
        ])?;
    }

    wtr.into_inner()
        .map_err(|e| EngineError::Io(e.into_error()))
}

/// Write the report to `destination`, replacing any previous file.
///
/// The content is staged in a temporary file next to `destination` and renamed
/// into place, so a failed write never leaves a truncated report behind.
pub fn write_report(
    destination: &Path,
    condominium_name: &str,
    baseline: Period,
    current: Period,
    allocation: &Allocation,
) -> Result<(), EngineError> {
    let res = render_report(condominium_name, baseline, current, allocation)
        .and_then(|bytes| persist_atomically(destination, &bytes));

    match &res {
        Ok(()) => {
            metrics::counter!("reports_written_total").increment(1);
            tracing::info!(
                path = %destination.display(),
                rows = allocation.rows.len(),
                total_consumption = allocation.total_consumption,
                "allocation report written"
            );
        }
        Err(e) => {
            metrics::counter!("report_failures_total").increment(1);
            tracing::error!(error = %e, path = %destination.display(), "failed to write allocation report");
        }
    }
    res
}

fn persist_atomically(destination: &Path, bytes: &[u8]) -> Result<(), EngineError> {
    let dir = match destination.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;

    let mut staged = NamedTempFile::new_in(dir)?;
    staged.write_all(bytes)?;
    staged.as_file().sync_all()?;
    staged.persist(destination).map_err(|e| EngineError::Io(e.error))?;
    Ok(())
}
