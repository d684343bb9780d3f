//! CSV export of resolved incidents.

use std::io::Write;
use std::path::Path;

use crime_hotspots_incident_models::IncidentRecord;

/// Writes `records` as CSV to `writer`, header first.
///
/// # Errors
///
/// Returns [`csv::Error`] if serialization or the underlying write fails.
pub fn write_csv<W: Write>(writer: W, records: &[IncidentRecord]) -> Result<usize, csv::Error> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);

    writer.write_record(IncidentRecord::COLUMNS)?;
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;

    Ok(records.len())
}

/// Writes `records` to a CSV file at `path`, creating parent directories.
///
/// # Errors
///
/// Returns [`csv::Error`] if the file cannot be created or written.
pub fn export_csv(path: &Path, records: &[IncidentRecord]) -> Result<usize, csv::Error> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let written = write_csv(std::fs::File::create(path)?, records)?;
    log::info!("Exported {written} records to {}", path.display());

    Ok(written)
}
