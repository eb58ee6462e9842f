//! CSV export for discharge sample traces.

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use crate::trace::SampleRow;

/// Schema v1 column header for CSV trace export.
const HEADER: &str = "time_s,current_a,voltage_v,remaining_j,energy_fraction,drained_capacity_ah";

/// Exports a sample trace to a CSV file at the given path.
///
/// Writes a header row followed by one data row per sample using the
/// schema v1 column layout. Produces deterministic output for identical
/// inputs.
///
/// # Arguments
///
/// * `rows` - Complete sample trace
/// * `path` - Output file path
///
/// # Errors
///
/// Returns an `io::Error` if file creation or writing fails.
pub fn export_csv(rows: &[SampleRow], path: &Path) -> io::Result<()> {
    let file = File::create(path)?;
    let buf = io::BufWriter::new(file);
    write_csv(rows, buf)
}

/// Writes a sample trace as CSV to any writer.
///
/// # Arguments
///
/// * `rows` - Complete sample trace
/// * `writer` - Destination implementing `Write`
///
/// # Errors
///
/// Returns an `io::Error` if writing fails.
pub fn write_csv(rows: &[SampleRow], writer: impl Write) -> io::Result<()> {
    let mut wtr = csv::WriterBuilder::new().from_writer(writer);

    // Header
    wtr.write_record(HEADER.split(','))?;

    // Data rows
    for r in rows {
        wtr.write_record(&[
            format!("{:.3}", r.time_s),
            format!("{:.6}", r.current_a),
            format!("{:.6}", r.voltage_v),
            format!("{:.6}", r.remaining_j),
            format!("{:.6}", r.energy_fraction),
            format!("{:.6}", r.drained_capacity_ah),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}
