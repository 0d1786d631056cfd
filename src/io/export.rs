//! Export per-point results to CSV.
//!
//! The export is meant to be easy to consume in spreadsheets: one row per
//! point, with its series, inclusion flag, fitted value and residual.

use std::io::Write;
use std::path::Path;

use crate::error::AppError;
use crate::report::ResidualRow;

/// Write residual rows to a CSV file.
pub fn write_results_csv(path: &Path, rows: &[ResidualRow]) -> Result<(), AppError> {
    let file = std::fs::File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create export CSV '{}': {e}", path.display())))?;
    write_results(file, rows)?;
    log::info!("wrote {} rows to {}", rows.len(), path.display());
    Ok(())
}

/// Write residual rows as CSV to any writer.
pub fn write_results<W: Write>(writer: W, rows: &[ResidualRow]) -> Result<(), AppError> {
    let mut csv = csv::Writer::from_writer(writer);
    for row in rows {
        csv.serialize(row)
            .map_err(|e| AppError::new(2, format!("Failed to write export CSV row: {e}")))?;
    }
    csv.flush()
        .map_err(|e| AppError::new(2, format!("Failed to flush export CSV: {e}")))?;
    Ok(())
}
