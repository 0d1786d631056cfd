//! Write fit results as JSON.
//!
//! The JSON file is the portable record of a run: options, one entry per
//! series (fit statistics or the error that prevented the fit, plus the
//! optional Lineweaver-Burk cross-check), and the smallest Km. Non-finite
//! numbers (failed fits, unbounded errors) are written as `null`.

use std::fs::File;
use std::path::Path;

use serde::Serialize;

use crate::app::pipeline::{LineweaverBurkFit, RunOutput};
use crate::domain::{FitOptions, FitResult, SeriesId};
use crate::error::AppError;

#[derive(Debug, Clone, Serialize)]
pub struct ResultsFile<'a> {
    pub tool: &'static str,
    pub options: &'a FitOptions,
    pub series: Vec<SeriesEntry<'a>>,
    pub best_km: Option<&'a (SeriesId, f64)>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SeriesEntry<'a> {
    pub series: &'a SeriesId,
    pub fit: Option<&'a FitResult>,
    pub error: Option<String>,
    pub lineweaver_burk: Option<&'a LineweaverBurkFit>,
    pub lineweaver_burk_error: Option<String>,
}

impl<'a> ResultsFile<'a> {
    pub fn new(run: &'a RunOutput, options: &'a FitOptions) -> Self {
        let series = run
            .series
            .iter()
            .map(|s| {
                let (lineweaver_burk, lineweaver_burk_error) = match &s.lineweaver_burk {
                    Some(Ok(lb)) => (Some(lb), None),
                    Some(Err(e)) => (None, Some(e.to_string())),
                    None => (None, None),
                };
                SeriesEntry {
                    series: &s.series,
                    fit: s.fit.as_ref().ok(),
                    error: s.fit.as_ref().err().map(|e| e.to_string()),
                    lineweaver_burk,
                    lineweaver_burk_error,
                }
            })
            .collect();

        Self {
            tool: "mmfit",
            options,
            series,
            best_km: run.best_km.as_ref(),
        }
    }
}

/// Write a results JSON file.
pub fn write_results_json(path: &Path, run: &RunOutput, options: &FitOptions) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create results JSON '{}': {e}", path.display())))?;

    serde_json::to_writer_pretty(file, &ResultsFile::new(run, options))
        .map_err(|e| AppError::new(2, format!("Failed to write results JSON: {e}")))?;

    log::info!("wrote results to {}", path.display());
    Ok(())
}
