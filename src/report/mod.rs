//! Reporting utilities: per-point residual rows and formatted terminal output.

pub mod format;

pub use format::*;

use serde::Serialize;

use crate::app::pipeline::RunOutput;
use crate::domain::{Dataset, PointId, SeriesId};

/// One point with its fitted value, for tables and exports.
///
/// Excluded points get a predicted value too (from the fit they were left
/// out of), so outliers can be judged against the curve.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResidualRow {
    pub series: SeriesId,
    pub row: usize,
    pub point_id: PointId,
    pub substrate_concentration: f64,
    pub observed_rate: f64,
    pub included: bool,
    pub predicted_rate: Option<f64>,
    pub residual: Option<f64>,
}

/// Residual rows for every point of the fitted series, in dataset order.
pub fn compute_residuals(dataset: &Dataset, run: &RunOutput) -> Vec<ResidualRow> {
    dataset
        .points()
        .iter()
        .filter_map(|p| {
            let series_fit = run.get(&p.series_id)?;
            let predicted = match &series_fit.fit {
                Ok(f) if f.converged => Some(f.predict(p.substrate_concentration)),
                _ => None,
            };
            Some(ResidualRow {
                series: p.series_id.clone(),
                row: p.row,
                point_id: p.id,
                substrate_concentration: p.substrate_concentration,
                observed_rate: p.observed_rate,
                included: p.included,
                predicted_rate: predicted,
                residual: predicted.map(|y| p.observed_rate - y),
            })
        })
        .collect()
}
