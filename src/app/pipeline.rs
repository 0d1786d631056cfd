//! Shared "fit pipeline" logic used by the session and the CLI.
//!
//! Keeping this in one place avoids duplicating the core workflow:
//! dataset snapshot -> per-series fit -> optional Lineweaver-Burk check -> best Km
//!
//! Series are fitted independently; nothing is shared between them.

use serde::Serialize;

use crate::domain::{Dataset, FitOptions, FitResult, LinearFit, LinearPoint, LineweaverBurkEstimate, SeriesId};
use crate::error::FitError;
use crate::fit::{fit, linear_fit, linearize};

/// Linearized points, the fitted line and the parameters read off it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineweaverBurkFit {
    pub points: Vec<LinearPoint>,
    pub line: LinearFit,
    pub estimate: LineweaverBurkEstimate,
}

/// Outcome for one series. Failures are kept per series so one bad column
/// does not hide the others.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesFit {
    pub series: SeriesId,
    pub fit: Result<FitResult, FitError>,
    pub lineweaver_burk: Option<Result<LineweaverBurkFit, FitError>>,
}

/// All computed outputs of one fit pass over a dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct RunOutput {
    pub series: Vec<SeriesFit>,
    /// Series with the smallest positive converged Km.
    pub best_km: Option<(SeriesId, f64)>,
}

impl RunOutput {
    pub fn get(&self, series: &SeriesId) -> Option<&SeriesFit> {
        self.series.iter().find(|s| &s.series == series)
    }

    /// Number of series that produced a converged fit.
    pub fn converged_count(&self) -> usize {
        self.series
            .iter()
            .filter(|s| matches!(&s.fit, Ok(f) if f.converged))
            .count()
    }
}

/// Lineweaver-Burk cross-check of one dataset snapshot.
pub fn lineweaver_burk(dataset: &Dataset) -> Result<LineweaverBurkFit, FitError> {
    let points = linearize(dataset)?;
    let line = linear_fit(&points)?;
    Ok(LineweaverBurkFit {
        estimate: line.lineweaver_burk(),
        points,
        line,
    })
}

/// Fit every requested series of `dataset` (all series when `filter` is empty).
pub fn fit_all_series(
    dataset: &Dataset,
    filter: &[SeriesId],
    opts: &FitOptions,
    with_lineweaver_burk: bool,
) -> RunOutput {
    let series_ids: Vec<SeriesId> = dataset
        .series_ids()
        .into_iter()
        .filter(|id| filter.is_empty() || filter.contains(id))
        .collect();

    let mut series = Vec::with_capacity(series_ids.len());
    for id in series_ids {
        let snapshot = dataset.series(&id);
        let result = fit(&snapshot, opts);
        match &result {
            Ok(f) if f.converged => log::info!(
                "series {id}: Vmax={:.4e} Km={:.4e} R²={:.4}",
                f.v_max,
                f.k_m,
                f.r_squared
            ),
            Ok(f) => log::warn!("series {id}: fit did not converge ({})", f.termination),
            Err(e) => log::warn!("series {id}: {e}"),
        }

        let lineweaver_burk = with_lineweaver_burk.then(|| lineweaver_burk(&snapshot));
        series.push(SeriesFit {
            series: id,
            fit: result,
            lineweaver_burk,
        });
    }

    let best_km = best_km(&series);
    RunOutput { series, best_km }
}

fn best_km(series: &[SeriesFit]) -> Option<(SeriesId, f64)> {
    series
        .iter()
        .filter_map(|s| match &s.fit {
            Ok(f) if f.converged && f.k_m > 0.0 => Some((s.series.clone(), f.k_m)),
            _ => None,
        })
        .min_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::michaelis_menten;
    use approx::assert_relative_eq;

    fn two_series() -> Dataset {
        let mut ds = Dataset::new();
        for (row, s) in [0.5, 1.0, 2.0, 4.0, 8.0, 16.0].into_iter().enumerate() {
            ds.push(SeriesId::from("fast"), row + 1, s, michaelis_menten(s, 2.0, 3.0));
            ds.push(SeriesId::from("slow"), row + 1, s, michaelis_menten(s, 1.0, 1.5));
        }
        ds
    }

    #[test]
    fn series_are_fitted_independently() {
        let run = fit_all_series(&two_series(), &[], &FitOptions::default(), false);

        assert_eq!(run.series.len(), 2);
        assert_eq!(run.converged_count(), 2);
        let fast = run.get(&SeriesId::from("fast")).unwrap().fit.as_ref().unwrap();
        let slow = run.get(&SeriesId::from("slow")).unwrap().fit.as_ref().unwrap();
        assert_relative_eq!(fast.k_m, 3.0, max_relative = 1e-6);
        assert_relative_eq!(slow.k_m, 1.5, max_relative = 1e-6);
        assert_eq!(fast.residuals.len(), 6);

        let (best, km) = run.best_km.clone().unwrap();
        assert_eq!(best, SeriesId::from("slow"));
        assert_relative_eq!(km, 1.5, max_relative = 1e-6);
    }

    #[test]
    fn filter_and_lineweaver_burk() {
        let run = fit_all_series(&two_series(), &[SeriesId::from("fast")], &FitOptions::default(), true);

        assert_eq!(run.series.len(), 1);
        let lb = run.series[0].lineweaver_burk.clone().unwrap().unwrap();
        assert_eq!(lb.points.len(), 6);
        assert_relative_eq!(lb.estimate.v_max, 2.0, max_relative = 1e-9);
    }

    #[test]
    fn failing_series_does_not_hide_the_others() {
        let mut ds = two_series();
        ds.push(SeriesId::from("lonely"), 1, 1.0, 0.4);

        let run = fit_all_series(&ds, &[], &FitOptions::default(), true);
        let lonely = run.get(&SeriesId::from("lonely")).unwrap();
        assert!(matches!(lonely.fit, Err(FitError::InsufficientData { .. })));
        assert!(matches!(lonely.lineweaver_burk, Some(Err(FitError::InsufficientData { .. }))));
        assert_eq!(run.converged_count(), 2);
    }
}
