//! Edit-fit-edit-refit session.
//!
//! A `Session` owns the current dataset and the outputs of the last fit pass,
//! mirroring the paste / fit / exclude / apply-and-refit / reset workflow.
//! Toggling points never refits by itself; `fit` has to be called again.

use crate::app::pipeline::{RunOutput, fit_all_series};
use crate::domain::{Dataset, FitOptions, PointId, SeriesId};
use crate::error::FitError;
use crate::io::paste::parse_dataset;

#[derive(Debug, Clone, Default)]
pub struct Session {
    dataset: Dataset,
    options: FitOptions,
    last_run: Option<RunOutput>,
}

impl Session {
    pub fn new(options: FitOptions) -> Self {
        Self {
            dataset: Dataset::new(),
            options,
            last_run: None,
        }
    }

    /// Replace the dataset with pasted text.
    ///
    /// On a parse error the current dataset is kept as it was.
    pub fn paste(&mut self, text: &str) -> Result<usize, FitError> {
        let dataset = parse_dataset(text)?;
        let n = dataset.len();
        self.load(dataset);
        Ok(n)
    }

    /// Replace the dataset and drop any previous fit.
    pub fn load(&mut self, dataset: Dataset) {
        self.dataset = dataset;
        self.last_run = None;
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    pub fn options(&self) -> &FitOptions {
        &self.options
    }

    pub fn set_options(&mut self, options: FitOptions) {
        self.options = options;
    }

    pub fn set_included(&mut self, ids: &[PointId], included: bool) -> Result<(), FitError> {
        self.dataset.set_included(ids, included)
    }

    pub fn toggle(&mut self, id: PointId) -> Result<bool, FitError> {
        self.dataset.toggle(id)
    }

    /// Exclude one `(series, row)` cell.
    pub fn exclude_point(&mut self, series: &SeriesId, row: usize) -> Result<PointId, FitError> {
        let id = self
            .dataset
            .find(series, row)
            .ok_or_else(|| FitError::UnknownCell {
                series: series.clone(),
                row,
            })?;
        self.dataset.set_included(&[id], false)?;
        Ok(id)
    }

    /// Exclude every point of a table row (all series).
    pub fn exclude_row(&mut self, row: usize) -> Result<Vec<PointId>, FitError> {
        let ids = self.dataset.ids_in_row(row);
        self.dataset.set_included(&ids, false)?;
        Ok(ids)
    }

    /// Fit the current snapshot and remember the result.
    pub fn fit(&mut self, series: &[SeriesId], with_lineweaver_burk: bool) -> &RunOutput {
        let run = fit_all_series(&self.dataset, series, &self.options, with_lineweaver_burk);
        self.last_run.insert(run)
    }

    /// Make `excluded` the exact set of excluded points, then refit.
    ///
    /// Every other point is included again. On an unknown id nothing changes.
    pub fn apply_and_refit(
        &mut self,
        excluded: &[PointId],
        series: &[SeriesId],
        with_lineweaver_burk: bool,
    ) -> Result<&RunOutput, FitError> {
        if let Some(&id) = excluded.iter().find(|&&id| self.dataset.get(id).is_none()) {
            return Err(FitError::UnknownPoint(id));
        }
        let all: Vec<PointId> = self.dataset.points().iter().map(|p| p.id).collect();
        self.dataset.set_included(&all, true)?;
        self.dataset.set_included(excluded, false)?;
        Ok(self.fit(series, with_lineweaver_burk))
    }

    pub fn last_run(&self) -> Option<&RunOutput> {
        self.last_run.as_ref()
    }

    pub fn reset(&mut self) {
        self.dataset = Dataset::new();
        self.last_run = None;
    }
}
