//! Ordered collection of data points with inclusion flags.
//!
//! Exclusion only flips `included`; values are never touched and points are
//! never dropped, so toggling back is lossless. Nothing here triggers a refit.

use serde::{Deserialize, Serialize};

use crate::domain::{DataPoint, PointId, SeriesId};
use crate::error::FitError;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    points: Vec<DataPoint>,
    next_id: usize,
}

impl Dataset {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an included point and return its id.
    pub fn push(
        &mut self,
        series_id: SeriesId,
        row: usize,
        substrate_concentration: f64,
        observed_rate: f64,
    ) -> PointId {
        let id = PointId(self.next_id);
        self.next_id += 1;
        self.points.push(DataPoint {
            id,
            series_id,
            row,
            substrate_concentration,
            observed_rate,
            included: true,
        });
        id
    }

    /// Remove a point entirely.
    pub fn remove(&mut self, id: PointId) -> Result<DataPoint, FitError> {
        let idx = self.index_of(id)?;
        Ok(self.points.remove(idx))
    }

    pub fn points(&self) -> &[DataPoint] {
        &self.points
    }

    pub fn get(&self, id: PointId) -> Option<&DataPoint> {
        self.points.iter().find(|p| p.id == id)
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn included(&self) -> impl Iterator<Item = &DataPoint> {
        self.points.iter().filter(|p| p.included)
    }

    pub fn included_count(&self) -> usize {
        self.included().count()
    }

    /// Series labels in order of first appearance.
    pub fn series_ids(&self) -> Vec<SeriesId> {
        let mut out: Vec<SeriesId> = Vec::new();
        for p in &self.points {
            if !out.contains(&p.series_id) {
                out.push(p.series_id.clone());
            }
        }
        out
    }

    /// Snapshot restricted to one series. Ids are preserved.
    pub fn series(&self, series_id: &SeriesId) -> Dataset {
        Dataset {
            points: self
                .points
                .iter()
                .filter(|p| &p.series_id == series_id)
                .cloned()
                .collect(),
            next_id: self.next_id,
        }
    }

    /// Ids of every point (any series) that came from table row `row`.
    pub fn ids_in_row(&self, row: usize) -> Vec<PointId> {
        self.points.iter().filter(|p| p.row == row).map(|p| p.id).collect()
    }

    pub fn find(&self, series_id: &SeriesId, row: usize) -> Option<PointId> {
        self.points
            .iter()
            .find(|p| &p.series_id == series_id && p.row == row)
            .map(|p| p.id)
    }

    /// Set the inclusion flag of the given points in place.
    ///
    /// All ids are validated before anything changes.
    pub fn set_included(&mut self, ids: &[PointId], included: bool) -> Result<(), FitError> {
        let indices = ids
            .iter()
            .map(|&id| self.index_of(id))
            .collect::<Result<Vec<_>, _>>()?;
        for idx in indices {
            self.points[idx].included = included;
        }
        Ok(())
    }

    /// Copy of the dataset with the given points excluded.
    pub fn exclude(&self, ids: &[PointId]) -> Result<Dataset, FitError> {
        let mut out = self.clone();
        out.set_included(ids, false)?;
        Ok(out)
    }

    /// Copy of the dataset with the given points included again.
    pub fn include(&self, ids: &[PointId]) -> Result<Dataset, FitError> {
        let mut out = self.clone();
        out.set_included(ids, true)?;
        Ok(out)
    }

    /// Flip the inclusion flag of a single point.
    pub fn toggle(&mut self, id: PointId) -> Result<bool, FitError> {
        let idx = self.index_of(id)?;
        let point = &mut self.points[idx];
        point.included = !point.included;
        Ok(point.included)
    }

    fn index_of(&self, id: PointId) -> Result<usize, FitError> {
        self.points
            .iter()
            .position(|p| p.id == id)
            .ok_or(FitError::UnknownPoint(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Dataset {
        let mut ds = Dataset::new();
        for (row, (s, v)) in [(1.0, 0.5), (2.0, 0.8), (4.0, 1.2)].into_iter().enumerate() {
            ds.push(SeriesId::from("v0"), row + 1, s, v);
            ds.push(SeriesId::from("v1"), row + 1, s, v * 2.0);
        }
        ds
    }

    #[test]
    fn exclude_only_flips_the_flag() {
        let ds = sample();
        let target = ds.points()[2].id;
        let excluded = ds.exclude(&[target]).unwrap();

        assert_eq!(excluded.len(), ds.len());
        for (before, after) in ds.points().iter().zip(excluded.points()) {
            assert_eq!(before.substrate_concentration, after.substrate_concentration);
            assert_eq!(before.observed_rate, after.observed_rate);
            assert_eq!(after.included, before.id != target);
        }
        // The source snapshot is untouched.
        assert!(ds.points().iter().all(|p| p.included));
    }

    #[test]
    fn include_after_exclude_restores_the_dataset() {
        let ds = sample();
        let ids = ds.ids_in_row(2);
        let round_trip = ds.exclude(&ids).unwrap().include(&ids).unwrap();
        assert_eq!(round_trip, ds);

        let again = round_trip.exclude(&ids).unwrap();
        assert_eq!(again, ds.exclude(&ids).unwrap());
    }

    #[test]
    fn unknown_id_leaves_dataset_unchanged() {
        let mut ds = sample();
        let known = ds.points()[0].id;
        let err = ds.set_included(&[known, PointId(999)], false).unwrap_err();
        assert_eq!(err, FitError::UnknownPoint(PointId(999)));
        assert!(ds.points()[0].included);
    }

    #[test]
    fn series_snapshot_keeps_ids_and_order() {
        let ds = sample();
        assert_eq!(ds.series_ids(), vec![SeriesId::from("v0"), SeriesId::from("v1")]);

        let v1 = ds.series(&SeriesId::from("v1"));
        assert_eq!(v1.len(), 3);
        assert_eq!(v1.points()[0].id, PointId(1));
        assert_eq!(ds.find(&SeriesId::from("v1"), 3), Some(PointId(5)));
    }

    #[test]
    fn removed_ids_are_not_reused() {
        let mut ds = sample();
        let removed = ds.remove(PointId(0)).unwrap();
        assert_eq!(removed.observed_rate, 0.5);
        let id = ds.push(SeriesId::from("v0"), 4, 8.0, 1.5);
        assert_eq!(id, PointId(6));
        assert!(!ds.toggle(id).unwrap());
        assert_eq!(ds.included_count(), 5);
    }
}
