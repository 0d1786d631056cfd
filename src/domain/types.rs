//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - used in-memory during fitting
//! - exported to JSON/CSV
//! - compared directly in tests (dataset snapshots, fit results)

use std::fmt;
use std::path::PathBuf;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Stable identifier of a point inside a `Dataset`.
///
/// Ids are assigned on insertion and never reused, so they stay valid across
/// exclusion toggles and removals of other points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PointId(pub usize);

impl fmt::Display for PointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Label of an experimental series (one rate column of the input table).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SeriesId(pub String);

impl SeriesId {
    pub fn new(label: impl Into<String>) -> Self {
        Self(label.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SeriesId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SeriesId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// One `(S, v0)` observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataPoint {
    pub id: PointId,
    pub series_id: SeriesId,
    /// 1-based row of the input table this point came from.
    pub row: usize,
    pub substrate_concentration: f64,
    pub observed_rate: f64,
    /// Whether the point participates in the next fit.
    pub included: bool,
}

/// Residual weighting scheme for the nonlinear fit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Weighting {
    /// Ordinary least squares.
    #[default]
    None,
    /// Relative residuals, weight `1 / v²`. Requires nonzero rates.
    Relative,
}

impl fmt::Display for Weighting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Weighting::None => "none",
            Weighting::Relative => "relative",
        })
    }
}

/// Options that affect how a single fit is computed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitOptions {
    pub weighting: Weighting,
    /// Optimizer patience (bounded iteration count).
    pub max_iterations: usize,
    /// Relative tolerance on the objective and on the parameter step.
    pub tolerance: f64,
}

impl Default for FitOptions {
    fn default() -> Self {
        Self {
            weighting: Weighting::None,
            max_iterations: 200,
            tolerance: 1e-10,
        }
    }
}

impl FitOptions {
    /// Reject settings the optimizer cannot run with.
    pub fn validate(&self) -> Result<(), crate::error::FitError> {
        if !(self.tolerance.is_finite() && self.tolerance >= 0.0) {
            return Err(crate::error::FitError::InvalidOptions {
                reason: format!("tolerance must be a finite number >= 0, got {}", self.tolerance),
            });
        }
        if self.max_iterations == 0 {
            return Err(crate::error::FitError::InvalidOptions {
                reason: "max_iterations must be > 0".to_string(),
            });
        }
        Ok(())
    }
}

/// Non-fatal problems with a converged fit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityIssue {
    NegativeVmax,
    NegativeKm,
    /// Km lies above the highest included concentration, so the plateau is
    /// not observed and Vmax is poorly determined.
    KmAboveRange,
}

impl QualityIssue {
    pub fn describe(self) -> &'static str {
        match self {
            QualityIssue::NegativeVmax => "Vmax is negative",
            QualityIssue::NegativeKm => "Km is negative",
            QualityIssue::KmAboveRange => "Km exceeds the highest concentration",
        }
    }
}

/// Outcome of a Michaelis-Menten fit.
///
/// A new value is produced on every fit; nothing mutates it afterwards. When
/// `converged` is false the parameters and statistics are NaN.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitResult {
    pub v_max: f64,
    pub k_m: f64,
    pub v_max_se: f64,
    pub k_m_se: f64,
    pub v_max_rse_pct: f64,
    pub k_m_rse_pct: f64,
    pub r_squared: f64,
    /// `observed − predicted`, one per included point, in dataset order.
    pub residuals: Vec<f64>,
    /// Ids of the points the residuals belong to.
    pub point_ids: Vec<PointId>,
    /// Sum of squared (unweighted) residuals.
    pub ssr: f64,
    pub converged: bool,
    /// Optimizer's stopping reason, for diagnostics.
    pub termination: String,
    pub evaluations: usize,
    pub weighting: Weighting,
    pub quality_issues: Vec<QualityIssue>,
}

impl FitResult {
    pub fn n_points(&self) -> usize {
        self.point_ids.len()
    }

    /// Predicted rate at concentration `s` (NaN for a failed fit).
    pub fn predict(&self, s: f64) -> f64 {
        crate::models::michaelis_menten(s, self.v_max, self.k_m)
    }

    /// Turn a non-converged result into an error.
    pub fn require_converged(self) -> Result<Self, crate::error::FitError> {
        if self.converged {
            Ok(self)
        } else {
            Err(crate::error::FitError::DidNotConverge {
                reason: self.termination,
            })
        }
    }
}

/// A Lineweaver-Burk point `(1/S, 1/v0)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinearPoint {
    pub id: PointId,
    pub x: f64,
    pub y: f64,
}

/// Ordinary least-squares line `y = slope·x + intercept`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinearFit {
    pub slope: f64,
    pub intercept: f64,
    pub slope_se: f64,
    pub intercept_se: f64,
    pub r_squared: f64,
    pub n: usize,
}

/// Vmax/Km recovered from a Lineweaver-Burk line.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LineweaverBurkEstimate {
    pub v_max: f64,
    pub k_m: f64,
    pub v_max_se: f64,
    pub k_m_se: f64,
    pub v_max_rse_pct: f64,
    pub k_m_rse_pct: f64,
    /// Where the line crosses the x axis, `−1/Km`.
    pub x_intercept: f64,
}

/// Fully-resolved configuration for one `mmfit` run.
#[derive(Debug, Clone)]
pub struct FitConfig {
    /// Input table; `None` or `-` reads stdin.
    pub input: Option<PathBuf>,
    /// Series to fit (empty = all).
    pub series: Vec<SeriesId>,
    /// Points to exclude, as `(series, row)`.
    pub exclude_points: Vec<(SeriesId, usize)>,
    /// Table rows to exclude across all series.
    pub exclude_rows: Vec<usize>,
    pub options: FitOptions,
    pub lineweaver_burk: bool,
    pub export_results: Option<PathBuf>,
    pub export_json: Option<PathBuf>,
}
