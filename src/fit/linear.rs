//! Lineweaver-Burk linearization and straight-line fit.
//!
//! `1/v0 = (Km/Vmax)·(1/S) + 1/Vmax`, so an ordinary least-squares line
//! through `(1/S, 1/v0)` gives `slope = Km/Vmax` and `intercept = 1/Vmax`.
//! This is a consistency check next to the nonlinear fit, not the primary
//! estimate: the reciprocal transform distorts the error structure.

use nalgebra::{DMatrix, DVector};

use crate::domain::{Dataset, LineweaverBurkEstimate, LinearFit, LinearPoint};
use crate::error::FitError;
use crate::math::{distinct_count, parameter_standard_errors, r_squared, relative_error_pct, solve_least_squares};

/// Reciprocal transform of the included points, in dataset order.
///
/// A zero (or non-finite) concentration or rate is an error naming the point;
/// such points must be excluded first rather than skipped here.
pub fn linearize(dataset: &Dataset) -> Result<Vec<LinearPoint>, FitError> {
    dataset
        .included()
        .map(|p| {
            let (s, v) = (p.substrate_concentration, p.observed_rate);
            if s == 0.0 || !s.is_finite() {
                return Err(FitError::domain(
                    p.id,
                    &p.series_id,
                    format!("cannot take 1/S of substrate concentration {s}"),
                ));
            }
            if v == 0.0 || !v.is_finite() {
                return Err(FitError::domain(
                    p.id,
                    &p.series_id,
                    format!("cannot take 1/v0 of observed rate {v}"),
                ));
            }
            Ok(LinearPoint {
                id: p.id,
                x: 1.0 / s,
                y: 1.0 / v,
            })
        })
        .collect()
}

/// Ordinary least-squares line through the linearized points.
pub fn linear_fit(points: &[LinearPoint]) -> Result<LinearFit, FitError> {
    let xs: Vec<f64> = points.iter().map(|p| p.x).collect();
    let ys: Vec<f64> = points.iter().map(|p| p.y).collect();
    let distinct = distinct_count(&xs);
    if points.len() < 2 || distinct < 2 {
        return Err(FitError::InsufficientData {
            included: points.len(),
            distinct,
        });
    }

    let n = points.len();
    let mut design = DMatrix::<f64>::zeros(n, 2);
    for (i, &x) in xs.iter().enumerate() {
        design[(i, 0)] = x;
        design[(i, 1)] = 1.0;
    }
    let y = DVector::from_column_slice(&ys);

    let beta = solve_least_squares(&design, &y).ok_or_else(|| FitError::DidNotConverge {
        reason: "ill-conditioned Lineweaver-Burk design matrix".to_string(),
    })?;
    let (slope, intercept) = (beta[0], beta[1]);

    let ssr: f64 = xs
        .iter()
        .zip(&ys)
        .map(|(&x, &y)| {
            let r = y - (slope * x + intercept);
            r * r
        })
        .sum();
    let se = parameter_standard_errors(&design, ssr).ok_or_else(|| FitError::DidNotConverge {
        reason: "singular Lineweaver-Burk normal equations".to_string(),
    })?;

    log::debug!("linear fit: n={n} slope={slope:.6e} intercept={intercept:.6e}");

    Ok(LinearFit {
        slope,
        intercept,
        slope_se: se[0],
        intercept_se: se[1],
        r_squared: r_squared(&ys, ssr),
        n,
    })
}

impl LinearFit {
    /// Map the line back to Michaelis-Menten parameters.
    ///
    /// Relative errors propagate as
    /// `RSE(Vmax) = RSE(intercept)` and
    /// `RSE(Km) = sqrt(RSE(slope)² + RSE(intercept)²)`.
    /// Everything is `+∞` when the intercept is zero.
    pub fn lineweaver_burk(&self) -> LineweaverBurkEstimate {
        let (slope, intercept) = (self.slope, self.intercept);
        if intercept == 0.0 {
            return LineweaverBurkEstimate {
                v_max: f64::INFINITY,
                k_m: f64::INFINITY,
                v_max_se: f64::INFINITY,
                k_m_se: f64::INFINITY,
                v_max_rse_pct: f64::INFINITY,
                k_m_rse_pct: f64::INFINITY,
                x_intercept: if slope == 0.0 { 0.0 } else { f64::NEG_INFINITY },
            };
        }

        let v_max = 1.0 / intercept;
        let k_m = slope / intercept;

        let intercept_rel = self.intercept_se / intercept;
        let v_max_rse_pct = relative_error_pct(self.intercept_se, intercept);
        let k_m_rse_pct = if slope == 0.0 {
            f64::INFINITY
        } else {
            let slope_rel = self.slope_se / slope;
            (slope_rel * slope_rel + intercept_rel * intercept_rel).sqrt() * 100.0
        };

        LineweaverBurkEstimate {
            v_max,
            k_m,
            v_max_se: v_max_rse_pct / 100.0 * v_max.abs(),
            k_m_se: k_m_rse_pct / 100.0 * k_m.abs(),
            v_max_rse_pct,
            k_m_rse_pct,
            x_intercept: if k_m == 0.0 { 0.0 } else { -1.0 / k_m },
        }
    }
}
