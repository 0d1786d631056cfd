//! Nonlinear Michaelis-Menten fit.
//!
//! Given the included points `(S_i, v_i)` of a dataset we minimise
//!
//! ```text
//! Σ w_i (v_i − Vmax·S_i / (Km + S_i))²
//! ```
//!
//! with Levenberg-Marquardt, starting from `Vmax0 = max(v)` and
//! `Km0 = median(S)`. Excluded points are removed from the problem, not
//! zero-weighted.
//!
//! Optimizer failures do not surface as errors: the result comes back with
//! `converged = false` and NaN parameters so the caller can still show the
//! raw data.

use levenberg_marquardt::{LeastSquaresProblem, LevenbergMarquardt};
use nalgebra::{DMatrix, DVector, Dyn, storage::Owned};

use crate::domain::{Dataset, FitOptions, FitResult, PointId, QualityIssue, Weighting};
use crate::error::FitError;
use crate::math::{distinct_count, median, parameter_standard_errors, r_squared, relative_error_pct};
use crate::models::{michaelis_menten, michaelis_menten_gradient};

/// Number of fitted parameters (Vmax, Km).
const N_PARAMS: usize = 2;

/// Included points extracted once, in dataset order.
#[derive(Debug, Clone)]
struct Observations {
    ids: Vec<PointId>,
    s: Vec<f64>,
    v: Vec<f64>,
    /// `sqrt(w_i)`; residuals and Jacobian rows are scaled by it.
    sqrt_w: Vec<f64>,
}

struct MichaelisMentenProblem<'a> {
    obs: &'a Observations,
    params: DVector<f64>,
}

impl LeastSquaresProblem<f64, Dyn, Dyn> for MichaelisMentenProblem<'_> {
    type ResidualStorage = Owned<f64, Dyn>;
    type JacobianStorage = Owned<f64, Dyn, Dyn>;
    type ParameterStorage = Owned<f64, Dyn>;

    fn set_params(&mut self, x: &DVector<f64>) {
        self.params.clone_from(x);
    }

    fn params(&self) -> DVector<f64> {
        self.params.clone()
    }

    fn residuals(&self) -> Option<DVector<f64>> {
        Some(weighted_residuals(self.obs, self.params[0], self.params[1]))
    }

    fn jacobian(&self) -> Option<DMatrix<f64>> {
        Some(weighted_jacobian(self.obs, self.params[0], self.params[1]))
    }
}

/// Fit the Michaelis-Menten model to the included points of `dataset`.
///
/// Errors are reserved for input problems (too few points, values outside
/// the model's domain). Numerical failure yields `converged = false`.
pub fn fit(dataset: &Dataset, opts: &FitOptions) -> Result<FitResult, FitError> {
    opts.validate()?;
    let obs = collect_observations(dataset, opts.weighting)?;
    let n = obs.ids.len();

    let v_max0 = obs.v.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let k_m0 = median(&obs.s).unwrap_or(1.0);
    log::debug!("fit: n={n} weighting={:?} start Vmax={v_max0:.4e} Km={k_m0:.4e}", opts.weighting);

    let problem = MichaelisMentenProblem {
        obs: &obs,
        params: DVector::from_row_slice(&[v_max0, k_m0]),
    };

    let lm = LevenbergMarquardt::new()
        .with_ftol(opts.tolerance)
        .with_xtol(opts.tolerance)
        .with_patience(opts.max_iterations);

    let (problem, report) = lm.minimize(problem);
    let termination = format!("{:?}", report.termination);
    let evaluations = report.number_of_evaluations;
    let (v_max, k_m) = (problem.params[0], problem.params[1]);

    log::debug!(
        "fit: termination={termination} evaluations={evaluations} Vmax={v_max:.6e} Km={k_m:.6e}"
    );

    if !report.termination.was_successful() || !(v_max.is_finite() && k_m.is_finite()) {
        log::warn!("Michaelis-Menten fit did not converge ({termination})");
        return Ok(not_converged(&obs, opts.weighting, termination, evaluations));
    }

    let jac = weighted_jacobian(&obs, v_max, k_m);
    let weighted_ssr = weighted_residuals(&obs, v_max, k_m).norm_squared();
    let Some(se) = parameter_standard_errors(&jac, weighted_ssr) else {
        log::warn!("Michaelis-Menten fit has a singular Jacobian at the optimum");
        return Ok(not_converged(
            &obs,
            opts.weighting,
            "singular Jacobian at the optimum".to_string(),
            evaluations,
        ));
    };

    let residuals: Vec<f64> = obs
        .s
        .iter()
        .zip(&obs.v)
        .map(|(&s, &v)| v - michaelis_menten(s, v_max, k_m))
        .collect();
    let ssr: f64 = residuals.iter().map(|r| r * r).sum();

    let quality_issues = assess_quality(v_max, k_m, &obs.s);
    for issue in &quality_issues {
        log::warn!("fit quality: {}", issue.describe());
    }

    Ok(FitResult {
        v_max,
        k_m,
        v_max_se: se[0],
        k_m_se: se[1],
        v_max_rse_pct: relative_error_pct(se[0], v_max),
        k_m_rse_pct: relative_error_pct(se[1], k_m),
        r_squared: r_squared(&obs.v, ssr),
        residuals,
        point_ids: obs.ids,
        ssr,
        converged: true,
        termination,
        evaluations,
        weighting: opts.weighting,
        quality_issues,
    })
}

fn collect_observations(dataset: &Dataset, weighting: Weighting) -> Result<Observations, FitError> {
    let included: Vec<_> = dataset.included().collect();
    let s: Vec<f64> = included.iter().map(|p| p.substrate_concentration).collect();

    let distinct = distinct_count(&s);
    if included.len() < N_PARAMS || distinct < N_PARAMS {
        return Err(FitError::InsufficientData {
            included: included.len(),
            distinct,
        });
    }

    let mut sqrt_w = Vec::with_capacity(included.len());
    for p in &included {
        if !p.substrate_concentration.is_finite() || p.substrate_concentration <= 0.0 {
            return Err(FitError::domain(
                p.id,
                &p.series_id,
                format!("substrate concentration must be > 0, got {}", p.substrate_concentration),
            ));
        }
        if !p.observed_rate.is_finite() {
            return Err(FitError::domain(p.id, &p.series_id, "observed rate is not finite"));
        }
        let sw = match weighting {
            Weighting::None => 1.0,
            Weighting::Relative => {
                if p.observed_rate == 0.0 {
                    return Err(FitError::domain(
                        p.id,
                        &p.series_id,
                        "relative weighting needs a nonzero rate",
                    ));
                }
                1.0 / p.observed_rate.abs()
            }
        };
        sqrt_w.push(sw);
    }

    Ok(Observations {
        ids: included.iter().map(|p| p.id).collect(),
        v: included.iter().map(|p| p.observed_rate).collect(),
        s,
        sqrt_w,
    })
}

/// Residuals in the optimizer's sign convention (`model − observed`), scaled.
fn weighted_residuals(obs: &Observations, v_max: f64, k_m: f64) -> DVector<f64> {
    DVector::from_iterator(
        obs.s.len(),
        obs.s
            .iter()
            .zip(&obs.v)
            .zip(&obs.sqrt_w)
            .map(|((&s, &v), &sw)| sw * (michaelis_menten(s, v_max, k_m) - v)),
    )
}

fn weighted_jacobian(obs: &Observations, v_max: f64, k_m: f64) -> DMatrix<f64> {
    let mut jac = DMatrix::<f64>::zeros(obs.s.len(), N_PARAMS);
    for (i, (&s, &sw)) in obs.s.iter().zip(&obs.sqrt_w).enumerate() {
        let [d_vmax, d_km] = michaelis_menten_gradient(s, v_max, k_m);
        jac[(i, 0)] = sw * d_vmax;
        jac[(i, 1)] = sw * d_km;
    }
    jac
}

fn assess_quality(v_max: f64, k_m: f64, s: &[f64]) -> Vec<QualityIssue> {
    let mut issues = Vec::new();
    if v_max < 0.0 {
        issues.push(QualityIssue::NegativeVmax);
    }
    if k_m < 0.0 {
        issues.push(QualityIssue::NegativeKm);
    }
    let s_max = s.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if k_m > s_max {
        issues.push(QualityIssue::KmAboveRange);
    }
    issues
}

fn not_converged(
    obs: &Observations,
    weighting: Weighting,
    termination: String,
    evaluations: usize,
) -> FitResult {
    FitResult {
        v_max: f64::NAN,
        k_m: f64::NAN,
        v_max_se: f64::NAN,
        k_m_se: f64::NAN,
        v_max_rse_pct: f64::NAN,
        k_m_rse_pct: f64::NAN,
        r_squared: f64::NAN,
        residuals: vec![f64::NAN; obs.ids.len()],
        point_ids: obs.ids.clone(),
        ssr: f64::NAN,
        converged: false,
        termination,
        evaluations,
        weighting,
        quality_issues: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SeriesId;
    use approx::assert_relative_eq;

    fn dataset(points: &[(f64, f64)]) -> Dataset {
        let mut ds = Dataset::new();
        for (row, &(s, v)) in points.iter().enumerate() {
            ds.push(SeriesId::from("v0"), row + 1, s, v);
        }
        ds
    }

    fn exact(v_max: f64, k_m: f64, concentrations: &[f64]) -> Dataset {
        let points: Vec<(f64, f64)> = concentrations
            .iter()
            .map(|&s| (s, michaelis_menten(s, v_max, k_m)))
            .collect();
        dataset(&points)
    }

    #[test]
    fn recovers_parameters_from_exact_data() {
        let ds = exact(2.0, 3.0, &[0.5, 1.0, 2.0, 4.0, 8.0, 16.0, 32.0]);
        let fit = fit(&ds, &FitOptions::default()).unwrap();

        assert!(fit.converged, "termination: {}", fit.termination);
        assert_relative_eq!(fit.v_max, 2.0, max_relative = 1e-6);
        assert_relative_eq!(fit.k_m, 3.0, max_relative = 1e-6);
        assert!(fit.r_squared > 0.999_999);
        assert!(fit.quality_issues.is_empty());
        assert!(fit.residuals.iter().all(|r| r.abs() < 1e-8));
    }

    #[test]
    fn recovers_parameters_across_scales() {
        // Micromolar concentrations, nanomolar-per-second rates.
        let concentrations = [1e-6, 2e-6, 5e-6, 1e-5, 2e-5, 5e-5, 1e-4];
        let ds = exact(3.5e-9, 1.2e-5, &concentrations);
        let fit = fit(&ds, &FitOptions::default()).unwrap();

        assert!(fit.converged, "termination: {}", fit.termination);
        assert_relative_eq!(fit.v_max, 3.5e-9, max_relative = 1e-6);
        assert_relative_eq!(fit.k_m, 1.2e-5, max_relative = 1e-6);
    }

    #[test]
    fn noisy_textbook_scenario() {
        let ds = dataset(&[(1.0, 0.5), (2.0, 0.8), (4.0, 1.2), (8.0, 1.5), (16.0, 1.7)]);
        let fit = fit(&ds, &FitOptions::default()).unwrap();

        assert!(fit.converged);
        assert!((fit.v_max - 2.0).abs() < 0.2, "Vmax = {}", fit.v_max);
        assert!((fit.k_m - 3.0).abs() < 0.6, "Km = {}", fit.k_m);
        assert!(fit.r_squared > 0.9);
        assert_eq!(fit.residuals.len(), 5);
        assert!(fit.v_max_se.is_finite() && fit.v_max_se > 0.0);
        assert_relative_eq!(fit.v_max_rse_pct, fit.v_max_se / fit.v_max * 100.0);
        assert_relative_eq!(fit.k_m_rse_pct, fit.k_m_se / fit.k_m * 100.0);
    }

    #[test]
    fn relative_weighting_fits_the_same_exact_curve() {
        let ds = exact(2.0, 3.0, &[0.5, 1.0, 2.0, 4.0, 8.0, 16.0]);
        let opts = FitOptions {
            weighting: Weighting::Relative,
            ..FitOptions::default()
        };
        let fit = fit(&ds, &opts).unwrap();

        assert!(fit.converged);
        assert_eq!(fit.weighting, Weighting::Relative);
        assert_relative_eq!(fit.v_max, 2.0, max_relative = 1e-6);
        assert_relative_eq!(fit.k_m, 3.0, max_relative = 1e-6);
    }

    #[test]
    fn relative_weighting_rejects_zero_rate() {
        let ds = dataset(&[(1.0, 0.0), (2.0, 0.8), (4.0, 1.2)]);
        let opts = FitOptions {
            weighting: Weighting::Relative,
            ..FitOptions::default()
        };
        let err = fit(&ds, &opts).unwrap_err();
        assert!(matches!(err, FitError::Domain { point: PointId(0), .. }));
    }

    #[test]
    fn unusable_options_are_rejected_before_fitting() {
        let ds = exact(2.0, 3.0, &[0.5, 1.0, 2.0, 4.0]);
        for opts in [
            FitOptions { tolerance: -1.0, ..FitOptions::default() },
            FitOptions { tolerance: f64::NAN, ..FitOptions::default() },
            FitOptions { max_iterations: 0, ..FitOptions::default() },
        ] {
            let err = fit(&ds, &opts).unwrap_err();
            assert!(matches!(err, FitError::InvalidOptions { .. }), "{err:?}");
            assert_eq!(err.exit_code(), 2);
        }
    }

    #[test]
    fn single_point_is_insufficient() {
        let ds = dataset(&[(1.0, 0.5)]);
        let err = fit(&ds, &FitOptions::default()).unwrap_err();
        assert_eq!(err, FitError::InsufficientData { included: 1, distinct: 1 });
    }

    #[test]
    fn identical_concentrations_are_insufficient() {
        let ds = dataset(&[(2.0, 0.5), (2.0, 0.6), (2.0, 0.7)]);
        let err = fit(&ds, &FitOptions::default()).unwrap_err();
        assert_eq!(err, FitError::InsufficientData { included: 3, distinct: 1 });
    }

    #[test]
    fn excluded_points_do_not_count() {
        let ds = dataset(&[(1.0, 0.5), (2.0, 0.8), (4.0, 1.2)]);
        let ds = ds.exclude(&[PointId(1), PointId(2)]).unwrap();
        let err = fit(&ds, &FitOptions::default()).unwrap_err();
        assert!(matches!(err, FitError::InsufficientData { included: 1, .. }));
    }

    #[test]
    fn zero_concentration_is_a_domain_error() {
        let ds = dataset(&[(0.0, 0.0), (2.0, 0.8), (4.0, 1.2)]);
        let err = fit(&ds, &FitOptions::default()).unwrap_err();
        assert!(matches!(err, FitError::Domain { point: PointId(0), .. }));
    }

    #[test]
    fn two_points_fit_exactly_with_unbounded_errors() {
        let ds = exact(2.0, 3.0, &[1.0, 6.0]);
        let fit = fit(&ds, &FitOptions::default()).unwrap();

        assert!(fit.converged, "termination: {}", fit.termination);
        assert_relative_eq!(fit.v_max, 2.0, max_relative = 1e-6);
        assert!(fit.v_max_se.is_infinite());
        assert!(fit.k_m_rse_pct.is_infinite());
    }

    #[test]
    fn flat_rates_flag_a_non_converged_fit() {
        // With every rate zero, Vmax → 0 and the Km column of the Jacobian
        // vanishes, so the covariance cannot be formed.
        let ds = dataset(&[(1.0, 0.0), (2.0, 0.0), (4.0, 0.0)]);
        let fit = fit(&ds, &FitOptions::default()).unwrap();

        assert!(!fit.converged);
        assert!(fit.v_max.is_nan() && fit.k_m.is_nan());
        assert_eq!(fit.residuals.len(), 3);
        assert!(fit.require_converged().is_err());
    }

    #[test]
    fn excluded_outlier_is_removed_from_the_fit() {
        let mut points: Vec<(f64, f64)> = [0.5, 1.0, 2.0, 4.0, 8.0, 16.0]
            .iter()
            .map(|&s| (s, michaelis_menten(s, 2.0, 3.0)))
            .collect();
        points.push((3.0, 5.0));
        let ds = dataset(&points);

        let with_outlier = fit(&ds, &FitOptions::default()).unwrap();
        let cleaned = fit(&ds.exclude(&[PointId(6)]).unwrap(), &FitOptions::default()).unwrap();

        assert_eq!(with_outlier.residuals.len(), 7);
        assert_eq!(cleaned.residuals.len(), 6);
        assert!(!cleaned.point_ids.contains(&PointId(6)));
        assert_relative_eq!(cleaned.v_max, 2.0, max_relative = 1e-6);
        assert!(with_outlier.r_squared < cleaned.r_squared);
    }

    #[test]
    fn fit_is_a_pure_function_of_the_snapshot() {
        let ds = dataset(&[(1.0, 0.5), (2.0, 0.8), (4.0, 1.2), (8.0, 1.5), (16.0, 1.7)]);
        let before = ds.clone();
        let a = fit(&ds, &FitOptions::default()).unwrap();
        let b = fit(&ds, &FitOptions::default()).unwrap();
        assert_eq!(a, b);
        assert_eq!(ds, before);
    }

    #[test]
    fn falling_rates_give_a_flagged_negative_km() {
        // v decreases with S: the least-squares optimum has Km < 0.
        let ds = exact(1.0, -0.5, &[1.0, 2.0, 4.0, 8.0]);
        let fit = fit(&ds, &FitOptions::default()).unwrap();

        assert!(fit.converged, "termination: {}", fit.termination);
        assert_relative_eq!(fit.v_max, 1.0, max_relative = 1e-5);
        assert_relative_eq!(fit.k_m, -0.5, max_relative = 1e-5);
        assert_eq!(fit.quality_issues, vec![QualityIssue::NegativeKm]);
    }

    #[test]
    fn negative_rates_give_a_flagged_negative_vmax() {
        let ds = exact(-1.0, 2.0, &[1.0, 2.0, 4.0, 8.0]);
        let fit = fit(&ds, &FitOptions::default()).unwrap();

        assert!(fit.converged, "termination: {}", fit.termination);
        assert_relative_eq!(fit.v_max, -1.0, max_relative = 1e-5);
        assert_relative_eq!(fit.k_m, 2.0, max_relative = 1e-5);
        assert_eq!(fit.quality_issues, vec![QualityIssue::NegativeVmax]);
        assert!(fit.v_max_rse_pct.is_finite());
    }

    #[test]
    fn km_beyond_tested_range_is_flagged() {
        let ds = exact(10.0, 12.0, &[1.0, 2.0, 4.0, 8.0]);
        let fit = fit(&ds, &FitOptions::default()).unwrap();
        assert!(fit.converged);
        assert!(fit.quality_issues.contains(&QualityIssue::KmAboveRange));
    }
}
