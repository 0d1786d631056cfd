//! Least squares helpers.
//!
//! The Lineweaver-Burk cross-check is an ordinary straight-line regression,
//! solved here with an SVD. The same module derives parameter standard errors
//! from a Jacobian, which both the linear and the nonlinear fit need:
//!
//! ```text
//! cov = σ² (JᵀJ)⁻¹,   σ² = SSR / (n − p)
//! ```

use nalgebra::{DMatrix, DVector};

/// Solve a least squares problem using SVD.
///
/// Returns `None` if the system is too ill-conditioned to solve robustly.
pub fn solve_least_squares(x: &DMatrix<f64>, y: &DVector<f64>) -> Option<DVector<f64>> {
    // `QR::solve` only handles square systems; the design matrix here is tall.
    let svd = x.clone().svd(true, true);

    for &tol in &[1e-12, 1e-10] {
        if let Ok(beta) = svd.solve(y, tol) {
            if beta.iter().all(|v| v.is_finite()) {
                return Some(beta);
            }
        }
    }

    None
}

/// Standard errors of the parameters from the Jacobian at the optimum.
///
/// `ssr` must be the sum of squares of the same (possibly weighted) residuals
/// the Jacobian was taken of. With no residual degrees of freedom the
/// variance is undefined and every error is `+∞`. Returns `None` when `JᵀJ`
/// is singular.
pub fn parameter_standard_errors(jacobian: &DMatrix<f64>, ssr: f64) -> Option<DVector<f64>> {
    let (n, p) = jacobian.shape();
    let jtj = jacobian.transpose() * jacobian;
    let inv = jtj.try_inverse()?;
    if !inv.iter().all(|v| v.is_finite()) {
        return None;
    }

    if n <= p {
        return Some(DVector::from_element(p, f64::INFINITY));
    }

    let sigma2 = ssr / (n - p) as f64;
    Some(DVector::from_iterator(
        p,
        (0..p).map(|j| (sigma2 * inv[(j, j)]).max(0.0).sqrt()),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn least_squares_solves_simple_system() {
        // Fit y = 2 + 3x on x = [0,1,2]
        let x = DMatrix::from_row_slice(3, 2, &[1.0, 0.0, 1.0, 1.0, 1.0, 2.0]);
        let y = DVector::from_row_slice(&[2.0, 5.0, 8.0]);

        let beta = solve_least_squares(&x, &y).unwrap();
        assert_relative_eq!(beta[0], 2.0, epsilon = 1e-10);
        assert_relative_eq!(beta[1], 3.0, epsilon = 1e-10);
    }

    #[test]
    fn standard_errors_match_textbook_line_fit() {
        // y = 1 + x with residuals (+0.1, -0.2, +0.1) on x = [0, 1, 2].
        let x = DMatrix::from_row_slice(3, 2, &[1.0, 0.0, 1.0, 1.0, 1.0, 2.0]);
        let ssr = 0.01 + 0.04 + 0.01;
        let se = parameter_standard_errors(&x, ssr).unwrap();

        // (XᵀX)⁻¹ = [[5/6, -1/2], [-1/2, 1/2]], σ² = 0.06.
        assert_relative_eq!(se[0], (0.06_f64 * 5.0 / 6.0).sqrt(), epsilon = 1e-12);
        assert_relative_eq!(se[1], (0.06_f64 * 0.5).sqrt(), epsilon = 1e-12);
    }

    #[test]
    fn standard_errors_are_infinite_without_degrees_of_freedom() {
        let x = DMatrix::from_row_slice(2, 2, &[1.0, 0.0, 1.0, 1.0]);
        let se = parameter_standard_errors(&x, 0.0).unwrap();
        assert!(se.iter().all(|v| v.is_infinite()));
    }

    #[test]
    fn singular_jacobian_is_rejected() {
        let x = DMatrix::from_row_slice(3, 2, &[1.0, 2.0, 1.0, 2.0, 1.0, 2.0]);
        assert!(parameter_standard_errors(&x, 1.0).is_none());
    }
}
