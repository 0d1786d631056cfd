//! Michaelis-Menten rate law evaluation.
//!
//! The fitter relies on two primitive operations:
//! - predict `v0(S)` given `Vmax` and `Km` (for residuals/plots)
//! - the partial derivatives with respect to both parameters (for the Jacobian)

/// `v0 = Vmax · S / (Km + S)`.
pub fn michaelis_menten(s: f64, v_max: f64, k_m: f64) -> f64 {
    v_max * s / (k_m + s)
}

/// `(∂v0/∂Vmax, ∂v0/∂Km)` at concentration `s`.
pub fn michaelis_menten_gradient(s: f64, v_max: f64, k_m: f64) -> [f64; 2] {
    let denom = k_m + s;
    [s / denom, -v_max * s / (denom * denom)]
}
