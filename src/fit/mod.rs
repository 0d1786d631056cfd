//! Curve fitting.
//!
//! Responsibilities:
//!
//! - nonlinear Michaelis-Menten fit with standard errors (`fit`)
//! - Lineweaver-Burk transform and straight-line cross-check (`linearize`, `linear_fit`)

pub mod fitter;
pub mod linear;

pub use fitter::*;
pub use linear::*;
