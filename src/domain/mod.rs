//! Domain types used throughout the engine.
//!
//! This module defines:
//!
//! - observations and their container (`DataPoint`, `Dataset`)
//! - fit configuration (`FitOptions`, `Weighting`, `FitConfig`)
//! - fit outputs (`FitResult`, `LinearFit`, `LineweaverBurkEstimate`)

pub mod dataset;
pub mod types;

pub use dataset::*;
pub use types::*;
