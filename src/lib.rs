//! `mm-fit` library crate: Michaelis-Menten kinetics fitting.
//!
//! The binary (`mmfit`) is a thin wrapper around this library so that:
//!
//! - the fit engine is testable without spawning processes
//! - parsing, fitting and reporting can be reused by other front ends

pub mod app;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod fit;
pub mod io;
pub mod math;
pub mod models;
pub mod report;
