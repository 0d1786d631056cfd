//! Input/output helpers.
//!
//! - numeric cell parsing with decimal-comma support (`numeric`)
//! - pasted/delimited table parsing (`paste`)
//! - per-point CSV export (`export`)
//! - results JSON (`results`)

pub mod export;
pub mod numeric;
pub mod paste;
pub mod results;

pub use export::*;
pub use numeric::*;
pub use paste::*;
pub use results::*;
