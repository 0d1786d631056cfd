//! Rate law implementations.
//!
//! Models are implemented as small, pure functions so that fitting code can
//! stay generic.

pub mod model;

pub use model::*;
