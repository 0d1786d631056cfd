//! Error types.
//!
//! - `FitError`: typed failures of the fitting engine (parse, data, domain,
//!   convergence). These are recoverable; the caller keeps its dataset.
//! - `AppError`: binary-level error carrying a process exit code.

use thiserror::Error;

use crate::domain::{PointId, SeriesId};

/// Failures reported by parsing and by the fitting engine.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FitError {
    /// A cell is not a well-formed number after decimal separator normalization.
    ///
    /// `row` and `column` are 1-based positions in the pasted text.
    #[error("row {row}, column {column}: '{token}' is not a number ({reason})")]
    Parse {
        row: usize,
        column: usize,
        token: String,
        reason: String,
    },

    /// Fewer than two included points, or fewer than two distinct concentrations.
    #[error(
        "at least 2 included points with distinct concentrations are required \
         (included: {included}, distinct concentrations: {distinct})"
    )]
    InsufficientData { included: usize, distinct: usize },

    /// A value is outside the domain of the model or transform.
    #[error("point {point} (series {series}): {reason}")]
    Domain {
        point: PointId,
        series: SeriesId,
        reason: String,
    },

    /// The optimizer stopped without meeting its convergence criteria.
    #[error("fit did not converge: {reason}")]
    DidNotConverge { reason: String },

    /// Optimizer settings that cannot be used (negative tolerance, zero iterations).
    #[error("invalid fit options: {reason}")]
    InvalidOptions { reason: String },

    #[error("unknown point id {0}")]
    UnknownPoint(PointId),

    #[error("series {series} has no point in row {row}")]
    UnknownCell { series: SeriesId, row: usize },
}

impl FitError {
    pub(crate) fn parse(row: usize, column: usize, token: &str, reason: impl Into<String>) -> Self {
        FitError::Parse {
            row,
            column,
            token: token.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn domain(point: PointId, series: &SeriesId, reason: impl Into<String>) -> Self {
        FitError::Domain {
            point,
            series: series.clone(),
            reason: reason.into(),
        }
    }

    /// Process exit code used when this error reaches the binary.
    pub fn exit_code(&self) -> u8 {
        match self {
            FitError::Parse { .. }
            | FitError::InvalidOptions { .. }
            | FitError::UnknownPoint(_)
            | FitError::UnknownCell { .. } => 2,
            FitError::InsufficientData { .. } | FitError::Domain { .. } => 3,
            FitError::DidNotConverge { .. } => 4,
        }
    }
}

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl From<FitError> for AppError {
    fn from(err: FitError) -> Self {
        AppError::new(err.exit_code(), err.to_string())
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}
