//! Numeric cell parsing.
//!
//! Spreadsheet exports from European locales use `,` as the decimal
//! separator, so `1,2E-03` and `1.2E-03` must both read as `0.0012`. The
//! separator is normalized before conversion; anything that is still not a
//! finite number is an error carrying its table position.

use crate::error::FitError;

/// Parse one cell. `row` and `column` are 1-based and only used for errors.
pub fn parse_number(token: &str, row: usize, column: usize) -> Result<f64, FitError> {
    let trimmed = token.trim();
    if trimmed.is_empty() {
        return Err(FitError::parse(row, column, token, "empty cell"));
    }

    let normalized = normalize_decimal_separator(trimmed);
    let value = normalized
        .parse::<f64>()
        .map_err(|e| FitError::parse(row, column, token, e.to_string()))?;

    // `f64::from_str` accepts "inf" and "NaN"; those are not measurements.
    if !value.is_finite() {
        return Err(FitError::parse(row, column, token, "not a finite number"));
    }
    Ok(value)
}

/// True if `token` parses as a number (used for header detection).
pub fn is_number(token: &str) -> bool {
    parse_number(token, 0, 0).is_ok()
}

fn normalize_decimal_separator(token: &str) -> String {
    token.replace(',', ".")
}
