//! Small descriptive statistics used by the fitters.

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 1 {
        Some(sorted[mid])
    } else {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    }
}

/// Coefficient of determination `1 − SSR/SST`.
///
/// Returns 0 when the observations have no spread (SST = 0).
pub fn r_squared(observed: &[f64], ssr: f64) -> f64 {
    let Some(m) = mean(observed) else {
        return f64::NAN;
    };
    let sst: f64 = observed.iter().map(|y| (y - m) * (y - m)).sum();
    if sst == 0.0 { 0.0 } else { 1.0 - ssr / sst }
}

/// Standard error as a percentage of `|estimate|` (`+∞` at zero).
pub fn relative_error_pct(se: f64, estimate: f64) -> f64 {
    if estimate == 0.0 {
        f64::INFINITY
    } else {
        se / estimate.abs() * 100.0
    }
}

/// Number of distinct values, compared exactly.
pub fn distinct_count(values: &[f64]) -> usize {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    sorted.dedup();
    sorted.len()
}
