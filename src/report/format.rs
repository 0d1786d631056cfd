//! Formatted terminal output.
//!
//! We keep formatting code in one place so the fitting code stays clean and
//! output changes are localized.

use crate::app::pipeline::{LineweaverBurkFit, RunOutput, SeriesFit};
use crate::domain::{Dataset, FitOptions, FitResult};

/// Format the full run summary (dataset stats + one block per series).
pub fn format_run_summary(dataset: &Dataset, run: &RunOutput, opts: &FitOptions) -> String {
    let mut out = String::new();

    out.push_str("=== mmfit - Michaelis-Menten fit ===\n");
    out.push_str(&format!(
        "Points: n={} | included={} | series={}\n",
        dataset.len(),
        dataset.included_count(),
        run.series.len()
    ));
    out.push_str(&format!("Weighting: {}\n", opts.weighting));

    for series in &run.series {
        out.push('\n');
        out.push_str(&format_series(series));
    }

    if let Some((series, km)) = &run.best_km {
        out.push_str(&format!("\nSmallest Km: {km:.3e} (series {series})\n"));
    }

    out
}

fn format_series(series: &SeriesFit) -> String {
    let mut out = format!("Series {}:\n", series.series);
    match &series.fit {
        Ok(fit) => out.push_str(&format_fit(fit)),
        Err(e) => out.push_str(&format!("  fit failed: {e}\n")),
    }
    match &series.lineweaver_burk {
        Some(Ok(lb)) => out.push_str(&format_lineweaver_burk(lb)),
        Some(Err(e)) => out.push_str(&format!("  Lineweaver-Burk: {e}\n")),
        None => {}
    }
    out
}

/// Vmax/Km with absolute and relative errors, R², and diagnostics.
pub fn format_fit(fit: &FitResult) -> String {
    let mut out = String::new();
    if !fit.converged {
        out.push_str(&format!(
            "  did not converge after {} evaluations ({})\n",
            fit.evaluations, fit.termination
        ));
        return out;
    }

    out.push_str(&format!(
        "  Vmax = {}\n  Km   = {}\n  R²   = {:.4} (n={})\n",
        fmt_estimate(fit.v_max, fit.v_max_se, fit.v_max_rse_pct),
        fmt_estimate(fit.k_m, fit.k_m_se, fit.k_m_rse_pct),
        fit.r_squared,
        fit.n_points()
    ));
    for issue in &fit.quality_issues {
        out.push_str(&format!("  warning: {}\n", issue.describe()));
    }
    out
}

pub fn format_lineweaver_burk(lb: &LineweaverBurkFit) -> String {
    let est = &lb.estimate;
    format!(
        "  Lineweaver-Burk: 1/v = {:.4e}·(1/S) + {:.4e} (R²={:.4})\n    Vmax = {}\n    Km   = {}\n",
        lb.line.slope,
        lb.line.intercept,
        lb.line.r_squared,
        fmt_estimate(est.v_max, est.v_max_se, est.v_max_rse_pct),
        fmt_estimate(est.k_m, est.k_m_se, est.k_m_rse_pct),
    )
}

fn fmt_estimate(value: f64, se: f64, rse_pct: f64) -> String {
    if rse_pct.is_finite() {
        format!("{value:.3e} (± {se:.1e} | {rse_pct:.0}%)")
    } else {
        format!("{value:.3e} (± inf)")
    }
}
