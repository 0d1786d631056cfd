//! Command-line parsing for the Michaelis-Menten fitter.
//!
//! The goal of this module is to keep **argument parsing** and **command dispatch**
//! separate from the fitting code.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::domain::{SeriesId, Weighting};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "mmfit", version, about = "Michaelis-Menten kinetics fitter")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fit a pasted/delimited table of concentrations and rates.
    Fit(FitArgs),
    /// Fit a synthetic sample drawn around a known curve.
    Demo(DemoArgs),
}

#[derive(Debug, Parser, Clone)]
pub struct FitArgs {
    /// Input table (tab, semicolon or comma separated). Reads stdin when omitted or `-`.
    #[arg(value_name = "FILE")]
    pub input: Option<PathBuf>,

    #[command(flatten)]
    pub fit: FitFlags,
}

#[derive(Debug, Parser, Clone)]
pub struct DemoArgs {
    /// True Vmax of the generated sample.
    #[arg(long, default_value_t = 2.0)]
    pub vmax: f64,

    /// True Km of the generated sample.
    #[arg(long, default_value_t = 3.0)]
    pub km: f64,

    /// Relative noise standard deviation (0.02 = 2%).
    #[arg(long, default_value_t = 0.02)]
    pub noise: f64,

    /// Number of replicate series.
    #[arg(long, default_value_t = 1)]
    pub series_count: usize,

    /// Random seed for sample generation.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    #[command(flatten)]
    pub fit: FitFlags,
}

/// Options shared by `fit` and `demo`.
#[derive(Debug, Args, Clone)]
pub struct FitFlags {
    /// Only fit these series (repeatable). Default: all.
    #[arg(long = "series", value_name = "LABEL")]
    pub series: Vec<String>,

    /// Exclude one point, given as SERIES:ROW (repeatable).
    #[arg(long = "exclude", value_name = "SERIES:ROW", value_parser = parse_exclusion)]
    pub exclude: Vec<(SeriesId, usize)>,

    /// Exclude a whole table row across all series (repeatable).
    #[arg(long = "exclude-row", value_name = "ROW")]
    pub exclude_row: Vec<usize>,

    /// Residual weighting.
    #[arg(long, value_enum, default_value_t = Weighting::None)]
    pub weighting: Weighting,

    /// Maximum optimizer iterations (patience).
    #[arg(
        long,
        default_value_t = 200,
        value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..)
    )]
    pub max_iterations: usize,

    /// Relative convergence tolerance.
    #[arg(long, default_value_t = 1e-10, value_parser = parse_tolerance)]
    pub tolerance: f64,

    /// Also fit the Lineweaver-Burk double-reciprocal line.
    #[arg(long = "lineweaver-burk")]
    pub lineweaver_burk: bool,

    /// Export per-point results to CSV.
    #[arg(long)]
    pub export: Option<PathBuf>,

    /// Export all fits to JSON.
    #[arg(long = "export-json")]
    pub export_json: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug).
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

/// Parse `SERIES:ROW`. The split is on the last `:` so labels may contain colons.
pub fn parse_exclusion(raw: &str) -> Result<(SeriesId, usize), String> {
    let (series, row) = raw
        .rsplit_once(':')
        .ok_or_else(|| format!("expected SERIES:ROW, got '{raw}'"))?;
    let series = series.trim();
    if series.is_empty() {
        return Err(format!("missing series label in '{raw}'"));
    }
    let row = row
        .trim()
        .parse::<usize>()
        .map_err(|e| format!("invalid row in '{raw}': {e}"))?;
    Ok((SeriesId::new(series), row))
}

/// Parse a finite, non-negative tolerance.
pub fn parse_tolerance(raw: &str) -> Result<f64, String> {
    let value = raw
        .trim()
        .parse::<f64>()
        .map_err(|e| format!("invalid tolerance '{raw}': {e}"))?;
    if !(value.is_finite() && value >= 0.0) {
        return Err(format!("tolerance must be a finite number >= 0, got '{raw}'"));
    }
    Ok(value)
}
