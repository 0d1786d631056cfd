//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments and sets up logging
//! - reads the input table (or generates a demo sample)
//! - applies exclusions and fits every series
//! - prints the summary and writes optional exports

use std::io::Read;
use std::path::Path;

use clap::Parser;

use crate::cli::{Command, DemoArgs, FitArgs, FitFlags};
use crate::data::{SampleConfig, generate_sample};
use crate::domain::{Dataset, FitConfig, FitOptions, SeriesId};
use crate::error::{AppError, FitError};

pub mod pipeline;
pub mod session;

use session::Session;

/// Entry point for the `mmfit` binary.
pub fn run() -> Result<(), AppError> {
    // `mmfit data.tsv` is shorthand for `mmfit fit data.tsv`.
    let argv = rewrite_args(std::env::args().collect());
    let cli = crate::cli::Cli::parse_from(argv);

    match cli.command {
        Command::Fit(args) => handle_fit(args),
        Command::Demo(args) => handle_demo(args),
    }
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    // RUST_LOG wins over -v.
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default))
        .format_timestamp(None)
        .try_init();
}

fn handle_fit(args: FitArgs) -> Result<(), AppError> {
    init_logging(args.fit.verbose);
    let config = fit_config_from_args(args.input.clone(), &args.fit);
    let text = read_input(config.input.as_deref())?;

    let mut session = Session::new(config.options.clone());
    let n = session.paste(&text)?;
    log::info!("parsed {n} points");
    run_session(session, &config)
}

fn handle_demo(args: DemoArgs) -> Result<(), AppError> {
    init_logging(args.fit.verbose);
    let config = fit_config_from_args(None, &args.fit);
    let sample = SampleConfig {
        v_max: args.vmax,
        k_m: args.km,
        noise_sd: args.noise,
        series: args.series_count,
        seed: args.seed,
        ..SampleConfig::default()
    };

    let mut session = Session::new(config.options.clone());
    session.load(generate_sample(&sample)?);
    run_session(session, &config)
}

fn run_session(mut session: Session, config: &FitConfig) -> Result<(), AppError> {
    config.options.validate()?;
    apply_exclusions(&mut session, config)?;
    warn_unknown_series(session.dataset(), &config.series);

    let run = session.fit(&config.series, config.lineweaver_burk).clone();
    if run.series.is_empty() {
        return Err(AppError::new(3, "No series to fit."));
    }

    println!(
        "{}",
        crate::report::format_run_summary(session.dataset(), &run, session.options())
    );

    // Optional exports.
    if let Some(path) = &config.export_results {
        let rows = crate::report::compute_residuals(session.dataset(), &run);
        crate::io::export::write_results_csv(path, &rows)?;
    }
    if let Some(path) = &config.export_json {
        crate::io::results::write_results_json(path, &run, session.options())?;
    }

    if run.converged_count() == 0 {
        return Err(first_failure(&run));
    }
    Ok(())
}

fn apply_exclusions(session: &mut Session, config: &FitConfig) -> Result<(), FitError> {
    for (series, row) in &config.exclude_points {
        let id = session.exclude_point(series, *row)?;
        log::info!("excluded {series} row {row} ({id})");
    }
    for &row in &config.exclude_rows {
        let ids = session.exclude_row(row)?;
        if ids.is_empty() {
            log::warn!("row {row} has no points");
        }
    }
    Ok(())
}

fn warn_unknown_series(dataset: &Dataset, requested: &[SeriesId]) {
    let known = dataset.series_ids();
    for id in requested.iter().filter(|id| !known.contains(id)) {
        log::warn!("series {id} not found in input");
    }
}

/// Exit with the error of the first series that failed.
fn first_failure(run: &pipeline::RunOutput) -> AppError {
    run.series
        .iter()
        .find_map(|s| match &s.fit {
            Err(e) => Some(AppError::from(e.clone())),
            Ok(f) => f.clone().require_converged().err().map(AppError::from),
        })
        .unwrap_or_else(|| AppError::new(4, "No series converged."))
}

fn read_input(path: Option<&Path>) -> Result<String, AppError> {
    match path {
        Some(p) if p != Path::new("-") => std::fs::read_to_string(p)
            .map_err(|e| AppError::new(2, format!("Failed to read '{}': {e}", p.display()))),
        _ => {
            let mut text = String::new();
            std::io::stdin()
                .read_to_string(&mut text)
                .map_err(|e| AppError::new(2, format!("Failed to read stdin: {e}")))?;
            Ok(text)
        }
    }
}

pub fn fit_config_from_args(input: Option<std::path::PathBuf>, flags: &FitFlags) -> FitConfig {
    FitConfig {
        input,
        series: flags.series.iter().map(SeriesId::new).collect(),
        exclude_points: flags.exclude.clone(),
        exclude_rows: flags.exclude_row.clone(),
        options: FitOptions {
            weighting: flags.weighting,
            max_iterations: flags.max_iterations,
            tolerance: flags.tolerance,
        },
        lineweaver_burk: flags.lineweaver_burk,
        export_results: flags.export.clone(),
        export_json: flags.export_json.clone(),
    }
}

/// Rewrite argv so a bare path defaults to `mmfit fit`.
///
/// Rules:
/// - `mmfit`                         -> unchanged (clap prints usage)
/// - `mmfit data.tsv ...`            -> `mmfit fit data.tsv ...`
/// - `mmfit --help/--version/-h`     -> unchanged
/// - `mmfit fit|demo|help ...`       -> unchanged
fn rewrite_args(mut argv: Vec<String>) -> Vec<String> {
    let Some(arg1) = argv.get(1) else {
        return argv;
    };

    let passthrough = matches!(
        arg1.as_str(),
        "-h" | "--help" | "-V" | "--version" | "help" | "fit" | "demo"
    );
    if !passthrough {
        argv.insert(1, "fit".to_string());
    }
    argv
}
