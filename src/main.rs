//! lacuna - Gap-filling for monthly satellite raster time series
//!
//! This is the command-line entry point.

use anyhow::Context;
use ndarray::Axis;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{error, info};

use lacuna::catalog::{Catalog, MonthKey};
use lacuna::combine::{combine, write_gray8, BlendWeights};
use lacuna::config::Command;
use lacuna::interpolation::common::checked_time_index;
use lacuna::interpolation::SliceInterpolator;
use lacuna::stack::{
    first_raster_shape, read_raster, stack_by_calendar_month, stack_catalog, write_raster,
};
use lacuna::{
    init_tracing, log_error, log_operation_end, log_operation_start, log_timed_operation, Config,
    LacunaError, Result,
};

/// Summary printed by `lacuna stack`
#[derive(Debug, Serialize)]
struct StackSummary {
    directory: PathBuf,
    shape: Vec<usize>,
    present: usize,
    missing: Vec<String>,
}

/// Summary printed by `lacuna fill`
#[derive(Debug, Serialize)]
struct FillSummary {
    month: String,
    index: usize,
    boundary: String,
    output: PathBuf,
}

fn main() -> anyhow::Result<()> {
    // Load configuration
    let (config, command) = Config::load().context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;

    init_tracing(&config.log_level);
    info!("Starting lacuna v{}", env!("CARGO_PKG_VERSION"));

    if let Some(threads) = config.interpolation.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .context("Failed to build thread pool")?;
        info!("Using {} threads", threads);
    }

    let result = match &command {
        Command::Stack { by_month } => run_stack(&config, *by_month),
        Command::Fill {
            month,
            index,
            output,
        } => run_fill(&config, month.as_deref(), *index, output),
        Command::Combine {
            first,
            second,
            output,
            alpha,
            beta,
            gamma,
        } => run_combine(
            first,
            second,
            output,
            BlendWeights {
                alpha: *alpha,
                beta: *beta,
                gamma: *gamma,
            },
        ),
    };

    if let Err(e) = &result {
        log_error(e, "command failed");
    }
    result?;

    info!("Processing complete");
    Ok(())
}

/// Reconcile the configured directory into a catalog and find the grid shape
fn open_series(config: &Config) -> Result<(Catalog, (usize, usize))> {
    let directory = config.input_dir()?;
    let catalog = Catalog::scan(
        directory,
        &config.data.prefix,
        config.data.start_year,
        config.data.end_year,
        &config.skip_set(),
    )?;
    let shape = first_raster_shape(catalog.present_paths())?;
    info!(rows = shape.0, cols = shape.1, "Grid shape determined");
    Ok((catalog, shape))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn run_stack(config: &Config, by_month: bool) -> Result<()> {
    let start = Instant::now();
    log_operation_start("stack", None);

    let (catalog, shape) = open_series(config)?;

    if by_month {
        let monthly = stack_by_calendar_month(&catalog, shape)?;
        let shapes: BTreeMap<String, Vec<usize>> = monthly
            .iter()
            .map(|(month, volume)| (format!("{:02}", month), volume.shape().to_vec()))
            .collect();
        print_json(&shapes)?;
    } else {
        let volume = stack_catalog(&catalog, shape)?;
        let missing: Vec<String> = catalog.missing().map(|e| e.key.to_string()).collect();
        print_json(&StackSummary {
            directory: catalog.directory().to_path_buf(),
            shape: volume.shape().to_vec(),
            present: catalog.len() - missing.len(),
            missing,
        })?;
    }

    log_operation_end("stack", start, true);
    Ok(())
}

fn run_fill(config: &Config, month: Option<&str>, index: Option<i64>, output: &Path) -> Result<()> {
    let start = Instant::now();
    log_operation_start("fill", month);

    let (catalog, shape) = open_series(config)?;
    let volume = stack_catalog(&catalog, shape)?;

    let missing_index = match (month, index) {
        (Some(month), _) => {
            let key: MonthKey = month.parse()?;
            catalog.index_of(key).ok_or_else(|| {
                LacunaError::invalid_argument(
                    "month",
                    format!("{} is outside the configured year range", key),
                )
            })?
        }
        (None, Some(index)) => checked_time_index(index, volume.len_of(Axis(0)))?,
        (None, None) => {
            return Err(LacunaError::invalid_argument(
                "month",
                "Either --month or --index is required",
            ))
        }
    };
    let entry = &catalog.entries()[missing_index];
    if !entry.is_missing() {
        info!(month = %entry.key, "Month has a file; its values will be replaced");
    }

    let interpolator = SliceInterpolator::new(config.interpolation_options()?);
    let reconstructed =
        log_timed_operation("interpolate", || interpolator.interpolate(&volume, missing_index))?;

    std::fs::create_dir_all(output)?;
    let output_path = output.join(&entry.filename);
    write_raster(
        &output_path,
        &reconstructed.index_axis(Axis(0), missing_index).to_owned(),
    )?;
    info!(file = %output_path.display(), "Reconstructed slice written");

    print_json(&FillSummary {
        month: entry.key.to_string(),
        index: missing_index,
        boundary: interpolator.options().boundary.to_string(),
        output: output_path,
    })?;

    log_operation_end("fill", start, true);
    Ok(())
}

fn run_combine(first: &Path, second: &Path, output: &Path, weights: BlendWeights) -> Result<()> {
    let start = Instant::now();
    log_operation_start("combine", None);

    let first_grid = read_raster(first)?;
    let second_grid = read_raster(second)?;
    info!(first = ?first_grid.dim(), second = ?second_grid.dim(), "Rasters loaded");

    let combined = combine(&first_grid, &second_grid, weights).map_err(|e| {
        error!("Images are not the same size");
        e
    })?;

    info!(file = %output.display(), "Saving combined raster");
    write_gray8(output, &combined)?;

    log_operation_end("combine", start, true);
    Ok(())
}
