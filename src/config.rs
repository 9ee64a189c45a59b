//! Configuration management for lacuna.
//!
//! This module handles the layered configuration system with the following precedence:
//! 1. Command-line arguments (highest priority)
//! 2. Environment variables
//! 3. JSON config file
//! 4. Default values (lowest priority)

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::error::{LacunaError, Result};
use crate::interpolation::{get_boundary_condition, InterpolationOptions};

/// Command-line arguments for lacuna
#[derive(Parser, Debug)]
#[command(name = "lacuna")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Path to JSON configuration file
    #[arg(short, long, env = "LACUNA_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Directory holding the monthly rasters
    #[arg(short, long, env = "LACUNA_INPUT_DIR", global = true)]
    pub input_dir: Option<PathBuf>,

    /// File name prefix of the monthly rasters
    #[arg(long, env = "LACUNA_PREFIX", global = true)]
    pub prefix: Option<String>,

    /// First year of the series
    #[arg(long, env = "LACUNA_START_YEAR", global = true)]
    pub start_year: Option<i32>,

    /// Last year of the series (inclusive)
    #[arg(long, env = "LACUNA_END_YEAR", global = true)]
    pub end_year: Option<i32>,

    /// File names to treat as missing (repeatable or comma separated)
    #[arg(long = "skip", env = "LACUNA_SKIP", value_delimiter = ',', global = true)]
    pub skip: Vec<String>,

    /// Spline boundary condition (not-a-knot, natural)
    #[arg(long, env = "LACUNA_BOUNDARY", global = true)]
    pub boundary: Option<String>,

    /// No-data sentinel excluded from fits
    #[arg(long, env = "LACUNA_NODATA", allow_negative_numbers = true, global = true)]
    pub nodata: Option<f64>,

    /// Number of worker threads
    #[arg(short, long, env = "LACUNA_THREADS", global = true)]
    pub threads: Option<usize>,

    /// Interpolate on the calling thread only
    #[arg(long, global = true)]
    pub sequential: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LACUNA_LOG_LEVEL", global = true)]
    pub log_level: Option<String>,
}

/// lacuna subcommands
#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Stack the monthly rasters and print a summary
    Stack {
        /// Build one stack per calendar month instead of one series
        #[arg(long)]
        by_month: bool,
    },

    /// Reconstruct one missing month and write it as a raster
    Fill {
        /// Month to reconstruct, as YYYY-MM
        #[arg(short, long, conflicts_with = "index", required_unless_present = "index")]
        month: Option<String>,

        /// Time index to reconstruct
        #[arg(long, allow_negative_numbers = true)]
        index: Option<i64>,

        /// Output directory
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Normalise two rasters and blend them
    Combine {
        /// First raster
        first: PathBuf,

        /// Second raster
        second: PathBuf,

        /// Output raster
        #[arg(short, long)]
        output: PathBuf,

        /// Weight of the first raster
        #[arg(long, default_value_t = 0.5)]
        alpha: f64,

        /// Weight of the second raster
        #[arg(long, default_value_t = 0.5)]
        beta: f64,

        /// Scalar added to each blended cell
        #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
        gamma: f64,
    },
}

/// Input series configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataConfig {
    /// Directory holding the monthly rasters
    #[serde(default)]
    pub input_dir: Option<PathBuf>,

    /// File name prefix
    #[serde(default = "default_prefix")]
    pub prefix: String,

    /// First year of the series
    #[serde(default = "default_start_year")]
    pub start_year: i32,

    /// Last year of the series (inclusive)
    #[serde(default = "default_end_year")]
    pub end_year: i32,

    /// File names treated as missing
    #[serde(default)]
    pub skip_files: Vec<String>,
}

/// Interpolation configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterpolationConfig {
    /// Spline boundary condition
    #[serde(default = "default_boundary")]
    pub boundary: String,

    /// No-data sentinel
    #[serde(default)]
    pub nodata: Option<f64>,

    /// Number of worker threads (None = number of CPU cores)
    #[serde(default)]
    pub threads: Option<usize>,

    /// Fan locations out over worker threads
    #[serde(default = "default_parallel")]
    pub parallel: bool,
}

/// Complete configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Data configuration
    #[serde(default)]
    pub data: DataConfig,

    /// Interpolation configuration
    #[serde(default)]
    pub interpolation: InterpolationConfig,

    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Config {
    /// Load configuration from all sources with proper precedence
    pub fn load() -> Result<(Self, Command)> {
        Self::from_args(Args::parse())
    }

    /// Build configuration from already parsed arguments
    pub fn from_args(args: Args) -> Result<(Self, Command)> {
        // Start with defaults
        let mut config = Config::default();

        // Load from JSON file if provided
        if let Some(config_path) = &args.config {
            let json_config = Self::load_from_file(config_path)?;
            config.merge(json_config);
        }

        // Override with command-line arguments
        if args.input_dir.is_some() {
            config.data.input_dir = args.input_dir;
        }
        if let Some(prefix) = args.prefix {
            config.data.prefix = prefix;
        }
        if let Some(start_year) = args.start_year {
            config.data.start_year = start_year;
        }
        if let Some(end_year) = args.end_year {
            config.data.end_year = end_year;
        }
        if !args.skip.is_empty() {
            config.data.skip_files = args.skip;
        }
        if let Some(boundary) = args.boundary {
            config.interpolation.boundary = boundary;
        }
        if args.nodata.is_some() {
            config.interpolation.nodata = args.nodata;
        }
        if args.threads.is_some() {
            config.interpolation.threads = args.threads;
        }
        if args.sequential {
            config.interpolation.parallel = false;
        }
        if let Some(log_level) = args.log_level {
            config.log_level = log_level;
        }

        Ok((config, args.command))
    }

    /// Load configuration from a JSON file
    fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Merge another config into this one (other takes precedence)
    fn merge(&mut self, other: Config) {
        if other.data.input_dir.is_some() {
            self.data.input_dir = other.data.input_dir;
        }
        self.data.prefix = other.data.prefix;
        self.data.start_year = other.data.start_year;
        self.data.end_year = other.data.end_year;
        self.data.skip_files = other.data.skip_files;
        self.interpolation = other.interpolation;
        self.log_level = other.log_level;
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.data.prefix.is_empty() {
            return Err(LacunaError::Config {
                message: "File prefix cannot be empty".to_string(),
            });
        }

        if self.data.start_year > self.data.end_year {
            return Err(LacunaError::Config {
                message: format!(
                    "Start year {} is after end year {}",
                    self.data.start_year, self.data.end_year
                ),
            });
        }

        if self.interpolation.threads == Some(0) {
            return Err(LacunaError::Config {
                message: "Thread count cannot be 0".to_string(),
            });
        }

        if let Some(nodata) = self.interpolation.nodata {
            if !nodata.is_finite() {
                return Err(LacunaError::Config {
                    message: format!("No-data value must be finite, got {}", nodata),
                });
            }
        }

        // Validate log level
        match self.log_level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => {
                return Err(LacunaError::Config {
                    message: format!(
                        "Invalid log level: {}. Must be one of: trace, debug, info, warn, error",
                        self.log_level
                    ),
                });
            }
        }

        // Validate boundary condition
        get_boundary_condition(&self.interpolation.boundary).map_err(|e| LacunaError::Config {
            message: e.to_string(),
        })?;

        Ok(())
    }

    /// Input directory, required by the stacking commands
    pub fn input_dir(&self) -> Result<&Path> {
        self.data
            .input_dir
            .as_deref()
            .ok_or_else(|| LacunaError::Config {
                message: "No input directory given (--input-dir or data.input_dir)".to_string(),
            })
    }

    /// File names to treat as missing
    pub fn skip_set(&self) -> HashSet<String> {
        self.data.skip_files.iter().cloned().collect()
    }

    /// Interpolator settings derived from this configuration
    pub fn interpolation_options(&self) -> Result<InterpolationOptions> {
        Ok(InterpolationOptions {
            boundary: get_boundary_condition(&self.interpolation.boundary)?,
            nodata: self.interpolation.nodata,
            parallel: self.interpolation.parallel,
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data: DataConfig::default(),
            interpolation: InterpolationConfig::default(),
            log_level: default_log_level(),
        }
    }
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            input_dir: None,
            prefix: default_prefix(),
            start_year: default_start_year(),
            end_year: default_end_year(),
            skip_files: Vec::new(),
        }
    }
}

impl Default for InterpolationConfig {
    fn default() -> Self {
        Self {
            boundary: default_boundary(),
            nodata: None,
            threads: None,
            parallel: default_parallel(),
        }
    }
}

// Default value functions for serde
fn default_prefix() -> String {
    "clipped_final_img".to_string()
}

fn default_start_year() -> i32 {
    2003
}

fn default_end_year() -> i32 {
    2021
}

fn default_boundary() -> String {
    "not-a-knot".to_string()
}

fn default_parallel() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpolation::BoundaryCondition;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.data.prefix, "clipped_final_img");
        assert_eq!(config.data.start_year, 2003);
        assert_eq!(config.data.end_year, 2021);
        assert_eq!(config.interpolation.boundary, "not-a-knot");
        assert!(config.interpolation.parallel);
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn test_config_merge() {
        let mut config1 = Config::default();
        let mut config2 = Config::default();

        config2.data.start_year = 2010;
        config2.interpolation.threads = Some(4);

        config1.merge(config2);

        assert_eq!(config1.data.start_year, 2010);
        assert_eq!(config1.interpolation.threads, Some(4));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: Config =
            serde_json::from_str(r#"{"data": {"start_year": 2015}, "log_level": "debug"}"#).unwrap();
        assert_eq!(config.data.start_year, 2015);
        assert_eq!(config.data.end_year, 2021);
        assert_eq!(config.interpolation.boundary, "not-a-knot");
        assert_eq!(config.log_level, "debug");
    }

    #[test]
    fn test_args_override_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lacuna.json");
        std::fs::write(
            &path,
            r#"{"data": {"start_year": 2005, "end_year": 2006}, "interpolation": {"boundary": "natural"}}"#,
        )
        .unwrap();

        let args = Args::try_parse_from([
            "lacuna",
            "--config",
            path.to_str().unwrap(),
            "--end-year",
            "2008",
            "--nodata",
            "-9999",
            "fill",
            "--month",
            "2006-03",
            "--output",
            "out",
        ])
        .unwrap();
        let (config, command) = Config::from_args(args).unwrap();

        assert_eq!(config.data.start_year, 2005);
        assert_eq!(config.data.end_year, 2008);
        assert_eq!(config.interpolation.nodata, Some(-9999.0));

        let options = config.interpolation_options().unwrap();
        assert_eq!(options.boundary, BoundaryCondition::Natural);
        assert_eq!(
            command,
            Command::Fill {
                month: Some("2006-03".to_string()),
                index: None,
                output: PathBuf::from("out"),
            }
        );
    }

    #[test]
    fn test_config_validation() {
        // Valid config should pass
        let config = Config::default();
        assert!(config.validate().is_ok());

        // Test empty prefix
        let mut config = Config::default();
        config.data.prefix = "".to_string();
        assert!(config.validate().is_err());

        // Test reversed years
        let mut config = Config::default();
        config.data.start_year = 2022;
        assert!(config.validate().is_err());

        // Test invalid log level
        let mut config = Config::default();
        config.log_level = "invalid".to_string();
        assert!(config.validate().is_err());

        // Test invalid boundary condition
        let mut config = Config::default();
        config.interpolation.boundary = "clamped".to_string();
        assert!(config.validate().is_err());

        // Test zero threads
        let mut config = Config::default();
        config.interpolation.threads = Some(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_input_dir_required() {
        let mut config = Config::default();
        assert!(config.input_dir().is_err());
        config.data.input_dir = Some(PathBuf::from("/data"));
        assert_eq!(config.input_dir().unwrap(), Path::new("/data"));
    }
}
