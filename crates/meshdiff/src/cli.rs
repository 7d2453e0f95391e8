use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use meshdiff::config::{self, CliOverrides};

fn parse_threshold(s: &str) -> Result<f64, String> {
    let v: f64 = s.parse().map_err(|e| format!("{e}"))?;
    config::validate_threshold(v)
}

fn parse_mesh(s: &str) -> Result<u32, String> {
    let v: u32 = s.parse().map_err(|e| format!("{e}"))?;
    config::validate_mesh(v)
}

fn parse_parallel(s: &str) -> Result<usize, String> {
    let v: usize = s.parse().map_err(|e| format!("{e}"))?;
    config::validate_parallel(v)
}

#[derive(Parser)]
#[command(
    name = "meshdiff",
    version,
    about = "Compare raster and SVG images tile by tile"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// Knobs shared by `compare` and `batch`. Unset values fall back to env, then config file.
#[derive(Args)]
pub struct Tuning {
    /// Max percentage of differing pixels per tile (0-100)
    #[arg(long, short = 't', value_parser = parse_threshold)]
    pub threshold: Option<f64>,
    /// Split images into MESH x MESH tiles
    #[arg(long, short = 'm', value_parser = parse_mesh)]
    pub mesh: Option<u32>,
    /// Config file (default: ./meshdiff.toml when present)
    #[arg(long, short = 'c')]
    pub config: Option<PathBuf>,
}

impl Tuning {
    pub fn into_overrides(self) -> CliOverrides {
        CliOverrides {
            config: self.config,
            threshold: self.threshold,
            mesh: self.mesh,
            ..CliOverrides::default()
        }
    }
}

#[derive(Subcommand)]
pub enum Command {
    /// Compare two images; write a diff image when they differ (exit 0/1)
    Compare {
        /// First image (PNG, JPEG, SVG, ...); the diff image is drawn over it
        image1: PathBuf,
        /// Second image
        image2: PathBuf,
        /// Where to write the diff image
        #[arg(long, short = 'o', default_value = "diff.png")]
        output: PathBuf,
        #[command(flatten)]
        tuning: Tuning,
    },

    /// Compare every reference image against the current image at the same path (exit 0/1)
    Batch {
        /// Directory of reference images
        #[arg(long)]
        reference: PathBuf,
        /// Directory of current images
        #[arg(long)]
        current: PathBuf,
        /// Directory for diff images
        #[arg(long, short = 'o', default_value = "difference")]
        output: PathBuf,
        /// Glob relative to the reference directory (overrides config)
        #[arg(long)]
        pattern: Option<String>,
        /// Number of comparisons run in parallel
        #[arg(long, short = 'p', value_parser = parse_parallel)]
        parallel: Option<usize>,
        /// Also write a JSON summary to this file
        #[arg(long)]
        json: Option<PathBuf>,
        #[command(flatten)]
        tuning: Tuning,
    },

    /// Create meshdiff.toml with default settings
    Init {
        /// Where to write the config file
        #[arg(long, default_value = config::CONFIG_FILE)]
        path: PathBuf,
        /// Overwrite an existing config
        #[arg(long, short = 'f')]
        force: bool,
    },
}
