pub mod resolve;
pub mod template;

use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

use crate::compare::mesh::{DEFAULT_MESH, DEFAULT_THRESHOLD};
use crate::load::RasterizeOptions;

pub use self::resolve::{CliOverrides, ResolvedConfig};
pub use self::template::{config_file_exists, write_template};

pub const CONFIG_FILE: &str = "meshdiff.toml";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CompareConfig {
    /// Max allowed difference per tile, in percent (0-100).
    pub threshold: f64,
    /// Grid order, the image is split into `mesh x mesh` tiles.
    pub mesh: u32,
}

impl Default for CompareConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            mesh: DEFAULT_MESH,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Glob, relative to the reference directory.
    pub pattern: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parallel: Option<usize>,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            pattern: "**/*.png".to_string(),
            parallel: None,
        }
    }
}

impl BatchConfig {
    pub fn parallel(&self) -> usize {
        self.parallel.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4)
        })
    }
}

pub fn validate_threshold(v: f64) -> Result<f64, String> {
    if !(0.0..=100.0).contains(&v) {
        return Err(format!("threshold must be between 0 and 100, got {v}"));
    }
    Ok(v)
}

pub fn validate_mesh(v: u32) -> Result<u32, String> {
    if v == 0 {
        return Err("mesh must be at least 1".to_string());
    }
    Ok(v)
}

pub fn validate_parallel(v: usize) -> Result<usize, String> {
    if v == 0 {
        return Err("parallel must be at least 1".to_string());
    }
    Ok(v)
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub compare: CompareConfig,
    #[serde(default)]
    pub rasterize: RasterizeOptions,
    #[serde(default)]
    pub batch: BatchConfig,
}

impl Config {
    /// Validate semantic constraints that serde cannot express.
    fn validate(&self) -> Result<()> {
        validate_threshold(self.compare.threshold).map_err(|e| anyhow::anyhow!("compare.{e}"))?;
        validate_mesh(self.compare.mesh).map_err(|e| anyhow::anyhow!("compare.{e}"))?;

        if self.rasterize.width == 0 || self.rasterize.height == 0 {
            bail!(
                "rasterize has invalid dimensions ({}x{}). Both width and height must be > 0",
                self.rasterize.width,
                self.rasterize.height,
            );
        }

        if let Some(parallel) = self.batch.parallel {
            validate_parallel(parallel).map_err(|e| anyhow::anyhow!("batch.{e}"))?;
        }

        if let Err(e) = glob::Pattern::new(&self.batch.pattern) {
            bail!("batch.pattern {:?} is not a valid glob: {e}", self.batch.pattern);
        }

        Ok(())
    }
}

pub fn parse(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content)?;
    config.validate()?;
    Ok(config)
}

/// Load and validate a config file.
pub fn load(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    parse(&content).with_context(|| format!("Failed to parse {}", path.display()))
}
