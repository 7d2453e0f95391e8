use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::debug;

use super::{CONFIG_FILE, Config, load, validate_mesh, validate_parallel, validate_threshold};
use crate::check::CheckOptions;

const ENV_THRESHOLD: &str = "MESHDIFF_THRESHOLD";
const ENV_MESH: &str = "MESHDIFF_MESH";

/// Values extracted from the CLI that participate in the merge.
#[derive(Debug, Default)]
pub struct CliOverrides {
    pub config: Option<PathBuf>,
    pub threshold: Option<f64>,
    pub mesh: Option<u32>,
    pub pattern: Option<String>,
    pub parallel: Option<usize>,
}

/// Fully resolved config after CLI > env > file > defaults merge.
#[derive(Debug)]
pub struct ResolvedConfig {
    pub check: CheckOptions,
    pub pattern: String,
    pub parallel: usize,
}

impl ResolvedConfig {
    pub fn new(cli: CliOverrides) -> Result<Self> {
        // 1. File layer: an explicit --config must exist, the default file is optional
        let file_config = match &cli.config {
            Some(path) => load(path)?,
            None if Path::new(CONFIG_FILE).exists() => load(Path::new(CONFIG_FILE))?,
            None => Config::default(),
        };

        // 2. Env layer
        Self::merge(cli, file_config, |key| std::env::var(key).ok())
    }

    fn merge(
        cli: CliOverrides,
        file_config: Config,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let env_threshold: Option<f64> = env(ENV_THRESHOLD)
            .map(|v| v.parse::<f64>())
            .transpose()
            .with_context(|| format!("{ENV_THRESHOLD} must be a valid number"))?;
        let env_mesh: Option<u32> = env(ENV_MESH)
            .map(|v| v.parse::<u32>())
            .transpose()
            .with_context(|| format!("{ENV_MESH} must be a positive integer"))?;

        // 3. CLI > env > file (highest priority first)
        let threshold = cli
            .threshold
            .or(env_threshold)
            .unwrap_or(file_config.compare.threshold);
        validate_threshold(threshold).map_err(|e| anyhow::anyhow!("{e}"))?;

        let mesh = cli.mesh.or(env_mesh).unwrap_or(file_config.compare.mesh);
        validate_mesh(mesh).map_err(|e| anyhow::anyhow!("{e}"))?;

        let mut batch = file_config.batch;
        if let Some(pattern) = cli.pattern {
            batch.pattern = pattern;
        }
        if let Some(parallel) = cli.parallel {
            validate_parallel(parallel).map_err(|e| anyhow::anyhow!("{e}"))?;
            batch.parallel = Some(parallel);
        }

        debug!(threshold, mesh, pattern = %batch.pattern, "resolved config");
        Ok(Self {
            check: CheckOptions {
                threshold,
                mesh,
                rasterize: file_config.rasterize,
            },
            parallel: batch.parallel(),
            pattern: batch.pattern,
        })
    }
}
