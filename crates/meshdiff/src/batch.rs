//! Check many image pairs from two directory trees.
//!
//! Every file matching the glob under the reference directory is paired with
//! the file at the same relative path under the current directory. Pairs are
//! compared concurrently on tokio's blocking pool.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use serde::Serialize;
use tokio::sync::Semaphore;
use tracing::{debug, warn};

use crate::check::{self, CheckError, CheckOptions};

/// One reference/current pair to check.
#[derive(Debug, Clone)]
pub struct BatchJob {
    /// Path relative to the reference directory.
    pub name: String,
    pub reference: PathBuf,
    pub current: PathBuf,
    pub diff: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "kebab-case")]
pub enum BatchStatus {
    Pass,
    Fail {
        tile_row: u32,
        tile_col: u32,
        percent: f64,
    },
    /// No current image at the reference's relative path.
    Missing,
    Error { message: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchEntry {
    pub name: String,
    #[serde(flatten)]
    pub status: BatchStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diff: Option<PathBuf>,
    #[serde(rename = "elapsed_ms", serialize_with = "as_millis")]
    pub elapsed: Duration,
}

fn as_millis<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(d.as_millis() as u64)
}

/// Machine-readable batch result, written by `--json`.
#[derive(Debug, Serialize)]
pub struct BatchSummary<'a> {
    pub threshold: f64,
    pub mesh: u32,
    pub total: usize,
    pub passed: usize,
    pub entries: &'a [BatchEntry],
}

impl<'a> BatchSummary<'a> {
    pub fn new(options: &CheckOptions, entries: &'a [BatchEntry]) -> Self {
        Self {
            threshold: options.threshold,
            mesh: options.mesh,
            total: entries.len(),
            passed: entries
                .iter()
                .filter(|e| e.status == BatchStatus::Pass)
                .count(),
            entries,
        }
    }
}

/// Diff image path for a reference at `rel`. Non-PNG sources keep their own
/// extension so `a.jpg` and `a.png` get distinct diffs.
fn diff_path(output_dir: &Path, rel: &Path) -> PathBuf {
    let is_png = rel
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("png"));
    if is_png {
        return output_dir.join(rel);
    }
    let mut name = output_dir.join(rel).into_os_string();
    name.push(".png");
    PathBuf::from(name)
}

/// Build the job list by expanding `pattern` under `reference_dir`.
pub fn plan(
    reference_dir: &Path,
    current_dir: &Path,
    output_dir: &Path,
    pattern: &str,
) -> Result<Vec<BatchJob>> {
    let full = reference_dir.join(pattern);
    let full = full
        .to_str()
        .with_context(|| format!("Non UTF-8 path: {}", full.display()))?;

    let mut jobs = Vec::new();
    for entry in glob::glob(full).with_context(|| format!("Invalid glob pattern {pattern:?}"))? {
        let reference = entry.context("Failed to read a glob match")?;
        if !reference.is_file() {
            continue;
        }
        let rel = reference
            .strip_prefix(reference_dir)
            .with_context(|| format!("{} is outside the reference dir", reference.display()))?
            .to_path_buf();
        jobs.push(BatchJob {
            name: rel.to_string_lossy().into_owned(),
            current: current_dir.join(&rel),
            diff: diff_path(output_dir, &rel),
            reference,
        });
    }
    jobs.sort_by(|a, b| a.name.cmp(&b.name));
    debug!(jobs = jobs.len(), pattern, "batch planned");
    Ok(jobs)
}

/// Check a single job. Runs synchronously, call via `spawn_blocking`.
pub fn check_one(job: &BatchJob, options: &CheckOptions) -> BatchStatus {
    if !job.current.exists() {
        return BatchStatus::Missing;
    }
    match check::compare_images(&job.reference, &job.current, &job.diff, options) {
        Ok(()) => BatchStatus::Pass,
        Err(CheckError::Dissimilar { failure, .. }) => BatchStatus::Fail {
            tile_row: failure.tile_row,
            tile_col: failure.tile_col,
            percent: failure.percent,
        },
        Err(e) => BatchStatus::Error {
            message: format!("{:#}", anyhow::Error::new(e)),
        },
    }
}

/// Run all jobs with at most `parallel` comparisons in flight.
/// Entries come back sorted by name.
pub async fn run(jobs: Vec<BatchJob>, options: CheckOptions, parallel: usize) -> Vec<BatchEntry> {
    let options = Arc::new(options);
    let semaphore = Arc::new(Semaphore::new(parallel.max(1)));
    let mut set = tokio::task::JoinSet::new();

    for job in jobs {
        let options = options.clone();
        let semaphore = semaphore.clone();
        set.spawn(async move {
            // The semaphore is never closed.
            let _permit = semaphore.acquire_owned().await.ok();
            let start = Instant::now();
            let name = job.name.clone();
            let outcome = tokio::task::spawn_blocking(move || {
                let status = check_one(&job, &options);
                (job, status)
            })
            .await;
            let elapsed = start.elapsed();
            match outcome {
                Ok((job, status)) => {
                    let diff = matches!(status, BatchStatus::Fail { .. })
                        .then_some(job.diff)
                        .filter(|p| p.exists());
                    BatchEntry {
                        name,
                        status,
                        diff,
                        elapsed,
                    }
                }
                Err(e) => {
                    warn!(job = %name, error = %e, "comparison task panicked");
                    BatchEntry {
                        name,
                        status: BatchStatus::Error {
                            message: format!("comparison task failed: {e}"),
                        },
                        diff: None,
                        elapsed,
                    }
                }
            }
        });
    }

    let mut entries = Vec::new();
    while let Some(result) = set.join_next().await {
        match result {
            Ok(entry) => {
                debug!(job = %entry.name, status = ?entry.status, "job finished");
                entries.push(entry);
            }
            Err(e) => warn!(error = %e, "batch task panicked"),
        }
    }
    entries.sort_by(|a, b| a.name.cmp(&b.name));
    entries
}
