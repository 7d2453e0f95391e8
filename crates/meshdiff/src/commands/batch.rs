use std::path::Path;
use std::time::Instant;

use anyhow::{Context, Result};
use meshdiff::batch::{self, BatchStatus, BatchSummary};
use meshdiff::config::ResolvedConfig;
use meshdiff::report::terminal;
use tracing::{debug, info};

/// `meshdiff batch`: plan, compare in parallel, report.
/// Returns exit code: 0 = all pass, 1 = any fail, missing or error.
pub async fn batch(
    reference: &Path,
    current: &Path,
    output: &Path,
    json: Option<&Path>,
    config: ResolvedConfig,
) -> Result<i32> {
    let jobs = batch::plan(reference, current, output, &config.pattern)?;
    if jobs.is_empty() {
        info!(
            reference = %reference.display(),
            pattern = %config.pattern,
            "no images matched"
        );
        return Ok(0);
    }

    let run_start = Instant::now();
    debug!(total = jobs.len(), parallel = config.parallel, "starting batch");
    let threshold = config.check.threshold;
    let entries = batch::run(jobs, config.check.clone(), config.parallel).await;

    for entry in &entries {
        terminal::print_line(&entry.name, &entry.status, threshold, entry.elapsed);
    }
    terminal::print_actionable_summary(&entries);
    terminal::print_summary(&entries, run_start.elapsed());

    if let Some(path) = json {
        let summary = BatchSummary::new(&config.check, &entries);
        let content =
            serde_json::to_string_pretty(&summary).context("Failed to serialize summary")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        println!("Summary:  {}", path.display());
    }

    if entries.iter().all(|e| e.status == BatchStatus::Pass) {
        Ok(0)
    } else {
        Ok(1)
    }
}
