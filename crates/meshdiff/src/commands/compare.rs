use std::path::Path;
use std::time::Instant;

use anyhow::{Context, Result};
use meshdiff::batch::BatchStatus;
use meshdiff::config::ResolvedConfig;
use meshdiff::report::terminal;
use meshdiff::{CheckError, compare_images};
use tracing::debug;

/// `meshdiff compare`: check one pair.
/// Returns exit code: 0 = similar, 1 = dissimilar.
pub fn compare(image1: &Path, image2: &Path, output: &Path, config: ResolvedConfig) -> Result<i32> {
    let threshold = config.check.threshold;
    debug!(mesh = config.check.mesh, threshold, "comparing");
    let name = format!("{} vs {}", image1.display(), image2.display());
    let start = Instant::now();

    match compare_images(image1, image2, output, &config.check) {
        Ok(()) => {
            terminal::print_line(&name, &BatchStatus::Pass, threshold, start.elapsed());
            Ok(0)
        }
        Err(CheckError::Dissimilar {
            failure,
            diff_path,
            write_error,
        }) => {
            let status = BatchStatus::Fail {
                tile_row: failure.tile_row,
                tile_col: failure.tile_col,
                percent: failure.percent,
            };
            terminal::print_line(&name, &status, threshold, start.elapsed());
            match write_error {
                None => println!("Diff image: {}", diff_path.display()),
                Some(e) => println!(
                    "Diff image not written: {:#}",
                    anyhow::Error::new(e)
                ),
            }
            Ok(1)
        }
        Err(e) => Err(e).with_context(|| format!("Failed to compare {name}")),
    }
}
