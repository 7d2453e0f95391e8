use std::path::Path;

use anyhow::{Result, bail};
use meshdiff::compare::mesh::{DEFAULT_MESH, DEFAULT_THRESHOLD};
use meshdiff::config;

/// `meshdiff init`: create meshdiff.toml.
pub fn init(path: &Path, force: bool) -> Result<()> {
    if !force && config::config_file_exists(path) {
        bail!("{} already exists (use --force to overwrite)", path.display());
    }

    config::write_template(path, DEFAULT_THRESHOLD, DEFAULT_MESH)?;

    let verb = if force { "Regenerated" } else { "Created" };
    println!("{verb} {}", path.display());
    println!("  compare.threshold = {DEFAULT_THRESHOLD}");
    println!("  compare.mesh = {DEFAULT_MESH}");
    Ok(())
}
