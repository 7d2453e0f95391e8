use std::path::Path;

use anyhow::{Context, Result};

/// Hand-crafted config template with commented-out keys.
/// Used by `meshdiff init` instead of `toml::to_string_pretty()` so that
/// users can see the available knobs and their defaults.
const CONFIG_TEMPLATE: &str = r##"# ─────────────────────────────────────────────────────────
# Comparison: all fields optional.
# ─────────────────────────────────────────────────────────
[compare]
threshold = {threshold}                 # max differing pixels per tile, in percent
mesh = {mesh}                      # images are split into mesh x mesh tiles

# ─────────────────────────────────────────────────────────
# SVG rasterization: applied to *.svg inputs only.
# ─────────────────────────────────────────────────────────
[rasterize]
# width = 1000
# height = 500
# background = "black"             # "black" | "white" | "#rrggbb"
# keep_png = false                 # keep the rendered PNG next to the SVG

# ─────────────────────────────────────────────────────────
# Batch runs (`meshdiff batch`).
# ─────────────────────────────────────────────────────────
[batch]
# pattern = "**/*.png"             # glob relative to the reference directory
# parallel = 4                     # default: number of CPUs
"##;

pub fn config_file_exists(path: &Path) -> bool {
    path.exists()
}

pub fn render_template(threshold: f64, mesh: u32) -> String {
    CONFIG_TEMPLATE
        .replace("{threshold}", &format!("{threshold:?}"))
        .replace("{mesh}", &mesh.to_string())
}

/// Write the hand-crafted config template (with commented-out sections).
pub fn write_template(path: &Path, threshold: f64, mesh: u32) -> Result<()> {
    if let Some(dir) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;
    }
    std::fs::write(path, render_template(threshold, mesh))
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}
