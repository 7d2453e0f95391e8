pub mod terminal;

use std::fmt;
use std::path::{Path, PathBuf};

use image::{ImageFormat, RgbImage};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum WriteError {
    #[error("failed to create {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write diff image {}", path.display())]
    Encode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("refusing to write diff image {} as lossy {format}", path.display())]
    LossyFormat { path: PathBuf, format: String },
}

fn ensure_parent(path: &Path) -> Result<(), WriteError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|source| WriteError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    Ok(())
}

/// Persist a diff buffer. The format follows the extension, PNG when there is none.
pub fn write_diff(diff: &RgbImage, path: &Path) -> Result<(), WriteError> {
    let format = ImageFormat::from_path(path).unwrap_or(ImageFormat::Png);
    if matches!(format, ImageFormat::Jpeg | ImageFormat::WebP) {
        return Err(WriteError::LossyFormat {
            path: path.to_path_buf(),
            format: format!("{format:?}"),
        });
    }

    ensure_parent(path)?;
    diff.save_with_format(path, format)
        .map_err(|source| WriteError::Encode {
            path: path.to_path_buf(),
            source,
        })?;
    debug!(path = %path.display(), ?format, "diff image written");
    Ok(())
}

/// The first tile over threshold, as shown to users.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TileFailure {
    pub tile_row: u32,
    pub tile_col: u32,
    pub percent: f64,
    pub threshold: f64,
}

impl fmt::Display for TileFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "difference in tile ({}, {}) = {:.2}% is greater than threshold = {}%",
            self.tile_row, self.tile_col, self.percent, self.threshold
        )
    }
}
