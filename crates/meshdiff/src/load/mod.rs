pub mod svg;

use std::path::{Path, PathBuf};

use image::{ImageFormat, ImageReader, RgbImage};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

pub use self::svg::Background;

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("failed to read {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to decode {}", path.display())]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("failed to parse SVG {}", path.display())]
    Svg {
        path: PathBuf,
        #[source]
        source: resvg::usvg::Error,
    },

    #[error("failed to rasterize {}: {reason}", path.display())]
    Rasterize { path: PathBuf, reason: String },
}

/// How vector inputs are turned into pixels.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RasterizeOptions {
    pub width: u32,
    pub height: u32,
    pub background: Background,
    /// Keep the rendered PNG next to the source SVG as `<name>.png`.
    pub keep_png: bool,
}

impl Default for RasterizeOptions {
    fn default() -> Self {
        Self {
            width: 1000,
            height: 500,
            background: Background::BLACK,
            keep_png: false,
        }
    }
}

pub fn is_svg(path: &Path) -> bool {
    path.extension()
        .is_some_and(|e| e.eq_ignore_ascii_case("svg"))
}

/// Decode `path` into an RGB buffer, rasterizing SVG input first.
/// Alpha, if any, is discarded.
pub fn load(path: &Path, raster: &RasterizeOptions) -> Result<RgbImage, DecodeError> {
    if is_svg(path) {
        return load_svg(path, raster);
    }

    debug!(path = %path.display(), "decoding raster image");
    let reader = ImageReader::open(path)
        .and_then(|r| r.with_guessed_format())
        .map_err(|source| DecodeError::Io {
            path: path.to_path_buf(),
            source,
        })?;
    let image = reader.decode().map_err(|source| DecodeError::Image {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(image.to_rgb8())
}

fn load_svg(path: &Path, raster: &RasterizeOptions) -> Result<RgbImage, DecodeError> {
    let data = std::fs::read(path).map_err(|source| DecodeError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let png = svg::rasterize(
        path,
        &data,
        raster.width,
        raster.height,
        raster.background,
    )?;

    if raster.keep_png {
        let png_path = path.with_extension("png");
        std::fs::write(&png_path, &png).map_err(|source| DecodeError::Io {
            path: png_path.clone(),
            source,
        })?;
        debug!(path = %png_path.display(), "kept rasterized png");
    }

    let image = image::load_from_memory_with_format(&png, ImageFormat::Png).map_err(|source| {
        DecodeError::Image {
            path: path.to_path_buf(),
            source,
        }
    })?;
    Ok(image.to_rgb8())
}
