pub mod mesh;
pub mod pixels;

use image::RgbImage;
use thiserror::Error;

pub use self::mesh::{MeshParams, Tile, compare, compare_with, tiles};
pub use self::pixels::{PixelSource, SENTINEL, Shape};

#[derive(Debug, Error)]
pub enum CompareError {
    #[error("these two images have different size or format\n  image 1: {left}\n  image 2: {right}")]
    ShapeMismatch { left: Shape, right: Shape },

    #[error("mesh order must be at least 1, got {0}")]
    InvalidMesh(u32),

    #[error("threshold must be between 0 and 100 percent, got {0}")]
    InvalidThreshold(f64),
}

/// Outcome of a mesh comparison.
#[derive(Debug)]
pub enum Comparison {
    Similar,
    /// First tile (row-major) whose difference exceeded the threshold.
    Dissimilar(Box<Dissimilarity>),
}

#[derive(Debug)]
pub struct Dissimilarity {
    pub tile_row: u32,
    pub tile_col: u32,
    /// Pixels in the failing tile where all three channels differ.
    pub differing: u64,
    /// Pixel count of one tile.
    pub area: u64,
    /// `differing * 100 / area`, always within `0.0..=100.0`.
    pub percent: f64,
    /// Copy of the first image with differing pixels painted [`SENTINEL`].
    pub diff: RgbImage,
}

impl Comparison {
    pub fn is_similar(&self) -> bool {
        matches!(self, Self::Similar)
    }
}
