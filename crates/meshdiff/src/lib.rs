//! Tile-by-tile raster image comparison.
//!
//! Two images of the same size are split into an N×N mesh. A pixel counts as
//! different only when all three colour channels differ. The comparison fails
//! on the first tile (row-major) whose percentage of differing pixels is
//! greater than the threshold, and a copy of the first image with those pixels
//! painted red is written out.

pub mod batch;
pub mod check;
pub mod compare;
pub mod config;
pub mod load;
pub mod report;

pub use check::{CheckError, CheckOptions, compare_images};
pub use compare::{CompareError, Comparison, Dissimilarity, MeshParams, compare};
pub use load::{DecodeError, RasterizeOptions};
pub use report::{TileFailure, WriteError};
