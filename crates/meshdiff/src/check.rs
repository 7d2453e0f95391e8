use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{info, warn};

use crate::compare::{self, CompareError, Comparison, MeshParams};
use crate::load::{self, DecodeError, RasterizeOptions};
use crate::report::{self, TileFailure, WriteError};

/// Parameters for [`compare_images`].
#[derive(Debug, Clone)]
pub struct CheckOptions {
    /// Max tolerated percentage of differing pixels per tile.
    pub threshold: f64,
    /// Grid order: the images are split into `mesh x mesh` tiles.
    pub mesh: u32,
    pub rasterize: RasterizeOptions,
}

impl Default for CheckOptions {
    fn default() -> Self {
        Self {
            threshold: compare::mesh::DEFAULT_THRESHOLD,
            mesh: compare::mesh::DEFAULT_MESH,
            rasterize: RasterizeOptions::default(),
        }
    }
}

#[derive(Debug, Error)]
pub enum CheckError {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Compare(#[from] CompareError),

    #[error("{failure}; see {}", .diff_path.display())]
    Dissimilar {
        failure: TileFailure,
        diff_path: PathBuf,
        /// Set when the diff image could not be saved. The outcome is still a difference.
        write_error: Option<WriteError>,
    },
}

impl CheckError {
    pub fn is_dissimilar(&self) -> bool {
        matches!(self, Self::Dissimilar { .. })
    }
}

/// Load both images, compare them tile by tile and, when they differ, write the
/// diff image to `output_path`.
///
/// Returns `Ok(())` when every tile is within the threshold.
pub fn compare_images(
    path1: &Path,
    path2: &Path,
    output_path: &Path,
    options: &CheckOptions,
) -> Result<(), CheckError> {
    let params = MeshParams::new(options.mesh, options.threshold)?;
    let image1 = load::load(path1, &options.rasterize)?;
    let image2 = load::load(path2, &options.rasterize)?;

    match compare::compare_with(&image1, &image2, &params)? {
        Comparison::Similar => {
            info!(
                image1 = %path1.display(),
                image2 = %path2.display(),
                "these two images are similar"
            );
            Ok(())
        }
        Comparison::Dissimilar(d) => {
            let write_error = match report::write_diff(&d.diff, output_path) {
                Ok(()) => None,
                Err(e) => {
                    warn!(
                        path = %output_path.display(),
                        error = ?e,
                        "failed to write diff image"
                    );
                    Some(e)
                }
            };
            Err(CheckError::Dissimilar {
                failure: TileFailure {
                    tile_row: d.tile_row,
                    tile_col: d.tile_col,
                    percent: d.percent,
                    threshold: params.threshold(),
                },
                diff_path: output_path.to_path_buf(),
                write_error,
            })
        }
    }
}
