//! Mesh comparison: split both images into an N×N grid of tiles and fail on
//! the first tile whose share of differing pixels exceeds the threshold.
//!
//! Tile bounds come from integer division, so when the width or height is not
//! a multiple of the mesh order the trailing rows/columns belong to no tile and
//! are never inspected. A mesh finer than the image makes every tile empty,
//! so the whole image is leftover and the result is `Similar`.

use image::RgbImage;
use tracing::{debug, trace};

use super::pixels::{PixelSource, SENTINEL, Shape, all_channels_differ};
use super::{CompareError, Comparison, Dissimilarity};

pub const DEFAULT_MESH: u32 = 5;
pub const DEFAULT_THRESHOLD: f64 = 5.0;

/// Validated comparison parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeshParams {
    mesh: u32,
    threshold: f64,
}

impl MeshParams {
    pub fn new(mesh: u32, threshold: f64) -> Result<Self, CompareError> {
        if mesh == 0 {
            return Err(CompareError::InvalidMesh(mesh));
        }
        if !threshold.is_finite() || !(0.0..=100.0).contains(&threshold) {
            return Err(CompareError::InvalidThreshold(threshold));
        }
        Ok(Self { mesh, threshold })
    }

    pub fn mesh(&self) -> u32 {
        self.mesh
    }

    /// Maximum tolerated difference per tile, in percent.
    pub fn threshold(&self) -> f64 {
        self.threshold
    }
}

impl Default for MeshParams {
    fn default() -> Self {
        Self {
            mesh: DEFAULT_MESH,
            threshold: DEFAULT_THRESHOLD,
        }
    }
}

/// One cell of the mesh. Bounds are half-open: `y_start..y_end`, `x_start..x_end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tile {
    pub row: u32,
    pub col: u32,
    pub y_start: u32,
    pub y_end: u32,
    pub x_start: u32,
    pub x_end: u32,
}

impl Tile {
    pub fn area(&self) -> u64 {
        u64::from(self.y_end - self.y_start) * u64::from(self.x_end - self.x_start)
    }
}

/// All `mesh * mesh` tiles of `shape`, row-major (row outer, column inner).
pub fn tiles(shape: Shape, mesh: u32) -> impl Iterator<Item = Tile> {
    let tile_h = shape.height / mesh.max(1);
    let tile_w = shape.width / mesh.max(1);
    (0..mesh).flat_map(move |row| {
        (0..mesh).map(move |col| Tile {
            row,
            col,
            y_start: row * tile_h,
            y_end: (row + 1) * tile_h,
            x_start: col * tile_w,
            x_end: (col + 1) * tile_w,
        })
    })
}

/// Compare two buffers with unvalidated parameters.
///
/// Shape is checked before the parameters, so a shape mismatch is always
/// reported as such regardless of `mesh` and `threshold`.
pub fn compare<A, B>(
    image1: &A,
    image2: &B,
    mesh: u32,
    threshold: f64,
) -> Result<Comparison, CompareError>
where
    A: PixelSource + ?Sized,
    B: PixelSource + ?Sized,
{
    check_shapes(image1, image2)?;
    let params = MeshParams::new(mesh, threshold)?;
    compare_with(image1, image2, &params)
}

/// Compare two buffers tile by tile, stopping at the first tile over threshold.
pub fn compare_with<A, B>(
    image1: &A,
    image2: &B,
    params: &MeshParams,
) -> Result<Comparison, CompareError>
where
    A: PixelSource + ?Sized,
    B: PixelSource + ?Sized,
{
    let shape = check_shapes(image1, image2)?;
    // Every tile has the same area, so an empty one means the whole image is leftover.
    if shape.width / params.mesh == 0 || shape.height / params.mesh == 0 {
        debug!(mesh = params.mesh, %shape, "mesh finer than image, no tile to compare");
        return Ok(Comparison::Similar);
    }

    let mut diff = image1.to_rgb_image();

    for tile in tiles(shape, params.mesh) {
        let area = tile.area();
        let differing = scan_tile(image1, image2, &tile, &mut diff);
        let percent = differing as f64 * 100.0 / area as f64;
        trace!(row = tile.row, col = tile.col, differing, area, percent, "tile scanned");

        if percent > params.threshold {
            debug!(
                row = tile.row,
                col = tile.col,
                percent,
                threshold = params.threshold,
                "tile over threshold"
            );
            return Ok(Comparison::Dissimilar(Box::new(Dissimilarity {
                tile_row: tile.row,
                tile_col: tile.col,
                differing,
                area,
                percent,
                diff,
            })));
        }
    }

    Ok(Comparison::Similar)
}

fn check_shapes<A, B>(image1: &A, image2: &B) -> Result<Shape, CompareError>
where
    A: PixelSource + ?Sized,
    B: PixelSource + ?Sized,
{
    let left = image1.shape();
    let right = image2.shape();
    if left != right {
        return Err(CompareError::ShapeMismatch { left, right });
    }
    Ok(left)
}

/// Count differing pixels in `tile`, painting each one into `diff`.
fn scan_tile<A, B>(image1: &A, image2: &B, tile: &Tile, diff: &mut RgbImage) -> u64
where
    A: PixelSource + ?Sized,
    B: PixelSource + ?Sized,
{
    let mut count = 0u64;
    for y in tile.y_start..tile.y_end {
        for x in tile.x_start..tile.x_end {
            if all_channels_differ(image1.pixel(x, y), image2.pixel(x, y)) {
                count += 1;
                diff.put_pixel(x, y, SENTINEL);
            }
        }
    }
    count
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use image::Rgb;

    use super::*;

    const GREY: Rgb<u8> = Rgb([100, 100, 100]);
    const WHITE: Rgb<u8> = Rgb([255, 255, 255]);

    fn solid(w: u32, h: u32, color: Rgb<u8>) -> RgbImage {
        RgbImage::from_pixel(w, h, color)
    }

    /// Fill every pixel of `tile` in `img` with `color`.
    fn paint_tile(img: &mut RgbImage, tile: &Tile, color: Rgb<u8>) {
        for y in tile.y_start..tile.y_end {
            for x in tile.x_start..tile.x_end {
                img.put_pixel(x, y, color);
            }
        }
    }

    fn tile_at(shape: Shape, mesh: u32, row: u32, col: u32) -> Tile {
        tiles(shape, mesh)
            .find(|t| t.row == row && t.col == col)
            .unwrap()
    }

    fn dissimilar(c: Comparison) -> Dissimilarity {
        match c {
            Comparison::Dissimilar(d) => *d,
            Comparison::Similar => panic!("expected Dissimilar, got Similar"),
        }
    }

    /// Wraps a buffer and counts pixel reads.
    struct Counting {
        inner: RgbImage,
        reads: Cell<usize>,
    }

    impl Counting {
        fn new(inner: RgbImage) -> Self {
            Self {
                inner,
                reads: Cell::new(0),
            }
        }
    }

    impl PixelSource for Counting {
        fn shape(&self) -> Shape {
            self.inner.shape()
        }

        fn pixel(&self, x: u32, y: u32) -> [u8; 3] {
            self.reads.set(self.reads.get() + 1);
            self.inner.pixel(x, y)
        }

        fn to_rgb_image(&self) -> RgbImage {
            self.inner.clone()
        }
    }

    // -- tiling --

    #[test]
    fn tiles_are_row_major() {
        let order: Vec<(u32, u32)> = tiles(Shape::rgb(6, 6), 3).map(|t| (t.row, t.col)).collect();
        assert_eq!(
            order,
            vec![
                (0, 0),
                (0, 1),
                (0, 2),
                (1, 0),
                (1, 1),
                (1, 2),
                (2, 0),
                (2, 1),
                (2, 2)
            ]
        );
    }

    #[test]
    fn tiles_drop_leftover_rows_and_columns() {
        let shape = Shape::rgb(10, 7);
        let all: Vec<Tile> = tiles(shape, 3).collect();
        assert_eq!(all.len(), 9);
        let last = all.last().unwrap();
        assert_eq!((last.x_end, last.y_end), (9, 6));
        assert!(all.iter().all(|t| t.area() == 3 * 2));
    }

    // -- equal and fully different buffers --

    #[test]
    fn equal_buffers_are_similar_for_any_mesh_and_threshold() {
        let a = solid(8, 8, GREY);
        let b = a.clone();
        for mesh in 1..=12 {
            for threshold in [0.0, 0.5, 5.0, 50.0, 100.0] {
                let r = compare(&a, &b, mesh, threshold).unwrap();
                assert!(r.is_similar(), "mesh={mesh} threshold={threshold}");
            }
        }
    }

    #[test]
    fn fully_different_buffers_fail_first_tile_at_100_percent() {
        let a = solid(9, 9, GREY);
        let b = solid(9, 9, WHITE);
        for mesh in [1, 2, 3] {
            let d = dissimilar(compare(&a, &b, mesh, 99.9).unwrap());
            assert_eq!((d.tile_row, d.tile_col), (0, 0));
            assert_eq!(d.percent, 100.0);
            assert_eq!(d.differing, d.area);
        }
    }

    #[test]
    fn threshold_of_100_never_fails() {
        let a = solid(4, 4, GREY);
        let b = solid(4, 4, WHITE);
        assert!(compare(&a, &b, 2, 100.0).unwrap().is_similar());
    }

    // -- shape mismatch --

    #[test]
    fn shape_mismatch_is_reported_before_any_pixel_read() {
        let a = Counting::new(solid(10, 10, GREY));
        let b = Counting::new(solid(10, 11, WHITE));
        let err = compare(&a, &b, 5, 5.0).unwrap_err();
        match err {
            CompareError::ShapeMismatch { left, right } => {
                assert_eq!(left, Shape::rgb(10, 10));
                assert_eq!(right, Shape::rgb(10, 11));
            }
            other => panic!("expected ShapeMismatch, got {other:?}"),
        }
        assert_eq!(a.reads.get(), 0);
        assert_eq!(b.reads.get(), 0);
    }

    #[test]
    fn shape_mismatch_wins_over_invalid_parameters() {
        let a = solid(10, 10, GREY);
        let b = solid(11, 10, GREY);
        assert!(matches!(
            compare(&a, &b, 0, -1.0),
            Err(CompareError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn shape_mismatch_message_names_both_shapes() {
        let a = solid(10, 10, GREY);
        let b = solid(10, 11, GREY);
        let msg = compare(&a, &b, 1, 5.0).unwrap_err().to_string();
        assert!(msg.contains("10x10 (3 channels)"), "{msg}");
        assert!(msg.contains("10x11 (3 channels)"), "{msg}");
    }

    // -- tile order --

    #[test]
    fn first_failing_tile_in_row_major_order_is_reported() {
        let shape = Shape::rgb(8, 8);
        let a = solid(8, 8, GREY);
        let mut b = a.clone();
        let target = tile_at(shape, 4, 2, 1);
        let later = tile_at(shape, 4, 3, 3);
        paint_tile(&mut b, &target, WHITE);
        paint_tile(&mut b, &later, WHITE);

        let d = dissimilar(compare(&a, &b, 4, 5.0).unwrap());
        assert_eq!((d.tile_row, d.tile_col), (2, 1));
        assert_eq!(d.percent, 100.0);

        // The later tile was never scanned, so none of its pixels are marked.
        for y in later.y_start..later.y_end {
            for x in later.x_start..later.x_end {
                assert_eq!(*d.diff.get_pixel(x, y), GREY);
            }
        }
        for y in target.y_start..target.y_end {
            for x in target.x_start..target.x_end {
                assert_eq!(*d.diff.get_pixel(x, y), SENTINEL);
            }
        }
    }

    #[test]
    fn scan_stops_after_failing_tile() {
        let a = Counting::new(solid(8, 8, GREY));
        let b = Counting::new(solid(8, 8, WHITE));
        dissimilar(compare(&a, &b, 4, 5.0).unwrap());
        // Only tile (0, 0), 2x2 pixels, was read.
        assert_eq!(a.reads.get(), 4);
        assert_eq!(b.reads.get(), 4);
    }

    #[test]
    fn passing_tiles_before_failure_keep_their_marks() {
        let shape = Shape::rgb(4, 4);
        let a = solid(4, 4, GREY);
        let mut b = a.clone();
        // One pixel in tile (0, 0): 25%, under a 30% threshold.
        b.put_pixel(0, 0, WHITE);
        // Whole of tile (0, 1): 100%.
        paint_tile(&mut b, &tile_at(shape, 2, 0, 1), WHITE);

        let d = dissimilar(compare(&a, &b, 2, 30.0).unwrap());
        assert_eq!((d.tile_row, d.tile_col), (0, 1));
        assert_eq!(*d.diff.get_pixel(0, 0), SENTINEL);
        assert_eq!(*d.diff.get_pixel(1, 1), GREY);
    }

    // -- leftover region --

    #[test]
    fn leftover_region_never_affects_result() {
        let a = solid(10, 10, GREY);
        let mut b = a.clone();
        for i in 0..10 {
            b.put_pixel(9, i, WHITE);
            b.put_pixel(i, 9, WHITE);
        }
        let r = compare(&a, &b, 3, 0.0).unwrap();
        assert!(r.is_similar());
    }

    // -- threshold boundary --

    #[test]
    fn single_pixel_in_four_by_four_is_25_percent() {
        let a = solid(4, 4, GREY);
        let mut b = a.clone();
        b.put_pixel(1, 0, WHITE);

        let d = dissimilar(compare(&a, &b, 2, 20.0).unwrap());
        assert_eq!((d.tile_row, d.tile_col), (0, 0));
        assert_eq!(d.percent, 25.0);
        assert_eq!((d.differing, d.area), (1, 4));
        assert_eq!(*d.diff.get_pixel(1, 0), SENTINEL);
        assert_eq!(*d.diff.get_pixel(0, 0), GREY);
    }

    #[test]
    fn percent_equal_to_threshold_passes() {
        let a = solid(4, 4, GREY);
        let mut b = a.clone();
        b.put_pixel(1, 0, WHITE);
        assert!(compare(&a, &b, 2, 25.0).unwrap().is_similar());
    }

    #[test]
    fn percent_is_not_truncated() {
        // 1 of 3x3 pixels = 11.11%, which must still exceed 11.1.
        let a = solid(3, 3, GREY);
        let mut b = a.clone();
        b.put_pixel(2, 2, WHITE);
        let d = dissimilar(compare(&a, &b, 1, 11.1).unwrap());
        assert!((d.percent - 100.0 / 9.0).abs() < 1e-9);
        assert!(compare(&a, &b, 1, 11.2).unwrap().is_similar());
    }

    #[test]
    fn partial_channel_changes_are_ignored() {
        let a = solid(4, 4, Rgb([10, 20, 30]));
        let b = solid(4, 4, Rgb([11, 21, 30]));
        assert!(compare(&a, &b, 2, 0.0).unwrap().is_similar());
    }

    // -- parameter contract --

    #[test]
    fn zero_mesh_is_rejected() {
        let a = solid(4, 4, GREY);
        assert!(matches!(
            compare(&a, &a, 0, 5.0),
            Err(CompareError::InvalidMesh(0))
        ));
    }

    #[test]
    fn out_of_range_thresholds_are_rejected() {
        let a = solid(4, 4, GREY);
        for t in [-0.1, 100.5, f64::NAN, f64::INFINITY] {
            assert!(
                matches!(compare(&a, &a, 1, t), Err(CompareError::InvalidThreshold(_))),
                "threshold {t}"
            );
        }
    }

    #[test]
    fn mesh_finer_than_image_compares_nothing() {
        let a = Counting::new(solid(8, 8, GREY));
        let same = Counting::new(solid(8, 8, GREY));
        let other = Counting::new(solid(8, 8, WHITE));

        assert!(compare(&a, &same, 9, 5.0).unwrap().is_similar());
        assert!(compare(&a, &other, 9, 0.0).unwrap().is_similar());
        assert_eq!(a.reads.get(), 0);
        assert_eq!(other.reads.get(), 0);
    }

    #[test]
    fn mesh_finer_than_one_dimension_compares_nothing() {
        // 16x4 with mesh 5: tiles are 3 wide but 0 tall.
        let a = solid(16, 4, GREY);
        let b = solid(16, 4, WHITE);
        assert!(compare(&a, &b, 5, 0.0).unwrap().is_similar());
    }

    #[test]
    fn huge_mesh_returns_without_walking_tiles() {
        let a = solid(8, 8, GREY);
        let b = solid(8, 8, WHITE);
        assert!(compare(&a, &b, u32::MAX, 0.0).unwrap().is_similar());
    }

    #[test]
    fn default_params_match_caller_defaults() {
        let p = MeshParams::default();
        assert_eq!(p.mesh(), 5);
        assert_eq!(p.threshold(), 5.0);
    }
}
