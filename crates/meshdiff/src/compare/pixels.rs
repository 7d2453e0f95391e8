use std::fmt;

use image::{Rgb, RgbImage};

/// Marker painted onto pixels that differ: pure red (BGR `(0, 0, 255)`).
pub const SENTINEL: Rgb<u8> = Rgb([255, 0, 0]);

/// Number of colour channels the comparator looks at. Alpha is never compared.
pub const CHANNELS: u8 = 3;

/// Dimensions plus channel layout of a pixel buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Shape {
    pub width: u32,
    pub height: u32,
    pub channels: u8,
}

impl Shape {
    pub fn rgb(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            channels: CHANNELS,
        }
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}x{} ({} channels)",
            self.width, self.height, self.channels
        )
    }
}

/// Read-only view over decoded image data, addressed row-major by `(x, y)`.
pub trait PixelSource {
    fn shape(&self) -> Shape;
    fn pixel(&self, x: u32, y: u32) -> [u8; 3];
    /// Owned copy used as the starting point of the diff buffer.
    fn to_rgb_image(&self) -> RgbImage;
}

impl PixelSource for RgbImage {
    fn shape(&self) -> Shape {
        Shape::rgb(self.width(), self.height())
    }

    fn pixel(&self, x: u32, y: u32) -> [u8; 3] {
        self.get_pixel(x, y).0
    }

    fn to_rgb_image(&self) -> RgbImage {
        self.clone()
    }
}

/// True iff every channel differs. A pixel where only one or two channels
/// changed is not counted.
pub fn all_channels_differ(a: [u8; 3], b: [u8; 3]) -> bool {
    a[0] != b[0] && a[1] != b[1] && a[2] != b[2]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shape_display_lists_channels() {
        assert_eq!(Shape::rgb(10, 11).to_string(), "10x11 (3 channels)");
    }

    #[test]
    fn rgb_image_reports_rgb_shape() {
        let img = RgbImage::new(4, 2);
        assert_eq!(img.shape(), Shape::rgb(4, 2));
    }

    #[test]
    fn partial_channel_change_is_not_a_difference() {
        assert!(!all_channels_differ([10, 20, 30], [11, 20, 30]));
        assert!(!all_channels_differ([10, 20, 30], [11, 21, 30]));
        assert!(all_channels_differ([10, 20, 30], [11, 21, 31]));
        assert!(!all_channels_differ([10, 20, 30], [10, 20, 30]));
    }
}
