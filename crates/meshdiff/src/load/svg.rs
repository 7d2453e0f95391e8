use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::{Arc, OnceLock};

use resvg::{tiny_skia, usvg};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::DecodeError;

/// Solid fill painted under the SVG before rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Background {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Background {
    pub const BLACK: Self = Self { r: 0, g: 0, b: 0 };
    pub const WHITE: Self = Self {
        r: 255,
        g: 255,
        b: 255,
    };
}

impl Default for Background {
    fn default() -> Self {
        Self::BLACK
    }
}

impl FromStr for Background {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        match s.to_ascii_lowercase().as_str() {
            "black" => return Ok(Self::BLACK),
            "white" => return Ok(Self::WHITE),
            _ => {}
        }
        let hex = s
            .strip_prefix('#')
            .ok_or_else(|| format!("unknown colour {s:?} (expected black, white or #rrggbb)"))?;
        let digit = |i: usize, len: usize| {
            u8::from_str_radix(&hex[i..i + len], 16).map_err(|e| format!("bad colour {s:?}: {e}"))
        };
        match hex.len() {
            6 if hex.is_ascii() => Ok(Self {
                r: digit(0, 2)?,
                g: digit(2, 2)?,
                b: digit(4, 2)?,
            }),
            // #rgb expands each nibble: #f80 -> #ff8800
            3 if hex.is_ascii() => Ok(Self {
                r: digit(0, 1)? * 17,
                g: digit(1, 1)? * 17,
                b: digit(2, 1)? * 17,
            }),
            _ => Err(format!("bad colour {s:?} (expected #rrggbb or #rgb)")),
        }
    }
}

impl TryFrom<String> for Background {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Background> for String {
    fn from(b: Background) -> Self {
        b.to_string()
    }
}

impl fmt::Display for Background {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// System fonts, scanned on first use and shared by every rasterization.
fn system_fonts() -> Arc<usvg::fontdb::Database> {
    static FONTS: OnceLock<Arc<usvg::fontdb::Database>> = OnceLock::new();
    FONTS
        .get_or_init(|| {
            let mut db = usvg::fontdb::Database::new();
            db.load_system_fonts();
            debug!(faces = db.len(), "system fonts loaded");
            Arc::new(db)
        })
        .clone()
}

/// Render an SVG into a `width x height` opaque PNG.
///
/// The drawing is stretched independently along each axis to fill the target.
pub fn rasterize(
    path: &Path,
    data: &[u8],
    width: u32,
    height: u32,
    background: Background,
) -> Result<Vec<u8>, DecodeError> {
    let options = usvg::Options {
        resources_dir: path.parent().map(Path::to_path_buf),
        fontdb: system_fonts(),
        ..usvg::Options::default()
    };

    let tree = usvg::Tree::from_data(data, &options).map_err(|source| DecodeError::Svg {
        path: path.to_path_buf(),
        source,
    })?;

    let mut pixmap =
        tiny_skia::Pixmap::new(width, height).ok_or_else(|| DecodeError::Rasterize {
            path: path.to_path_buf(),
            reason: format!("cannot allocate a {width}x{height} canvas"),
        })?;
    pixmap.fill(tiny_skia::Color::from_rgba8(
        background.r,
        background.g,
        background.b,
        255,
    ));

    let size = tree.size();
    let transform = tiny_skia::Transform::from_scale(
        width as f32 / size.width(),
        height as f32 / size.height(),
    );
    debug!(
        path = %path.display(),
        svg_width = size.width(),
        svg_height = size.height(),
        width,
        height,
        "rasterizing svg"
    );
    resvg::render(&tree, transform, &mut pixmap.as_mut());

    pixmap.encode_png().map_err(|e| DecodeError::Rasterize {
        path: path.to_path_buf(),
        reason: format!("png encode failed: {e}"),
    })
}
