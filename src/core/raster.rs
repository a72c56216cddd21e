use image::{DynamicImage, Rgb, RgbImage};
use tracing::warn;

use crate::core::vector;

/// Size of the placeholder canvas substituted for undecodable rasters.
pub const PLACEHOLDER_DIM: u32 = 64;

/// Neutral gray used for the undecodable-raster placeholder.
pub const PLACEHOLDER_GRAY: [u8; 3] = [200, 200, 200];

/// Produce a raster for any input, never failing.
///
/// Vector markup is not rendered; it is stood in for by a solid-color canvas
/// at the declared geometry with the document's dominant fill color, so
/// vector images are compared by declared size and color only. Real rasters
/// decode directly; an undecodable raster degrades to a gray placeholder.
pub fn load_raster(filename: &str, bytes: &[u8], is_vector: bool) -> DynamicImage {
    if is_vector {
        return synthesize_vector(&String::from_utf8_lossy(bytes));
    }
    match image::load_from_memory(bytes) {
        Ok(img) => img,
        Err(e) => {
            warn!(file = filename, error = %e, "decode failed, using placeholder raster");
            solid(PLACEHOLDER_DIM, PLACEHOLDER_DIM, PLACEHOLDER_GRAY)
        }
    }
}

/// Solid-color stand-in for a vector document.
pub fn synthesize_vector(markup: &str) -> DynamicImage {
    let (width, height) = vector::parse_dimensions(markup);
    let fill = vector::extract_fill(markup);
    solid(width, height, fill)
}

fn solid(width: u32, height: u32, color: [u8; 3]) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb(color)))
}
