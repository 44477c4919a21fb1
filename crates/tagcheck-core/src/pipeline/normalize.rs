//! Re-encoding images the vision APIs cannot accept directly.

use image::{DynamicImage, Rgb, RgbImage};
use std::path::Path;

use crate::error::PipelineError;

/// JPEG quality used for converted images.
pub const JPEG_QUALITY: u8 = 95;

/// Decode `bytes` with any format the `image` crate understands and
/// re-encode as JPEG. Transparent pixels are composited onto white.
///
/// CPU-bound; call from `spawn_blocking` in async contexts.
pub fn to_jpeg_bytes(bytes: &[u8], path: &Path) -> Result<Vec<u8>, PipelineError> {
    let image = image::load_from_memory(bytes).map_err(|e| PipelineError::Decode {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    let rgb = flatten_on_white(&image);

    let mut out = Vec::with_capacity(bytes.len());
    let mut encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut out, JPEG_QUALITY);
    encoder
        .encode_image(&rgb)
        .map_err(|e| PipelineError::Decode {
            path: path.to_path_buf(),
            message: format!("JPEG encode failed: {e}"),
        })?;
    Ok(out)
}

/// Drop the alpha channel by blending over a white background.
fn flatten_on_white(image: &DynamicImage) -> RgbImage {
    if !image.color().has_alpha() {
        return image.to_rgb8();
    }

    let rgba = image.to_rgba8();
    RgbImage::from_fn(rgba.width(), rgba.height(), |x, y| {
        let [r, g, b, a] = rgba.get_pixel(x, y).0;
        let alpha = a as u32;
        let blend = |c: u8| ((c as u32 * alpha + 255 * (255 - alpha)) / 255) as u8;
        Rgb([blend(r), blend(g), blend(b)])
    })
}
