//! Image decoding.
//!
//! Accepts raw image bytes (PNG, JPEG, BMP, WebP) and produces the RGBA
//! buffer the cutter copies piece pixels from.

use image::RgbaImage;

use crate::types::PuzzleError;

/// Decode raw image bytes into an RGBA buffer.
///
/// # Errors
///
/// Returns [`PuzzleError::EmptyInput`] if `bytes` is empty,
/// [`PuzzleError::ImageDecode`] if the format is unrecognized or the data
/// is corrupt, and [`PuzzleError::EmptyImage`] if it decodes to zero
/// pixels.
#[must_use = "returns the decoded image"]
pub fn decode_rgba(bytes: &[u8]) -> Result<RgbaImage, PuzzleError> {
    if bytes.is_empty() {
        return Err(PuzzleError::EmptyInput);
    }

    let img = image::load_from_memory(bytes)?.to_rgba8();
    if img.width() == 0 || img.height() == 0 {
        return Err(PuzzleError::EmptyImage {
            width: img.width(),
            height: img.height(),
        });
    }
    Ok(img)
}
