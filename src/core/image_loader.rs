//! Image file decoding.

use std::path::Path;

use image::RgbImage;

use super::encoder::EncoderError;

/// Read an image file and convert it to 8-bit RGB.
///
/// The format is guessed from the file content, not the extension, so a
/// frame grabbed to `frame.tmp` still decodes.
pub fn load_rgb(path: &Path) -> Result<RgbImage, EncoderError> {
    let bytes = std::fs::read(path).map_err(|source| EncoderError::ImageRead {
        path: path.to_path_buf(),
        source,
    })?;

    let image = image::load_from_memory(&bytes).map_err(|source| EncoderError::ImageDecode {
        path: path.to_path_buf(),
        source,
    })?;

    tracing::debug!(
        path = %path.display(),
        width = image.width(),
        height = image.height(),
        "decoded image"
    );

    Ok(image.to_rgb8())
}
