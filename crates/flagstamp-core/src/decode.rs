//! Image decoding for base images and flag glyphs.
//!
//! Both the uploaded base image and the fetched flag images go through
//! [`decode_image`]. The format is sniffed from the bytes; anything the
//! `image` crate accepts with the enabled codecs (PNG, JPEG) is valid.

use std::io::Cursor;

use image::{ImageReader, RgbaImage};
use thiserror::Error;

/// Error types for image decoding operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// No bytes were supplied.
    #[error("Empty image data")]
    Empty,

    /// The file format is not recognized or supported.
    #[error("Invalid or unsupported image format: {0}")]
    InvalidFormat(String),

    /// The image file is corrupted or incomplete.
    #[error("Corrupted or incomplete image file: {0}")]
    CorruptedFile(String),
}

/// A decoded base image. Immutable while displayed.
#[derive(Debug, Clone)]
pub struct BaseImage {
    raster: RgbaImage,
}

impl BaseImage {
    /// Decode a base image from encoded bytes.
    pub fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
        decode_image(bytes).map(Self::from_rgba)
    }

    /// Wrap an already decoded raster.
    pub fn from_rgba(raster: RgbaImage) -> Self {
        Self { raster }
    }

    /// Intrinsic width W_i.
    pub fn width(&self) -> u32 {
        self.raster.width()
    }

    /// Intrinsic height H_i.
    pub fn height(&self) -> u32 {
        self.raster.height()
    }

    pub fn raster(&self) -> &RgbaImage {
        &self.raster
    }

    /// True for a zero-sized image.
    pub fn is_empty(&self) -> bool {
        self.raster.width() == 0 || self.raster.height() == 0
    }
}

/// Decode encoded image bytes into an 8-bit RGBA raster.
///
/// # Errors
///
/// Returns `DecodeError::Empty` for empty input,
/// `DecodeError::InvalidFormat` if the format cannot be determined, and
/// `DecodeError::CorruptedFile` if the decoder rejects the data.
pub fn decode_image(bytes: &[u8]) -> Result<RgbaImage, DecodeError> {
    if bytes.is_empty() {
        return Err(DecodeError::Empty);
    }

    let reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| DecodeError::CorruptedFile(e.to_string()))?;

    if reader.format().is_none() {
        return Err(DecodeError::InvalidFormat(
            "unrecognized image signature".to_string(),
        ));
    }

    let img = reader
        .decode()
        .map_err(|e| DecodeError::CorruptedFile(e.to_string()))?;

    Ok(img.into_rgba8())
}

#[cfg(test)]
pub(crate) mod test_support {
    use image::codecs::png::PngEncoder;
    use image::{ExtendedColorType, ImageEncoder, Rgba, RgbaImage};

    /// Solid-color RGBA image.
    pub fn solid(width: u32, height: u32, color: [u8; 4]) -> RgbaImage {
        RgbaImage::from_pixel(width, height, Rgba(color))
    }

    /// PNG bytes for a solid-color image.
    pub fn solid_png(width: u32, height: u32, color: [u8; 4]) -> Vec<u8> {
        let img = solid(width, height, color);
        let mut out = Vec::new();
        PngEncoder::new(&mut out)
            .write_image(img.as_raw(), width, height, ExtendedColorType::Rgba8)
            .unwrap();
        out
    }
}
