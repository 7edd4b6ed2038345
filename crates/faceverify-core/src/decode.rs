//! Image decoding for uploaded and stored photos.

use std::io::Cursor;

use image::{ImageReader, RgbImage};
use thiserror::Error;

/// Largest accepted edge, in pixels. Bigger photos are rejected before inference.
const MAX_IMAGE_EDGE: u32 = 8192;

#[derive(Error, Debug)]
pub enum ImageError {
    #[error("empty image data")]
    Empty,
    #[error("unsupported or corrupt image: {0}")]
    Decode(#[from] image::ImageError),
    #[error("image too large: {width}x{height}")]
    TooLarge { width: u32, height: u32 },
}

/// Decode encoded image bytes (JPEG, PNG, WebP, BMP, ...) into an RGB buffer.
///
/// The format is sniffed from the content, never from a file name. Dimensions
/// are read from the header first, so oversized images are rejected before
/// any pixel buffer is allocated.
pub fn decode_image(bytes: &[u8]) -> Result<RgbImage, ImageError> {
    if bytes.is_empty() {
        return Err(ImageError::Empty);
    }
    let (width, height) = reader(bytes)?.into_dimensions()?;
    if width > MAX_IMAGE_EDGE || height > MAX_IMAGE_EDGE {
        return Err(ImageError::TooLarge { width, height });
    }
    let decoded = reader(bytes)?.decode()?;
    tracing::debug!(width, height, "decoded image");
    Ok(decoded.to_rgb8())
}

fn reader(bytes: &[u8]) -> Result<ImageReader<Cursor<&[u8]>>, ImageError> {
    ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| ImageError::Decode(image::ImageError::IoError(e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgb};

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = RgbImage::from_pixel(width, height, Rgb([10, 20, 30]));
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, ImageFormat::Png).unwrap();
        out.into_inner()
    }

    #[test]
    fn test_decode_png() {
        let rgb = decode_image(&png_bytes(4, 3)).unwrap();
        assert_eq!(rgb.dimensions(), (4, 3));
        assert_eq!(rgb.get_pixel(0, 0), &Rgb([10, 20, 30]));
    }

    #[test]
    fn test_decode_rejects_oversized_edge() {
        let bytes = png_bytes(MAX_IMAGE_EDGE + 1, 1);
        assert!(matches!(
            decode_image(&bytes),
            Err(ImageError::TooLarge { width, height: 1 }) if width == MAX_IMAGE_EDGE + 1
        ));
        assert!(decode_image(&png_bytes(MAX_IMAGE_EDGE, 1)).is_ok());
    }

    #[test]
    fn test_decode_empty() {
        assert!(matches!(decode_image(&[]), Err(ImageError::Empty)));
    }

    #[test]
    fn test_decode_garbage() {
        assert!(matches!(
            decode_image(b"definitely not an image"),
            Err(ImageError::Decode(_))
        ));
    }
}
