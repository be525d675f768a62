//! JPEG, PNG and GIF encoding.
//!
//! Encoders come from the `image` crate. JPEG has no alpha channel so the
//! image is flattened to RGB first; PNG and GIF keep RGBA.

use std::io::Cursor;

use image::codecs::gif::GifEncoder;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType as PngFilter, PngEncoder};
use image::{DynamicImage, ExtendedColorType, ImageEncoder};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::decode::ImageFormat;

/// Default JPEG quality.
pub const DEFAULT_JPEG_QUALITY: u8 = 100;
/// Default PNG compression level.
pub const DEFAULT_PNG_COMPRESSION: u8 = 0;

/// Errors that can occur while encoding or persisting an image.
#[derive(Debug, Error)]
pub enum EncodeError {
    /// Width or height is zero
    #[error("Invalid dimensions: width ({width}) and height ({height}) must be non-zero")]
    InvalidDimensions { width: u32, height: u32 },

    /// The codec rejected the buffer
    #[error("{format:?} encoding failed: {reason}")]
    EncodingFailed { format: ImageFormat, reason: String },

    /// Writing the encoded file failed
    #[error("Failed to write `{}`: {source}", path.display())]
    Write {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Changing the file mode after writing failed
    #[error("Failed to set permissions on `{}`: {source}", path.display())]
    Permissions {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The response sink failed to accept the body
    #[error("Failed to send response: {0}")]
    Sink(#[source] std::io::Error),
}

/// Output encoding and its settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "format", rename_all = "lowercase")]
pub enum OutputFormat {
    /// JPEG with quality 0-100 (clamped to the encoder's 1-100).
    Jpeg { quality: u8 },
    /// PNG with compression level 0-9. Alpha is preserved.
    Png { compression: u8 },
    /// GIF.
    Gif,
}

impl OutputFormat {
    /// Format with default settings.
    pub fn default_for(format: ImageFormat) -> Self {
        match format {
            ImageFormat::Jpeg => OutputFormat::Jpeg {
                quality: DEFAULT_JPEG_QUALITY,
            },
            ImageFormat::Png => OutputFormat::Png {
                compression: DEFAULT_PNG_COMPRESSION,
            },
            ImageFormat::Gif => OutputFormat::Gif,
        }
    }

    pub fn image_format(self) -> ImageFormat {
        match self {
            OutputFormat::Jpeg { .. } => ImageFormat::Jpeg,
            OutputFormat::Png { .. } => ImageFormat::Png,
            OutputFormat::Gif => ImageFormat::Gif,
        }
    }

    /// `Content-Type` of the encoded bytes.
    pub fn mime_type(self) -> &'static str {
        self.image_format().mime_type()
    }
}

/// Map a 0-9 compression level onto the PNG encoder's presets.
fn png_compression(level: u8) -> CompressionType {
    match level {
        0..=3 => CompressionType::Fast,
        4..=6 => CompressionType::Default,
        _ => CompressionType::Best,
    }
}

/// Encode an image to bytes in the requested format.
///
/// # Errors
///
/// Returns `EncodeError::InvalidDimensions` for an empty image and
/// `EncodeError::EncodingFailed` when the codec rejects the data.
pub fn encode_image(image: &DynamicImage, format: OutputFormat) -> Result<Vec<u8>, EncodeError> {
    let (width, height) = (image.width(), image.height());
    if width == 0 || height == 0 {
        return Err(EncodeError::InvalidDimensions { width, height });
    }

    let failed = |e: image::ImageError| EncodeError::EncodingFailed {
        format: format.image_format(),
        reason: e.to_string(),
    };

    let mut buffer = Cursor::new(Vec::new());

    match format {
        OutputFormat::Jpeg { quality } => {
            let rgb = image.to_rgb8();
            JpegEncoder::new_with_quality(&mut buffer, quality.clamp(1, 100))
                .write_image(rgb.as_raw(), width, height, ExtendedColorType::Rgb8)
                .map_err(failed)?;
        }
        OutputFormat::Png { compression } => {
            let rgba = image.to_rgba8();
            PngEncoder::new_with_quality(&mut buffer, png_compression(compression), PngFilter::Adaptive)
                .write_image(rgba.as_raw(), width, height, ExtendedColorType::Rgba8)
                .map_err(failed)?;
        }
        OutputFormat::Gif => {
            let rgba = image.to_rgba8();
            let mut encoder = GifEncoder::new(&mut buffer);
            encoder
                .encode(rgba.as_raw(), width, height, ExtendedColorType::Rgba8)
                .map_err(failed)?;
        }
    }

    Ok(buffer.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    fn gradient(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgba8(RgbaImage::from_fn(width, height, |x, y| {
            Rgba([
                (x * 255 / width) as u8,
                (y * 255 / height) as u8,
                128,
                255,
            ])
        }))
    }

    #[test]
    fn test_encode_jpeg_basic() {
        let jpeg_bytes = encode_image(&gradient(100, 100), OutputFormat::Jpeg { quality: 90 }).unwrap();

        // SOI and EOI markers
        assert_eq!(&jpeg_bytes[0..2], &[0xFF, 0xD8]);
        let len = jpeg_bytes.len();
        assert_eq!(&jpeg_bytes[len - 2..], &[0xFF, 0xD9]);
    }

    #[test]
    fn test_encode_jpeg_quality_zero_is_clamped() {
        let result = encode_image(&gradient(10, 10), OutputFormat::Jpeg { quality: 0 });
        assert!(result.is_ok());
    }

    #[test]
    fn test_encode_jpeg_quality_affects_size() {
        let img = gradient(64, 64);
        let low_q = encode_image(&img, OutputFormat::Jpeg { quality: 10 }).unwrap();
        let high_q = encode_image(&img, OutputFormat::Jpeg { quality: 100 }).unwrap();
        assert!(high_q.len() > low_q.len());
    }

    #[test]
    fn test_encode_png_preserves_alpha() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(8, 8, Rgba([1, 2, 3, 40])));
        let png = encode_image(&img, OutputFormat::Png { compression: 9 }).unwrap();

        assert_eq!(&png[0..8], b"\x89PNG\r\n\x1a\n");
        let decoded = image::load_from_memory(&png).unwrap().to_rgba8();
        assert_eq!(*decoded.get_pixel(4, 4), Rgba([1, 2, 3, 40]));
    }

    #[test]
    fn test_encode_png_all_levels() {
        let img = gradient(16, 16);
        for compression in 0..=9 {
            let png = encode_image(&img, OutputFormat::Png { compression }).unwrap();
            let decoded = image::load_from_memory(&png).unwrap();
            assert_eq!(decoded.to_rgba8(), img.to_rgba8());
        }
    }

    #[test]
    fn test_encode_gif() {
        let gif = encode_image(&gradient(20, 10), OutputFormat::Gif).unwrap();
        assert_eq!(&gif[0..3], b"GIF");

        let decoded = image::load_from_memory(&gif).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (20, 10));
    }

    #[test]
    fn test_encode_rgb_source_as_png() {
        let img = DynamicImage::new_rgb8(5, 5);
        let png = encode_image(&img, OutputFormat::Png { compression: 0 }).unwrap();
        let decoded = image::load_from_memory(&png).unwrap().to_rgba8();
        assert_eq!(*decoded.get_pixel(0, 0), Rgba([0, 0, 0, 255]));
    }

    #[test]
    fn test_encode_zero_dimensions() {
        let img = DynamicImage::new_rgba8(0, 10);
        let result = encode_image(&img, OutputFormat::Gif);
        assert!(matches!(result, Err(EncodeError::InvalidDimensions { .. })));
    }

    #[test]
    fn test_output_format_mime() {
        assert_eq!(OutputFormat::Jpeg { quality: 1 }.mime_type(), "image/jpeg");
        assert_eq!(OutputFormat::Png { compression: 1 }.mime_type(), "image/png");
        assert_eq!(OutputFormat::Gif.mime_type(), "image/gif");
    }

    #[test]
    fn test_default_for() {
        assert_eq!(
            OutputFormat::default_for(ImageFormat::Jpeg),
            OutputFormat::Jpeg { quality: 100 }
        );
        assert_eq!(
            OutputFormat::default_for(ImageFormat::Png),
            OutputFormat::Png { compression: 0 }
        );
        assert_eq!(OutputFormat::default_for(ImageFormat::Gif), OutputFormat::Gif);
    }

    #[test]
    fn test_png_compression_mapping() {
        assert!(matches!(png_compression(0), CompressionType::Fast));
        assert!(matches!(png_compression(5), CompressionType::Default));
        assert!(matches!(png_compression(9), CompressionType::Best));
        assert!(matches!(png_compression(200), CompressionType::Best));
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================
