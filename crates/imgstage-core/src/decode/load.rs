//! Loading images from the filesystem.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use image::{DynamicImage, ImageReader};
use tracing::debug;

use super::{DecodeError, ImageFormat, ImageMetadata};

/// Load an image file, detecting the format from its contents.
///
/// # Errors
///
/// Returns `DecodeError::NotFound` / `DecodeError::NotAFile` when the path is
/// unusable, `DecodeError::UnsupportedFormat` when the contents are not JPEG,
/// PNG or GIF, and `DecodeError::CorruptedFile` when decoding fails.
pub fn load_image(path: &Path) -> Result<(DynamicImage, ImageMetadata), DecodeError> {
    let file_meta = match std::fs::metadata(path) {
        Ok(meta) => meta,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(DecodeError::NotFound {
                path: path.to_path_buf(),
            })
        }
        Err(e) => return Err(DecodeError::IoError(e.to_string())),
    };
    if !file_meta.is_file() {
        return Err(DecodeError::NotAFile {
            path: path.to_path_buf(),
        });
    }

    // The extension is never consulted; only the content decides the format
    let file = File::open(path).map_err(|e| DecodeError::IoError(e.to_string()))?;
    let reader = ImageReader::new(BufReader::new(file))
        .with_guessed_format()
        .map_err(|e| DecodeError::IoError(e.to_string()))?;

    let format = reader
        .format()
        .and_then(ImageFormat::from_image_format)
        .ok_or_else(|| DecodeError::UnsupportedFormat {
            path: path.to_path_buf(),
        })?;

    let img = reader
        .decode()
        .map_err(|e| DecodeError::CorruptedFile(e.to_string()))?;

    if img.width() == 0 || img.height() == 0 {
        return Err(DecodeError::CorruptedFile(format!(
            "{} has zero dimensions",
            path.display()
        )));
    }

    let metadata = ImageMetadata::from_decoded(&img, format);
    debug!(
        path = %path.display(),
        format = ?format,
        width = metadata.width,
        height = metadata.height,
        "Loaded image"
    );
    Ok((img, metadata))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_fixture(dir: &Path, name: &str, format: image::ImageFormat) -> std::path::PathBuf {
        let img = image::RgbImage::from_fn(12, 8, |x, y| image::Rgb([(x * 20) as u8, (y * 30) as u8, 90]));
        let path = dir.join(name);
        let img = match format {
            image::ImageFormat::Gif => DynamicImage::ImageRgba8(DynamicImage::ImageRgb8(img).to_rgba8()),
            _ => DynamicImage::ImageRgb8(img),
        };
        img.save_with_format(&path, format).unwrap();
        path
    }

    #[test]
    fn test_load_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_fixture(dir.path(), "a.png", image::ImageFormat::Png);

        let (img, meta) = load_image(&path).unwrap();
        assert_eq!((img.width(), img.height()), (12, 8));
        assert_eq!(meta.format, ImageFormat::Png);
        assert_eq!(meta.mime, "image/png");
    }

    #[test]
    fn test_load_detects_format_from_contents() {
        let dir = tempfile::tempdir().unwrap();
        // JPEG bytes behind a misleading extension
        let path = write_fixture(dir.path(), "photo.jpg", image::ImageFormat::Jpeg);
        let renamed = dir.path().join("photo.png");
        std::fs::rename(&path, &renamed).unwrap();

        let (_, meta) = load_image(&renamed).unwrap();
        assert_eq!(meta.format, ImageFormat::Jpeg);
    }

    #[test]
    fn test_load_gif() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_fixture(dir.path(), "a.gif", image::ImageFormat::Gif);

        let (_, meta) = load_image(&path).unwrap();
        assert_eq!(meta.format, ImageFormat::Gif);
        assert_eq!((meta.width, meta.height), (12, 8));
    }

    #[test]
    fn test_load_missing_path() {
        let dir = tempfile::tempdir().unwrap();
        let result = load_image(&dir.path().join("nope.jpg"));
        assert!(matches!(result, Err(DecodeError::NotFound { .. })));
    }

    #[test]
    fn test_load_directory() {
        let dir = tempfile::tempdir().unwrap();
        let result = load_image(dir.path());
        assert!(matches!(result, Err(DecodeError::NotAFile { .. })));
    }

    #[test]
    fn test_load_not_an_image() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.jpg");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(b"just some text, not pixels").unwrap();

        let result = load_image(&path);
        assert!(matches!(result, Err(DecodeError::UnsupportedFormat { .. })));
    }

    #[test]
    fn test_load_text_with_image_extensions() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["notes.png", "notes.gif", "notes.jpeg"] {
            let path = dir.path().join(name);
            std::fs::write(&path, b"plain text").unwrap();
            let result = load_image(&path);
            assert!(
                matches!(result, Err(DecodeError::UnsupportedFormat { .. })),
                "{name}: {result:?}"
            );
        }
    }

    #[test]
    fn test_load_unsupported_format() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.bmp");
        // BMP magic is recognised by the guesser but not a stage format
        std::fs::write(&path, b"BM\x00\x00\x00\x00\x00\x00\x00\x00").unwrap();

        let result = load_image(&path);
        assert!(matches!(result, Err(DecodeError::UnsupportedFormat { .. })));
    }

    #[test]
    fn test_load_truncated_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_fixture(dir.path(), "a.png", image::ImageFormat::Png);
        let bytes = std::fs::read(&path).unwrap();
        std::fs::write(&path, &bytes[..bytes.len() / 2]).unwrap();

        let result = load_image(&path);
        assert!(matches!(result, Err(DecodeError::CorruptedFile(_))));
    }
}
