//! The image stage: one decoded image, transformed in place, then written out.
//!
//! A [`StageImage`] exists only if its file loaded. Transforms mutate the
//! stage and hand back `&mut Self` so calls chain with `?`:
//!
//! ```ignore
//! StageImage::open("photo.jpg")?
//!     .resize_fit(400, 400, Background::BLACK)?
//!     .rotate_clockwise()?
//!     .save_png("thumb.png", 6)?;
//! ```
//!
//! A failed transform leaves the image as it was; the stage stays usable.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use image::DynamicImage;
use thiserror::Error;
use tracing::{debug, error};

use crate::color::Background;
use crate::config::{ErrorReporting, StageConfig};
use crate::decode::{load_image, DecodeError, ImageFormat, ImageMetadata};
use crate::encode::{encode_image, EncodeError, OutputFormat};
use crate::sink::ResponseSink;
use crate::transform::{apply_placement, apply_rotation, ResizeMode, TransformError};

/// Any failure a stage operation can report.
#[derive(Debug, Error)]
pub enum StageError {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Transform(#[from] TransformError),

    #[error(transparent)]
    Encode(#[from] EncodeError),
}

impl StageError {
    /// True for failures that prevent a stage from being created at all.
    pub fn is_construction_error(&self) -> bool {
        matches!(self, StageError::Decode(_))
    }
}

/// Result alias for stage operations.
pub type Result<T> = std::result::Result<T, StageError>;

/// A decoded image plus the metadata of the file it came from.
#[derive(Debug)]
pub struct StageImage {
    path: Option<PathBuf>,
    image: DynamicImage,
    metadata: ImageMetadata,
    config: StageConfig,
}

impl StageImage {
    /// Open `path` with the default configuration.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with(path, StageConfig::default())
    }

    /// Open `path` with an explicit configuration.
    ///
    /// # Errors
    ///
    /// Returns `StageError::Decode` when the path is missing, is not a file,
    /// or does not hold a decodable JPEG, PNG or GIF. The failure is logged
    /// according to `config.on_error`.
    pub fn open_with(path: impl AsRef<Path>, config: StageConfig) -> Result<Self> {
        let path = path.as_ref();
        match load_image(path) {
            Ok((image, metadata)) => Ok(Self {
                path: Some(path.to_path_buf()),
                image,
                metadata,
                config,
            }),
            Err(e) => {
                match config.on_error {
                    ErrorReporting::Report => error!(path = %path.display(), error = %e, "Failed to open image"),
                    ErrorReporting::Silent => debug!(path = %path.display(), error = %e, "Failed to open image"),
                }
                Err(e.into())
            }
        }
    }

    /// Wrap an already decoded image. `format` is recorded in the metadata.
    pub fn from_image(image: DynamicImage, format: ImageFormat, config: StageConfig) -> Result<Self> {
        if image.width() == 0 || image.height() == 0 {
            return Err(DecodeError::CorruptedFile("image has zero dimensions".to_string()).into());
        }
        let metadata = ImageMetadata::from_decoded(&image, format);
        Ok(Self {
            path: None,
            image,
            metadata,
            config,
        })
    }

    /// Metadata of the source as loaded; unaffected by transforms.
    pub fn metadata(&self) -> &ImageMetadata {
        &self.metadata
    }

    /// Source path, if the stage was opened from a file.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn config(&self) -> &StageConfig {
        &self.config
    }

    /// Current width of the in-memory image.
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    /// Current height of the in-memory image.
    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width(), self.height())
    }

    pub fn image(&self) -> &DynamicImage {
        &self.image
    }

    pub fn into_image(self) -> DynamicImage {
        self.image
    }

    /// Release the image now instead of at the end of scope.
    pub fn close(self) {
        debug!(path = ?self.path, "Closing stage");
    }

    // ------------------------------------------------------------------
    // Resizing
    // ------------------------------------------------------------------

    /// Resize with any [`ResizeMode`].
    ///
    /// # Errors
    ///
    /// Returns `StageError::Transform` for zero targets or oversized results;
    /// the image is left untouched.
    pub fn resize(&mut self, mode: ResizeMode) -> Result<&mut Self> {
        let (src_w, src_h) = self.dimensions();
        let placement = mode.placement(src_w, src_h)?;
        debug!(
            mode = mode.name(),
            from = ?(src_w, src_h),
            canvas = ?(placement.canvas_width, placement.canvas_height),
            scaled = ?(placement.scaled_width, placement.scaled_height),
            offset = ?(placement.x, placement.y),
            crop = ?placement.source_crop,
            "Resizing"
        );

        let canvas = apply_placement(&self.image, &placement, self.config.filter);
        self.image = DynamicImage::ImageRgba8(canvas);
        Ok(self)
    }

    /// Stretch to exactly `width x height`, ignoring the aspect ratio.
    pub fn resize_deform(&mut self, width: u32, height: u32) -> Result<&mut Self> {
        self.resize(ResizeMode::Deform { width, height })
    }

    /// Cover `width x height`, cropping whatever overflows.
    pub fn resize_fill(&mut self, width: u32, height: u32) -> Result<&mut Self> {
        self.resize(ResizeMode::Fill { width, height })
    }

    /// Fit inside `width x height` and letterbox with `background`.
    pub fn resize_fit(&mut self, width: u32, height: u32, background: Background) -> Result<&mut Self> {
        self.resize(ResizeMode::Fit {
            width,
            height,
            background,
        })
    }

    pub fn resize_width(&mut self, width: u32) -> Result<&mut Self> {
        self.resize(ResizeMode::Width { width })
    }

    pub fn resize_height(&mut self, height: u32) -> Result<&mut Self> {
        self.resize(ResizeMode::Height { height })
    }

    /// Scale to fit inside `width x height` without a letterbox.
    pub fn resize_max(&mut self, width: u32, height: u32) -> Result<&mut Self> {
        self.resize(ResizeMode::Max { width, height })
    }

    pub fn resize_long_edge(&mut self, length: u32) -> Result<&mut Self> {
        self.resize(ResizeMode::LongEdge { length })
    }

    pub fn resize_scale(&mut self, percent: f64) -> Result<&mut Self> {
        self.resize(ResizeMode::Scale { percent })
    }

    // ------------------------------------------------------------------
    // Rotation
    // ------------------------------------------------------------------

    /// Rotate clockwise by `angle` degrees, growing the canvas to the rotated
    /// bounding box and painting the exposed corners with `background`.
    pub fn rotate(&mut self, angle: f64, background: Background) -> Result<&mut Self> {
        if !angle.is_finite() {
            return Err(TransformError::InvalidParameters(format!("rotation angle must be finite, got {angle}")).into());
        }
        debug!(angle, from = ?self.dimensions(), "Rotating");

        let source = self.image.to_rgba8();
        // The rotation primitive is counter-clockwise positive
        let rotated = apply_rotation(&source, -angle, background.to_rgba(), self.config.rotation_filter);
        self.image = DynamicImage::ImageRgba8(rotated);
        Ok(self)
    }

    pub fn rotate_clockwise(&mut self) -> Result<&mut Self> {
        self.rotate(90.0, Background::BLACK)
    }

    pub fn rotate_counter_clockwise(&mut self) -> Result<&mut Self> {
        self.rotate(-90.0, Background::BLACK)
    }

    /// Alias for [`rotate_clockwise`](Self::rotate_clockwise).
    pub fn rotate_right(&mut self) -> Result<&mut Self> {
        self.rotate_clockwise()
    }

    /// Alias for [`rotate_counter_clockwise`](Self::rotate_counter_clockwise).
    pub fn rotate_left(&mut self) -> Result<&mut Self> {
        self.rotate_counter_clockwise()
    }

    /// Alias for [`rotate_clockwise`](Self::rotate_clockwise).
    pub fn rotate_cw(&mut self) -> Result<&mut Self> {
        self.rotate_clockwise()
    }

    /// Alias for [`rotate_counter_clockwise`](Self::rotate_counter_clockwise).
    pub fn rotate_ccw(&mut self) -> Result<&mut Self> {
        self.rotate_counter_clockwise()
    }

    // ------------------------------------------------------------------
    // Output
    // ------------------------------------------------------------------

    /// Encode the current image.
    pub fn encode(&self, format: OutputFormat) -> Result<Vec<u8>> {
        Ok(encode_image(&self.image, format)?)
    }

    /// Encode and hand the result to `sink` with its `Content-Type`.
    ///
    /// Nothing reaches the sink if encoding fails.
    pub fn output<S: ResponseSink + ?Sized>(&self, format: OutputFormat, sink: &mut S) -> Result<&Self> {
        let body = self.encode(format)?;
        debug!(mime = format.mime_type(), bytes = body.len(), "Sending image");
        sink.send(format.mime_type(), &body).map_err(EncodeError::Sink)?;
        Ok(self)
    }

    pub fn output_jpeg<S: ResponseSink + ?Sized>(&self, quality: u8, sink: &mut S) -> Result<&Self> {
        self.output(OutputFormat::Jpeg { quality }, sink)
    }

    pub fn output_png<S: ResponseSink + ?Sized>(&self, compression: u8, sink: &mut S) -> Result<&Self> {
        self.output(OutputFormat::Png { compression }, sink)
    }

    pub fn output_gif<S: ResponseSink + ?Sized>(&self, sink: &mut S) -> Result<&Self> {
        self.output(OutputFormat::Gif, sink)
    }

    /// Encode to `path`, then apply the configured file mode.
    ///
    /// # Errors
    ///
    /// Returns `StageError::Encode` when encoding, writing or the permission
    /// change fails. Nothing is retried.
    pub fn save(&self, path: impl AsRef<Path>, format: OutputFormat) -> Result<&Self> {
        let path = path.as_ref();
        let body = self.encode(format)?;

        fs::write(path, &body).map_err(|source| EncodeError::Write {
            path: path.to_path_buf(),
            source,
        })?;
        set_file_mode(path, self.config.file_mode).map_err(|source| EncodeError::Permissions {
            path: path.to_path_buf(),
            source,
        })?;

        debug!(
            path = %path.display(),
            mime = format.mime_type(),
            bytes = body.len(),
            mode = %format!("{:o}", self.config.file_mode),
            "Saved image"
        );
        Ok(self)
    }

    pub fn save_jpeg(&self, path: impl AsRef<Path>, quality: u8) -> Result<&Self> {
        self.save(path, OutputFormat::Jpeg { quality })
    }

    pub fn save_png(&self, path: impl AsRef<Path>, compression: u8) -> Result<&Self> {
        self.save(path, OutputFormat::Png { compression })
    }

    pub fn save_gif(&self, path: impl AsRef<Path>) -> Result<&Self> {
        self.save(path, OutputFormat::Gif)
    }
}

#[cfg(unix)]
fn set_file_mode(path: &Path, mode: u32) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(mode))
}

#[cfg(not(unix))]
fn set_file_mode(_path: &Path, _mode: u32) -> io::Result<()> {
    Ok(())
}
