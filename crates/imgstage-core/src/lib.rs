//! imgstage core - load, resize, rotate and write raster images
//!
//! This crate wraps the `image` crate in a small stage object:
//!
//! - [`decode`] - loading JPEG, PNG and GIF files and their metadata
//! - [`transform`] - the resize modes (deform, fill, fit, width, height,
//!   max, long edge, scale) and rotation with background fill
//! - [`encode`] - JPEG/PNG/GIF encoding
//! - [`sink`] - HTTP-style response destinations
//! - [`StageImage`] - ties it together with chainable methods
//!
//! Codecs and resampling filters all come from the `image` crate; this crate
//! contributes the sizing arithmetic and the plumbing around it.

pub mod color;
pub mod config;
pub mod decode;
pub mod encode;
pub mod sink;
mod stage;
pub mod transform;

pub use color::Background;
pub use config::{ErrorReporting, StageConfig, DEFAULT_FILE_MODE};
pub use decode::{DecodeError, FilterType, ImageFormat, ImageMetadata};
pub use encode::{EncodeError, OutputFormat};
pub use sink::{BufferedResponse, ResponseSink, StreamResponse};
pub use stage::{Result, StageError, StageImage};
pub use transform::{
    compute_rotated_bounds, InterpolationFilter, Placement, ResizeMode, SourceRect, TransformError,
};
