//! Geometric transforms: resize modes and rotation.
//!
//! # Resizing
//!
//! Resizing is split in two steps. [`sizing`] turns a [`ResizeMode`] and the
//! current source size into a [`Placement`] (pure arithmetic), and
//! [`apply_placement`] hands that placement to the `image` crate's resampler
//! and composites the result onto a new canvas.
//!
//! # Coordinate System
//!
//! - Origin is the top-left corner, y points down
//! - Placement offsets may be negative (the canvas crops the overflow)
//! - Rotation angles in this module are positive = counter-clockwise

use thiserror::Error;

mod resample;
mod rotation;
pub mod sizing;

pub use resample::{apply_placement, resize_rgba};
pub use rotation::{apply_rotation, compute_rotated_bounds, InterpolationFilter};
pub use sizing::{Placement, ResizeMode, SourceRect};

/// Errors raised by a single transform call.
#[derive(Debug, Error)]
pub enum TransformError {
    /// Zero/negative target dimensions, a zero source dimension, or a result
    /// too large to allocate.
    #[error("Invalid transform parameters: {0}")]
    InvalidParameters(String),
}
