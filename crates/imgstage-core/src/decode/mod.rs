//! Image loading for imgstage.
//!
//! This module provides functionality for:
//! - Loading JPEG, PNG and GIF files from disk
//! - Detecting the format from file contents
//! - Capturing an immutable metadata snapshot at load time
//!
//! All operations are synchronous and single-threaded.
//!
//! # Examples
//!
//! ```ignore
//! use imgstage_core::decode::load_image;
//!
//! let (image, meta) = load_image(Path::new("photo.jpg")).unwrap();
//! println!("Loaded {}x{} {}", meta.width, meta.height, meta.mime);
//! ```

mod load;
mod types;

pub use load::load_image;
pub use types::{DecodeError, FilterType, ImageFormat, ImageMetadata};
