//! Image encoding for output and persistence.
//!
//! This module provides functionality for:
//! - Encoding to JPEG with configurable quality
//! - Encoding to PNG with configurable compression, keeping alpha
//! - Encoding to GIF
//!
//! Encoding always produces the complete byte buffer before anything is sent
//! or written, so a failed encode has no side effect.
//!
//! # Examples
//!
//! ```ignore
//! use imgstage_core::encode::{encode_image, OutputFormat};
//!
//! let bytes = encode_image(&image, OutputFormat::Jpeg { quality: 90 }).unwrap();
//! println!("Encoded {} bytes", bytes.len());
//! ```

mod codec;

pub use codec::{
    encode_image, EncodeError, OutputFormat, DEFAULT_JPEG_QUALITY, DEFAULT_PNG_COMPRESSION,
};
