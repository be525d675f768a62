//! Solid background colours for letterboxing and rotation.
//!
//! Opacity is accepted either as a fraction (`0.0..=1.0`) or as a percentage
//! (anything above `1.0` is divided by 100). Internally it is reduced to a
//! 7-bit alpha where 0 is opaque and 127 fully transparent, the range raster
//! libraries traditionally use for palette alpha, and only then widened to
//! an 8-bit RGBA alpha for the canvas.

use image::Rgba;
use serde::{Deserialize, Serialize};

/// Largest 7-bit alpha value (fully transparent).
pub const MAX_ALPHA: u8 = 127;

/// An RGB colour with optional opacity.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Background {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
    /// Opacity as 0..=1 or 0..=100. `None` means fully opaque.
    #[serde(default)]
    pub opacity: Option<f32>,
}

impl Background {
    /// Opaque black, the default fill.
    pub const BLACK: Background = Background::rgb(0, 0, 0);

    pub const fn rgb(red: u8, green: u8, blue: u8) -> Self {
        Self {
            red,
            green,
            blue,
            opacity: None,
        }
    }

    pub const fn rgba(red: u8, green: u8, blue: u8, opacity: f32) -> Self {
        Self {
            red,
            green,
            blue,
            opacity: Some(opacity),
        }
    }

    /// Opacity normalised to `0.0..=1.0`.
    pub fn normalized_opacity(&self) -> f32 {
        match self.opacity {
            None => 1.0,
            Some(o) if o > 1.0 => o / 100.0,
            Some(o) => o,
        }
    }

    /// 7-bit alpha: 0 = opaque, 127 = transparent.
    pub fn alpha7(&self) -> u8 {
        let raw = (self.normalized_opacity() * -(MAX_ALPHA as f32) + MAX_ALPHA as f32).trunc();
        if raw.is_nan() {
            return 0;
        }
        raw.clamp(0.0, MAX_ALPHA as f32) as u8
    }

    /// Colour as an RGBA8 pixel (255 = opaque).
    pub fn to_rgba(&self) -> Rgba<u8> {
        let transparency = u32::from(self.alpha7());
        let alpha = 255 - (transparency * 255 / u32::from(MAX_ALPHA));
        Rgba([self.red, self.green, self.blue, alpha as u8])
    }
}
