//! Aspect-ratio arithmetic for the resize modes.
//!
//! Every mode reduces to a [`Placement`]: the size of the new canvas, the
//! size the whole source is scaled to, and where that scaled source lands on
//! the canvas. Offsets can be negative, in which case the canvas bounds crop
//! the overflow.
//!
//! All values are rounded to whole pixels here so the resampler only ever
//! sees integers.

use serde::{Deserialize, Serialize};

use super::TransformError;
use crate::color::Background;

/// Largest canvas edge a resize may produce.
pub const MAX_DIMENSION: u32 = 65_535;

/// Where and how large the scaled source is drawn on a new canvas.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub canvas_width: u32,
    pub canvas_height: u32,
    pub x: i64,
    pub y: i64,
    pub scaled_width: u32,
    pub scaled_height: u32,
    /// Fill for canvas area the source does not cover.
    pub background: Option<Background>,
    /// Part of the source that ends up visible, when the scaled source
    /// overflows the canvas. It is resized straight to the canvas size.
    pub source_crop: Option<SourceRect>,
}

/// A rectangle in source pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Placement {
    /// Placement where the scaled source exactly covers the canvas.
    fn exact(width: u32, height: u32) -> Self {
        Self {
            canvas_width: width,
            canvas_height: height,
            x: 0,
            y: 0,
            scaled_width: width,
            scaled_height: height,
            background: None,
            source_crop: None,
        }
    }

    /// True when no canvas pixel is left uncovered by the source.
    pub fn covers_canvas(&self) -> bool {
        self.x <= 0
            && self.y <= 0
            && self.x + i64::from(self.scaled_width) >= i64::from(self.canvas_width)
            && self.y + i64::from(self.scaled_height) >= i64::from(self.canvas_height)
    }
}

/// The supported resize modes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "kebab-case")]
pub enum ResizeMode {
    /// Stretch to exactly `width x height`.
    Deform { width: u32, height: u32 },
    /// Cover `width x height`, cropping the overflow.
    Fill { width: u32, height: u32 },
    /// Fit inside `width x height`, letterboxing with `background`.
    Fit {
        width: u32,
        height: u32,
        #[serde(default)]
        background: Background,
    },
    /// Set the width, derive the height.
    Width { width: u32 },
    /// Set the height, derive the width.
    Height { height: u32 },
    /// Shrink or grow to fit inside `width x height`, without letterboxing.
    Max { width: u32, height: u32 },
    /// Set the longer edge to `length`.
    LongEdge { length: u32 },
    /// Multiply both edges by `percent / 100`.
    Scale { percent: f64 },
}

impl ResizeMode {
    /// Compute the placement of a `src_width x src_height` source for this mode.
    pub fn placement(&self, src_width: u32, src_height: u32) -> Result<Placement, TransformError> {
        match *self {
            ResizeMode::Deform { width, height } => deform(src_width, src_height, width, height),
            ResizeMode::Fill { width, height } => fill(src_width, src_height, width, height),
            ResizeMode::Fit {
                width,
                height,
                background,
            } => fit(src_width, src_height, width, height, background),
            ResizeMode::Width { width } => to_width(src_width, src_height, width),
            ResizeMode::Height { height } => to_height(src_width, src_height, height),
            ResizeMode::Max { width, height } => max(src_width, src_height, width, height),
            ResizeMode::LongEdge { length } => long_edge(src_width, src_height, length),
            ResizeMode::Scale { percent } => scale(src_width, src_height, percent),
        }
    }

    /// Short name used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            ResizeMode::Deform { .. } => "deform",
            ResizeMode::Fill { .. } => "fill",
            ResizeMode::Fit { .. } => "fit",
            ResizeMode::Width { .. } => "width",
            ResizeMode::Height { .. } => "height",
            ResizeMode::Max { .. } => "max",
            ResizeMode::LongEdge { .. } => "long-edge",
            ResizeMode::Scale { .. } => "scale",
        }
    }
}

/// Stretch the source to exactly `width x height`.
pub fn deform(src_width: u32, src_height: u32, width: u32, height: u32) -> Result<Placement, TransformError> {
    check_source(src_width, src_height)?;
    check_target("width", width)?;
    check_target("height", height)?;
    Ok(Placement::exact(width, height))
}

/// Cover `width x height` completely; the overflowing axis is centred and cropped.
///
/// Only the canvas is bounded by [`MAX_DIMENSION`]. The scaled source may be
/// far larger; the returned `source_crop` names the part that stays visible.
pub fn fill(src_width: u32, src_height: u32, width: u32, height: u32) -> Result<Placement, TransformError> {
    check_source(src_width, src_height)?;
    check_target("width", width)?;
    check_target("height", height)?;

    let ratio = (width as f64 / src_width as f64).max(height as f64 / src_height as f64);
    let exact_w = src_width as f64 * ratio;
    let exact_h = src_height as f64 * ratio;

    let crop_width = visible_span(width, ratio, src_width);
    let crop_height = visible_span(height, ratio, src_height);

    Ok(Placement {
        canvas_width: width,
        canvas_height: height,
        x: ((width as f64 - exact_w) / 2.0).round() as i64,
        y: ((height as f64 - exact_h) / 2.0).round() as i64,
        scaled_width: saturating_dim(exact_w),
        scaled_height: saturating_dim(exact_h),
        background: None,
        source_crop: Some(SourceRect {
            x: (src_width - crop_width) / 2,
            y: (src_height - crop_height) / 2,
            width: crop_width,
            height: crop_height,
        }),
    })
}

/// Source pixels covered by `canvas` canvas pixels at `ratio`, within `1..=src`.
fn visible_span(canvas: u32, ratio: f64, src: u32) -> u32 {
    let span = (canvas as f64 / ratio).round();
    if span.is_nan() {
        return src;
    }
    span.clamp(1.0, src as f64) as u32
}

fn saturating_dim(value: f64) -> u32 {
    value.round().clamp(1.0, u32::MAX as f64) as u32
}

/// Fit inside `width x height`; uncovered canvas is filled with `background`.
pub fn fit(
    src_width: u32,
    src_height: u32,
    width: u32,
    height: u32,
    background: Background,
) -> Result<Placement, TransformError> {
    check_source(src_width, src_height)?;
    check_target("width", width)?;
    check_target("height", height)?;

    let ratio = (width as f64 / src_width as f64).min(height as f64 / src_height as f64);
    centered(src_width, src_height, width, height, ratio, Some(background))
}

/// Scale to `width`, keeping the aspect ratio.
pub fn to_width(src_width: u32, src_height: u32, width: u32) -> Result<Placement, TransformError> {
    check_source(src_width, src_height)?;
    check_target("width", width)?;
    let height = round_dim(width as f64 * src_height as f64 / src_width as f64)?;
    Ok(Placement::exact(width, height))
}

/// Scale to `height`, keeping the aspect ratio.
pub fn to_height(src_width: u32, src_height: u32, height: u32) -> Result<Placement, TransformError> {
    check_source(src_width, src_height)?;
    check_target("height", height)?;
    let width = round_dim(height as f64 * src_width as f64 / src_height as f64)?;
    Ok(Placement::exact(width, height))
}

/// Scale to fit inside `width x height`; the canvas is the scaled size itself.
pub fn max(src_width: u32, src_height: u32, width: u32, height: u32) -> Result<Placement, TransformError> {
    check_source(src_width, src_height)?;
    check_target("width", width)?;
    check_target("height", height)?;

    let ratio = (width as f64 / src_width as f64).min(height as f64 / src_height as f64);
    scaled_exact(src_width, src_height, ratio)
}

/// Scale so the longer edge equals `length`.
pub fn long_edge(src_width: u32, src_height: u32, length: u32) -> Result<Placement, TransformError> {
    check_source(src_width, src_height)?;
    check_target("length", length)?;

    let edge = if src_width > src_height { src_width } else { src_height };
    scaled_exact(src_width, src_height, length as f64 / edge as f64)
}

/// Scale both edges by `percent / 100`.
pub fn scale(src_width: u32, src_height: u32, percent: f64) -> Result<Placement, TransformError> {
    check_source(src_width, src_height)?;
    if !percent.is_finite() || percent <= 0.0 {
        return Err(TransformError::InvalidParameters(format!(
            "scale percent must be a positive number, got {percent}"
        )));
    }
    scaled_exact(src_width, src_height, percent / 100.0)
}

fn scaled_exact(src_width: u32, src_height: u32, ratio: f64) -> Result<Placement, TransformError> {
    let width = round_dim(src_width as f64 * ratio)?;
    let height = round_dim(src_height as f64 * ratio)?;
    Ok(Placement::exact(width, height))
}

fn centered(
    src_width: u32,
    src_height: u32,
    canvas_width: u32,
    canvas_height: u32,
    ratio: f64,
    background: Option<Background>,
) -> Result<Placement, TransformError> {
    let exact_w = src_width as f64 * ratio;
    let exact_h = src_height as f64 * ratio;

    Ok(Placement {
        canvas_width,
        canvas_height,
        x: ((canvas_width as f64 - exact_w) / 2.0).round() as i64,
        y: ((canvas_height as f64 - exact_h) / 2.0).round() as i64,
        scaled_width: round_dim(exact_w)?,
        scaled_height: round_dim(exact_h)?,
        background,
        source_crop: None,
    })
}

/// Round to a whole pixel, never below one.
fn round_dim(value: f64) -> Result<u32, TransformError> {
    let rounded = value.round().max(1.0);
    if !rounded.is_finite() || rounded > MAX_DIMENSION as f64 {
        return Err(TransformError::InvalidParameters(format!(
            "resulting dimension {value:.1} exceeds {MAX_DIMENSION} pixels"
        )));
    }
    Ok(rounded as u32)
}

fn check_source(width: u32, height: u32) -> Result<(), TransformError> {
    if width == 0 || height == 0 {
        return Err(TransformError::InvalidParameters(format!(
            "source image has zero dimensions ({width}x{height})"
        )));
    }
    Ok(())
}

fn check_target(name: &str, value: u32) -> Result<(), TransformError> {
    if value == 0 {
        return Err(TransformError::InvalidParameters(format!("{name} must be non-zero")));
    }
    if value > MAX_DIMENSION {
        return Err(TransformError::InvalidParameters(format!(
            "{name} {value} exceeds {MAX_DIMENSION} pixels"
        )));
    }
    Ok(())
}


// ============================================================================
// Property-Based Tests
// ============================================================================
