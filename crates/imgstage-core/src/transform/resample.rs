//! Draw a scaled source onto a fresh canvas according to a [`Placement`].
//!
//! Resampling itself is done by the `image` crate's algorithms. Functions
//! here return new buffers and never modify the input.

use image::{imageops, DynamicImage, Rgba, RgbaImage};

use super::sizing::Placement;
use crate::decode::FilterType;

/// Fill of a freshly allocated truecolor canvas.
const BLANK: Rgba<u8> = Rgba([0, 0, 0, 255]);

/// Resize `image` into a new canvas described by `placement`.
///
/// With a `source_crop`, only that part of the source is read and it is
/// resized straight to the canvas. Otherwise the whole source is scaled to
/// `scaled_width x scaled_height` and drawn at `(x, y)`. When the scaled
/// source covers the canvas, its pixels (alpha included) replace the canvas;
/// otherwise it is alpha-blended over the placement background.
pub fn apply_placement(image: &DynamicImage, placement: &Placement, filter: FilterType) -> RgbaImage {
    if let Some(crop) = placement.source_crop {
        let visible = image.crop_imm(crop.x, crop.y, crop.width, crop.height).to_rgba8();
        return resize_rgba(&visible, placement.canvas_width, placement.canvas_height, filter);
    }

    let source = image.to_rgba8();

    // Fast path: nothing to resample or move
    if placement.covers_canvas()
        && placement.x == 0
        && placement.y == 0
        && source.dimensions() == (placement.canvas_width, placement.canvas_height)
        && source.dimensions() == (placement.scaled_width, placement.scaled_height)
    {
        return source;
    }

    let scaled = resize_rgba(&source, placement.scaled_width, placement.scaled_height, filter);

    let fill = placement.background.map(|bg| bg.to_rgba()).unwrap_or(BLANK);
    let mut canvas = RgbaImage::from_pixel(placement.canvas_width, placement.canvas_height, fill);

    if placement.covers_canvas() {
        imageops::replace(&mut canvas, &scaled, placement.x, placement.y);
    } else {
        imageops::overlay(&mut canvas, &scaled, placement.x, placement.y);
    }
    canvas
}

/// Resize an RGBA buffer to exact dimensions.
///
/// Returns a clone when the dimensions already match.
pub fn resize_rgba(image: &RgbaImage, width: u32, height: u32, filter: FilterType) -> RgbaImage {
    if image.dimensions() == (width, height) {
        return image.clone();
    }
    imageops::resize(image, width, height, filter.to_image_filter())
}
