//! Image rotation with background fill.
//!
//! Angles here follow the raster-library convention: positive means
//! counter-clockwise. Exact quarter turns are lossless pixel permutations;
//! every other angle uses inverse mapping with one of two filters:
//! - **Bilinear**: fast, fine for previews and thumbnails
//! - **Lanczos3**: sharper, slower
//!
//! The output canvas always grows to the rotated bounding box. Destination
//! pixels whose source lies outside the image take the background colour.
//!
//! For a counter-clockwise rotation by θ (y axis pointing down), the inverse
//! transform is:
//! ```text
//! src_x = (dst_x - cx) * cos(θ) - (dst_y - cy) * sin(θ) + src_cx
//! src_y = (dst_x - cx) * sin(θ) + (dst_y - cy) * cos(θ) + src_cy
//! ```

use image::{imageops, Rgba, RgbaImage};
use serde::{Deserialize, Serialize};

/// Interpolation filter for rotation operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InterpolationFilter {
    /// Fast bilinear interpolation.
    #[default]
    Bilinear,
    /// High-quality Lanczos3 interpolation.
    Lanczos3,
}

const ANGLE_EPSILON: f64 = 0.001;

/// Quarter turns that can be done without resampling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum QuarterTurn {
    None,
    Ccw90,
    Half,
    Ccw270,
}

fn quarter_turn(angle_degrees: f64) -> Option<QuarterTurn> {
    let normalized = angle_degrees.rem_euclid(360.0);
    let near = |target: f64| (normalized - target).abs() < ANGLE_EPSILON;

    if near(0.0) || near(360.0) {
        Some(QuarterTurn::None)
    } else if near(90.0) {
        Some(QuarterTurn::Ccw90)
    } else if near(180.0) {
        Some(QuarterTurn::Half)
    } else if near(270.0) {
        Some(QuarterTurn::Ccw270)
    } else {
        None
    }
}

/// Compute the dimensions of the bounding box for a rotated image.
///
/// When an image is rotated, the corners extend beyond the original bounds.
/// This returns the smallest box containing the entire rotated image. The
/// direction of the rotation does not matter.
pub fn compute_rotated_bounds(width: u32, height: u32, angle_degrees: f64) -> (u32, u32) {
    match quarter_turn(angle_degrees) {
        Some(QuarterTurn::None) | Some(QuarterTurn::Half) => return (width, height),
        Some(QuarterTurn::Ccw90) | Some(QuarterTurn::Ccw270) => return (height, width),
        None => {}
    }

    let angle_rad = angle_degrees.to_radians();
    let cos = angle_rad.cos().abs();
    let sin = angle_rad.sin().abs();

    let w = width as f64;
    let h = height as f64;

    // new_w = |w*cos| + |h*sin|
    // new_h = |w*sin| + |h*cos|
    let new_w = (w * cos + h * sin).round() as u32;
    let new_h = (w * sin + h * cos).round() as u32;

    (new_w.max(1), new_h.max(1))
}

/// Rotate an image counter-clockwise by `angle_degrees` around its centre.
///
/// The canvas is expanded to fit the entire rotated image (no clipping) and
/// the exposed corners are painted with `background`.
pub fn apply_rotation(
    image: &RgbaImage,
    angle_degrees: f64,
    background: Rgba<u8>,
    filter: InterpolationFilter,
) -> RgbaImage {
    match quarter_turn(angle_degrees) {
        Some(QuarterTurn::None) => return image.clone(),
        // imageops quarter turns are clockwise
        Some(QuarterTurn::Ccw90) => return imageops::rotate270(image),
        Some(QuarterTurn::Half) => return imageops::rotate180(image),
        Some(QuarterTurn::Ccw270) => return imageops::rotate90(image),
        None => {}
    }

    let (src_w, src_h) = image.dimensions();
    let (dst_w, dst_h) = compute_rotated_bounds(src_w, src_h, angle_degrees);

    let angle_rad = angle_degrees.to_radians();
    let cos = angle_rad.cos();
    let sin = angle_rad.sin();

    let src_cx = src_w as f64 / 2.0;
    let src_cy = src_h as f64 / 2.0;
    let dst_cx = dst_w as f64 / 2.0;
    let dst_cy = dst_h as f64 / 2.0;

    RgbaImage::from_fn(dst_w, dst_h, |dst_x, dst_y| {
        // Work with pixel centres
        let dx = dst_x as f64 + 0.5 - dst_cx;
        let dy = dst_y as f64 + 0.5 - dst_cy;

        let src_x = dx * cos - dy * sin + src_cx;
        let src_y = dx * sin + dy * cos + src_cy;

        if src_x < 0.0 || src_y < 0.0 || src_x >= src_w as f64 || src_y >= src_h as f64 {
            return background;
        }

        match filter {
            InterpolationFilter::Bilinear => sample_bilinear(image, src_x - 0.5, src_y - 0.5),
            InterpolationFilter::Lanczos3 => sample_lanczos3(image, src_x - 0.5, src_y - 0.5),
        }
    })
}

#[inline]
fn get_pixel_f64(image: &RgbaImage, px: u32, py: u32) -> [f64; 4] {
    let p = image.get_pixel(px, py);
    [p[0] as f64, p[1] as f64, p[2] as f64, p[3] as f64]
}

/// Sample a pixel using bilinear interpolation.
///
/// `x`/`y` are in pixel-index space and are clamped to the image, so edge
/// pixels repeat instead of fading to black.
fn sample_bilinear(image: &RgbaImage, x: f64, y: f64) -> Rgba<u8> {
    let (w, h) = image.dimensions();
    let x = x.clamp(0.0, (w - 1) as f64);
    let y = y.clamp(0.0, (h - 1) as f64);

    let x0 = x.floor() as u32;
    let y0 = y.floor() as u32;
    let x1 = (x0 + 1).min(w - 1);
    let y1 = (y0 + 1).min(h - 1);

    // Fractional distances
    let fx = x - x0 as f64;
    let fy = y - y0 as f64;

    let p00 = get_pixel_f64(image, x0, y0);
    let p10 = get_pixel_f64(image, x1, y0);
    let p01 = get_pixel_f64(image, x0, y1);
    let p11 = get_pixel_f64(image, x1, y1);

    let mut result = [0u8; 4];
    for i in 0..4 {
        let v = p00[i] * (1.0 - fx) * (1.0 - fy)
            + p10[i] * fx * (1.0 - fy)
            + p01[i] * (1.0 - fx) * fy
            + p11[i] * fx * fy;
        result[i] = v.clamp(0.0, 255.0).round() as u8;
    }

    Rgba(result)
}

/// Sample a pixel using Lanczos3 interpolation.
///
/// Considers a 6x6 neighbourhood; falls back to bilinear near the edges
/// where the kernel would leave the image.
fn sample_lanczos3(image: &RgbaImage, x: f64, y: f64) -> Rgba<u8> {
    let (w, h) = (image.width() as i64, image.height() as i64);

    if x < 2.0 || x >= (w - 3) as f64 || y < 2.0 || y >= (h - 3) as f64 {
        return sample_bilinear(image, x, y);
    }

    let x0 = x.floor() as i64;
    let y0 = y.floor() as i64;

    let mut sum = [0.0f64; 4];
    let mut weight_sum = 0.0;

    for ky in -2..=3 {
        for kx in -2..=3 {
            let px = x0 + kx;
            let py = y0 + ky;

            if px >= 0 && px < w && py >= 0 && py < h {
                let weight = lanczos_weight(x - px as f64, 3.0) * lanczos_weight(y - py as f64, 3.0);

                let pixel = get_pixel_f64(image, px as u32, py as u32);
                for i in 0..4 {
                    sum[i] += pixel[i] * weight;
                }
                weight_sum += weight;
            }
        }
    }

    let mut result = [0u8; 4];
    if weight_sum > 0.0 {
        for i in 0..4 {
            result[i] = (sum[i] / weight_sum).clamp(0.0, 255.0).round() as u8;
        }
    }

    Rgba(result)
}

/// Lanczos kernel weight function.
///
/// ```text
/// L(x) = sinc(x) * sinc(x/a)  for |x| < a
/// L(x) = 0                     for |x| >= a
/// ```
fn lanczos_weight(x: f64, a: f64) -> f64 {
    if x.abs() < f64::EPSILON {
        return 1.0;
    }
    if x.abs() >= a {
        return 0.0;
    }

    let pi_x = std::f64::consts::PI * x;
    let pi_x_a = pi_x / a;

    (a * pi_x.sin() * pi_x_a.sin()) / (pi_x * pi_x)
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Property: a quarter turn and its inverse restore the image exactly.
        #[test]
        fn prop_quarter_turn_round_trip(
            width in 1u32..=24,
            height in 1u32..=24,
            seed in any::<u8>(),
        ) {
            let img = RgbaImage::from_fn(width, height, |x, y| {
                let v = (x as u8).wrapping_mul(31) ^ (y as u8).wrapping_mul(17) ^ seed;
                Rgba([v, v.wrapping_add(1), v.wrapping_add(2), 255])
            });
            let bg = Rgba([0, 0, 0, 255]);
            let turned = apply_rotation(&img, -90.0, bg, InterpolationFilter::Bilinear);
            let back = apply_rotation(&turned, 90.0, bg, InterpolationFilter::Bilinear);
            prop_assert_eq!(back, img);
        }

        /// Property: the rotated canvas stays between the source area and its diagonal.
        #[test]
        fn prop_rotation_never_crops(
            width in 2u32..=40,
            height in 2u32..=40,
            angle in -360.0f64..360.0,
        ) {
            let (w, h) = compute_rotated_bounds(width, height, angle);
            let diag = ((width * width + height * height) as f64).sqrt();
            prop_assert!(w as f64 <= diag + 1.0 && h as f64 <= diag + 1.0);
            prop_assert!((w as f64 + 1.0) * (h as f64 + 1.0) >= (width * height) as f64);
        }
    }
}
