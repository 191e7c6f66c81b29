//! Coordinate mapping between the display surface and the base image.
//!
//! The base image is drawn into a centered, aspect-preserving "fit"
//! rectangle on the surface (letterboxed when the image is wider than the
//! surface, pillarboxed when it is taller). All functions here are pure.
//!
//! # Coordinate System
//!
//! - Surface units: (0, 0) is the top-left of the editing surface
//! - Image coordinates: (0, 0) is the top-left pixel of the base image

use serde::{Deserialize, Serialize};

/// A width/height pair.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// True if either dimension is zero, negative or NaN.
    pub fn is_degenerate(&self) -> bool {
        !(self.width > 0.0 && self.height > 0.0)
    }

    /// Round to whole pixels, never below 1x1.
    pub fn to_pixels(self) -> (u32, u32) {
        (to_pixel_extent(self.width), to_pixel_extent(self.height))
    }
}

/// Logical size of the display surface.
pub type SurfaceSize = Size;

/// An axis-aligned rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Half-open containment test: the left/top edges are inside, the
    /// right/bottom edges are not.
    pub fn contains(&self, px: f64, py: f64) -> bool {
        px >= self.x && px < self.x + self.width && py >= self.y && py < self.y + self.height
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }
}

/// The rectangle on the surface into which the base image is drawn.
pub type FitRect = Rect;

/// Compute the centered, aspect-preserving rectangle for an image of
/// `image_w x image_h` drawn on a `surface_w x surface_h` surface.
///
/// If any input is not strictly positive, a zero-sized rectangle at the
/// surface center is returned.
///
/// # Example
///
/// ```ignore
/// let fit = compute_fit_rect(1000.0, 500.0, 400.0, 400.0);
/// assert_eq!((fit.x, fit.y, fit.width, fit.height), (0.0, 100.0, 400.0, 200.0));
/// ```
pub fn compute_fit_rect(image_w: f64, image_h: f64, surface_w: f64, surface_h: f64) -> FitRect {
    if !(image_w > 0.0 && image_h > 0.0 && surface_w > 0.0 && surface_h > 0.0) {
        let cx = positive_or_zero(surface_w) / 2.0;
        let cy = positive_or_zero(surface_h) / 2.0;
        return Rect::new(cx, cy, 0.0, 0.0);
    }

    let image_aspect = image_w / image_h;
    let surface_aspect = surface_w / surface_h;

    if image_aspect > surface_aspect {
        // Wider than the surface: full width, bars above and below
        let draw_h = surface_w * image_h / image_w;
        Rect::new(0.0, (surface_h - draw_h) / 2.0, surface_w, draw_h)
    } else {
        // Taller (or equal): full height, bars left and right
        let draw_w = surface_h * image_w / image_h;
        Rect::new((surface_w - draw_w) / 2.0, 0.0, draw_w, surface_h)
    }
}

/// Map a surface point into base-image pixel coordinates.
///
/// Points outside the fit rectangle map outside the image bounds; callers
/// clip as needed. A degenerate fit rectangle maps everything to the origin.
pub fn surface_to_image(px: f64, py: f64, fit: &FitRect, image_w: f64, image_h: f64) -> (f64, f64) {
    if fit.width <= 0.0 || fit.height <= 0.0 {
        return (0.0, 0.0);
    }
    let ix = (px - fit.x) * image_w / fit.width;
    let iy = (py - fit.y) * image_h / fit.height;
    (ix, iy)
}

/// Map a base-image pixel coordinate onto the surface. Inverse of
/// [`surface_to_image`].
pub fn image_to_surface(ix: f64, iy: f64, fit: &FitRect, image_w: f64, image_h: f64) -> (f64, f64) {
    if image_w <= 0.0 || image_h <= 0.0 {
        return (fit.x, fit.y);
    }
    let px = fit.x + ix * fit.width / image_w;
    let py = fit.y + iy * fit.height / image_h;
    (px, py)
}

/// Clamp `value` to `[0, max(0, limit)]`.
///
/// Used for overlay origins: when the surface is smaller than a flag the
/// only valid origin is 0.
pub fn clamp_origin(value: f64, limit: f64) -> f64 {
    let hi = positive_or_zero(limit);
    if value.is_nan() {
        return 0.0;
    }
    value.clamp(0.0, hi)
}

fn positive_or_zero(v: f64) -> f64 {
    if v > 0.0 {
        v
    } else {
        0.0
    }
}

fn to_pixel_extent(v: f64) -> u32 {
    if v.is_finite() && v >= 1.0 {
        v.round() as u32
    } else {
        1
    }
}


// ============================================================================
// Property-Based Tests
// ============================================================================

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    /// Strategy for positive image/surface extents.
    fn extent_strategy() -> impl Strategy<Value = f64> {
        1.0f64..=5000.0
    }

    proptest! {
        /// Property: the fit rectangle lies within the surface.
        #[test]
        fn prop_fit_rect_inside_surface(
            iw in extent_strategy(),
            ih in extent_strategy(),
            sw in extent_strategy(),
            sh in extent_strategy(),
        ) {
            let fit = compute_fit_rect(iw, ih, sw, sh);
            let tol = 1e-6 * sw.max(sh);
            prop_assert!(fit.x >= -tol && fit.y >= -tol);
            prop_assert!(fit.right() <= sw + tol, "right edge {} > {}", fit.right(), sw);
            prop_assert!(fit.bottom() <= sh + tol, "bottom edge {} > {}", fit.bottom(), sh);
        }

        /// Property: the fit rectangle preserves the image aspect ratio.
        #[test]
        fn prop_fit_rect_preserves_aspect(
            iw in extent_strategy(),
            ih in extent_strategy(),
            sw in extent_strategy(),
            sh in extent_strategy(),
        ) {
            let fit = compute_fit_rect(iw, ih, sw, sh);
            let expected = iw / ih;
            let actual = fit.width / fit.height;
            prop_assert!((actual - expected).abs() <= 1e-9 * expected.max(1.0),
                "aspect {} != {}", actual, expected);
        }

        /// Property: the fit rectangle is centered on both axes.
        #[test]
        fn prop_fit_rect_centered(
            iw in extent_strategy(),
            ih in extent_strategy(),
            sw in extent_strategy(),
            sh in extent_strategy(),
        ) {
            let fit = compute_fit_rect(iw, ih, sw, sh);
            prop_assert!((fit.x - (sw - fit.width) / 2.0).abs() < 1e-6);
            prop_assert!((fit.y - (sh - fit.height) / 2.0).abs() < 1e-6);
        }

        /// Property: surface -> image -> surface is the identity.
        #[test]
        fn prop_mapping_inverse(
            iw in extent_strategy(),
            ih in extent_strategy(),
            px in 0.0f64..800.0,
            py in 0.0f64..600.0,
        ) {
            let fit = compute_fit_rect(iw, ih, 800.0, 600.0);
            let (ix, iy) = surface_to_image(px, py, &fit, iw, ih);
            let (rx, ry) = image_to_surface(ix, iy, &fit, iw, ih);
            prop_assert!((rx - px).abs() < 1e-6);
            prop_assert!((ry - py).abs() < 1e-6);
        }
    }
}
