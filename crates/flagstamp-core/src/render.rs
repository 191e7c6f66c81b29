//! Rasterization of the base image and flag overlays.
//!
//! Two kinds of raster are produced here:
//!
//! - the **live surface**: the base image drawn into its fit rectangle at
//!   the display surface size. Overlays are not baked in; the host draws
//!   them as separate elements from the overlay store.
//! - the **export raster**: base image plus every overlay, composed in
//!   z-order, either at display resolution or at the base image's own
//!   resolution (see [`ExportResolution`]).
//!
//! Pixels outside the fit rectangle stay fully transparent.

use image::imageops::{self, FilterType};
use image::RgbaImage;

use crate::config::ExportResolution;
use crate::decode::BaseImage;
use crate::geometry::{compute_fit_rect, surface_to_image, FitRect, Rect, SurfaceSize};
use crate::overlay::FlagOverlay;

/// Resampling filter used for every blit.
const BLIT_FILTER: FilterType = FilterType::Triangle;

/// Where the base image and overlays land on an export raster.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExportLayout {
    pub resolution: ExportResolution,
    /// Raster size in pixels.
    pub width: u32,
    pub height: u32,
    /// Base image destination on the raster.
    pub base_rect: Rect,
    /// Fit rectangle of the base image on the display surface.
    pub fit: FitRect,
    base_width: f64,
    base_height: f64,
}

impl ExportLayout {
    /// Compute the layout for exporting `base` edited on `surface`.
    pub fn new(base: &BaseImage, surface: SurfaceSize, resolution: ExportResolution) -> Self {
        let base_width = f64::from(base.width());
        let base_height = f64::from(base.height());
        let fit = compute_fit_rect(base_width, base_height, surface.width, surface.height);

        match resolution {
            ExportResolution::Display => {
                let (width, height) = surface.to_pixels();
                Self {
                    resolution,
                    width,
                    height,
                    base_rect: fit,
                    fit,
                    base_width,
                    base_height,
                }
            }
            ExportResolution::Source => Self {
                resolution,
                width: base.width().max(1),
                height: base.height().max(1),
                base_rect: Rect::new(0.0, 0.0, base_width, base_height),
                fit,
                base_width,
                base_height,
            },
        }
    }

    /// Destination rectangle of an overlay on the export raster.
    pub fn overlay_rect(&self, overlay: &FlagOverlay) -> Rect {
        match self.resolution {
            ExportResolution::Display => overlay.rect(),
            ExportResolution::Source => {
                let (x, y) =
                    surface_to_image(overlay.x, overlay.y, &self.fit, self.base_width, self.base_height);
                let (scale_x, scale_y) = if self.fit.width > 0.0 && self.fit.height > 0.0 {
                    (self.base_width / self.fit.width, self.base_height / self.fit.height)
                } else {
                    (1.0, 1.0)
                };
                Rect::new(x, y, overlay.width * scale_x, overlay.height * scale_y)
            }
        }
    }
}

/// Draw the base image into its fit rectangle on a transparent raster of
/// the surface size.
pub fn render_base(base: &BaseImage, surface: SurfaceSize) -> RgbaImage {
    let (width, height) = surface.to_pixels();
    let mut canvas = RgbaImage::new(width, height);
    let fit = compute_fit_rect(
        f64::from(base.width()),
        f64::from(base.height()),
        surface.width,
        surface.height,
    );
    blit(&mut canvas, base.raster(), fit);
    canvas
}

/// Compose base image and flags into an export raster.
///
/// `flags` pairs each overlay with its decoded image and must already be
/// in z-order. Overlays without an image are expected to be filtered out
/// by the caller.
pub fn compose(base: &BaseImage, layout: &ExportLayout, flags: &[(&FlagOverlay, &RgbaImage)]) -> RgbaImage {
    let mut canvas = RgbaImage::new(layout.width, layout.height);
    blit(&mut canvas, base.raster(), layout.base_rect);
    for (overlay, image) in flags {
        blit(&mut canvas, image, layout.overlay_rect(overlay));
    }
    canvas
}

/// Scale `src` to `dest` (rounded to whole pixels) and alpha-blend it onto
/// `canvas`. Parts falling outside the canvas are clipped.
pub fn blit(canvas: &mut RgbaImage, src: &RgbaImage, dest: Rect) {
    if src.width() == 0 || src.height() == 0 {
        return;
    }
    let w = dest.width.round();
    let h = dest.height.round();
    if !(w >= 1.0 && h >= 1.0) {
        return;
    }
    let (w, h) = (w as u32, h as u32);

    let x = dest.x.round() as i64;
    let y = dest.y.round() as i64;

    if src.dimensions() == (w, h) {
        imageops::overlay(canvas, src, x, y);
    } else {
        let scaled = imageops::resize(src, w, h, BLIT_FILTER);
        imageops::overlay(canvas, &scaled, x, y);
    }
}

/// The raster shown to the user behind the overlay elements.
#[derive(Debug, Clone, Default)]
pub struct LiveSurface {
    raster: Option<RgbaImage>,
}

impl LiveSurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from scratch for a (new) base image or surface size.
    pub fn rebuild(&mut self, base: &BaseImage, surface: SurfaceSize) {
        self.raster = Some(render_base(base, surface));
    }

    /// Drop the raster, leaving the surface empty.
    pub fn clear(&mut self) {
        self.raster = None;
    }

    pub fn raster(&self) -> Option<&RgbaImage> {
        self.raster.as_ref()
    }

    pub fn is_empty(&self) -> bool {
        self.raster.is_none()
    }
}
