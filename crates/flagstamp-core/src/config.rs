//! Compositor configuration.
//!
//! The configuration is a plain serde struct so the web host can pass it in
//! as a JavaScript object (camelCase keys). Every field has a default, so a
//! partial object such as `{ surfaceWidth: 1024 }` is accepted.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::geometry::{Size, SurfaceSize};

/// Default editor surface width in surface units.
pub const DEFAULT_SURFACE_WIDTH: f64 = 800.0;
/// Default editor surface height in surface units.
pub const DEFAULT_SURFACE_HEIGHT: f64 = 600.0;
/// Width of a placed flag in surface units.
pub const DEFAULT_FLAG_WIDTH: f64 = 60.0;
/// Height of a placed flag in surface units.
pub const DEFAULT_FLAG_HEIGHT: f64 = 40.0;
/// Largest accepted surface or flag extent, in surface units.
pub const MAX_SURFACE_EXTENT: f64 = 8_192.0;
/// How long export waits for a single flag image before skipping it.
pub const DEFAULT_FLAG_TIMEOUT_MS: u32 = 5_000;

/// Rejected configuration values.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("Invalid surface size {width}x{height}")]
    InvalidSurface { width: f64, height: f64 },

    #[error("Invalid flag size {width}x{height}")]
    InvalidFlagSize { width: f64, height: f64 },
}

/// Accept a surface size that is finite, non-negative and at most
/// [`MAX_SURFACE_EXTENT`] on each axis.
pub fn check_surface(width: f64, height: f64) -> Result<SurfaceSize, ConfigError> {
    let valid = |v: f64| v.is_finite() && (0.0..=MAX_SURFACE_EXTENT).contains(&v);
    if valid(width) && valid(height) {
        Ok(SurfaceSize::new(width, height))
    } else {
        Err(ConfigError::InvalidSurface { width, height })
    }
}

/// Resolution of the exported PNG.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ExportResolution {
    /// Export at the display surface size (what the user sees).
    #[default]
    Display,
    /// Export at the base image's intrinsic size, mapping overlays into
    /// image pixel coordinates.
    Source,
}

/// Settings for a compositing session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CompositorConfig {
    /// Logical width of the editing surface.
    pub surface_width: f64,
    /// Logical height of the editing surface.
    pub surface_height: f64,
    /// Width of every placed flag (W_f).
    pub flag_width: f64,
    /// Height of every placed flag (H_f).
    pub flag_height: f64,
    /// Per-overlay wait bound during export, in milliseconds.
    pub flag_timeout_ms: u32,
    /// Output resolution for export.
    pub export_resolution: ExportResolution,
    /// Reject flag URLs that the built-in catalog does not produce.
    pub restrict_to_catalog: bool,
}

impl Default for CompositorConfig {
    fn default() -> Self {
        Self {
            surface_width: DEFAULT_SURFACE_WIDTH,
            surface_height: DEFAULT_SURFACE_HEIGHT,
            flag_width: DEFAULT_FLAG_WIDTH,
            flag_height: DEFAULT_FLAG_HEIGHT,
            flag_timeout_ms: DEFAULT_FLAG_TIMEOUT_MS,
            export_resolution: ExportResolution::Display,
            restrict_to_catalog: false,
        }
    }
}

impl CompositorConfig {
    /// Create a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// The display surface described by this configuration.
    pub fn surface(&self) -> SurfaceSize {
        SurfaceSize::new(self.surface_width, self.surface_height)
    }

    /// Check the surface and flag sizes before a session allocates rasters
    /// for them.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_surface(self.surface_width, self.surface_height)?;

        let valid = |v: f64| v.is_finite() && v > 0.0 && v <= MAX_SURFACE_EXTENT;
        if !(valid(self.flag_width) && valid(self.flag_height)) {
            return Err(ConfigError::InvalidFlagSize {
                width: self.flag_width,
                height: self.flag_height,
            });
        }
        Ok(())
    }

    /// The fixed flag size.
    pub fn flag_size(&self) -> Size {
        Size::new(self.flag_width, self.flag_height)
    }

    /// The per-overlay export timeout.
    pub fn flag_timeout(&self) -> Duration {
        Duration::from_millis(u64::from(self.flag_timeout_ms))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_matches_reference_design() {
        let config = CompositorConfig::new();
        assert_eq!(config.surface(), SurfaceSize::new(800.0, 600.0));
        assert_eq!(config.flag_size(), Size::new(60.0, 40.0));
        assert_eq!(config.flag_timeout(), Duration::from_secs(5));
        assert_eq!(config.export_resolution, ExportResolution::Display);
        assert!(!config.restrict_to_catalog);
    }

    #[test]
    fn test_flag_timeout_conversion() {
        let mut config = CompositorConfig::default();
        config.flag_timeout_ms = 250;
        assert_eq!(config.flag_timeout(), Duration::from_millis(250));
    }

    #[test]
    fn test_validate_accepts_defaults_and_zero_surface() {
        assert!(CompositorConfig::default().validate().is_ok());
        assert_eq!(check_surface(0.0, 0.0), Ok(SurfaceSize::new(0.0, 0.0)));
        assert!(check_surface(MAX_SURFACE_EXTENT, 1.0).is_ok());
    }

    #[test]
    fn test_validate_rejects_unusable_sizes() {
        assert!(check_surface(1e6, 1e6).is_err());
        assert!(check_surface(f64::NAN, 600.0).is_err());
        assert!(check_surface(800.0, f64::INFINITY).is_err());
        assert!(check_surface(-1.0, 600.0).is_err());

        let mut config = CompositorConfig::default();
        config.surface_width = 1e6;
        assert_eq!(
            config.validate(),
            Err(ConfigError::InvalidSurface {
                width: 1e6,
                height: 600.0
            })
        );

        let mut config = CompositorConfig::default();
        config.flag_width = 0.0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidFlagSize { .. })
        ));
    }
}
