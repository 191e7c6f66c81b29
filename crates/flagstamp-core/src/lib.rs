//! Flag Stamp Core - compositing engine
//!
//! This crate provides the platform-independent part of Flag Stamp: placing
//! national-flag overlays on an uploaded image, dragging them around with
//! pointer or touch input, and exporting the composite as a PNG.
//!
//! # Module Structure
//!
//! - `geometry` - fit rectangle and surface/image coordinate mapping
//! - `overlay` - the overlay store (z-ordered, clamped to the surface)
//! - `interaction` - pointer/touch state machine (press, drag, release)
//! - `render` - live raster and export composition
//! - `export` - async flag fetching, join and PNG export
//! - `session` - the session controller tying everything together
//! - `catalog` - built-in country flag catalog
//! - `decode` / `encode` - image codecs
//!
//! All state is single-threaded; async work (flag fetching) is expressed as
//! `!Send` futures driven by the host's event loop.

pub mod catalog;
pub mod config;
pub mod decode;
pub mod encode;
pub mod export;
pub mod geometry;
pub mod interaction;
pub mod notify;
pub mod overlay;
pub mod render;
pub mod session;

pub use config::{CompositorConfig, ConfigError, ExportResolution};
pub use decode::{BaseImage, DecodeError};
pub use encode::{encode_png, EncodeError, PNG_MIME};
pub use export::{
    DownloadSink, ExportError, ExportJob, ExportReport, ExportResult, FetchError, FlagFetcher,
    SkipReason, SkippedOverlay, Timer, EXPORT_FILENAME,
};
pub use geometry::{
    compute_fit_rect, image_to_surface, surface_to_image, FitRect, Rect, Size, SurfaceSize,
};
pub use interaction::{Disposition, PointerEvent, PointerKind, PointerPhase};
pub use overlay::{FlagOverlay, OverlayEvent, OverlayHandle, OverlayStore};
pub use session::{export_session, Session, SessionError, SessionEvent};
