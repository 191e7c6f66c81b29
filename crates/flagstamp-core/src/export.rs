//! Export of the composite image as PNG.
//!
//! An [`ExportJob`] is a snapshot of everything export needs: the base
//! image, the overlays in z-order and the flag images decoded so far.
//! Running the job fetches and decodes the missing flag images
//! concurrently, waits for all of them (each bounded by a timeout), then
//! blits the flags in z-order and encodes the raster.
//!
//! Fetching and timing are host concerns and come in through the
//! [`FlagFetcher`] and [`Timer`] traits. Delivering the bytes is the
//! [`DownloadSink`]'s job and happens in the session, which also decides
//! whether a finished job is still current.

use std::collections::HashMap;
use std::rc::Rc;
use std::time::Duration;

use futures::future::{self, Either, LocalBoxFuture};
use image::RgbaImage;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::ExportResolution;
use crate::decode::{decode_image, BaseImage};
use crate::encode::{encode_png, EncodeError, PNG_MIME};
use crate::geometry::SurfaceSize;
use crate::overlay::{FlagOverlay, OverlayHandle};
use crate::render::{compose, ExportLayout};

/// File name of the exported image.
pub const EXPORT_FILENAME: &str = "flag-stamped-image.png";

/// Decoded flag images keyed by URL.
pub type FlagCache = HashMap<String, Rc<RgbaImage>>;

/// Error reported by a host fetcher.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("HTTP status {0}")]
    Status(u16),
}

/// Errors that prevent an export from producing any output.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExportError {
    #[error("No base image to export")]
    NoBaseImage,

    #[error(transparent)]
    Encode(#[from] EncodeError),
}

/// Retrieves the encoded bytes behind a flag URL.
pub trait FlagFetcher {
    fn fetch(&self, url: &str) -> LocalBoxFuture<'static, Result<Vec<u8>, FetchError>>;
}

/// Host timer used to bound each flag fetch.
pub trait Timer {
    fn sleep(&self, duration: Duration) -> LocalBoxFuture<'static, ()>;
}

/// Receives the finished file. Called at most once per export.
pub trait DownloadSink {
    fn deliver(&mut self, filename: &str, mime: &str, bytes: &[u8]);
}

/// Why an overlay was left out of an export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "message", rename_all = "camelCase")]
pub enum SkipReason {
    /// The flag image did not arrive within the timeout.
    Timeout,
    /// The fetcher reported an error.
    Fetch(String),
    /// The bytes could not be decoded.
    Decode(String),
}

/// An overlay omitted from the export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedOverlay {
    pub handle: OverlayHandle,
    pub url: String,
    pub reason: SkipReason,
}

/// A successfully encoded export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportReport {
    pub filename: String,
    pub mime: String,
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
    /// Overlays that could not be drawn. Non-empty means partial success.
    pub skipped: Vec<SkippedOverlay>,
}

impl ExportReport {
    pub fn is_partial(&self) -> bool {
        !self.skipped.is_empty()
    }
}

/// The result of running an [`ExportJob`].
#[derive(Debug)]
pub struct ExportResult {
    pub generation: u64,
    pub outcome: Result<ExportReport, ExportError>,
    /// Flag images decoded while running, for the session cache.
    pub decoded: Vec<(String, Rc<RgbaImage>)>,
}

/// A snapshot of the session taken when export was requested.
#[derive(Debug, Clone)]
pub struct ExportJob {
    pub generation: u64,
    pub base: Rc<BaseImage>,
    pub overlays: Vec<FlagOverlay>,
    pub surface: SurfaceSize,
    pub resolution: ExportResolution,
    pub timeout: Duration,
    pub cached: FlagCache,
}

impl ExportJob {
    /// Fetch missing flags, compose and encode.
    pub async fn run(self, fetcher: &dyn FlagFetcher, timer: &dyn Timer) -> ExportResult {
        let missing = self.missing_urls();
        log::debug!(
            "export {}: {} overlays, {} flag images to fetch",
            self.generation,
            self.overlays.len(),
            missing.len()
        );

        let pending = missing
            .into_iter()
            .map(|url| load_flag(url, fetcher, timer, self.timeout));
        let loaded = future::join_all(pending).await;

        let mut images = self.cached.clone();
        let mut failures: HashMap<String, SkipReason> = HashMap::new();
        let mut decoded = Vec::new();
        for (url, result) in loaded {
            match result {
                Ok(image) => {
                    images.insert(url.clone(), image.clone());
                    decoded.push((url, image));
                }
                Err(reason) => {
                    failures.insert(url, reason);
                }
            }
        }

        let mut flags = Vec::with_capacity(self.overlays.len());
        let mut skipped = Vec::new();
        for overlay in &self.overlays {
            match images.get(&overlay.url) {
                Some(image) => flags.push((overlay, image.as_ref())),
                None => {
                    let reason = failures
                        .get(&overlay.url)
                        .cloned()
                        .unwrap_or(SkipReason::Timeout);
                    log::warn!(
                        "skipping overlay {} ({}): {:?}",
                        overlay.handle.0,
                        overlay.url,
                        reason
                    );
                    skipped.push(SkippedOverlay {
                        handle: overlay.handle,
                        url: overlay.url.clone(),
                        reason,
                    });
                }
            }
        }

        let layout = ExportLayout::new(&self.base, self.surface, self.resolution);
        let raster = compose(&self.base, &layout, &flags);
        let outcome = encode_png(&raster)
            .map(|bytes| {
                log::info!(
                    "export {}: {}x{} PNG, {} bytes, {} overlays skipped",
                    self.generation,
                    layout.width,
                    layout.height,
                    bytes.len(),
                    skipped.len()
                );
                ExportReport {
                    filename: EXPORT_FILENAME.to_string(),
                    mime: PNG_MIME.to_string(),
                    bytes,
                    width: layout.width,
                    height: layout.height,
                    skipped,
                }
            })
            .map_err(ExportError::from);

        ExportResult {
            generation: self.generation,
            outcome,
            decoded,
        }
    }

    /// Distinct overlay URLs without a cached image, in first-use order.
    fn missing_urls(&self) -> Vec<String> {
        let mut urls: Vec<String> = Vec::new();
        for overlay in &self.overlays {
            if !self.cached.contains_key(&overlay.url) && !urls.contains(&overlay.url) {
                urls.push(overlay.url.clone());
            }
        }
        urls
    }
}

/// Fetch and decode one flag, racing the fetch against the timeout.
async fn load_flag(
    url: String,
    fetcher: &dyn FlagFetcher,
    timer: &dyn Timer,
    timeout: Duration,
) -> (String, Result<Rc<RgbaImage>, SkipReason>) {
    let fetch = fetcher.fetch(&url);
    let deadline = timer.sleep(timeout);

    let result = match future::select(fetch, deadline).await {
        Either::Left((Ok(bytes), _)) => decode_image(&bytes)
            .map(Rc::new)
            .map_err(|e| SkipReason::Decode(e.to_string())),
        Either::Left((Err(e), _)) => Err(SkipReason::Fetch(e.to_string())),
        Either::Right(((), _)) => Err(SkipReason::Timeout),
    };
    (url, result)
}
