//! The session controller.
//!
//! A [`Session`] owns all editing state: the base image, the overlay
//! store, the interaction state machine, the live raster and the flag image
//! cache. The host drives it with base-image uploads, flag selections,
//! pointer events and export requests, and listens for [`SessionEvent`]s to
//! know when to redraw.
//!
//! # Export
//!
//! Export is split in three steps so no borrow of the session is held while
//! flag images are being fetched:
//!
//! 1. [`Session::request_export`] snapshots the state into an [`ExportJob`]
//! 2. [`ExportJob::run`] does the async work
//! 3. [`Session::complete_export`] settles the result, unless a newer
//!    export was requested in the meantime, and the file goes to the sink
//!
//! [`export_session`] wraps the three steps for a `RefCell<Session>` and
//! releases the borrow before the sink runs.

use std::cell::RefCell;
use std::rc::Rc;

use image::RgbaImage;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::catalog;
use crate::config::{check_surface, CompositorConfig, ConfigError};
use crate::decode::{BaseImage, DecodeError};
use crate::export::{
    DownloadSink, ExportError, ExportJob, ExportReport, ExportResult, FlagCache, FlagFetcher,
    Timer,
};
use crate::geometry::Size;
use crate::interaction::{Disposition, Interaction, PointerEvent};
use crate::notify::{SubscriberId, Subscribers};
use crate::overlay::{FlagOverlay, OverlayEvent, OverlayHandle, OverlayStore};
use crate::render::LiveSurface;

/// Errors reported to the UI by session operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SessionError {
    /// The base image could not be decoded.
    #[error("Could not load image: {0}")]
    Decode(#[from] DecodeError),

    /// A surface or flag size cannot be rendered.
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    /// The flag URL or country code is not acceptable.
    #[error("Invalid flag selection: {0}")]
    InvalidSelection(String),
}

/// Change notifications for the host UI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum SessionEvent {
    /// A new base image is displayed; the live raster was rebuilt.
    BaseImageChanged { width: u32, height: u32 },
    /// The uploaded base image could not be decoded; the surface is empty.
    BaseImageFailed { message: String },
    /// The live raster was rebuilt for a new surface size.
    SurfaceResized { width: f64, height: f64 },
    /// An overlay was appended, moved or removed.
    Overlay { event: OverlayEvent },
    /// A flag selection was rejected; no overlay was created.
    SelectionRejected { message: String },
    /// An export was handed to the download sink.
    ExportDelivered { filename: String, skipped: usize },
    /// A finished export was dropped because a newer one was requested.
    ExportDiscarded { generation: u64 },
    /// Everything was cleared.
    Reset,
}

type SharedSubscribers = Rc<RefCell<Subscribers<SessionEvent>>>;

/// One editing session.
#[derive(Debug)]
pub struct Session {
    config: CompositorConfig,
    base: Option<Rc<BaseImage>>,
    selected_flag: Option<String>,
    store: OverlayStore,
    interaction: Interaction,
    live: LiveSurface,
    flag_cache: FlagCache,
    export_generation: u64,
    subscribers: SharedSubscribers,
}

impl Session {
    /// Start a session.
    ///
    /// # Errors
    /// Returns [`SessionError::Config`] if the surface or flag size is not
    /// finite or exceeds [`crate::config::MAX_SURFACE_EXTENT`].
    pub fn new(config: CompositorConfig) -> Result<Self, SessionError> {
        config.validate()?;
        let subscribers: SharedSubscribers = Rc::new(RefCell::new(Subscribers::new()));
        let mut store = OverlayStore::new(config.surface(), config.flag_size());

        let forward = Rc::clone(&subscribers);
        store.subscribe(move |event| {
            forward
                .borrow_mut()
                .emit(&SessionEvent::Overlay { event: *event });
        });

        Ok(Self {
            config,
            base: None,
            selected_flag: None,
            store,
            interaction: Interaction::new(),
            live: LiveSurface::new(),
            flag_cache: FlagCache::new(),
            export_generation: 0,
            subscribers,
        })
    }

    pub fn config(&self) -> &CompositorConfig {
        &self.config
    }

    /// Decode and display a new base image.
    ///
    /// On failure the previous image is dropped and the live surface is left
    /// empty. Placed overlays are kept either way.
    pub fn set_base_image(&mut self, bytes: &[u8]) -> Result<(), SessionError> {
        match BaseImage::decode(bytes) {
            Ok(base) => {
                self.set_base_raster(base);
                Ok(())
            }
            Err(e) => {
                log::warn!("base image decode failed: {e}");
                self.base = None;
                self.live.clear();
                let error = SessionError::from(e);
                self.emit(SessionEvent::BaseImageFailed {
                    message: error.to_string(),
                });
                Err(error)
            }
        }
    }

    /// Display an already decoded base image.
    pub fn set_base_raster(&mut self, base: BaseImage) {
        let (width, height) = (base.width(), base.height());
        self.live.rebuild(&base, self.config.surface());
        self.base = Some(Rc::new(base));
        log::debug!("base image set: {width}x{height}");
        self.emit(SessionEvent::BaseImageChanged { width, height });
    }

    pub fn base_image(&self) -> Option<&BaseImage> {
        self.base.as_deref()
    }

    /// Place a new overlay for `url`. Every call creates a new overlay.
    pub fn select_flag(&mut self, url: &str) -> Result<OverlayHandle, SessionError> {
        let url = url.trim();
        if url.is_empty() {
            return Err(self.reject("empty flag URL".to_string()));
        }
        if self.config.restrict_to_catalog && !catalog::recognizes_url(url) {
            return Err(self.reject(format!("unknown flag URL '{url}'")));
        }

        self.selected_flag = Some(url.to_string());
        Ok(self.store.append(url))
    }

    /// Place a new overlay for a catalog country code.
    pub fn select_country(&mut self, code: &str) -> Result<OverlayHandle, SessionError> {
        match catalog::lookup(code) {
            Some(entry) => self.select_flag(&entry.url),
            None => Err(self.reject(format!("unknown country code '{}'", code.trim()))),
        }
    }

    /// The most recently selected flag URL.
    pub fn selected_flag(&self) -> Option<&str> {
        self.selected_flag.as_deref()
    }

    /// Feed a normalized pointer event to the interaction state machine.
    pub fn handle_pointer(&mut self, event: &PointerEvent) -> Disposition {
        self.interaction.handle_event(event, &mut self.store)
    }

    pub fn interaction(&self) -> &Interaction {
        &self.interaction
    }

    pub fn store(&self) -> &OverlayStore {
        &self.store
    }

    /// Overlays in z-order.
    pub fn overlays(&self) -> Vec<FlagOverlay> {
        self.store.snapshot()
    }

    /// The live raster, if a base image is displayed.
    pub fn live_raster(&self) -> Option<&RgbaImage> {
        self.live.raster()
    }

    /// Change the surface size, re-clamping overlays and rebuilding the
    /// live raster. Unusable sizes leave the session untouched.
    pub fn resize_surface(&mut self, width: f64, height: f64) -> Result<(), SessionError> {
        let surface = check_surface(width, height)?;
        self.config.surface_width = width;
        self.config.surface_height = height;
        self.store.set_surface(surface);
        if let Some(base) = &self.base {
            self.live.rebuild(base, self.config.surface());
        }
        self.emit(SessionEvent::SurfaceResized { width, height });
        Ok(())
    }

    /// Clear overlays, grab, base image and selection. Any export in flight
    /// is superseded.
    pub fn reset(&mut self) {
        self.interaction.reset();
        self.store.clear();
        self.base = None;
        self.selected_flag = None;
        self.live.clear();
        self.export_generation += 1;
        self.emit(SessionEvent::Reset);
    }

    /// Snapshot the session for export. Supersedes any earlier request.
    pub fn request_export(&mut self) -> Result<ExportJob, ExportError> {
        let base = self.base.clone().ok_or(ExportError::NoBaseImage)?;
        self.export_generation += 1;

        Ok(ExportJob {
            generation: self.export_generation,
            base,
            overlays: self.store.snapshot(),
            surface: self.config.surface(),
            resolution: self.config.export_resolution,
            timeout: self.config.flag_timeout(),
            cached: self.flag_cache.clone(),
        })
    }

    /// Settle a finished export job: cache decoded flags and check that the
    /// job is still the latest one.
    ///
    /// Returns the report to deliver, or `Ok(None)` when the result was
    /// discarded. Nothing is handed to a sink here; call
    /// [`Session::mark_delivered`] once the file is out.
    pub fn complete_export(
        &mut self,
        result: ExportResult,
    ) -> Result<Option<ExportReport>, ExportError> {
        self.flag_cache.extend(result.decoded);

        if result.generation != self.export_generation {
            log::debug!(
                "discarding export {} (latest is {})",
                result.generation,
                self.export_generation
            );
            self.emit(SessionEvent::ExportDiscarded {
                generation: result.generation,
            });
            return Ok(None);
        }

        result.outcome.map(Some)
    }

    /// Announce that `report` reached the download sink.
    pub fn mark_delivered(&self, report: &ExportReport) {
        self.emit(SessionEvent::ExportDelivered {
            filename: report.filename.clone(),
            skipped: report.skipped.len(),
        });
    }

    /// [`Session::complete_export`] followed by delivery to `sink`.
    ///
    /// The sink runs while `self` is borrowed. Sessions shared behind a
    /// `RefCell` should go through [`export_session`] instead.
    pub fn finish_export(
        &mut self,
        result: ExportResult,
        sink: &mut dyn DownloadSink,
    ) -> Result<Option<ExportReport>, ExportError> {
        let Some(report) = self.complete_export(result)? else {
            return Ok(None);
        };
        sink.deliver(&report.filename, &report.mime, &report.bytes);
        self.mark_delivered(&report);
        Ok(Some(report))
    }

    pub fn subscribe(&mut self, callback: impl FnMut(&SessionEvent) + 'static) -> SubscriberId {
        self.subscribers.borrow_mut().subscribe(callback)
    }

    pub fn unsubscribe(&mut self, id: SubscriberId) -> bool {
        self.subscribers.borrow_mut().unsubscribe(id)
    }

    fn reject(&mut self, message: String) -> SessionError {
        log::warn!("flag selection rejected: {message}");
        self.emit(SessionEvent::SelectionRejected {
            message: message.clone(),
        });
        SessionError::InvalidSelection(message)
    }

    fn emit(&self, event: SessionEvent) {
        self.subscribers.borrow_mut().emit(&event);
    }
}

/// Run a full export against a shared session.
///
/// The session is only borrowed before and after the async part, so pointer
/// events and selections can keep flowing while flags load. No borrow is
/// held while the sink runs, so it may call back into the session. Returns
/// `Ok(None)` if the export was superseded.
pub async fn export_session(
    session: &RefCell<Session>,
    fetcher: &dyn FlagFetcher,
    timer: &dyn Timer,
    sink: &mut dyn DownloadSink,
) -> Result<Option<ExportReport>, ExportError> {
    let job = session.borrow_mut().request_export()?;
    let result = job.run(fetcher, timer).await;

    let completed = session.borrow_mut().complete_export(result)?;
    let Some(report) = completed else {
        return Ok(None);
    };
    sink.deliver(&report.filename, &report.mime, &report.bytes);
    session.borrow().mark_delivered(&report);
    Ok(Some(report))
}
