//! The compositor session exposed to JavaScript.
//!
//! # Example
//!
//! ```typescript
//! import init, { Compositor } from '@flagstamp/wasm';
//!
//! await init();
//! const compositor = new Compositor({ surfaceWidth: 800, surfaceHeight: 600 });
//! compositor.onChange((event) => redraw(event));
//!
//! compositor.setBaseImage(new Uint8Array(await file.arrayBuffer()));
//! compositor.selectFlag('https://flagsapi.com/FR/flat/64.png');
//!
//! canvas.addEventListener('pointerdown', (e) => {
//!   const d = compositor.handlePointer({ phase: 'press', kind: e.pointerType,
//!     pointerId: e.pointerId, x: e.offsetX, y: e.offsetY });
//!   if (d.absorbed) e.preventDefault();
//! });
//!
//! const report = await compositor.export((filename, mime, bytes) => {
//!   const url = URL.createObjectURL(new Blob([bytes], { type: mime }));
//!   Object.assign(document.createElement('a'), { href: url, download: filename }).click();
//! });
//! ```
//!
//! Change events are queued while the session is being mutated and handed
//! to `onChange` listeners afterwards, so listeners may call back into the
//! compositor.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use flagstamp_core::session::export_session;
use flagstamp_core::{CompositorConfig, PointerEvent, Session, SessionError, SessionEvent};
use js_sys::{Function, Promise};
use serde::Serialize;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::future_to_promise;

use crate::host::{BrowserFetcher, BrowserTimer, CallbackSink};
use crate::types::JsRaster;

struct Shared {
    session: RefCell<Session>,
    queue: Rc<RefCell<Vec<SessionEvent>>>,
    listeners: RefCell<Vec<(u32, Function)>>,
    next_listener: Cell<u32>,
}

impl Shared {
    fn new(config: CompositorConfig) -> Result<Self, SessionError> {
        let queue = Rc::new(RefCell::new(Vec::new()));
        let mut session = Session::new(config)?;
        let sink = Rc::clone(&queue);
        session.subscribe(move |event| sink.borrow_mut().push(event.clone()));

        Ok(Self {
            session: RefCell::new(session),
            queue,
            listeners: RefCell::new(Vec::new()),
            next_listener: Cell::new(0),
        })
    }

    /// Deliver queued events to JS listeners. Must not be called while the
    /// session is borrowed.
    fn flush(&self) {
        let events: Vec<SessionEvent> = self.queue.borrow_mut().drain(..).collect();
        if events.is_empty() {
            return;
        }
        let listeners: Vec<Function> = self
            .listeners
            .borrow()
            .iter()
            .map(|(_, f)| f.clone())
            .collect();

        for event in &events {
            let value = match to_js(event) {
                Ok(value) => value,
                Err(_) => continue,
            };
            for listener in &listeners {
                if let Err(e) = listener.call1(&JsValue::NULL, &value) {
                    log::error!("change listener threw: {:?}", e);
                }
            }
        }
    }
}

/// Report returned by `export()`.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct JsExportReport {
    delivered: bool,
    filename: Option<String>,
    width: u32,
    height: u32,
    skipped: Vec<flagstamp_core::SkippedOverlay>,
}

/// A flag compositing session.
#[wasm_bindgen(js_name = Compositor)]
pub struct JsCompositor {
    shared: Rc<Shared>,
}

#[wasm_bindgen(js_class = Compositor)]
impl JsCompositor {
    /// Create a session.
    ///
    /// # Arguments
    /// * `config` - Optional `{ surfaceWidth, surfaceHeight, flagWidth,
    ///   flagHeight, flagTimeoutMs, exportResolution, restrictToCatalog }`
    ///
    /// # Errors
    /// Returns error if the config object cannot be deserialized or names
    /// an unusable surface or flag size
    #[wasm_bindgen(constructor)]
    pub fn new(config: JsValue) -> Result<JsCompositor, JsValue> {
        let config = parse_config(config)?;
        let shared = Shared::new(config).map_err(to_js_error)?;
        Ok(JsCompositor {
            shared: Rc::new(shared),
        })
    }

    /// Decode and display a new base image.
    ///
    /// # Errors
    /// Returns a user-facing message if the image cannot be decoded; the
    /// live surface is empty afterwards.
    #[wasm_bindgen(js_name = setBaseImage)]
    pub fn set_base_image(&self, bytes: &[u8]) -> Result<(), JsValue> {
        let result = self.shared.session.borrow_mut().set_base_image(bytes);
        self.shared.flush();
        result.map_err(to_js_error)
    }

    /// Place a new flag overlay at the surface center. Returns its handle.
    #[wasm_bindgen(js_name = selectFlag)]
    pub fn select_flag(&self, url: &str) -> Result<f64, JsValue> {
        let result = self.shared.session.borrow_mut().select_flag(url);
        self.shared.flush();
        result.map(|h| h.0 as f64).map_err(to_js_error)
    }

    /// Place a new flag overlay for a catalog country code. Returns its handle.
    #[wasm_bindgen(js_name = selectCountry)]
    pub fn select_country(&self, code: &str) -> Result<f64, JsValue> {
        let result = self.shared.session.borrow_mut().select_country(code);
        self.shared.flush();
        result.map(|h| h.0 as f64).map_err(to_js_error)
    }

    /// The most recently selected flag URL.
    #[wasm_bindgen(js_name = selectedFlag)]
    pub fn selected_flag(&self) -> Option<String> {
        self.shared
            .session
            .borrow()
            .selected_flag()
            .map(str::to_string)
    }

    /// Feed a normalized pointer event `{ phase, kind, pointerId, x, y }`.
    ///
    /// Returns `{ absorbed, moved, grabbing }`. Events that cannot be read
    /// are dropped and report nothing.
    #[wasm_bindgen(js_name = handlePointer)]
    pub fn handle_pointer(&self, event: JsValue) -> Result<JsValue, JsValue> {
        let disposition = match serde_wasm_bindgen::from_value::<PointerEvent>(event) {
            Ok(event) => self.shared.session.borrow_mut().handle_pointer(&event),
            Err(e) => {
                log::debug!("dropping malformed pointer event: {}", e);
                Default::default()
            }
        };
        self.shared.flush();
        to_js(&disposition)
    }

    /// Overlays in z-order: `[{ handle, url, x, y, width, height }]`.
    pub fn overlays(&self) -> Result<JsValue, JsValue> {
        to_js(&self.shared.session.borrow().overlays())
    }

    /// The live surface raster, or `undefined` without a base image.
    #[wasm_bindgen(js_name = liveRaster)]
    pub fn live_raster(&self) -> Option<JsRaster> {
        self.shared
            .session
            .borrow()
            .live_raster()
            .map(JsRaster::from_rgba)
    }

    /// Resize the editing surface; overlays are re-clamped.
    ///
    /// # Errors
    /// Returns error for non-finite, negative or oversized dimensions
    #[wasm_bindgen(js_name = resizeSurface)]
    pub fn resize_surface(&self, width: f64, height: f64) -> Result<(), JsValue> {
        let result = self.shared.session.borrow_mut().resize_surface(width, height);
        self.shared.flush();
        result.map_err(to_js_error)
    }

    /// Clear overlays, base image and selection.
    pub fn reset(&self) {
        self.shared.session.borrow_mut().reset();
        self.shared.flush();
    }

    /// Export the composite as PNG.
    ///
    /// `download` is called as `download(filename, mime, bytes)` exactly
    /// once if the export completes and is not superseded by a later call.
    /// The returned promise resolves to
    /// `{ delivered, filename, width, height, skipped }`.
    pub fn export(&self, download: Function) -> Promise {
        let shared = Rc::clone(&self.shared);
        future_to_promise(async move {
            let mut sink = CallbackSink::new(download);
            let result =
                export_session(&shared.session, &BrowserFetcher, &BrowserTimer, &mut sink).await;
            shared.flush();

            let report = match result.map_err(to_js_error)? {
                Some(report) => JsExportReport {
                    delivered: true,
                    filename: Some(report.filename),
                    width: report.width,
                    height: report.height,
                    skipped: report.skipped,
                },
                None => JsExportReport {
                    delivered: false,
                    filename: None,
                    width: 0,
                    height: 0,
                    skipped: Vec::new(),
                },
            };
            to_js(&report)
        })
    }

    /// Register a change listener. Returns an id for `offChange`.
    #[wasm_bindgen(js_name = onChange)]
    pub fn on_change(&self, listener: Function) -> u32 {
        let id = self.shared.next_listener.get();
        self.shared.next_listener.set(id + 1);
        self.shared.listeners.borrow_mut().push((id, listener));
        id
    }

    /// Remove a change listener.
    #[wasm_bindgen(js_name = offChange)]
    pub fn off_change(&self, id: u32) -> bool {
        let mut listeners = self.shared.listeners.borrow_mut();
        let before = listeners.len();
        listeners.retain(|(listener_id, _)| *listener_id != id);
        listeners.len() != before
    }
}

fn parse_config(value: JsValue) -> Result<CompositorConfig, JsValue> {
    if value.is_undefined() || value.is_null() {
        return Ok(CompositorConfig::default());
    }
    serde_wasm_bindgen::from_value(value)
        .map_err(|e| JsValue::from_str(&format!("Invalid compositor config: {}", e)))
}

fn to_js<T: Serialize + ?Sized>(value: &T) -> Result<JsValue, JsValue> {
    value
        .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
        .map_err(|e| JsValue::from_str(&e.to_string()))
}

fn to_js_error(error: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&error.to_string())
}
