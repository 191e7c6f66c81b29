//! Flag Stamp WASM - WebAssembly bindings for Flag Stamp
//!
//! This crate exposes the flagstamp-core compositing engine to
//! JavaScript/TypeScript applications.
//!
//! # Module Structure
//!
//! - `compositor` - the `Compositor` session class (base image, flag
//!   selection, pointer input, export)
//! - `catalog` - the built-in flag catalog
//! - `host` - browser fetch/timer/download adapters
//! - `logger` - `log` records forwarded to the browser console
//! - `types` - WASM-compatible raster wrapper
//!
//! # Usage
//!
//! ```typescript
//! import init, { Compositor, sampleFlags } from '@flagstamp/wasm';
//!
//! // Initialize WASM module (must call first)
//! await init();
//!
//! const compositor = new Compositor();
//! compositor.setBaseImage(new Uint8Array(await file.arrayBuffer()));
//! compositor.selectFlag(sampleFlags()[0].url);
//! ```

use wasm_bindgen::prelude::*;

mod catalog;
mod compositor;
mod host;
mod logger;
mod types;

// Re-export public types
pub use catalog::{flag_catalog, flag_url, sample_flags};
pub use compositor::JsCompositor;
pub use host::{BrowserFetcher, BrowserTimer, CallbackSink};
pub use logger::set_log_level;
pub use types::JsRaster;

/// Initialize the WASM module (called automatically on load)
#[wasm_bindgen(start)]
pub fn init() {
    logger::init(log::LevelFilter::Info);
}

/// Get the version of the WASM module
#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!version().is_empty());
    }
}
