//! Flag catalog bindings.
//!
//! ```typescript
//! import { flagCatalog, sampleFlags, flagUrl } from '@flagstamp/wasm';
//!
//! const all = flagCatalog();    // [{ code, name, url }] sorted by name
//! const grid = sampleFlags();   // initial 10 flags for the grid
//! flagUrl('SE');                // "https://flagsapi.com/SE/flat/64.png"
//! ```

use flagstamp_core::catalog;
use wasm_bindgen::prelude::*;

/// All catalog entries, sorted by country name.
#[wasm_bindgen(js_name = flagCatalog)]
pub fn flag_catalog() -> Result<JsValue, JsValue> {
    serde_wasm_bindgen::to_value(&catalog::entries()).map_err(|e| JsValue::from_str(&e.to_string()))
}

/// The initial sample of flags shown in the grid.
#[wasm_bindgen(js_name = sampleFlags)]
pub fn sample_flags() -> Result<JsValue, JsValue> {
    serde_wasm_bindgen::to_value(&catalog::sample_entries())
        .map_err(|e| JsValue::from_str(&e.to_string()))
}

/// Flag image URL for a country code.
#[wasm_bindgen(js_name = flagUrl)]
pub fn flag_url(code: &str) -> String {
    catalog::flag_url(code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_url() {
        assert_eq!(flag_url("no"), "https://flagsapi.com/NO/flat/64.png");
    }
}

#[cfg(all(test, target_arch = "wasm32"))]
mod wasm_tests {
    use super::*;
    use wasm_bindgen_test::*;

    wasm_bindgen_test_configure!(run_in_browser);

    #[wasm_bindgen_test]
    fn test_flag_catalog_roundtrip() {
        let entries: Vec<catalog::FlagEntry> =
            serde_wasm_bindgen::from_value(flag_catalog().unwrap()).unwrap();
        assert_eq!(entries.len(), catalog::COUNTRIES.len());
        assert_eq!(entries[0].name, "Albania");
    }

    #[wasm_bindgen_test]
    fn test_sample_flags() {
        let entries: Vec<catalog::FlagEntry> =
            serde_wasm_bindgen::from_value(sample_flags().unwrap()).unwrap();
        assert_eq!(entries.len(), 10);
    }
}
