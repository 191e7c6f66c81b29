//! Built-in flag catalog.
//!
//! Maps two-letter country codes to flag image URLs served by
//! flagsapi.com. The compositing engine treats URLs as opaque; the catalog
//! is only consulted to resolve country codes and, when configured, to
//! reject URLs it did not produce.

use serde::{Deserialize, Serialize};

const FLAG_URL_PREFIX: &str = "https://flagsapi.com/";
const FLAG_URL_SUFFIX: &str = "/flat/64.png";

/// A country that has a flag in the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Country {
    pub code: &'static str,
    pub name: &'static str,
}

/// Catalog entry as exposed to the UI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlagEntry {
    pub code: String,
    pub name: String,
    pub url: String,
}

/// Participating countries, sorted by name.
pub const COUNTRIES: &[Country] = &[
    Country { code: "AL", name: "Albania" },
    Country { code: "AM", name: "Armenia" },
    Country { code: "AU", name: "Australia" },
    Country { code: "AT", name: "Austria" },
    Country { code: "AZ", name: "Azerbaijan" },
    Country { code: "BE", name: "Belgium" },
    Country { code: "HR", name: "Croatia" },
    Country { code: "CY", name: "Cyprus" },
    Country { code: "CZ", name: "Czechia" },
    Country { code: "DK", name: "Denmark" },
    Country { code: "EE", name: "Estonia" },
    Country { code: "FI", name: "Finland" },
    Country { code: "FR", name: "France" },
    Country { code: "GE", name: "Georgia" },
    Country { code: "DE", name: "Germany" },
    Country { code: "GR", name: "Greece" },
    Country { code: "IS", name: "Iceland" },
    Country { code: "IE", name: "Ireland" },
    Country { code: "IL", name: "Israel" },
    Country { code: "IT", name: "Italy" },
    Country { code: "LV", name: "Latvia" },
    Country { code: "LT", name: "Lithuania" },
    Country { code: "LU", name: "Luxembourg" },
    Country { code: "MT", name: "Malta" },
    Country { code: "ME", name: "Montenegro" },
    Country { code: "NL", name: "Netherlands" },
    Country { code: "NO", name: "Norway" },
    Country { code: "PL", name: "Poland" },
    Country { code: "PT", name: "Portugal" },
    Country { code: "SM", name: "San Marino" },
    Country { code: "RS", name: "Serbia" },
    Country { code: "SI", name: "Slovenia" },
    Country { code: "ES", name: "Spain" },
    Country { code: "SE", name: "Sweden" },
    Country { code: "CH", name: "Switzerland" },
    Country { code: "UA", name: "Ukraine" },
    Country { code: "GB", name: "United Kingdom" },
];

/// Countries shown in the flag grid before the user picks any.
pub const SAMPLE_CODES: &[&str] = &["FR", "DE", "IT", "ES", "GB", "SE", "UA", "CH", "NO", "NL"];

/// Flag image URL for a country code. The code is not validated.
pub fn flag_url(code: &str) -> String {
    format!("{FLAG_URL_PREFIX}{}{FLAG_URL_SUFFIX}", code.to_ascii_uppercase())
}

/// Look up a country by code, case-insensitively.
pub fn find_country(code: &str) -> Option<&'static Country> {
    let code = code.trim();
    COUNTRIES.iter().find(|c| c.code.eq_ignore_ascii_case(code))
}

/// Resolve a country code to its catalog entry.
pub fn lookup(code: &str) -> Option<FlagEntry> {
    find_country(code).map(entry_for)
}

/// True if `url` is a flag URL for a country in the catalog.
pub fn recognizes_url(url: &str) -> bool {
    url.strip_prefix(FLAG_URL_PREFIX)
        .and_then(|rest| rest.strip_suffix(FLAG_URL_SUFFIX))
        .is_some_and(|code| COUNTRIES.iter().any(|c| c.code == code))
}

/// All catalog entries, sorted by country name.
pub fn entries() -> Vec<FlagEntry> {
    COUNTRIES.iter().map(entry_for).collect()
}

/// The initial sample shown in the flag grid.
pub fn sample_entries() -> Vec<FlagEntry> {
    SAMPLE_CODES.iter().filter_map(|code| lookup(code)).collect()
}

fn entry_for(country: &Country) -> FlagEntry {
    FlagEntry {
        code: country.code.to_string(),
        name: country.name.to_string(),
        url: flag_url(country.code),
    }
}
