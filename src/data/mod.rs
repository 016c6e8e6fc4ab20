//! Core data model for the forecast widget
//!
//! This module contains the data types used throughout the pipeline: the
//! per-render query, the raw decoded API payload, and the enriched flat
//! records consumed by the template engine.

pub mod enrich;
pub mod forecast;

pub use enrich::{enrich, EnrichError, EnrichOptions};
pub use forecast::{FetchError, ForecastClient};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

/// Unit systems supported by the forecast API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Units {
    /// Select automatically based on geographic location
    #[default]
    Auto,
    /// Canada
    Ca,
    /// Standard International Units
    Si,
    /// United Kingdom
    Uk,
    /// United States
    Us,
}

impl Units {
    /// Returns the identifier used in API query parameters
    pub fn as_str(self) -> &'static str {
        match self {
            Units::Auto => "auto",
            Units::Ca => "ca",
            Units::Si => "si",
            Units::Uk => "uk",
            Units::Us => "us",
        }
    }

    /// Returns the temperature unit label for this unit system
    ///
    /// `Auto` carries no label because the effective unit depends on the
    /// location the API resolves at request time.
    pub fn temperature_unit(self) -> &'static str {
        match self {
            Units::Auto => "",
            Units::Ca => "F",
            Units::Si => "C",
            Units::Uk => "C",
            Units::Us => "F",
        }
    }

    /// Parses a unit-system identifier (as stored in widget options)
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "auto" => Some(Units::Auto),
            "ca" => Some(Units::Ca),
            "si" => Some(Units::Si),
            "uk" => Some(Units::Uk),
            "us" => Some(Units::Us),
            _ => None,
        }
    }
}

/// Language codes accepted by the forecast API
pub const SUPPORTED_LANGUAGES: &[&str] = &[
    "en",
    "bs",
    "de",
    "es",
    "fr",
    "it",
    "nl",
    "pl",
    "pt",
    "ru",
    "tet",
    "x-pig-latin",
];

/// Response sections excluded from every forecast request
pub const DEFAULT_EXCLUDE: &[&str] = &["flags", "minutely", "hourly"];

/// A single forecast request, constructed per render
///
/// Immutable once built; the cache fingerprint is derived from all of its
/// semantically relevant fields.
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastQuery {
    /// Latitude coordinate
    pub latitude: f64,
    /// Longitude coordinate
    pub longitude: f64,
    /// Unit system to request
    pub units: Units,
    /// Language code for summaries
    pub lang: String,
    /// Response sections to exclude
    pub exclude: Vec<String>,
}

impl ForecastQuery {
    /// Creates a query for the given coordinates with the default exclusions
    pub fn new(latitude: f64, longitude: f64, units: Units, lang: impl Into<String>) -> Self {
        Self {
            latitude,
            longitude,
            units,
            lang: lang.into(),
            exclude: DEFAULT_EXCLUDE.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Computes the cache fingerprint for this query
    ///
    /// SHA-256 over latitude, longitude, a fixed `null` time placeholder, and
    /// the query options in a fixed field order. Exclusions are sorted before
    /// hashing so that semantically identical queries always produce the same
    /// fingerprint regardless of construction order.
    pub fn fingerprint(&self) -> String {
        let mut exclude = self.exclude.clone();
        exclude.sort();

        let mut hasher = Sha256::new();
        hasher.update(self.latitude.to_string().as_bytes());
        hasher.update(b"|");
        hasher.update(self.longitude.to_string().as_bytes());
        hasher.update(b"|null|");
        hasher.update(self.units.as_str().as_bytes());
        hasher.update(b"|");
        hasher.update(self.lang.as_bytes());
        hasher.update(b"|");
        hasher.update(exclude.join(",").as_bytes());
        format!("{:x}", hasher.finalize())
    }
}

/// A single forecast record as returned by the API
///
/// Known fields are typed and optional; everything else the API returns is
/// kept in `extra` so user templates can reference any field by name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataPoint {
    /// Unix timestamp of the record
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time: Option<i64>,
    /// Machine-readable condition code (e.g. `partly-cloudy-day`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    /// Human-readable condition summary
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    /// Instantaneous temperature (current conditions only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    /// Daily maximum temperature
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature_max: Option<f64>,
    /// Daily minimum temperature
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature_min: Option<f64>,
    /// Every other scalar field from the API, preserved verbatim
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// The `daily` section of the payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyBlock {
    /// Week-level summary text
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    /// Per-day records, index 0 = today
    pub data: Vec<DataPoint>,
}

/// Raw decoded forecast payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastPayload {
    /// Instantaneous conditions
    pub currently: DataPoint,
    /// Daily forecast block
    pub daily: DailyBlock,
}

/// A flat field-name to value record with derived display fields added
///
/// Produced by [`enrich`]; consumed by the template engine and the
/// substitution debug table.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EnrichedRecord {
    fields: Map<String, Value>,
}

impl EnrichedRecord {
    /// Creates an empty record
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks up a field by name
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Returns the record's unix timestamp, if it has one
    pub fn time(&self) -> Option<i64> {
        self.fields.get("time").and_then(Value::as_i64)
    }

    /// Inserts or replaces a field
    pub fn insert(&mut self, name: impl Into<String>, value: Value) {
        self.fields.insert(name.into(), value);
    }

    /// Iterates over all fields in name order
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.fields.iter()
    }
}

impl From<Map<String, Value>> for EnrichedRecord {
    fn from(fields: Map<String, Value>) -> Self {
        Self { fields }
    }
}

/// Enriched payload ready for template substitution
///
/// `daily` always holds exactly 7 records; a payload with fewer is rejected
/// during enrichment.
#[derive(Debug, Clone, PartialEq)]
pub struct EnrichedForecast {
    /// Enriched current conditions
    pub currently: EnrichedRecord,
    /// Enriched daily records, index 0 = today
    pub daily: Vec<EnrichedRecord>,
}
