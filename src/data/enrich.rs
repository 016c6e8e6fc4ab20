//! Forecast normalizer
//!
//! Enriches the raw API payload with derived display fields: icon classes,
//! floored temperatures, unit labels, and summary placeholders. Enrichment is
//! pure — same payload and options always produce the same output — and never
//! mutates the raw payload.

use serde_json::{Map, Value};
use thiserror::Error;

use super::{DataPoint, EnrichedForecast, EnrichedRecord, ForecastPayload, Units};

/// Number of daily records every render works with
const DAILY_RECORD_COUNT: usize = 7;

/// Placeholder shown when a source field is absent
const MISSING_VALUE: &str = "--";

/// Icon class for condition codes absent from the mapping table
const UNMAPPED_ICON: &str = "wi-alien";

/// Fixed mapping from API condition codes to icon classes
const ICON_CLASSES: &[(&str, &str)] = &[
    ("clear-day", "wi-day-sunny"),
    ("clear-night", "wi-night-clear"),
    ("rain", "wi-rain"),
    ("snow", "wi-snow"),
    ("sleet", "wi-hail"),
    ("wind", "wi-windy"),
    ("fog", "wi-fog"),
    ("cloudy", "wi-cloudy"),
    ("partly-cloudy-day", "wi-day-cloudy"),
    ("partly-cloudy-night", "wi-night-partly-cloudy"),
];

/// Errors that can occur while enriching a payload
#[derive(Debug, Error)]
pub enum EnrichError {
    /// The daily section held fewer records than a render needs
    #[error("Daily forecast has {got} records, expected at least {DAILY_RECORD_COUNT}")]
    TruncatedDaily {
        /// Number of daily records the payload actually carried
        got: usize,
    },

    /// A record could not be flattened into a field map
    #[error("Failed to flatten forecast record: {0}")]
    Flatten(#[from] serde_json::Error),
}

/// Options controlling enrichment
#[derive(Debug, Clone, Copy, Default)]
pub struct EnrichOptions {
    /// Unit system the forecast was requested with
    pub units: Units,
    /// Collapse night-only condition variants into daytime equivalents
    pub day_conditions_only: bool,
}

/// Maps a condition code to its icon class
///
/// Codes absent from the table resolve to the `wi-alien` sentinel.
pub fn icon_class(code: &str) -> &'static str {
    ICON_CLASSES
        .iter()
        .find(|(candidate, _)| *candidate == code)
        .map(|(_, class)| *class)
        .unwrap_or(UNMAPPED_ICON)
}

/// Enriches a decoded payload for template substitution
///
/// Produces the current-conditions record plus exactly 7 daily records.
/// Records beyond the first 7 are ignored; fewer than 7 is a fatal
/// precondition failure for the render.
///
/// # Arguments
/// * `payload` - The raw decoded forecast
/// * `options` - Active unit system and display rules
///
/// # Returns
/// * `Ok(EnrichedForecast)` - Flat records with derived fields added
/// * `Err(EnrichError)` - Truncated daily data or a malformed record
pub fn enrich(
    payload: &ForecastPayload,
    options: &EnrichOptions,
) -> Result<EnrichedForecast, EnrichError> {
    if payload.daily.data.len() < DAILY_RECORD_COUNT {
        return Err(EnrichError::TruncatedDaily {
            got: payload.daily.data.len(),
        });
    }

    let currently = enrich_current(&payload.currently, payload.daily.summary.as_deref(), options)?;

    let daily = payload.daily.data[..DAILY_RECORD_COUNT]
        .iter()
        .map(|point| enrich_daily(point, options))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(EnrichedForecast { currently, daily })
}

/// Enriches the current-conditions record
fn enrich_current(
    point: &DataPoint,
    week_summary: Option<&str>,
    options: &EnrichOptions,
) -> Result<EnrichedRecord, EnrichError> {
    let mut fields = flatten(point)?;
    let icon = effective_icon(point.icon.as_deref(), options);

    insert_icon_fields(&mut fields, icon.as_deref());
    fields.insert("temperatureFloor".to_string(), floor_value(point.temperature));
    fields.insert(
        "summary".to_string(),
        Value::from(point.summary.as_deref().unwrap_or(MISSING_VALUE)),
    );
    fields.insert(
        "weekSummary".to_string(),
        Value::from(week_summary.unwrap_or(MISSING_VALUE)),
    );
    fields.insert(
        "temperatureUnit".to_string(),
        Value::from(options.units.temperature_unit()),
    );

    Ok(fields.into())
}

/// Enriches a single daily record
fn enrich_daily(point: &DataPoint, options: &EnrichOptions) -> Result<EnrichedRecord, EnrichError> {
    let mut fields = flatten(point)?;
    let icon = effective_icon(point.icon.as_deref(), options);

    insert_icon_fields(&mut fields, icon.as_deref());
    fields.insert(
        "temperatureMaxFloor".to_string(),
        floor_value(point.temperature_max),
    );
    fields.insert(
        "temperatureMinFloor".to_string(),
        floor_value(point.temperature_min),
    );
    fields.insert(
        "temperatureFloor".to_string(),
        average_floor(point.temperature_max, point.temperature_min),
    );
    fields.insert(
        "temperatureUnit".to_string(),
        Value::from(options.units.temperature_unit()),
    );

    Ok(fields.into())
}

/// Serializes a record into a flat field map
fn flatten(point: &DataPoint) -> Result<Map<String, Value>, serde_json::Error> {
    match serde_json::to_value(point)? {
        Value::Object(map) => Ok(map),
        // DataPoint always serializes to an object
        _ => Ok(Map::new()),
    }
}

/// Applies the day-conditions-only rewrite before icon mapping
fn effective_icon(icon: Option<&str>, options: &EnrichOptions) -> Option<String> {
    match icon {
        Some("partly-cloudy-night") if options.day_conditions_only => {
            Some("clear-day".to_string())
        }
        other => other.map(str::to_string),
    }
}

/// Writes the (possibly rewritten) condition code and its icon class
fn insert_icon_fields(fields: &mut Map<String, Value>, icon: Option<&str>) {
    if let Some(code) = icon {
        fields.insert("icon".to_string(), Value::from(code));
    }
    fields.insert(
        "wicon".to_string(),
        Value::from(icon.map(icon_class).unwrap_or(UNMAPPED_ICON)),
    );
}

/// Floors a temperature, or yields the `--` placeholder when absent
fn floor_value(value: Option<f64>) -> Value {
    match value {
        Some(n) => Value::from(n.floor() as i64),
        None => Value::from(MISSING_VALUE),
    }
}

/// Floors the average of the max/min floors, only when both are present
fn average_floor(max: Option<f64>, min: Option<f64>) -> Value {
    match (max, min) {
        (Some(max), Some(min)) => {
            Value::from(((max.floor() + min.floor()) / 2.0).floor() as i64)
        }
        _ => Value::from(MISSING_VALUE),
    }
}
