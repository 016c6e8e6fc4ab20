//! Widget configuration
//!
//! Explicit configuration structs for the pipeline. The host CMS keeps these
//! values in its settings and per-widget option stores; this crate receives
//! them as plain structs so the pure stages (normalizer, template engine)
//! never perform ambient lookups.

use std::collections::HashMap;
use std::time::Duration;

use crate::data::Units;

/// Cache period applied when the deployment does not configure one
pub const DEFAULT_CACHE_PERIOD: Duration = Duration::from_secs(300);

/// HTTP proxy settings from the deployment configuration
#[derive(Debug, Clone)]
pub struct ProxyConfig {
    /// Proxy host name
    pub host: String,
    /// Proxy port
    pub port: u16,
    /// Optional `user:password` credentials
    pub auth: Option<String>,
    /// Hosts contacted directly, bypassing the proxy
    pub exceptions: Vec<String>,
}

/// Module-level settings shared by every widget of this type
#[derive(Debug, Clone)]
pub struct WidgetSettings {
    /// API key for the forecast service
    pub api_key: String,
    /// How long fetched forecasts stay cached
    pub cache_period: Duration,
}

impl WidgetSettings {
    /// Creates settings with the default cache period
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            cache_period: DEFAULT_CACHE_PERIOD,
        }
    }
}

/// Deployment-wide fallback coordinates (DEFAULT_LAT / DEFAULT_LONG)
#[derive(Debug, Clone, Copy)]
pub struct Defaults {
    /// Fallback latitude
    pub latitude: f64,
    /// Fallback longitude
    pub longitude: f64,
}

/// A resolved display location
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinates {
    /// Latitude coordinate
    pub latitude: f64,
    /// Longitude coordinate
    pub longitude: f64,
}

/// Per-widget options, as stored by the host CMS
#[derive(Debug, Clone)]
pub struct WidgetOptions {
    /// Use the location configured on the display instead of the widget's
    pub use_display_location: bool,
    /// Widget-level latitude override
    pub latitude: Option<f64>,
    /// Widget-level longitude override
    pub longitude: Option<f64>,
    /// Unit system to request
    pub units: Units,
    /// Language code for summaries
    pub lang: String,
    /// Icon-set identifier (path prefix for the icon stylesheet)
    pub icons: String,
    /// Zoom factor applied to the rendered content
    pub size: f64,
    /// Collapse night-only condition variants into daytime equivalents
    pub day_conditions_only: bool,
    /// Foreground text colour
    pub color: String,
    /// Display-side refresh interval in minutes
    pub update_interval: u64,
    /// Whether the stored templates override the selected stock template
    pub override_template: bool,
    /// Identifier of the selected stock template
    pub template_id: Option<String>,
    /// Template for the current forecast; may contain `[dailyForecast]`
    pub current_template: String,
    /// Template substituted once per daily record
    pub daily_template: String,
    /// User CSS appended to the widget's style block
    pub style_sheet: String,
}

impl Default for WidgetOptions {
    fn default() -> Self {
        Self {
            use_display_location: false,
            latitude: None,
            longitude: None,
            units: Units::Auto,
            lang: "en".to_string(),
            icons: String::new(),
            size: 1.0,
            day_conditions_only: true,
            color: "#000".to_string(),
            update_interval: 60,
            override_template: false,
            template_id: None,
            current_template: String::new(),
            daily_template: String::new(),
            style_sheet: String::new(),
        }
    }
}

/// Resolves the configured location of a display
///
/// Display id 0 is reserved for "no concrete display"; callers fall back to
/// the widget or deployment coordinates instead of querying the registry.
pub trait DisplayRegistry {
    /// Returns the coordinates configured for a display, if known
    fn location(&self, display_id: u64) -> Option<Coordinates>;
}

/// A fixed in-memory display registry
///
/// Used by the demo binary and tests; a CMS integration would implement
/// [`DisplayRegistry`] against its own display store.
#[derive(Debug, Clone, Default)]
pub struct StaticDisplays {
    locations: HashMap<u64, Coordinates>,
}

impl StaticDisplays {
    /// Creates an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a display location
    pub fn insert(&mut self, display_id: u64, coordinates: Coordinates) {
        self.locations.insert(display_id, coordinates);
    }
}

impl DisplayRegistry for StaticDisplays {
    fn location(&self, display_id: u64) -> Option<Coordinates> {
        self.locations.get(&display_id).copied()
    }
}
