//! Rendering assembly
//!
//! Glue around the pipeline: resolves the render location, acquires the
//! forecast through the cache, enriches it, applies the user templates, and
//! wraps the result in a head/body/script document fragment for the host to
//! embed. Also produces the substitution debug table used for template
//! authoring.

use std::sync::Arc;
use std::time::Duration;

use chrono::{Local, TimeZone};
use thiserror::Error;
use tracing::error;

use crate::cache::ForecastCache;
use crate::config::{Coordinates, Defaults, DisplayRegistry, WidgetOptions, WidgetSettings};
use crate::data::{enrich, EnrichError, EnrichOptions, EnrichedForecast, EnrichedRecord};
use crate::data::{FetchError, ForecastClient, ForecastQuery};
use crate::template::{display_value, expand_daily, substitute};

/// Date format applied to `*time*` values in the substitution table
const TABLE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Errors that can occur while acquiring a forecast for a render
///
/// `render` absorbs these into an empty output string; `forecast` and
/// `substitutions` surface them so callers and tests can assert on the
/// failure kind instead of parsing logs.
#[derive(Debug, Error)]
pub enum WidgetError {
    /// No API key is configured for the widget
    #[error("Widget is missing an API key")]
    MissingApiKey,

    /// The remote fetch failed
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// The payload could not be enriched
    #[error(transparent)]
    Enrich(#[from] EnrichError),
}

/// One row of the substitution debug table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubstitutionRow {
    /// Forecast section the field belongs to
    pub section: &'static str,
    /// Substitution key as used in templates
    pub key: String,
    /// Current value, stringified for display
    pub value: String,
}

/// The forecast widget: acquisition pipeline plus rendering assembly
pub struct WeatherWidget<R> {
    settings: WidgetSettings,
    defaults: Defaults,
    options: WidgetOptions,
    client: ForecastClient,
    cache: Arc<ForecastCache>,
    displays: R,
}

impl<R: DisplayRegistry> WeatherWidget<R> {
    /// Creates a widget from its configuration and collaborators
    pub fn new(
        settings: WidgetSettings,
        defaults: Defaults,
        options: WidgetOptions,
        client: ForecastClient,
        cache: Arc<ForecastCache>,
        displays: R,
    ) -> Self {
        Self {
            settings,
            defaults,
            options,
            client,
            cache,
            displays,
        }
    }

    /// Resolves the coordinates to forecast for
    ///
    /// With `use_display_location` set and a concrete display (id != 0), the
    /// display's configured location wins; otherwise the widget-level
    /// coordinates apply, falling back to the deployment defaults.
    fn resolve_coordinates(&self, display_id: u64) -> Coordinates {
        let defaults = Coordinates {
            latitude: self.defaults.latitude,
            longitude: self.defaults.longitude,
        };

        if self.options.use_display_location {
            if display_id != 0 {
                return self.displays.location(display_id).unwrap_or(defaults);
            }
            return defaults;
        }

        Coordinates {
            latitude: self.options.latitude.unwrap_or(defaults.latitude),
            longitude: self.options.longitude.unwrap_or(defaults.longitude),
        }
    }

    /// Acquires the enriched forecast for a display
    ///
    /// Cache hit within the configured cache period skips the remote call;
    /// a miss fetches, caches on success, and propagates failures uncached.
    pub async fn forecast(&self, display_id: u64) -> Result<EnrichedForecast, WidgetError> {
        if self.settings.api_key.is_empty() {
            return Err(WidgetError::MissingApiKey);
        }

        let coordinates = self.resolve_coordinates(display_id);
        let query = ForecastQuery::new(
            coordinates.latitude,
            coordinates.longitude,
            self.options.units,
            self.options.lang.clone(),
        );

        let payload = self
            .cache
            .get_or_fetch(&query, self.cache_period(), || {
                self.client.fetch(&query, &self.settings.api_key)
            })
            .await?;

        let enriched = enrich(
            &payload,
            &EnrichOptions {
                units: self.options.units,
                day_conditions_only: self.options.day_conditions_only,
            },
        )?;
        Ok(enriched)
    }

    /// Renders the widget for a display
    ///
    /// Any acquisition failure is logged and absorbed into an empty string;
    /// the caller decides what to show instead.
    pub async fn render(&self, display_id: u64) -> String {
        match self.forecast(display_id).await {
            Ok(forecast) => self.assemble(&forecast),
            Err(e) => {
                error!("Unable to render forecast for display {display_id}: {e}");
                String::new()
            }
        }
    }

    /// Builds the substitution debug table for a display
    ///
    /// Enumerates every available field of the current record and the first
    /// daily record, for template-authoring assistance. Keys containing
    /// `time` are rendered as local date strings.
    pub async fn substitutions(
        &self,
        display_id: u64,
    ) -> Result<Vec<SubstitutionRow>, WidgetError> {
        let forecast = self.forecast(display_id).await?;

        let mut rows = Vec::new();
        push_record_rows(&mut rows, "Current", &forecast.currently);
        if let Some(today) = forecast.daily.first() {
            push_record_rows(&mut rows, "Daily", today);
        }
        Ok(rows)
    }

    /// Assembles the final document fragment around the substituted body
    fn assemble(&self, forecast: &EnrichedForecast) -> String {
        let head = self.head_content();

        let body = expand_daily(
            &self.options.current_template,
            &forecast.daily,
            &self.options.daily_template,
        );
        // The current record substitutes over the whole body, expanded daily
        // content included, so daily leftovers get a second resolution pass.
        let body = substitute(&forecast.currently, &body);

        let script = self.script_content();

        format!(
            "<!DOCTYPE html>\n<html>\n<head>\n{head}\n</head>\n<body>\n\
             <div class=\"container\"><div id=\"content\">{body}</div></div>\n\
             {script}\n</body>\n</html>\n"
        )
    }

    /// Builds the head fragment: icon stylesheet, widget style block, user CSS
    fn head_content(&self) -> String {
        format!(
            "<link href=\"{}weather-icons.min.css\" rel=\"stylesheet\" media=\"screen\">\n\
             <style type=\"text/css\">\n\
             .container {{ color: {}; }}\n\
             #content {{ zoom: {}; }}\n\
             {}\n\
             </style>",
            icon_path_prefix(&self.options.icons),
            self.options.color,
            self.options.size,
            self.options.style_sheet,
        )
    }

    /// Builds the script block carrying the scaling options
    fn script_content(&self) -> String {
        let scale_options = serde_json::json!({
            "zoom": self.options.size,
            "updateInterval": self.options.update_interval,
        });
        format!(
            "<script type=\"text/javascript\">\nvar options = {scale_options};\n</script>"
        )
    }

    /// Effective cache period for this widget
    fn cache_period(&self) -> Duration {
        self.settings.cache_period
    }
}

/// Appends one table row per record field
fn push_record_rows(rows: &mut Vec<SubstitutionRow>, section: &'static str, record: &EnrichedRecord) {
    for (key, value) in record.iter() {
        let value = if key.to_lowercase().contains("time") {
            value
                .as_i64()
                .and_then(|ts| Local.timestamp_opt(ts, 0).single())
                .map(|local| local.format(TABLE_TIME_FORMAT).to_string())
                .unwrap_or_else(|| display_value(value))
        } else {
            display_value(value)
        };

        rows.push(SubstitutionRow {
            section,
            key: key.clone(),
            value,
        });
    }
}

/// Normalizes the icon-set id into a stylesheet path prefix
fn icon_path_prefix(icons: &str) -> String {
    if icons.is_empty() || icons.ends_with('/') {
        icons.to_string()
    } else {
        format!("{icons}/")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StaticDisplays;
    use crate::data::{ForecastPayload, Units};

    /// Sample payload with 7 daily entries for render tests
    const SAMPLE_PAYLOAD: &str = r#"{
        "currently": {
            "time": 1720000000,
            "icon": "clear-day",
            "summary": "Clear",
            "temperature": 22.6
        },
        "daily": {
            "summary": "Sunny all week.",
            "data": [
                {"time": 1720000000, "icon": "clear-day", "temperatureMax": 70.9, "temperatureMin": 60.2},
                {"time": 1720086400, "icon": "clear-day", "temperatureMax": 71.9, "temperatureMin": 61.2},
                {"time": 1720172800, "icon": "clear-day", "temperatureMax": 72.9, "temperatureMin": 62.2},
                {"time": 1720259200, "icon": "clear-day", "temperatureMax": 73.9, "temperatureMin": 63.2},
                {"time": 1720345600, "icon": "clear-day", "temperatureMax": 74.9, "temperatureMin": 64.2},
                {"time": 1720432000, "icon": "clear-day", "temperatureMax": 75.9, "temperatureMin": 65.2},
                {"time": 1720518400, "icon": "clear-day", "temperatureMax": 76.9, "temperatureMin": 66.2}
            ]
        }
    }"#;

    fn sample_payload() -> ForecastPayload {
        serde_json::from_str(SAMPLE_PAYLOAD).expect("Failed to parse sample payload")
    }

    fn widget(options: WidgetOptions, api_key: &str) -> WeatherWidget<StaticDisplays> {
        let cache = Arc::new(ForecastCache::new());
        widget_with_cache(options, api_key, cache)
    }

    fn widget_with_cache(
        options: WidgetOptions,
        api_key: &str,
        cache: Arc<ForecastCache>,
    ) -> WeatherWidget<StaticDisplays> {
        let mut displays = StaticDisplays::new();
        displays.insert(
            5,
            Coordinates {
                latitude: 51.5072,
                longitude: -0.1276,
            },
        );

        WeatherWidget::new(
            WidgetSettings::new(api_key),
            Defaults {
                latitude: 49.2827,
                longitude: -123.1207,
            },
            options,
            ForecastClient::with_base_url("http://127.0.0.1:1/".into()),
            cache,
            displays,
        )
    }

    /// Seeds the cache so acquisition never touches the network
    fn seed_cache(cache: &ForecastCache, options: &WidgetOptions, coordinates: Coordinates) {
        let query = ForecastQuery::new(
            coordinates.latitude,
            coordinates.longitude,
            options.units,
            options.lang.clone(),
        );
        cache.put(
            query.fingerprint(),
            sample_payload(),
            Duration::from_secs(300),
        );
    }

    #[test]
    fn test_resolve_coordinates_widget_options_win() {
        let widget = widget(
            WidgetOptions {
                latitude: Some(40.7128),
                longitude: Some(-74.006),
                ..WidgetOptions::default()
            },
            "key",
        );

        let coordinates = widget.resolve_coordinates(0);
        assert!((coordinates.latitude - 40.7128).abs() < f64::EPSILON);
        assert!((coordinates.longitude - (-74.006)).abs() < f64::EPSILON);
    }

    #[test]
    fn test_resolve_coordinates_falls_back_to_defaults() {
        let widget = widget(WidgetOptions::default(), "key");

        let coordinates = widget.resolve_coordinates(0);
        assert!((coordinates.latitude - 49.2827).abs() < f64::EPSILON);
    }

    #[test]
    fn test_resolve_coordinates_display_location() {
        let options = WidgetOptions {
            use_display_location: true,
            latitude: Some(40.7128),
            longitude: Some(-74.006),
            ..WidgetOptions::default()
        };
        let widget = widget(options, "key");

        // Known display: its configured location wins over the widget's
        let coordinates = widget.resolve_coordinates(5);
        assert!((coordinates.latitude - 51.5072).abs() < f64::EPSILON);

        // Display id 0 means "use the deployment defaults"
        let coordinates = widget.resolve_coordinates(0);
        assert!((coordinates.latitude - 49.2827).abs() < f64::EPSILON);

        // Unknown display falls back to the defaults
        let coordinates = widget.resolve_coordinates(9);
        assert!((coordinates.latitude - 49.2827).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_missing_api_key_is_a_configuration_error() {
        let widget = widget(WidgetOptions::default(), "");

        let err = widget.forecast(0).await.expect_err("Should fail");
        assert!(matches!(err, WidgetError::MissingApiKey));
    }

    #[tokio::test]
    async fn test_render_absorbs_errors_into_empty_string() {
        // Missing key
        let missing_key_widget = widget(WidgetOptions::default(), "");
        assert_eq!(missing_key_widget.render(0).await, "");

        // Unreachable API, empty cache
        let widget = widget(WidgetOptions::default(), "key");
        assert_eq!(widget.render(0).await, "");
    }

    #[tokio::test]
    async fn test_render_substitutes_templates_from_cache() {
        let options = WidgetOptions {
            units: Units::Us,
            current_template: "<p>[summary] [temperatureFloor][temperatureUnit]</p>[dailyForecast]"
                .to_string(),
            daily_template: "<span>[temperatureMaxFloor]</span>".to_string(),
            style_sheet: ".forecast { font-weight: bold; }".to_string(),
            color: "#abc".to_string(),
            ..WidgetOptions::default()
        };
        let cache = Arc::new(ForecastCache::new());
        let widget = widget_with_cache(options.clone(), "key", Arc::clone(&cache));
        seed_cache(
            &cache,
            &options,
            Coordinates {
                latitude: 49.2827,
                longitude: -123.1207,
            },
        );

        let html = widget.render(0).await;

        assert!(html.contains("<p>Clear 22F</p>"), "Body substituted: {html}");
        assert!(
            html.contains("<span>70</span><span>71</span><span>72</span><span>73</span><span>74</span><span>75</span><span>76</span>"),
            "Daily loop expanded: {html}"
        );
        assert!(html.contains(".container { color: #abc; }"));
        assert!(html.contains(".forecast { font-weight: bold; }"));
        assert!(html.contains("var options ="));
    }

    #[tokio::test]
    async fn test_unresolved_placeholders_survive_rendering() {
        let options = WidgetOptions {
            current_template: "[noSuchField]".to_string(),
            ..WidgetOptions::default()
        };
        let cache = Arc::new(ForecastCache::new());
        let widget = widget_with_cache(options.clone(), "key", Arc::clone(&cache));
        seed_cache(
            &cache,
            &options,
            Coordinates {
                latitude: 49.2827,
                longitude: -123.1207,
            },
        );

        let html = widget.render(0).await;
        assert!(html.contains("[noSuchField]"));
    }

    #[tokio::test]
    async fn test_substitutions_cover_current_and_first_daily() {
        let options = WidgetOptions {
            units: Units::Si,
            ..WidgetOptions::default()
        };
        let cache = Arc::new(ForecastCache::new());
        let widget = widget_with_cache(options.clone(), "key", Arc::clone(&cache));
        seed_cache(
            &cache,
            &options,
            Coordinates {
                latitude: 49.2827,
                longitude: -123.1207,
            },
        );

        let rows = widget
            .substitutions(0)
            .await
            .expect("Substitutions should succeed");

        let current_summary = rows
            .iter()
            .find(|row| row.section == "Current" && row.key == "summary")
            .expect("Current summary row");
        assert_eq!(current_summary.value, "Clear");

        let daily_max = rows
            .iter()
            .find(|row| row.section == "Daily" && row.key == "temperatureMaxFloor")
            .expect("Daily max floor row");
        assert_eq!(daily_max.value, "70");

        // time keys render as local dates, not raw timestamps
        let time_row = rows
            .iter()
            .find(|row| row.section == "Current" && row.key == "time")
            .expect("Current time row");
        assert!(time_row.value.contains('-'), "Formatted date: {}", time_row.value);
    }

    #[tokio::test]
    async fn test_substitutions_propagate_failure() {
        let widget = widget(WidgetOptions::default(), "key");

        let err = widget.substitutions(0).await.expect_err("Should fail");
        assert!(matches!(err, WidgetError::Fetch(FetchError::Unreachable(_))));
    }

    #[test]
    fn test_icon_path_prefix_normalization() {
        assert_eq!(icon_path_prefix(""), "");
        assert_eq!(icon_path_prefix("mono"), "mono/");
        assert_eq!(icon_path_prefix("mono/"), "mono/");
    }
}
