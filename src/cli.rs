//! Command-line interface parsing for the forecast widget demo binary
//!
//! The binary is an authoring and debugging harness around the library: it
//! renders the widget HTML to stdout, or prints the substitution table that
//! template authors use to discover available fields.

use std::path::PathBuf;

use clap::Parser;
use thiserror::Error;

use crate::data::{Units, SUPPORTED_LANGUAGES};

/// Current-conditions template used when no file is supplied
pub const DEFAULT_CURRENT_TEMPLATE: &str = "<div class=\"forecast\">\n  \
    <i class=\"wi [wicon]\"></i>\n  \
    <span>[temperatureFloor][temperatureUnit] [summary]</span>\n\
    </div>\n[dailyForecast]\n";

/// Daily template used when no file is supplied
pub const DEFAULT_DAILY_TEMPLATE: &str = "<div class=\"day\">\n  \
    <i class=\"wi [wicon]\"></i>\n  \
    <span>[time|%a] [temperatureMaxFloor]/[temperatureMinFloor]</span>\n\
    </div>\n";

/// Error types for CLI argument validation
#[derive(Debug, Error)]
pub enum CliError {
    /// The units identifier is not recognized
    #[error("Invalid units: '{0}'. Valid units: auto, ca, si, uk, us")]
    InvalidUnits(String),

    /// The language code is not supported by the forecast API
    #[error("Unsupported language: '{0}'")]
    InvalidLanguage(String),
}

/// Forecast widget - render signage weather HTML or the substitution table
#[derive(Parser, Debug)]
#[command(name = "forecast-widget")]
#[command(about = "Render the digital-signage weather forecast widget")]
#[command(version)]
pub struct Cli {
    /// Widget-level latitude (falls back to the deployment default)
    #[arg(long, allow_negative_numbers = true)]
    pub latitude: Option<f64>,

    /// Widget-level longitude (falls back to the deployment default)
    #[arg(long, allow_negative_numbers = true)]
    pub longitude: Option<f64>,

    /// Deployment default latitude (DEFAULT_LAT)
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    pub default_latitude: f64,

    /// Deployment default longitude (DEFAULT_LONG)
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    pub default_longitude: f64,

    /// API key (read from FORECAST_API_KEY when omitted)
    #[arg(long)]
    pub api_key: Option<String>,

    /// Unit system: auto, ca, si, uk, us
    #[arg(long, default_value = "auto")]
    pub units: String,

    /// Language code for forecast summaries
    #[arg(long, default_value = "en")]
    pub lang: String,

    /// Forecast cache period in seconds
    #[arg(long, default_value_t = 300)]
    pub cache_period: u64,

    /// Only show daytime weather conditions
    #[arg(
        long,
        default_value_t = true,
        action = clap::ArgAction::Set,
        num_args = 0..=1,
        default_missing_value = "true"
    )]
    pub day_conditions_only: bool,

    /// Foreground text colour
    #[arg(long, default_value = "#000")]
    pub color: String,

    /// Zoom factor for the rendered content
    #[arg(long, default_value_t = 1.0)]
    pub size: f64,

    /// Icon-set path prefix for the icon stylesheet
    #[arg(long)]
    pub icons: Option<String>,

    /// File holding the current-conditions template
    #[arg(long, value_name = "FILE")]
    pub current_template: Option<PathBuf>,

    /// File holding the per-day template
    #[arg(long, value_name = "FILE")]
    pub daily_template: Option<PathBuf>,

    /// File holding user CSS for the widget style block
    #[arg(long, value_name = "FILE")]
    pub style_sheet: Option<PathBuf>,

    /// Print the substitution table instead of rendered HTML
    #[arg(long)]
    pub substitutions: bool,

    /// Display id to resolve the location from (0 = configured defaults)
    #[arg(long, default_value_t = 0)]
    pub display_id: u64,
}

/// Parses a units argument into a [`Units`] value
pub fn parse_units_arg(s: &str) -> Result<Units, CliError> {
    Units::from_str(s).ok_or_else(|| CliError::InvalidUnits(s.to_string()))
}

/// Validates a language argument against the supported set
pub fn parse_lang_arg(s: &str) -> Result<String, CliError> {
    if SUPPORTED_LANGUAGES.contains(&s) {
        Ok(s.to_string())
    } else {
        Err(CliError::InvalidLanguage(s.to_string()))
    }
}
