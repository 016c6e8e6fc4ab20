//! Forecast widget demo binary
//!
//! Renders the widget HTML document to stdout, or prints the substitution
//! debug table for template authoring. Deployment settings that a host CMS
//! would supply (API key, proxy) are read from flags and environment
//! variables.

use std::fs;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use forecast_widget::cache::ForecastCache;
use forecast_widget::cli::{
    parse_lang_arg, parse_units_arg, Cli, DEFAULT_CURRENT_TEMPLATE, DEFAULT_DAILY_TEMPLATE,
};
use forecast_widget::config::{
    Defaults, ProxyConfig, StaticDisplays, WidgetOptions, WidgetSettings,
};
use forecast_widget::data::ForecastClient;
use forecast_widget::render::{SubstitutionRow, WeatherWidget};

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let options = widget_options(&cli)?;

    let api_key = cli
        .api_key
        .clone()
        .or_else(|| std::env::var("FORECAST_API_KEY").ok())
        .unwrap_or_default();
    let mut settings = WidgetSettings::new(api_key);
    settings.cache_period = Duration::from_secs(cli.cache_period);

    let defaults = Defaults {
        latitude: cli.default_latitude,
        longitude: cli.default_longitude,
    };

    let proxy = proxy_from_env();
    let client = ForecastClient::new(proxy.as_ref())?;
    let widget = WeatherWidget::new(
        settings,
        defaults,
        options,
        client,
        Arc::new(ForecastCache::new()),
        StaticDisplays::new(),
    );

    if cli.substitutions {
        match widget.substitutions(cli.display_id).await {
            Ok(rows) => {
                print_table(&rows);
                Ok(ExitCode::SUCCESS)
            }
            Err(e) => {
                tracing::error!("Substitution table unavailable: {e}");
                println!("No data returned, please check the log.");
                Ok(ExitCode::FAILURE)
            }
        }
    } else {
        println!("{}", widget.render(cli.display_id).await);
        Ok(ExitCode::SUCCESS)
    }
}

/// Builds the widget options from CLI flags and template files
fn widget_options(cli: &Cli) -> Result<WidgetOptions, Box<dyn std::error::Error>> {
    let current_template = match &cli.current_template {
        Some(path) => fs::read_to_string(path)?,
        None => DEFAULT_CURRENT_TEMPLATE.to_string(),
    };
    let daily_template = match &cli.daily_template {
        Some(path) => fs::read_to_string(path)?,
        None => DEFAULT_DAILY_TEMPLATE.to_string(),
    };
    let style_sheet = match &cli.style_sheet {
        Some(path) => fs::read_to_string(path)?,
        None => String::new(),
    };

    Ok(WidgetOptions {
        latitude: cli.latitude,
        longitude: cli.longitude,
        units: parse_units_arg(&cli.units)?,
        lang: parse_lang_arg(&cli.lang)?,
        icons: cli.icons.clone().unwrap_or_default(),
        size: cli.size,
        day_conditions_only: cli.day_conditions_only,
        color: cli.color.clone(),
        current_template,
        daily_template,
        style_sheet,
        ..WidgetOptions::default()
    })
}

/// Reads proxy settings from the environment (PROXY_HOST, PROXY_PORT,
/// PROXY_AUTH, PROXY_EXCEPTIONS)
fn proxy_from_env() -> Option<ProxyConfig> {
    let host = std::env::var("PROXY_HOST").ok()?;
    if host.is_empty() {
        return None;
    }

    let port = std::env::var("PROXY_PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(8080);
    let auth = std::env::var("PROXY_AUTH").ok().filter(|a| !a.is_empty());
    let exceptions = std::env::var("PROXY_EXCEPTIONS")
        .map(|list| {
            list.split(',')
                .map(str::trim)
                .filter(|host| !host.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    Some(ProxyConfig {
        host,
        port,
        auth,
        exceptions,
    })
}

/// Prints the 3-column substitution table
fn print_table(rows: &[SubstitutionRow]) {
    let key_width = rows
        .iter()
        .map(|row| row.key.len())
        .max()
        .unwrap_or(0)
        .max("Substitute".len());

    println!("{:<8}  {:<key_width$}  Value", "Forecast", "Substitute");
    for row in rows {
        println!("{:<8}  {:<key_width$}  {}", row.section, row.key, row.value);
    }
}
