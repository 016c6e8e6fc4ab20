//! Forecast API client
//!
//! This module builds signed requests against the forecast API, performs the
//! HTTP call with timeout and optional proxy support, classifies the outcome,
//! and decodes the JSON payload.

use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, error};

use super::{ForecastPayload, ForecastQuery};
use crate::config::ProxyConfig;

/// Base URL for the forecast API
const API_ENDPOINT: &str = "https://api.forecast.io/forecast/";

/// Hard timeout applied to every API request
const REQUEST_TIMEOUT_SECS: u64 = 20;

/// User-agent sent with every API request
const USER_AGENT: &str = "Forecast Widget / Digital Signage";

/// Stands in for the API key when a request URL is logged
const REDACTED_KEY: &str = "[REDACTED]";

/// Errors that can occur when fetching forecast data
#[derive(Debug, Error)]
pub enum FetchError {
    /// The API could not be reached (DNS failure, refused connection, timeout)
    #[error("Forecast API unreachable: {0}")]
    Unreachable(#[source] reqwest::Error),

    /// The API answered with a non-200 status
    #[error("Forecast API returned status {status}: {message}")]
    Api {
        /// HTTP status code of the response
        status: u16,
        /// Error message extracted from the response body, or "Unknown Error"
        message: String,
    },

    /// The response body was not a valid forecast payload
    #[error("Failed to decode forecast response: {0}")]
    Decode(#[from] serde_json::Error),

    /// The HTTP client could not be constructed
    #[error("Failed to build HTTP client: {0}")]
    ClientBuild(#[source] reqwest::Error),
}

/// Error body shape returned by the API on non-200 responses
#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    errors: Vec<ApiErrorDetail>,
}

/// A single error entry from the API error body
#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

/// Client for fetching forecast data from the weather API
#[derive(Debug, Clone)]
pub struct ForecastClient {
    /// HTTP client for making requests
    http_client: Client,
    /// Base URL for the API (allows override for testing)
    base_url: String,
}

impl ForecastClient {
    /// Creates a new ForecastClient
    ///
    /// The underlying HTTP client carries a 20 second timeout, TLS
    /// certificate verification, a fixed user-agent, and — when `proxy` is
    /// given — an HTTP proxy with optional basic auth and a per-host
    /// exception list.
    ///
    /// # Arguments
    /// * `proxy` - Optional proxy configuration from the deployment settings
    ///
    /// # Returns
    /// * `Ok(ForecastClient)` - A ready-to-use client
    /// * `Err(FetchError::ClientBuild)` - If the HTTP client cannot be built
    pub fn new(proxy: Option<&ProxyConfig>) -> Result<Self, FetchError> {
        let mut builder = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .user_agent(USER_AGENT);

        if let Some(proxy) = proxy {
            builder = builder.proxy(proxy_for(proxy)?);
        }

        Ok(Self {
            http_client: builder.build().map_err(FetchError::ClientBuild)?,
            base_url: API_ENDPOINT.to_string(),
        })
    }

    /// Creates a new ForecastClient with a custom base URL (for testing)
    #[cfg(test)]
    pub fn with_base_url(base_url: String) -> Self {
        Self {
            http_client: Client::new(),
            base_url,
        }
    }

    /// Builds the request URL for a query and key
    fn request_url(&self, query: &ForecastQuery, api_key: &str) -> String {
        format!(
            "{}{}/{},{}?units={}&lang={}&exclude={}",
            self.base_url,
            api_key,
            query.latitude,
            query.longitude,
            query.units.as_str(),
            query.lang,
            query.exclude.join(",")
        )
    }

    /// Fetches the forecast for the given query
    ///
    /// Performs a single attempt; no retries happen at this layer. The
    /// outgoing URL is debug-logged with the API key redacted.
    ///
    /// # Arguments
    /// * `query` - The forecast query (coordinates and API options)
    /// * `api_key` - The API key configured for the widget
    ///
    /// # Returns
    /// * `Ok(ForecastPayload)` - The decoded forecast
    /// * `Err(FetchError)` - Transport failure, non-200 status, or bad JSON
    pub async fn fetch(
        &self,
        query: &ForecastQuery,
        api_key: &str,
    ) -> Result<ForecastPayload, FetchError> {
        debug!(
            url = %self.request_url(query, REDACTED_KEY),
            "Calling forecast API"
        );

        let response = self
            .http_client
            .get(self.request_url(query, api_key))
            .send()
            .await
            .map_err(|e| {
                error!("Unable to reach forecast API: {e}");
                FetchError::Unreachable(e)
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            error!("Unable to read forecast API response: {e}");
            FetchError::Unreachable(e)
        })?;

        if status != StatusCode::OK {
            let message = parse_api_error(&body);
            error!(status = status.as_u16(), "Forecast API error: {message}");
            return Err(FetchError::Api {
                status: status.as_u16(),
                message,
            });
        }

        serde_json::from_str(&body).map_err(|e| {
            error!("Malformed forecast API response: {e}");
            FetchError::Decode(e)
        })
    }
}

/// Builds a reqwest proxy from the deployment proxy settings
fn proxy_for(config: &ProxyConfig) -> Result<reqwest::Proxy, FetchError> {
    let mut proxy = reqwest::Proxy::all(format!("http://{}:{}", config.host, config.port))
        .map_err(FetchError::ClientBuild)?;

    if let Some(auth) = &config.auth {
        if let Some((user, password)) = auth.split_once(':') {
            proxy = proxy.basic_auth(user, password);
        }
    }

    if !config.exceptions.is_empty() {
        proxy = proxy.no_proxy(reqwest::NoProxy::from_string(&config.exceptions.join(",")));
    }

    Ok(proxy)
}

/// Extracts the first error message from an API error body
///
/// Falls back to "Unknown Error" when the body is not JSON or carries no
/// `errors[0].message` entry.
fn parse_api_error(body: &str) -> String {
    serde_json::from_str::<ApiErrorBody>(body)
        .ok()
        .and_then(|parsed| parsed.errors.into_iter().next())
        .map(|detail| detail.message)
        .unwrap_or_else(|| "Unknown Error".to_string())
}
