//! Forecast widget core for digital signage
//!
//! Implements the forecast acquisition and templating pipeline: signed API
//! requests, fingerprint-keyed TTL caching, payload enrichment with derived
//! display fields, and bracketed-placeholder template substitution, assembled
//! into an HTML fragment for the host CMS to embed.

pub mod cache;
pub mod cli;
pub mod config;
pub mod data;
pub mod render;
pub mod template;
