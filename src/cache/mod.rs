//! Forecast cache
//!
//! This module provides an in-memory cache that maps a query fingerprint to a
//! decoded forecast payload with an expiration, avoiding redundant remote
//! calls while a cached forecast is still live.

mod manager;

pub use manager::ForecastCache;
