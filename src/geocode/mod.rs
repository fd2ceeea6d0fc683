//! Reverse geocoding behind a bounded retry-then-fallback wrapper.

pub mod nominatim;

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

pub use nominatim::NominatimClient;

/// Returned when every attempt failed
pub const UNKNOWN_LOCATION: &str = "Unknown location";

/// Subset of the upstream address object used for naming
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Address {
    pub city: Option<String>,
    pub village: Option<String>,
    pub state: Option<String>,
    pub state_district: Option<String>,
    pub road: Option<String>,
    pub country: Option<String>,
}

impl Address {
    /// First non-empty of city, village, state, state district, road
    fn place(&self) -> Option<&str> {
        [
            &self.city,
            &self.village,
            &self.state,
            &self.state_district,
            &self.road,
        ]
        .into_iter()
        .flatten()
        .map(String::as_str)
        .find(|v| !v.is_empty())
    }

    /// `"<place>, <country>"` from the first present place component.
    ///
    /// Falls back to whichever half exists; `None` when neither does.
    pub fn place_name(&self) -> Option<String> {
        let place = self.place();
        let country = self.country.as_deref().filter(|c| !c.is_empty());

        match (place, country) {
            (Some(place), Some(country)) => Some(format!("{}, {}", place, country)),
            (Some(only), None) | (None, Some(only)) => Some(only.to_string()),
            (None, None) => None,
        }
    }
}

/// Failures of a single upstream lookup. Never leaves the resolver.
#[derive(Debug, Error)]
pub enum GeocodeError {
    #[error("geocoder request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("geocoder returned status {0}")]
    Status(reqwest::StatusCode),
    #[error("geocoder response had no address")]
    MissingAddress,
}

/// One reverse-geocoding request against the upstream service
#[async_trait]
pub trait ReverseGeocode: Send + Sync {
    async fn lookup(&self, lat: f64, lon: f64) -> Result<Address, GeocodeError>;
}

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Attempts after the first one
    pub max_retries: u32,
    /// Delay before the first retry; doubles for each further retry
    pub initial_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff: Duration::from_millis(1000),
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `retry` (1-based)
    fn backoff(&self, retry: u32) -> Duration {
        self.initial_backoff
            .saturating_mul(2u32.saturating_pow(retry.saturating_sub(1)))
    }
}

/// Resolves coordinates to place names, degrading to [`UNKNOWN_LOCATION`].
///
/// Dropping the returned future stops any pending retries.
#[derive(Clone)]
pub struct GeocodeResolver {
    backend: Arc<dyn ReverseGeocode>,
    policy: RetryPolicy,
}

impl GeocodeResolver {
    pub fn new(backend: Arc<dyn ReverseGeocode>, policy: RetryPolicy) -> Self {
        Self { backend, policy }
    }

    pub async fn resolve(&self, lat: f64, lon: f64) -> String {
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;
            match self.backend.lookup(lat, lon).await {
                Ok(address) => {
                    if attempt > 1 {
                        tracing::debug!("Reverse geocode succeeded on attempt {}", attempt);
                    }
                    return address
                        .place_name()
                        .unwrap_or_else(|| UNKNOWN_LOCATION.to_string());
                }
                Err(e) if attempt <= self.policy.max_retries => {
                    let delay = self.policy.backoff(attempt);
                    tracing::warn!(
                        "Reverse geocode for ({}, {}) failed: {}. Retrying in {:?} ({} left)",
                        lat,
                        lon,
                        e,
                        delay,
                        self.policy.max_retries + 1 - attempt
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    tracing::error!(
                        "Reverse geocode for ({}, {}) failed after {} attempts: {}",
                        lat,
                        lon,
                        attempt,
                        e
                    );
                    return UNKNOWN_LOCATION.to_string();
                }
            }
        }
    }
}
