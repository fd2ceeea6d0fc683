use async_trait::async_trait;
use serde::Deserialize;

use super::{Address, GeocodeError, ReverseGeocode};

#[derive(Debug, Deserialize)]
struct ReverseResponse {
    address: Option<Address>,
}

/// Reverse geocoding against a Nominatim-compatible `/reverse` endpoint
#[derive(Clone)]
pub struct NominatimClient {
    http_client: reqwest::Client,
    url: String,
    user_agent: String,
}

impl NominatimClient {
    pub fn new(http_client: reqwest::Client, url: &str, user_agent: &str) -> Self {
        Self {
            http_client,
            url: url.to_string(),
            user_agent: user_agent.to_string(),
        }
    }
}

#[async_trait]
impl ReverseGeocode for NominatimClient {
    async fn lookup(&self, lat: f64, lon: f64) -> Result<Address, GeocodeError> {
        tracing::debug!("Reverse geocoding for: {}, {}", lat, lon);

        let response = self
            .http_client
            .get(&self.url)
            .header(reqwest::header::USER_AGENT, &self.user_agent)
            .query(&[
                ("format", "jsonv2".to_string()),
                ("lat", lat.to_string()),
                ("lon", lon.to_string()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(GeocodeError::Status(response.status()));
        }

        let body = response.json::<ReverseResponse>().await?;
        body.address.ok_or(GeocodeError::MissingAddress)
    }
}
