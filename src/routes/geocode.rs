use std::sync::Arc;

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use super::{check_coordinate, extract::ApiQuery};
use crate::{error::GameError, AppState};

#[derive(Debug, Deserialize)]
pub struct GeocodeQuery {
    pub lat: Option<f64>,
    pub lon: Option<f64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeocodeResponse {
    pub location_name: String,
}

/// Human-readable name for a coordinate.
///
/// Upstream failures are retried and end in "Unknown location", never an error.
pub async fn reverse_geocode(
    State(state): State<Arc<AppState>>,
    ApiQuery(query): ApiQuery<GeocodeQuery>,
) -> Result<Json<GeocodeResponse>, GameError> {
    let lat = query
        .lat
        .ok_or_else(|| GameError::Validation("lat is required".to_string()))?;
    let lon = query
        .lon
        .ok_or_else(|| GameError::Validation("lon is required".to_string()))?;
    check_coordinate(lat, lon)?;

    let location_name = state.geocoder.resolve(lat, lon).await;
    Ok(Json(GeocodeResponse { location_name }))
}
