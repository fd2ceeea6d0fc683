pub mod extract;
pub mod games;
pub mod geocode;
pub mod health;
pub mod images;
pub mod leaderboard;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};

use crate::{error::GameError, AppState};

/// Upper bound for any `limit` or `count` query parameter
pub const MAX_PAGE_SIZE: i64 = 100;

pub fn create_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(health::health_check))
        .nest("/api", api_routes())
}

fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/games", post(games::start_game))
        .route("/games/mine", get(games::my_games))
        .route("/games/{id}", get(games::get_game))
        .route(
            "/games/{id}/rounds/{round_number}",
            post(games::submit_round),
        )
        .route("/games/{id}/complete", post(games::complete_game))
        .route("/leaderboard", get(leaderboard::get_leaderboard))
        .route("/stats", get(leaderboard::get_stats))
        .route("/images", get(images::list_images))
        .route("/images/random", get(images::random_image))
        .route("/geocode", get(geocode::reverse_geocode))
}

/// Validate an optional page size, capping it at `MAX_PAGE_SIZE`
pub(crate) fn page_size(name: &str, value: Option<i64>) -> Result<Option<i64>, GameError> {
    match value {
        Some(n) if n < 1 => Err(GameError::Validation(format!(
            "{} must be at least 1",
            name
        ))),
        Some(n) => Ok(Some(n.min(MAX_PAGE_SIZE))),
        None => Ok(None),
    }
}

/// Reject non-finite or out-of-range coordinates
pub(crate) fn check_coordinate(lat: f64, lng: f64) -> Result<(), GameError> {
    if !lat.is_finite() || !(-90.0..=90.0).contains(&lat) {
        return Err(GameError::Validation(format!(
            "latitude {} is outside -90..=90",
            lat
        )));
    }
    if !lng.is_finite() || !(-180.0..=180.0).contains(&lng) {
        return Err(GameError::Validation(format!(
            "longitude {} is outside -180..=180",
            lng
        )));
    }
    Ok(())
}
