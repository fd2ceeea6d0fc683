use std::sync::Arc;

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{
    check_coordinate,
    extract::{ApiJson, ApiPath, ApiQuery},
    page_size,
};
use crate::{
    auth::AuthenticatedUser,
    error::GameError,
    game::{scorer::MAX_POINTS, RoundSubmission},
    models::{GameMode, LeaderboardEntry, SessionWithRounds},
    AppState,
};

const DEFAULT_MY_GAMES_LIMIT: i64 = 10;

#[derive(Debug, Deserialize)]
pub struct StartGameRequest {
    pub region: Option<String>,
    pub mode: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitRoundRequest {
    pub guess_lat: Option<f64>,
    pub guess_lng: Option<f64>,
    pub distance: Option<f64>,
    pub points: Option<i32>,
    pub location_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CompleteGameRequest {
    #[serde(default)]
    pub username: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct MyGamesQuery {
    pub limit: Option<i64>,
}

/// A session as returned to the client
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    #[serde(flatten)]
    pub session: SessionWithRounds,
    /// Countdown length for timed sessions
    #[serde(skip_serializing_if = "Option::is_none")]
    pub round_time_limit_secs: Option<u32>,
}

impl SessionView {
    fn new(session: SessionWithRounds, state: &AppState) -> Self {
        let round_time_limit_secs = match session.session.mode {
            GameMode::Timed => Some(state.config.game.timed_round_seconds),
            GameMode::Classic => None,
        };
        Self {
            session,
            round_time_limit_secs,
        }
    }
}

fn required<T>(value: Option<T>, field: &str) -> Result<T, GameError> {
    value.ok_or_else(|| GameError::Validation(format!("{} is required", field)))
}

impl SubmitRoundRequest {
    fn validate(self) -> Result<RoundSubmission, GameError> {
        let guess_lat = required(self.guess_lat, "guessLat")?;
        let guess_lng = required(self.guess_lng, "guessLng")?;
        let distance = required(self.distance, "distance")?;
        let points = required(self.points, "points")?;

        check_coordinate(guess_lat, guess_lng)?;
        if !distance.is_finite() {
            return Err(GameError::Validation("distance must be finite".to_string()));
        }
        if !(0..=MAX_POINTS).contains(&points) {
            return Err(GameError::Validation(format!(
                "points must be within 0..={}",
                MAX_POINTS
            )));
        }

        Ok(RoundSubmission {
            guess_lat,
            guess_lng,
            distance,
            points,
            location_name: self.location_name.filter(|name| !name.trim().is_empty()),
        })
    }
}

/// Start a new five-round session
pub async fn start_game(
    State(state): State<Arc<AppState>>,
    user: Option<AuthenticatedUser>,
    ApiJson(payload): ApiJson<StartGameRequest>,
) -> Result<Json<SessionView>, GameError> {
    let region = required(payload.region, "region")?;
    let mode = required(payload.mode, "mode")?
        .parse::<GameMode>()
        .map_err(GameError::Validation)?;

    let session = state
        .sessions
        .start_game(Some(&region), mode, user.map(|u| u.user_id))
        .await?;

    Ok(Json(SessionView::new(session, &state)))
}

pub async fn get_game(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<SessionView>, GameError> {
    let session = state
        .sessions
        .get_session(id)
        .await?
        .ok_or_else(|| GameError::NotFound(format!("session {} not found", id)))?;

    Ok(Json(SessionView::new(session, &state)))
}

/// Record a guess for one round
pub async fn submit_round(
    State(state): State<Arc<AppState>>,
    ApiPath((id, round_number)): ApiPath<(Uuid, i32)>,
    ApiJson(payload): ApiJson<SubmitRoundRequest>,
) -> Result<Json<SessionView>, GameError> {
    let submission = payload.validate()?;
    let session = state
        .sessions
        .submit_round(id, round_number, submission)
        .await?;

    Ok(Json(SessionView::new(session, &state)))
}

/// Finish a session, returning its leaderboard entry if one was recorded
pub async fn complete_game(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<Uuid>,
    user: Option<AuthenticatedUser>,
    payload: Option<ApiJson<CompleteGameRequest>>,
) -> Result<Json<Option<LeaderboardEntry>>, GameError> {
    let username = payload.and_then(|ApiJson(body)| body.username);
    let entry = state
        .leaderboard
        .complete_game(id, username.as_deref(), user.map(|u| u.user_id))
        .await?;

    Ok(Json(entry))
}

/// The caller's most recent sessions
pub async fn my_games(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    ApiQuery(query): ApiQuery<MyGamesQuery>,
) -> Result<Json<Vec<SessionView>>, GameError> {
    let limit = page_size("limit", query.limit)?.unwrap_or(DEFAULT_MY_GAMES_LIMIT);
    let sessions = state.leaderboard.my_games(user.user_id, limit).await?;

    Ok(Json(
        sessions
            .into_iter()
            .map(|s| SessionView::new(s, &state))
            .collect(),
    ))
}
