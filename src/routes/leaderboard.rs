use std::sync::Arc;

use axum::{extract::State, Json};
use serde::Deserialize;

use super::{extract::ApiQuery, page_size};
use crate::{
    auth::AuthenticatedUser,
    error::GameError,
    models::{GameMode, LeaderboardEntry, LeaderboardFilter, PlayerStats},
    AppState,
};

#[derive(Debug, Deserialize)]
pub struct LeaderboardQuery {
    pub region: Option<String>,
    pub mode: Option<String>,
    pub limit: Option<i64>,
}

impl LeaderboardQuery {
    fn filter(&self) -> Result<LeaderboardFilter, GameError> {
        let mode = self
            .mode
            .as_deref()
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .map(str::parse::<GameMode>)
            .transpose()
            .map_err(GameError::Validation)?;

        Ok(LeaderboardFilter {
            region: self
                .region
                .as_deref()
                .map(str::trim)
                .filter(|r| !r.is_empty())
                .map(str::to_string),
            mode,
        })
    }
}

/// Top scores, optionally filtered by region and mode
pub async fn get_leaderboard(
    State(state): State<Arc<AppState>>,
    ApiQuery(query): ApiQuery<LeaderboardQuery>,
) -> Result<Json<Vec<LeaderboardEntry>>, GameError> {
    let filter = query.filter()?;
    let limit = page_size("limit", query.limit)?;

    let entries = state.leaderboard.leaderboard(&filter, limit).await?;
    Ok(Json(entries))
}

/// Statistics for the caller, or across all players when anonymous
pub async fn get_stats(
    State(state): State<Arc<AppState>>,
    user: Option<AuthenticatedUser>,
) -> Result<Json<PlayerStats>, GameError> {
    let stats = state
        .leaderboard
        .player_stats(user.map(|u| u.user_id))
        .await?;
    Ok(Json(stats))
}
