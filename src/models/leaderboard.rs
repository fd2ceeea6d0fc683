use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::GameMode;

/// A ranked score recorded when a session is completed with a display name.
/// Holds `session_id` for lookup only; entries outlive deleted sessions.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub id: Uuid,
    pub session_id: Uuid,
    pub user_id: Option<Uuid>,
    pub username: String,
    pub score: i32,
    pub region: String,
    pub mode: GameMode,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewLeaderboardEntry {
    pub session_id: Uuid,
    pub user_id: Option<Uuid>,
    pub username: String,
    pub score: i32,
    pub region: String,
    pub mode: GameMode,
}

/// Leaderboard query criteria; `None` fields match everything
#[derive(Debug, Clone, Default)]
pub struct LeaderboardFilter {
    pub region: Option<String>,
    pub mode: Option<GameMode>,
}

impl LeaderboardFilter {
    pub fn matches(&self, entry: &LeaderboardEntry) -> bool {
        self.region.as_deref().is_none_or(|r| r == entry.region)
            && self.mode.is_none_or(|m| m == entry.mode)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerStats {
    pub total_games: i64,
    pub total_rounds: i64,
    pub total_points: i64,
    pub best_score: i32,
    pub average_score: f64,
    pub average_distance: f64,
    pub games_by_region: Vec<RegionStats>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegionStats {
    pub region: String,
    pub games_played: i64,
    pub average_score: f64,
}
