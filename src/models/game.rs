use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Number of rounds in every session
pub const ROUNDS_PER_SESSION: i32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "VARCHAR", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum GameMode {
    Classic,
    /// Client-side countdown per round; expiry submits a zero-point guess
    Timed,
}

impl GameMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            GameMode::Classic => "classic",
            GameMode::Timed => "timed",
        }
    }
}

impl fmt::Display for GameMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for GameMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "classic" => Ok(GameMode::Classic),
            "timed" => Ok(GameMode::Timed),
            other => Err(format!("unknown game mode '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct GameSession {
    pub id: Uuid,
    pub region: String,
    pub mode: GameMode,
    pub current_round: i32,
    pub total_score: i32,
    pub completed: bool,
    pub user_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Round {
    pub session_id: Uuid,
    pub round_number: i32,
    pub image_id: String,
    /// Copied from the sampled image so later corpus changes never affect the round
    pub actual_lat: f64,
    pub actual_lng: f64,
    pub guess_lat: Option<f64>,
    pub guess_lng: Option<f64>,
    pub distance: Option<f64>,
    pub points: Option<i32>,
    pub location_name: Option<String>,
}

impl Round {
    /// A round stays pending until a result has been submitted for it
    pub fn is_pending(&self) -> bool {
        self.guess_lat.is_none() && self.guess_lng.is_none()
    }
}

/// A session together with its rounds ordered by round number
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionWithRounds {
    #[serde(flatten)]
    pub session: GameSession,
    pub rounds: Vec<Round>,
}

/// Round to be inserted when a session is created
#[derive(Debug, Clone)]
pub struct NewRound {
    pub round_number: i32,
    pub image_id: String,
    pub actual_lat: f64,
    pub actual_lng: f64,
}

/// Values written to a round by a submission. Always a full overwrite.
#[derive(Debug, Clone, PartialEq)]
pub struct RoundResult {
    pub guess_lat: f64,
    pub guess_lng: f64,
    pub distance: f64,
    pub points: i32,
    pub location_name: Option<String>,
}

/// Aggregate score over every round with points set
pub fn total_score(rounds: &[Round]) -> i32 {
    rounds.iter().filter_map(|r| r.points).sum()
}

/// Round the session points at after `round_number` was submitted
pub fn next_round(round_number: i32) -> i32 {
    (round_number + 1).min(ROUNDS_PER_SESSION)
}
