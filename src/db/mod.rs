use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, PgPool};
use uuid::Uuid;

use crate::{
    error::StoreResult,
    models::{
        GameMode, LeaderboardEntry, LeaderboardFilter, NewLeaderboardEntry, NewRound, Round,
        RoundResult, SessionWithRounds, User,
    },
};

pub mod memory;
pub mod queries;

pub use memory::MemoryGameStore;
pub use queries::PgGameStore;

pub async fn create_pool(database_url: &str, max_connections: u32) -> sqlx::Result<PgPool> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await
}

/// Session fields fixed at creation
#[derive(Debug, Clone)]
pub struct NewSession {
    pub region: String,
    pub mode: GameMode,
    pub user_id: Option<Uuid>,
}

/// Persistence for sessions, rounds and leaderboard entries.
///
/// Implementations do no game logic: totals and round progression are
/// computed by the callers and written back here.
#[async_trait]
pub trait GameStore: Send + Sync {
    /// Insert a session with `current_round = 1`, `total_score = 0` and its
    /// rounds in one atomic step
    async fn create_session(
        &self,
        session: NewSession,
        rounds: Vec<NewRound>,
    ) -> StoreResult<SessionWithRounds>;

    async fn get_session(&self, session_id: Uuid) -> StoreResult<Option<SessionWithRounds>>;

    /// Overwrite a round's result. Returns false when the round does not exist.
    async fn update_round(
        &self,
        session_id: Uuid,
        round_number: i32,
        result: &RoundResult,
    ) -> StoreResult<bool>;

    /// Rounds of a session ordered by round number
    async fn get_rounds(&self, session_id: Uuid) -> StoreResult<Vec<Round>>;

    async fn update_session_progress(
        &self,
        session_id: Uuid,
        total_score: i32,
        current_round: i32,
    ) -> StoreResult<()>;

    /// Set a round's location name unless one was already recorded
    async fn fill_location_name(
        &self,
        session_id: Uuid,
        round_number: i32,
        location_name: &str,
    ) -> StoreResult<bool>;

    async fn mark_completed(&self, session_id: Uuid) -> StoreResult<()>;

    async fn insert_leaderboard_entry(
        &self,
        entry: NewLeaderboardEntry,
    ) -> StoreResult<LeaderboardEntry>;

    /// Matching entries by score descending, oldest first among ties
    async fn leaderboard(
        &self,
        filter: &LeaderboardFilter,
        limit: i64,
    ) -> StoreResult<Vec<LeaderboardEntry>>;

    /// Completed sessions with rounds, restricted to `user_id` when given
    async fn completed_sessions(
        &self,
        user_id: Option<Uuid>,
    ) -> StoreResult<Vec<SessionWithRounds>>;

    /// A user's sessions with rounds, newest first
    async fn sessions_for_user(
        &self,
        user_id: Uuid,
        limit: i64,
    ) -> StoreResult<Vec<SessionWithRounds>>;

    async fn get_user(&self, user_id: Uuid) -> StoreResult<Option<User>>;
}
