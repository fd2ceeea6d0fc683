use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::{PgPool, Result};
use uuid::Uuid;

use super::{GameStore, NewSession};
use crate::{
    error::StoreResult,
    models::{
        GameSession, LeaderboardEntry, LeaderboardFilter, NewLeaderboardEntry, NewRound, Round,
        RoundResult, SessionWithRounds, User,
    },
};

const ROUND_COLUMNS: &str = "session_id, round_number, image_id, actual_lat, actual_lng, \
     guess_lat, guess_lng, distance, points, location_name";

// User queries
pub async fn get_user(pool: &PgPool, user_id: Uuid) -> Result<Option<User>> {
    sqlx::query_as::<_, User>("SELECT id, email, username, created_at FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(pool)
        .await
}

// =============================================================================
// Game Session Management
// =============================================================================

/// Create a session and its pre-sampled rounds
///
/// # Arguments
/// * `pool` - Database connection pool
/// * `session` - Region, mode and optional owner of the session
/// * `rounds` - One entry per round, already sampled from the image corpus
///
/// # Returns
/// The stored session with its rounds ordered by round number
pub async fn create_session(
    pool: &PgPool,
    session: &NewSession,
    rounds: &[NewRound],
) -> Result<SessionWithRounds> {
    // Session and rounds become visible together or not at all
    let mut tx = pool.begin().await?;

    let stored = sqlx::query_as::<_, GameSession>(
        r#"
        INSERT INTO game_sessions (id, region, mode, current_round, total_score, completed, user_id)
        VALUES ($1, $2, $3, 1, 0, FALSE, $4)
        RETURNING id, region, mode, current_round, total_score, completed, user_id, created_at
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(&session.region)
    .bind(session.mode)
    .bind(session.user_id)
    .fetch_one(&mut *tx)
    .await?;

    let mut stored_rounds = Vec::with_capacity(rounds.len());
    for round in rounds {
        let row = sqlx::query_as::<_, Round>(&format!(
            r#"
            INSERT INTO rounds (session_id, round_number, image_id, actual_lat, actual_lng)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {ROUND_COLUMNS}
            "#
        ))
        .bind(stored.id)
        .bind(round.round_number)
        .bind(&round.image_id)
        .bind(round.actual_lat)
        .bind(round.actual_lng)
        .fetch_one(&mut *tx)
        .await?;
        stored_rounds.push(row);
    }

    tx.commit().await?;

    stored_rounds.sort_by_key(|r| r.round_number);
    Ok(SessionWithRounds {
        session: stored,
        rounds: stored_rounds,
    })
}

pub async fn get_session(pool: &PgPool, session_id: Uuid) -> Result<Option<GameSession>> {
    sqlx::query_as::<_, GameSession>("SELECT * FROM game_sessions WHERE id = $1")
        .bind(session_id)
        .fetch_optional(pool)
        .await
}

pub async fn get_rounds(pool: &PgPool, session_id: Uuid) -> Result<Vec<Round>> {
    sqlx::query_as::<_, Round>(&format!(
        "SELECT {ROUND_COLUMNS} FROM rounds WHERE session_id = $1 ORDER BY round_number"
    ))
    .bind(session_id)
    .fetch_all(pool)
    .await
}

/// Overwrite the result columns of one round
///
/// Returns whether a round matched `(session_id, round_number)`.
pub async fn update_round(
    pool: &PgPool,
    session_id: Uuid,
    round_number: i32,
    result: &RoundResult,
) -> Result<bool> {
    let updated = sqlx::query(
        r#"
        UPDATE rounds
        SET guess_lat = $1,
            guess_lng = $2,
            distance = $3,
            points = $4,
            location_name = $5
        WHERE session_id = $6 AND round_number = $7
        "#,
    )
    .bind(result.guess_lat)
    .bind(result.guess_lng)
    .bind(result.distance)
    .bind(result.points)
    .bind(result.location_name.as_deref())
    .bind(session_id)
    .bind(round_number)
    .execute(pool)
    .await?;

    Ok(updated.rows_affected() > 0)
}

pub async fn update_session_progress(
    pool: &PgPool,
    session_id: Uuid,
    total_score: i32,
    current_round: i32,
) -> Result<()> {
    sqlx::query("UPDATE game_sessions SET total_score = $1, current_round = $2 WHERE id = $3")
        .bind(total_score)
        .bind(current_round)
        .bind(session_id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Record a resolved place name unless the round already carries one
pub async fn fill_location_name(
    pool: &PgPool,
    session_id: Uuid,
    round_number: i32,
    location_name: &str,
) -> Result<bool> {
    let updated = sqlx::query(
        r#"
        UPDATE rounds
        SET location_name = $1
        WHERE session_id = $2 AND round_number = $3 AND location_name IS NULL
        "#,
    )
    .bind(location_name)
    .bind(session_id)
    .bind(round_number)
    .execute(pool)
    .await?;

    Ok(updated.rows_affected() > 0)
}

pub async fn mark_completed(pool: &PgPool, session_id: Uuid) -> Result<()> {
    sqlx::query("UPDATE game_sessions SET completed = TRUE WHERE id = $1")
        .bind(session_id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Attach rounds to each session, preserving the session order
async fn with_rounds(pool: &PgPool, sessions: Vec<GameSession>) -> Result<Vec<SessionWithRounds>> {
    if sessions.is_empty() {
        return Ok(Vec::new());
    }

    let ids: Vec<Uuid> = sessions.iter().map(|s| s.id).collect();
    let rounds = sqlx::query_as::<_, Round>(&format!(
        "SELECT {ROUND_COLUMNS} FROM rounds WHERE session_id = ANY($1) \
         ORDER BY session_id, round_number"
    ))
    .bind(&ids)
    .fetch_all(pool)
    .await?;

    let mut by_session: HashMap<Uuid, Vec<Round>> = HashMap::with_capacity(sessions.len());
    for round in rounds {
        by_session.entry(round.session_id).or_default().push(round);
    }

    Ok(sessions
        .into_iter()
        .map(|session| {
            let rounds = by_session.remove(&session.id).unwrap_or_default();
            SessionWithRounds { session, rounds }
        })
        .collect())
}

pub async fn completed_sessions(
    pool: &PgPool,
    user_id: Option<Uuid>,
) -> Result<Vec<SessionWithRounds>> {
    let sessions = sqlx::query_as::<_, GameSession>(
        r#"
        SELECT * FROM game_sessions
        WHERE completed = TRUE AND ($1::uuid IS NULL OR user_id = $1)
        ORDER BY created_at
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    with_rounds(pool, sessions).await
}

pub async fn sessions_for_user(
    pool: &PgPool,
    user_id: Uuid,
    limit: i64,
) -> Result<Vec<SessionWithRounds>> {
    let sessions = sqlx::query_as::<_, GameSession>(
        "SELECT * FROM game_sessions WHERE user_id = $1 ORDER BY created_at DESC LIMIT $2",
    )
    .bind(user_id)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    with_rounds(pool, sessions).await
}

// Leaderboard queries
pub async fn insert_leaderboard_entry(
    pool: &PgPool,
    entry: &NewLeaderboardEntry,
) -> Result<LeaderboardEntry> {
    sqlx::query_as::<_, LeaderboardEntry>(
        r#"
        INSERT INTO leaderboard_entries (id, session_id, user_id, username, score, region, mode)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(entry.session_id)
    .bind(entry.user_id)
    .bind(&entry.username)
    .bind(entry.score)
    .bind(&entry.region)
    .bind(entry.mode)
    .fetch_one(pool)
    .await
}

pub async fn leaderboard(
    pool: &PgPool,
    filter: &LeaderboardFilter,
    limit: i64,
) -> Result<Vec<LeaderboardEntry>> {
    sqlx::query_as::<_, LeaderboardEntry>(
        r#"
        SELECT * FROM leaderboard_entries
        WHERE ($1::varchar IS NULL OR region = $1)
          AND ($2::varchar IS NULL OR mode = $2)
        ORDER BY score DESC, created_at ASC
        LIMIT $3
        "#,
    )
    .bind(filter.region.as_deref())
    .bind(filter.mode.map(|m| m.as_str()))
    .bind(limit)
    .fetch_all(pool)
    .await
}

/// `GameStore` backed by Postgres
#[derive(Clone)]
pub struct PgGameStore {
    pool: PgPool,
}

impl PgGameStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Apply pending schema migrations
    pub async fn migrate(&self) -> StoreResult<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl GameStore for PgGameStore {
    async fn create_session(
        &self,
        session: NewSession,
        rounds: Vec<NewRound>,
    ) -> StoreResult<SessionWithRounds> {
        Ok(create_session(&self.pool, &session, &rounds).await?)
    }

    async fn get_session(&self, session_id: Uuid) -> StoreResult<Option<SessionWithRounds>> {
        let Some(session) = get_session(&self.pool, session_id).await? else {
            return Ok(None);
        };
        let rounds = get_rounds(&self.pool, session_id).await?;
        Ok(Some(SessionWithRounds { session, rounds }))
    }

    async fn update_round(
        &self,
        session_id: Uuid,
        round_number: i32,
        result: &RoundResult,
    ) -> StoreResult<bool> {
        Ok(update_round(&self.pool, session_id, round_number, result).await?)
    }

    async fn get_rounds(&self, session_id: Uuid) -> StoreResult<Vec<Round>> {
        Ok(get_rounds(&self.pool, session_id).await?)
    }

    async fn update_session_progress(
        &self,
        session_id: Uuid,
        total_score: i32,
        current_round: i32,
    ) -> StoreResult<()> {
        Ok(update_session_progress(&self.pool, session_id, total_score, current_round).await?)
    }

    async fn fill_location_name(
        &self,
        session_id: Uuid,
        round_number: i32,
        location_name: &str,
    ) -> StoreResult<bool> {
        Ok(fill_location_name(&self.pool, session_id, round_number, location_name).await?)
    }

    async fn mark_completed(&self, session_id: Uuid) -> StoreResult<()> {
        Ok(mark_completed(&self.pool, session_id).await?)
    }

    async fn insert_leaderboard_entry(
        &self,
        entry: NewLeaderboardEntry,
    ) -> StoreResult<LeaderboardEntry> {
        Ok(insert_leaderboard_entry(&self.pool, &entry).await?)
    }

    async fn leaderboard(
        &self,
        filter: &LeaderboardFilter,
        limit: i64,
    ) -> StoreResult<Vec<LeaderboardEntry>> {
        Ok(leaderboard(&self.pool, filter, limit).await?)
    }

    async fn completed_sessions(
        &self,
        user_id: Option<Uuid>,
    ) -> StoreResult<Vec<SessionWithRounds>> {
        Ok(completed_sessions(&self.pool, user_id).await?)
    }

    async fn sessions_for_user(
        &self,
        user_id: Uuid,
        limit: i64,
    ) -> StoreResult<Vec<SessionWithRounds>> {
        Ok(sessions_for_user(&self.pool, user_id, limit).await?)
    }

    async fn get_user(&self, user_id: Uuid) -> StoreResult<Option<User>> {
        Ok(get_user(&self.pool, user_id).await?)
    }
}
