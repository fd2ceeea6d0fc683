use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use uuid::Uuid;

use super::{GameStore, NewSession};
use crate::{
    error::StoreResult,
    models::{
        GameSession, LeaderboardEntry, LeaderboardFilter, NewLeaderboardEntry, NewRound, Round,
        RoundResult, SessionWithRounds, User,
    },
};

/// Process-local `GameStore`, used when no database is configured.
///
/// Each map entry is locked independently, so concurrent submissions for the
/// same round resolve as last-write-wins, as they do in Postgres.
#[derive(Default)]
pub struct MemoryGameStore {
    sessions: DashMap<Uuid, SessionWithRounds>,
    leaderboard: DashMap<Uuid, LeaderboardEntry>,
    users: DashMap<Uuid, User>,
}

impl MemoryGameStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an account so completions can resolve its username
    pub fn insert_user(&self, user: User) {
        self.users.insert(user.id, user);
    }
}

#[async_trait]
impl GameStore for MemoryGameStore {
    async fn create_session(
        &self,
        session: NewSession,
        rounds: Vec<NewRound>,
    ) -> StoreResult<SessionWithRounds> {
        let id = Uuid::new_v4();
        let mut rounds: Vec<Round> = rounds
            .into_iter()
            .map(|r| Round {
                session_id: id,
                round_number: r.round_number,
                image_id: r.image_id,
                actual_lat: r.actual_lat,
                actual_lng: r.actual_lng,
                guess_lat: None,
                guess_lng: None,
                distance: None,
                points: None,
                location_name: None,
            })
            .collect();
        rounds.sort_by_key(|r| r.round_number);

        let stored = SessionWithRounds {
            session: GameSession {
                id,
                region: session.region,
                mode: session.mode,
                current_round: 1,
                total_score: 0,
                completed: false,
                user_id: session.user_id,
                created_at: Utc::now(),
            },
            rounds,
        };
        self.sessions.insert(id, stored.clone());
        Ok(stored)
    }

    async fn get_session(&self, session_id: Uuid) -> StoreResult<Option<SessionWithRounds>> {
        Ok(self.sessions.get(&session_id).map(|s| s.clone()))
    }

    async fn update_round(
        &self,
        session_id: Uuid,
        round_number: i32,
        result: &RoundResult,
    ) -> StoreResult<bool> {
        let Some(mut entry) = self.sessions.get_mut(&session_id) else {
            return Ok(false);
        };
        let Some(round) = entry
            .rounds
            .iter_mut()
            .find(|r| r.round_number == round_number)
        else {
            return Ok(false);
        };

        round.guess_lat = Some(result.guess_lat);
        round.guess_lng = Some(result.guess_lng);
        round.distance = Some(result.distance);
        round.points = Some(result.points);
        round.location_name = result.location_name.clone();
        Ok(true)
    }

    async fn get_rounds(&self, session_id: Uuid) -> StoreResult<Vec<Round>> {
        Ok(self
            .sessions
            .get(&session_id)
            .map(|s| s.rounds.clone())
            .unwrap_or_default())
    }

    async fn update_session_progress(
        &self,
        session_id: Uuid,
        total_score: i32,
        current_round: i32,
    ) -> StoreResult<()> {
        if let Some(mut entry) = self.sessions.get_mut(&session_id) {
            entry.session.total_score = total_score;
            entry.session.current_round = current_round;
        }
        Ok(())
    }

    async fn fill_location_name(
        &self,
        session_id: Uuid,
        round_number: i32,
        location_name: &str,
    ) -> StoreResult<bool> {
        let Some(mut entry) = self.sessions.get_mut(&session_id) else {
            return Ok(false);
        };
        match entry
            .rounds
            .iter_mut()
            .find(|r| r.round_number == round_number && r.location_name.is_none())
        {
            Some(round) => {
                round.location_name = Some(location_name.to_string());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn mark_completed(&self, session_id: Uuid) -> StoreResult<()> {
        if let Some(mut entry) = self.sessions.get_mut(&session_id) {
            entry.session.completed = true;
        }
        Ok(())
    }

    async fn insert_leaderboard_entry(
        &self,
        entry: NewLeaderboardEntry,
    ) -> StoreResult<LeaderboardEntry> {
        let stored = LeaderboardEntry {
            id: Uuid::new_v4(),
            session_id: entry.session_id,
            user_id: entry.user_id,
            username: entry.username,
            score: entry.score,
            region: entry.region,
            mode: entry.mode,
            created_at: Utc::now(),
        };
        self.leaderboard.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn leaderboard(
        &self,
        filter: &LeaderboardFilter,
        limit: i64,
    ) -> StoreResult<Vec<LeaderboardEntry>> {
        let mut entries: Vec<LeaderboardEntry> = self
            .leaderboard
            .iter()
            .filter(|e| filter.matches(e.value()))
            .map(|e| e.value().clone())
            .collect();
        entries.sort_by(|a, b| {
            b.score
                .cmp(&a.score)
                .then_with(|| a.created_at.cmp(&b.created_at))
        });
        entries.truncate(usize::try_from(limit).unwrap_or(0));
        Ok(entries)
    }

    async fn completed_sessions(
        &self,
        user_id: Option<Uuid>,
    ) -> StoreResult<Vec<SessionWithRounds>> {
        let mut sessions: Vec<SessionWithRounds> = self
            .sessions
            .iter()
            .filter(|s| s.session.completed)
            .filter(|s| user_id.is_none_or(|id| s.session.user_id == Some(id)))
            .map(|s| s.value().clone())
            .collect();
        sessions.sort_by_key(|s| s.session.created_at);
        Ok(sessions)
    }

    async fn sessions_for_user(
        &self,
        user_id: Uuid,
        limit: i64,
    ) -> StoreResult<Vec<SessionWithRounds>> {
        let mut sessions: Vec<SessionWithRounds> = self
            .sessions
            .iter()
            .filter(|s| s.session.user_id == Some(user_id))
            .map(|s| s.value().clone())
            .collect();
        sessions.sort_by(|a, b| b.session.created_at.cmp(&a.session.created_at));
        sessions.truncate(usize::try_from(limit).unwrap_or(0));
        Ok(sessions)
    }

    async fn get_user(&self, user_id: Uuid) -> StoreResult<Option<User>> {
        Ok(self.users.get(&user_id).map(|u| u.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::GameMode;

    fn new_rounds() -> Vec<NewRound> {
        (1..=5)
            .rev()
            .map(|n| NewRound {
                round_number: n,
                image_id: format!("img-{}", n),
                actual_lat: n as f64,
                actual_lng: -(n as f64),
            })
            .collect()
    }

    fn new_session() -> NewSession {
        NewSession {
            region: "europe".to_string(),
            mode: GameMode::Classic,
            user_id: None,
        }
    }

    #[tokio::test]
    async fn test_create_session_orders_rounds() {
        let store = MemoryGameStore::new();
        let created = store
            .create_session(new_session(), new_rounds())
            .await
            .unwrap();

        let numbers: Vec<i32> = created.rounds.iter().map(|r| r.round_number).collect();
        assert_eq!(numbers, vec![1, 2, 3, 4, 5]);
        assert!(created.rounds.iter().all(|r| r.session_id == created.session.id));

        let fetched = store.get_session(created.session.id).await.unwrap();
        assert!(fetched.is_some());
    }

    #[tokio::test]
    async fn test_update_round_reports_missing_round() {
        let store = MemoryGameStore::new();
        let created = store
            .create_session(new_session(), new_rounds())
            .await
            .unwrap();
        let result = RoundResult {
            guess_lat: 0.0,
            guess_lng: 0.0,
            distance: 12.0,
            points: 4200,
            location_name: None,
        };

        assert!(store.update_round(created.session.id, 2, &result).await.unwrap());
        assert!(!store.update_round(created.session.id, 9, &result).await.unwrap());
        assert!(!store.update_round(Uuid::new_v4(), 2, &result).await.unwrap());
    }

    #[tokio::test]
    async fn test_fill_location_name_keeps_existing_value() {
        let store = MemoryGameStore::new();
        let created = store
            .create_session(new_session(), new_rounds())
            .await
            .unwrap();
        let id = created.session.id;

        assert!(store.fill_location_name(id, 1, "Paris, France").await.unwrap());
        assert!(!store.fill_location_name(id, 1, "Lyon, France").await.unwrap());

        let rounds = store.get_rounds(id).await.unwrap();
        assert_eq!(rounds[0].location_name.as_deref(), Some("Paris, France"));
    }
}
