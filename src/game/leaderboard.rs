use std::{collections::BTreeMap, sync::Arc};

use uuid::Uuid;

use crate::{
    db::GameStore,
    error::{GameError, GameResult},
    models::{
        LeaderboardEntry, LeaderboardFilter, NewLeaderboardEntry, PlayerStats, RegionStats,
        SessionWithRounds,
    },
};

pub const DEFAULT_LEADERBOARD_LIMIT: i64 = 10;

/// Session completion, rankings and player statistics
#[derive(Clone)]
pub struct LeaderboardAggregator {
    store: Arc<dyn GameStore>,
}

impl LeaderboardAggregator {
    pub fn new(store: Arc<dyn GameStore>) -> Self {
        Self { store }
    }

    /// Mark a session completed and record a leaderboard entry when a display
    /// name is known.
    ///
    /// An authenticated caller's stored username wins over `username`.
    /// Completing the same session again records another entry.
    pub async fn complete_game(
        &self,
        session_id: Uuid,
        username: Option<&str>,
        caller: Option<Uuid>,
    ) -> GameResult<Option<LeaderboardEntry>> {
        let session = self
            .store
            .get_session(session_id)
            .await?
            .ok_or_else(|| GameError::NotFound(format!("session {} not found", session_id)))?
            .session;

        self.store.mark_completed(session_id).await?;

        let stored_name = match caller {
            Some(user_id) => self.store.get_user(user_id).await?.map(|u| u.username),
            None => None,
        };
        let display_name = stored_name.or_else(|| {
            username
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(str::to_string)
        });

        let Some(username) = display_name else {
            tracing::info!("Session {} completed anonymously", session_id);
            return Ok(None);
        };

        let entry = self
            .store
            .insert_leaderboard_entry(NewLeaderboardEntry {
                session_id,
                user_id: caller,
                username,
                score: session.total_score,
                region: session.region,
                mode: session.mode,
            })
            .await?;

        tracing::info!(
            "Session {} completed: {} scored {} ({}/{})",
            session_id,
            entry.username,
            entry.score,
            entry.region,
            entry.mode
        );

        Ok(Some(entry))
    }

    /// Top entries by score for the filter
    pub async fn leaderboard(
        &self,
        filter: &LeaderboardFilter,
        limit: Option<i64>,
    ) -> GameResult<Vec<LeaderboardEntry>> {
        let limit = limit.unwrap_or(DEFAULT_LEADERBOARD_LIMIT);
        Ok(self.store.leaderboard(filter, limit).await?)
    }

    /// Statistics over completed sessions, optionally for one player
    pub async fn player_stats(&self, user_id: Option<Uuid>) -> GameResult<PlayerStats> {
        let sessions = self.store.completed_sessions(user_id).await?;
        Ok(compute_stats(&sessions))
    }

    /// A player's recent sessions, newest first
    pub async fn my_games(&self, user_id: Uuid, limit: i64) -> GameResult<Vec<SessionWithRounds>> {
        Ok(self.store.sessions_for_user(user_id, limit).await?)
    }
}

/// Aggregate completed sessions into player statistics.
///
/// Regions are listed alphabetically.
pub fn compute_stats(sessions: &[SessionWithRounds]) -> PlayerStats {
    if sessions.is_empty() {
        return PlayerStats::default();
    }

    let total_games = sessions.len() as i64;
    let total_rounds: i64 = sessions.iter().map(|s| s.rounds.len() as i64).sum();
    let total_points: i64 = sessions.iter().map(|s| s.session.total_score as i64).sum();
    let best_score = sessions
        .iter()
        .map(|s| s.session.total_score)
        .max()
        .unwrap_or(0);

    let distances: Vec<f64> = sessions
        .iter()
        .flat_map(|s| s.rounds.iter().filter_map(|r| r.distance))
        .collect();
    let average_distance = if distances.is_empty() {
        0.0
    } else {
        distances.iter().sum::<f64>() / distances.len() as f64
    };

    let mut regions: BTreeMap<&str, (i64, i64)> = BTreeMap::new();
    for s in sessions {
        let (games, points) = regions.entry(s.session.region.as_str()).or_default();
        *games += 1;
        *points += s.session.total_score as i64;
    }
    let games_by_region = regions
        .into_iter()
        .map(|(region, (games, points))| RegionStats {
            region: region.to_string(),
            games_played: games,
            average_score: points as f64 / games as f64,
        })
        .collect();

    PlayerStats {
        total_games,
        total_rounds,
        total_points,
        best_score,
        average_score: total_points as f64 / total_games as f64,
        average_distance,
        games_by_region,
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use tokio_test::assert_err;

    use super::*;
    use crate::{
        corpus::tests::test_corpus,
        db::MemoryGameStore,
        game::{RoundSubmission, ScoringStrategy, SessionManager},
        models::{GameMode, User},
    };

    struct Harness {
        store: Arc<MemoryGameStore>,
        sessions: SessionManager,
        leaderboard: LeaderboardAggregator,
    }

    fn harness() -> Harness {
        let store = Arc::new(MemoryGameStore::new());
        Harness {
            sessions: SessionManager::new(
                store.clone(),
                Arc::new(test_corpus()),
                ScoringStrategy::ClientSupplied,
            ),
            leaderboard: LeaderboardAggregator::new(store.clone()),
            store,
        }
    }

    /// Play every round of a session with the given points and distance
    async fn play(
        h: &Harness,
        region: &str,
        mode: GameMode,
        user_id: Option<Uuid>,
        points: [i32; 5],
        distance: f64,
    ) -> Uuid {
        let game = h.sessions.start_game(Some(region), mode, user_id).await.unwrap();
        for (idx, p) in points.iter().enumerate() {
            h.sessions
                .submit_round(
                    game.session.id,
                    idx as i32 + 1,
                    RoundSubmission {
                        guess_lat: 0.0,
                        guess_lng: 0.0,
                        distance,
                        points: *p,
                        location_name: Some("Somewhere".to_string()),
                    },
                )
                .await
                .unwrap();
        }
        game.session.id
    }

    #[tokio::test]
    async fn test_complete_game_records_entry() {
        let h = harness();
        let id = play(&h, "europe", GameMode::Classic, None, [1000; 5], 10.0).await;

        let entry = h
            .leaderboard
            .complete_game(id, Some("alice"), None)
            .await
            .unwrap()
            .expect("named completion records an entry");

        assert_eq!(entry.username, "alice");
        assert_eq!(entry.score, 5000);
        assert_eq!(entry.region, "europe");
        assert_eq!(entry.mode, GameMode::Classic);
        assert_eq!(entry.session_id, id);

        let session = h.sessions.get_session(id).await.unwrap().unwrap();
        assert!(session.session.completed);
    }

    #[tokio::test]
    async fn test_anonymous_completion_records_nothing() {
        let h = harness();
        let id = play(&h, "usa", GameMode::Timed, None, [100; 5], 10.0).await;

        assert!(h.leaderboard.complete_game(id, None, None).await.unwrap().is_none());
        assert!(h.leaderboard.complete_game(id, Some("   "), None).await.unwrap().is_none());

        let session = h.sessions.get_session(id).await.unwrap().unwrap();
        assert!(session.session.completed);
        let entries = h
            .leaderboard
            .leaderboard(&LeaderboardFilter::default(), None)
            .await
            .unwrap();
        assert!(entries.is_empty());
    }

    #[tokio::test]
    async fn test_completing_twice_records_two_entries() {
        let h = harness();
        let id = play(&h, "europe", GameMode::Classic, None, [500; 5], 10.0).await;

        let first = h.leaderboard.complete_game(id, Some("bob"), None).await.unwrap();
        let second = h.leaderboard.complete_game(id, Some("bob"), None).await.unwrap();
        assert_ne!(first.unwrap().id, second.unwrap().id);

        let entries = h
            .leaderboard
            .leaderboard(&LeaderboardFilter::default(), None)
            .await
            .unwrap();
        assert_eq!(entries.len(), 2);
        assert!(entries.iter().all(|e| e.session_id == id));
    }

    #[tokio::test]
    async fn test_authenticated_username_overrides_supplied() {
        let h = harness();
        let user_id = Uuid::new_v4();
        h.store.insert_user(User {
            id: user_id,
            email: "carol@example.com".to_string(),
            username: "carol".to_string(),
            created_at: Utc::now(),
        });
        let id = play(&h, "europe", GameMode::Classic, Some(user_id), [10; 5], 10.0).await;

        let entry = h
            .leaderboard
            .complete_game(id, Some("impostor"), Some(user_id))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(entry.username, "carol");
        assert_eq!(entry.user_id, Some(user_id));

        // Authenticated without a name supplied still records the stored name
        let entry = h
            .leaderboard
            .complete_game(id, None, Some(user_id))
            .await
            .unwrap();
        assert_eq!(entry.map(|e| e.username).as_deref(), Some("carol"));
    }

    #[tokio::test]
    async fn test_complete_unknown_session_is_not_found() {
        let h = harness();
        let err = assert_err!(
            h.leaderboard
                .complete_game(Uuid::new_v4(), Some("dave"), None)
                .await
        );
        assert!(matches!(err, GameError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_leaderboard_filters_sorts_and_limits() {
        let h = harness();
        let scores = [
            ("usa", GameMode::Classic, 900),
            ("usa", GameMode::Classic, 4000),
            ("europe", GameMode::Classic, 9000),
            ("usa", GameMode::Timed, 2500),
            ("usa", GameMode::Classic, 100),
            ("usa", GameMode::Classic, 3000),
        ];
        for (i, (region, mode, total)) in scores.iter().enumerate() {
            let per_round = total / 5;
            let id = play(&h, region, *mode, None, [per_round; 5], 1.0).await;
            let name = format!("player{}", i);
            h.leaderboard
                .complete_game(id, Some(name.as_str()), None)
                .await
                .unwrap();
        }

        let filter = LeaderboardFilter {
            region: Some("usa".to_string()),
            mode: None,
        };
        let top = h.leaderboard.leaderboard(&filter, Some(3)).await.unwrap();
        assert_eq!(top.len(), 3);
        assert!(top.iter().all(|e| e.region == "usa"));
        let ranked: Vec<i32> = top.iter().map(|e| e.score).collect();
        assert_eq!(ranked, vec![4000, 3000, 2500]);

        let classic_usa = LeaderboardFilter {
            region: Some("usa".to_string()),
            mode: Some(GameMode::Classic),
        };
        let all = h.leaderboard.leaderboard(&classic_usa, None).await.unwrap();
        let ranked: Vec<i32> = all.iter().map(|e| e.score).collect();
        assert_eq!(ranked, vec![4000, 3000, 900, 100]);
    }

    #[tokio::test]
    async fn test_player_stats_empty() {
        let h = harness();
        // Unfinished sessions are not counted
        h.sessions
            .start_game(Some("europe"), GameMode::Classic, None)
            .await
            .unwrap();

        let stats = h.leaderboard.player_stats(None).await.unwrap();
        assert_eq!(stats, PlayerStats::default());
        assert_eq!(stats.total_games, 0);
        assert!(stats.games_by_region.is_empty());
    }

    #[tokio::test]
    async fn test_player_stats_aggregates_completed_sessions() {
        let h = harness();
        let user_id = Uuid::new_v4();

        let a = play(&h, "europe", GameMode::Classic, Some(user_id), [1000; 5], 10.0).await;
        let b = play(&h, "usa", GameMode::Classic, Some(user_id), [200; 5], 30.0).await;
        let c = play(&h, "europe", GameMode::Timed, None, [600; 5], 50.0).await;
        for id in [a, b, c] {
            h.leaderboard.complete_game(id, None, None).await.unwrap();
        }
        // Never completed
        play(&h, "usa", GameMode::Classic, Some(user_id), [5000; 5], 0.0).await;

        let stats = h.leaderboard.player_stats(None).await.unwrap();
        assert_eq!(stats.total_games, 3);
        assert_eq!(stats.total_rounds, 15);
        assert_eq!(stats.total_points, 5000 + 1000 + 3000);
        assert_eq!(stats.best_score, 5000);
        assert!((stats.average_score - 3000.0).abs() < 1e-9);
        assert!((stats.average_distance - 30.0).abs() < 1e-9);
        assert_eq!(
            stats.games_by_region,
            vec![
                RegionStats {
                    region: "europe".to_string(),
                    games_played: 2,
                    average_score: 4000.0,
                },
                RegionStats {
                    region: "usa".to_string(),
                    games_played: 1,
                    average_score: 1000.0,
                },
            ]
        );

        let mine = h.leaderboard.player_stats(Some(user_id)).await.unwrap();
        assert_eq!(mine.total_games, 2);
        assert_eq!(mine.total_points, 6000);
        assert!((mine.average_distance - 20.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_my_games_lists_only_own_sessions() {
        let h = harness();
        let user_id = Uuid::new_v4();
        play(&h, "europe", GameMode::Classic, Some(user_id), [1; 5], 1.0).await;
        play(&h, "usa", GameMode::Timed, Some(user_id), [2; 5], 1.0).await;
        play(&h, "usa", GameMode::Timed, None, [3; 5], 1.0).await;

        let games = h.leaderboard.my_games(user_id, 10).await.unwrap();
        assert_eq!(games.len(), 2);
        assert!(games.iter().all(|g| g.session.user_id == Some(user_id)));

        let limited = h.leaderboard.my_games(user_id, 1).await.unwrap();
        assert_eq!(limited.len(), 1);
    }

    #[test]
    fn test_compute_stats_ignores_rounds_without_distance() {
        let now = Utc::now();
        let session = SessionWithRounds {
            session: crate::models::GameSession {
                id: Uuid::nil(),
                region: "europe".to_string(),
                mode: GameMode::Classic,
                current_round: 2,
                total_score: 4000,
                completed: true,
                user_id: None,
                created_at: now,
            },
            rounds: (1..=5)
                .map(|n| crate::models::Round {
                    session_id: Uuid::nil(),
                    round_number: n,
                    image_id: format!("img-{}", n),
                    actual_lat: 0.0,
                    actual_lng: 0.0,
                    guess_lat: (n == 1).then_some(0.0),
                    guess_lng: (n == 1).then_some(0.0),
                    distance: (n == 1).then_some(42.0),
                    points: (n == 1).then_some(4000),
                    location_name: None,
                })
                .collect(),
        };

        let stats = compute_stats(&[session]);
        assert_eq!(stats.total_rounds, 5);
        assert!((stats.average_distance - 42.0).abs() < 1e-9);
        assert!((stats.average_score - 4000.0).abs() < 1e-9);
    }
}
