use std::sync::Arc;

use rand::seq::IndexedRandom;
use uuid::Uuid;

use super::scorer::{Coordinate, Scorer};
use crate::{
    corpus::ImageCorpus,
    db::{GameStore, NewSession},
    error::{GameError, GameResult},
    geocode::GeocodeResolver,
    models::{
        game::{next_round, total_score},
        GameMode, NewRound, RoundResult, SessionWithRounds, ROUNDS_PER_SESSION,
    },
};

/// Region label stored for sessions drawn from the whole corpus
pub const ALL_REGIONS: &str = "world";

/// Where a round's distance and points come from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoringStrategy {
    /// Persist the values computed by the client
    ClientSupplied,
    /// Recompute from the round's stored location and the guess
    ServerAuthoritative,
}

/// A guess for one round as sent by the client
#[derive(Debug, Clone)]
pub struct RoundSubmission {
    pub guess_lat: f64,
    pub guess_lng: f64,
    /// Negative when the round timed out without a guess
    pub distance: f64,
    pub points: i32,
    pub location_name: Option<String>,
}

impl RoundSubmission {
    /// An expired timed round arrives as a fallback guess with zero points
    fn is_timed_fallback(&self, mode: GameMode) -> bool {
        mode == GameMode::Timed && self.points == 0
    }

    fn into_result(
        self,
        actual: Coordinate,
        mode: GameMode,
        scoring: ScoringStrategy,
    ) -> RoundResult {
        let (distance, points) = match scoring {
            ScoringStrategy::ClientSupplied => (self.distance, self.points),
            // Timeouts keep their sentinel distance and score nothing
            ScoringStrategy::ServerAuthoritative if self.distance < 0.0 => (self.distance, 0),
            ScoringStrategy::ServerAuthoritative => {
                let score =
                    Scorer::score(actual, Coordinate::new(self.guess_lat, self.guess_lng));
                if self.is_timed_fallback(mode) {
                    (score.distance, 0)
                } else {
                    (score.distance, score.points)
                }
            }
        };

        RoundResult {
            guess_lat: self.guess_lat,
            guess_lng: self.guess_lng,
            distance,
            points,
            location_name: self.location_name,
        }
    }
}

/// Creates sessions and applies round submissions.
///
/// Holds no per-session state; everything lives in the store.
#[derive(Clone)]
pub struct SessionManager {
    store: Arc<dyn GameStore>,
    corpus: Arc<ImageCorpus>,
    scoring: ScoringStrategy,
    geocoder: Option<GeocodeResolver>,
}

impl SessionManager {
    pub fn new(
        store: Arc<dyn GameStore>,
        corpus: Arc<ImageCorpus>,
        scoring: ScoringStrategy,
    ) -> Self {
        Self {
            store,
            corpus,
            scoring,
            geocoder: None,
        }
    }

    /// Resolve missing round location names in the background
    pub fn with_location_names(mut self, geocoder: GeocodeResolver) -> Self {
        self.geocoder = Some(geocoder);
        self
    }

    /// Start a session of `ROUNDS_PER_SESSION` rounds sampled from `region`.
    ///
    /// Each round draws uniformly with replacement, so an image may repeat
    /// within a session. An empty or missing region samples the whole corpus.
    pub async fn start_game(
        &self,
        region: Option<&str>,
        mode: GameMode,
        user_id: Option<Uuid>,
    ) -> GameResult<SessionWithRounds> {
        let region = region.map(str::trim).filter(|r| !r.is_empty());

        // ThreadRng must be dropped before the first await
        let rounds = {
            let pool = self.corpus.pool(region);
            if pool.is_empty() {
                return Err(GameError::NotFound(format!(
                    "no images available for region: {}",
                    region.unwrap_or(ALL_REGIONS)
                )));
            }

            let mut rng = rand::rng();
            (1..=ROUNDS_PER_SESSION)
                .filter_map(|round_number| {
                    pool.choose(&mut rng).map(|img| NewRound {
                        round_number,
                        image_id: img.id.clone(),
                        actual_lat: img.lat,
                        actual_lng: img.lng,
                    })
                })
                .collect::<Vec<_>>()
        };

        let session = self
            .store
            .create_session(
                NewSession {
                    region: region.unwrap_or(ALL_REGIONS).to_string(),
                    mode,
                    user_id,
                },
                rounds,
            )
            .await?;

        tracing::info!(
            "Started {} session {} in region {}",
            session.session.mode,
            session.session.id,
            session.session.region
        );

        Ok(session)
    }

    pub async fn get_session(&self, session_id: Uuid) -> GameResult<Option<SessionWithRounds>> {
        Ok(self.store.get_session(session_id).await?)
    }

    /// Record the result of one round and re-derive the session totals.
    ///
    /// Overwrites any earlier result for the round. Concurrent submissions for
    /// the same round are last-write-wins.
    pub async fn submit_round(
        &self,
        session_id: Uuid,
        round_number: i32,
        submission: RoundSubmission,
    ) -> GameResult<SessionWithRounds> {
        let session = self
            .store
            .get_session(session_id)
            .await?
            .ok_or_else(|| GameError::NotFound(format!("session {} not found", session_id)))?;

        let round = session
            .rounds
            .iter()
            .find(|r| r.round_number == round_number)
            .ok_or_else(|| {
                GameError::NotFound(format!(
                    "round {} not found in session {}",
                    round_number, session_id
                ))
            })?;
        if !round.is_pending() {
            tracing::debug!(
                "Overwriting result for session {} round {}",
                session_id,
                round_number
            );
        }
        let actual = Coordinate::new(round.actual_lat, round.actual_lng);

        let result = submission.into_result(actual, session.session.mode, self.scoring);
        let needs_location_name = result.location_name.is_none();

        if !self
            .store
            .update_round(session_id, round_number, &result)
            .await?
        {
            return Err(GameError::NotFound(format!(
                "round {} not found in session {}",
                round_number, session_id
            )));
        }

        let rounds = self.store.get_rounds(session_id).await?;
        let total = total_score(&rounds);
        let current_round = next_round(round_number).max(session.session.current_round);
        self.store
            .update_session_progress(session_id, total, current_round)
            .await?;

        tracing::info!(
            "Session {} round {}: {} points ({:.1} km), total {}",
            session_id,
            round_number,
            result.points,
            result.distance,
            total
        );

        if needs_location_name {
            self.spawn_location_lookup(session_id, round_number, actual);
        }

        self.store
            .get_session(session_id)
            .await?
            .ok_or_else(|| GameError::NotFound(format!("session {} not found", session_id)))
    }

    /// Resolve the round's place name without holding up the submission
    fn spawn_location_lookup(&self, session_id: Uuid, round_number: i32, actual: Coordinate) {
        let Some(geocoder) = self.geocoder.clone() else {
            return;
        };
        let store = self.store.clone();

        tokio::spawn(async move {
            let name = geocoder.resolve(actual.lat, actual.lng).await;
            match store
                .fill_location_name(session_id, round_number, &name)
                .await
            {
                Ok(true) => tracing::debug!(
                    "Filled location name for session {} round {}: {}",
                    session_id,
                    round_number,
                    name
                ),
                Ok(false) => {}
                Err(e) => tracing::error!(
                    "Failed to store location name for session {} round {}: {}",
                    session_id,
                    round_number,
                    e
                ),
            }
        });
    }
}
