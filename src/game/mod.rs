// Game engine: scoring, session lifecycle, completion and rankings

pub mod leaderboard;
pub mod scorer;
pub mod session;

pub use leaderboard::LeaderboardAggregator;
pub use session::{RoundSubmission, ScoringStrategy, SessionManager};
