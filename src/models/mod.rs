pub mod game;
pub mod image;
pub mod leaderboard;
pub mod user;

pub use game::{
    // Session state
    GameMode, GameSession, Round, SessionWithRounds,
    // Write-side inputs
    NewRound, RoundResult, ROUNDS_PER_SESSION,
};
pub use image::Image;
pub use leaderboard::{
    LeaderboardEntry, LeaderboardFilter, NewLeaderboardEntry, PlayerStats, RegionStats,
};
pub use user::User;
