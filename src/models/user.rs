use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Account row owned by the identity provider; only read here for attribution
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    /// Display name used on the leaderboard
    pub username: String,
    pub created_at: DateTime<Utc>,
}
