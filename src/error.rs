use axum::{http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;
use thiserror::Error;

/// Failures raised by a `GameStore` backend
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("migration failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Errors surfaced by game operations to the request layer.
///
/// Reverse-geocoding failures never appear here; the resolver absorbs them.
#[derive(Debug, Error)]
pub enum GameError {
    /// Unknown session or round, or an empty image pool
    #[error("not found: {0}")]
    NotFound(String),
    /// Missing or malformed arguments, rejected before any mutation
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("authentication required")]
    Unauthorized,
    /// Fatal for the current operation; not retried
    #[error("persistence failure")]
    Persistence(#[from] StoreError),
}

pub type GameResult<T> = Result<T, GameError>;

#[derive(Serialize)]
struct ErrorBody {
    message: String,
}

impl IntoResponse for GameError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            GameError::NotFound(_) => StatusCode::NOT_FOUND,
            GameError::Validation(_) => StatusCode::BAD_REQUEST,
            GameError::Unauthorized => StatusCode::UNAUTHORIZED,
            GameError::Persistence(source) => {
                tracing::error!("Persistence failure: {}", source);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let payload = Json(ErrorBody {
            message: self.to_string(),
        });

        (status, payload).into_response()
    }
}
