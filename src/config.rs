use anyhow::{Context, Result};
use serde::Deserialize;
use std::{env, str::FromStr};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub security: SecurityConfig,
    pub game: GameConfig,
    pub geocoder: GeocoderConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Unset means sessions live in process memory only
    pub url: Option<String>,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub frontend_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SecurityConfig {
    pub access_token_secret: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GameConfig {
    pub images_path: String,
    pub timed_round_seconds: u32,
    /// Recompute distance/points from stored coordinates instead of trusting the client
    pub server_scoring: bool,
    /// Fill in missing round location names in the background
    pub resolve_location_names: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeocoderConfig {
    pub url: String,
    pub user_agent: String,
    pub max_retries: u32,
    pub initial_backoff_ms: u64,
    pub timeout_secs: u64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let database = DatabaseConfig {
            url: env::var("DATABASE_URL").ok().filter(|url| !url.is_empty()),
            max_connections: parse_var("DATABASE_MAX_CONNECTIONS", "10")?,
        };

        let server = ServerConfig {
            host: env::var("HOST")
                .unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: parse_var("PORT", "4000")?,
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
        };

        let security = SecurityConfig {
            access_token_secret: env::var("ACCESS_TOKEN_SECRET")
                .context("ACCESS_TOKEN_SECRET must be set")?,
        };

        let game = GameConfig {
            images_path: env::var("IMAGES_PATH")
                .unwrap_or_else(|_| "./data/images.json".to_string()),
            timed_round_seconds: parse_var("TIMED_ROUND_SECONDS", "30")?,
            server_scoring: parse_flag("SERVER_SCORING", false),
            resolve_location_names: parse_flag("RESOLVE_LOCATION_NAMES", true),
        };

        let geocoder = GeocoderConfig {
            url: env::var("GEOCODER_URL")
                .unwrap_or_else(|_| "https://nominatim.openstreetmap.org/reverse".to_string()),
            user_agent: env::var("GEOCODER_USER_AGENT").unwrap_or_else(|_| {
                format!("locatr-backend/{}", env!("CARGO_PKG_VERSION"))
            }),
            max_retries: parse_var("GEOCODER_MAX_RETRIES", "3")?,
            initial_backoff_ms: parse_var("GEOCODER_INITIAL_BACKOFF_MS", "1000")?,
            timeout_secs: parse_var("GEOCODER_TIMEOUT_SECS", "10")?,
        };

        Ok(Config {
            database,
            server,
            security,
            game,
            geocoder,
        })
    }

    pub fn database_url(&self) -> Option<&str> {
        self.database.url.as_deref()
    }

    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

/// Parse a numeric variable, failing on anything that does not parse
fn parse_var<T>(var: &str, default: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    env::var(var)
        .unwrap_or_else(|_| default.to_string())
        .parse()
        .with_context(|| format!("{} must be a number", var))
}

fn parse_flag(var: &str, default: bool) -> bool {
    match env::var(var) {
        Ok(value) => matches!(
            value.trim().to_ascii_lowercase().as_str(),
            "1" | "true" | "yes" | "on"
        ),
        Err(_) => default,
    }
}
