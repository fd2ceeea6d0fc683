mod auth;
mod config;
mod corpus;
mod db;
mod error;
mod game;
mod geocode;
mod models;
mod routes;

use std::{sync::Arc, time::Duration};

use anyhow::Result;
use axum::{http::HeaderValue, Router};
use config::Config;
use corpus::ImageCorpus;
use db::{GameStore, MemoryGameStore, PgGameStore};
use game::{LeaderboardAggregator, ScoringStrategy, SessionManager};
use geocode::{GeocodeResolver, NominatimClient, RetryPolicy, ReverseGeocode};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Application state shared across all handlers
pub struct AppState {
    pub config: Config,
    pub corpus: Arc<ImageCorpus>,
    pub sessions: SessionManager,
    pub leaderboard: LeaderboardAggregator,
    pub geocoder: GeocodeResolver,
}

impl AppState {
    /// Wire the game services over a store, corpus and geocoding backend
    pub fn new(
        config: Config,
        store: Arc<dyn GameStore>,
        corpus: ImageCorpus,
        geocode_backend: Arc<dyn ReverseGeocode>,
    ) -> Self {
        let corpus = Arc::new(corpus);
        let geocoder = GeocodeResolver::new(
            geocode_backend,
            RetryPolicy {
                max_retries: config.geocoder.max_retries,
                initial_backoff: Duration::from_millis(config.geocoder.initial_backoff_ms),
            },
        );

        let scoring = if config.game.server_scoring {
            ScoringStrategy::ServerAuthoritative
        } else {
            ScoringStrategy::ClientSupplied
        };
        let mut sessions = SessionManager::new(store.clone(), corpus.clone(), scoring);
        if config.game.resolve_location_names {
            sessions = sessions.with_location_names(geocoder.clone());
        }

        Self {
            config,
            corpus,
            sessions,
            leaderboard: LeaderboardAggregator::new(store),
            geocoder,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "locatr_backend=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Locatr backend server...");

    // Load configuration
    let config = Config::from_env()?;
    tracing::info!("Configuration loaded");

    // Connect to database, or keep everything in memory
    let store: Arc<dyn GameStore> = match config.database_url() {
        Some(url) => {
            let pool = db::create_pool(url, config.database.max_connections).await?;
            tracing::info!("Connected to database");

            let store = PgGameStore::new(pool);
            store.migrate().await?;
            tracing::info!("Database migrations completed");
            Arc::new(store)
        }
        None => {
            tracing::warn!("DATABASE_URL not set, sessions will not survive a restart");
            Arc::new(MemoryGameStore::new())
        }
    };

    // Load image corpus
    let corpus = match ImageCorpus::load(&config.game.images_path).await {
        Ok(corpus) => corpus,
        Err(e) => {
            tracing::warn!("Failed to load image corpus: {:#}. Using empty corpus.", e);
            tracing::warn!(
                "Place an images JSON file at {} to enable games",
                config.game.images_path
            );
            ImageCorpus::empty()
        }
    };

    // Shared HTTP client for the reverse geocoder
    let http_client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.geocoder.timeout_secs))
        .build()?;
    let geocode_backend = Arc::new(NominatimClient::new(
        http_client,
        &config.geocoder.url,
        &config.geocoder.user_agent,
    ));
    tracing::info!("Reverse geocoder: {}", config.geocoder.url);

    let cors = cors_layer(&config.server.frontend_url);
    let addr = config.server_addr();

    // Create application state
    let state = Arc::new(AppState::new(config, store, corpus, geocode_backend));

    // Build router
    let app = Router::new()
        .merge(routes::create_routes())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Server listening on {}", addr);
    tracing::info!("Health check: http://{}/health", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Allow the configured frontend origin, or any origin if it cannot be parsed
fn cors_layer(frontend_url: &str) -> CorsLayer {
    match frontend_url.parse::<HeaderValue>() {
        Ok(origin) => CorsLayer::new()
            .allow_origin(origin)
            .allow_methods(Any)
            .allow_headers(Any),
        Err(_) => {
            tracing::warn!("Invalid FRONTEND_URL {}, allowing any origin", frontend_url);
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
        }
    }
}
