// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Spotify-Session API Server
//!
//! Logs users in with Spotify and issues locally signed access and refresh
//! tokens wrapping the provider tokens.

use spotify_session::{
    config::Config,
    db::{FirestoreDb, InMemoryStore, UserStore},
    services::{OAuthProvider, SpotifyClient},
    AppState,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging
    init_logging()?;

    // Load configuration from environment
    let config = Config::from_env()?;
    tracing::info!(port = config.port, "Starting Spotify-Session API");

    // Initialize user store
    let db: Arc<dyn UserStore> = match &config.gcp_project_id {
        Some(project_id) => Arc::new(FirestoreDb::new(project_id).await?),
        None => {
            tracing::warn!("GCP_PROJECT_ID not set, users are kept in memory");
            Arc::new(InMemoryStore::new())
        }
    };

    // Initialize Spotify client
    let spotify: Arc<dyn OAuthProvider> = Arc::new(SpotifyClient::new(&config));

    // Build shared state
    let state = Arc::new(AppState::new(config.clone(), db, spotify));

    // Build router
    let app = spotify_session::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging.
fn init_logging() -> Result<(), Box<dyn std::error::Error>> {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("spotify_session=debug".parse()?)
                .add_directive("info".parse()?),
        )
        .with(format)
        .init();
    Ok(())
}
