// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application configuration loaded from environment variables.
//!
//! Everything is read once at startup and handed to the services that need
//! it; nothing below `main` touches the process environment.

use std::env;

/// Name of the cookie carrying the OAuth `state` nonce between `/login` and `/callback`.
pub const STATE_COOKIE_NAME: &str = "spotify_auth_state";

/// Scopes requested from Spotify on login.
pub const SPOTIFY_SCOPES: &str =
    "user-read-private playlist-modify-public playlist-modify-private user-read-email";

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    // --- Environment Variables (non-sensitive) ---
    /// Spotify OAuth client ID (public)
    pub client_id: String,
    /// Redirect URL registered with Spotify (points at `/callback`)
    pub redirect_url: String,
    /// Frontend URL for redirects and CORS
    pub frontend_url: String,
    /// GCP project ID. `None` keeps users in memory.
    pub gcp_project_id: Option<String>,
    /// Server port
    pub port: u16,

    // --- Secrets ---
    /// Spotify OAuth client secret
    pub client_secret: String,
    /// Signing key for access tokens (raw bytes)
    pub access_token_secret: Vec<u8>,
    /// Signing key for refresh tokens (raw bytes)
    pub refresh_token_secret: Vec<u8>,
}

impl Config {
    /// Config for testing only.
    pub fn test_default() -> Self {
        Self {
            client_id: "test_client_id".to_string(),
            redirect_url: "http://localhost:8888/callback".to_string(),
            frontend_url: "http://localhost:3000".to_string(),
            gcp_project_id: None,
            port: 8888,
            client_secret: "test_secret".to_string(),
            access_token_secret: b"test_access_key_32_bytes_minimum!".to_vec(),
            refresh_token_secret: b"test_refresh_key_32_bytes_minimum".to_vec(),
        }
    }

    /// Load configuration from environment variables.
    ///
    /// A `.env` file in the working directory is honoured for local development.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let config = Self {
            client_id: required("CLIENT_ID")?,
            redirect_url: required("REDIRECT_URL")?,
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),
            gcp_project_id: env::var("GCP_PROJECT_ID")
                .ok()
                .filter(|v| !v.trim().is_empty()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8888".to_string())
                .parse()
                .unwrap_or(8888),

            client_secret: required("CLIENT_SECRET")?,
            access_token_secret: required("ACCESS_TOKEN_SECRET")?.into_bytes(),
            refresh_token_secret: required("REFRESH_TOKEN_SECRET")?.into_bytes(),
        };

        config.validate()?;
        Ok(config)
    }

    /// Reject secret combinations that would let one token type forge the other.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.access_token_secret.is_empty() || self.refresh_token_secret.is_empty() {
            return Err(ConfigError::Invalid("token secrets must not be empty"));
        }
        if self.access_token_secret == self.refresh_token_secret {
            return Err(ConfigError::Invalid(
                "ACCESS_TOKEN_SECRET and REFRESH_TOKEN_SECRET must differ",
            ));
        }
        Ok(())
    }

    /// Whether cookies should carry the `Secure` attribute.
    pub fn secure_cookies(&self) -> bool {
        self.frontend_url.starts_with("https://")
    }
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    env::var(name)
        .map(|v| v.trim().to_string())
        .map_err(|_| ConfigError::Missing(name))
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid configuration: {0}")]
    Invalid(&'static str),
}
