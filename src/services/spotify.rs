// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Spotify OAuth client.
//!
//! Handles:
//! - Authorization code exchange
//! - Provider access token refresh
//! - Identity lookup (`/v1/me`)
//!
//! Every response is untrusted: missing or empty fields are rejected here so
//! nothing downstream ever sees a half-filled token.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::Deserialize;

use crate::config::{Config, SPOTIFY_SCOPES};

const ACCOUNTS_BASE_URL: &str = "https://accounts.spotify.com";
const API_BASE_URL: &str = "https://api.spotify.com/v1";

/// Failures talking to the OAuth provider.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// Transport failure or non-success status.
    #[error("Upstream request failed: {0}")]
    Upstream(String),

    /// Success status, but the body is missing a required field.
    #[error("Invalid upstream response: {0}")]
    InvalidResponse(String),
}

/// Tokens returned by the authorization code exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderTokens {
    pub access_token: String,
    pub refresh_token: String,
}

/// The authenticated Spotify account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderIdentity {
    pub external_id: String,
    pub email: String,
}

/// The OAuth exchange operations the token lifecycle depends on.
#[async_trait]
pub trait OAuthProvider: Send + Sync {
    /// URL the user is sent to in order to grant access.
    fn authorize_url(&self, state: &str) -> String;

    /// Exchange an authorization code for provider tokens.
    async fn exchange_code(&self, code: &str) -> Result<ProviderTokens, ProviderError>;

    /// Obtain a fresh provider access token from a provider refresh token.
    async fn refresh_provider_token(&self, refresh_token: &str) -> Result<String, ProviderError>;

    /// Look up the account that owns `access_token`.
    async fn fetch_identity(&self, access_token: &str) -> Result<ProviderIdentity, ProviderError>;
}

/// Raw token endpoint body; every field optional until validated.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    refresh_token: Option<String>,
}

/// Raw `/v1/me` body.
#[derive(Debug, Deserialize)]
struct MeResponse {
    id: Option<String>,
    email: Option<String>,
}

/// Error body from the accounts service.
#[derive(Debug, Deserialize)]
struct OAuthErrorBody {
    error: Option<String>,
    error_description: Option<String>,
}

fn require(field: Option<String>, name: &str) -> Result<String, ProviderError> {
    match field {
        Some(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(ProviderError::InvalidResponse(format!("missing {}", name))),
    }
}

/// Spotify Web API client.
#[derive(Clone)]
pub struct SpotifyClient {
    http: reqwest::Client,
    accounts_url: String,
    api_url: String,
    client_id: String,
    client_secret: String,
    redirect_url: String,
}

impl SpotifyClient {
    /// Create a new Spotify client with OAuth credentials.
    pub fn new(config: &Config) -> Self {
        Self::with_base_urls(config, ACCOUNTS_BASE_URL, API_BASE_URL)
    }

    /// Create a client pointed at alternative endpoints (used by tests).
    pub fn with_base_urls(config: &Config, accounts_url: &str, api_url: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            accounts_url: accounts_url.trim_end_matches('/').to_string(),
            api_url: api_url.trim_end_matches('/').to_string(),
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            redirect_url: config.redirect_url.clone(),
        }
    }

    fn build_authorize_url(&self, state: &str) -> String {
        format!(
            "{}/authorize?\
             response_type=code&\
             client_id={}&\
             scope={}&\
             redirect_uri={}&\
             state={}",
            self.accounts_url,
            urlencoding::encode(&self.client_id),
            urlencoding::encode(SPOTIFY_SCOPES),
            urlencoding::encode(&self.redirect_url),
            urlencoding::encode(state),
        )
    }

    fn basic_auth_header(&self) -> String {
        let credentials = format!("{}:{}", self.client_id, self.client_secret);
        format!("Basic {}", STANDARD.encode(credentials.as_bytes()))
    }

    async fn post_token_form(&self, form: &[(&str, &str)]) -> Result<TokenResponse, ProviderError> {
        let response = self
            .http
            .post(format!("{}/api/token", self.accounts_url))
            .header(reqwest::header::AUTHORIZATION, self.basic_auth_header())
            .form(form)
            .send()
            .await
            .map_err(|e| ProviderError::Upstream(format!("Token request failed: {}", e)))?;

        check_response_json(response).await
    }
}

#[async_trait]
impl OAuthProvider for SpotifyClient {
    fn authorize_url(&self, state: &str) -> String {
        self.build_authorize_url(state)
    }

    async fn exchange_code(&self, code: &str) -> Result<ProviderTokens, ProviderError> {
        let body = self
            .post_token_form(&[
                ("grant_type", "authorization_code"),
                ("code", code),
                ("redirect_uri", self.redirect_url.as_str()),
            ])
            .await?;

        Ok(ProviderTokens {
            access_token: require(body.access_token, "access_token")?,
            refresh_token: require(body.refresh_token, "refresh_token")?,
        })
    }

    async fn refresh_provider_token(&self, refresh_token: &str) -> Result<String, ProviderError> {
        let body = self
            .post_token_form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
            ])
            .await?;

        require(body.access_token, "access_token")
    }

    async fn fetch_identity(&self, access_token: &str) -> Result<ProviderIdentity, ProviderError> {
        let response = self
            .http
            .get(format!("{}/me", self.api_url))
            .bearer_auth(access_token)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| ProviderError::Upstream(format!("Identity request failed: {}", e)))?;

        let body: MeResponse = check_response_json(response).await?;

        Ok(ProviderIdentity {
            external_id: require(body.id, "id")?,
            email: require(body.email, "email")?,
        })
    }
}

/// Check response status and parse the JSON body.
async fn check_response_json<T: for<'de> Deserialize<'de>>(
    response: reqwest::Response,
) -> Result<T, ProviderError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();

        if status.as_u16() == 429 {
            tracing::warn!("Spotify rate limit hit (429)");
        }

        let detail = serde_json::from_str::<OAuthErrorBody>(&body)
            .ok()
            .and_then(|e| e.error_description.or(e.error))
            .unwrap_or(body);

        return Err(ProviderError::Upstream(format!("HTTP {}: {}", status, detail)));
    }

    response
        .json()
        .await
        .map_err(|e| ProviderError::InvalidResponse(format!("JSON parse error: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_authorize_url_carries_oauth_parameters() {
        let client = SpotifyClient::new(&Config::test_default());
        let url = client.authorize_url("abc123");

        assert!(url.starts_with("https://accounts.spotify.com/authorize?"));
        assert!(url.contains("response_type=code"));
        assert!(url.contains("client_id=test_client_id"));
        assert!(url.contains("state=abc123"));
        assert!(url.contains("scope=user-read-private%20playlist-modify-public"));
        assert!(url.contains("redirect_uri=http%3A%2F%2Flocalhost%3A8888%2Fcallback"));
    }

    #[test]
    fn test_basic_auth_header() {
        let client = SpotifyClient::new(&Config::test_default());
        // base64("test_client_id:test_secret")
        assert_eq!(
            client.basic_auth_header(),
            "Basic dGVzdF9jbGllbnRfaWQ6dGVzdF9zZWNyZXQ="
        );
    }

    #[test]
    fn test_require_rejects_empty() {
        assert!(require(None, "id").is_err());
        assert!(require(Some("  ".to_string()), "id").is_err());
        assert_eq!(require(Some("x".to_string()), "id").unwrap(), "x");
    }
}
