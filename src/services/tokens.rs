// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Access/refresh token lifecycle.
//!
//! Access tokens are short-lived and carry the current Spotify access token.
//! Refresh tokens are long-lived and carry the user's token version at issue
//! time; bumping the stored version revokes every refresh token issued before
//! the bump. A refresh token is valid only while it is unexpired and its
//! version equals the stored one, and neither condition can recover.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::config::Config;
use crate::cookies::RefreshCookies;
use crate::db::{StoreError, UserStore};
use crate::models::User;
use crate::services::signer::{Signer, SignerError};
use crate::services::spotify::{OAuthProvider, ProviderError};

/// Lifetime of an access token.
pub const ACCESS_TOKEN_TTL: Duration = Duration::from_secs(60);

/// Lifetime of a refresh token (7 days).
pub const REFRESH_TOKEN_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

pub const MSG_NO_TOKEN: &str = "No token provided";
pub const MSG_INVALID_TOKEN: &str = "Invalid token";
pub const MSG_INVALID_PAYLOAD: &str = "Invalid payload";
pub const MSG_REVOKED: &str = "Token has been revoked";
pub const MSG_UPSTREAM: &str = "Unable to refresh Spotify token";
pub const MSG_STORE: &str = "Unable to load user";
pub const MSG_SUCCESS: &str = "Success: new token made";

fn rejection_message(err: &AuthError) -> &'static str {
    match err {
        AuthError::MissingCredential | AuthError::NotAuthenticated => MSG_NO_TOKEN,
        AuthError::Revoked => MSG_REVOKED,
        AuthError::NotFound(_) => MSG_INVALID_PAYLOAD,
        AuthError::Store(_) => MSG_STORE,
        AuthError::Upstream(_) => MSG_UPSTREAM,
        _ => MSG_INVALID_TOKEN,
    }
}

/// Token lifecycle failures.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Malformed token")]
    Malformed,

    #[error("Invalid token signature")]
    InvalidSignature,

    #[error("Token expired")]
    ExpiredToken,

    #[error("Not authenticated")]
    NotAuthenticated,

    /// One or more refresh cookie parts are absent.
    #[error("Refresh token cookies missing")]
    MissingCredential,

    /// The refresh token belongs to a different user than the one requested.
    #[error("Refresh token subject mismatch")]
    SubjectMismatch,

    #[error("Token has been revoked")]
    Revoked,

    #[error("User not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Upstream(#[from] ProviderError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Token signing failed: {0}")]
    Signing(String),
}

impl From<SignerError> for AuthError {
    fn from(err: SignerError) -> Self {
        match err {
            SignerError::Malformed => AuthError::Malformed,
            SignerError::InvalidSignature => AuthError::InvalidSignature,
            SignerError::ExpiredToken => AuthError::ExpiredToken,
            SignerError::Encoding(msg) => AuthError::Signing(msg),
        }
    }
}

/// Payload of an access token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessClaims {
    pub user_id: String,
    pub spotify_access_token: String,
}

/// Payload of a refresh token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshClaims {
    pub user_id: String,
    pub token_version: u64,
    pub refresh_token: String,
}

/// Body of `POST /refresh_token`. Always well formed, even on failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    pub message: String,
    pub ok: bool,
    pub access_token: String,
}

impl RefreshResponse {
    fn rejected(message: &str) -> Self {
        Self {
            message: message.to_string(),
            ok: false,
            access_token: String::new(),
        }
    }

    fn issued(access_token: String) -> Self {
        Self {
            message: MSG_SUCCESS.to_string(),
            ok: true,
            access_token,
        }
    }
}

/// Issues, validates and refreshes access/refresh tokens.
#[derive(Clone)]
pub struct TokenService {
    access: Signer,
    refresh: Signer,
    store: Arc<dyn UserStore>,
    provider: Arc<dyn OAuthProvider>,
}

impl TokenService {
    pub fn new(
        config: &Config,
        store: Arc<dyn UserStore>,
        provider: Arc<dyn OAuthProvider>,
    ) -> Self {
        Self {
            access: Signer::new(&config.access_token_secret),
            refresh: Signer::new(&config.refresh_token_secret),
            store,
            provider,
        }
    }

    /// Mint an access token for `user_id` using the refresh token carried in
    /// `cookies` to obtain a fresh Spotify access token.
    pub async fn issue_access_token(
        &self,
        user_id: &str,
        cookies: &RefreshCookies,
    ) -> Result<String, AuthError> {
        let claims = self.verify_refresh_cookies(cookies)?;
        if claims.user_id != user_id {
            tracing::warn!(
                user_id,
                token_user_id = %claims.user_id,
                "Refresh token does not belong to requested user"
            );
            return Err(AuthError::SubjectMismatch);
        }
        self.mint_access_token(&claims).await
    }

    /// Sign a refresh token embedding the user's current token version.
    pub fn issue_refresh_token(
        &self,
        user: &User,
        provider_refresh_token: &str,
    ) -> Result<String, AuthError> {
        let claims = RefreshClaims {
            user_id: user.user_id.clone(),
            token_version: user.token_version,
            refresh_token: provider_refresh_token.to_string(),
        };
        Ok(self.refresh.sign(&claims, REFRESH_TOKEN_TTL)?)
    }

    /// Validate an `Authorization` header value of the form `Bearer <token>`.
    pub fn validate_access_token(
        &self,
        authorization: Option<&str>,
    ) -> Result<AccessClaims, AuthError> {
        let token = authorization
            .and_then(|h| h.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(AuthError::NotAuthenticated)?;

        Ok(self.access.verify(token)?)
    }

    /// Check refresh cookies against the stored user: signature, token
    /// version and expiry, in that order. A revoked token reports
    /// [`AuthError::Revoked`] even after it has expired.
    pub async fn validate_refresh(
        &self,
        cookies: &RefreshCookies,
    ) -> Result<RefreshClaims, AuthError> {
        let (claims, expired) = self.decode_refresh_cookies(cookies)?;

        let user = match self.store.find_by_id(&claims.user_id).await? {
            Some(user) => user,
            None if expired => return Err(AuthError::ExpiredToken),
            None => return Err(AuthError::NotFound(claims.user_id)),
        };

        if user.token_version != claims.token_version {
            tracing::warn!(
                user_id = %user.user_id,
                stored_version = user.token_version,
                token_version = claims.token_version,
                "Revoked refresh token presented"
            );
            return Err(AuthError::Revoked);
        }

        if expired {
            return Err(AuthError::ExpiredToken);
        }

        Ok(claims)
    }

    /// Exchange refresh cookies for a new access token.
    ///
    /// Never fails: every rejection is reported in the response body.
    pub async fn refresh_cycle(&self, cookies: &RefreshCookies) -> RefreshResponse {
        if !cookies.is_complete() {
            return RefreshResponse::rejected(MSG_NO_TOKEN);
        }

        let claims = match self.validate_refresh(cookies).await {
            Ok(claims) => claims,
            Err(e) => {
                tracing::debug!(error = %e, "Refresh token rejected");
                return RefreshResponse::rejected(rejection_message(&e));
            }
        };

        match self.mint_access_token(&claims).await {
            Ok(token) => RefreshResponse::issued(token),
            Err(e) => {
                tracing::warn!(error = %e, user_id = %claims.user_id, "Access token refresh failed");
                RefreshResponse::rejected(MSG_UPSTREAM)
            }
        }
    }

    /// Revoke every outstanding refresh token for `user_id`.
    ///
    /// Intended for administrative use on suspected compromise.
    pub async fn revoke_sessions(&self, user_id: &str) -> Result<u64, AuthError> {
        let version = self.store.bump_token_version(user_id).await.map_err(|e| match e {
            StoreError::NotFound(id) => AuthError::NotFound(id),
            other => AuthError::Store(other),
        })?;
        tracing::info!(user_id, token_version = version, "Sessions revoked");
        Ok(version)
    }

    fn verify_refresh_cookies(&self, cookies: &RefreshCookies) -> Result<RefreshClaims, AuthError> {
        let token = cookies.token()?;
        Ok(self.refresh.verify(&token)?)
    }

    /// Verify the signature, tolerating expiry. Returns the claims and
    /// whether the token has expired.
    fn decode_refresh_cookies(
        &self,
        cookies: &RefreshCookies,
    ) -> Result<(RefreshClaims, bool), AuthError> {
        let token = cookies.token()?;
        match self.refresh.verify(&token) {
            Ok(claims) => Ok((claims, false)),
            Err(SignerError::ExpiredToken) => Ok((self.refresh.verify_ignoring_expiry(&token)?, true)),
            Err(e) => Err(e.into()),
        }
    }

    async fn mint_access_token(&self, claims: &RefreshClaims) -> Result<String, AuthError> {
        let spotify_access_token = self
            .provider
            .refresh_provider_token(&claims.refresh_token)
            .await?;

        let access = AccessClaims {
            user_id: claims.user_id.clone(),
            spotify_access_token,
        };
        Ok(self.access.sign(&access, ACCESS_TOKEN_TTL)?)
    }
}
