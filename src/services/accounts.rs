// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Account linking and email/password login.

use ring::rand::{SecureRandom, SystemRandom};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use subtle::ConstantTimeEq;

use crate::db::{StoreError, UserStore};
use crate::error::AppError;
use crate::models::User;
use crate::services::spotify::OAuthProvider;
use crate::services::tokens::{AuthError, TokenService};

/// Length in bytes of generated placeholder passwords and OAuth state nonces.
const RANDOM_BYTES: usize = 16;

/// Result of a successful Spotify login.
#[derive(Debug, Clone)]
pub struct LinkOutcome {
    pub user: User,
    /// Signed refresh token to hand to the client as cookies.
    pub refresh_token: String,
    /// Placeholder password, present only when the account was just created.
    pub new_password: Option<String>,
}

/// Random hex string from the system CSPRNG.
pub fn random_hex() -> Result<String, AppError> {
    let mut bytes = [0u8; RANDOM_BYTES];
    SystemRandom::new()
        .fill(&mut bytes)
        .map_err(|_| AppError::Internal(anyhow::anyhow!("System RNG failure")))?;
    Ok(hex::encode(bytes))
}

/// SHA-256 digest (hex) of a password.
pub fn password_digest(password: &str) -> String {
    hex::encode(Sha256::digest(password.as_bytes()))
}

/// Links Spotify accounts to local users.
#[derive(Clone)]
pub struct AccountService {
    store: Arc<dyn UserStore>,
    provider: Arc<dyn OAuthProvider>,
    tokens: TokenService,
}

impl AccountService {
    pub fn new(
        store: Arc<dyn UserStore>,
        provider: Arc<dyn OAuthProvider>,
        tokens: TokenService,
    ) -> Self {
        Self {
            store,
            provider,
            tokens,
        }
    }

    /// Complete a Spotify login: exchange `code`, identify the account,
    /// insert or update the user, and mint a refresh token.
    pub async fn link(&self, code: &str) -> Result<LinkOutcome, AppError> {
        let provider_tokens = self.provider.exchange_code(code).await?;
        let identity = self
            .provider
            .fetch_identity(&provider_tokens.access_token)
            .await?;

        let password = random_hex()?;
        let candidate = User::new(
            identity.external_id.clone(),
            identity.email.clone(),
            code.to_string(),
            password_digest(&password),
        );

        let new_password = match self.store.insert(&candidate).await {
            Ok(()) => {
                tracing::info!(user_id = %candidate.user_id, "New user linked");
                Some(password)
            }
            Err(StoreError::Duplicate(_)) => {
                tracing::debug!(
                    user_id = %candidate.user_id,
                    "User already exists, updating Spotify code"
                );
                self.store
                    .update_spotify_code(&candidate.user_id, code)
                    .await?;
                None
            }
            Err(e) => return Err(e.into()),
        };

        // Re-read so the refresh token carries the stored token version.
        let user = self
            .store
            .find_by_id(&candidate.user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("user {}", candidate.user_id)))?;

        let refresh_token = self
            .tokens
            .issue_refresh_token(&user, &provider_tokens.refresh_token)?;

        Ok(LinkOutcome {
            user,
            refresh_token,
            new_password,
        })
    }

    /// Look up a user by email and check their password.
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<User, AppError> {
        let user = self
            .store
            .find_by_email(email)
            .await?
            .ok_or(AppError::Unauthorized)?;

        let supplied = password_digest(password);
        if !bool::from(supplied.as_bytes().ct_eq(user.password.as_bytes())) {
            tracing::warn!(user_id = %user.user_id, "Login with incorrect password");
            return Err(AuthError::NotAuthenticated.into());
        }

        Ok(user)
    }
}
