// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! User model for storage and API.

use serde::{Deserialize, Serialize};

/// User profile stored in the `users` collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Spotify user ID (also used as document ID)
    pub user_id: String,
    /// Email address reported by Spotify
    pub email: String,
    /// Authorization code from the most recent Spotify login (legacy)
    pub spotify_code: String,
    /// SHA-256 digest (hex) of the placeholder password generated on first link
    pub password: String,
    /// Bumped to revoke every outstanding refresh token for this user
    #[serde(default)]
    pub token_version: u64,
}

impl User {
    /// A freshly linked user, starting at token version 0.
    pub fn new(
        user_id: String,
        email: String,
        spotify_code: String,
        password_digest: String,
    ) -> Self {
        Self {
            user_id,
            email,
            spotify_code,
            password: password_digest,
            token_version: 0,
        }
    }
}

/// Public view of a user (never exposes the password digest or token version).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub user_id: String,
    pub email: String,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        Self {
            user_id: user.user_id.clone(),
            email: user.email.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_user_starts_at_version_zero() {
        let user = User::new(
            "u1".to_string(),
            "u1@example.com".to_string(),
            "code".to_string(),
            "digest".to_string(),
        );
        assert_eq!(user.token_version, 0);
    }

    #[test]
    fn test_missing_token_version_defaults_to_zero() {
        let user: User = serde_json::from_value(serde_json::json!({
            "user_id": "u1",
            "email": "u1@example.com",
            "spotify_code": "code",
            "password": "digest"
        }))
        .unwrap();
        assert_eq!(user.token_version, 0);
    }
}
