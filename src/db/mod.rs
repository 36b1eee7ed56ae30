// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Database layer.
//!
//! [`UserStore`] is the persistence seam the token lifecycle depends on.
//! Production uses Firestore; local runs without a GCP project and the test
//! suite use the in-memory store.

pub mod firestore;
pub mod memory;

pub use firestore::FirestoreDb;
pub use memory::InMemoryStore;

use crate::models::User;
use async_trait::async_trait;

/// Collection names as constants.
pub mod collections {
    pub const USERS: &str = "users";
}

/// Storage errors.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Insert collided with an existing user id.
    #[error("User already exists: {0}")]
    Duplicate(String),

    #[error("User not found: {0}")]
    NotFound(String),

    #[error("Storage backend error: {0}")]
    Backend(String),
}

/// Persistence for [`User`] rows, including the per-user token version.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Get a user by Spotify user ID.
    async fn find_by_id(&self, user_id: &str) -> Result<Option<User>, StoreError>;

    /// Get a user by email address.
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    /// All users.
    async fn list(&self) -> Result<Vec<User>, StoreError>;

    /// Insert a new user. Fails with [`StoreError::Duplicate`] if the id is taken.
    async fn insert(&self, user: &User) -> Result<(), StoreError>;

    /// Replace the stored Spotify authorization code, leaving every other field alone.
    async fn update_spotify_code(&self, user_id: &str, code: &str) -> Result<(), StoreError>;

    /// Increment the user's token version, revoking all outstanding refresh
    /// tokens. Returns the new version.
    async fn bump_token_version(&self, user_id: &str) -> Result<u64, StoreError>;
}
