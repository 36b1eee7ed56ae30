// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-memory user store backed by a `DashMap`.

use crate::db::{StoreError, UserStore};
use crate::models::User;
use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;

/// User store that lives for the lifetime of the process.
///
/// Clones share the same underlying map.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    users: Arc<DashMap<String, User>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for InMemoryStore {
    async fn find_by_id(&self, user_id: &str) -> Result<Option<User>, StoreError> {
        Ok(self.users.get(user_id).map(|u| u.value().clone()))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        Ok(self
            .users
            .iter()
            .find(|entry| entry.value().email == email)
            .map(|entry| entry.value().clone()))
    }

    async fn list(&self) -> Result<Vec<User>, StoreError> {
        let mut users: Vec<User> = self.users.iter().map(|e| e.value().clone()).collect();
        users.sort_by(|a, b| a.user_id.cmp(&b.user_id));
        Ok(users)
    }

    async fn insert(&self, user: &User) -> Result<(), StoreError> {
        match self.users.entry(user.user_id.clone()) {
            Entry::Occupied(_) => Err(StoreError::Duplicate(user.user_id.clone())),
            Entry::Vacant(slot) => {
                slot.insert(user.clone());
                Ok(())
            }
        }
    }

    async fn update_spotify_code(&self, user_id: &str, code: &str) -> Result<(), StoreError> {
        let mut user = self
            .users
            .get_mut(user_id)
            .ok_or_else(|| StoreError::NotFound(user_id.to_string()))?;
        user.spotify_code = code.to_string();
        Ok(())
    }

    async fn bump_token_version(&self, user_id: &str) -> Result<u64, StoreError> {
        // The shard write lock makes read-increment-write atomic per row.
        let mut user = self
            .users
            .get_mut(user_id)
            .ok_or_else(|| StoreError::NotFound(user_id.to_string()))?;
        user.token_version = user
            .token_version
            .checked_add(1)
            .ok_or_else(|| StoreError::Backend("token version overflow".to_string()))?;
        Ok(user.token_version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: &str) -> User {
        User::new(
            id.to_string(),
            format!("{id}@example.com"),
            "code-1".to_string(),
            "digest".to_string(),
        )
    }

    #[tokio::test]
    async fn test_insert_then_find() {
        let store = InMemoryStore::new();
        store.insert(&user("u1")).await.unwrap();

        let found = store.find_by_id("u1").await.unwrap().unwrap();
        assert_eq!(found, user("u1"));
        assert!(store.find_by_id("u2").await.unwrap().is_none());

        let by_email = store.find_by_email("u1@example.com").await.unwrap();
        assert_eq!(by_email.map(|u| u.user_id), Some("u1".to_string()));
    }

    #[tokio::test]
    async fn test_duplicate_insert_rejected() {
        let store = InMemoryStore::new();
        store.insert(&user("u1")).await.unwrap();

        let mut other = user("u1");
        other.email = "someone-else@example.com".to_string();
        assert!(matches!(
            store.insert(&other).await,
            Err(StoreError::Duplicate(id)) if id == "u1"
        ));

        // First row untouched
        let found = store.find_by_id("u1").await.unwrap().unwrap();
        assert_eq!(found.email, "u1@example.com");
    }

    #[tokio::test]
    async fn test_update_spotify_code_only_touches_code() {
        let store = InMemoryStore::new();
        store.insert(&user("u1")).await.unwrap();
        store.bump_token_version("u1").await.unwrap();

        store.update_spotify_code("u1", "code-2").await.unwrap();

        let found = store.find_by_id("u1").await.unwrap().unwrap();
        assert_eq!(found.spotify_code, "code-2");
        assert_eq!(found.token_version, 1);
        assert_eq!(found.email, "u1@example.com");
    }

    #[tokio::test]
    async fn test_bump_token_version_strictly_increases() {
        let store = InMemoryStore::new();
        store.insert(&user("u1")).await.unwrap();

        assert_eq!(store.bump_token_version("u1").await.unwrap(), 1);
        assert_eq!(store.bump_token_version("u1").await.unwrap(), 2);
        assert_eq!(
            store.find_by_id("u1").await.unwrap().unwrap().token_version,
            2
        );
    }

    #[tokio::test]
    async fn test_missing_user_operations_fail() {
        let store = InMemoryStore::new();
        assert!(matches!(
            store.bump_token_version("ghost").await,
            Err(StoreError::NotFound(_))
        ));
        assert!(matches!(
            store.update_spotify_code("ghost", "c").await,
            Err(StoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_concurrent_bumps_are_not_lost() {
        let store = InMemoryStore::new();
        store.insert(&user("u1")).await.unwrap();

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move { store.bump_token_version("u1").await.unwrap() })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(
            store.find_by_id("u1").await.unwrap().unwrap().token_version,
            16
        );
    }
}
