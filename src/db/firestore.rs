// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore-backed user store.
//!
//! Users live in the `users` collection keyed by Spotify user ID.

use crate::db::{collections, StoreError, UserStore};
use crate::models::User;
use async_trait::async_trait;
use firestore::errors::FirestoreError;
use firestore::{paths, FirestoreConsistencySelector};

/// Attempts at a contended token version bump before giving up.
const MAX_BUMP_ATTEMPTS: u32 = 5;

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: Option<firestore::FirestoreDb>,
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, StoreError> {
        // If the emulator environment variable is set, use unauthenticated connection
        // to avoid local credential warnings and leakage.
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| StoreError::Backend(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, StoreError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            StoreError::Backend(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create an offline client for testing.
    ///
    /// All database operations will return an error if called.
    pub fn new_mock() -> Self {
        Self { client: None }
    }

    /// Helper to get the client or return an error if offline.
    fn get_client(&self) -> Result<&firestore::FirestoreDb, StoreError> {
        self.client
            .as_ref()
            .ok_or_else(|| StoreError::Backend("Database not connected (offline mode)".to_string()))
    }

    /// One read-increment-write of the token version inside a transaction.
    ///
    /// The read goes through the transaction, so the commit fails if another
    /// writer touched the document in between and the version never moves
    /// backwards.
    async fn try_bump_token_version(&self, user_id: &str) -> Result<u64, StoreError> {
        let client = self.get_client()?;

        let mut transaction = client
            .begin_transaction()
            .await
            .map_err(|e| StoreError::Backend(format!("Failed to begin transaction: {}", e)))?;

        let in_transaction = client.clone_with_consistency_selector(
            FirestoreConsistencySelector::Transaction(transaction.transaction_id().clone()),
        );

        let current: Option<User> = match in_transaction
            .fluent()
            .select()
            .by_id_in(collections::USERS)
            .obj()
            .one(user_id)
            .await
        {
            Ok(current) => current,
            Err(e) => {
                let _ = transaction.rollback().await;
                return Err(StoreError::Backend(format!(
                    "Failed to read user in transaction: {}",
                    e
                )));
            }
        };

        let Some(mut user) = current else {
            let _ = transaction.rollback().await;
            return Err(StoreError::NotFound(user_id.to_string()));
        };

        let Some(next) = user.token_version.checked_add(1) else {
            let _ = transaction.rollback().await;
            return Err(StoreError::Backend("token version overflow".to_string()));
        };
        user.token_version = next;

        client
            .fluent()
            .update()
            .fields(paths!(User::{token_version}))
            .in_col(collections::USERS)
            .document_id(user_id)
            .object(&user)
            .add_to_transaction(&mut transaction)
            .map_err(|e| {
                StoreError::Backend(format!("Failed to add version bump to transaction: {}", e))
            })?;

        transaction
            .commit()
            .await
            .map_err(|e| StoreError::Backend(format!("Transaction commit failed: {}", e)))?;

        tracing::info!(user_id, token_version = next, "Token version bumped");

        Ok(next)
    }

    async fn require_user(&self, user_id: &str) -> Result<User, StoreError> {
        self.find_by_id(user_id)
            .await?
            .ok_or_else(|| StoreError::NotFound(user_id.to_string()))
    }
}

fn backend(e: FirestoreError) -> StoreError {
    StoreError::Backend(e.to_string())
}

#[async_trait]
impl UserStore for FirestoreDb {
    async fn find_by_id(&self, user_id: &str) -> Result<Option<User>, StoreError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::USERS)
            .obj()
            .one(user_id)
            .await
            .map_err(backend)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let email = email.to_string();
        let users: Vec<User> = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::USERS)
            .filter(move |q| q.for_all([q.field("email").eq(email.clone())]))
            .limit(1)
            .obj()
            .query()
            .await
            .map_err(backend)?;

        Ok(users.into_iter().next())
    }

    async fn list(&self) -> Result<Vec<User>, StoreError> {
        self.get_client()?
            .fluent()
            .select()
            .from(collections::USERS)
            .order_by([("user_id", firestore::FirestoreQueryDirection::Ascending)])
            .obj()
            .query()
            .await
            .map_err(backend)
    }

    async fn insert(&self, user: &User) -> Result<(), StoreError> {
        let _: User = self
            .get_client()?
            .fluent()
            .insert()
            .into(collections::USERS)
            .document_id(&user.user_id)
            .object(user)
            .execute()
            .await
            .map_err(|e| match e {
                FirestoreError::DataConflictError(_) => {
                    StoreError::Duplicate(user.user_id.clone())
                }
                other => backend(other),
            })?;
        Ok(())
    }

    async fn update_spotify_code(&self, user_id: &str, code: &str) -> Result<(), StoreError> {
        let mut user = self.require_user(user_id).await?;
        user.spotify_code = code.to_string();

        let _: User = self
            .get_client()?
            .fluent()
            .update()
            .fields(paths!(User::{spotify_code}))
            .in_col(collections::USERS)
            .document_id(user_id)
            .object(&user)
            .execute()
            .await
            .map_err(backend)?;
        Ok(())
    }

    async fn bump_token_version(&self, user_id: &str) -> Result<u64, StoreError> {
        let mut attempt = 1;
        loop {
            match self.try_bump_token_version(user_id).await {
                Err(StoreError::Backend(e)) if attempt < MAX_BUMP_ATTEMPTS => {
                    tracing::warn!(user_id, attempt, error = %e, "Token version bump retrying");
                    attempt += 1;
                }
                result => return result,
            }
        }
    }
}
