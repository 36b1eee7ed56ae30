// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! User API routes.

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::UserSummary;
use crate::AppState;
use axum::{extract::State, routing::get, Extension, Json, Router};
use std::sync::Arc;

/// Routes open to anonymous callers.
pub fn public_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/hello", get(hello))
        .route("/api/users", get(list_users))
}

/// API routes (require a bearer access token).
/// The auth middleware is applied in routes/mod.rs for these routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/token", get(get_token))
        .route("/api/code", get(get_code))
}

async fn hello() -> &'static str {
    "Hi I am connected!"
}

/// All linked users.
async fn list_users(State(state): State<Arc<AppState>>) -> Result<Json<Vec<UserSummary>>> {
    let users = state.db.list().await?;
    Ok(Json(users.iter().map(UserSummary::from).collect()))
}

// ─── Authenticated Queries ───────────────────────────────────

async fn get_token(Extension(user): Extension<AuthUser>) -> String {
    format!("Your access token is {}", user.spotify_access_token)
}

async fn get_code(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<String> {
    let profile = state
        .db
        .find_by_id(&user.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {} not found", user.user_id)))?;

    Ok(format!("Your spotify code is {}", profile.spotify_code))
}
