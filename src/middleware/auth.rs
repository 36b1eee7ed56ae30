// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Bearer token authentication middleware.

use crate::error::AppError;
use crate::AppState;
use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

/// Authenticated user extracted from the access token.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: String,
    pub spotify_access_token: String,
}

/// Middleware that requires a valid `Authorization: Bearer <access token>`.
///
/// Rejected requests never reach the handler.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let auth_header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    let claims = state
        .tokens
        .validate_access_token(auth_header)
        .map_err(|e| {
            tracing::debug!(error = %e, "Rejected bearer token");
            AppError::from(e)
        })?;

    request.extensions_mut().insert(AuthUser {
        user_id: claims.user_id,
        spotify_access_token: claims.spotify_access_token,
    });

    Ok(next.run(request).await)
}
