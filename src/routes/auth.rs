// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Spotify OAuth login and refresh token routes.
//!
//! Everything that reads the refresh cookies is mounted under
//! [`REFRESH_PATH`]; the cookies are scoped there.

use axum::{
    extract::{Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
    Json, Router,
};
use axum_extra::extract::cookie::CookieJar;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use subtle::ConstantTimeEq;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;
use validator::Validate;

use crate::config::STATE_COOKIE_NAME;
use crate::cookies::{
    clear_pending_password_cookie, clear_state_cookie, pending_password_cookie, state_cookie,
    RefreshCookies, PASSWORD_COOKIE, REFRESH_PATH,
};
use crate::error::{AppError, Result};
use crate::services::accounts::random_hex;
use crate::services::tokens::RefreshResponse;
use crate::AppState;

/// Email/password login. Under [`REFRESH_PATH`] so it receives the refresh cookies.
pub const PASSWORD_LOGIN_PATH: &str = "/refresh_token/login";

/// One-time pickup of a new account's placeholder password.
pub const PENDING_PASSWORD_PATH: &str = "/refresh_token/password";

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/login", get(login))
        .route("/callback", get(callback))
        .route(REFRESH_PATH, post(refresh_token))
        .route(PASSWORD_LOGIN_PATH, post(password_login))
        .route(PENDING_PASSWORD_PATH, post(pending_password))
}

/// Start OAuth flow - redirect to Spotify authorization.
///
/// The "already authenticated" short-circuit only fires for clients that send
/// the refresh cookies explicitly; browsers keep them to [`REFRESH_PATH`].
async fn login(State(state): State<Arc<AppState>>, jar: CookieJar) -> Result<Response> {
    if RefreshCookies::from_jar(&jar).is_complete() {
        return Ok(Json(serde_json::json!({ "message": "Already authenticated" })).into_response());
    }

    let nonce = random_hex()?;
    let auth_url = state.spotify.authorize_url(&nonce);
    let jar = jar.add(state_cookie(
        STATE_COOKIE_NAME,
        nonce,
        state.config.secure_cookies(),
    ));

    tracing::info!(
        client_id = %state.config.client_id,
        "Starting OAuth flow, redirecting to Spotify"
    );

    Ok((jar, Redirect::temporary(&auth_url)).into_response())
}

#[derive(Deserialize)]
pub struct CallbackParams {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    state: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// OAuth callback - exchange code, link the account, set refresh cookies.
///
/// Redirects back to the frontend only: a `Referer` is honoured when it shares
/// the frontend's origin. Spotify failures are logged and reported on the
/// redirect rather than surfacing as a server error.
async fn callback(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    headers: HeaderMap,
    Query(params): Query<CallbackParams>,
) -> Result<Response> {
    let stored_state = jar.get(STATE_COOKIE_NAME).map(|c| c.value().to_string());
    if !states_match(params.state.as_deref(), stored_state.as_deref()) {
        tracing::warn!("OAuth state mismatch");
        return Ok((
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({ "error": "state_mismatch" })),
        )
            .into_response());
    }

    let jar = jar.remove(clear_state_cookie(STATE_COOKIE_NAME));

    let destination = redirect_destination(
        &state.config.frontend_url,
        headers.get(header::REFERER).and_then(|h| h.to_str().ok()),
    );

    if let Some(error) = params.error {
        tracing::warn!(error = %error, "OAuth error from Spotify");
        let redirect = with_query(&destination, "error", &error);
        return Ok((jar, Redirect::temporary(&redirect)).into_response());
    }

    let code = params
        .code
        .filter(|c| !c.is_empty())
        .ok_or_else(|| AppError::BadRequest("missing authorization code".to_string()))?;

    tracing::info!("Exchanging authorization code for tokens");

    let outcome = match state.accounts.link(&code).await {
        Ok(outcome) => outcome,
        Err(e) => {
            tracing::warn!(error = %e, "Spotify login failed");
            let redirect = with_query(&destination, "error", "login_failed");
            return Ok((jar, Redirect::temporary(&redirect)).into_response());
        }
    };

    tracing::info!(user_id = %outcome.user.user_id, "OAuth successful, user linked");

    let secure = state.config.secure_cookies();
    let mut jar = RefreshCookies::from_token(&outcome.refresh_token)?.set_on(jar, secure);
    if let Some(password) = outcome.new_password {
        jar = jar.add(pending_password_cookie(password, secure));
    }

    Ok((jar, Redirect::temporary(&destination)).into_response())
}

/// Exchange the refresh cookies for a new access token.
async fn refresh_token(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
) -> Json<RefreshResponse> {
    let cookies = RefreshCookies::from_jar(&jar);
    Json(state.tokens.refresh_cycle(&cookies).await)
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct PendingPasswordResponse {
    pub password: String,
}

/// Hand a newly linked account its placeholder password, then forget it.
async fn pending_password(jar: CookieJar) -> Result<(CookieJar, Json<PendingPasswordResponse>)> {
    let password = jar
        .get(PASSWORD_COOKIE)
        .map(|c| c.value().to_string())
        .filter(|p| !p.is_empty())
        .ok_or_else(|| AppError::NotFound("no pending password".to_string()))?;

    let jar = jar.remove(clear_pending_password_cookie());
    Ok((jar, Json(PendingPasswordResponse { password })))
}

// ─── Password Login ──────────────────────────────────────────

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1))]
    pub password: String,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub access_token: String,
}

/// Email/password login for a previously linked account.
///
/// The caller must also hold that account's refresh cookies; the new access
/// token wraps a Spotify token refreshed through them.
async fn password_login(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>> {
    req.validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let user = state.accounts.authenticate(&req.email, &req.password).await?;

    let cookies = RefreshCookies::from_jar(&jar);
    state.tokens.validate_refresh(&cookies).await?;
    let access_token = state
        .tokens
        .issue_access_token(&user.user_id, &cookies)
        .await?;

    tracing::info!(user_id = %user.user_id, "Password login succeeded");

    Ok(Json(LoginResponse { access_token }))
}

/// Constant-time comparison of the returned and stored OAuth state.
fn states_match(returned: Option<&str>, stored: Option<&str>) -> bool {
    match (returned, stored) {
        (Some(returned), Some(stored)) if !stored.is_empty() => {
            bool::from(returned.as_bytes().ct_eq(stored.as_bytes()))
        }
        _ => false,
    }
}

/// The referer if it is on the frontend's origin, else the frontend itself.
fn redirect_destination(frontend_url: &str, referer: Option<&str>) -> String {
    referer
        .filter(|r| same_origin(r, frontend_url))
        .unwrap_or(frontend_url)
        .to_string()
}

fn same_origin(a: &str, b: &str) -> bool {
    match (reqwest::Url::parse(a), reqwest::Url::parse(b)) {
        (Ok(a), Ok(b)) => a.origin() == b.origin(),
        _ => false,
    }
}

/// Append `key=value` to `url`, URL-encoding the value.
fn with_query(url: &str, key: &str, value: &str) -> String {
    let separator = if url.contains('?') { '&' } else { '?' };
    format!("{}{}{}={}", url, separator, key, urlencoding::encode(value))
}
