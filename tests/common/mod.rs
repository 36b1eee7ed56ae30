// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use async_trait::async_trait;
use spotify_session::config::Config;
use spotify_session::db::{FirestoreDb, InMemoryStore};
use spotify_session::routes::create_router;
use spotify_session::services::{OAuthProvider, ProviderError, ProviderIdentity, ProviderTokens};
use spotify_session::AppState;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a test database connection.
#[allow(dead_code)]
pub async fn test_db() -> FirestoreDb {
    FirestoreDb::new("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

/// Spotify stand-in. Every authorization code maps to the same account;
/// refreshes hand out numbered access tokens.
#[allow(dead_code)]
pub struct FakeSpotify {
    pub external_id: String,
    pub email: String,
    pub fail_upstream: AtomicBool,
    pub refreshes: AtomicUsize,
}

#[allow(dead_code)]
impl FakeSpotify {
    pub fn new(external_id: &str, email: &str) -> Self {
        Self {
            external_id: external_id.to_string(),
            email: email.to_string(),
            fail_upstream: AtomicBool::new(false),
            refreshes: AtomicUsize::new(0),
        }
    }

    pub fn set_failing(&self, failing: bool) {
        self.fail_upstream.store(failing, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), ProviderError> {
        if self.fail_upstream.load(Ordering::SeqCst) {
            return Err(ProviderError::Upstream("HTTP 503: unavailable".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl OAuthProvider for FakeSpotify {
    fn authorize_url(&self, state: &str) -> String {
        format!("https://accounts.example.test/authorize?state={}", state)
    }

    async fn exchange_code(&self, code: &str) -> Result<ProviderTokens, ProviderError> {
        self.check()?;
        Ok(ProviderTokens {
            access_token: format!("spotify-access-for-{}", code),
            refresh_token: "spotify-refresh".to_string(),
        })
    }

    async fn refresh_provider_token(&self, refresh_token: &str) -> Result<String, ProviderError> {
        self.check()?;
        let n = self.refreshes.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(format!("{}-access-{}", refresh_token, n))
    }

    async fn fetch_identity(&self, _access_token: &str) -> Result<ProviderIdentity, ProviderError> {
        self.check()?;
        Ok(ProviderIdentity {
            external_id: self.external_id.clone(),
            email: self.email.clone(),
        })
    }
}

/// Test fixture: state wired over an in-memory store and a fake Spotify.
#[allow(dead_code)]
pub struct TestApp {
    pub state: Arc<AppState>,
    pub store: InMemoryStore,
    pub spotify: Arc<FakeSpotify>,
}

#[allow(dead_code)]
impl TestApp {
    pub fn new() -> Self {
        Self::with_config(Config::test_default())
    }

    pub fn with_config(config: Config) -> Self {
        let store = InMemoryStore::new();
        let spotify = Arc::new(FakeSpotify::new("u1", "u1@example.com"));
        let state = Arc::new(AppState::new(
            config,
            Arc::new(store.clone()),
            spotify.clone(),
        ));
        Self {
            state,
            store,
            spotify,
        }
    }

    pub fn router(&self) -> axum::Router {
        create_router(self.state.clone())
    }
}

/// `Cookie` header value carrying a refresh token as its three parts.
#[allow(dead_code)]
pub fn refresh_cookie_header(token: &str) -> String {
    let parts: Vec<&str> = token.split('.').collect();
    format!("a1_h={}; a1_b={}; a1_p={}", parts[0], parts[1], parts[2])
}

/// Read a response body as a string.
#[allow(dead_code)]
pub async fn body_string(response: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Failed to read body");
    String::from_utf8(bytes.to_vec()).expect("Body is not UTF-8")
}

/// Read a response body as JSON.
#[allow(dead_code)]
pub async fn body_json(response: axum::response::Response) -> serde_json::Value {
    serde_json::from_str(&body_string(response).await).expect("Body is not JSON")
}

/// All `Set-Cookie` header values on a response.
#[allow(dead_code)]
pub fn set_cookie_headers(response: &axum::response::Response) -> Vec<String> {
    response
        .headers()
        .get_all(axum::http::header::SET_COOKIE)
        .iter()
        .map(|value| value.to_str().unwrap().to_string())
        .collect()
}

/// The `Set-Cookie` header for `name`.
#[allow(dead_code)]
pub fn find_cookie(headers: &[String], name: &str) -> String {
    headers
        .iter()
        .find(|value| value.starts_with(&format!("{name}=")))
        .cloned()
        .unwrap_or_else(|| panic!("missing Set-Cookie header for {name}: {headers:?}"))
}

/// Value part of a `Set-Cookie` header.
#[allow(dead_code)]
pub fn cookie_value(set_cookie: &str) -> String {
    set_cookie
        .split(';')
        .next()
        .and_then(|pair| pair.split_once('='))
        .map(|(_, value)| value.to_string())
        .unwrap_or_default()
}

/// `Cookie` header a browser would send to `request_path`, given the
/// `Set-Cookie` headers it received. Honours `Path` scoping and skips
/// removal cookies.
#[allow(dead_code)]
pub fn cookies_for_path(set_cookies: &[String], request_path: &str) -> String {
    set_cookies
        .iter()
        .filter_map(|set_cookie| {
            let mut attributes = set_cookie.split(';').map(str::trim);
            let (name, value) = attributes.next()?.split_once('=')?;
            let path = attributes
                .find_map(|attr| attr.strip_prefix("Path="))
                .unwrap_or("/");
            (!value.is_empty() && path_matches(path, request_path))
                .then(|| format!("{}={}", name, value))
        })
        .collect::<Vec<_>>()
        .join("; ")
}

fn path_matches(cookie_path: &str, request_path: &str) -> bool {
    request_path == cookie_path
        || (request_path.starts_with(cookie_path)
            && (cookie_path.ends_with('/')
                || request_path[cookie_path.len()..].starts_with('/')))
}
