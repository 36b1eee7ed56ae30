// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Spotify-Session: Spotify login with locally issued access/refresh tokens
//!
//! This crate provides a backend that authenticates users against Spotify,
//! wraps the provider tokens in its own short-lived access tokens and
//! long-lived, revocable refresh tokens, and serves a small user API.

pub mod config;
pub mod cookies;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;

use config::Config;
use db::UserStore;
use services::{AccountService, OAuthProvider, TokenService};
use std::sync::Arc;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub db: Arc<dyn UserStore>,
    pub spotify: Arc<dyn OAuthProvider>,
    pub tokens: TokenService,
    pub accounts: AccountService,
}

impl AppState {
    /// Wire the services together over a store and an OAuth provider.
    pub fn new(config: Config, db: Arc<dyn UserStore>, spotify: Arc<dyn OAuthProvider>) -> Self {
        let tokens = TokenService::new(&config, db.clone(), spotify.clone());
        let accounts = AccountService::new(db.clone(), spotify.clone(), tokens.clone());
        Self {
            config,
            db,
            spotify,
            tokens,
            accounts,
        }
    }
}
