// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod accounts;
pub mod signer;
pub mod spotify;
pub mod tokens;

pub use accounts::{AccountService, LinkOutcome};
pub use signer::{Signer, SignerError};
pub use spotify::{OAuthProvider, ProviderError, ProviderIdentity, ProviderTokens, SpotifyClient};
pub use tokens::{AccessClaims, AuthError, RefreshClaims, RefreshResponse, TokenService};
