// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Compact signed tokens (HS256 JWTs) with an embedded expiry.
//!
//! A [`Signer`] is bound to a single secret. Access and refresh tokens each
//! get their own signer so a leaked access secret cannot mint refresh tokens
//! and vice versa.

use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::time::Duration;

/// Token verification and encoding failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SignerError {
    #[error("Malformed token")]
    Malformed,

    #[error("Invalid token signature")]
    InvalidSignature,

    #[error("Token expired")]
    ExpiredToken,

    #[error("Token encoding failed: {0}")]
    Encoding(String),
}

/// Wire format: the caller's payload flattened next to the registered claims.
#[derive(Debug, Serialize, Deserialize)]
struct Envelope<T> {
    #[serde(flatten)]
    payload: T,
    /// Issued at (Unix timestamp)
    iat: u64,
    /// Expiration time (Unix timestamp)
    exp: u64,
}

/// Signs and verifies tokens with one HMAC secret.
#[derive(Clone)]
pub struct Signer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl Signer {
    pub fn new(secret: &[u8]) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is exact: a token is dead the second after `exp`.
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp"]);

        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
        }
    }

    /// Sign `payload`, valid for `ttl` from now.
    pub fn sign<T: Serialize>(&self, payload: &T, ttl: Duration) -> Result<String, SignerError> {
        self.sign_at(payload, ttl, now_secs())
    }

    /// Sign `payload` as if issued at `issued_at` (Unix seconds).
    pub fn sign_at<T: Serialize>(
        &self,
        payload: &T,
        ttl: Duration,
        issued_at: u64,
    ) -> Result<String, SignerError> {
        let envelope = Envelope {
            payload,
            iat: issued_at,
            exp: issued_at + ttl.as_secs(),
        };

        encode(&Header::new(Algorithm::HS256), &envelope, &self.encoding_key)
            .map_err(|e| SignerError::Encoding(e.to_string()))
    }

    /// Verify `token` and return its payload unchanged.
    ///
    /// The signature is checked before the expiry, so a forged token reports
    /// `InvalidSignature` even when its claimed expiry has passed.
    pub fn verify<T: DeserializeOwned>(&self, token: &str) -> Result<T, SignerError> {
        decode::<Envelope<T>>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims.payload)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => SignerError::ExpiredToken,
                ErrorKind::InvalidSignature => SignerError::InvalidSignature,
                _ => SignerError::Malformed,
            })
    }

    /// Verify the signature but not the expiry.
    ///
    /// Only for callers that must still inspect the payload of an expired
    /// token; never treat the result as a live credential.
    pub fn verify_ignoring_expiry<T: DeserializeOwned>(&self, token: &str) -> Result<T, SignerError> {
        let mut validation = self.validation.clone();
        validation.validate_exp = false;

        decode::<Envelope<T>>(token, &self.decoding_key, &validation)
            .map(|data| data.claims.payload)
            .map_err(|e| match e.kind() {
                ErrorKind::InvalidSignature => SignerError::InvalidSignature,
                _ => SignerError::Malformed,
            })
    }
}

fn now_secs() -> u64 {
    chrono::Utc::now().timestamp().max(0) as u64
}
