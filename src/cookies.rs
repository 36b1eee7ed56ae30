// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Refresh token cookie transport.
//!
//! A refresh token travels as three cookies, one per JWT segment
//! (`a1_h` header, `a1_b` body, `a1_p` signature). All three are `HttpOnly`
//! and scoped to the refresh path. Any route that reads them must live under
//! [`REFRESH_PATH`], since browsers send them nowhere else.

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};

use crate::services::tokens::AuthError;

pub const HEADER_COOKIE: &str = "a1_h";
pub const BODY_COOKIE: &str = "a1_b";
pub const SIGNATURE_COOKIE: &str = "a1_p";

/// Placeholder password of a newly linked account, awaiting pickup.
pub const PASSWORD_COOKIE: &str = "a1_pw";

/// Path the refresh cookies are scoped to.
pub const REFRESH_PATH: &str = "/refresh_token";

/// The three cookie parts of a refresh token as received from the client.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RefreshCookies {
    pub header: Option<String>,
    pub body: Option<String>,
    pub signature: Option<String>,
}

impl RefreshCookies {
    /// Collect whichever parts are present in the request cookies.
    pub fn from_jar(jar: &CookieJar) -> Self {
        let part = |name: &str| jar.get(name).map(|c| c.value().to_string());
        Self {
            header: part(HEADER_COOKIE),
            body: part(BODY_COOKIE),
            signature: part(SIGNATURE_COOKIE),
        }
    }

    /// Split a signed token into its three parts.
    pub fn from_token(token: &str) -> Result<Self, AuthError> {
        let mut segments = token.split('.');
        match (segments.next(), segments.next(), segments.next(), segments.next()) {
            (Some(h), Some(b), Some(p), None) => Ok(Self {
                header: Some(h.to_string()),
                body: Some(b.to_string()),
                signature: Some(p.to_string()),
            }),
            _ => Err(AuthError::Malformed),
        }
    }

    /// Whether all three parts are present.
    pub fn is_complete(&self) -> bool {
        self.header.is_some() && self.body.is_some() && self.signature.is_some()
    }

    /// Reassemble the signed token. Fails if any part is absent.
    pub fn token(&self) -> Result<String, AuthError> {
        match (&self.header, &self.body, &self.signature) {
            (Some(h), Some(b), Some(p)) => Ok(format!("{}.{}.{}", h, b, p)),
            _ => Err(AuthError::MissingCredential),
        }
    }

    /// Add the `Set-Cookie` entries for every part to `jar`.
    pub fn set_on(self, jar: CookieJar, secure: bool) -> CookieJar {
        [
            (HEADER_COOKIE, self.header),
            (BODY_COOKIE, self.body),
            (SIGNATURE_COOKIE, self.signature),
        ]
        .into_iter()
        .filter_map(|(name, value)| value.map(|v| (name, v)))
        .fold(jar, |jar, (name, value)| {
            jar.add(refresh_cookie(name, value, secure))
        })
    }
}

fn refresh_cookie(name: &'static str, value: String, secure: bool) -> Cookie<'static> {
    Cookie::build((name, value))
        .http_only(true)
        .path(REFRESH_PATH)
        .same_site(SameSite::Lax)
        .secure(secure)
        .build()
}

/// Cookie holding a new account's placeholder password until the frontend
/// collects it.
pub fn pending_password_cookie(value: String, secure: bool) -> Cookie<'static> {
    refresh_cookie(PASSWORD_COOKIE, value, secure)
}

/// Removal cookie for the pending password.
pub fn clear_pending_password_cookie() -> Cookie<'static> {
    Cookie::build((PASSWORD_COOKIE, "")).path(REFRESH_PATH).build()
}

/// Session cookie holding the OAuth `state` nonce until the callback.
pub fn state_cookie(name: &'static str, value: String, secure: bool) -> Cookie<'static> {
    Cookie::build((name, value))
        .http_only(true)
        .path("/")
        .same_site(SameSite::Lax)
        .secure(secure)
        .build()
}

/// Removal cookie for the OAuth `state` nonce.
pub fn clear_state_cookie(name: &'static str) -> Cookie<'static> {
    Cookie::build((name, "")).path("/").build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_and_join() {
        let cookies = RefreshCookies::from_token("hhh.bbb.ppp").unwrap();
        assert_eq!(cookies.header.as_deref(), Some("hhh"));
        assert_eq!(cookies.body.as_deref(), Some("bbb"));
        assert_eq!(cookies.signature.as_deref(), Some("ppp"));
        assert_eq!(cookies.token().unwrap(), "hhh.bbb.ppp");
    }

    #[test]
    fn test_split_rejects_wrong_segment_count() {
        assert!(matches!(
            RefreshCookies::from_token("a.b"),
            Err(AuthError::Malformed)
        ));
        assert!(matches!(
            RefreshCookies::from_token("a.b.c.d"),
            Err(AuthError::Malformed)
        ));
    }

    #[test]
    fn test_missing_part_is_missing_credential() {
        let cookies = RefreshCookies {
            header: Some("h".to_string()),
            body: None,
            signature: Some("p".to_string()),
        };
        assert!(!cookies.is_complete());
        assert!(matches!(cookies.token(), Err(AuthError::MissingCredential)));
    }

    #[test]
    fn test_set_on_writes_scoped_http_only_cookies() {
        let cookies = RefreshCookies::from_token("hhh.bbb.ppp").unwrap();
        let jar = cookies.set_on(CookieJar::new(), false);

        for (name, value) in [
            (HEADER_COOKIE, "hhh"),
            (BODY_COOKIE, "bbb"),
            (SIGNATURE_COOKIE, "ppp"),
        ] {
            let cookie = jar.get(name).expect("cookie set");
            assert_eq!(cookie.value(), value);
            assert_eq!(cookie.path(), Some(REFRESH_PATH));
            assert_eq!(cookie.http_only(), Some(true));
            assert_eq!(cookie.secure(), Some(false));
        }
    }

    #[test]
    fn test_pending_password_cookie_is_scoped() {
        let cookie = pending_password_cookie("pw".to_string(), true);
        assert_eq!(cookie.name(), PASSWORD_COOKIE);
        assert_eq!(cookie.path(), Some(REFRESH_PATH));
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.secure(), Some(true));
        assert_eq!(clear_pending_password_cookie().path(), Some(REFRESH_PATH));
    }

    #[test]
    fn test_from_jar_reads_parts() {
        let jar = CookieJar::new()
            .add(Cookie::new(HEADER_COOKIE, "h"))
            .add(Cookie::new(BODY_COOKIE, "b"));

        let cookies = RefreshCookies::from_jar(&jar);
        assert_eq!(cookies.header.as_deref(), Some("h"));
        assert_eq!(cookies.body.as_deref(), Some("b"));
        assert!(cookies.signature.is_none());
    }
}
