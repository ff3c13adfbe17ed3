//! Request authentication: hashed-password checks and per-client auth state.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use base64::Engine;
use dashmap::DashMap;
use std::convert::Infallible;
use uuid::Uuid;

use crate::common::ShareError;

/// Cookie carrying the per-client auth token.
pub const AUTH_COOKIE: &str = "sharefast_auth";

/// Outcome of an access check for one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessDecision {
    Allow,
    /// A credential was presented and it was wrong.
    Deny,
    /// No usable credential; caller must issue the login challenge.
    ChallengeRequired,
}

/// Per-session gatekeeper.
///
/// The password is stored only as a salted Argon2id hash; verification is
/// constant-time by construction. Clients that authenticate once get a token
/// (delivered as a cookie) that stays valid until the session stops.
pub struct AccessGuard {
    credential: Option<String>,
    authenticated: DashMap<String, ()>,
}

impl AccessGuard {
    /// Guard with no password configured; every request is allowed.
    pub fn open_access() -> Self {
        Self {
            credential: None,
            authenticated: DashMap::new(),
        }
    }

    /// Builds a guard, hashing the password if one is configured.
    pub fn new(password: Option<&str>) -> Result<Self, ShareError> {
        match password {
            Some(plain) => {
                let salt = SaltString::generate(&mut OsRng);
                let hash = Argon2::default()
                    .hash_password(plain.as_bytes(), &salt)
                    .map_err(|e| ShareError::Credential(e.to_string()))?;
                Ok(Self {
                    credential: Some(hash.to_string()),
                    authenticated: DashMap::new(),
                })
            }
            None => Ok(Self::open_access()),
        }
    }

    pub fn password_required(&self) -> bool {
        self.credential.is_some()
    }

    /// Decides access for one request given the client's auth cookie and an
    /// optional `Authorization: Basic` header.
    pub fn check(&self, cookie_token: Option<&str>, basic_header: Option<&str>) -> AccessDecision {
        if self.credential.is_none() {
            return AccessDecision::Allow;
        }

        if let Some(token) = cookie_token {
            if self.authenticated.contains_key(token) {
                return AccessDecision::Allow;
            }
        }

        if let Some(header) = basic_header {
            return match password_from_basic(header) {
                Some(candidate) if self.verify(&candidate) => AccessDecision::Allow,
                Some(_) => AccessDecision::Deny,
                None => AccessDecision::ChallengeRequired,
            };
        }

        AccessDecision::ChallengeRequired
    }

    /// Verifies a candidate password against the stored hash.
    pub fn verify(&self, candidate: &str) -> bool {
        let Some(stored) = self.credential.as_deref() else {
            return true;
        };

        let parsed = match PasswordHash::new(stored) {
            Ok(hash) => hash,
            Err(e) => {
                tracing::error!("stored credential unparseable: {}", e);
                return false;
            }
        };

        Argon2::default()
            .verify_password(candidate.as_bytes(), &parsed)
            .is_ok()
    }

    /// Marks a client authenticated and returns the token to hand back as a cookie.
    pub fn grant(&self) -> String {
        let token = Uuid::new_v4().to_string();
        self.authenticated.insert(token.clone(), ());
        token
    }

    /// Clears every client's auth state. Called when the session stops.
    pub fn revoke_all(&self) {
        self.authenticated.clear();
    }

    /// Number of clients currently holding a valid auth token.
    pub fn authenticated_count(&self) -> usize {
        self.authenticated.len()
    }
}

/// Extracts the password half of a `Basic user:password` credential.
fn password_from_basic(header: &str) -> Option<String> {
    let encoded = header.strip_prefix("Basic ").or_else(|| header.strip_prefix("basic "))?;
    let decoded = base64::engine::general_purpose::STANDARD
        .decode(encoded.trim())
        .ok()?;
    let text = String::from_utf8(decoded).ok()?;
    // Username is ignored; only the shared password matters.
    let (_, password) = text.split_once(':')?;
    Some(password.to_string())
}

/// Extracted auth-cookie token, if the request carries one.
pub struct AuthCookie(pub Option<String>);

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for AuthCookie {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(axum::http::header::COOKIE)
            .and_then(|v| v.to_str().ok())
            .and_then(|cookies| {
                cookies.split(';').find_map(|pair| {
                    let (name, value) = pair.trim().split_once('=')?;
                    (name == AUTH_COOKIE).then(|| value.to_string())
                })
            });

        Ok(AuthCookie(token))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn basic_header(user: &str, password: &str) -> String {
        let encoded =
            base64::engine::general_purpose::STANDARD.encode(format!("{}:{}", user, password));
        format!("Basic {}", encoded)
    }

    #[test]
    fn no_password_always_allows() {
        let guard = AccessGuard::new(None).unwrap();
        assert_eq!(guard.check(None, None), AccessDecision::Allow);
        assert_eq!(guard.check(Some("stale"), None), AccessDecision::Allow);
    }

    #[test]
    fn missing_credential_requires_challenge() {
        let guard = AccessGuard::new(Some("secret123")).unwrap();
        assert_eq!(guard.check(None, None), AccessDecision::ChallengeRequired);
    }

    #[test]
    fn wrong_basic_password_is_denied() {
        let guard = AccessGuard::new(Some("secret123")).unwrap();
        let header = basic_header("anyone", "wrong");
        assert_eq!(guard.check(None, Some(&header)), AccessDecision::Deny);
    }

    #[test]
    fn correct_basic_password_is_allowed() {
        let guard = AccessGuard::new(Some("secret123")).unwrap();
        let header = basic_header("anyone", "secret123");
        assert_eq!(guard.check(None, Some(&header)), AccessDecision::Allow);
    }

    #[test]
    fn granted_token_allows_until_revoked() {
        let guard = AccessGuard::new(Some("secret123")).unwrap();
        let token = guard.grant();
        assert_eq!(guard.check(Some(&token), None), AccessDecision::Allow);

        guard.revoke_all();
        assert_eq!(
            guard.check(Some(&token), None),
            AccessDecision::ChallengeRequired
        );
    }

    #[test]
    fn credential_is_stored_hashed() {
        let guard = AccessGuard::new(Some("secret123")).unwrap();
        let stored = guard.credential.as_deref().unwrap();
        assert!(stored.starts_with("$argon2"), "expected PHC hash, got {stored}");
        assert!(!stored.contains("secret123"));
    }

    #[test]
    fn basic_parse_handles_colons_in_password() {
        let header = basic_header("u", "pa:ss");
        assert_eq!(password_from_basic(&header).as_deref(), Some("pa:ss"));
        assert_eq!(password_from_basic("Bearer zzz"), None);
        assert_eq!(password_from_basic("Basic not-base64!"), None);
    }
}
