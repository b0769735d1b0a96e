//! Credentials and the authenticated caller.
//!
//! Passwords are stored as Argon2id PHC strings. A successful register or
//! login returns a session token signed with the server's Ed25519 key; each
//! later request presents it as `Authorization: Bearer <token>` and the
//! [`Caller`] extractor turns it back into a user id.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::{header, request::Parts};
use becoming_shared::session::SessionSigner;
use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::api::AppState;
use crate::config::ServerConfig;
use crate::error::ServerError;

// ---------------------------------------------------------------------------
// Passwords
// ---------------------------------------------------------------------------

/// Hash a password with Argon2id and a fresh salt.
pub fn hash_password(password: &str) -> Result<String, ServerError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ServerError::Internal(format!("Failed to hash password: {e}")))
}

/// Check a password against a stored PHC string.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, ServerError> {
    let parsed = PasswordHash::new(hash)
        .map_err(|e| ServerError::Internal(format!("Invalid password hash format: {e}")))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

// ---------------------------------------------------------------------------
// Sessions
// ---------------------------------------------------------------------------

/// A freshly issued bearer token.
#[derive(Debug, Clone)]
pub struct IssuedSession {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct Sessions {
    signer: SessionSigner,
    ttl: Duration,
}

impl Sessions {
    pub fn new(signer: SessionSigner, ttl: Duration) -> Self {
        Self { signer, ttl }
    }

    /// Use the configured signing key, or a random one if it is missing or
    /// unparsable.
    pub fn from_config(config: &ServerConfig) -> Self {
        let signer = match config.session_signing_key.as_deref() {
            Some(hex_key) => SessionSigner::from_hex(hex_key).unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Invalid SESSION_SIGNING_KEY, generating a random key");
                SessionSigner::generate()
            }),
            None => {
                tracing::warn!(
                    "SESSION_SIGNING_KEY not set; sessions will not survive a restart"
                );
                SessionSigner::generate()
            }
        };
        Self::new(signer, config.session_ttl)
    }

    pub fn issue(&self, user_id: Uuid, now: DateTime<Utc>) -> IssuedSession {
        let token = self.signer.issue(user_id, self.ttl, now);
        IssuedSession {
            expires_at: token.expires_at,
            token: token.encode(),
        }
    }

    pub fn verify(&self, raw: &str, now: DateTime<Utc>) -> Result<Uuid, ServerError> {
        Ok(self.signer.verify_encoded(raw, now)?)
    }
}

// ---------------------------------------------------------------------------
// Extractor
// ---------------------------------------------------------------------------

/// The authenticated user making the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller {
    pub user_id: Uuid,
}

#[async_trait]
impl FromRequestParts<AppState> for Caller {
    type Rejection = ServerError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let raw = bearer_token(parts)
            .ok_or_else(|| ServerError::Unauthorized("Missing bearer token".into()))?;
        let user_id = state.sessions.verify(raw, Utc::now())?;
        Ok(Caller { user_id })
    }
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    let value = parts.headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    value
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}
