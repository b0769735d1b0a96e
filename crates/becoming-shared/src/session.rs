//! Signed session tokens.
//!
//! The server signs `user_id || expires_at (rfc3339)` with its Ed25519 key
//! and hands the token to the client as URL-safe base64 JSON. Every request
//! presents it back as a bearer token; verification needs only the public
//! half of the key.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::constants::SECRET_KEY_SIZE;
use crate::error::SessionError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionToken {
    pub user_id: Uuid,
    pub expires_at: DateTime<Utc>,
    pub signature: Vec<u8>,
}

impl SessionToken {
    /// Encode for transport in an `Authorization: Bearer` header.
    pub fn encode(&self) -> String {
        // Serializing plain data into a Vec cannot fail.
        let json = serde_json::to_vec(self).unwrap_or_default();
        URL_SAFE_NO_PAD.encode(json)
    }

    pub fn decode(raw: &str) -> Result<Self, SessionError> {
        let bytes = URL_SAFE_NO_PAD
            .decode(raw.trim())
            .map_err(|_| SessionError::Malformed)?;
        serde_json::from_slice(&bytes).map_err(|_| SessionError::Malformed)
    }
}

fn signing_payload(user_id: &Uuid, expires_at: &DateTime<Utc>) -> Vec<u8> {
    let mut payload = Vec::with_capacity(16 + 32);
    payload.extend_from_slice(user_id.as_bytes());
    payload.extend_from_slice(expires_at.to_rfc3339().as_bytes());
    payload
}

/// Issues and verifies session tokens with the server's Ed25519 key.
#[derive(Clone)]
pub struct SessionSigner {
    signing_key: SigningKey,
}

impl SessionSigner {
    /// Fresh random key. Tokens it issues do not survive a restart.
    pub fn generate() -> Self {
        Self {
            signing_key: SigningKey::generate(&mut OsRng),
        }
    }

    pub fn from_secret_bytes(secret: &[u8; SECRET_KEY_SIZE]) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(secret),
        }
    }

    /// Parse a 64-character hex secret key.
    pub fn from_hex(hex_key: &str) -> Result<Self, SessionError> {
        let bytes = hex::decode(hex_key.trim()).map_err(|e| SessionError::InvalidKey(e.to_string()))?;
        let secret: [u8; SECRET_KEY_SIZE] = bytes.try_into().map_err(|b: Vec<u8>| {
            SessionError::InvalidKey(format!("expected {SECRET_KEY_SIZE} bytes, got {}", b.len()))
        })?;
        Ok(Self::from_secret_bytes(&secret))
    }

    pub fn verifying_key(&self) -> VerifyingKey {
        self.signing_key.verifying_key()
    }

    pub fn issue(&self, user_id: Uuid, ttl: Duration, now: DateTime<Utc>) -> SessionToken {
        let expires_at = now + ttl;
        let signature = self.signing_key.sign(&signing_payload(&user_id, &expires_at));
        SessionToken {
            user_id,
            expires_at,
            signature: signature.to_bytes().to_vec(),
        }
    }

    /// Check signature and expiry; returns the authenticated user id.
    pub fn verify(&self, token: &SessionToken, now: DateTime<Utc>) -> Result<Uuid, SessionError> {
        if now >= token.expires_at {
            return Err(SessionError::Expired);
        }
        let signature =
            Signature::from_slice(&token.signature).map_err(|_| SessionError::BadSignature)?;
        self.verifying_key()
            .verify(&signing_payload(&token.user_id, &token.expires_at), &signature)
            .map_err(|_| SessionError::BadSignature)?;
        Ok(token.user_id)
    }

    /// Decode and verify a bearer string in one step.
    pub fn verify_encoded(&self, raw: &str, now: DateTime<Utc>) -> Result<Uuid, SessionError> {
        let token = SessionToken::decode(raw)?;
        self.verify(&token, now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issued_token_verifies() {
        let signer = SessionSigner::generate();
        let user = Uuid::new_v4();
        let now = Utc::now();
        let token = signer.issue(user, Duration::hours(1), now);
        assert_eq!(signer.verify(&token, now), Ok(user));
        assert_eq!(signer.verify_encoded(&token.encode(), now), Ok(user));
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let signer = SessionSigner::generate();
        let now = Utc::now();
        let token = signer.issue(Uuid::new_v4(), Duration::hours(1), now);
        assert_eq!(
            signer.verify(&token, now + Duration::hours(2)),
            Err(SessionError::Expired)
        );
    }

    #[test]
    fn test_token_from_another_key_is_rejected() {
        let issuer = SessionSigner::generate();
        let other = SessionSigner::generate();
        let now = Utc::now();
        let token = issuer.issue(Uuid::new_v4(), Duration::hours(1), now);
        assert_eq!(other.verify(&token, now), Err(SessionError::BadSignature));
    }

    #[test]
    fn test_tampered_user_id_is_rejected() {
        let signer = SessionSigner::generate();
        let now = Utc::now();
        let mut token = signer.issue(Uuid::new_v4(), Duration::hours(1), now);
        token.user_id = Uuid::new_v4();
        assert_eq!(signer.verify(&token, now), Err(SessionError::BadSignature));
    }

    #[test]
    fn test_garbage_is_malformed() {
        let signer = SessionSigner::generate();
        assert_eq!(
            signer.verify_encoded("not-a-token", Utc::now()),
            Err(SessionError::Malformed)
        );
    }

    #[test]
    fn test_hex_key_round_trip() {
        let hex_key = "ab".repeat(32);
        let a = SessionSigner::from_hex(&hex_key).unwrap();
        let b = SessionSigner::from_secret_bytes(&[0xab; 32]);
        assert_eq!(a.verifying_key(), b.verifying_key());
        assert!(SessionSigner::from_hex("abcd").is_err());
    }
}
