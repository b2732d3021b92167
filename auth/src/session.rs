//! Session tokens and session records.
//!
//! A token is 256 random bits from the OS RNG, base64url encoded without
//! padding (43 characters). Stores never see the token itself, only its
//! SHA-256 digest, so a leaked store does not leak live credentials.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use car_rental_core::UserId;
use chrono::{DateTime, Utc};
use rand::RngCore;
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Raw token length in bytes.
pub const TOKEN_BYTES: usize = 32;

/// Opaque bearer credential handed to the client.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionToken(String);

impl SessionToken {
    /// Generate a fresh token from the OS RNG.
    #[must_use]
    pub fn generate() -> Self {
        let mut random_bytes = [0u8; TOKEN_BYTES];
        OsRng.fill_bytes(&mut random_bytes);
        Self(URL_SAFE_NO_PAD.encode(random_bytes))
    }

    /// Parse a client-supplied token.
    ///
    /// Returns `None` unless the value decodes to exactly [`TOKEN_BYTES`] bytes.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        match URL_SAFE_NO_PAD.decode(trimmed) {
            Ok(bytes) if bytes.len() == TOKEN_BYTES => Some(Self(trimmed.to_string())),
            _ => None,
        }
    }

    /// The encoded token, for cookies and response bodies.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// SHA-256 of the token, base64url encoded. This is the storage key.
    #[must_use]
    pub fn digest(&self) -> String {
        URL_SAFE_NO_PAD.encode(Sha256::digest(self.0.as_bytes()))
    }
}

impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionToken(<redacted>)")
    }
}

/// Server-side session record, keyed by token digest.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// SHA-256 digest of the token
    pub token_digest: String,
    /// Owner of the session
    pub user_id: UserId,
    /// Login time
    pub created_at: DateTime<Utc>,
    /// Last successful resolve
    pub last_active: DateTime<Utc>,
    /// Instant after which the session is rejected
    pub expires_at: DateTime<Utc>,
}

impl Session {
    /// A session is expired strictly after `expires_at`.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}
