//! Session store trait.

use crate::error::Result;
use crate::session::Session;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

/// Session store.
///
/// Sessions are keyed by token digest. Expiry is decided by the caller with
/// its injected clock; stores may additionally evict on their own TTL.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Create session.
    ///
    /// # Errors
    ///
    /// Returns error if the store is unreachable or the digest already exists.
    async fn create_session(&self, session: &Session, ttl: Duration) -> Result<()>;

    /// Get session by token digest.
    ///
    /// Returns `Ok(None)` when no session is stored under `digest`.
    ///
    /// # Errors
    ///
    /// Returns error if the store is unreachable or the record is corrupt.
    async fn get_session(&self, digest: &str) -> Result<Option<Session>>;

    /// Replace a session that is still stored and reset its store-side TTL
    /// to `ttl`.
    ///
    /// Returns `Ok(false)` without writing when nothing is stored under the
    /// session's digest, so a concurrent delete is never undone.
    ///
    /// # Errors
    ///
    /// Returns error if the store is unreachable.
    async fn update_session(&self, session: &Session, ttl: Duration) -> Result<bool>;

    /// Delete session. Deleting an unknown digest succeeds.
    ///
    /// # Errors
    ///
    /// Returns error if the store is unreachable.
    async fn delete_session(&self, digest: &str) -> Result<()>;

    /// Remove every session that expired before `now`, returning how many
    /// were removed.
    ///
    /// # Errors
    ///
    /// Returns error if the store is unreachable.
    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<usize>;
}
