//! Session identity provider.
//!
//! Issues, resolves, and invalidates session tokens against an injected
//! [`SessionStore`]. There is no process-wide session state: every service
//! builds its own provider and drops it (and its store handle) on shutdown.

use crate::config::SessionConfig;
use crate::error::{AuthError, Result};
use crate::providers::SessionStore;
use crate::session::{Session, SessionToken};
use car_rental_core::UserId;
use car_rental_core::environment::Clock;
use std::sync::Arc;

/// Resolves session tokens to users.
#[derive(Clone)]
pub struct SessionIdentityProvider {
    store: Arc<dyn SessionStore>,
    clock: Arc<dyn Clock>,
    config: SessionConfig,
}

impl SessionIdentityProvider {
    /// Create a provider over `store`.
    #[must_use]
    pub fn new(store: Arc<dyn SessionStore>, clock: Arc<dyn Clock>, config: SessionConfig) -> Self {
        Self { store, clock, config }
    }

    /// Session policy in effect.
    #[must_use]
    pub const fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Start a session for `user_id`.
    ///
    /// # Errors
    ///
    /// Returns error if the store rejects the session.
    pub async fn create_session(&self, user_id: UserId) -> Result<SessionToken> {
        let token = SessionToken::generate();
        let now = self.clock.now();
        let session = Session {
            token_digest: token.digest(),
            user_id,
            created_at: now,
            last_active: now,
            expires_at: now + self.config.ttl,
        };

        self.store.create_session(&session, self.config.ttl).await?;

        metrics::counter!("session.created").increment(1);
        tracing::info!(user_id = %user_id, expires_at = %session.expires_at, "Session created");

        Ok(token)
    }

    /// Resolve a client-supplied token to its user.
    ///
    /// A malformed, unknown, or expired token all yield
    /// [`AuthError::Unauthenticated`]. With sliding refresh enabled, a
    /// successful resolve extends the session to `now + ttl`.
    ///
    /// # Errors
    ///
    /// Returns `Unauthenticated` as described above, or a store error.
    pub async fn resolve(&self, raw_token: &str) -> Result<UserId> {
        let Some(token) = SessionToken::parse(raw_token) else {
            return Err(Self::reject("malformed"));
        };
        let digest = token.digest();

        let Some(mut session) = self.store.get_session(&digest).await? else {
            return Err(Self::reject("unknown"));
        };

        let now = self.clock.now();
        if session.is_expired(now) {
            // Expired sessions are dead weight; removal failure is not the caller's problem.
            if let Err(e) = self.store.delete_session(&digest).await {
                tracing::warn!(error = %e, "Failed to delete expired session");
            }
            return Err(Self::reject("expired"));
        }

        if self.config.sliding {
            session.last_active = now;
            session.expires_at = now + self.config.ttl;
            if !self.store.update_session(&session, self.config.ttl).await? {
                return Err(Self::reject("revoked"));
            }
        }

        Ok(session.user_id)
    }

    /// End the session behind `raw_token`. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns error only if the store is unreachable.
    pub async fn invalidate(&self, raw_token: &str) -> Result<()> {
        let Some(token) = SessionToken::parse(raw_token) else {
            return Ok(());
        };
        self.store.delete_session(&token.digest()).await?;
        tracing::info!("Session invalidated");
        Ok(())
    }

    /// Drop every session that has expired by now.
    ///
    /// # Errors
    ///
    /// Returns error if the store is unreachable.
    pub async fn purge_expired(&self) -> Result<usize> {
        let purged = self.store.purge_expired(self.clock.now()).await?;
        if purged > 0 {
            tracing::debug!(purged, "Purged expired sessions");
        }
        Ok(purged)
    }

    fn reject(reason: &'static str) -> AuthError {
        metrics::counter!("session.resolve_failed", "reason" => reason).increment(1);
        tracing::warn!(reason, "Session resolve failed");
        AuthError::Unauthenticated
    }
}
