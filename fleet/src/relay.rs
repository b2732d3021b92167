//! Cross-service identity relay.
//!
//! The vehicle service never trusts a caller-supplied user id for writes. It
//! forwards the caller's session token to whoever owns sessions and uses the
//! user id that comes back. Every failure closes: an unknown token is
//! `Unauthenticated`, anything else that prevents an answer is a
//! `DependencyFailure`.

use async_trait::async_trait;
use car_rental_auth::{SESSION_COOKIE_NAME, SessionIdentityProvider, SessionToken};
use car_rental_core::{BookingError, Result, UserId};
use reqwest::{Client, StatusCode, header};
use serde::Deserialize;
use std::time::Duration;

/// Default bound on a remote resolve.
pub const DEFAULT_RELAY_TIMEOUT: Duration = Duration::from_secs(2);

/// Resolves a session token to the acting user.
#[async_trait]
pub trait IdentityRelay: Send + Sync {
    /// Resolve `token` to a user id.
    ///
    /// # Errors
    ///
    /// - `Unauthenticated` when the token is malformed, unknown or expired
    /// - `DependencyFailure` when the identity owner cannot be reached
    async fn resolve(&self, token: &str) -> Result<UserId>;
}

/// Relay for a process that owns the session store itself.
#[derive(Clone)]
pub struct LocalIdentityRelay {
    provider: SessionIdentityProvider,
}

impl LocalIdentityRelay {
    /// Wrap an in-process provider.
    #[must_use]
    pub const fn new(provider: SessionIdentityProvider) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl IdentityRelay for LocalIdentityRelay {
    async fn resolve(&self, token: &str) -> Result<UserId> {
        Ok(self.provider.resolve(token).await?)
    }
}

#[derive(Debug, Deserialize)]
struct CurrentSession {
    user_id: i64,
}

/// Relay that asks the identity service over HTTP.
///
/// Calls `GET {base_url}/sessions/current` with the token forwarded as the
/// session cookie. Nothing is cached between calls.
#[derive(Clone)]
pub struct RemoteIdentityRelay {
    client: Client,
    base_url: String,
}

impl RemoteIdentityRelay {
    /// Create a relay for the identity service at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns `DependencyFailure` if the HTTP client cannot be built.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BookingError::DependencyFailure(format!("identity client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Identity service base URL.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

fn unreachable_identity(detail: &str) -> BookingError {
    tracing::error!(detail, "Identity service call failed");
    BookingError::DependencyFailure("identity service unavailable".to_string())
}

#[async_trait]
impl IdentityRelay for RemoteIdentityRelay {
    async fn resolve(&self, token: &str) -> Result<UserId> {
        // Only well-formed tokens go on the wire, which also keeps the
        // cookie header free of separators.
        let Some(token) = SessionToken::parse(token) else {
            tracing::warn!("Relay rejected malformed session token");
            return Err(BookingError::Unauthenticated);
        };

        let response = self
            .client
            .get(format!("{}/sessions/current", self.base_url))
            .header(header::COOKIE, format!("{SESSION_COOKIE_NAME}={}", token.as_str()))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    unreachable_identity("timed out")
                } else {
                    unreachable_identity(&e.to_string())
                }
            })?;

        match response.status() {
            StatusCode::OK => {
                let body = response
                    .json::<CurrentSession>()
                    .await
                    .map_err(|e| unreachable_identity(&format!("undecodable body: {e}")))?;
                let user_id = UserId::new(body.user_id);
                if !user_id.is_valid() {
                    return Err(unreachable_identity("identity service returned an invalid user id"));
                }
                Ok(user_id)
            },
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                tracing::warn!("Identity service rejected session");
                Err(BookingError::Unauthenticated)
            },
            status => Err(unreachable_identity(&format!("unexpected status {status}"))),
        }
    }
}
