//! Session configuration.
//!
//! Values are supplied by the binary (see the services crate's `Config`),
//! not hardcoded at call sites.

use chrono::Duration;

/// Name of the cookie that carries the session token.
pub const SESSION_COOKIE_NAME: &str = "user-session";

/// Session lifetime policy.
#[derive(Debug, Clone, Copy)]
pub struct SessionConfig {
    /// Time a session stays valid after creation (or after its last
    /// successful resolve, when `sliding` is set).
    ///
    /// Default: 1 hour
    pub ttl: Duration,

    /// Push `expires_at` to `now + ttl` on every successful resolve.
    ///
    /// Default: `false` (absolute expiry)
    pub sliding: bool,
}

impl SessionConfig {
    /// Create a configuration with an absolute window of `ttl`.
    #[must_use]
    pub const fn new(ttl: Duration) -> Self {
        Self { ttl, sliding: false }
    }

    /// Enable or disable sliding refresh.
    #[must_use]
    pub const fn with_sliding(mut self, sliding: bool) -> Self {
        self.sliding = sliding;
        self
    }

    /// TTL in whole seconds, as used for `Max-Age` and Redis expiry.
    #[must_use]
    #[allow(clippy::cast_sign_loss)] // clamped to >= 0
    pub fn ttl_seconds(&self) -> u64 {
        self.ttl.num_seconds().max(0) as u64
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::new(Duration::hours(1))
    }
}
