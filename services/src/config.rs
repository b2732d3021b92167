//! Configuration management for the services.
//!
//! Loads configuration from environment variables with defaults. Call
//! `dotenvy::dotenv()` first to pick up a `.env` file.

use car_rental_auth::SessionConfig;
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

/// Service configuration loaded from environment variables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// HTTP listener
    pub server: ServerConfig,
    /// PostgreSQL; `None` runs on in-memory stores
    pub database: Option<DatabaseConfig>,
    /// Redis URL for sessions; `None` keeps sessions in memory
    pub redis_url: Option<String>,
    /// Session lifetime
    pub session: SessionSettings,
    /// Identity relay used by the vehicle service
    pub relay: RelayConfig,
    /// Rate lookup used by the billing service
    pub rates: RateLookupConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,
    /// Port to bind to
    pub port: u16,
}

/// `PostgreSQL` configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Connection URL
    pub url: String,
    /// Maximum number of connections in the pool
    pub max_connections: u32,
}

/// Session settings
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SessionSettings {
    /// Session lifetime in seconds
    pub ttl_seconds: u64,
    /// Push expiry forward on every successful resolve
    pub sliding: bool,
}

/// Identity relay settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    /// Base URL of the user service
    pub identity_service_url: String,
    /// Request timeout in milliseconds
    pub timeout_ms: u64,
}

/// Rate lookup settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLookupConfig {
    /// Base URL of the vehicle service
    pub vehicle_service_url: String,
    /// Request timeout in milliseconds
    pub timeout_ms: u64,
}

const MAX_SESSION_TTL_SECONDS: u64 = 30 * 24 * 3600;

fn parsed<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|s| s.parse().ok())
}

fn non_empty(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.trim().is_empty())
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// `default_port` applies when `PORT` is unset. Malformed numeric values
    /// fall back to their defaults.
    #[must_use]
    pub fn from_env(default_port: u16) -> Self {
        Self {
            server: ServerConfig {
                host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: parsed("PORT").unwrap_or(default_port),
            },
            database: non_empty("DATABASE_URL").map(|url| DatabaseConfig {
                url,
                max_connections: parsed("DATABASE_MAX_CONNECTIONS").unwrap_or(10),
            }),
            redis_url: non_empty("REDIS_URL"),
            session: SessionSettings {
                ttl_seconds: parsed("SESSION_TTL_SECONDS").unwrap_or(3600),
                sliding: parsed("SESSION_SLIDING").unwrap_or(false),
            },
            relay: RelayConfig {
                identity_service_url: env::var("IDENTITY_SERVICE_URL")
                    .unwrap_or_else(|_| "http://localhost:8080".to_string()),
                timeout_ms: parsed("RELAY_TIMEOUT_MS").unwrap_or(2000),
            },
            rates: RateLookupConfig {
                vehicle_service_url: env::var("VEHICLE_SERVICE_URL")
                    .unwrap_or_else(|_| "http://localhost:8081".to_string()),
                timeout_ms: parsed("RATE_LOOKUP_TIMEOUT_MS").unwrap_or(2000),
            },
        }
    }

    /// `host:port` to bind.
    #[must_use]
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Session config for the identity provider. The TTL is capped at 30 days.
    #[must_use]
    pub fn session_config(&self) -> SessionConfig {
        let seconds = i64::try_from(self.session.ttl_seconds.min(MAX_SESSION_TTL_SECONDS)).unwrap_or(3600);
        SessionConfig::new(chrono::Duration::seconds(seconds)).with_sliding(self.session.sliding)
    }

    /// Relay request timeout.
    #[must_use]
    pub const fn relay_timeout(&self) -> Duration {
        Duration::from_millis(self.relay.timeout_ms)
    }

    /// Rate lookup request timeout.
    #[must_use]
    pub const fn rate_lookup_timeout(&self) -> Duration {
        Duration::from_millis(self.rates.timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_config_from_settings() {
        let mut config = Config::from_env(8081);
        config.session = SessionSettings {
            ttl_seconds: 120,
            sliding: true,
        };

        let session = config.session_config();

        assert_eq!(session.ttl_seconds(), 120);
        assert!(session.sliding);

        config.session.ttl_seconds = u64::MAX;
        assert_eq!(config.session_config().ttl_seconds(), 30 * 24 * 3600);
    }

    #[test]
    fn test_bind_address() {
        let mut config = Config::from_env(8082);
        config.server = ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 9000,
        };
        assert_eq!(config.bind_address(), "127.0.0.1:9000");
    }

    #[test]
    fn test_timeouts_from_milliseconds() {
        let mut config = Config::from_env(8082);
        config.relay.timeout_ms = 250;
        config.rates.timeout_ms = 1500;

        assert_eq!(config.relay_timeout(), Duration::from_millis(250));
        assert_eq!(config.rate_lookup_timeout(), Duration::from_millis(1500));
    }
}
