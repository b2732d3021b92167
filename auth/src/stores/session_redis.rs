//! Redis-based session store implementation.
//!
//! Sessions are stored in Redis with:
//! - **Key**: `session:{token_digest}` → bincode-serialized [`Session`]
//! - **TTL**: the session lifetime, reset on every update
//!
//! # Example
//!
//! ```no_run
//! use car_rental_auth::stores::RedisSessionStore;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = RedisSessionStore::new("redis://127.0.0.1:6379").await?;
//! # Ok(())
//! # }
//! ```

use crate::error::{AuthError, Result};
use crate::providers::SessionStore;
use crate::session::Session;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};

/// Redis-based session store with TTL-based expiration.
#[derive(Clone)]
pub struct RedisSessionStore {
    /// Connection manager for connection pooling.
    conn_manager: ConnectionManager,
}

impl RedisSessionStore {
    /// Create a new Redis session store.
    ///
    /// # Arguments
    ///
    /// * `redis_url` - Redis connection URL (e.g., "redis://127.0.0.1:6379")
    ///
    /// # Errors
    ///
    /// Returns error if connection to Redis fails.
    pub async fn new(redis_url: &str) -> Result<Self> {
        let client = Client::open(redis_url).map_err(|e| {
            AuthError::InternalError(format!("Failed to create Redis client: {e}"))
        })?;

        let conn_manager = ConnectionManager::new(client).await.map_err(|e| {
            AuthError::DatabaseError(format!("Failed to create Redis connection manager: {e}"))
        })?;

        Ok(Self { conn_manager })
    }

    fn session_key(digest: &str) -> String {
        format!("session:{digest}")
    }

    #[allow(clippy::cast_sign_loss)] // clamped to >= 1
    fn ttl_seconds(ttl: Duration) -> u64 {
        ttl.num_seconds().max(1) as u64
    }
}

#[async_trait]
impl SessionStore for RedisSessionStore {
    async fn create_session(&self, session: &Session, ttl: Duration) -> Result<()> {
        let mut conn = self.conn_manager.clone();
        let session_key = Self::session_key(&session.token_digest);

        let session_bytes =
            bincode::serialize(session).map_err(|e| AuthError::SerializationError(e.to_string()))?;
        let ttl_seconds = Self::ttl_seconds(ttl);

        // SET NX EX: a digest collision must not overwrite a live session.
        let reply: Option<String> = redis::cmd("SET")
            .arg(&session_key)
            .arg(session_bytes)
            .arg("NX")
            .arg("EX")
            .arg(ttl_seconds)
            .query_async(&mut conn)
            .await
            .map_err(|e| AuthError::DatabaseError(format!("Failed to create session: {e}")))?;

        if reply.is_none() {
            return Err(AuthError::DatabaseError("Session already exists".to_string()));
        }

        tracing::info!(
            user_id = %session.user_id,
            ttl_seconds = ttl_seconds,
            "Created session in Redis"
        );

        Ok(())
    }

    async fn get_session(&self, digest: &str) -> Result<Option<Session>> {
        let mut conn = self.conn_manager.clone();

        let session_bytes: Option<Vec<u8>> =
            conn.get(Self::session_key(digest)).await.map_err(|e| {
                AuthError::DatabaseError(format!("Failed to get session from Redis: {e}"))
            })?;

        session_bytes
            .map(|bytes| {
                bincode::deserialize(&bytes).map_err(|e| AuthError::SerializationError(e.to_string()))
            })
            .transpose()
    }

    async fn update_session(&self, session: &Session, ttl: Duration) -> Result<bool> {
        let mut conn = self.conn_manager.clone();
        let session_bytes =
            bincode::serialize(session).map_err(|e| AuthError::SerializationError(e.to_string()))?;
        let ttl_seconds = Self::ttl_seconds(ttl);

        // SET XX EX: a session deleted since it was read stays deleted.
        let reply: Option<String> = redis::cmd("SET")
            .arg(Self::session_key(&session.token_digest))
            .arg(session_bytes)
            .arg("XX")
            .arg("EX")
            .arg(ttl_seconds)
            .query_async(&mut conn)
            .await
            .map_err(|e| AuthError::DatabaseError(format!("Failed to update session: {e}")))?;

        let updated = reply.is_some();
        tracing::debug!(
            user_id = %session.user_id,
            ttl_seconds = ttl_seconds,
            updated,
            "Refreshed session TTL"
        );

        Ok(updated)
    }

    async fn delete_session(&self, digest: &str) -> Result<()> {
        let mut conn = self.conn_manager.clone();

        let _: () = conn.del(Self::session_key(digest)).await.map_err(|e| {
            AuthError::DatabaseError(format!("Failed to delete session from Redis: {e}"))
        })?;

        tracing::info!("Deleted session from Redis");
        Ok(())
    }

    async fn purge_expired(&self, _now: DateTime<Utc>) -> Result<usize> {
        // Redis evicts on key TTL.
        Ok(0)
    }
}
