//! Storage implementations for the identity service.
//!
//! - **In-memory** - sessions and users, for tests and single-process runs
//! - **Session Store** (Redis) - ephemeral session storage with TTL
//! - **User Repository** (PostgreSQL) - persistent accounts and membership tiers

pub mod memory;
#[cfg(feature = "postgres")]
pub mod postgres;
pub mod session_redis;

// Re-exports
pub use memory::{InMemorySessionStore, InMemoryUserRepository};
#[cfg(feature = "postgres")]
pub use postgres::PostgresUserRepository;
pub use session_redis::RedisSessionStore;
