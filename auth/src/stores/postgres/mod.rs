//! PostgreSQL storage implementations.
//!
//! Accounts and membership tiers. Schema lives in `auth/migrations`.

pub mod user;

// Re-exports
pub use user::PostgresUserRepository;
