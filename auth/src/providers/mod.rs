//! Identity providers.
//!
//! Traits for every external dependency of the identity service. Concrete
//! stores live in [`crate::stores`]; tests and single-process deployments use
//! the in-memory ones, production uses Redis and PostgreSQL.
//!
//! The traits are object safe (`async_trait`) so a binary can pick an
//! implementation at startup and share it as `Arc<dyn _>`.

pub mod credential;
pub mod session;
pub mod user;

pub use credential::CredentialHasher;
pub use session::SessionStore;
pub use user::UserRepository;
