//! # Car Rental Auth
//!
//! Session identity and user accounts for the car rental platform.
//!
//! ## Architecture
//!
//! ```text
//! IdentityService ── register / login / logout / profile / membership
//!   ├── UserRepository        (in-memory, PostgreSQL)
//!   ├── CredentialHasher      (Argon2id)
//!   └── SessionIdentityProvider ── create_session / resolve / invalidate
//!         └── SessionStore    (in-memory, Redis)
//! ```
//!
//! Tokens are opaque: 32 random bytes, base64url encoded. Stores only ever
//! see the token's SHA-256 digest.
//!
//! ## Example
//!
//! ```
//! use car_rental_auth::{SessionConfig, SessionIdentityProvider};
//! use car_rental_auth::stores::InMemorySessionStore;
//! use car_rental_core::{UserId, environment::SystemClock};
//! use std::sync::Arc;
//!
//! # async fn example() -> car_rental_auth::Result<()> {
//! let provider = SessionIdentityProvider::new(
//!     Arc::new(InMemorySessionStore::new()),
//!     Arc::new(SystemClock),
//!     SessionConfig::default(),
//! );
//!
//! let token = provider.create_session(UserId::new(1)).await?;
//! assert_eq!(provider.resolve(token.as_str()).await?, UserId::new(1));
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]

pub mod config;
pub mod error;
pub mod identity;
pub mod password;
pub mod providers;
pub mod service;
pub mod session;
pub mod state;
pub mod stores;
pub mod utils;

pub use config::{SESSION_COOKIE_NAME, SessionConfig};
pub use error::{AuthError, Result};
pub use identity::SessionIdentityProvider;
pub use password::Argon2Hasher;
pub use providers::{CredentialHasher, SessionStore, UserRepository};
pub use service::{IdentityService, LoginOutcome};
pub use session::{Session, SessionToken};
pub use state::{Membership, NewUser, ProfileUpdate, User};
