//! Axum integration shared by the car rental services.
//!
//! Handlers stay thin: extract, call a domain service, map the result.
//!
//! ```text
//! request ─▶ correlation_id_layer ─▶ extractors ─▶ handler ─▶ domain service
//!                                   (CorrelationId,            │
//!                                    SessionCredential,        ▼
//!                                    ApiJson)          Result<_, AppError>
//! ```
//!
//! Domain errors (`BookingError`, `AuthError`) convert into [`AppError`],
//! which renders `{code, message}` with the matching status.

#![forbid(unsafe_code)]
#![warn(missing_docs, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod extractors;
pub mod health;
pub mod middleware;
pub mod session;

pub use error::{AppError, ErrorResponse};
pub use extractors::{ApiJson, CorrelationId, SESSION_TOKEN_HEADER, SessionCredential};
pub use health::{HealthResponse, health_routes};
pub use middleware::{CORRELATION_ID_HEADER, correlation_id_layer};
pub use session::{clear_session_cookie, session_cookie};

/// Result type alias for web handlers.
pub type WebResult<T> = Result<T, AppError>;
