//! Error types for identity and session operations.

use car_rental_core::BookingError;
use thiserror::Error;

/// Result type alias for authentication operations.
pub type Result<T> = std::result::Result<T, AuthError>;

/// Error taxonomy for the identity service.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    // ═══════════════════════════════════════════════════════════
    // Authentication Errors
    // ═══════════════════════════════════════════════════════════

    /// Unknown email or wrong password. The two are never distinguished.
    #[error("Invalid email or password")]
    InvalidCredentials,

    /// Session token is missing, malformed, unknown, or expired.
    #[error("Authentication required")]
    Unauthenticated,

    // ═══════════════════════════════════════════════════════════
    // Account Errors
    // ═══════════════════════════════════════════════════════════

    /// Email or phone number is already registered.
    #[error("Email or phone number already exists")]
    DuplicateUser,

    /// No user with the given id.
    #[error("User not found")]
    UserNotFound,

    /// Input failed validation.
    #[error("Validation failed: {0}")]
    Validation(String),

    // ═══════════════════════════════════════════════════════════
    // System Errors
    // ═══════════════════════════════════════════════════════════

    /// Database or cache operation failed.
    #[error("Database error: {0}")]
    DatabaseError(String),

    /// Session (de)serialization failed.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Internal error (should not be exposed to users).
    #[error("Internal error: {0}")]
    InternalError(String),
}

impl AuthError {
    /// Returns `true` if this error is due to invalid user input.
    ///
    /// # Examples
    ///
    /// ```
    /// # use car_rental_auth::AuthError;
    /// assert!(AuthError::InvalidCredentials.is_user_error());
    /// assert!(!AuthError::InternalError("boom".into()).is_user_error());
    /// ```
    #[must_use]
    pub const fn is_user_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidCredentials
                | Self::Unauthenticated
                | Self::DuplicateUser
                | Self::UserNotFound
                | Self::Validation(_)
        )
    }
}

impl From<AuthError> for BookingError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials | AuthError::Unauthenticated => Self::Unauthenticated,
            AuthError::Validation(message) => Self::Validation(message),
            AuthError::UserNotFound => Self::NotFound("user".to_string()),
            AuthError::DuplicateUser => {
                Self::Validation("email or phone number already exists".to_string())
            },
            AuthError::DatabaseError(detail)
            | AuthError::SerializationError(detail)
            | AuthError::InternalError(detail) => Self::DependencyFailure(detail),
        }
    }
}
