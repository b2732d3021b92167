//! Error taxonomy for the booking core.

use crate::types::VehicleId;
use thiserror::Error;

/// Result type alias for booking operations.
pub type Result<T> = std::result::Result<T, BookingError>;

/// Every way a booking-related operation can fail.
///
/// `Validation` and `Unauthenticated` are caller mistakes and never retried.
/// `Conflict` is a definitive answer for the requested window. `DependencyFailure`
/// means a store or a remote service could not be reached; nothing was written.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BookingError {
    /// Malformed or out-of-bounds input.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Missing, malformed, or expired session.
    #[error("Authentication required")]
    Unauthenticated,

    /// The window overlaps an active reservation, or the vehicle cannot be booked.
    #[error("Vehicle {vehicle_id} is not available for the requested window")]
    Conflict {
        /// Vehicle that was requested
        vehicle_id: VehicleId,
    },

    /// Requested record does not exist (or is not visible to the caller).
    #[error("{0} not found")]
    NotFound(String),

    /// A store or downstream service failed.
    #[error("Dependency failure: {0}")]
    DependencyFailure(String),
}

impl BookingError {
    /// Machine-readable error code carried in HTTP error bodies.
    ///
    /// # Examples
    ///
    /// ```
    /// # use car_rental_core::BookingError;
    /// assert_eq!(BookingError::Unauthenticated.code(), "UNAUTHENTICATED");
    /// ```
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Unauthenticated => "UNAUTHENTICATED",
            Self::Conflict { .. } => "CONFLICT",
            Self::NotFound(_) => "NOT_FOUND",
            Self::DependencyFailure(_) => "DEPENDENCY_FAILURE",
        }
    }

    /// Short label used for metrics and log fields.
    #[must_use]
    pub const fn reason(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::Unauthenticated => "unauthenticated",
            Self::Conflict { .. } => "conflict",
            Self::NotFound(_) => "not_found",
            Self::DependencyFailure(_) => "dependency_failure",
        }
    }

    /// Returns `true` if the caller caused this error.
    ///
    /// # Examples
    ///
    /// ```
    /// # use car_rental_core::BookingError;
    /// assert!(BookingError::Validation("bad".into()).is_caller_error());
    /// assert!(!BookingError::DependencyFailure("db".into()).is_caller_error());
    /// ```
    #[must_use]
    pub const fn is_caller_error(&self) -> bool {
        matches!(self, Self::Validation(_) | Self::Unauthenticated)
    }
}
