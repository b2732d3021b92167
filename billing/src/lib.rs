//! # Car Rental Billing
//!
//! Rental fee arithmetic, billing records and the live rate lookup the
//! billing service prices quotes with.
//!
//! - [`calculate_fee`] and [`calculate_fee_between`]: pure fee arithmetic
//! - [`records`]: append-only billing records behind [`BillingRepository`]
//! - [`rates`]: [`RateLookup`] against the vehicle service
//!
//! ```
//! use car_rental_billing::calculate_fee;
//! use car_rental_core::{TimeWindow, Utc};
//! use chrono::Duration;
//!
//! let start = Utc::now();
//! let window = TimeWindow::new(start, start + Duration::minutes(90)).unwrap();
//! let fee = calculate_fee(20.0, &window, None).unwrap();
//! assert!((fee.total - 30.0).abs() < 1e-9);
//! ```

#![forbid(unsafe_code)]

pub mod rates;
pub mod records;

#[cfg(feature = "postgres")]
pub mod postgres;

#[cfg(feature = "postgres")]
pub use postgres::PostgresBillingRepository;
pub use rates::{DEFAULT_RATE_LOOKUP_TIMEOUT, RateLookup, RemoteRateLookup};
pub use records::{
    BillingRecord, BillingRepository, BillingStatus, InMemoryBillingRepository, NewBillingRecord,
};

use car_rental_core::{BookingError, DateTime, TimeWindow, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Fee calculation errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FeeError {
    /// End is not after start.
    #[error("invalid time range: end must be after start")]
    InvalidRange,

    /// Rate below zero, or not a finite number.
    #[error("invalid rental rate {0}")]
    InvalidRate(f64),

    /// Discount outside `0..=100` percent.
    #[error("invalid discount {0}%")]
    InvalidDiscount(f64),
}

impl From<FeeError> for BookingError {
    fn from(err: FeeError) -> Self {
        Self::Validation(err.to_string())
    }
}

/// Result of a fee calculation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Fee {
    /// Rental length in fractional hours
    pub hours: f64,
    /// `hours * rate`
    pub subtotal: f64,
    /// Amount taken off by the membership discount
    pub discount: f64,
    /// What the customer pays
    pub total: f64,
}

/// Fee for renting at `rate` per hour over `window`.
///
/// `discount_percent` is a membership discount such as `10.0` for Premium.
///
/// # Errors
///
/// - `InvalidRate` for a negative or non-finite rate
/// - `InvalidDiscount` for a discount outside `0..=100`
pub fn calculate_fee(rate: f64, window: &TimeWindow, discount_percent: Option<f64>) -> Result<Fee, FeeError> {
    if !rate.is_finite() || rate < 0.0 {
        return Err(FeeError::InvalidRate(rate));
    }
    let discount_percent = discount_percent.unwrap_or(0.0);
    if !(0.0..=100.0).contains(&discount_percent) {
        return Err(FeeError::InvalidDiscount(discount_percent));
    }

    let hours = window.hours();
    let subtotal = hours * rate;
    let discount = subtotal * discount_percent / 100.0;
    let fee = Fee {
        hours,
        subtotal,
        discount,
        total: subtotal - discount,
    };

    tracing::debug!(hours, rate, discount_percent, total = fee.total, "Rental fee calculated");
    Ok(fee)
}

/// [`calculate_fee`] over raw bounds.
///
/// # Errors
///
/// `InvalidRange` when `end <= start`, otherwise as [`calculate_fee`].
pub fn calculate_fee_between(
    rate: f64,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    discount_percent: Option<f64>,
) -> Result<Fee, FeeError> {
    let window = TimeWindow::new(start, end).map_err(|_| FeeError::InvalidRange)?;
    calculate_fee(rate, &window, discount_percent)
}
