//! Booking request validation.
//!
//! Runs before any store is touched. A request that fails here never
//! reaches the ledger.

use crate::error::BookingError;
use crate::types::{NewReservation, TimeWindow, UserId, VehicleId};
use chrono::Duration;

/// Shortest bookable rental.
pub const MIN_RENTAL_HOURS: i64 = 1;

/// Longest bookable rental.
pub const MAX_RENTAL_HOURS: i64 = 72;

/// Accepted range for `expected_charge_level`.
pub const CHARGE_LEVEL_RANGE: std::ops::RangeInclusive<i32> = 0..=100;

/// Check that a window is within the bookable duration bounds.
///
/// Both bounds are inclusive.
///
/// # Errors
///
/// Returns [`BookingError::Validation`] when the duration is outside
/// `[MIN_RENTAL_HOURS, MAX_RENTAL_HOURS]`.
pub fn validate_duration(window: &TimeWindow) -> Result<(), BookingError> {
    let duration = window.duration();
    if duration < Duration::hours(MIN_RENTAL_HOURS) || duration > Duration::hours(MAX_RENTAL_HOURS) {
        return Err(BookingError::Validation(format!(
            "reservation duration must be between {MIN_RENTAL_HOURS} hour and {MAX_RENTAL_HOURS} hours"
        )));
    }
    Ok(())
}

/// Validate every field of a booking and build the ledger input.
///
/// # Errors
///
/// Returns [`BookingError::Validation`] for a non-positive id, a duration
/// out of bounds, or a charge level outside `0..=100`.
pub fn validate_new_reservation(
    vehicle_id: VehicleId,
    user_id: UserId,
    window: TimeWindow,
    expected_charge_level: i32,
) -> Result<NewReservation, BookingError> {
    if !vehicle_id.is_valid() {
        return Err(BookingError::Validation("vehicle_id must be positive".to_string()));
    }
    if !user_id.is_valid() {
        return Err(BookingError::Validation("user_id must be positive".to_string()));
    }
    validate_duration(&window)?;
    if !CHARGE_LEVEL_RANGE.contains(&expected_charge_level) {
        return Err(BookingError::Validation(
            "expected_charge_level must be between 0 and 100".to_string(),
        ));
    }

    Ok(NewReservation {
        vehicle_id,
        user_id,
        window,
        expected_charge_level,
    })
}
