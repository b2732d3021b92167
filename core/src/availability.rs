//! Availability oracle.
//!
//! Pure predicates over a vehicle's reservations. Ledgers evaluate these
//! inside their per-vehicle critical section; outside of it the answer is
//! advisory only.

use crate::types::{Reservation, TimeWindow};

/// Half-open overlap: `a.start < b.end && a.end > b.start`.
#[must_use]
pub fn overlaps(a: &TimeWindow, b: &TimeWindow) -> bool {
    a.overlaps(b)
}

/// `true` iff no active reservation in `reservations` overlaps `window`.
///
/// Completed and cancelled reservations never block.
#[must_use]
pub fn is_available<'a, I>(reservations: I, window: &TimeWindow) -> bool
where
    I: IntoIterator<Item = &'a Reservation>,
{
    first_conflict(reservations, window).is_none()
}

/// The first active reservation that overlaps `window`, if any.
#[must_use]
pub fn first_conflict<'a, I>(reservations: I, window: &TimeWindow) -> Option<&'a Reservation>
where
    I: IntoIterator<Item = &'a Reservation>,
{
    reservations
        .into_iter()
        .find(|existing| existing.is_active() && existing.window().overlaps(window))
}
