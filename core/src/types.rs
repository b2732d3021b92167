//! Domain types for the car rental platform.
//!
//! Identifiers, vehicle and reservation records, and the half-open
//! [`TimeWindow`] every booking decision is made against.

use crate::error::BookingError;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Identifiers
// ============================================================================

macro_rules! id_newtype {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            /// Wrap a raw database identifier
            #[must_use]
            pub const fn new(id: i64) -> Self {
                Self(id)
            }

            /// Get the raw identifier
            #[must_use]
            pub const fn get(&self) -> i64 {
                self.0
            }

            /// Identifiers are assigned by the store and always positive
            #[must_use]
            pub const fn is_valid(&self) -> bool {
                self.0 > 0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(id: i64) -> Self {
                Self(id)
            }
        }
    };
}

id_newtype!(
    /// Unique identifier for a registered user
    UserId
);

id_newtype!(
    /// Unique identifier for a vehicle in the fleet
    VehicleId
);

id_newtype!(
    /// Unique identifier for a reservation
    ReservationId
);

// ============================================================================
// Time Windows
// ============================================================================

/// Half-open rental interval `[start, end)`.
///
/// Construction guarantees `end > start`. Two windows that merely touch
/// (`a.end == b.start`) do not overlap.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeWindow {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl TimeWindow {
    /// Creates a new window.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::Validation`] when `end` is not strictly after `start`.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, BookingError> {
        if end <= start {
            return Err(BookingError::Validation(
                "end_time must be after start_time".to_string(),
            ));
        }
        Ok(Self { start, end })
    }

    /// Inclusive lower bound
    #[must_use]
    pub const fn start(&self) -> DateTime<Utc> {
        self.start
    }

    /// Exclusive upper bound
    #[must_use]
    pub const fn end(&self) -> DateTime<Utc> {
        self.end
    }

    /// Length of the window
    #[must_use]
    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    /// Length in fractional hours
    #[must_use]
    #[allow(clippy::cast_precision_loss)] // second precision is plenty for billing
    pub fn hours(&self) -> f64 {
        self.duration().num_seconds() as f64 / 3600.0
    }

    /// `self.start < other.end && self.end > other.start`
    #[must_use]
    pub fn overlaps(&self, other: &Self) -> bool {
        self.start < other.end && self.end > other.start
    }
}

// ============================================================================
// Vehicles
// ============================================================================

/// Operational status of a vehicle
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VehicleStatus {
    /// Can be booked
    Available,
    /// Holds at least one active reservation
    Reserved,
    /// Out of service, never bookable
    Maintenance,
}

impl VehicleStatus {
    /// Storage representation
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Available => "Available",
            Self::Reserved => "Reserved",
            Self::Maintenance => "Maintenance",
        }
    }

    /// Parse the storage representation
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Available" => Some(Self::Available),
            "Reserved" => Some(Self::Reserved),
            "Maintenance" => Some(Self::Maintenance),
            _ => None,
        }
    }
}

impl fmt::Display for VehicleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A vehicle in the rental fleet.
///
/// Read-only from the booking path, apart from the `Available -> Reserved`
/// transition a successful commit performs.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Vehicle {
    /// Vehicle identifier
    pub vehicle_id: VehicleId,
    /// Registration plate
    pub license_plate: String,
    /// Make and model
    pub model: String,
    /// Current status
    pub status: VehicleStatus,
    /// Price per hour
    pub rental_rate: f64,
    /// Battery charge in percent
    pub charge_level: i32,
    /// Odometer reading
    pub mileage: i64,
    /// Pick-up location
    pub location: String,
    /// Battery size for electric vehicles
    pub battery_capacity_kwh: Option<f64>,
    /// Free-form cleanliness grade
    pub cleanliness: String,
}

// ============================================================================
// Reservations
// ============================================================================

/// Lifecycle status of a reservation
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReservationStatus {
    /// Holds its window
    Active,
    /// Rental finished
    Completed,
    /// Cancelled before use; the window is free again
    Cancelled,
}

impl ReservationStatus {
    /// Storage representation
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "Active",
            Self::Completed => "Completed",
            Self::Cancelled => "Cancelled",
        }
    }

    /// Parse the storage representation
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Active" => Some(Self::Active),
            "Completed" => Some(Self::Completed),
            "Cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }
}

impl fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A persisted reservation
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
    /// Reservation identifier
    pub reservation_id: ReservationId,
    /// Reserved vehicle
    pub vehicle_id: VehicleId,
    /// Renting user
    pub user_id: UserId,
    /// Inclusive start
    pub start_time: DateTime<Utc>,
    /// Exclusive end
    pub end_time: DateTime<Utc>,
    /// Charge level the renter expects at pick-up
    pub expected_charge_level: i32,
    /// Lifecycle status
    pub status: ReservationStatus,
    /// Insertion time
    pub created_at: DateTime<Utc>,
}

impl Reservation {
    /// The reserved interval.
    ///
    /// Stored bounds always satisfy `end > start`, so this is built without
    /// re-validation.
    #[must_use]
    pub const fn window(&self) -> TimeWindow {
        TimeWindow {
            start: self.start_time,
            end: self.end_time,
        }
    }

    /// Only active reservations block a window
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status == ReservationStatus::Active
    }
}

/// A validated request to reserve a vehicle
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewReservation {
    /// Vehicle to reserve
    pub vehicle_id: VehicleId,
    /// Acting user
    pub user_id: UserId,
    /// Requested interval
    pub window: TimeWindow,
    /// Charge level the renter expects at pick-up
    pub expected_charge_level: i32,
}

/// A user's latest reservation joined with the vehicle's current rate
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LatestReservation {
    /// The reservation
    #[serde(flatten)]
    pub reservation: Reservation,
    /// Rental rate of the vehicle at query time
    pub rental_rate: f64,
}
