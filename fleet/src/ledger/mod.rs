//! Reservation ledger.
//!
//! The ledger is the only writer of reservations. Its one hard guarantee:
//! for a fixed vehicle, no two `Active` reservations ever overlap on
//! `[start, end)`. `check_and_commit` evaluates the availability oracle and
//! inserts under a per-vehicle critical section, so concurrent bookings of
//! the same vehicle serialize while different vehicles proceed in parallel.

use async_trait::async_trait;
use car_rental_core::{
    LatestReservation, NewReservation, Reservation, ReservationId, Result, TimeWindow, UserId,
    VehicleId,
};

pub mod memory;
#[cfg(feature = "postgres")]
pub mod postgres;

pub use memory::InMemoryReservationLedger;
#[cfg(feature = "postgres")]
pub use postgres::{PostgresReservationLedger, PostgresVehicleCatalog};

/// Authoritative reservation store.
#[async_trait]
pub trait ReservationLedger: Send + Sync {
    /// Atomically check availability and insert.
    ///
    /// On success the reservation is `Active` and the vehicle is marked
    /// `Reserved`. On any error nothing was written.
    ///
    /// # Errors
    ///
    /// - `Validation` for bad bounds or a vehicle missing from the catalog
    /// - `Conflict` when an active reservation overlaps, or the vehicle is
    ///   in maintenance
    /// - `DependencyFailure` when the store fails
    async fn check_and_commit(&self, booking: NewReservation) -> Result<Reservation>;

    /// The user's most recently created reservation, with the vehicle's
    /// rental rate as of now.
    ///
    /// # Errors
    ///
    /// Returns `DependencyFailure` when the store fails.
    async fn latest_for_user(&self, user_id: UserId) -> Result<Option<LatestReservation>>;

    /// Advisory availability check. Never gates a booking.
    ///
    /// # Errors
    ///
    /// Returns `DependencyFailure` when the store fails.
    async fn is_available(&self, vehicle_id: VehicleId, window: &TimeWindow) -> Result<bool>;

    /// Every reservation of a vehicle, ordered by start time.
    ///
    /// # Errors
    ///
    /// Returns `DependencyFailure` when the store fails.
    async fn reservations_for_vehicle(&self, vehicle_id: VehicleId) -> Result<Vec<Reservation>>;

    /// The user's rental history, newest first.
    ///
    /// # Errors
    ///
    /// Returns `DependencyFailure` when the store fails.
    async fn reservations_for_user(&self, user_id: UserId) -> Result<Vec<Reservation>>;

    /// Cancel one of the user's reservations, freeing its window.
    ///
    /// Cancelling an already cancelled reservation returns it unchanged.
    ///
    /// # Errors
    ///
    /// - `NotFound` when it does not exist or belongs to someone else
    /// - `Validation` when it is already completed
    /// - `DependencyFailure` when the store fails
    async fn cancel(&self, reservation_id: ReservationId, user_id: UserId) -> Result<Reservation>;

    /// Mark an active reservation completed.
    ///
    /// # Errors
    ///
    /// - `NotFound` when it does not exist
    /// - `Validation` when it is not active
    /// - `DependencyFailure` when the store fails
    async fn complete(&self, reservation_id: ReservationId) -> Result<Reservation>;
}
