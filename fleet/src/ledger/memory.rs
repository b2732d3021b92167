//! In-memory reservation ledger.
//!
//! Each vehicle owns a `tokio::sync::Mutex` around its reservation list. The
//! registry mapping vehicles to their guard is a plain `std::sync::Mutex`
//! that is never held across an await.

use super::ReservationLedger;
use crate::catalog::VehicleCatalog;
use async_trait::async_trait;
use car_rental_core::environment::Clock;
use car_rental_core::{
    BookingError, LatestReservation, NewReservation, Reservation, ReservationId,
    ReservationStatus, Result, TimeWindow, UserId, VehicleId, VehicleStatus, availability,
    validation,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

type VehicleSlot = Arc<tokio::sync::Mutex<Vec<Reservation>>>;

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>> {
    mutex
        .lock()
        .map_err(|_| BookingError::DependencyFailure("ledger registry lock poisoned".to_string()))
}

/// Ledger keeping reservations in process memory.
pub struct InMemoryReservationLedger {
    catalog: Arc<dyn VehicleCatalog>,
    clock: Arc<dyn Clock>,
    slots: Mutex<HashMap<VehicleId, VehicleSlot>>,
    index: Mutex<HashMap<ReservationId, VehicleId>>,
    next_id: AtomicI64,
}

impl InMemoryReservationLedger {
    /// Create an empty ledger over `catalog`.
    #[must_use]
    pub fn new(catalog: Arc<dyn VehicleCatalog>, clock: Arc<dyn Clock>) -> Self {
        Self {
            catalog,
            clock,
            slots: Mutex::new(HashMap::new()),
            index: Mutex::new(HashMap::new()),
            next_id: AtomicI64::new(0),
        }
    }

    fn slot(&self, vehicle_id: VehicleId) -> Result<VehicleSlot> {
        Ok(Arc::clone(lock(&self.slots)?.entry(vehicle_id).or_default()))
    }

    fn existing_slot(&self, vehicle_id: VehicleId) -> Result<Option<VehicleSlot>> {
        Ok(lock(&self.slots)?.get(&vehicle_id).map(Arc::clone))
    }

    fn all_slots(&self) -> Result<Vec<VehicleSlot>> {
        Ok(lock(&self.slots)?.values().map(Arc::clone).collect())
    }

    /// Flip a reserved vehicle back to available once nothing active remains.
    /// Caller holds the vehicle's guard.
    async fn release_if_idle(&self, vehicle_id: VehicleId, reservations: &[Reservation]) -> Result<()> {
        if reservations.iter().any(Reservation::is_active) {
            return Ok(());
        }
        let vehicle = self.catalog.get_vehicle(vehicle_id).await?;
        if vehicle.is_some_and(|v| v.status == VehicleStatus::Reserved) {
            self.catalog.set_status(vehicle_id, VehicleStatus::Available).await?;
            tracing::debug!(vehicle_id = %vehicle_id, "Vehicle released");
        }
        Ok(())
    }

    /// Apply `transition` to a stored reservation under its vehicle's guard.
    async fn transition<F>(&self, reservation_id: ReservationId, transition: F) -> Result<Reservation>
    where
        F: FnOnce(&mut Reservation) -> Result<bool> + Send,
    {
        let not_found = || BookingError::NotFound(format!("reservation {reservation_id}"));

        let vehicle_id = lock(&self.index)?.get(&reservation_id).copied().ok_or_else(not_found)?;
        let slot = self.existing_slot(vehicle_id)?.ok_or_else(not_found)?;
        let mut reservations = slot.lock().await;

        let reservation = reservations
            .iter_mut()
            .find(|r| r.reservation_id == reservation_id)
            .ok_or_else(not_found)?;
        let changed = transition(reservation)?;
        let updated = reservation.clone();

        if changed {
            self.release_if_idle(vehicle_id, &reservations).await?;
        }
        Ok(updated)
    }
}

#[async_trait]
impl ReservationLedger for InMemoryReservationLedger {
    async fn check_and_commit(&self, booking: NewReservation) -> Result<Reservation> {
        let booking = validation::validate_new_reservation(
            booking.vehicle_id,
            booking.user_id,
            booking.window,
            booking.expected_charge_level,
        )?;
        let vehicle_id = booking.vehicle_id;

        if self.catalog.get_vehicle(vehicle_id).await?.is_none() {
            return Err(BookingError::Validation(format!("vehicle {vehicle_id} does not exist")));
        }

        let slot = self.slot(vehicle_id)?;
        let mut reservations = slot.lock().await;

        // Status is re-read under the guard; only guard holders flip it.
        let vehicle = self
            .catalog
            .get_vehicle(vehicle_id)
            .await?
            .ok_or_else(|| BookingError::Validation(format!("vehicle {vehicle_id} does not exist")))?;
        if vehicle.status == VehicleStatus::Maintenance {
            tracing::warn!(vehicle_id = %vehicle_id, "Booking rejected: vehicle in maintenance");
            return Err(BookingError::Conflict { vehicle_id });
        }

        if let Some(existing) = availability::first_conflict(reservations.iter(), &booking.window) {
            tracing::warn!(
                vehicle_id = %vehicle_id,
                existing_reservation = %existing.reservation_id,
                "Booking rejected: window overlaps active reservation"
            );
            return Err(BookingError::Conflict { vehicle_id });
        }

        if vehicle.status != VehicleStatus::Reserved {
            self.catalog.set_status(vehicle_id, VehicleStatus::Reserved).await?;
        }

        let reservation = Reservation {
            reservation_id: ReservationId::new(self.next_id.fetch_add(1, Ordering::SeqCst) + 1),
            vehicle_id,
            user_id: booking.user_id,
            start_time: booking.window.start(),
            end_time: booking.window.end(),
            expected_charge_level: booking.expected_charge_level,
            status: ReservationStatus::Active,
            created_at: self.clock.now(),
        };
        lock(&self.index)?.insert(reservation.reservation_id, vehicle_id);
        reservations.push(reservation.clone());

        tracing::info!(
            reservation_id = %reservation.reservation_id,
            vehicle_id = %vehicle_id,
            user_id = %reservation.user_id,
            "Reservation committed"
        );
        Ok(reservation)
    }

    async fn latest_for_user(&self, user_id: UserId) -> Result<Option<LatestReservation>> {
        let mut latest: Option<Reservation> = None;
        for slot in self.all_slots()? {
            let reservations = slot.lock().await;
            for candidate in reservations.iter().filter(|r| r.user_id == user_id) {
                let newer = latest.as_ref().is_none_or(|current| {
                    (candidate.created_at, candidate.reservation_id)
                        > (current.created_at, current.reservation_id)
                });
                if newer {
                    latest = Some(candidate.clone());
                }
            }
        }

        let Some(reservation) = latest else {
            return Ok(None);
        };
        let vehicle = self.catalog.get_vehicle(reservation.vehicle_id).await?.ok_or_else(|| {
            BookingError::DependencyFailure(format!(
                "vehicle {} missing from catalog",
                reservation.vehicle_id
            ))
        })?;

        Ok(Some(LatestReservation {
            reservation,
            rental_rate: vehicle.rental_rate,
        }))
    }

    async fn is_available(&self, vehicle_id: VehicleId, window: &TimeWindow) -> Result<bool> {
        match self.existing_slot(vehicle_id)? {
            Some(slot) => Ok(availability::is_available(slot.lock().await.iter(), window)),
            None => Ok(true),
        }
    }

    async fn reservations_for_vehicle(&self, vehicle_id: VehicleId) -> Result<Vec<Reservation>> {
        let Some(slot) = self.existing_slot(vehicle_id)? else {
            return Ok(Vec::new());
        };
        let mut snapshot = slot.lock().await.clone();
        snapshot.sort_by_key(|r| (r.start_time, r.reservation_id));
        Ok(snapshot)
    }

    async fn reservations_for_user(&self, user_id: UserId) -> Result<Vec<Reservation>> {
        let mut history = Vec::new();
        for slot in self.all_slots()? {
            history.extend(slot.lock().await.iter().filter(|r| r.user_id == user_id).cloned());
        }
        history.sort_by_key(|r| std::cmp::Reverse((r.created_at, r.reservation_id)));
        Ok(history)
    }

    async fn cancel(&self, reservation_id: ReservationId, user_id: UserId) -> Result<Reservation> {
        let cancelled = self
            .transition(reservation_id, |reservation| {
                if reservation.user_id != user_id {
                    return Err(BookingError::NotFound(format!("reservation {reservation_id}")));
                }
                match reservation.status {
                    ReservationStatus::Active => {
                        reservation.status = ReservationStatus::Cancelled;
                        Ok(true)
                    },
                    ReservationStatus::Cancelled => Ok(false),
                    ReservationStatus::Completed => Err(BookingError::Validation(format!(
                        "reservation {reservation_id} is already completed"
                    ))),
                }
            })
            .await?;

        tracing::info!(reservation_id = %reservation_id, user_id = %user_id, "Reservation cancelled");
        Ok(cancelled)
    }

    async fn complete(&self, reservation_id: ReservationId) -> Result<Reservation> {
        let completed = self
            .transition(reservation_id, |reservation| {
                if reservation.status != ReservationStatus::Active {
                    return Err(BookingError::Validation(format!(
                        "reservation {reservation_id} is {}",
                        reservation.status
                    )));
                }
                reservation.status = ReservationStatus::Completed;
                Ok(true)
            })
            .await?;

        tracing::info!(reservation_id = %reservation_id, "Reservation completed");
        Ok(completed)
    }
}
