//! PostgreSQL vehicle catalog and reservation ledger.
//!
//! `check_and_commit` runs in one transaction that locks the vehicle row
//! with `SELECT ... FOR UPDATE`, so concurrent bookings of one vehicle
//! serialize on that row while other vehicles are unaffected. The
//! `reservations_no_overlap` exclusion constraint backs the check up; a
//! violation (SQLSTATE `23P01`) is reported as a conflict.
//!
//! # Example
//!
//! ```no_run
//! use car_rental_fleet::ledger::{PostgresReservationLedger, PostgresVehicleCatalog};
//! use sqlx::PgPool;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let pool = PgPool::connect("postgresql://localhost/car_rental").await?;
//! let ledger = PostgresReservationLedger::new(pool.clone());
//! ledger.migrate().await?;
//! let catalog = PostgresVehicleCatalog::new(pool);
//! # Ok(())
//! # }
//! ```

use super::ReservationLedger;
use crate::catalog::VehicleCatalog;
use async_trait::async_trait;
use car_rental_core::{
    BookingError, LatestReservation, NewReservation, Reservation, ReservationId,
    ReservationStatus, Result, TimeWindow, UserId, Vehicle, VehicleId, VehicleStatus, validation,
};
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};

const EXCLUSION_VIOLATION: &str = "23P01";

const RESERVATION_COLUMNS: &str =
    "reservation_id, vehicle_id, user_id, start_time, end_time, expected_charge_level, status, created_at";

const VEHICLE_COLUMNS: &str = "vehicle_id, license_plate, model, status, rental_rate, charge_level, \
     mileage, location, battery_capacity_kwh, cleanliness";

type ReservationRow = (i64, i64, i64, DateTime<Utc>, DateTime<Utc>, i32, String, DateTime<Utc>);

type VehicleRow = (i64, String, String, String, f64, i32, i64, String, Option<f64>, String);

fn db_error(action: &str, e: &sqlx::Error) -> BookingError {
    tracing::error!(error = %e, action, "Ledger database operation failed");
    BookingError::DependencyFailure(format!("failed to {action}"))
}

fn reservation_from_row(row: ReservationRow) -> Result<Reservation> {
    let (reservation_id, vehicle_id, user_id, start_time, end_time, charge, status, created_at) = row;
    let status = ReservationStatus::parse(&status).ok_or_else(|| {
        BookingError::DependencyFailure(format!("unknown reservation status {status}"))
    })?;
    Ok(Reservation {
        reservation_id: ReservationId::new(reservation_id),
        vehicle_id: VehicleId::new(vehicle_id),
        user_id: UserId::new(user_id),
        start_time,
        end_time,
        expected_charge_level: charge,
        status,
        created_at,
    })
}

fn vehicle_from_row(row: VehicleRow) -> Result<Vehicle> {
    let (vehicle_id, license_plate, model, status, rental_rate, charge_level, mileage, location, kwh, cleanliness) =
        row;
    let status = VehicleStatus::parse(&status)
        .ok_or_else(|| BookingError::DependencyFailure(format!("unknown vehicle status {status}")))?;
    Ok(Vehicle {
        vehicle_id: VehicleId::new(vehicle_id),
        license_plate,
        model,
        status,
        rental_rate,
        charge_level,
        mileage,
        location,
        battery_capacity_kwh: kwh,
        cleanliness,
    })
}

// ============================================================================
// Vehicle catalog
// ============================================================================

/// Catalog backed by the `vehicles` table.
#[derive(Clone)]
pub struct PostgresVehicleCatalog {
    pool: PgPool,
}

impl PostgresVehicleCatalog {
    /// Create a catalog over `pool`.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl VehicleCatalog for PostgresVehicleCatalog {
    async fn list_available(&self) -> Result<Vec<Vehicle>> {
        let rows: Vec<VehicleRow> = sqlx::query_as(&format!(
            "SELECT {VEHICLE_COLUMNS} FROM vehicles WHERE status = $1 ORDER BY vehicle_id"
        ))
        .bind(VehicleStatus::Available.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("list available vehicles", &e))?;

        rows.into_iter().map(vehicle_from_row).collect()
    }

    async fn get_vehicle(&self, vehicle_id: VehicleId) -> Result<Option<Vehicle>> {
        let row: Option<VehicleRow> =
            sqlx::query_as(&format!("SELECT {VEHICLE_COLUMNS} FROM vehicles WHERE vehicle_id = $1"))
                .bind(vehicle_id.get())
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| db_error("get vehicle", &e))?;

        row.map(vehicle_from_row).transpose()
    }

    async fn set_status(&self, vehicle_id: VehicleId, status: VehicleStatus) -> Result<()> {
        let result = sqlx::query("UPDATE vehicles SET status = $2 WHERE vehicle_id = $1")
            .bind(vehicle_id.get())
            .bind(status.as_str())
            .execute(&self.pool)
            .await
            .map_err(|e| db_error("update vehicle status", &e))?;

        if result.rows_affected() == 0 {
            return Err(BookingError::NotFound(format!("vehicle {vehicle_id}")));
        }
        Ok(())
    }
}

// ============================================================================
// Reservation ledger
// ============================================================================

/// Ledger backed by the `reservations` table.
#[derive(Clone)]
pub struct PostgresReservationLedger {
    pool: PgPool,
}

impl PostgresReservationLedger {
    /// Create a ledger over `pool`.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Run database migrations.
    ///
    /// # Errors
    ///
    /// Returns `DependencyFailure` if migrations fail.
    pub async fn migrate(&self) -> Result<()> {
        let mut migrator = sqlx::migrate!("./migrations");
        // The identity schema shares the migrations table.
        migrator.set_ignore_missing(true);
        migrator.run(&self.pool).await.map_err(|e| {
            BookingError::DependencyFailure(format!("migration failed: {e}"))
        })?;
        Ok(())
    }

    /// Mark the vehicle available again when it has no active reservation left.
    async fn release_if_idle(tx: &mut Transaction<'_, Postgres>, vehicle_id: i64) -> Result<()> {
        sqlx::query(
            r"
            UPDATE vehicles SET status = 'Available'
            WHERE vehicle_id = $1
              AND status = 'Reserved'
              AND NOT EXISTS (
                  SELECT 1 FROM reservations WHERE vehicle_id = $1 AND status = 'Active'
              )
            ",
        )
        .bind(vehicle_id)
        .execute(&mut **tx)
        .await
        .map_err(|e| db_error("release vehicle", &e))?;
        Ok(())
    }

    /// Lock a reservation row, let `decide` pick the new status, and write it.
    ///
    /// Locks are taken vehicle first, then reservation, the same order
    /// `check_and_commit` uses, so a cancel and a booking of one vehicle
    /// serialize instead of deadlocking.
    async fn transition<F>(&self, reservation_id: ReservationId, decide: F) -> Result<Reservation>
    where
        F: FnOnce(&Reservation) -> Result<Option<ReservationStatus>> + Send,
    {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| db_error("start transaction", &e))?;

        // A reservation never moves between vehicles, so the unlocked lookup is stable.
        let vehicle: Option<(i64,)> = sqlx::query_as(
            r"
            SELECT vehicle_id FROM vehicles
            WHERE vehicle_id = (SELECT vehicle_id FROM reservations WHERE reservation_id = $1)
            FOR UPDATE
            ",
        )
        .bind(reservation_id.get())
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| db_error("lock vehicle", &e))?;

        if vehicle.is_none() {
            let _ = tx.rollback().await;
            return Err(BookingError::NotFound(format!("reservation {reservation_id}")));
        }

        let row: Option<ReservationRow> = sqlx::query_as(&format!(
            "SELECT {RESERVATION_COLUMNS} FROM reservations WHERE reservation_id = $1 FOR UPDATE"
        ))
        .bind(reservation_id.get())
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| db_error("lock reservation", &e))?;

        let Some(row) = row else {
            let _ = tx.rollback().await;
            return Err(BookingError::NotFound(format!("reservation {reservation_id}")));
        };
        let mut reservation = reservation_from_row(row)?;

        let next = match decide(&reservation) {
            Ok(next) => next,
            Err(e) => {
                let _ = tx.rollback().await;
                return Err(e);
            },
        };

        if let Some(status) = next {
            sqlx::query("UPDATE reservations SET status = $2 WHERE reservation_id = $1")
                .bind(reservation_id.get())
                .bind(status.as_str())
                .execute(&mut *tx)
                .await
                .map_err(|e| db_error("update reservation status", &e))?;
            reservation.status = status;
            Self::release_if_idle(&mut tx, reservation.vehicle_id.get()).await?;
        }

        tx.commit().await.map_err(|e| db_error("commit transaction", &e))?;
        Ok(reservation)
    }
}

#[async_trait]
impl ReservationLedger for PostgresReservationLedger {
    async fn check_and_commit(&self, booking: NewReservation) -> Result<Reservation> {
        let booking = validation::validate_new_reservation(
            booking.vehicle_id,
            booking.user_id,
            booking.window,
            booking.expected_charge_level,
        )?;
        let vehicle_id = booking.vehicle_id;

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| db_error("start transaction", &e))?;

        // Step 1: lock the vehicle row; concurrent bookings of it wait here.
        let status: Option<(String,)> =
            sqlx::query_as("SELECT status FROM vehicles WHERE vehicle_id = $1 FOR UPDATE")
                .bind(vehicle_id.get())
                .fetch_optional(&mut *tx)
                .await
                .map_err(|e| db_error("lock vehicle", &e))?;

        let Some((status,)) = status else {
            let _ = tx.rollback().await;
            return Err(BookingError::Validation(format!("vehicle {vehicle_id} does not exist")));
        };
        if VehicleStatus::parse(&status) == Some(VehicleStatus::Maintenance) {
            let _ = tx.rollback().await;
            tracing::warn!(vehicle_id = %vehicle_id, "Booking rejected: vehicle in maintenance");
            return Err(BookingError::Conflict { vehicle_id });
        }

        // Step 2: overlap check against active reservations.
        let (overlapping,): (bool,) = sqlx::query_as(
            r"
            SELECT EXISTS (
                SELECT 1 FROM reservations
                WHERE vehicle_id = $1
                  AND status = 'Active'
                  AND start_time < $3
                  AND end_time > $2
            )
            ",
        )
        .bind(vehicle_id.get())
        .bind(booking.window.start())
        .bind(booking.window.end())
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| db_error("check overlap", &e))?;

        if overlapping {
            let _ = tx.rollback().await;
            tracing::warn!(vehicle_id = %vehicle_id, "Booking rejected: window overlaps active reservation");
            return Err(BookingError::Conflict { vehicle_id });
        }

        // Step 3: insert and flip the vehicle status.
        let row: ReservationRow = sqlx::query_as(&format!(
            r"
            INSERT INTO reservations (vehicle_id, user_id, start_time, end_time, expected_charge_level, status)
            VALUES ($1, $2, $3, $4, $5, 'Active')
            RETURNING {RESERVATION_COLUMNS}
            "
        ))
        .bind(vehicle_id.get())
        .bind(booking.user_id.get())
        .bind(booking.window.start())
        .bind(booking.window.end())
        .bind(booking.expected_charge_level)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.code().as_deref() == Some(EXCLUSION_VIOLATION) {
                    tracing::warn!(vehicle_id = %vehicle_id, "Booking rejected by exclusion constraint");
                    return BookingError::Conflict { vehicle_id };
                }
            }
            db_error("insert reservation", &e)
        })?;

        sqlx::query("UPDATE vehicles SET status = 'Reserved' WHERE vehicle_id = $1 AND status <> 'Reserved'")
            .bind(vehicle_id.get())
            .execute(&mut *tx)
            .await
            .map_err(|e| db_error("reserve vehicle", &e))?;

        // Step 4: commit (releases the row lock).
        tx.commit().await.map_err(|e| db_error("commit transaction", &e))?;

        let reservation = reservation_from_row(row)?;
        tracing::info!(
            reservation_id = %reservation.reservation_id,
            vehicle_id = %vehicle_id,
            user_id = %reservation.user_id,
            "Reservation committed"
        );
        Ok(reservation)
    }

    async fn latest_for_user(&self, user_id: UserId) -> Result<Option<LatestReservation>> {
        let row: Option<(i64, i64, i64, DateTime<Utc>, DateTime<Utc>, i32, String, DateTime<Utc>, f64)> =
            sqlx::query_as(
                r"
                SELECT r.reservation_id, r.vehicle_id, r.user_id, r.start_time, r.end_time,
                       r.expected_charge_level, r.status, r.created_at, v.rental_rate
                FROM reservations r
                JOIN vehicles v ON r.vehicle_id = v.vehicle_id
                WHERE r.user_id = $1
                ORDER BY r.created_at DESC, r.reservation_id DESC
                LIMIT 1
                ",
            )
            .bind(user_id.get())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("get latest reservation", &e))?;

        row.map(|(id, vehicle, user, start, end, charge, status, created, rental_rate)| {
            Ok(LatestReservation {
                reservation: reservation_from_row((id, vehicle, user, start, end, charge, status, created))?,
                rental_rate,
            })
        })
        .transpose()
    }

    async fn is_available(&self, vehicle_id: VehicleId, window: &TimeWindow) -> Result<bool> {
        let (overlapping,): (bool,) = sqlx::query_as(
            r"
            SELECT EXISTS (
                SELECT 1 FROM reservations
                WHERE vehicle_id = $1 AND status = 'Active' AND start_time < $3 AND end_time > $2
            )
            ",
        )
        .bind(vehicle_id.get())
        .bind(window.start())
        .bind(window.end())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| db_error("check availability", &e))?;

        Ok(!overlapping)
    }

    async fn reservations_for_vehicle(&self, vehicle_id: VehicleId) -> Result<Vec<Reservation>> {
        let rows: Vec<ReservationRow> = sqlx::query_as(&format!(
            "SELECT {RESERVATION_COLUMNS} FROM reservations WHERE vehicle_id = $1 \
             ORDER BY start_time, reservation_id"
        ))
        .bind(vehicle_id.get())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("list reservations", &e))?;

        rows.into_iter().map(reservation_from_row).collect()
    }

    async fn reservations_for_user(&self, user_id: UserId) -> Result<Vec<Reservation>> {
        let rows: Vec<ReservationRow> = sqlx::query_as(&format!(
            "SELECT {RESERVATION_COLUMNS} FROM reservations WHERE user_id = $1 \
             ORDER BY created_at DESC, reservation_id DESC"
        ))
        .bind(user_id.get())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("list rental history", &e))?;

        rows.into_iter().map(reservation_from_row).collect()
    }

    async fn cancel(&self, reservation_id: ReservationId, user_id: UserId) -> Result<Reservation> {
        let cancelled = self
            .transition(reservation_id, |reservation| {
                if reservation.user_id != user_id {
                    return Err(BookingError::NotFound(format!("reservation {reservation_id}")));
                }
                match reservation.status {
                    ReservationStatus::Active => Ok(Some(ReservationStatus::Cancelled)),
                    ReservationStatus::Cancelled => Ok(None),
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
            .transition(reservation_id, |reservation| match reservation.status {
                ReservationStatus::Active => Ok(Some(ReservationStatus::Completed)),
                other => Err(BookingError::Validation(format!(
                    "reservation {reservation_id} is {other}"
                ))),
            })
            .await?;

        tracing::info!(reservation_id = %reservation_id, "Reservation completed");
        Ok(completed)
    }
}
