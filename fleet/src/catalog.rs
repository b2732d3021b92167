//! Vehicle catalog.
//!
//! The catalog is read-only from the booking path apart from status flips
//! performed by a ledger while it holds the vehicle's guard.

use async_trait::async_trait;
use car_rental_core::{BookingError, Result, Vehicle, VehicleId, VehicleStatus};
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

/// Vehicle catalog.
#[async_trait]
pub trait VehicleCatalog: Send + Sync {
    /// Vehicles whose status is `Available`, ordered by id.
    ///
    /// # Errors
    ///
    /// Returns `DependencyFailure` if the backing store fails.
    async fn list_available(&self) -> Result<Vec<Vehicle>>;

    /// One vehicle, if it exists.
    ///
    /// # Errors
    ///
    /// Returns `DependencyFailure` if the backing store fails.
    async fn get_vehicle(&self, vehicle_id: VehicleId) -> Result<Option<Vehicle>>;

    /// Overwrite a vehicle's status.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown vehicle, or `DependencyFailure`.
    async fn set_status(&self, vehicle_id: VehicleId, status: VehicleStatus) -> Result<()>;
}

/// In-memory catalog.
#[derive(Debug, Clone, Default)]
pub struct InMemoryVehicleCatalog {
    vehicles: Arc<RwLock<BTreeMap<VehicleId, Vehicle>>>,
}

fn poisoned<T>(_: T) -> BookingError {
    BookingError::DependencyFailure("vehicle catalog lock poisoned".to_string())
}

impl InMemoryVehicleCatalog {
    /// Create a catalog holding `vehicles`.
    #[must_use]
    pub fn new(vehicles: impl IntoIterator<Item = Vehicle>) -> Self {
        let vehicles = vehicles.into_iter().map(|v| (v.vehicle_id, v)).collect();
        Self {
            vehicles: Arc::new(RwLock::new(vehicles)),
        }
    }

    /// Add or replace a vehicle.
    ///
    /// # Errors
    ///
    /// Returns `DependencyFailure` if the lock is poisoned.
    pub fn upsert(&self, vehicle: Vehicle) -> Result<()> {
        self.vehicles
            .write()
            .map_err(poisoned)?
            .insert(vehicle.vehicle_id, vehicle);
        Ok(())
    }

    /// Change a vehicle's hourly rate.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown vehicle.
    pub fn set_rate(&self, vehicle_id: VehicleId, rental_rate: f64) -> Result<()> {
        let mut vehicles = self.vehicles.write().map_err(poisoned)?;
        let vehicle = vehicles
            .get_mut(&vehicle_id)
            .ok_or_else(|| BookingError::NotFound(format!("vehicle {vehicle_id}")))?;
        vehicle.rental_rate = rental_rate;
        Ok(())
    }
}

#[async_trait]
impl VehicleCatalog for InMemoryVehicleCatalog {
    async fn list_available(&self) -> Result<Vec<Vehicle>> {
        Ok(self
            .vehicles
            .read()
            .map_err(poisoned)?
            .values()
            .filter(|v| v.status == VehicleStatus::Available)
            .cloned()
            .collect())
    }

    async fn get_vehicle(&self, vehicle_id: VehicleId) -> Result<Option<Vehicle>> {
        Ok(self.vehicles.read().map_err(poisoned)?.get(&vehicle_id).cloned())
    }

    async fn set_status(&self, vehicle_id: VehicleId, status: VehicleStatus) -> Result<()> {
        let mut vehicles = self.vehicles.write().map_err(poisoned)?;
        let vehicle = vehicles
            .get_mut(&vehicle_id)
            .ok_or_else(|| BookingError::NotFound(format!("vehicle {vehicle_id}")))?;
        vehicle.status = status;
        Ok(())
    }
}

/// Seed fleet for development runs without a database.
#[must_use]
pub fn demo_fleet() -> Vec<Vehicle> {
    let vehicle = |id: i64, plate: &str, model: &str, rate: f64, charge: i32, location: &str, kwh: Option<f64>| Vehicle {
        vehicle_id: VehicleId::new(id),
        license_plate: plate.to_string(),
        model: model.to_string(),
        status: VehicleStatus::Available,
        rental_rate: rate,
        charge_level: charge,
        mileage: 12_000 + id * 1_500,
        location: location.to_string(),
        battery_capacity_kwh: kwh,
        cleanliness: "Clean".to_string(),
    };

    vec![
        vehicle(1, "SGX1234A", "Tesla Model 3", 25.0, 90, "Downtown", Some(60.0)),
        vehicle(2, "SGX2345B", "Nissan Leaf", 15.0, 80, "Airport", Some(40.0)),
        vehicle(3, "SGX3456C", "BMW i3", 20.0, 75, "Harbourfront", Some(42.2)),
        vehicle(4, "SGX4567D", "Hyundai Kona Electric", 18.0, 100, "Downtown", Some(64.0)),
        vehicle(5, "SGX5678E", "Toyota Corolla", 12.0, 100, "Airport", None),
    ]
}
