//! # Car Rental Testing
//!
//! Testing utilities shared by the car rental crates.
//!
//! This crate provides:
//! - Deterministic [`Clock`] implementations
//! - Fixture builders for vehicles, windows, and bookings
//! - Property-based testing strategies for time windows
//!
//! ## Example
//!
//! ```
//! use car_rental_testing::{fixtures, test_clock};
//! use car_rental_core::environment::Clock;
//!
//! let clock = test_clock();
//! let window = fixtures::window(10, 12);
//! assert!(window.start() > clock.now());
//! ```

use car_rental_core::environment::Clock;
use chrono::{DateTime, Utc};

/// Mock implementations of Environment traits.
pub mod mocks {
    use super::{Clock, DateTime, Utc};
    use chrono::Duration;
    use std::sync::{Arc, Mutex};

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use car_rental_testing::mocks::FixedClock;
    /// use car_rental_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// assert_eq!(clock.now(), clock.now());
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Clock that only moves when a test advances it.
    ///
    /// Clones share the same instant, so a test can hand one clone to a
    /// provider and keep another to step time forward.
    #[derive(Debug, Clone)]
    pub struct ManualClock {
        time: Arc<Mutex<DateTime<Utc>>>,
    }

    impl ManualClock {
        /// Start the clock at `time`
        #[must_use]
        pub fn new(time: DateTime<Utc>) -> Self {
            Self {
                time: Arc::new(Mutex::new(time)),
            }
        }

        /// Move the clock forward by `by`
        pub fn advance(&self, by: Duration) {
            let mut time = self.time.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
            *time += by;
        }

        /// Jump to an absolute instant
        pub fn set(&self, to: DateTime<Utc>) {
            let mut time = self.time.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
            *time = to;
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> DateTime<Utc> {
            *self.time.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
        }
    }

    /// The instant every test clock starts at (2025-01-01 00:00:00 UTC)
    #[must_use]
    pub fn epoch() -> DateTime<Utc> {
        DateTime::<Utc>::UNIX_EPOCH + Duration::days(20_089)
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    #[must_use]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(epoch())
    }

    /// Create a manual clock starting at 2025-01-01 00:00:00 UTC
    #[must_use]
    pub fn manual_clock() -> ManualClock {
        ManualClock::new(epoch())
    }
}

/// Fixture builders for domain records.
pub mod fixtures {
    use super::mocks::epoch;
    use car_rental_core::{
        NewReservation, TimeWindow, UserId, Vehicle, VehicleId, VehicleStatus,
    };
    use chrono::{DateTime, Duration, Utc};

    /// An instant on 2025-01-02 at `hour:minute` UTC.
    ///
    /// Hours past 23 roll over into following days, so `at(30, 0)` is
    /// 06:00 on 2025-01-03.
    #[must_use]
    pub fn at(hour: i64, minute: i64) -> DateTime<Utc> {
        epoch() + Duration::days(1) + Duration::hours(hour) + Duration::minutes(minute)
    }

    /// Window between two whole hours of the fixture day
    ///
    /// # Panics
    ///
    /// Panics if `end_hour <= start_hour`.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn window(start_hour: i64, end_hour: i64) -> TimeWindow {
        TimeWindow::new(at(start_hour, 0), at(end_hour, 0)).expect("fixture window must be non-empty")
    }

    /// Booking of `vehicle` by `user` over `window` with a full-charge expectation
    #[must_use]
    pub fn booking(vehicle: i64, user: i64, window: TimeWindow) -> NewReservation {
        NewReservation {
            vehicle_id: VehicleId::new(vehicle),
            user_id: UserId::new(user),
            window,
            expected_charge_level: 80,
        }
    }

    /// Builder for [`Vehicle`] fixtures.
    #[derive(Debug, Clone)]
    pub struct VehicleBuilder {
        vehicle: Vehicle,
    }

    impl VehicleBuilder {
        /// An available vehicle at 10.00 per hour
        #[must_use]
        pub fn new(id: i64) -> Self {
            Self {
                vehicle: Vehicle {
                    vehicle_id: VehicleId::new(id),
                    license_plate: format!("TEST-{id:03}"),
                    model: "Test Model".to_string(),
                    status: VehicleStatus::Available,
                    rental_rate: 10.0,
                    charge_level: 100,
                    mileage: 1_000,
                    location: "Depot".to_string(),
                    battery_capacity_kwh: Some(60.0),
                    cleanliness: "Clean".to_string(),
                },
            }
        }

        /// Override the hourly rate
        #[must_use]
        pub const fn rate(mut self, rate: f64) -> Self {
            self.vehicle.rental_rate = rate;
            self
        }

        /// Override the status
        #[must_use]
        pub const fn status(mut self, status: VehicleStatus) -> Self {
            self.vehicle.status = status;
            self
        }

        /// Override the model name
        #[must_use]
        pub fn model(mut self, model: &str) -> Self {
            self.vehicle.model = model.to_string();
            self
        }

        /// Finish the fixture
        #[must_use]
        pub fn build(self) -> Vehicle {
            self.vehicle
        }
    }

    /// Shorthand for `VehicleBuilder::new(id).build()`
    #[must_use]
    pub fn vehicle(id: i64) -> Vehicle {
        VehicleBuilder::new(id).build()
    }
}

/// Property-based testing strategies using proptest.
pub mod properties {
    use super::fixtures::at;
    use car_rental_core::TimeWindow;
    use chrono::Duration;
    use proptest::prelude::*;

    /// Windows inside a three-day horizon, at 15 minute granularity, lasting
    /// between 15 minutes and 12 hours.
    pub fn window_strategy() -> impl Strategy<Value = TimeWindow> {
        (0i64..288, 1i64..=48).prop_filter_map("non-empty window", |(slot, len)| {
            let start = at(0, 0) + Duration::minutes(slot * 15);
            TimeWindow::new(start, start + Duration::minutes(len * 15)).ok()
        })
    }

    /// Windows that satisfy the booking duration bounds (1h to 72h).
    pub fn bookable_window_strategy() -> impl Strategy<Value = TimeWindow> {
        (0i64..96, 4i64..=288).prop_filter_map("bookable window", |(slot, len)| {
            let start = at(0, 0) + Duration::minutes(slot * 15);
            TimeWindow::new(start, start + Duration::minutes(len * 15)).ok()
        })
    }
}

// Re-export commonly used items
pub use mocks::{FixedClock, ManualClock, manual_clock, test_clock};
