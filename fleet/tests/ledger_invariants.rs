//! Property tests for the reservation ledger.

use car_rental_core::environment::SystemClock;
use car_rental_core::{BookingError, ReservationId, TimeWindow, UserId, VehicleId, availability};
use car_rental_fleet::{InMemoryReservationLedger, InMemoryVehicleCatalog, ReservationLedger};
use car_rental_testing::fixtures::{booking, vehicle};
use car_rental_testing::properties::bookable_window_strategy;
use proptest::prelude::*;
use std::sync::Arc;

#[derive(Debug, Clone)]
enum Op {
    Book { vehicle: i64, user: i64, window: TimeWindow },
    Cancel { nth: usize },
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (1i64..=3, 1i64..=5, bookable_window_strategy())
            .prop_map(|(vehicle, user, window)| Op::Book { vehicle, user, window }),
        1 => (0usize..16).prop_map(|nth| Op::Cancel { nth }),
    ]
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap()
}

proptest! {
    #[test]
    fn active_reservations_never_overlap(ops in prop::collection::vec(op_strategy(), 1..40)) {
        runtime().block_on(async {
            let catalog = Arc::new(InMemoryVehicleCatalog::new((1..=3).map(vehicle)));
            let ledger = InMemoryReservationLedger::new(catalog, Arc::new(SystemClock));
            let mut committed: Vec<(ReservationId, UserId)> = Vec::new();

            for op in ops {
                match op {
                    Op::Book { vehicle, user, window } => {
                        let vehicle_id = VehicleId::new(vehicle);
                        let before = ledger.reservations_for_vehicle(vehicle_id).await.unwrap();
                        let expected_free = availability::is_available(&before, &window);

                        match ledger.check_and_commit(booking(vehicle, user, window)).await {
                            Ok(reservation) => {
                                prop_assert!(expected_free);
                                committed.push((reservation.reservation_id, reservation.user_id));
                            },
                            Err(BookingError::Conflict { .. }) => {
                                prop_assert!(!expected_free);
                                let after = ledger.reservations_for_vehicle(vehicle_id).await.unwrap();
                                prop_assert_eq!(before, after);
                            },
                            Err(other) => return Err(TestCaseError::fail(format!("unexpected error {other}"))),
                        }
                    },
                    Op::Cancel { nth } => {
                        if let Some((id, user)) = committed.get(nth).copied() {
                            ledger.cancel(id, user).await.unwrap();
                        }
                    },
                }
            }

            for v in 1..=3 {
                let active: Vec<_> = ledger
                    .reservations_for_vehicle(VehicleId::new(v))
                    .await
                    .unwrap()
                    .into_iter()
                    .filter(|r| r.is_active())
                    .collect();
                for (i, a) in active.iter().enumerate() {
                    for b in &active[i + 1..] {
                        prop_assert!(!a.window().overlaps(&b.window()), "{a:?} overlaps {b:?}");
                    }
                }
            }
            Ok(())
        })?;
    }

    #[test]
    fn out_of_bounds_durations_are_rejected(extra_minutes in 1i64..600) {
        runtime().block_on(async {
            let catalog = Arc::new(InMemoryVehicleCatalog::new([vehicle(1)]));
            let ledger = InMemoryReservationLedger::new(catalog, Arc::new(SystemClock));
            let start = car_rental_testing::fixtures::at(0, 0);

            let too_long = TimeWindow::new(start, start + chrono::Duration::hours(72) + chrono::Duration::minutes(extra_minutes)).unwrap();
            let short_minutes = 60 - (extra_minutes % 60).max(1);
            let too_short = TimeWindow::new(start, start + chrono::Duration::minutes(short_minutes)).unwrap();

            for window in [too_long, too_short] {
                let result = ledger.check_and_commit(booking(1, 1, window)).await;
                prop_assert!(matches!(result, Err(BookingError::Validation(_))));
            }
            prop_assert!(ledger.reservations_for_vehicle(VehicleId::new(1)).await.unwrap().is_empty());
            Ok(())
        })?;
    }
}
