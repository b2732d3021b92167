//! Concurrent commits against the in-memory ledger.

use car_rental_core::environment::SystemClock;
use car_rental_core::{BookingError, UserId, VehicleId};
use car_rental_fleet::{
    BookingEnvironment, BookingOrchestrator, BookingRequest, IdentityRelay,
    InMemoryReservationLedger, InMemoryVehicleCatalog, ReservationLedger,
};
use car_rental_testing::fixtures::{booking, vehicle, window};
use std::sync::Arc;

fn ledger(vehicles: i64) -> Arc<InMemoryReservationLedger> {
    let catalog = Arc::new(InMemoryVehicleCatalog::new((1..=vehicles).map(vehicle)));
    Arc::new(InMemoryReservationLedger::new(catalog, Arc::new(SystemClock)))
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_overlapping_commits_yield_exactly_one_success() {
    let ledger = ledger(1);

    let handles: Vec<_> = (0..16)
        .map(|i| {
            let ledger = Arc::clone(&ledger);
            // Every window contains 11:00-12:00, so all pairs overlap.
            let booking = booking(1, i + 1, window(10 + i % 2, 12 + i % 3));
            tokio::spawn(async move { ledger.check_and_commit(booking).await })
        })
        .collect();

    let results = futures::future::join_all(handles).await;
    let (ok, rejected): (Vec<_>, Vec<_>) = results
        .into_iter()
        .map(|joined| joined.unwrap())
        .partition(Result::is_ok);

    assert_eq!(ok.len(), 1);
    assert_eq!(rejected.len(), 15);
    assert!(rejected
        .iter()
        .all(|r| matches!(r, Err(BookingError::Conflict { vehicle_id }) if *vehicle_id == VehicleId::new(1))));

    let stored = ledger.reservations_for_vehicle(VehicleId::new(1)).await.unwrap();
    assert_eq!(stored.len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_different_vehicles_commit_independently() {
    let ledger = ledger(8);

    let handles: Vec<_> = (1..=8)
        .map(|v| {
            let ledger = Arc::clone(&ledger);
            tokio::spawn(async move { ledger.check_and_commit(booking(v, v, window(10, 12))).await })
        })
        .collect();

    for joined in futures::future::join_all(handles).await {
        assert!(joined.unwrap().is_ok());
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_adjacent_windows_commit_concurrently() {
    let ledger = ledger(1);

    let first = {
        let ledger = Arc::clone(&ledger);
        tokio::spawn(async move { ledger.check_and_commit(booking(1, 1, window(10, 12))).await })
    };
    let second = {
        let ledger = Arc::clone(&ledger);
        tokio::spawn(async move { ledger.check_and_commit(booking(1, 2, window(12, 14))).await })
    };

    assert!(first.await.unwrap().is_ok());
    assert!(second.await.unwrap().is_ok());
}

struct EchoRelay;

#[async_trait::async_trait]
impl IdentityRelay for EchoRelay {
    async fn resolve(&self, token: &str) -> car_rental_core::Result<UserId> {
        token
            .parse::<i64>()
            .map(UserId::new)
            .map_err(|_| BookingError::Unauthenticated)
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_orchestrated_bookings_one_winner() {
    let ledger = ledger(1);
    let orchestrator = Arc::new(BookingOrchestrator::new(BookingEnvironment::new(
        Arc::new(EchoRelay),
        ledger,
    )));

    let handles: Vec<_> = (1..=8)
        .map(|user| {
            let orchestrator = Arc::clone(&orchestrator);
            tokio::spawn(async move {
                let token = user.to_string();
                orchestrator
                    .book(BookingRequest::new(1, window(10, 12), 80), Some(&token))
                    .await
            })
        })
        .collect();

    let winners: Vec<_> = futures::future::join_all(handles)
        .await
        .into_iter()
        .filter_map(|joined| joined.unwrap().ok())
        .collect();

    assert_eq!(winners.len(), 1);
    assert_eq!(winners[0].reservation.user_id, winners[0].user_id);
}
