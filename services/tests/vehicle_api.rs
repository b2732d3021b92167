//! Vehicle service routes over in-memory stores and a local identity relay.

mod common;

use axum::Router;
use axum::http::StatusCode;
use car_rental_core::environment::SystemClock;
use car_rental_core::{LatestReservation, Reservation, ReservationStatus, Vehicle};
use car_rental_fleet::{
    BookingEnvironment, BookingOrchestrator, BookingReceipt, InMemoryReservationLedger,
    InMemoryVehicleCatalog, LocalIdentityRelay, VehicleCatalog, demo_fleet,
};
use car_rental_services::identity::LoginResponse;
use car_rental_services::vehicles::{self, AvailabilityResponse, VehicleState};
use car_rental_web::ErrorResponse;
use common::{alice, get, identity_service, json_body, json_request, send, with_cookie};
use serde_json::{Value, json};
use std::sync::Arc;

struct Harness {
    app: Router,
    identity: Router,
}

impl Harness {
    fn new() -> Self {
        let service = identity_service();
        let catalog: Arc<dyn VehicleCatalog> = Arc::new(InMemoryVehicleCatalog::new(demo_fleet()));
        let ledger = Arc::new(InMemoryReservationLedger::new(Arc::clone(&catalog), Arc::new(SystemClock)));
        let relay = Arc::new(LocalIdentityRelay::new(service.sessions().clone()));
        let orchestrator = BookingOrchestrator::new(BookingEnvironment::new(relay, ledger));

        Self {
            app: vehicles::router(VehicleState { orchestrator, catalog }),
            identity: car_rental_services::identity::router(
                car_rental_services::identity::IdentityState { service },
            ),
        }
    }

    /// Register and log in a user, returning their session.
    async fn login(&self, email: &str, phone: &str) -> LoginResponse {
        let mut user = alice();
        user["email"] = json!(email);
        user["phone_no"] = json!(phone);
        let response = send(&self.identity, json_request("POST", "/users", &user)).await;
        assert_eq!(response.status(), StatusCode::CREATED);

        let response = send(
            &self.identity,
            json_request("POST", "/sessions", &json!({ "email": email, "password": "correct horse" })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::CREATED);
        json_body(response).await
    }

    async fn book(&self, token: Option<&str>, body: &Value) -> axum::http::Response<axum::body::Body> {
        let request = json_request("POST", "/reservations", body);
        let request = match token {
            Some(token) => with_cookie(request, token),
            None => request,
        };
        send(&self.app, request).await
    }
}

fn booking(vehicle_id: i64, start: &str, end: &str) -> Value {
    json!({
        "vehicle_id": vehicle_id,
        "start_time": start,
        "end_time": end,
        "expected_charge_level": 80
    })
}

#[tokio::test]
async fn test_booking_returns_receipt() {
    let harness = Harness::new();
    let session = harness.login("alice@example.com", "91234567").await;

    let response = harness
        .book(
            Some(&session.session_token),
            &booking(1, "2030-06-01T10:00:00Z", "2030-06-01T14:00:00Z"),
        )
        .await;

    assert_eq!(response.status(), StatusCode::CREATED);
    let receipt: BookingReceipt = json_body(response).await;
    assert_eq!(receipt.user_id, session.user_id);
    assert_eq!(receipt.reservation.user_id, session.user_id);
    assert_eq!(receipt.reservation.vehicle_id.get(), 1);
    assert_eq!(receipt.reservation.status, ReservationStatus::Active);
}

#[tokio::test]
async fn test_overlapping_booking_conflicts_and_adjacent_succeeds() {
    let harness = Harness::new();
    let alice = harness.login("alice@example.com", "91234567").await;
    let bob = harness.login("bob@example.com", "98765432").await;

    let first = harness
        .book(
            Some(&alice.session_token),
            &booking(2, "2030-06-01T10:00:00Z", "2030-06-01T14:00:00Z"),
        )
        .await;
    assert_eq!(first.status(), StatusCode::CREATED);

    let overlapping = harness
        .book(
            Some(&bob.session_token),
            &booking(2, "2030-06-01T13:00:00Z", "2030-06-01T16:00:00Z"),
        )
        .await;
    assert_eq!(overlapping.status(), StatusCode::CONFLICT);
    let error: ErrorResponse = json_body(overlapping).await;
    assert_eq!(error.code, "CONFLICT");

    let adjacent = harness
        .book(
            Some(&bob.session_token),
            &booking(2, "2030-06-01T14:00:00Z", "2030-06-01T16:00:00Z"),
        )
        .await;
    assert_eq!(adjacent.status(), StatusCode::CREATED);
}

#[tokio::test]
async fn test_booking_without_session_is_unauthenticated() {
    let harness = Harness::new();
    let body = booking(1, "2030-06-01T10:00:00Z", "2030-06-01T14:00:00Z");

    assert_eq!(harness.book(None, &body).await.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(harness.book(Some("not-a-session"), &body).await.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_invalid_bookings_are_rejected() {
    let harness = Harness::new();
    let session = harness.login("alice@example.com", "91234567").await;
    let token = Some(session.session_token.as_str());

    let cases = [
        json!({ "start_time": "2030-06-01T10:00:00Z", "end_time": "2030-06-01T14:00:00Z", "expected_charge_level": 80 }),
        booking(1, "2030-06-01T14:00:00Z", "2030-06-01T10:00:00Z"),
        booking(1, "2030-06-01T10:00:00Z", "2030-06-01T10:30:00Z"),
        booking(1, "2030-06-01T10:00:00Z", "2030-06-05T10:00:00Z"),
        booking(99, "2030-06-01T10:00:00Z", "2030-06-01T14:00:00Z"),
        json!({ "vehicle_id": 1, "start_time": "2030-06-01T10:00:00Z", "end_time": "2030-06-01T14:00:00Z", "expected_charge_level": 101 }),
    ];

    for body in cases {
        let response = harness.book(token, &body).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "body: {body}");
        let error: ErrorResponse = json_body(response).await;
        assert_eq!(error.code, "VALIDATION_ERROR");
    }
}

#[tokio::test]
async fn test_malformed_json_is_validation_error() {
    let harness = Harness::new();
    let request = axum::http::Request::builder()
        .method("POST")
        .uri("/reservations")
        .header("content-type", "application/json")
        .body(axum::body::Body::from("{not json"))
        .unwrap();

    let response = send(&harness.app, request).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_latest_reservation_by_session_and_by_user_id() {
    let harness = Harness::new();
    let session = harness.login("alice@example.com", "91234567").await;

    let response = send(&harness.app, with_cookie(get("/reservations/latest"), &session.session_token)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    for (start, end) in [
        ("2030-06-01T10:00:00Z", "2030-06-01T12:00:00Z"),
        ("2030-06-02T10:00:00Z", "2030-06-02T12:00:00Z"),
    ] {
        let response = harness.book(Some(&session.session_token), &booking(3, start, end)).await;
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    let response = send(&harness.app, with_cookie(get("/reservations/latest"), &session.session_token)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let latest: LatestReservation = json_body(response).await;
    assert_eq!(latest.reservation.start_time.to_rfc3339(), "2030-06-02T10:00:00+00:00");
    assert!((latest.rental_rate - 20.0).abs() < f64::EPSILON);

    let uri = format!("/reservations/latest?user_id={}", session.user_id);
    let response = send(&harness.app, get(&uri)).await;
    assert_eq!(response.status(), StatusCode::OK);

    assert_eq!(
        send(&harness.app, get("/reservations/latest?user_id=0")).await.status(),
        StatusCode::BAD_REQUEST
    );
    assert_eq!(
        send(&harness.app, get("/reservations/latest")).await.status(),
        StatusCode::UNAUTHORIZED
    );
}

#[tokio::test]
async fn test_cancel_frees_window_for_owner_only() {
    let harness = Harness::new();
    let alice = harness.login("alice@example.com", "91234567").await;
    let bob = harness.login("bob@example.com", "98765432").await;
    let body = booking(4, "2030-06-01T10:00:00Z", "2030-06-01T14:00:00Z");

    let receipt: BookingReceipt = json_body(harness.book(Some(&alice.session_token), &body).await).await;
    let uri = format!("/reservations/{}/cancel", receipt.reservation.reservation_id);

    let response = send(&harness.app, with_cookie(json_request("POST", &uri, &json!({})), &bob.session_token)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = send(&harness.app, with_cookie(json_request("POST", &uri, &json!({})), &alice.session_token)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let cancelled: Reservation = json_body(response).await;
    assert_eq!(cancelled.status, ReservationStatus::Cancelled);

    assert_eq!(harness.book(Some(&bob.session_token), &body).await.status(), StatusCode::CREATED);
}

#[tokio::test]
async fn test_rental_records_list_only_the_callers_reservations() {
    let harness = Harness::new();
    let alice = harness.login("alice@example.com", "91234567").await;
    let bob = harness.login("bob@example.com", "98765432").await;

    for (vehicle_id, token) in [(1, &alice.session_token), (2, &bob.session_token), (3, &alice.session_token)] {
        let response = harness
            .book(Some(token), &booking(vehicle_id, "2030-06-01T10:00:00Z", "2030-06-01T14:00:00Z"))
            .await;
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    let response = send(&harness.app, with_cookie(get("/rental-records"), &alice.session_token)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let records: Vec<Reservation> = json_body(response).await;

    assert_eq!(records.len(), 2);
    assert!(records.iter().all(|r| r.user_id == alice.user_id));
    assert_eq!(records[0].vehicle_id.get(), 3);

    assert_eq!(send(&harness.app, get("/rental-records")).await.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_vehicle_catalog_routes() {
    let harness = Harness::new();

    let response = send(&harness.app, get("/vehicles/available")).await;
    assert_eq!(response.status(), StatusCode::OK);
    let vehicles: Vec<Vehicle> = json_body(response).await;
    assert_eq!(vehicles.len(), demo_fleet().len());

    let response = send(&harness.app, get("/vehicles/2")).await;
    assert_eq!(response.status(), StatusCode::OK);
    let vehicle: Vehicle = json_body(response).await;
    assert_eq!(vehicle.model, "Nissan Leaf");

    assert_eq!(send(&harness.app, get("/vehicles/99")).await.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_booked_vehicle_leaves_available_list() {
    let harness = Harness::new();
    let session = harness.login("alice@example.com", "91234567").await;
    harness
        .book(
            Some(&session.session_token),
            &booking(5, "2030-06-01T10:00:00Z", "2030-06-01T14:00:00Z"),
        )
        .await;

    let vehicles: Vec<Vehicle> = json_body(send(&harness.app, get("/vehicles/available")).await).await;

    assert!(vehicles.iter().all(|v| v.vehicle_id.get() != 5));
}

#[tokio::test]
async fn test_availability_check() {
    let harness = Harness::new();
    let session = harness.login("alice@example.com", "91234567").await;
    harness
        .book(
            Some(&session.session_token),
            &booking(1, "2030-06-01T10:00:00Z", "2030-06-01T14:00:00Z"),
        )
        .await;

    let check = |start: &str, end: &str| {
        get(&format!("/vehicles/1/availability?start_time={start}&end_time={end}"))
    };

    let busy: AvailabilityResponse =
        json_body(send(&harness.app, check("2030-06-01T12:00:00Z", "2030-06-01T15:00:00Z")).await).await;
    assert!(!busy.available);

    let free: AvailabilityResponse =
        json_body(send(&harness.app, check("2030-06-01T14:00:00Z", "2030-06-01T15:00:00Z")).await).await;
    assert!(free.available);

    let inverted = send(&harness.app, check("2030-06-01T15:00:00Z", "2030-06-01T14:00:00Z")).await;
    assert_eq!(inverted.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_health() {
    let harness = Harness::new();
    let response = send(&harness.app, get("/health")).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = json_body(response).await;
    assert_eq!(body["service"], "vehicle-service");
}
