//! Vehicle service routes.
//!
//! Bookings go through [`BookingOrchestrator`]; everything else reads the
//! catalog or the ledger directly.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
};
use car_rental_core::{
    BookingError, DateTime, LatestReservation, Reservation, ReservationId, TimeWindow, UserId,
    Utc, Vehicle, VehicleId,
};
use car_rental_fleet::{BookingOrchestrator, BookingReceipt, BookingRequest, VehicleCatalog};
use car_rental_web::{
    ApiJson, AppError, CorrelationId, SessionCredential, WebResult, correlation_id_layer,
    health_routes,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Service name reported by `/health`.
pub const SERVICE_NAME: &str = "vehicle-service";

/// Shared state for the vehicle service.
#[derive(Clone)]
pub struct VehicleState {
    /// Runs bookings; also exposes the ledger and relay
    pub orchestrator: BookingOrchestrator,
    /// Vehicle catalog
    pub catalog: Arc<dyn VehicleCatalog>,
}

impl VehicleState {
    async fn caller(&self, credential: Option<&SessionCredential>) -> Result<UserId, AppError> {
        let credential = credential.ok_or(BookingError::Unauthenticated)?;
        Ok(self.orchestrator.relay().resolve(credential.as_str()).await?)
    }
}

/// `GET /reservations/latest` query.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct LatestQuery {
    /// Whose reservation; defaults to the caller
    pub user_id: Option<i64>,
}

/// `GET /vehicles/{id}/availability` query.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct WindowQuery {
    /// Inclusive start
    pub start_time: DateTime<Utc>,
    /// Exclusive end
    pub end_time: DateTime<Utc>,
}

/// `GET /vehicles/{id}/availability` response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilityResponse {
    /// Vehicle checked
    pub vehicle_id: VehicleId,
    /// Whether no active reservation overlaps the window right now
    pub available: bool,
}

/// Build the vehicle service router.
pub fn router(state: VehicleState) -> Router {
    Router::new()
        .route("/reservations", post(create_reservation))
        .route("/reservations/latest", get(latest_reservation))
        .route("/reservations/:id/cancel", post(cancel_reservation))
        .route("/rental-records", get(rental_records))
        .route("/vehicles/available", get(available_vehicles))
        .route("/vehicles/:id", get(vehicle))
        .route("/vehicles/:id/availability", get(vehicle_availability))
        .merge(health_routes(SERVICE_NAME))
        .layer(TraceLayer::new_for_http())
        .layer(correlation_id_layer())
        .with_state(state)
}

async fn create_reservation(
    State(state): State<VehicleState>,
    correlation_id: CorrelationId,
    credential: Option<SessionCredential>,
    ApiJson(request): ApiJson<BookingRequest>,
) -> WebResult<(StatusCode, Json<BookingReceipt>)> {
    tracing::debug!(correlation_id = %correlation_id.0, vehicle_id = ?request.vehicle_id, "Booking requested");

    let receipt = state
        .orchestrator
        .book(request, credential.as_ref().map(SessionCredential::as_str))
        .await?;

    Ok((StatusCode::CREATED, Json(receipt)))
}

async fn latest_reservation(
    State(state): State<VehicleState>,
    Query(query): Query<LatestQuery>,
    credential: Option<SessionCredential>,
) -> WebResult<Json<LatestReservation>> {
    let user_id = match query.user_id {
        Some(id) => {
            let user_id = UserId::new(id);
            if !user_id.is_valid() {
                return Err(AppError::validation("user_id must be positive"));
            }
            user_id
        },
        None => state.caller(credential.as_ref()).await?,
    };

    state
        .orchestrator
        .ledger()
        .latest_for_user(user_id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found(format!("no reservation for user {user_id}")))
}

async fn cancel_reservation(
    State(state): State<VehicleState>,
    Path(reservation_id): Path<i64>,
    credential: Option<SessionCredential>,
) -> WebResult<Json<Reservation>> {
    let user_id = state.caller(credential.as_ref()).await?;
    let cancelled = state
        .orchestrator
        .ledger()
        .cancel(ReservationId::new(reservation_id), user_id)
        .await?;
    Ok(Json(cancelled))
}

async fn rental_records(
    State(state): State<VehicleState>,
    credential: Option<SessionCredential>,
) -> WebResult<Json<Vec<Reservation>>> {
    let user_id = state.caller(credential.as_ref()).await?;
    Ok(Json(state.orchestrator.ledger().reservations_for_user(user_id).await?))
}

async fn available_vehicles(State(state): State<VehicleState>) -> WebResult<Json<Vec<Vehicle>>> {
    Ok(Json(state.catalog.list_available().await?))
}

async fn vehicle(
    State(state): State<VehicleState>,
    Path(vehicle_id): Path<i64>,
) -> WebResult<Json<Vehicle>> {
    let vehicle_id = VehicleId::new(vehicle_id);
    state
        .catalog
        .get_vehicle(vehicle_id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found(format!("vehicle {vehicle_id} not found")))
}

async fn vehicle_availability(
    State(state): State<VehicleState>,
    Path(vehicle_id): Path<i64>,
    Query(query): Query<WindowQuery>,
) -> WebResult<Json<AvailabilityResponse>> {
    let vehicle_id = VehicleId::new(vehicle_id);
    let window = TimeWindow::new(query.start_time, query.end_time)?;
    let available = state.orchestrator.ledger().is_available(vehicle_id, &window).await?;
    Ok(Json(AvailabilityResponse { vehicle_id, available }))
}
