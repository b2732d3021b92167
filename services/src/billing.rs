//! Billing service routes.
//!
//! `POST /fees/calculate` prices a rental at a rate the caller supplies.
//! `POST /fees/quote` looks the rate up live from the vehicle service first.
//! `POST /billing` records a charge.

use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    routing::{get, post},
};
use car_rental_billing::{
    BillingRecord, BillingRepository, Fee, NewBillingRecord, RateLookup, calculate_fee_between,
};
use car_rental_core::{BookingError, DateTime, UserId, Utc, VehicleId};
use car_rental_web::{ApiJson, AppError, WebResult, correlation_id_layer, health_routes};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Service name reported by `/health`.
pub const SERVICE_NAME: &str = "billing-service";

/// Shared state for the billing service.
#[derive(Clone)]
pub struct BillingState {
    /// Where charges are recorded
    pub records: Arc<dyn BillingRepository>,
    /// Current hourly rate of a vehicle
    pub rates: Arc<dyn RateLookup>,
}

/// `POST /fees/calculate` body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeeRequest {
    /// Reservation being billed, echoed back
    #[serde(default)]
    pub reservation_id: Option<i64>,
    /// Rental start
    pub start_time: DateTime<Utc>,
    /// Rental end
    pub end_time: DateTime<Utc>,
    /// Hourly rate
    pub rental_rate: f64,
    /// Membership discount in percent
    #[serde(default)]
    pub discount_percent: Option<f64>,
}

/// `POST /fees/quote` body. The rate comes from the vehicle service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuoteRequest {
    /// Reservation being billed, echoed back
    #[serde(default)]
    pub reservation_id: Option<i64>,
    /// Vehicle whose current rate applies
    pub vehicle_id: VehicleId,
    /// Rental start
    pub start_time: DateTime<Utc>,
    /// Rental end
    pub end_time: DateTime<Utc>,
    /// Membership discount in percent
    #[serde(default)]
    pub discount_percent: Option<f64>,
}

/// Fee calculation response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeeResponse {
    /// Reservation being billed
    pub reservation_id: Option<i64>,
    /// Hourly rate the fee was priced at
    pub rental_rate: f64,
    /// Fractional hours
    pub hours: f64,
    /// Amount before discount
    pub subtotal: f64,
    /// Discount applied
    pub discount: f64,
    /// Amount due
    pub total_fee: f64,
}

impl FeeResponse {
    fn new(reservation_id: Option<i64>, rental_rate: f64, fee: Fee) -> Self {
        Self {
            reservation_id,
            rental_rate,
            hours: fee.hours,
            subtotal: fee.subtotal,
            discount: fee.discount,
            total_fee: fee.total,
        }
    }
}

/// `GET /billing` query.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct RecordsQuery {
    /// Whose records
    pub user_id: i64,
}

/// Build the billing service router.
pub fn router(state: BillingState) -> Router {
    Router::new()
        .route("/fees/calculate", post(calculate))
        .route("/fees/quote", post(quote))
        .route("/billing", post(record_charge).get(list_records))
        .merge(health_routes(SERVICE_NAME))
        .layer(TraceLayer::new_for_http())
        .layer(correlation_id_layer())
        .with_state(state)
}

async fn calculate(ApiJson(request): ApiJson<FeeRequest>) -> WebResult<Json<FeeResponse>> {
    let fee = calculate_fee_between(
        request.rental_rate,
        request.start_time,
        request.end_time,
        request.discount_percent,
    )
    .map_err(BookingError::from)?;

    tracing::info!(
        reservation_id = ?request.reservation_id,
        hours = fee.hours,
        total_fee = fee.total,
        "Rental fee calculated"
    );

    Ok(Json(FeeResponse::new(request.reservation_id, request.rental_rate, fee)))
}

async fn quote(
    State(state): State<BillingState>,
    ApiJson(request): ApiJson<QuoteRequest>,
) -> WebResult<Json<FeeResponse>> {
    // Bounds are checked before the vehicle service is called.
    if request.end_time <= request.start_time {
        return Err(AppError::validation("invalid time range: end must be after start"));
    }

    let rate = state.rates.rental_rate(request.vehicle_id).await?;
    let fee = calculate_fee_between(rate, request.start_time, request.end_time, request.discount_percent)
        .map_err(BookingError::from)?;

    tracing::info!(
        reservation_id = ?request.reservation_id,
        vehicle_id = %request.vehicle_id,
        rental_rate = rate,
        total_fee = fee.total,
        "Rental fee quoted"
    );

    Ok(Json(FeeResponse::new(request.reservation_id, rate, fee)))
}

async fn record_charge(
    State(state): State<BillingState>,
    ApiJson(record): ApiJson<NewBillingRecord>,
) -> WebResult<(StatusCode, Json<BillingRecord>)> {
    let stored = state.records.insert(record).await?;

    metrics::counter!("billing.record_stored").increment(1);
    tracing::info!(
        bill_id = stored.bill_id,
        user_id = %stored.user_id,
        reservation_id = %stored.reservation_id,
        status = %stored.status,
        "Billing record stored"
    );

    Ok((StatusCode::CREATED, Json(stored)))
}

async fn list_records(
    State(state): State<BillingState>,
    Query(query): Query<RecordsQuery>,
) -> WebResult<Json<Vec<BillingRecord>>> {
    let user_id = UserId::new(query.user_id);
    if !user_id.is_valid() {
        return Err(AppError::validation("user_id must be positive"));
    }
    Ok(Json(state.records.records_for_user(user_id).await?))
}
