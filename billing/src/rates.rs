//! Live rental-rate lookup.
//!
//! Fee quotes price a rental at the vehicle's current hourly rate, which the
//! vehicle service owns. [`RemoteRateLookup`] asks it on every quote; a rate
//! is never cached, so a price change applies to the next quote.

use async_trait::async_trait;
use car_rental_core::{BookingError, Result, VehicleId};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;

/// Default bound on a rate lookup.
pub const DEFAULT_RATE_LOOKUP_TIMEOUT: Duration = Duration::from_secs(2);

/// Source of a vehicle's current hourly rate.
#[async_trait]
pub trait RateLookup: Send + Sync {
    /// Hourly rate of `vehicle_id` right now.
    ///
    /// # Errors
    ///
    /// - `NotFound` when the vehicle does not exist
    /// - `DependencyFailure` when the rate owner cannot be reached or answers
    ///   with something unusable
    async fn rental_rate(&self, vehicle_id: VehicleId) -> Result<f64>;
}

#[derive(Debug, Deserialize)]
struct VehicleRate {
    rental_rate: f64,
}

/// Rate lookup against the vehicle service's `GET /vehicles/{id}`.
#[derive(Clone)]
pub struct RemoteRateLookup {
    client: Client,
    base_url: String,
}

impl RemoteRateLookup {
    /// Create a lookup for the vehicle service at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns `DependencyFailure` if the HTTP client cannot be built.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BookingError::DependencyFailure(format!("vehicle client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Vehicle service base URL.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

fn rate_unavailable(vehicle_id: VehicleId, detail: &str) -> BookingError {
    tracing::error!(vehicle_id = %vehicle_id, detail, "Rate lookup failed");
    BookingError::DependencyFailure("vehicle service unavailable".to_string())
}

#[async_trait]
impl RateLookup for RemoteRateLookup {
    async fn rental_rate(&self, vehicle_id: VehicleId) -> Result<f64> {
        if !vehicle_id.is_valid() {
            return Err(BookingError::Validation("vehicle_id must be positive".to_string()));
        }

        let response = self
            .client
            .get(format!("{}/vehicles/{}", self.base_url, vehicle_id.get()))
            .send()
            .await
            .map_err(|e| {
                let detail = if e.is_timeout() { "timed out".to_string() } else { e.to_string() };
                rate_unavailable(vehicle_id, &detail)
            })?;

        match response.status() {
            StatusCode::OK => {
                let body = response
                    .json::<VehicleRate>()
                    .await
                    .map_err(|e| rate_unavailable(vehicle_id, &format!("undecodable body: {e}")))?;
                if !body.rental_rate.is_finite() || body.rental_rate < 0.0 {
                    return Err(rate_unavailable(vehicle_id, "vehicle service returned an invalid rate"));
                }
                tracing::debug!(vehicle_id = %vehicle_id, rental_rate = body.rental_rate, "Rate looked up");
                Ok(body.rental_rate)
            },
            StatusCode::NOT_FOUND => Err(BookingError::NotFound(format!("vehicle {vehicle_id} not found"))),
            status => Err(rate_unavailable(vehicle_id, &format!("unexpected status {status}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_invalid_vehicle_id_is_rejected_without_calling_out() {
        // Port 9 (discard) is never contacted.
        let rates = RemoteRateLookup::new("http://127.0.0.1:9/", DEFAULT_RATE_LOOKUP_TIMEOUT).unwrap();
        assert_eq!(rates.base_url(), "http://127.0.0.1:9");
        assert!(matches!(
            rates.rental_rate(VehicleId::new(0)).await,
            Err(BookingError::Validation(_))
        ));
    }
}
