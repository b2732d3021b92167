//! Liveness endpoint.
//!
//! `GET /health` only reports that the process is serving requests. It does
//! not check the database or Redis.

use axum::{Json, Router, routing::get};
use serde::{Deserialize, Serialize};

/// Body returned by [`health_check`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Always `"ok"`
    pub status: String,
    /// Name of the answering service
    pub service: String,
}

/// `GET /health` for `service`.
#[allow(clippy::unused_async)]
pub async fn health_check(service: &'static str) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        service: service.to_string(),
    })
}

/// Router exposing `GET /health`, mergeable into any state's router.
pub fn health_routes<S>(service: &'static str) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    Router::new().route("/health", get(move || health_check(service)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::{Request, StatusCode}};
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_health_reports_service() {
        let app: Router = health_routes("vehicle-service");

        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: HealthResponse = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body.status, "ok");
        assert_eq!(body.service, "vehicle-service");
    }
}
