//! Shared helpers for the router tests.

#![allow(dead_code)]

use axum::Router;
use axum::body::Body;
use axum::http::{Request, Response, header};
use car_rental_auth::stores::{InMemorySessionStore, InMemoryUserRepository};
use car_rental_auth::{Argon2Hasher, IdentityService, SessionConfig, SessionIdentityProvider};
use car_rental_core::environment::SystemClock;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

pub fn identity_service() -> IdentityService {
    let sessions = SessionIdentityProvider::new(
        Arc::new(InMemorySessionStore::new()),
        Arc::new(SystemClock),
        SessionConfig::default(),
    );
    IdentityService::new(
        Arc::new(InMemoryUserRepository::new()),
        Arc::new(Argon2Hasher::new()),
        sessions,
    )
}

pub fn json_request(method: &str, uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn with_cookie(mut request: Request<Body>, token: &str) -> Request<Body> {
    request.headers_mut().insert(
        header::COOKIE,
        format!("user-session={token}").parse().unwrap(),
    );
    request
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

pub async fn send(app: &Router, request: Request<Body>) -> Response<Body> {
    app.clone().oneshot(request).await.unwrap()
}

pub async fn json_body<T: DeserializeOwned>(response: Response<Body>) -> T {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

pub fn alice() -> Value {
    serde_json::json!({
        "name": "Alice Tan",
        "email": "alice@example.com",
        "phone_no": "91234567",
        "password": "correct horse",
        "dob": "1990-04-01"
    })
}
