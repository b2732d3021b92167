//! `RemoteIdentityRelay` against an in-process identity endpoint.

use axum::Router;
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use car_rental_auth::SessionToken;
use car_rental_core::{BookingError, UserId};
use car_rental_fleet::{IdentityRelay, RemoteIdentityRelay};
use std::time::Duration;

async fn serve(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

fn identity_app(valid: String) -> Router {
    Router::new().route(
        "/sessions/current",
        get(move |headers: HeaderMap| {
            let expected = format!("user-session={valid}");
            async move {
                let cookie = headers.get(header::COOKIE).and_then(|v| v.to_str().ok());
                if cookie == Some(expected.as_str()) {
                    axum::Json(serde_json::json!({ "user_id": 42 })).into_response()
                } else {
                    StatusCode::UNAUTHORIZED.into_response()
                }
            }
        }),
    )
}

#[tokio::test]
async fn test_resolves_forwarded_cookie() {
    let token = SessionToken::generate();
    let base = serve(identity_app(token.as_str().to_string())).await;
    let relay = RemoteIdentityRelay::new(base, Duration::from_secs(2)).unwrap();

    assert_eq!(relay.resolve(token.as_str()).await.unwrap(), UserId::new(42));
}

#[tokio::test]
async fn test_unknown_session_is_unauthenticated() {
    let base = serve(identity_app(SessionToken::generate().as_str().to_string())).await;
    let relay = RemoteIdentityRelay::new(base, Duration::from_secs(2)).unwrap();

    let other = SessionToken::generate();
    assert_eq!(relay.resolve(other.as_str()).await, Err(BookingError::Unauthenticated));
}

#[tokio::test]
async fn test_forbidden_is_unauthenticated() {
    let app = Router::new().route("/sessions/current", get(|| async { StatusCode::FORBIDDEN }));
    let relay = RemoteIdentityRelay::new(serve(app).await, Duration::from_secs(2)).unwrap();

    let token = SessionToken::generate();
    assert_eq!(relay.resolve(token.as_str()).await, Err(BookingError::Unauthenticated));
}

#[tokio::test]
async fn test_server_error_is_dependency_failure() {
    let app = Router::new().route(
        "/sessions/current",
        get(|| async { StatusCode::INTERNAL_SERVER_ERROR }),
    );
    let relay = RemoteIdentityRelay::new(serve(app).await, Duration::from_secs(2)).unwrap();

    let token = SessionToken::generate();
    assert!(matches!(
        relay.resolve(token.as_str()).await,
        Err(BookingError::DependencyFailure(_))
    ));
}

#[tokio::test]
async fn test_undecodable_body_is_dependency_failure() {
    let app = Router::new().route("/sessions/current", get(|| async { "not json" }));
    let relay = RemoteIdentityRelay::new(serve(app).await, Duration::from_secs(2)).unwrap();

    let token = SessionToken::generate();
    assert!(matches!(
        relay.resolve(token.as_str()).await,
        Err(BookingError::DependencyFailure(_))
    ));
}

#[tokio::test]
async fn test_timeout_is_dependency_failure_not_conflict() {
    let app = Router::new().route(
        "/sessions/current",
        get(|| async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Response::new(axum::body::Body::empty())
        }),
    );
    let relay = RemoteIdentityRelay::new(serve(app).await, Duration::from_millis(100)).unwrap();

    let token = SessionToken::generate();
    assert!(matches!(
        relay.resolve(token.as_str()).await,
        Err(BookingError::DependencyFailure(_))
    ));
}

#[tokio::test]
async fn test_unreachable_service_is_dependency_failure() {
    // Bind then drop to get a port with nothing listening.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    let relay = RemoteIdentityRelay::new(format!("http://{addr}"), Duration::from_secs(1)).unwrap();

    let token = SessionToken::generate();
    assert!(matches!(
        relay.resolve(token.as_str()).await,
        Err(BookingError::DependencyFailure(_))
    ));
}
