//! Custom Axum extractors.
//!
//! - `CorrelationId`: the request's correlation id
//! - `SessionCredential`: the raw session token presented by the caller
//! - `ApiJson`: JSON body whose rejections use the `{code, message}` shape

use crate::error::AppError;
use crate::middleware::CORRELATION_ID_HEADER;
use axum::{
    async_trait,
    extract::{FromRequest, FromRequestParts},
    http::{HeaderMap, header, request::Parts},
};
use car_rental_auth::SESSION_COOKIE_NAME;
use uuid::Uuid;

/// Header carrying a session token for non-browser clients.
pub const SESSION_TOKEN_HEADER: &str = "X-Session-Token";

/// Correlation ID for request tracing.
///
/// Prefers the id stored by [`crate::middleware::correlation_id_layer`],
/// then the `X-Correlation-ID` header, and otherwise generates one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CorrelationId(pub Uuid);

#[async_trait]
impl<S> FromRequestParts<S> for CorrelationId
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        if let Some(existing) = parts.extensions.get::<Self>() {
            return Ok(*existing);
        }

        let correlation_id = parts
            .headers
            .get(CORRELATION_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| Uuid::parse_str(s).ok())
            .unwrap_or_else(Uuid::new_v4);

        Ok(Self(correlation_id))
    }
}

/// Raw session token presented by the caller.
///
/// Looked up in order: the `user-session` cookie, the `X-Session-Token`
/// header, then `Authorization: Bearer`. The token is not validated here.
/// Use `Option<SessionCredential>` where a session is optional.
#[derive(Clone)]
pub struct SessionCredential(pub String);

impl std::fmt::Debug for SessionCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SessionCredential(<redacted>)")
    }
}

impl SessionCredential {
    /// The token string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Find a session token in `headers`.
    #[must_use]
    pub fn from_headers(headers: &HeaderMap) -> Option<Self> {
        cookie_token(headers)
            .or_else(|| header_token(headers))
            .or_else(|| bearer_token(headers))
            .map(Self)
    }
}

fn non_empty(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

fn cookie_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE_NAME)
        .and_then(|(_, value)| non_empty(value))
}

fn header_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(SESSION_TOKEN_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(non_empty)
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .and_then(non_empty)
}

#[async_trait]
impl<S> FromRequestParts<S> for SessionCredential
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Self::from_headers(&parts.headers)
            .ok_or_else(|| AppError::unauthenticated("missing session token"))
    }
}

/// JSON body extractor that rejects with `VALIDATION_ERROR`.
#[derive(Debug, Clone, Copy, Default, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);
