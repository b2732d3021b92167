//! Session cookie helpers.

use crate::error::AppError;
use axum::http::HeaderValue;
use car_rental_auth::SESSION_COOKIE_NAME;

/// `Set-Cookie` value carrying a new session token.
///
/// # Errors
///
/// Returns an internal error if the token contains bytes that are not
/// valid in a header.
pub fn session_cookie(token: &str, max_age_seconds: u64) -> Result<HeaderValue, AppError> {
    HeaderValue::from_str(&format!(
        "{SESSION_COOKIE_NAME}={token}; HttpOnly; SameSite=Lax; Path=/; Max-Age={max_age_seconds}"
    ))
    .map_err(|e| AppError::internal("failed to build session cookie").with_source(e.into()))
}

/// `Set-Cookie` value that clears the session cookie.
///
/// # Errors
///
/// Never fails in practice; the value is built from constants.
pub fn clear_session_cookie() -> Result<HeaderValue, AppError> {
    session_cookie("", 0)
}
