//! User service routes.
//!
//! | Method | Path | |
//! |---|---|---|
//! | `POST` | `/sessions` | log in, sets the session cookie |
//! | `GET` | `/sessions/current` | resolve the caller's session |
//! | `DELETE` | `/sessions/current` | log out (idempotent) |
//! | `POST` | `/users` | register |
//! | `GET`/`PUT` | `/users/me` | profile |
//! | `GET` | `/users/me/membership` | membership tier |

use axum::{
    Json, Router,
    extract::State,
    http::{StatusCode, header},
    response::IntoResponse,
    routing::{get, post},
};
use car_rental_auth::{IdentityService, Membership, NewUser, ProfileUpdate, User};
use car_rental_core::UserId;
use car_rental_web::{
    ApiJson, CorrelationId, SessionCredential, WebResult, clear_session_cookie,
    correlation_id_layer, health_routes, session_cookie,
};
use serde::{Deserialize, Serialize};
use tower_http::trace::TraceLayer;

/// Service name reported by `/health`.
pub const SERVICE_NAME: &str = "user-service";

/// Shared state for the user service.
#[derive(Clone)]
pub struct IdentityState {
    /// Accounts and sessions
    pub service: IdentityService,
}

/// `POST /sessions` body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    /// Login email
    pub email: String,
    /// Plaintext password
    pub password: String,
}

/// `POST /sessions` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    /// Authenticated user
    pub user_id: UserId,
    /// Session token, also set as the `user-session` cookie
    pub session_token: String,
}

/// `GET /sessions/current` response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentSession {
    /// Session owner
    pub user_id: UserId,
}

/// Build the user service router.
pub fn router(state: IdentityState) -> Router {
    Router::new()
        .route("/sessions", post(login))
        .route("/sessions/current", get(current_session).delete(logout))
        .route("/users", post(register))
        .route("/users/me", get(profile).put(update_profile))
        .route("/users/me/membership", get(membership))
        .merge(health_routes(SERVICE_NAME))
        .layer(TraceLayer::new_for_http())
        .layer(correlation_id_layer())
        .with_state(state)
}

async fn login(
    State(state): State<IdentityState>,
    correlation_id: CorrelationId,
    ApiJson(request): ApiJson<LoginRequest>,
) -> WebResult<impl IntoResponse> {
    let outcome = state.service.login(&request.email, &request.password).await?;
    let cookie = session_cookie(
        outcome.token.as_str(),
        state.service.sessions().config().ttl_seconds(),
    )?;

    tracing::info!(
        correlation_id = %correlation_id.0,
        user_id = %outcome.user.user_id,
        "Session issued"
    );

    Ok((
        StatusCode::CREATED,
        [(header::SET_COOKIE, cookie)],
        Json(LoginResponse {
            user_id: outcome.user.user_id,
            session_token: outcome.token.as_str().to_string(),
        }),
    ))
}

async fn current_session(
    State(state): State<IdentityState>,
    credential: SessionCredential,
) -> WebResult<Json<CurrentSession>> {
    let user_id = state.service.current_user(credential.as_str()).await?;
    Ok(Json(CurrentSession { user_id }))
}

async fn logout(
    State(state): State<IdentityState>,
    credential: Option<SessionCredential>,
) -> WebResult<impl IntoResponse> {
    if let Some(credential) = credential {
        state.service.logout(credential.as_str()).await?;
    }
    Ok((StatusCode::NO_CONTENT, [(header::SET_COOKIE, clear_session_cookie()?)]))
}

async fn register(
    State(state): State<IdentityState>,
    ApiJson(new_user): ApiJson<NewUser>,
) -> WebResult<(StatusCode, Json<User>)> {
    let user = state.service.register(new_user).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

async fn profile(
    State(state): State<IdentityState>,
    credential: SessionCredential,
) -> WebResult<Json<User>> {
    let user_id = state.service.current_user(credential.as_str()).await?;
    Ok(Json(state.service.profile(user_id).await?))
}

async fn update_profile(
    State(state): State<IdentityState>,
    credential: SessionCredential,
    ApiJson(update): ApiJson<ProfileUpdate>,
) -> WebResult<Json<User>> {
    let user_id = state.service.current_user(credential.as_str()).await?;
    Ok(Json(state.service.update_profile(user_id, update).await?))
}

async fn membership(
    State(state): State<IdentityState>,
    credential: SessionCredential,
) -> WebResult<Json<Membership>> {
    let user_id = state.service.current_user(credential.as_str()).await?;
    Ok(Json(state.service.membership(user_id).await?))
}
