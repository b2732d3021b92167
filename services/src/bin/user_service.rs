//! User service: accounts and sessions.

use car_rental_services::identity::{self, IdentityState};
use car_rental_services::{Config, bootstrap, telemetry};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    telemetry::init_tracing();
    let metrics = telemetry::init_metrics()?;

    let config = Config::from_env(8080);
    tracing::info!(
        postgres = config.database.is_some(),
        redis = config.redis_url.is_some(),
        session_ttl_seconds = config.session.ttl_seconds,
        sliding = config.session.sliding,
        "Starting user service"
    );

    let service = bootstrap::identity_service(&config).await?;
    let _purge = bootstrap::spawn_session_purge(
        service.sessions().clone(),
        bootstrap::SESSION_PURGE_INTERVAL,
    );

    let app = identity::router(IdentityState { service }).merge(telemetry::metrics_routes(metrics));
    telemetry::serve(app, &config.bind_address()).await
}
