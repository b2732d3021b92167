//! Vehicle service: catalog, reservations and booking.

use car_rental_services::vehicles::{self, VehicleState};
use car_rental_services::{Config, bootstrap, telemetry};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    telemetry::init_tracing();
    let metrics = telemetry::init_metrics()?;

    let config = Config::from_env(8081);
    tracing::info!(
        postgres = config.database.is_some(),
        identity_service = %config.relay.identity_service_url,
        relay_timeout_ms = config.relay.timeout_ms,
        "Starting vehicle service"
    );

    let (catalog, ledger) = bootstrap::fleet(&config).await?;
    let orchestrator = bootstrap::remote_orchestrator(&config, ledger)?;

    let app = vehicles::router(VehicleState { orchestrator, catalog })
        .merge(telemetry::metrics_routes(metrics));
    telemetry::serve(app, &config.bind_address()).await
}
