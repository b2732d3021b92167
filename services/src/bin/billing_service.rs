//! Billing service: fee quotes and billing records.

use car_rental_services::{Config, billing, bootstrap, telemetry};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    telemetry::init_tracing();
    let metrics = telemetry::init_metrics()?;

    let config = Config::from_env(8082);
    tracing::info!(
        postgres = config.database.is_some(),
        vehicle_service = %config.rates.vehicle_service_url,
        rate_lookup_timeout_ms = config.rates.timeout_ms,
        "Starting billing service"
    );

    let state = bootstrap::billing(&config).await?;
    let app = billing::router(state).merge(telemetry::metrics_routes(metrics));
    telemetry::serve(app, &config.bind_address()).await
}
