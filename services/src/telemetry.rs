//! Tracing, Prometheus metrics and the HTTP serve loop shared by the binaries.

use axum::{Router, routing::get};
use metrics::describe_counter;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Default filter when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "car_rental=info,tower_http=debug,sqlx=warn";

/// Install the global subscriber. A second call is a no-op.
pub fn init_tracing() {
    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}

/// Install the global Prometheus recorder and describe the counters the
/// booking core emits.
///
/// Counter names are rendered with `.` replaced by `_`, so
/// `booking.committed` is scraped as `booking_committed`.
///
/// # Errors
///
/// Returns an error if a recorder is already installed in this process.
pub fn init_metrics() -> anyhow::Result<PrometheusHandle> {
    let handle = PrometheusBuilder::new().install_recorder()?;

    describe_counter!("session.created", "Sessions issued after a successful login");
    describe_counter!("session.resolve_failed", "Session tokens that did not resolve, by reason");
    describe_counter!("booking.committed", "Reservations written by the booking orchestrator");
    describe_counter!("booking.rejected", "Booking requests rejected, by reason");
    describe_counter!("billing.record_stored", "Billing records persisted");

    tracing::info!("Prometheus recorder installed");
    Ok(handle)
}

/// `GET /metrics` in the Prometheus text format.
pub fn metrics_routes(handle: PrometheusHandle) -> Router {
    Router::new().route("/metrics", get(move || std::future::ready(handle.render())))
}

/// Serve `app` on `address` until Ctrl+C.
///
/// # Errors
///
/// Returns an error if the address cannot be bound or the server fails.
pub async fn serve(app: Router, address: &str) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Shut down gracefully");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
