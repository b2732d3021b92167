//! Store selection from [`Config`].
//!
//! `DATABASE_URL` switches users, vehicles, reservations and billing records
//! to PostgreSQL;
//! `REDIS_URL` switches sessions to Redis. Anything unset runs in memory.

use crate::billing::BillingState;
use crate::config::{Config, DatabaseConfig};
use anyhow::Context;
use car_rental_auth::stores::{
    InMemorySessionStore, InMemoryUserRepository, PostgresUserRepository, RedisSessionStore,
};
use car_rental_auth::{
    Argon2Hasher, IdentityService, SessionIdentityProvider, SessionStore, UserRepository,
};
use car_rental_billing::{
    BillingRepository, InMemoryBillingRepository, PostgresBillingRepository, RateLookup,
    RemoteRateLookup,
};
use car_rental_core::environment::SystemClock;
use car_rental_fleet::ledger::{PostgresReservationLedger, PostgresVehicleCatalog};
use car_rental_fleet::{
    BookingEnvironment, BookingOrchestrator, IdentityRelay, InMemoryReservationLedger,
    InMemoryVehicleCatalog, RemoteIdentityRelay, ReservationLedger, VehicleCatalog, demo_fleet,
};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// How often in-memory sessions are swept.
pub const SESSION_PURGE_INTERVAL: Duration = Duration::from_secs(300);

/// Open a PostgreSQL pool.
///
/// # Errors
///
/// Returns an error if the database is unreachable.
pub async fn connect_database(config: &DatabaseConfig) -> anyhow::Result<PgPool> {
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.url)
        .await
        .context("failed to connect to PostgreSQL")
}

/// Session provider backed by Redis or memory.
///
/// # Errors
///
/// Returns an error if Redis is configured but unreachable.
pub async fn session_provider(config: &Config) -> anyhow::Result<SessionIdentityProvider> {
    let store: Arc<dyn SessionStore> = match &config.redis_url {
        Some(url) => {
            tracing::info!("Sessions stored in Redis");
            Arc::new(RedisSessionStore::new(url).await.context("failed to connect to Redis")?)
        },
        None => {
            tracing::info!("Sessions stored in memory");
            Arc::new(InMemorySessionStore::new())
        },
    };
    Ok(SessionIdentityProvider::new(store, Arc::new(SystemClock), config.session_config()))
}

/// The identity service for the user service binary.
///
/// # Errors
///
/// Returns an error if a configured backend is unreachable or migrations fail.
pub async fn identity_service(config: &Config) -> anyhow::Result<IdentityService> {
    let users: Arc<dyn UserRepository> = match &config.database {
        Some(database) => {
            let repository = PostgresUserRepository::new(connect_database(database).await?);
            repository.migrate().await.context("user migrations failed")?;
            tracing::info!("Users stored in PostgreSQL");
            Arc::new(repository)
        },
        None => {
            tracing::info!("Users stored in memory");
            Arc::new(InMemoryUserRepository::new())
        },
    };

    let sessions = session_provider(config).await?;
    Ok(IdentityService::new(users, Arc::new(Argon2Hasher::new()), sessions))
}

/// Catalog and ledger for the vehicle service.
///
/// # Errors
///
/// Returns an error if the database is configured but unreachable, or
/// migrations fail.
pub async fn fleet(
    config: &Config,
) -> anyhow::Result<(Arc<dyn VehicleCatalog>, Arc<dyn ReservationLedger>)> {
    if let Some(database) = &config.database {
        let pool = connect_database(database).await?;
        let ledger = PostgresReservationLedger::new(pool.clone());
        ledger.migrate().await.context("fleet migrations failed")?;
        tracing::info!("Vehicles and reservations stored in PostgreSQL");
        let catalog: Arc<dyn VehicleCatalog> = Arc::new(PostgresVehicleCatalog::new(pool));
        let ledger: Arc<dyn ReservationLedger> = Arc::new(ledger);
        return Ok((catalog, ledger));
    }

    tracing::info!("Vehicles and reservations stored in memory, seeded with the demo fleet");
    let catalog: Arc<dyn VehicleCatalog> = Arc::new(InMemoryVehicleCatalog::new(demo_fleet()));
    let ledger: Arc<dyn ReservationLedger> =
        Arc::new(InMemoryReservationLedger::new(Arc::clone(&catalog), Arc::new(SystemClock)));
    Ok((catalog, ledger))
}

/// Booking orchestrator that resolves callers through the user service.
///
/// # Errors
///
/// Returns an error if the HTTP client cannot be built.
pub fn remote_orchestrator(
    config: &Config,
    ledger: Arc<dyn ReservationLedger>,
) -> anyhow::Result<BookingOrchestrator> {
    let relay: Arc<dyn IdentityRelay> = Arc::new(
        RemoteIdentityRelay::new(config.relay.identity_service_url.clone(), config.relay_timeout())
            .context("failed to build identity relay")?,
    );
    Ok(BookingOrchestrator::new(BookingEnvironment::new(relay, ledger)))
}

/// Billing records and the rate lookup for the billing service.
///
/// # Errors
///
/// Returns an error if the database is configured but unreachable,
/// migrations fail, or the HTTP client cannot be built.
pub async fn billing(config: &Config) -> anyhow::Result<BillingState> {
    let records: Arc<dyn BillingRepository> = match &config.database {
        Some(database) => {
            let repository = PostgresBillingRepository::new(connect_database(database).await?);
            repository.migrate().await.context("billing migrations failed")?;
            tracing::info!("Billing records stored in PostgreSQL");
            Arc::new(repository)
        },
        None => {
            tracing::info!("Billing records stored in memory");
            Arc::new(InMemoryBillingRepository::new(Arc::new(SystemClock)))
        },
    };

    let rates: Arc<dyn RateLookup> = Arc::new(
        RemoteRateLookup::new(config.rates.vehicle_service_url.clone(), config.rate_lookup_timeout())
            .context("failed to build rate lookup")?,
    );
    Ok(BillingState { records, rates })
}

/// Periodically drop expired sessions.
pub fn spawn_session_purge(provider: SessionIdentityProvider, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            interval.tick().await;
            match provider.purge_expired().await {
                Ok(0) => {},
                Ok(purged) => tracing::debug!(purged, "Expired sessions purged"),
                Err(e) => tracing::warn!(error = %e, "Session purge failed"),
            }
        }
    })
}
