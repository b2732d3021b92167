//! # Car Rental Fleet
//!
//! Vehicles, reservations and the booking workflow.
//!
//! ```text
//! BookingOrchestrator ── runs BookingReducer
//!   ├── IdentityRelay        (local provider or identity service over HTTP)
//!   └── ReservationLedger    (in-memory, PostgreSQL)
//!         └── VehicleCatalog (in-memory, PostgreSQL)
//! ```
//!
//! ## Example
//!
//! ```
//! use car_rental_auth::{SessionConfig, SessionIdentityProvider, stores::InMemorySessionStore};
//! use car_rental_core::{TimeWindow, UserId, Utc, environment::SystemClock};
//! use car_rental_fleet::{
//!     BookingEnvironment, BookingOrchestrator, BookingRequest, InMemoryReservationLedger,
//!     InMemoryVehicleCatalog, LocalIdentityRelay, demo_fleet,
//! };
//! use std::sync::Arc;
//!
//! # async fn example() -> car_rental_core::Result<()> {
//! let clock = Arc::new(SystemClock);
//! let sessions = SessionIdentityProvider::new(
//!     Arc::new(InMemorySessionStore::new()),
//!     clock.clone(),
//!     SessionConfig::default(),
//! );
//! let token = sessions.create_session(UserId::new(1)).await?;
//!
//! let catalog = Arc::new(InMemoryVehicleCatalog::new(demo_fleet()));
//! let ledger = Arc::new(InMemoryReservationLedger::new(catalog, clock));
//! let orchestrator = BookingOrchestrator::new(BookingEnvironment::new(
//!     Arc::new(LocalIdentityRelay::new(sessions)),
//!     ledger,
//! ));
//!
//! let start = Utc::now() + chrono::Duration::hours(1);
//! let window = TimeWindow::new(start, start + chrono::Duration::hours(2))?;
//! let receipt = orchestrator
//!     .book(BookingRequest::new(1, window, 80), Some(token.as_str()))
//!     .await?;
//! assert_eq!(receipt.user_id, UserId::new(1));
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]

pub mod booking;
pub mod catalog;
pub mod ledger;
pub mod relay;

pub use booking::{
    BookingAction, BookingEnvironment, BookingOrchestrator, BookingPhase, BookingReceipt,
    BookingReducer, BookingRequest, BookingState,
};
pub use catalog::{InMemoryVehicleCatalog, VehicleCatalog, demo_fleet};
pub use ledger::{InMemoryReservationLedger, ReservationLedger};
pub use relay::{DEFAULT_RELAY_TIMEOUT, IdentityRelay, LocalIdentityRelay, RemoteIdentityRelay};
