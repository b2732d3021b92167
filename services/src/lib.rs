//! # Car Rental Services
//!
//! HTTP surfaces of the platform, one binary each:
//!
//! | Binary | Default port | Router |
//! |---|---|---|
//! | `user-service` | 8080 | [`identity::router`] |
//! | `vehicle-service` | 8081 | [`vehicles::router`] |
//! | `billing-service` | 8082 | [`billing::router`] |
//!
//! The vehicle service resolves callers through the user service with
//! [`car_rental_fleet::RemoteIdentityRelay`]. The billing service prices fee
//! quotes at the vehicle service's current rate with
//! [`car_rental_billing::RemoteRateLookup`]. Every binary serves Prometheus
//! counters on `/metrics`.

#![forbid(unsafe_code)]

pub mod billing;
pub mod bootstrap;
pub mod config;
pub mod identity;
pub mod telemetry;
pub mod vehicles;

pub use config::Config;
