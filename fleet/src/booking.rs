//! Booking orchestration.
//!
//! A booking moves through a small state machine:
//!
//! ```text
//! Received ──validate──▶ Validated ──resolve identity──▶ IdentityResolved ──commit──▶ Succeeded
//!    │                      │                                 │
//!    └──────────────────────┴──────────────▶ Rejected ◀───────┘
//! ```
//!
//! [`BookingReducer`] holds every transition and performs no I/O. Identity
//! resolution and the ledger commit are returned as effects, and
//! [`BookingOrchestrator`] runs them, feeding each result back as an action.
//! A `Rejected` booking never wrote a reservation.

use crate::ledger::ReservationLedger;
use crate::relay::IdentityRelay;
use car_rental_core::effect::Effect;
use car_rental_core::reducer::{Effects, Reducer, run_to_completion};
use car_rental_core::{
    BookingError, DateTime, Reservation, Result, TimeWindow, UserId, Utc, VehicleId, smallvec,
    validation,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Inbound booking payload.
///
/// Fields are optional so that a missing field is rejected by the workflow
/// with a validation error instead of a deserialization failure.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BookingRequest {
    /// Vehicle to book
    #[serde(default)]
    pub vehicle_id: Option<i64>,
    /// Inclusive start
    #[serde(default)]
    pub start_time: Option<DateTime<Utc>>,
    /// Exclusive end
    #[serde(default)]
    pub end_time: Option<DateTime<Utc>>,
    /// Expected battery charge at pickup, percent
    #[serde(default)]
    pub expected_charge_level: Option<i32>,
}

impl BookingRequest {
    /// A fully populated request.
    #[must_use]
    pub const fn new(vehicle_id: i64, window: TimeWindow, expected_charge_level: i32) -> Self {
        Self {
            vehicle_id: Some(vehicle_id),
            start_time: Some(window.start()),
            end_time: Some(window.end()),
            expected_charge_level: Some(expected_charge_level),
        }
    }
}

/// A request that passed shape and bounds validation.
#[derive(Clone, Debug, PartialEq)]
pub struct BookingDraft {
    /// Vehicle to book
    pub vehicle_id: VehicleId,
    /// Requested window
    pub window: TimeWindow,
    /// Expected battery charge at pickup
    pub expected_charge_level: i32,
}

/// Outcome of a successful booking.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BookingReceipt {
    /// The persisted reservation
    pub reservation: Reservation,
    /// The user the reservation was made for
    pub user_id: UserId,
}

/// Workflow phase.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum BookingPhase {
    /// Nothing checked yet
    #[default]
    Received,
    /// Payload is well formed; waiting for identity
    Validated {
        /// Validated booking
        draft: BookingDraft,
    },
    /// Identity known; waiting for the ledger
    IdentityResolved {
        /// Validated booking
        draft: BookingDraft,
        /// Acting user
        user_id: UserId,
    },
    /// Reservation committed
    Succeeded {
        /// The persisted reservation and its owner
        receipt: BookingReceipt,
    },
    /// Booking refused; nothing was written
    Rejected {
        /// Why
        error: BookingError,
    },
}

impl BookingPhase {
    /// Short name used in logs.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Received => "received",
            Self::Validated { .. } => "validated",
            Self::IdentityResolved { .. } => "identity_resolved",
            Self::Succeeded { .. } => "succeeded",
            Self::Rejected { .. } => "rejected",
        }
    }

    /// `true` for `Succeeded` and `Rejected`.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded { .. } | Self::Rejected { .. })
    }
}

impl fmt::Display for BookingPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Per-request workflow state.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BookingState {
    /// Current phase
    pub phase: BookingPhase,
}

/// Inputs to the booking workflow.
#[derive(Clone, Debug, PartialEq)]
pub enum BookingAction {
    /// Command: start a booking
    Submit {
        /// Raw payload
        request: BookingRequest,
        /// Caller's session token, if one was presented
        token: Option<String>,
    },
    /// Event: the relay resolved the caller
    IdentityResolved {
        /// Acting user
        user_id: UserId,
    },
    /// Event: the relay could not resolve the caller
    IdentityFailed {
        /// Relay error
        error: BookingError,
    },
    /// Event: the ledger committed the reservation
    Committed {
        /// Persisted reservation
        reservation: Reservation,
    },
    /// Event: the ledger refused or failed
    CommitFailed {
        /// Ledger error
        error: BookingError,
    },
}

/// Dependencies the booking effects run against.
#[derive(Clone)]
pub struct BookingEnvironment {
    /// Resolves session tokens
    pub relay: Arc<dyn IdentityRelay>,
    /// Authoritative reservation store
    pub ledger: Arc<dyn ReservationLedger>,
}

impl BookingEnvironment {
    /// Bundle a relay and a ledger.
    #[must_use]
    pub fn new(relay: Arc<dyn IdentityRelay>, ledger: Arc<dyn ReservationLedger>) -> Self {
        Self { relay, ledger }
    }
}

/// Pure booking state machine.
#[derive(Clone, Copy, Debug, Default)]
pub struct BookingReducer;

impl BookingReducer {
    fn validate(request: &BookingRequest) -> Result<BookingDraft> {
        let missing = |field: &str| BookingError::Validation(format!("{field} is required"));

        let vehicle_id = VehicleId::new(request.vehicle_id.ok_or_else(|| missing("vehicle_id"))?);
        let start = request.start_time.ok_or_else(|| missing("start_time"))?;
        let end = request.end_time.ok_or_else(|| missing("end_time"))?;
        let expected_charge_level = request
            .expected_charge_level
            .ok_or_else(|| missing("expected_charge_level"))?;

        if !vehicle_id.is_valid() {
            return Err(BookingError::Validation("vehicle_id must be positive".to_string()));
        }
        let window = TimeWindow::new(start, end)?;
        validation::validate_duration(&window)?;
        if !validation::CHARGE_LEVEL_RANGE.contains(&expected_charge_level) {
            return Err(BookingError::Validation(
                "expected_charge_level must be between 0 and 100".to_string(),
            ));
        }

        Ok(BookingDraft {
            vehicle_id,
            window,
            expected_charge_level,
        })
    }

    fn reject(state: &mut BookingState, error: BookingError) -> Effects<BookingAction> {
        state.phase = BookingPhase::Rejected { error };
        smallvec![Effect::None]
    }
}

impl Reducer for BookingReducer {
    type State = BookingState;
    type Action = BookingAction;
    type Environment = BookingEnvironment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> Effects<Self::Action> {
        match (state.phase.clone(), action) {
            (BookingPhase::Received, BookingAction::Submit { request, token }) => {
                let draft = match Self::validate(&request) {
                    Ok(draft) => draft,
                    Err(error) => return Self::reject(state, error),
                };
                state.phase = BookingPhase::Validated { draft };

                let Some(token) = token else {
                    return Self::reject(state, BookingError::Unauthenticated);
                };

                let relay = Arc::clone(&env.relay);
                smallvec![Effect::future(async move {
                    Some(match relay.resolve(&token).await {
                        Ok(user_id) => BookingAction::IdentityResolved { user_id },
                        Err(error) => BookingAction::IdentityFailed { error },
                    })
                })]
            },

            (BookingPhase::Validated { draft }, BookingAction::IdentityResolved { user_id }) => {
                let booking = match validation::validate_new_reservation(
                    draft.vehicle_id,
                    user_id,
                    draft.window,
                    draft.expected_charge_level,
                ) {
                    Ok(booking) => booking,
                    Err(error) => return Self::reject(state, error),
                };
                state.phase = BookingPhase::IdentityResolved { draft, user_id };

                let ledger = Arc::clone(&env.ledger);
                smallvec![Effect::future(async move {
                    Some(match ledger.check_and_commit(booking).await {
                        Ok(reservation) => BookingAction::Committed { reservation },
                        Err(error) => BookingAction::CommitFailed { error },
                    })
                })]
            },

            (BookingPhase::Validated { .. }, BookingAction::IdentityFailed { error })
            | (BookingPhase::IdentityResolved { .. }, BookingAction::CommitFailed { error }) => {
                Self::reject(state, error)
            },

            (BookingPhase::IdentityResolved { user_id, .. }, BookingAction::Committed { reservation }) => {
                state.phase = BookingPhase::Succeeded {
                    receipt: BookingReceipt {
                        reservation,
                        user_id,
                    },
                };
                smallvec![Effect::None]
            },

            (phase, action) => {
                tracing::warn!(phase = %phase, ?action, "Ignoring action not valid in current phase");
                smallvec![Effect::None]
            },
        }
    }
}

/// Runs the booking workflow for one request.
#[derive(Clone)]
pub struct BookingOrchestrator {
    env: BookingEnvironment,
}

impl BookingOrchestrator {
    /// Create an orchestrator over `env`.
    #[must_use]
    pub const fn new(env: BookingEnvironment) -> Self {
        Self { env }
    }

    /// The ledger bookings are committed to.
    #[must_use]
    pub fn ledger(&self) -> &Arc<dyn ReservationLedger> {
        &self.env.ledger
    }

    /// The relay used to resolve callers.
    #[must_use]
    pub fn relay(&self) -> &Arc<dyn IdentityRelay> {
        &self.env.relay
    }

    /// Validate, authenticate and commit one booking.
    ///
    /// # Errors
    ///
    /// - `Validation` for a malformed payload or out-of-range bounds
    /// - `Unauthenticated` when no valid session was presented
    /// - `Conflict` when the window is taken
    /// - `DependencyFailure` when the relay or the ledger store fails
    pub async fn book(&self, request: BookingRequest, token: Option<&str>) -> Result<BookingReceipt> {
        let mut state = BookingState::default();
        let action = BookingAction::Submit {
            request,
            token: token.map(str::to_owned),
        };
        let steps = run_to_completion(&BookingReducer, &mut state, action, &self.env).await;

        match state.phase {
            BookingPhase::Succeeded { receipt } => {
                metrics::counter!("booking.committed").increment(1);
                tracing::info!(
                    reservation_id = %receipt.reservation.reservation_id,
                    vehicle_id = %receipt.reservation.vehicle_id,
                    user_id = %receipt.user_id,
                    steps,
                    "Booking succeeded"
                );
                Ok(receipt)
            },
            BookingPhase::Rejected { error } => {
                metrics::counter!("booking.rejected", "reason" => error.reason()).increment(1);
                if error.is_caller_error() {
                    tracing::warn!(reason = error.reason(), error = %error, "Booking rejected");
                } else {
                    tracing::error!(reason = error.reason(), error = %error, "Booking failed");
                }
                Err(error)
            },
            phase => {
                tracing::error!(phase = %phase, "Booking workflow stopped before a terminal phase");
                Err(BookingError::DependencyFailure(format!(
                    "booking workflow stopped in phase {phase}"
                )))
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::InMemoryVehicleCatalog;
    use crate::ledger::InMemoryReservationLedger;
    use async_trait::async_trait;
    use car_rental_testing::fixtures::{at, vehicle, window};
    use car_rental_testing::test_clock;

    struct StaticRelay(Result<UserId>);

    #[async_trait]
    impl IdentityRelay for StaticRelay {
        async fn resolve(&self, _token: &str) -> Result<UserId> {
            self.0.clone()
        }
    }

    fn env_with(relay: Result<UserId>) -> BookingEnvironment {
        let catalog = Arc::new(InMemoryVehicleCatalog::new([vehicle(1), vehicle(2)]));
        let ledger = Arc::new(InMemoryReservationLedger::new(catalog, Arc::new(test_clock())));
        BookingEnvironment::new(Arc::new(StaticRelay(relay)), ledger)
    }

    fn submit(request: BookingRequest) -> BookingAction {
        BookingAction::Submit {
            request,
            token: Some("token".to_string()),
        }
    }

    #[test]
    fn test_missing_field_rejects_from_received() {
        let env = env_with(Ok(UserId::new(7)));
        let mut state = BookingState::default();
        let request = BookingRequest {
            end_time: None,
            ..BookingRequest::new(1, window(10, 12), 80)
        };

        let effects = BookingReducer.reduce(&mut state, submit(request), &env);

        assert!(effects.iter().all(Effect::is_none));
        assert_eq!(
            state.phase,
            BookingPhase::Rejected {
                error: BookingError::Validation("end_time is required".to_string())
            }
        );
    }

    #[test]
    fn test_duration_bounds_rejected_before_identity() {
        let env = env_with(Ok(UserId::new(7)));

        for request in [
            BookingRequest::new(1, TimeWindow::new(at(10, 0), at(10, 59)).unwrap(), 80),
            BookingRequest::new(1, window(0, 73), 80),
        ] {
            let mut state = BookingState::default();
            let effects = BookingReducer.reduce(&mut state, submit(request), &env);
            assert!(effects.iter().all(Effect::is_none));
            assert!(matches!(state.phase, BookingPhase::Rejected { error: BookingError::Validation(_) }));
        }
    }

    #[test]
    fn test_charge_level_out_of_range() {
        let env = env_with(Ok(UserId::new(7)));
        let mut state = BookingState::default();
        let _ = BookingReducer.reduce(&mut state, submit(BookingRequest::new(1, window(10, 12), 101)), &env);
        assert!(matches!(state.phase, BookingPhase::Rejected { error: BookingError::Validation(_) }));
    }

    #[test]
    fn test_valid_request_moves_to_validated_and_asks_for_identity() {
        let env = env_with(Ok(UserId::new(7)));
        let mut state = BookingState::default();

        let effects = BookingReducer.reduce(&mut state, submit(BookingRequest::new(1, window(10, 12), 80)), &env);

        assert_eq!(effects.len(), 1);
        assert!(matches!(effects[0], Effect::Future(_)));
        assert_eq!(state.phase.name(), "validated");
    }

    #[test]
    fn test_missing_token_is_unauthenticated() {
        let env = env_with(Ok(UserId::new(7)));
        let mut state = BookingState::default();
        let action = BookingAction::Submit {
            request: BookingRequest::new(1, window(10, 12), 80),
            token: None,
        };

        let _ = BookingReducer.reduce(&mut state, action, &env);

        assert_eq!(state.phase, BookingPhase::Rejected { error: BookingError::Unauthenticated });
    }

    #[test]
    fn test_out_of_order_action_is_ignored() {
        let env = env_with(Ok(UserId::new(7)));
        let mut state = BookingState::default();

        let effects = BookingReducer.reduce(
            &mut state,
            BookingAction::IdentityResolved { user_id: UserId::new(7) },
            &env,
        );

        assert!(effects.iter().all(Effect::is_none));
        assert_eq!(state.phase, BookingPhase::Received);
    }

    #[test]
    fn test_terminal_phase_ignores_further_actions() {
        let env = env_with(Ok(UserId::new(7)));
        let mut state = BookingState {
            phase: BookingPhase::Rejected { error: BookingError::Unauthenticated },
        };

        let _ = BookingReducer.reduce(&mut state, submit(BookingRequest::new(1, window(10, 12), 80)), &env);

        assert!(state.phase.is_terminal());
        assert_eq!(state.phase, BookingPhase::Rejected { error: BookingError::Unauthenticated });
    }

    #[tokio::test]
    async fn test_orchestrator_commits_for_resolved_user() {
        let orchestrator = BookingOrchestrator::new(env_with(Ok(UserId::new(7))));

        let receipt = orchestrator
            .book(BookingRequest::new(1, window(10, 12), 80), Some("token"))
            .await
            .unwrap();

        assert_eq!(receipt.user_id, UserId::new(7));
        assert_eq!(receipt.reservation.user_id, UserId::new(7));
        assert_eq!(receipt.reservation.vehicle_id, VehicleId::new(1));
        assert!(receipt.reservation.is_active());
    }

    #[tokio::test]
    async fn test_orchestrator_unauthenticated_writes_nothing() {
        let orchestrator = BookingOrchestrator::new(env_with(Err(BookingError::Unauthenticated)));

        let result = orchestrator
            .book(BookingRequest::new(1, window(10, 12), 80), Some("token"))
            .await;

        assert_eq!(result, Err(BookingError::Unauthenticated));
        let stored = orchestrator.ledger().reservations_for_vehicle(VehicleId::new(1)).await.unwrap();
        assert!(stored.is_empty());
    }

    #[tokio::test]
    async fn test_orchestrator_relay_outage_is_dependency_failure() {
        let orchestrator = BookingOrchestrator::new(env_with(Err(BookingError::DependencyFailure(
            "identity service unavailable".to_string(),
        ))));

        let result = orchestrator
            .book(BookingRequest::new(1, window(10, 12), 80), Some("token"))
            .await;

        assert!(matches!(result, Err(BookingError::DependencyFailure(_))));
    }

    #[tokio::test]
    async fn test_orchestrator_conflict_after_identity() {
        let orchestrator = BookingOrchestrator::new(env_with(Ok(UserId::new(7))));

        orchestrator
            .book(BookingRequest::new(1, window(10, 12), 80), Some("token"))
            .await
            .unwrap();
        let second = orchestrator
            .book(BookingRequest::new(1, window(11, 13), 80), Some("token"))
            .await;

        assert_eq!(second, Err(BookingError::Conflict { vehicle_id: VehicleId::new(1) }));
    }

    #[tokio::test]
    async fn test_orchestrator_unknown_vehicle_is_validation() {
        let orchestrator = BookingOrchestrator::new(env_with(Ok(UserId::new(7))));

        let result = orchestrator
            .book(BookingRequest::new(99, window(10, 12), 80), Some("token"))
            .await;

        assert!(matches!(result, Err(BookingError::Validation(_))));
    }

    #[test]
    fn test_request_deserializes_with_missing_fields() {
        let request: BookingRequest = serde_json::from_str(r#"{"vehicle_id": 3}"#).unwrap();
        assert_eq!(request.vehicle_id, Some(3));
        assert!(request.start_time.is_none());
    }
}
