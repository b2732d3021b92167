//! # Car Rental Core
//!
//! Domain types and the functional core shared by every car rental service.
//!
//! This crate contains no I/O. It provides:
//!
//! - **Identifiers and records**: [`VehicleId`], [`UserId`], [`Reservation`], [`Vehicle`]
//! - **Time windows** with half-open `[start, end)` semantics: [`TimeWindow`]
//! - **The availability oracle**: [`availability::is_available`]
//! - **Booking validation**: [`validation::validate_new_reservation`]
//! - **Error taxonomy**: [`BookingError`]
//! - **Reducer/Effect**: the pure state machine abstraction used by the booking flow
//!
//! ## Example
//!
//! ```
//! use car_rental_core::{availability, TimeWindow};
//! use chrono::{TimeZone, Utc};
//!
//! let morning = TimeWindow::new(
//!     Utc.with_ymd_and_hms(2025, 1, 1, 10, 0, 0).unwrap(),
//!     Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, 0).unwrap(),
//! ).unwrap();
//! let afternoon = TimeWindow::new(
//!     Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, 0).unwrap(),
//!     Utc.with_ymd_and_hms(2025, 1, 1, 14, 0, 0).unwrap(),
//! ).unwrap();
//!
//! // Back-to-back windows do not overlap.
//! assert!(!availability::overlaps(&morning, &afternoon));
//! ```

#![forbid(unsafe_code)]

pub mod availability;
pub mod error;
pub mod types;
pub mod validation;

pub use chrono::{DateTime, Utc};
pub use error::{BookingError, Result};
pub use smallvec::{SmallVec, smallvec};
pub use types::*;

/// Reducer module - the core trait for business logic.
///
/// Reducers are pure functions: `(State, Action, Environment) → (State, Effects)`.
/// They own every state transition of a workflow and describe side effects as
/// values instead of performing them.
pub mod reducer {
    use super::effect::Effect;
    use smallvec::SmallVec;
    use std::collections::VecDeque;

    /// Effects returned from a single reduction.
    pub type Effects<Action> = SmallVec<[Effect<Action>; 4]>;

    /// The Reducer trait - core abstraction for business logic
    ///
    /// # Type Parameters
    ///
    /// - `State`: The domain state this reducer operates on
    /// - `Action`: The action type this reducer processes
    /// - `Environment`: The injected dependencies this reducer needs
    pub trait Reducer {
        /// The state type this reducer operates on
        type State;

        /// The action type this reducer processes
        type Action;

        /// The environment type with injected dependencies
        type Environment;

        /// Reduce an action into state changes and effects.
        ///
        /// Must not perform I/O. Anything asynchronous is returned as an
        /// [`Effect::Future`] whose output is fed back as the next action.
        fn reduce(
            &self,
            state: &mut Self::State,
            action: Self::Action,
            env: &Self::Environment,
        ) -> Effects<Self::Action>;
    }

    /// Drive a reducer until no actions remain.
    ///
    /// Starts from `action`, executes every returned effect in order, and feeds
    /// produced actions back into the reducer. Returns the number of actions
    /// reduced. Effects are awaited inline, so the whole workflow runs on the
    /// caller's task.
    pub async fn run_to_completion<R>(
        reducer: &R,
        state: &mut R::State,
        action: R::Action,
        env: &R::Environment,
    ) -> usize
    where
        R: Reducer,
    {
        let mut pending = VecDeque::from([action]);
        let mut reduced = 0;

        while let Some(next) = pending.pop_front() {
            reduced += 1;
            let mut effects: VecDeque<Effect<R::Action>> =
                reducer.reduce(state, next, env).into_iter().collect();

            while let Some(effect) = effects.pop_front() {
                match effect {
                    Effect::None => {},
                    Effect::Sequential(inner) => {
                        for (offset, effect) in inner.into_iter().enumerate() {
                            effects.insert(offset, effect);
                        }
                    },
                    Effect::Future(fut) => {
                        if let Some(feedback) = fut.await {
                            pending.push_back(feedback);
                        }
                    },
                }
            }
        }

        reduced
    }
}

/// Effect module - side effect descriptions.
///
/// Effects are values returned from reducers and executed by a driver such as
/// [`reducer::run_to_completion`].
pub mod effect {
    use futures::future::BoxFuture;
    use std::future::Future;

    /// Effect type - describes a side effect to be executed
    ///
    /// # Type Parameters
    ///
    /// - `Action`: The action type that effects can produce (feedback loop)
    pub enum Effect<Action> {
        /// No-op effect
        None,

        /// Run effects sequentially
        Sequential(Vec<Effect<Action>>),

        /// Arbitrary async computation
        ///
        /// Returns `Option<Action>` - if Some, the action is fed back into the reducer
        Future(BoxFuture<'static, Option<Action>>),
    }

    impl<Action> std::fmt::Debug for Effect<Action>
    where
        Action: std::fmt::Debug,
    {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            match self {
                Effect::None => write!(f, "Effect::None"),
                Effect::Sequential(effects) => {
                    f.debug_tuple("Effect::Sequential").field(effects).finish()
                },
                Effect::Future(_) => write!(f, "Effect::Future(<future>)"),
            }
        }
    }

    impl<Action> Effect<Action> {
        /// Wrap an async computation producing a feedback action.
        #[must_use]
        pub fn future<F>(fut: F) -> Self
        where
            F: Future<Output = Option<Action>> + Send + 'static,
        {
            Effect::Future(Box::pin(fut))
        }

        /// Chain effects to run sequentially
        #[must_use]
        pub const fn chain(effects: Vec<Effect<Action>>) -> Effect<Action> {
            Effect::Sequential(effects)
        }

        /// Returns `true` for [`Effect::None`].
        #[must_use]
        pub const fn is_none(&self) -> bool {
            matches!(self, Effect::None)
        }
    }
}

/// Environment module - dependency injection traits.
pub mod environment {
    use chrono::{DateTime, Utc};

    /// Clock trait - abstracts time operations for testability
    ///
    /// Session expiry and reservation timestamps read the time through this
    /// trait so tests can pin or advance it.
    pub trait Clock: Send + Sync {
        /// Get the current time
        fn now(&self) -> DateTime<Utc>;
    }

    /// Wall clock backed by [`Utc::now`].
    #[derive(Debug, Clone, Copy, Default)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn now(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }
}
