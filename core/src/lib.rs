//! # Clinic Core
//!
//! Domain types and business rules for clinic appointment scheduling.
//!
//! ## Core Concepts
//!
//! - **Slot**: a bookable time window of one provider, free or booked
//! - **Appointment**: a client's claim on a slot, moved through its lifecycle
//!   by [`AppointmentReducer`]
//! - **Review**: a star rating from one of two sources, folded into the
//!   provider's aggregate by [`ProviderRating::fold`]
//! - **Repositories**: traits the storage backends implement
//!   (see [`providers`])
//! - **Service**: [`ClinicService`], the orchestration layer the HTTP
//!   handlers call
//!
//! ## Architecture Principles
//!
//! - Transitions are pure: the reducer returns effect values and the store
//!   executes them inside its own transaction
//! - Notification side effects are best effort and never fail a request
//! - Time is injected through [`Clock`]
//!
//! ## Example
//!
//! ```ignore
//! use clinic_core::{BookingRequest, ClinicService, SchedulingConfig};
//!
//! let service = ClinicService::new(store, notifier, SchedulingConfig::default());
//! let appointment = service
//!     .book_appointment(BookingRequest { slot_id, client_id, comments: None })
//!     .await?;
//! ```

pub mod config;
pub mod error;
pub mod lifecycle;
pub mod notifications;
pub mod providers;
pub mod rating;
pub mod service;
pub mod types;

pub use config::SchedulingConfig;
pub use environment::{Clock, SystemClock};
pub use error::{ErrorCategory, Result, SchedulingError};
pub use lifecycle::{AppointmentAction, AppointmentEffect, AppointmentReducer, AppointmentState};
pub use notifications::{NotifyError, ReviewInvitationEmail};
pub use rating::{ProviderRating, RatedReview, RatingScale};
pub use reducer::{Effects, Reducer};
pub use service::ClinicService;
pub use types::*;

// Re-export commonly used types
pub use chrono::{DateTime, NaiveDate, Utc};
pub use smallvec::{SmallVec, smallvec};

/// Reducer module - The trait for state transitions
///
/// Reducers are pure functions: `(State, Action, Environment) → Effects`.
/// They validate the action, update the state in place and describe the side
/// effects to run. A rejected action leaves the state untouched.
pub mod reducer {
    use crate::error::SchedulingError;
    use smallvec::SmallVec;

    /// Effects returned by a single reduction
    pub type Effects<E> = SmallVec<[E; 4]>;

    /// The Reducer trait
    ///
    /// # Type Parameters
    ///
    /// - `State`: The domain state this reducer operates on
    /// - `Action`: The action type this reducer processes
    /// - `Effect`: Side effect descriptions it produces
    /// - `Environment`: The injected dependencies this reducer needs
    pub trait Reducer {
        /// The state type this reducer operates on
        type State;

        /// The action type this reducer processes
        type Action;

        /// The effect type this reducer produces
        type Effect;

        /// The environment type with injected dependencies
        type Environment: ?Sized;

        /// Reduce an action into state changes and effects
        ///
        /// # Errors
        ///
        /// Returns an error if the action is not valid in the current state.
        /// The state is not modified in that case.
        fn reduce(
            &self,
            state: &mut Self::State,
            action: Self::Action,
            env: &Self::Environment,
        ) -> Result<Effects<Self::Effect>, SchedulingError>;
    }
}

/// Environment module - Injected dependencies
pub mod environment {
    use chrono::{DateTime, Utc};

    /// Clock trait - abstracts time operations for testability
    pub trait Clock: Send + Sync {
        /// Get the current time
        fn now(&self) -> DateTime<Utc>;
    }

    /// Wall clock
    #[derive(Clone, Copy, Debug, Default)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn now(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }
}
