//! Appointment lifecycle.
//!
//! The reducer validates a transition, updates the appointment in place and
//! returns the side effects the store must execute in the same transaction.
//!
//! | From       | Action   | To          | Effects                                      |
//! |------------|----------|-------------|----------------------------------------------|
//! | `BOOKED`   | cancel   | `CANCELED`  | release the slot                             |
//! | `BOOKED`   | complete | `COMPLETED` | release the slot, create a review invitation |
//! | `CANCELED` | book     | `BOOKED`    | reserve the slot                             |
//!
//! A slot is booked exactly while its appointment is `BOOKED`. A completed
//! appointment is terminal, so its released slot cannot be booked again.

use crate::environment::Clock;
use crate::error::SchedulingError;
use crate::reducer::{Effects, Reducer};
use crate::types::{Appointment, AppointmentId, AppointmentStatus, ClientId, ProviderId, SlotId};
use smallvec::smallvec;

/// An appointment together with the provider owning its slot.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AppointmentState {
    /// The appointment being transitioned
    pub appointment: Appointment,
    /// Provider owning the appointment's slot
    pub provider_id: ProviderId,
}

/// Inputs to the lifecycle reducer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AppointmentAction {
    /// Reactivate a canceled appointment for a (possibly different) client
    Book {
        /// New holder
        client_id: ClientId,
        /// New note, replacing the previous one
        comments: Option<String>,
    },
    /// Release the slot
    Cancel,
    /// Mark the visit as done
    Complete,
}

impl AppointmentAction {
    /// Verb used in error messages and logs
    #[must_use]
    pub const fn verb(&self) -> &'static str {
        match self {
            Self::Book { .. } => "book",
            Self::Cancel => "cancel",
            Self::Complete => "complete",
        }
    }
}

/// Side effects of a lifecycle transition.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AppointmentEffect {
    /// Flip the slot to booked, failing if it is not free
    ReserveSlot {
        /// Slot to claim
        slot_id: SlotId,
    },
    /// Flip the slot back to free
    ReleaseSlot {
        /// Slot to release
        slot_id: SlotId,
    },
    /// Create the review invitation for a completed appointment, best effort
    CreateReviewInvitation {
        /// Completed appointment
        appointment_id: AppointmentId,
        /// Client to invite
        client_id: ClientId,
        /// Provider to review
        provider_id: ProviderId,
    },
}

/// Reducer for [`AppointmentState`].
#[derive(Clone, Copy, Debug, Default)]
pub struct AppointmentReducer;

impl AppointmentReducer {
    /// Create a reducer
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Effects of a first booking on a slot with no appointment yet.
    #[must_use]
    pub fn first_booking_effects(slot_id: SlotId) -> Effects<AppointmentEffect> {
        smallvec![AppointmentEffect::ReserveSlot { slot_id }]
    }
}

impl Reducer for AppointmentReducer {
    type State = AppointmentState;
    type Action = AppointmentAction;
    type Effect = AppointmentEffect;
    type Environment = dyn Clock;

    fn reduce(
        &self,
        state: &mut AppointmentState,
        action: AppointmentAction,
        clock: &dyn Clock,
    ) -> Result<Effects<AppointmentEffect>, SchedulingError> {
        let appointment = &mut state.appointment;
        let from = appointment.status;
        let now = clock.now();

        match (from, action) {
            (AppointmentStatus::Canceled, AppointmentAction::Book { client_id, comments }) => {
                appointment.client_id = client_id;
                appointment.comments = comments;
                appointment.status = AppointmentStatus::Booked;
                appointment.canceled_at = None;
                appointment.completed_at = None;
                appointment.updated_at = now;
                Ok(Self::first_booking_effects(appointment.slot_id))
            }
            (AppointmentStatus::Booked, AppointmentAction::Cancel) => {
                appointment.status = AppointmentStatus::Canceled;
                appointment.canceled_at = Some(now);
                appointment.updated_at = now;
                Ok(smallvec![AppointmentEffect::ReleaseSlot {
                    slot_id: appointment.slot_id
                }])
            }
            (AppointmentStatus::Booked, AppointmentAction::Complete) => {
                appointment.status = AppointmentStatus::Completed;
                appointment.completed_at = Some(now);
                appointment.updated_at = now;
                Ok(smallvec![
                    AppointmentEffect::ReleaseSlot {
                        slot_id: appointment.slot_id
                    },
                    AppointmentEffect::CreateReviewInvitation {
                        appointment_id: appointment.id,
                        client_id: appointment.client_id,
                        provider_id: state.provider_id,
                    },
                ])
            }
            (from, action) => Err(SchedulingError::InvalidTransition {
                from,
                action: action.verb(),
            }),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use proptest::prelude::*;

    struct StepClock(DateTime<Utc>);

    impl Clock for StepClock {
        fn now(&self) -> DateTime<Utc> {
            self.0
        }
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()
    }

    fn booked() -> AppointmentState {
        AppointmentState {
            appointment: Appointment {
                id: AppointmentId(1),
                slot_id: SlotId(10),
                client_id: ClientId(100),
                status: AppointmentStatus::Booked,
                comments: Some("first visit".into()),
                created_at: t0(),
                updated_at: t0(),
                canceled_at: None,
                completed_at: None,
            },
            provider_id: ProviderId(7),
        }
    }

    #[test]
    fn cancel_releases_the_slot() {
        let clock = StepClock(t0() + Duration::hours(1));
        let mut state = booked();

        let effects = AppointmentReducer.reduce(&mut state, AppointmentAction::Cancel, &clock).unwrap();

        assert_eq!(state.appointment.status, AppointmentStatus::Canceled);
        assert_eq!(state.appointment.canceled_at, Some(clock.0));
        assert_eq!(state.appointment.updated_at, clock.0);
        assert_eq!(effects.as_slice(), &[AppointmentEffect::ReleaseSlot { slot_id: SlotId(10) }]);
    }

    #[test]
    fn complete_releases_the_slot_and_invites_a_review() {
        let clock = StepClock(t0() + Duration::hours(2));
        let mut state = booked();

        let effects = AppointmentReducer.reduce(&mut state, AppointmentAction::Complete, &clock).unwrap();

        assert_eq!(state.appointment.status, AppointmentStatus::Completed);
        assert_eq!(state.appointment.completed_at, Some(clock.0));
        assert_eq!(
            effects.as_slice(),
            &[
                AppointmentEffect::ReleaseSlot { slot_id: SlotId(10) },
                AppointmentEffect::CreateReviewInvitation {
                    appointment_id: AppointmentId(1),
                    client_id: ClientId(100),
                    provider_id: ProviderId(7),
                },
            ]
        );
    }

    #[test]
    fn completed_appointments_cannot_be_rebooked() {
        let clock = StepClock(t0() + Duration::hours(2));
        let mut state = booked();
        AppointmentReducer.reduce(&mut state, AppointmentAction::Complete, &clock).unwrap();

        let result = AppointmentReducer.reduce(
            &mut state,
            AppointmentAction::Book {
                client_id: ClientId(200),
                comments: None,
            },
            &clock,
        );

        assert_eq!(
            result.unwrap_err(),
            SchedulingError::InvalidTransition {
                from: AppointmentStatus::Completed,
                action: "book",
            }
        );
        assert_eq!(state.appointment.client_id, ClientId(100));
    }

    #[test]
    fn rebooking_reactivates_for_the_new_client() {
        let clock = StepClock(t0() + Duration::hours(3));
        let mut state = booked();
        AppointmentReducer.reduce(&mut state, AppointmentAction::Cancel, &clock).unwrap();

        let effects = AppointmentReducer
            .reduce(
                &mut state,
                AppointmentAction::Book {
                    client_id: ClientId(200),
                    comments: None,
                },
                &clock,
            )
            .unwrap();

        let appointment = &state.appointment;
        assert_eq!(appointment.id, AppointmentId(1));
        assert_eq!(appointment.client_id, ClientId(200));
        assert_eq!(appointment.status, AppointmentStatus::Booked);
        assert_eq!(appointment.comments, None);
        assert_eq!(appointment.canceled_at, None);
        assert_eq!(appointment.created_at, t0());
        assert_eq!(effects.as_slice(), &[AppointmentEffect::ReserveSlot { slot_id: SlotId(10) }]);
    }

    #[test]
    fn booking_an_active_appointment_is_rejected() {
        let clock = StepClock(t0());
        let mut state = booked();
        let before = state.clone();

        let result = AppointmentReducer.reduce(
            &mut state,
            AppointmentAction::Book {
                client_id: ClientId(1),
                comments: None,
            },
            &clock,
        );

        assert_eq!(
            result.unwrap_err(),
            SchedulingError::InvalidTransition {
                from: AppointmentStatus::Booked,
                action: "book",
            }
        );
        assert_eq!(state, before);
    }

    fn any_action() -> impl Strategy<Value = AppointmentAction> {
        prop_oneof![
            Just(AppointmentAction::Cancel),
            Just(AppointmentAction::Complete),
            (1i64..5).prop_map(|id| AppointmentAction::Book {
                client_id: ClientId(id),
                comments: None,
            }),
        ]
    }

    proptest! {
        #[test]
        fn terminal_states_never_move(actions in proptest::collection::vec(any_action(), 1..24)) {
            let clock = StepClock(t0());
            let mut state = booked();
            let mut terminal: Option<AppointmentState> = None;

            for action in actions {
                let result = AppointmentReducer.reduce(&mut state, action, &clock);
                if let Some(frozen) = &terminal {
                    prop_assert!(result.is_err());
                    prop_assert_eq!(&state, frozen);
                } else if state.appointment.status.is_terminal() {
                    terminal = Some(state.clone());
                }
            }
        }

        #[test]
        fn slot_is_booked_exactly_while_booked(actions in proptest::collection::vec(any_action(), 1..24)) {
            let clock = StepClock(t0());
            let mut state = booked();
            let mut slot_booked = true;

            for action in actions {
                if let Ok(effects) = AppointmentReducer.reduce(&mut state, action, &clock) {
                    for effect in effects {
                        match effect {
                            AppointmentEffect::ReserveSlot { .. } => {
                                prop_assert!(!slot_booked);
                                slot_booked = true;
                            }
                            AppointmentEffect::ReleaseSlot { .. } => {
                                prop_assert!(slot_booked);
                                slot_booked = false;
                            }
                            AppointmentEffect::CreateReviewInvitation { .. } => {}
                        }
                    }
                }
                prop_assert_eq!(slot_booked, state.appointment.status == AppointmentStatus::Booked);
            }
        }
    }
}
