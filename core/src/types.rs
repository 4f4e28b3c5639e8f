//! Domain types for clinic scheduling.
//!
//! Slots are bookable time windows owned by a provider, appointments are a
//! client's claim on a slot, and reviews feed the provider's aggregate rating.
//! Identifiers are the surrogate keys assigned by the store.

use crate::error::SchedulingError;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Identifiers
// ============================================================================

macro_rules! surrogate_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl $name {
            /// Get the raw database key
            #[must_use]
            pub const fn get(self) -> i64 {
                self.0
            }
        }

        impl From<i64> for $name {
            fn from(value: i64) -> Self {
                Self(value)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

surrogate_id!(
    /// Identifier of an account in the external identity system
    UserId
);
surrogate_id!(
    /// Identifier of a client (patient) profile
    ClientId
);
surrogate_id!(
    /// Identifier of a provider (doctor) profile
    ProviderId
);
surrogate_id!(
    /// Identifier of a bookable slot
    SlotId
);
surrogate_id!(
    /// Identifier of an appointment
    AppointmentId
);
surrogate_id!(
    /// Identifier of a review, unique within its source table
    ReviewId
);

// ============================================================================
// Slots
// ============================================================================

/// A bookable time window for exactly one provider.
///
/// `is_booked` is true exactly when an appointment on this slot is `BOOKED`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slot {
    /// Slot identifier
    pub id: SlotId,
    /// Owning provider
    pub provider_id: ProviderId,
    /// Window start (inclusive)
    pub start_time: DateTime<Utc>,
    /// Window end (exclusive)
    pub end_time: DateTime<Utc>,
    /// Length of the window in whole minutes
    pub duration_minutes: i32,
    /// Whether an active booking holds this slot
    pub is_booked: bool,
    /// When the slot was created
    pub created_at: DateTime<Utc>,
    /// Last time the booked flag changed
    pub updated_at: DateTime<Utc>,
}

impl Slot {
    /// UTC calendar date the slot starts on
    #[must_use]
    pub fn date(&self) -> NaiveDate {
        self.start_time.date_naive()
    }

    /// Whether this window intersects `[start, end)`
    #[must_use]
    pub fn overlaps(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        self.start_time < end && start < self.end_time
    }
}

/// A slot a provider wants to publish.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewSlot {
    /// Owning provider
    pub provider_id: ProviderId,
    /// Window start
    pub start_time: DateTime<Utc>,
    /// Window end
    pub end_time: DateTime<Utc>,
}

impl NewSlot {
    /// Check the window is well formed.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulingError::InvalidTimeRange`] unless `start_time < end_time`.
    pub fn validate(&self) -> Result<(), SchedulingError> {
        if self.start_time < self.end_time {
            Ok(())
        } else {
            Err(SchedulingError::InvalidTimeRange)
        }
    }

    /// Window length in whole minutes, truncated
    #[must_use]
    pub fn duration_minutes(&self) -> i32 {
        let minutes = (self.end_time - self.start_time).num_minutes();
        i32::try_from(minutes).unwrap_or(i32::MAX)
    }
}

// ============================================================================
// Appointments
// ============================================================================

/// Lifecycle status of an appointment.
///
/// `COMPLETED` and `NO_SHOW` are terminal. `CANCELED` may be reactivated
/// back to `BOOKED` by a new booking on the same slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AppointmentStatus {
    /// Holds its slot
    Booked,
    /// Released its slot, may be reactivated
    Canceled,
    /// Visit happened
    Completed,
    /// Client did not show up
    NoShow,
}

impl AppointmentStatus {
    /// Storage representation
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Booked => "BOOKED",
            Self::Canceled => "CANCELED",
            Self::Completed => "COMPLETED",
            Self::NoShow => "NO_SHOW",
        }
    }

    /// Whether no further transition is possible
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::NoShow)
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AppointmentStatus {
    type Err = SchedulingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "BOOKED" => Ok(Self::Booked),
            "CANCELED" => Ok(Self::Canceled),
            "COMPLETED" => Ok(Self::Completed),
            "NO_SHOW" => Ok(Self::NoShow),
            other => Err(SchedulingError::Storage(format!(
                "unknown appointment status: {other}"
            ))),
        }
    }
}

/// A client's claim on a slot. Never hard-deleted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Appointment {
    /// Appointment identifier
    pub id: AppointmentId,
    /// Slot held by this appointment, unique across appointments
    pub slot_id: SlotId,
    /// Client who booked most recently
    pub client_id: ClientId,
    /// Current lifecycle status
    pub status: AppointmentStatus,
    /// Free-text note from the client
    pub comments: Option<String>,
    /// First booking time
    pub created_at: DateTime<Utc>,
    /// Last transition time
    pub updated_at: DateTime<Utc>,
    /// Set while canceled
    pub canceled_at: Option<DateTime<Utc>>,
    /// Set once completed
    pub completed_at: Option<DateTime<Utc>>,
}

/// Request to book a slot.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingRequest {
    /// Slot to claim
    pub slot_id: SlotId,
    /// Client making the booking
    pub client_id: ClientId,
    /// Optional note for the provider
    #[serde(default)]
    pub comments: Option<String>,
}

/// Result of completing an appointment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Completion {
    /// The appointment in its `COMPLETED` state
    pub appointment: Appointment,
    /// Invitation created by this completion, if any
    pub invitation: Option<ReviewInvitation>,
}

/// An appointment joined with its slot window and review, for listings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AppointmentDetails {
    /// Appointment identifier
    pub appointment_id: AppointmentId,
    /// Current status
    pub status: AppointmentStatus,
    /// Client holding the appointment
    pub client_id: ClientId,
    /// Provider owning the slot
    pub provider_id: ProviderId,
    /// Slot identifier
    pub slot_id: SlotId,
    /// Slot start
    pub slot_start: DateTime<Utc>,
    /// Slot end
    pub slot_end: DateTime<Utc>,
    /// Client note
    pub comments: Option<String>,
    /// Appointment-linked review, if submitted
    pub review: Option<Review>,
}

// ============================================================================
// Reviews
// ============================================================================

/// Created once per completed appointment to invite the client to review.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewInvitation {
    /// Completed appointment, unique across invitations
    pub appointment_id: AppointmentId,
    /// Client to invite
    pub client_id: ClientId,
    /// Provider to be reviewed
    pub provider_id: ProviderId,
    /// When the invitation was created
    pub created_at: DateTime<Utc>,
}

/// Where a review came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum ReviewSource {
    /// Tied to one completed appointment
    Appointment {
        /// Reviewed appointment
        appointment_id: AppointmentId,
    },
    /// Free-standing review of the provider
    General,
}

impl ReviewSource {
    /// Appointment id for appointment-linked reviews
    #[must_use]
    pub const fn appointment_id(self) -> Option<AppointmentId> {
        match self {
            Self::Appointment { appointment_id } => Some(appointment_id),
            Self::General => None,
        }
    }
}

impl From<Option<AppointmentId>> for ReviewSource {
    fn from(appointment_id: Option<AppointmentId>) -> Self {
        appointment_id.map_or(Self::General, |appointment_id| Self::Appointment {
            appointment_id,
        })
    }
}

/// A stored review of either source.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Review {
    /// Review identifier within its source
    pub id: ReviewId,
    /// Reviewed provider
    pub provider_id: ProviderId,
    /// Reviewing client
    pub client_id: ClientId,
    /// Provenance
    #[serde(flatten)]
    pub source: ReviewSource,
    /// Star rating
    pub rating: i32,
    /// Optional text
    pub comment: Option<String>,
    /// When first written
    pub created_at: DateTime<Utc>,
    /// When last written
    pub updated_at: DateTime<Utc>,
}

/// Rating and comment submitted by a client.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewDraft {
    /// Star rating
    pub rating: i32,
    /// Optional text
    #[serde(default)]
    pub comment: Option<String>,
}

/// A completed appointment still waiting for its review.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingReview {
    /// Completed appointment
    pub appointment_id: AppointmentId,
    /// Provider to review
    pub provider_id: ProviderId,
    /// Slot start
    pub slot_start: DateTime<Utc>,
    /// Slot end
    pub slot_end: DateTime<Utc>,
    /// Completion time
    pub completed_at: Option<DateTime<Utc>>,
}

// ============================================================================
// Identity
// ============================================================================

/// Clinical role of an account, as resolved by the identity collaborator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum Identity {
    /// Account owns a client profile
    Client {
        /// Client profile
        client_id: ClientId,
    },
    /// Account owns a provider profile
    Provider {
        /// Provider profile
        provider_id: ProviderId,
    },
}
