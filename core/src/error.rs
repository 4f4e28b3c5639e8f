//! Error types for scheduling, booking and review operations.

use crate::types::AppointmentStatus;
use thiserror::Error;

/// Result type alias for scheduling operations.
pub type Result<T> = std::result::Result<T, SchedulingError>;

/// Error taxonomy for the scheduling core.
///
/// Every variant belongs to exactly one [`ErrorCategory`], which is what
/// outer layers (HTTP, logging) dispatch on.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SchedulingError {
    // ═══════════════════════════════════════════════════════════
    // Validation Errors
    // ═══════════════════════════════════════════════════════════

    /// Slot window does not start before it ends.
    #[error("Slot start time must be before end time")]
    InvalidTimeRange,

    /// Rating outside the configured scale.
    #[error("Rating {rating} is outside the allowed range {min}..={max}")]
    RatingOutOfRange {
        /// Submitted rating
        rating: i32,
        /// Lowest accepted rating
        min: i32,
        /// Highest accepted rating
        max: i32,
    },

    /// An id in the request body disagrees with the id in the path.
    #[error("Path id {path} does not match body id {body}")]
    IdMismatch {
        /// Id taken from the path
        path: i64,
        /// Id taken from the body
        body: i64,
    },

    // ═══════════════════════════════════════════════════════════
    // Conflicts
    // ═══════════════════════════════════════════════════════════

    /// Slot is missing or already booked.
    #[error("Slot not available")]
    SlotNotAvailable,

    /// Slot is missing, owned by another provider, booked or has history.
    #[error("Slot not removable")]
    SlotNotRemovable,

    /// Slot window intersects another slot of the same provider.
    #[error("Slot overlaps an existing slot")]
    SlotOverlap,

    /// Appointment is not in a state that allows the action.
    #[error("Cannot {action} an appointment in status {from}")]
    InvalidTransition {
        /// Status the appointment was in
        from: AppointmentStatus,
        /// Attempted action
        action: &'static str,
    },

    /// A review referenced an unknown provider or client.
    #[error("Review not created")]
    ReviewNotCreated,

    // ═══════════════════════════════════════════════════════════
    // Missing Resources
    // ═══════════════════════════════════════════════════════════

    /// Appointment does not exist.
    #[error("Appointment not found")]
    AppointmentNotFound,

    /// Provider does not exist.
    #[error("Provider not found")]
    ProviderNotFound,

    /// Client does not exist.
    #[error("Client not found")]
    ClientNotFound,

    /// User does not exist or has no clinical role.
    #[error("User not found")]
    UserNotFound,

    // ═══════════════════════════════════════════════════════════
    // Infrastructure
    // ═══════════════════════════════════════════════════════════

    /// The backing store failed.
    #[error("Storage error: {0}")]
    Storage(String),
}

/// Coarse classification of [`SchedulingError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Malformed input
    Validation,
    /// Well-formed input rejected by current state
    Conflict,
    /// Referenced entity does not exist
    NotFound,
    /// Server-side fault
    Storage,
}

impl SchedulingError {
    /// Category of this error.
    ///
    /// # Examples
    ///
    /// ```
    /// # use clinic_core::{ErrorCategory, SchedulingError};
    /// assert_eq!(SchedulingError::SlotNotAvailable.category(), ErrorCategory::Conflict);
    /// assert_eq!(SchedulingError::ClientNotFound.category(), ErrorCategory::NotFound);
    /// ```
    #[must_use]
    pub const fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidTimeRange | Self::RatingOutOfRange { .. } | Self::IdMismatch { .. } => {
                ErrorCategory::Validation
            }
            Self::SlotNotAvailable
            | Self::SlotNotRemovable
            | Self::SlotOverlap
            | Self::InvalidTransition { .. }
            | Self::ReviewNotCreated => ErrorCategory::Conflict,
            Self::AppointmentNotFound
            | Self::ProviderNotFound
            | Self::ClientNotFound
            | Self::UserNotFound => ErrorCategory::NotFound,
            Self::Storage(_) => ErrorCategory::Storage,
        }
    }

    /// Returns `true` if the caller can fix this by changing the request.
    #[must_use]
    pub const fn is_user_error(&self) -> bool {
        !matches!(self.category(), ErrorCategory::Storage)
    }
}
