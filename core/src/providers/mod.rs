//! Storage and delivery collaborators.
//!
//! The service depends on these traits and the binary wires concrete
//! implementations:
//!
//! - **Production**: `PostgresClinicStore` and an SMTP notifier
//! - **Testing**: the in-memory store and mock notifier from `clinic-testing`
//! - **Development**: [`ConsoleNotifier`], which only logs
//!
//! Every repository method is one unit of work. Implementations must run the
//! lifecycle reducer and execute its effects atomically with the write that
//! triggered them.

use crate::config::SchedulingConfig;
use crate::error::Result;
use crate::notifications::{NotifyError, ReviewInvitationEmail};
use crate::rating::ProviderRating;
use crate::types::{
    Appointment, AppointmentDetails, AppointmentId, BookingRequest, ClientId, Completion,
    Identity, NewSlot, PendingReview, ProviderId, Review, ReviewDraft, Slot, SlotId, UserId,
};
use chrono::NaiveDate;
use std::future::Future;

mod console;

pub use console::ConsoleNotifier;

/// Bookable slots of providers.
pub trait SlotRepository: Send + Sync {
    /// Persist a validated slot.
    ///
    /// # Errors
    ///
    /// - [`ProviderNotFound`](crate::SchedulingError::ProviderNotFound) if the provider does not exist
    /// - [`SlotOverlap`](crate::SchedulingError::SlotOverlap) if `config.reject_overlapping_slots`
    ///   is set and the window intersects another slot of the provider
    fn create_slot(
        &self,
        slot: &NewSlot,
        config: &SchedulingConfig,
    ) -> impl Future<Output = Result<Slot>> + Send;

    /// Slots of a provider ordered by start, optionally restricted to one UTC date.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the query fails.
    fn list_slots(
        &self,
        provider_id: ProviderId,
        date: Option<NaiveDate>,
    ) -> impl Future<Output = Result<Vec<Slot>>> + Send;

    /// Distinct UTC dates, ascending, on which the provider has a free slot.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the query fails.
    fn list_available_dates(
        &self,
        provider_id: ProviderId,
    ) -> impl Future<Output = Result<Vec<NaiveDate>>> + Send;

    /// Delete a free slot that never held an appointment.
    ///
    /// # Errors
    ///
    /// Returns [`SlotNotRemovable`](crate::SchedulingError::SlotNotRemovable) if the slot is
    /// missing, owned by another provider, booked or has appointment history.
    fn delete_slot(
        &self,
        provider_id: ProviderId,
        slot_id: SlotId,
    ) -> impl Future<Output = Result<()>> + Send;
}

/// Appointments and their lifecycle transitions.
pub trait AppointmentRepository: Send + Sync {
    /// Claim a free slot, reactivating a canceled appointment on it if one exists.
    ///
    /// # Errors
    ///
    /// - [`SlotNotAvailable`](crate::SchedulingError::SlotNotAvailable) if the slot is missing or booked
    /// - [`ClientNotFound`](crate::SchedulingError::ClientNotFound) if the client does not exist
    fn book(&self, request: &BookingRequest) -> impl Future<Output = Result<Appointment>> + Send;

    /// Cancel a booked appointment and free its slot.
    ///
    /// # Errors
    ///
    /// - [`AppointmentNotFound`](crate::SchedulingError::AppointmentNotFound)
    /// - [`InvalidTransition`](crate::SchedulingError::InvalidTransition) unless `BOOKED`
    fn cancel(&self, id: AppointmentId) -> impl Future<Output = Result<Appointment>> + Send;

    /// Complete a booked appointment and create its review invitation.
    ///
    /// Failure to create the invitation does not fail the completion.
    ///
    /// # Errors
    ///
    /// - [`AppointmentNotFound`](crate::SchedulingError::AppointmentNotFound)
    /// - [`InvalidTransition`](crate::SchedulingError::InvalidTransition) unless `BOOKED`
    fn complete(&self, id: AppointmentId) -> impl Future<Output = Result<Completion>> + Send;

    /// Appointments of a client, newest slot first.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the query fails.
    fn list_client_appointments(
        &self,
        client_id: ClientId,
    ) -> impl Future<Output = Result<Vec<AppointmentDetails>>> + Send;

    /// Appointments on a provider's slots, newest slot first.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the query fails.
    fn list_provider_appointments(
        &self,
        provider_id: ProviderId,
    ) -> impl Future<Output = Result<Vec<AppointmentDetails>>> + Send;
}

/// Reviews and the provider rating derived from them.
///
/// Every write recomputes the provider rating in the same transaction.
pub trait ReviewRepository: Send + Sync {
    /// Create or replace the review of a completed appointment.
    ///
    /// # Errors
    ///
    /// - [`AppointmentNotFound`](crate::SchedulingError::AppointmentNotFound)
    /// - [`InvalidTransition`](crate::SchedulingError::InvalidTransition) unless `COMPLETED`
    fn upsert_appointment_review(
        &self,
        appointment_id: AppointmentId,
        draft: &ReviewDraft,
    ) -> impl Future<Output = Result<(Review, ProviderRating)>> + Send;

    /// Record a general review of a provider.
    ///
    /// # Errors
    ///
    /// Returns [`ReviewNotCreated`](crate::SchedulingError::ReviewNotCreated) if the
    /// provider or client does not exist.
    fn create_provider_review(
        &self,
        provider_id: ProviderId,
        client_id: ClientId,
        draft: &ReviewDraft,
    ) -> impl Future<Output = Result<(Review, ProviderRating)>> + Send;

    /// Reviews of both sources, newest first.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the query fails.
    fn list_provider_reviews(
        &self,
        provider_id: ProviderId,
    ) -> impl Future<Output = Result<Vec<Review>>> + Send;

    /// Completed appointments of a client without a review, most recently completed first.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the query fails.
    fn list_pending_reviews(
        &self,
        client_id: ClientId,
    ) -> impl Future<Output = Result<Vec<PendingReview>>> + Send;

    /// Stored aggregate rating of a provider.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderNotFound`](crate::SchedulingError::ProviderNotFound) if unknown.
    fn provider_rating(&self, provider_id: ProviderId)
    -> impl Future<Output = Result<f64>> + Send;
}

/// Read access to the external account system.
pub trait IdentityResolver: Send + Sync {
    /// Clinical role of an account.
    ///
    /// # Errors
    ///
    /// Returns [`UserNotFound`](crate::SchedulingError::UserNotFound) if the account does
    /// not exist or has neither a client nor a provider profile.
    fn resolve_user(&self, user_id: UserId) -> impl Future<Output = Result<Identity>> + Send;

    /// Email address of a client's account, if any.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the query fails.
    fn client_email(
        &self,
        client_id: ClientId,
    ) -> impl Future<Output = Result<Option<String>>> + Send;
}

/// Outbound notifications.
pub trait Notifier: Send + Sync {
    /// Deliver a review invitation.
    ///
    /// # Errors
    ///
    /// Returns [`NotifyError`] if the message cannot be built or delivered.
    fn send_review_invitation(
        &self,
        to: &str,
        email: &ReviewInvitationEmail,
    ) -> impl Future<Output = std::result::Result<(), NotifyError>> + Send;
}

/// Everything the service needs from a storage backend.
pub trait ClinicRepository:
    SlotRepository + AppointmentRepository + ReviewRepository + IdentityResolver + Clone + 'static
{
}

impl<T> ClinicRepository for T where
    T: SlotRepository
        + AppointmentRepository
        + ReviewRepository
        + IdentityResolver
        + Clone
        + 'static
{
}
