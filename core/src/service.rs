//! Orchestration of scheduling operations.
//!
//! [`ClinicService`] validates input, delegates to the repository, records
//! metrics and dispatches best-effort notifications. It holds no state of its
//! own beyond its collaborators.

use crate::config::SchedulingConfig;
use crate::error::{Result, SchedulingError};
use crate::notifications::ReviewInvitationEmail;
use crate::providers::{ClinicRepository, Notifier};
use crate::rating::ProviderRating;
use crate::types::{
    Appointment, AppointmentDetails, AppointmentId, BookingRequest, ClientId, Identity, NewSlot,
    PendingReview, ProviderId, Review, ReviewDraft, ReviewInvitation, Slot, SlotId, UserId,
};
use chrono::{DateTime, NaiveDate, Utc};
use tracing::{debug, info, warn};

/// Scheduling, booking and review operations over a repository.
#[derive(Clone, Debug)]
pub struct ClinicService<R, N> {
    repository: R,
    notifier: N,
    config: SchedulingConfig,
}

impl<R, N> ClinicService<R, N>
where
    R: ClinicRepository,
    N: Notifier + Clone + 'static,
{
    /// Create a service.
    #[must_use]
    pub const fn new(repository: R, notifier: N, config: SchedulingConfig) -> Self {
        Self {
            repository,
            notifier,
            config,
        }
    }

    /// The active policy
    #[must_use]
    pub const fn config(&self) -> &SchedulingConfig {
        &self.config
    }

    /// The backing repository
    #[must_use]
    pub const fn repository(&self) -> &R {
        &self.repository
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Slots
    // ═══════════════════════════════════════════════════════════════════════

    /// Publish a new slot for a provider.
    ///
    /// # Errors
    ///
    /// - [`SchedulingError::InvalidTimeRange`] unless `start_time < end_time`
    /// - [`SchedulingError::ProviderNotFound`] or [`SchedulingError::SlotOverlap`] from the store
    pub async fn create_slot(
        &self,
        provider_id: ProviderId,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
    ) -> Result<Slot> {
        let slot = NewSlot {
            provider_id,
            start_time,
            end_time,
        };
        slot.validate()?;

        let created = self.repository.create_slot(&slot, &self.config).await?;
        info!(
            slot_id = %created.id,
            provider_id = %provider_id,
            start_time = %created.start_time,
            "Slot created"
        );
        Ok(created)
    }

    /// Slots of a provider, optionally for one UTC date.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the query fails.
    pub async fn list_slots(
        &self,
        provider_id: ProviderId,
        date: Option<NaiveDate>,
    ) -> Result<Vec<Slot>> {
        self.repository.list_slots(provider_id, date).await
    }

    /// Dates with at least one free slot.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the query fails.
    pub async fn list_available_dates(&self, provider_id: ProviderId) -> Result<Vec<NaiveDate>> {
        self.repository.list_available_dates(provider_id).await
    }

    /// Remove a free slot.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulingError::SlotNotRemovable`] for any reason the slot cannot go.
    pub async fn delete_slot(&self, provider_id: ProviderId, slot_id: SlotId) -> Result<()> {
        self.repository.delete_slot(provider_id, slot_id).await?;
        info!(slot_id = %slot_id, provider_id = %provider_id, "Slot deleted");
        Ok(())
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Appointments
    // ═══════════════════════════════════════════════════════════════════════

    /// Book a slot for a client.
    ///
    /// # Errors
    ///
    /// - [`SchedulingError::SlotNotAvailable`] if the slot is missing or taken
    /// - [`SchedulingError::ClientNotFound`] if the client does not exist
    pub async fn book_appointment(&self, request: BookingRequest) -> Result<Appointment> {
        match self.repository.book(&request).await {
            Ok(appointment) => {
                metrics::counter!("clinic.appointments.booked").increment(1);
                info!(
                    appointment_id = %appointment.id,
                    slot_id = %appointment.slot_id,
                    client_id = %appointment.client_id,
                    "Appointment booked"
                );
                Ok(appointment)
            }
            Err(error) => {
                if error == SchedulingError::SlotNotAvailable {
                    metrics::counter!("clinic.booking.rejected").increment(1);
                    warn!(slot_id = %request.slot_id, client_id = %request.client_id, "Slot not available");
                }
                Err(error)
            }
        }
    }

    /// Cancel a booked appointment.
    ///
    /// # Errors
    ///
    /// - [`SchedulingError::AppointmentNotFound`]
    /// - [`SchedulingError::InvalidTransition`] unless the appointment is booked
    pub async fn cancel_appointment(&self, id: AppointmentId) -> Result<Appointment> {
        let appointment = self.repository.cancel(id).await?;
        metrics::counter!("clinic.appointments.canceled").increment(1);
        info!(appointment_id = %id, slot_id = %appointment.slot_id, "Appointment canceled");
        Ok(appointment)
    }

    /// Complete a booked appointment and invite the client to review it.
    ///
    /// The invitation email is sent on a detached task and never affects the
    /// result.
    ///
    /// # Errors
    ///
    /// - [`SchedulingError::AppointmentNotFound`]
    /// - [`SchedulingError::InvalidTransition`] unless the appointment is booked
    pub async fn complete_appointment(&self, id: AppointmentId) -> Result<Appointment> {
        let completion = self.repository.complete(id).await?;
        metrics::counter!("clinic.appointments.completed").increment(1);
        info!(appointment_id = %id, "Appointment completed");

        if let Some(invitation) = completion.invitation {
            self.dispatch_review_invitation(invitation);
        }
        Ok(completion.appointment)
    }

    fn dispatch_review_invitation(&self, invitation: ReviewInvitation) {
        let repository = self.repository.clone();
        let notifier = self.notifier.clone();
        let email = ReviewInvitationEmail::render(&invitation, &self.config.public_base_url);

        tokio::spawn(async move {
            let appointment_id = invitation.appointment_id;
            let recipient = match repository.client_email(invitation.client_id).await {
                Ok(Some(recipient)) => recipient,
                Ok(None) => {
                    debug!(appointment_id = %appointment_id, "Client has no email, skipping invitation");
                    return;
                }
                Err(error) => {
                    metrics::counter!("clinic.notifications.failed").increment(1);
                    warn!(appointment_id = %appointment_id, error = %error, "Failed to resolve client email");
                    return;
                }
            };

            match notifier.send_review_invitation(&recipient, &email).await {
                Ok(()) => debug!(appointment_id = %appointment_id, "Review invitation sent"),
                Err(error) => {
                    metrics::counter!("clinic.notifications.failed").increment(1);
                    warn!(appointment_id = %appointment_id, error = %error, "Failed to send review invitation");
                }
            }
        });
    }

    /// Appointments of a client with slot window and review.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the query fails.
    pub async fn list_client_appointments(
        &self,
        client_id: ClientId,
    ) -> Result<Vec<AppointmentDetails>> {
        self.repository.list_client_appointments(client_id).await
    }

    /// Appointments on a provider's slots.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the query fails.
    pub async fn list_provider_appointments(
        &self,
        provider_id: ProviderId,
    ) -> Result<Vec<AppointmentDetails>> {
        self.repository.list_provider_appointments(provider_id).await
    }

    /// Appointments of an account, as a client or as a provider.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulingError::UserNotFound`] if the account has no clinical role.
    pub async fn list_user_appointments(&self, user_id: UserId) -> Result<Vec<AppointmentDetails>> {
        match self.repository.resolve_user(user_id).await? {
            Identity::Client { client_id } => self.list_client_appointments(client_id).await,
            Identity::Provider { provider_id } => self.list_provider_appointments(provider_id).await,
        }
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Reviews
    // ═══════════════════════════════════════════════════════════════════════

    /// Review a completed appointment, replacing any earlier review of it.
    ///
    /// # Errors
    ///
    /// - [`SchedulingError::RatingOutOfRange`]
    /// - [`SchedulingError::AppointmentNotFound`]
    /// - [`SchedulingError::InvalidTransition`] unless the appointment is completed
    pub async fn submit_appointment_review(
        &self,
        appointment_id: AppointmentId,
        draft: ReviewDraft,
    ) -> Result<Review> {
        self.config.rating_scale.validate(draft.rating)?;

        let (review, rating) = self
            .repository
            .upsert_appointment_review(appointment_id, &draft)
            .await?;
        record_review(&review, &rating);
        Ok(review)
    }

    /// Review a provider outside any appointment.
    ///
    /// # Errors
    ///
    /// - [`SchedulingError::RatingOutOfRange`]
    /// - [`SchedulingError::ReviewNotCreated`] if the provider or client is unknown
    pub async fn submit_provider_review(
        &self,
        provider_id: ProviderId,
        client_id: ClientId,
        draft: ReviewDraft,
    ) -> Result<Review> {
        self.config.rating_scale.validate(draft.rating)?;

        let (review, rating) = self
            .repository
            .create_provider_review(provider_id, client_id, &draft)
            .await?;
        record_review(&review, &rating);
        Ok(review)
    }

    /// Reviews of a provider from both sources.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the query fails.
    pub async fn list_provider_reviews(&self, provider_id: ProviderId) -> Result<Vec<Review>> {
        self.repository.list_provider_reviews(provider_id).await
    }

    /// Stored aggregate rating.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulingError::ProviderNotFound`] if unknown.
    pub async fn provider_rating(&self, provider_id: ProviderId) -> Result<f64> {
        self.repository.provider_rating(provider_id).await
    }

    /// Completed appointments still waiting for a review.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the query fails.
    pub async fn list_pending_reviews(&self, client_id: ClientId) -> Result<Vec<PendingReview>> {
        self.repository.list_pending_reviews(client_id).await
    }
}

fn record_review(review: &Review, rating: &ProviderRating) {
    metrics::counter!("clinic.reviews.submitted").increment(1);
    info!(
        review_id = %review.id,
        provider_id = %rating.provider_id,
        rating = rating.rating,
        reviews = rating.review_count(),
        "Provider rating recomputed"
    );
}
