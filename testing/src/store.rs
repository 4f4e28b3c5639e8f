//! In-memory clinic store.
//!
//! Every operation runs inside one critical section over all tables, which
//! gives the same all-or-nothing behavior as a database transaction.

use clinic_core::environment::Clock;
use clinic_core::providers::{
    AppointmentRepository, IdentityResolver, ReviewRepository, SlotRepository,
};
use clinic_core::{
    Appointment, AppointmentAction, AppointmentDetails, AppointmentEffect, AppointmentId, AppointmentReducer,
    AppointmentState, AppointmentStatus, BookingRequest, ClientId, Completion, Identity, NewSlot,
    PendingReview, ProviderId, ProviderRating, RatedReview, Reducer, Result, Review, ReviewDraft,
    ReviewId, ReviewInvitation, ReviewSource, SchedulingConfig, SchedulingError, Slot, SlotId,
    UserId,
};
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::warn;

struct ProviderRecord {
    user_id: UserId,
    rating: f64,
}

#[derive(Default)]
struct Tables {
    next_id: i64,
    users: HashMap<UserId, String>,
    clients: HashMap<ClientId, UserId>,
    providers: HashMap<ProviderId, ProviderRecord>,
    slots: BTreeMap<SlotId, Slot>,
    appointments: BTreeMap<AppointmentId, Appointment>,
    appointment_reviews: BTreeMap<AppointmentId, Review>,
    provider_reviews: Vec<Review>,
    invitations: BTreeMap<AppointmentId, ReviewInvitation>,
}

impl Tables {
    const fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn provider_of(&self, slot_id: SlotId) -> Result<ProviderId> {
        self.slots
            .get(&slot_id)
            .map(|slot| slot.provider_id)
            .ok_or_else(|| SchedulingError::Storage(format!("slot {slot_id} missing")))
    }

    fn load_state(&self, id: AppointmentId) -> Result<AppointmentState> {
        let appointment = self
            .appointments
            .get(&id)
            .cloned()
            .ok_or(SchedulingError::AppointmentNotFound)?;
        let provider_id = self.provider_of(appointment.slot_id)?;
        Ok(AppointmentState {
            appointment,
            provider_id,
        })
    }

    fn apply(
        &mut self,
        effect: AppointmentEffect,
        now: DateTime<Utc>,
        fail_invitations: bool,
    ) -> Result<Option<ReviewInvitation>> {
        match effect {
            AppointmentEffect::ReserveSlot { slot_id } => {
                let slot = self
                    .slots
                    .get_mut(&slot_id)
                    .filter(|slot| !slot.is_booked)
                    .ok_or(SchedulingError::SlotNotAvailable)?;
                slot.is_booked = true;
                slot.updated_at = now;
                Ok(None)
            }
            AppointmentEffect::ReleaseSlot { slot_id } => {
                if let Some(slot) = self.slots.get_mut(&slot_id) {
                    slot.is_booked = false;
                    slot.updated_at = now;
                }
                Ok(None)
            }
            AppointmentEffect::CreateReviewInvitation {
                appointment_id,
                client_id,
                provider_id,
            } => {
                if fail_invitations {
                    warn!(appointment_id = %appointment_id, "Failed to create review invitation");
                    return Ok(None);
                }
                if self.invitations.contains_key(&appointment_id) {
                    return Ok(None);
                }
                let invitation = ReviewInvitation {
                    appointment_id,
                    client_id,
                    provider_id,
                    created_at: now,
                };
                self.invitations.insert(appointment_id, invitation.clone());
                Ok(Some(invitation))
            }
        }
    }

    fn recompute_rating(&mut self, provider_id: ProviderId) -> Result<ProviderRating> {
        let linked = self
            .appointment_reviews
            .values()
            .filter(|review| review.provider_id == provider_id);
        let general = self
            .provider_reviews
            .iter()
            .filter(|review| review.provider_id == provider_id);
        let rating = ProviderRating::fold(
            provider_id,
            linked.chain(general).map(|review| RatedReview {
                source: review.source,
                rating: review.rating,
            }),
        );

        let provider = self
            .providers
            .get_mut(&provider_id)
            .ok_or(SchedulingError::ProviderNotFound)?;
        provider.rating = rating.rating;
        Ok(rating)
    }

    fn details(&self, appointment: &Appointment) -> Option<AppointmentDetails> {
        let slot = self.slots.get(&appointment.slot_id)?;
        Some(AppointmentDetails {
            appointment_id: appointment.id,
            status: appointment.status,
            client_id: appointment.client_id,
            provider_id: slot.provider_id,
            slot_id: slot.id,
            slot_start: slot.start_time,
            slot_end: slot.end_time,
            comments: appointment.comments.clone(),
            review: self.appointment_reviews.get(&appointment.id).cloned(),
        })
    }

    fn list_details(&self, keep: impl Fn(&AppointmentDetails) -> bool) -> Vec<AppointmentDetails> {
        let mut details: Vec<_> = self
            .appointments
            .values()
            .filter_map(|appointment| self.details(appointment))
            .filter(|details| keep(details))
            .collect();
        details.sort_by(|a, b| {
            b.slot_start
                .cmp(&a.slot_start)
                .then(b.appointment_id.cmp(&a.appointment_id))
        });
        details
    }
}

/// Repository backed by in-process maps.
///
/// Clones share the same data.
#[derive(Clone)]
pub struct InMemoryClinicStore {
    tables: Arc<Mutex<Tables>>,
    clock: Arc<dyn Clock>,
    fail_invitations: Arc<AtomicBool>,
}

impl InMemoryClinicStore {
    /// Create an empty store.
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            tables: Arc::new(Mutex::new(Tables::default())),
            clock,
            fail_invitations: Arc::new(AtomicBool::new(false)),
        }
    }

    fn tables(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Fixtures
    // ═══════════════════════════════════════════════════════════════════════

    /// Add an account without a clinical role.
    pub fn register_user(&self, email: &str) -> UserId {
        let mut tables = self.tables();
        let user_id = UserId(tables.next_id());
        tables.users.insert(user_id, email.to_string());
        user_id
    }

    /// Add an account with a client profile.
    pub fn register_client(&self, email: &str) -> (UserId, ClientId) {
        let user_id = self.register_user(email);
        let mut tables = self.tables();
        let client_id = ClientId(tables.next_id());
        tables.clients.insert(client_id, user_id);
        (user_id, client_id)
    }

    /// Add an account with a provider profile.
    pub fn register_provider(&self, email: &str) -> (UserId, ProviderId) {
        let user_id = self.register_user(email);
        let mut tables = self.tables();
        let provider_id = ProviderId(tables.next_id());
        tables.providers.insert(
            provider_id,
            ProviderRecord {
                user_id,
                rating: 0.0,
            },
        );
        (user_id, provider_id)
    }

    /// Make review invitation creation fail, as a broken insert would.
    pub fn fail_review_invitations(&self, fail: bool) {
        self.fail_invitations.store(fail, Ordering::SeqCst);
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Inspection
    // ═══════════════════════════════════════════════════════════════════════

    /// Current state of a slot.
    #[must_use]
    pub fn slot(&self, id: SlotId) -> Option<Slot> {
        self.tables().slots.get(&id).cloned()
    }

    /// Current state of an appointment.
    #[must_use]
    pub fn appointment(&self, id: AppointmentId) -> Option<Appointment> {
        self.tables().appointments.get(&id).cloned()
    }

    /// Review invitation of an appointment.
    #[must_use]
    pub fn invitation(&self, appointment_id: AppointmentId) -> Option<ReviewInvitation> {
        self.tables().invitations.get(&appointment_id).cloned()
    }

    /// Number of review invitations.
    #[must_use]
    pub fn invitation_count(&self) -> usize {
        self.tables().invitations.len()
    }

    /// Whether every slot is booked exactly when it holds a `BOOKED` appointment.
    #[must_use]
    pub fn booked_flags_consistent(&self) -> bool {
        let tables = self.tables();
        tables.slots.values().all(|slot| {
            let active = tables
                .appointments
                .values()
                .any(|a| a.slot_id == slot.id && a.status == AppointmentStatus::Booked);
            slot.is_booked == active
        })
    }
}

impl SlotRepository for InMemoryClinicStore {
    async fn create_slot(&self, slot: &NewSlot, config: &SchedulingConfig) -> Result<Slot> {
        let mut tables = self.tables();
        if !tables.providers.contains_key(&slot.provider_id) {
            return Err(SchedulingError::ProviderNotFound);
        }
        if config.reject_overlapping_slots
            && tables.slots.values().any(|existing| {
                existing.provider_id == slot.provider_id
                    && existing.overlaps(slot.start_time, slot.end_time)
            })
        {
            return Err(SchedulingError::SlotOverlap);
        }

        let now = self.clock.now();
        let created = Slot {
            id: SlotId(tables.next_id()),
            provider_id: slot.provider_id,
            start_time: slot.start_time,
            end_time: slot.end_time,
            duration_minutes: slot.duration_minutes(),
            is_booked: false,
            created_at: now,
            updated_at: now,
        };
        tables.slots.insert(created.id, created.clone());
        Ok(created)
    }

    async fn list_slots(&self, provider_id: ProviderId, date: Option<NaiveDate>) -> Result<Vec<Slot>> {
        let tables = self.tables();
        let mut slots: Vec<Slot> = tables
            .slots
            .values()
            .filter(|slot| slot.provider_id == provider_id)
            .filter(|slot| date.is_none_or(|date| slot.date() == date))
            .cloned()
            .collect();
        slots.sort_by(|a, b| a.start_time.cmp(&b.start_time).then(a.id.cmp(&b.id)));
        Ok(slots)
    }

    async fn list_available_dates(&self, provider_id: ProviderId) -> Result<Vec<NaiveDate>> {
        let tables = self.tables();
        let dates: BTreeSet<NaiveDate> = tables
            .slots
            .values()
            .filter(|slot| slot.provider_id == provider_id && !slot.is_booked)
            .map(Slot::date)
            .collect();
        Ok(dates.into_iter().collect())
    }

    async fn delete_slot(&self, provider_id: ProviderId, slot_id: SlotId) -> Result<()> {
        let mut tables = self.tables();
        let removable = tables
            .slots
            .get(&slot_id)
            .is_some_and(|slot| slot.provider_id == provider_id && !slot.is_booked)
            && !tables.appointments.values().any(|a| a.slot_id == slot_id);
        if !removable {
            return Err(SchedulingError::SlotNotRemovable);
        }
        tables.slots.remove(&slot_id);
        Ok(())
    }
}

impl AppointmentRepository for InMemoryClinicStore {
    async fn book(&self, request: &BookingRequest) -> Result<Appointment> {
        let mut tables = self.tables();
        if !tables.clients.contains_key(&request.client_id) {
            return Err(SchedulingError::ClientNotFound);
        }
        let provider_id = match tables.slots.get(&request.slot_id) {
            Some(slot) if !slot.is_booked => slot.provider_id,
            _ => return Err(SchedulingError::SlotNotAvailable),
        };

        let now = self.clock.now();
        let existing = tables
            .appointments
            .values()
            .find(|a| a.slot_id == request.slot_id)
            .cloned();

        let (appointment, effects) = if let Some(appointment) = existing {
            let mut state = AppointmentState {
                appointment,
                provider_id,
            };
            let effects = AppointmentReducer
                .reduce(
                    &mut state,
                    AppointmentAction::Book {
                        client_id: request.client_id,
                        comments: request.comments.clone(),
                    },
                    self.clock.as_ref(),
                )
                .map_err(|_| SchedulingError::SlotNotAvailable)?;
            (state.appointment, effects)
        } else {
            let appointment = Appointment {
                id: AppointmentId(tables.next_id()),
                slot_id: request.slot_id,
                client_id: request.client_id,
                status: AppointmentStatus::Booked,
                comments: request.comments.clone(),
                created_at: now,
                updated_at: now,
                canceled_at: None,
                completed_at: None,
            };
            (appointment, AppointmentReducer::first_booking_effects(request.slot_id))
        };

        let fail_invitations = self.fail_invitations.load(Ordering::SeqCst);
        for effect in effects {
            tables.apply(effect, now, fail_invitations)?;
        }
        tables.appointments.insert(appointment.id, appointment.clone());
        Ok(appointment)
    }

    async fn cancel(&self, id: AppointmentId) -> Result<Appointment> {
        let mut tables = self.tables();
        let mut state = tables.load_state(id)?;
        let effects =
            AppointmentReducer.reduce(&mut state, AppointmentAction::Cancel, self.clock.as_ref())?;

        let now = self.clock.now();
        let fail_invitations = self.fail_invitations.load(Ordering::SeqCst);
        for effect in effects {
            tables.apply(effect, now, fail_invitations)?;
        }
        tables.appointments.insert(id, state.appointment.clone());
        Ok(state.appointment)
    }

    async fn complete(&self, id: AppointmentId) -> Result<Completion> {
        let mut tables = self.tables();
        let mut state = tables.load_state(id)?;
        let effects = AppointmentReducer.reduce(
            &mut state,
            AppointmentAction::Complete,
            self.clock.as_ref(),
        )?;

        let now = self.clock.now();
        let fail_invitations = self.fail_invitations.load(Ordering::SeqCst);
        let mut invitation = None;
        for effect in effects {
            if let Some(created) = tables.apply(effect, now, fail_invitations)? {
                invitation = Some(created);
            }
        }
        tables.appointments.insert(id, state.appointment.clone());
        Ok(Completion {
            appointment: state.appointment,
            invitation,
        })
    }

    async fn list_client_appointments(&self, client_id: ClientId) -> Result<Vec<AppointmentDetails>> {
        Ok(self.tables().list_details(|d| d.client_id == client_id))
    }

    async fn list_provider_appointments(
        &self,
        provider_id: ProviderId,
    ) -> Result<Vec<AppointmentDetails>> {
        Ok(self.tables().list_details(|d| d.provider_id == provider_id))
    }
}

impl ReviewRepository for InMemoryClinicStore {
    async fn upsert_appointment_review(
        &self,
        appointment_id: AppointmentId,
        draft: &ReviewDraft,
    ) -> Result<(Review, ProviderRating)> {
        let mut tables = self.tables();
        let state = tables.load_state(appointment_id)?;
        if state.appointment.status != AppointmentStatus::Completed {
            return Err(SchedulingError::InvalidTransition {
                from: state.appointment.status,
                action: "review",
            });
        }

        let now = self.clock.now();
        let review = match tables.appointment_reviews.get(&appointment_id) {
            Some(existing) => Review {
                rating: draft.rating,
                comment: draft.comment.clone(),
                updated_at: now,
                ..existing.clone()
            },
            None => Review {
                id: ReviewId(tables.next_id()),
                provider_id: state.provider_id,
                client_id: state.appointment.client_id,
                source: ReviewSource::Appointment { appointment_id },
                rating: draft.rating,
                comment: draft.comment.clone(),
                created_at: now,
                updated_at: now,
            },
        };
        tables.appointment_reviews.insert(appointment_id, review.clone());
        let rating = tables.recompute_rating(state.provider_id)?;
        Ok((review, rating))
    }

    async fn create_provider_review(
        &self,
        provider_id: ProviderId,
        client_id: ClientId,
        draft: &ReviewDraft,
    ) -> Result<(Review, ProviderRating)> {
        let mut tables = self.tables();
        if !tables.providers.contains_key(&provider_id) || !tables.clients.contains_key(&client_id) {
            return Err(SchedulingError::ReviewNotCreated);
        }

        let now = self.clock.now();
        let review = Review {
            id: ReviewId(tables.next_id()),
            provider_id,
            client_id,
            source: ReviewSource::General,
            rating: draft.rating,
            comment: draft.comment.clone(),
            created_at: now,
            updated_at: now,
        };
        tables.provider_reviews.push(review.clone());
        let rating = tables.recompute_rating(provider_id)?;
        Ok((review, rating))
    }

    async fn list_provider_reviews(&self, provider_id: ProviderId) -> Result<Vec<Review>> {
        let tables = self.tables();
        let mut reviews: Vec<Review> = tables
            .appointment_reviews
            .values()
            .chain(tables.provider_reviews.iter())
            .filter(|review| review.provider_id == provider_id)
            .cloned()
            .collect();
        reviews.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(reviews)
    }

    async fn list_pending_reviews(&self, client_id: ClientId) -> Result<Vec<PendingReview>> {
        let tables = self.tables();
        let mut pending: Vec<PendingReview> = tables
            .appointments
            .values()
            .filter(|a| a.client_id == client_id && a.status == AppointmentStatus::Completed)
            .filter(|a| !tables.appointment_reviews.contains_key(&a.id))
            .filter_map(|a| {
                let slot = tables.slots.get(&a.slot_id)?;
                Some(PendingReview {
                    appointment_id: a.id,
                    provider_id: slot.provider_id,
                    slot_start: slot.start_time,
                    slot_end: slot.end_time,
                    completed_at: a.completed_at,
                })
            })
            .collect();
        pending.sort_by(|a, b| {
            b.completed_at
                .cmp(&a.completed_at)
                .then(b.appointment_id.cmp(&a.appointment_id))
        });
        Ok(pending)
    }

    async fn provider_rating(&self, provider_id: ProviderId) -> Result<f64> {
        self.tables()
            .providers
            .get(&provider_id)
            .map(|provider| provider.rating)
            .ok_or(SchedulingError::ProviderNotFound)
    }
}

impl IdentityResolver for InMemoryClinicStore {
    async fn resolve_user(&self, user_id: UserId) -> Result<Identity> {
        let tables = self.tables();
        if let Some((&client_id, _)) = tables.clients.iter().find(|(_, user)| **user == user_id) {
            return Ok(Identity::Client { client_id });
        }
        tables
            .providers
            .iter()
            .find(|(_, provider)| provider.user_id == user_id)
            .map(|(&provider_id, _)| Identity::Provider { provider_id })
            .ok_or(SchedulingError::UserNotFound)
    }

    async fn client_email(&self, client_id: ClientId) -> Result<Option<String>> {
        let tables = self.tables();
        Ok(tables
            .clients
            .get(&client_id)
            .and_then(|user_id| tables.users.get(user_id))
            .cloned())
    }
}
