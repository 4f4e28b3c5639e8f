//! Row types and their conversion into domain types.

use chrono::{DateTime, Utc};
use clinic_core::{
    Appointment, AppointmentDetails, AppointmentId, AppointmentState, ClientId, PendingReview,
    ProviderId, Review, ReviewId, SchedulingError, Slot, SlotId,
};
use sqlx::FromRow;

#[derive(FromRow)]
pub(crate) struct SlotRow {
    id: i64,
    provider_id: i64,
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
    duration_minutes: i32,
    is_booked: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<SlotRow> for Slot {
    fn from(row: SlotRow) -> Self {
        Self {
            id: SlotId(row.id),
            provider_id: ProviderId(row.provider_id),
            start_time: row.start_time,
            end_time: row.end_time,
            duration_minutes: row.duration_minutes,
            is_booked: row.is_booked,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(FromRow)]
pub(crate) struct AppointmentRow {
    id: i64,
    slot_id: i64,
    client_id: i64,
    status: String,
    comments: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    canceled_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
}

impl TryFrom<AppointmentRow> for Appointment {
    type Error = SchedulingError;

    fn try_from(row: AppointmentRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: AppointmentId(row.id),
            slot_id: SlotId(row.slot_id),
            client_id: ClientId(row.client_id),
            status: row.status.parse()?,
            comments: row.comments,
            created_at: row.created_at,
            updated_at: row.updated_at,
            canceled_at: row.canceled_at,
            completed_at: row.completed_at,
        })
    }
}

/// An appointment row joined with its slot's provider.
#[derive(FromRow)]
pub(crate) struct AppointmentStateRow {
    #[sqlx(flatten)]
    appointment: AppointmentRow,
    provider_id: i64,
}

impl TryFrom<AppointmentStateRow> for AppointmentState {
    type Error = SchedulingError;

    fn try_from(row: AppointmentStateRow) -> Result<Self, Self::Error> {
        Ok(Self {
            appointment: row.appointment.try_into()?,
            provider_id: ProviderId(row.provider_id),
        })
    }
}

#[derive(FromRow)]
pub(crate) struct ReviewRow {
    id: i64,
    provider_id: i64,
    client_id: i64,
    appointment_id: Option<i64>,
    rating: i32,
    comment: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ReviewRow> for Review {
    fn from(row: ReviewRow) -> Self {
        Self {
            id: ReviewId(row.id),
            provider_id: ProviderId(row.provider_id),
            client_id: ClientId(row.client_id),
            source: row.appointment_id.map(AppointmentId).into(),
            rating: row.rating,
            comment: row.comment,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(FromRow)]
pub(crate) struct AppointmentDetailsRow {
    appointment_id: i64,
    status: String,
    client_id: i64,
    provider_id: i64,
    slot_id: i64,
    slot_start: DateTime<Utc>,
    slot_end: DateTime<Utc>,
    comments: Option<String>,
    review_id: Option<i64>,
    review_rating: Option<i32>,
    review_comment: Option<String>,
    review_created_at: Option<DateTime<Utc>>,
    review_updated_at: Option<DateTime<Utc>>,
}

impl TryFrom<AppointmentDetailsRow> for AppointmentDetails {
    type Error = SchedulingError;

    fn try_from(row: AppointmentDetailsRow) -> Result<Self, Self::Error> {
        let appointment_id = AppointmentId(row.appointment_id);
        let review = match (row.review_id, row.review_rating, row.review_created_at, row.review_updated_at) {
            (Some(id), Some(rating), Some(created_at), Some(updated_at)) => Some(Review {
                id: ReviewId(id),
                provider_id: ProviderId(row.provider_id),
                client_id: ClientId(row.client_id),
                source: Some(appointment_id).into(),
                rating,
                comment: row.review_comment,
                created_at,
                updated_at,
            }),
            _ => None,
        };

        Ok(Self {
            appointment_id,
            status: row.status.parse()?,
            client_id: ClientId(row.client_id),
            provider_id: ProviderId(row.provider_id),
            slot_id: SlotId(row.slot_id),
            slot_start: row.slot_start,
            slot_end: row.slot_end,
            comments: row.comments,
            review,
        })
    }
}

#[derive(FromRow)]
pub(crate) struct PendingReviewRow {
    appointment_id: i64,
    provider_id: i64,
    slot_start: DateTime<Utc>,
    slot_end: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
}

impl From<PendingReviewRow> for PendingReview {
    fn from(row: PendingReviewRow) -> Self {
        Self {
            appointment_id: AppointmentId(row.appointment_id),
            provider_id: ProviderId(row.provider_id),
            slot_start: row.slot_start,
            slot_end: row.slot_end,
            completed_at: row.completed_at,
        }
    }
}
