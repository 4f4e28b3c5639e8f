//! Appointment booking and lifecycle transitions.

use crate::rows::{AppointmentDetailsRow, AppointmentRow, AppointmentStateRow};
use crate::{PostgresClinicStore, is_foreign_key_violation, is_unique_violation, storage};
use chrono::{DateTime, Utc};
use clinic_core::providers::AppointmentRepository;
use clinic_core::{
    Appointment, AppointmentAction, AppointmentDetails, AppointmentEffect, AppointmentId,
    AppointmentReducer, AppointmentState, AppointmentStatus, BookingRequest, ClientId, Completion,
    ProviderId, Reducer, Result, ReviewInvitation, SchedulingError,
};
use sqlx::{Connection, PgConnection};
use tracing::warn;

const DETAILS_SELECT: &str = r"
    SELECT a.id AS appointment_id, a.status, a.client_id, s.provider_id, s.id AS slot_id,
           s.start_time AS slot_start, s.end_time AS slot_end, a.comments,
           r.id AS review_id, r.rating AS review_rating, r.comment AS review_comment,
           r.created_at AS review_created_at, r.updated_at AS review_updated_at
    FROM appointments a
    JOIN slots s ON s.id = a.slot_id
    LEFT JOIN appointment_reviews r ON r.appointment_id = a.id
";

const DETAILS_ORDER: &str = "ORDER BY s.start_time DESC, a.id DESC";

impl PostgresClinicStore {
    /// Lock an appointment and run one lifecycle transition on it.
    async fn transition(
        &self,
        id: AppointmentId,
        action: AppointmentAction,
    ) -> Result<(Appointment, Option<ReviewInvitation>)> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(storage("Failed to start transaction"))?;

        let row: AppointmentStateRow = sqlx::query_as(
            r"
            SELECT a.id, a.slot_id, a.client_id, a.status, a.comments,
                   a.created_at, a.updated_at, a.canceled_at, a.completed_at, s.provider_id
            FROM appointments a
            JOIN slots s ON s.id = a.slot_id
            WHERE a.id = $1
            FOR UPDATE OF a
            ",
        )
        .bind(id.get())
        .fetch_optional(&mut *tx)
        .await
        .map_err(storage("Failed to lock appointment"))?
        .ok_or(SchedulingError::AppointmentNotFound)?;

        let mut state = AppointmentState::try_from(row)?;
        let effects = AppointmentReducer.reduce(&mut state, action, self.clock.as_ref())?;
        persist_appointment(&mut tx, &state.appointment).await?;

        let mut invitation = None;
        for effect in effects {
            if let Some(created) = execute_effect(&mut tx, effect, state.appointment.updated_at).await? {
                invitation = Some(created);
            }
        }

        tx.commit()
            .await
            .map_err(storage("Failed to commit appointment"))?;

        Ok((state.appointment, invitation))
    }

    async fn list_details(&self, filter: &str, id: i64) -> Result<Vec<AppointmentDetails>> {
        let sql = format!("{DETAILS_SELECT} WHERE {filter} = $1 {DETAILS_ORDER}");
        let rows: Vec<AppointmentDetailsRow> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_all(&self.pool)
            .await
            .map_err(storage("Failed to list appointments"))?;

        rows.into_iter().map(AppointmentDetails::try_from).collect()
    }
}

impl AppointmentRepository for PostgresClinicStore {
    async fn book(&self, request: &BookingRequest) -> Result<Appointment> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(storage("Failed to start transaction"))?;

        let client: Option<i64> = sqlx::query_scalar("SELECT id FROM clients WHERE id = $1")
            .bind(request.client_id.get())
            .fetch_optional(&mut *tx)
            .await
            .map_err(storage("Failed to look up client"))?;
        if client.is_none() {
            return Err(SchedulingError::ClientNotFound);
        }

        let provider_id: i64 = sqlx::query_scalar("SELECT provider_id FROM slots WHERE id = $1")
            .bind(request.slot_id.get())
            .fetch_optional(&mut *tx)
            .await
            .map_err(storage("Failed to look up slot"))?
            .ok_or(SchedulingError::SlotNotAvailable)?;

        let existing: Option<AppointmentRow> = sqlx::query_as(
            r"
            SELECT id, slot_id, client_id, status, comments, created_at, updated_at, canceled_at, completed_at
            FROM appointments
            WHERE slot_id = $1
            FOR UPDATE
            ",
        )
        .bind(request.slot_id.get())
        .fetch_optional(&mut *tx)
        .await
        .map_err(storage("Failed to lock appointment"))?;

        let (appointment, effects) = if let Some(row) = existing {
            let mut state = AppointmentState {
                appointment: row.try_into()?,
                provider_id: ProviderId(provider_id),
            };
            // Only a canceled appointment can be reactivated; anything else holds the slot
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
            persist_appointment(&mut tx, &state.appointment).await?;
            (state.appointment, effects)
        } else {
            let now = self.clock.now();
            let row: AppointmentRow = sqlx::query_as(
                r"
                INSERT INTO appointments (slot_id, client_id, status, comments, created_at, updated_at)
                VALUES ($1, $2, $3, $4, $5, $5)
                RETURNING id, slot_id, client_id, status, comments, created_at, updated_at, canceled_at, completed_at
                ",
            )
            .bind(request.slot_id.get())
            .bind(request.client_id.get())
            .bind(AppointmentStatus::Booked.as_str())
            .bind(request.comments.as_deref())
            .bind(now)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) || is_foreign_key_violation(&e) {
                    SchedulingError::SlotNotAvailable
                } else {
                    storage("Failed to insert appointment")(e)
                }
            })?;
            (
                Appointment::try_from(row)?,
                AppointmentReducer::first_booking_effects(request.slot_id),
            )
        };

        for effect in effects {
            execute_effect(&mut tx, effect, appointment.updated_at).await?;
        }

        tx.commit()
            .await
            .map_err(storage("Failed to commit booking"))?;

        Ok(appointment)
    }

    async fn cancel(&self, id: AppointmentId) -> Result<Appointment> {
        let (appointment, _) = self.transition(id, AppointmentAction::Cancel).await?;
        Ok(appointment)
    }

    async fn complete(&self, id: AppointmentId) -> Result<Completion> {
        let (appointment, invitation) = self.transition(id, AppointmentAction::Complete).await?;
        Ok(Completion {
            appointment,
            invitation,
        })
    }

    async fn list_client_appointments(&self, client_id: ClientId) -> Result<Vec<AppointmentDetails>> {
        self.list_details("a.client_id", client_id.get()).await
    }

    async fn list_provider_appointments(
        &self,
        provider_id: ProviderId,
    ) -> Result<Vec<AppointmentDetails>> {
        self.list_details("s.provider_id", provider_id.get()).await
    }
}

async fn persist_appointment(conn: &mut PgConnection, appointment: &Appointment) -> Result<()> {
    sqlx::query(
        r"
        UPDATE appointments
        SET client_id = $2, status = $3, comments = $4, updated_at = $5, canceled_at = $6, completed_at = $7
        WHERE id = $1
        ",
    )
    .bind(appointment.id.get())
    .bind(appointment.client_id.get())
    .bind(appointment.status.as_str())
    .bind(appointment.comments.as_deref())
    .bind(appointment.updated_at)
    .bind(appointment.canceled_at)
    .bind(appointment.completed_at)
    .execute(conn)
    .await
    .map_err(storage("Failed to update appointment"))?;
    Ok(())
}

/// Execute one reducer effect inside the caller's transaction.
///
/// Returns the invitation if this effect created one.
async fn execute_effect(
    conn: &mut PgConnection,
    effect: AppointmentEffect,
    now: DateTime<Utc>,
) -> Result<Option<ReviewInvitation>> {
    match effect {
        AppointmentEffect::ReserveSlot { slot_id } => {
            let claimed = sqlx::query(
                "UPDATE slots SET is_booked = TRUE, updated_at = $2 WHERE id = $1 AND is_booked = FALSE",
            )
            .bind(slot_id.get())
            .bind(now)
            .execute(conn)
            .await
            .map_err(storage("Failed to reserve slot"))?;

            if claimed.rows_affected() == 0 {
                return Err(SchedulingError::SlotNotAvailable);
            }
            Ok(None)
        }
        AppointmentEffect::ReleaseSlot { slot_id } => {
            sqlx::query("UPDATE slots SET is_booked = FALSE, updated_at = $2 WHERE id = $1")
                .bind(slot_id.get())
                .bind(now)
                .execute(conn)
                .await
                .map_err(storage("Failed to release slot"))?;
            Ok(None)
        }
        AppointmentEffect::CreateReviewInvitation {
            appointment_id,
            client_id,
            provider_id,
        } => {
            // Savepoint so a failed insert does not abort the completion
            let mut savepoint = conn
                .begin()
                .await
                .map_err(storage("Failed to open savepoint"))?;

            let inserted: std::result::Result<Option<DateTime<Utc>>, sqlx::Error> = sqlx::query_scalar(
                r"
                INSERT INTO review_invitations (appointment_id, client_id, provider_id, created_at)
                VALUES ($1, $2, $3, $4)
                ON CONFLICT (appointment_id) DO NOTHING
                RETURNING created_at
                ",
            )
            .bind(appointment_id.get())
            .bind(client_id.get())
            .bind(provider_id.get())
            .bind(now)
            .fetch_optional(&mut *savepoint)
            .await;

            match inserted {
                Ok(created_at) => {
                    savepoint
                        .commit()
                        .await
                        .map_err(storage("Failed to release savepoint"))?;
                    Ok(created_at.map(|created_at| ReviewInvitation {
                        appointment_id,
                        client_id,
                        provider_id,
                        created_at,
                    }))
                }
                Err(error) => {
                    warn!(
                        appointment_id = %appointment_id,
                        error = %error,
                        "Failed to create review invitation"
                    );
                    savepoint
                        .rollback()
                        .await
                        .map_err(storage("Failed to roll back savepoint"))?;
                    Ok(None)
                }
            }
        }
    }
}
