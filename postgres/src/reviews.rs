//! Reviews and provider rating recomputation.

use crate::rows::{PendingReviewRow, ReviewRow};
use crate::{PostgresClinicStore, is_foreign_key_violation, lock_provider, storage};
use clinic_core::providers::ReviewRepository;
use clinic_core::{
    AppointmentId, AppointmentStatus, ClientId, PendingReview, ProviderId, ProviderRating,
    RatedReview, Result, Review, ReviewDraft, SchedulingError,
};
use sqlx::PgConnection;

/// Fold every review of a provider into its stored rating.
///
/// The caller must hold the provider row lock.
async fn recompute_rating(conn: &mut PgConnection, provider_id: ProviderId) -> Result<ProviderRating> {
    let ratings: Vec<(Option<i64>, i32)> = sqlx::query_as(
        r"
        SELECT appointment_id, rating FROM appointment_reviews WHERE provider_id = $1
        UNION ALL
        SELECT NULL::BIGINT, rating FROM provider_reviews WHERE provider_id = $1
        ",
    )
    .bind(provider_id.get())
    .fetch_all(&mut *conn)
    .await
    .map_err(storage("Failed to load ratings"))?;

    let rating = ProviderRating::fold(
        provider_id,
        ratings
            .into_iter()
            .map(|(appointment_id, rating)| RatedReview {
                source: appointment_id.map(AppointmentId).into(),
                rating,
            }),
    );

    sqlx::query("UPDATE providers SET rating = $2 WHERE id = $1")
        .bind(provider_id.get())
        .bind(rating.rating)
        .execute(&mut *conn)
        .await
        .map_err(storage("Failed to store rating"))?;

    Ok(rating)
}

impl ReviewRepository for PostgresClinicStore {
    async fn upsert_appointment_review(
        &self,
        appointment_id: AppointmentId,
        draft: &ReviewDraft,
    ) -> Result<(Review, ProviderRating)> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(storage("Failed to start transaction"))?;

        let (client_id, status, provider_id): (i64, String, i64) = sqlx::query_as(
            r"
            SELECT a.client_id, a.status, s.provider_id
            FROM appointments a
            JOIN slots s ON s.id = a.slot_id
            WHERE a.id = $1
            FOR SHARE OF a
            ",
        )
        .bind(appointment_id.get())
        .fetch_optional(&mut *tx)
        .await
        .map_err(storage("Failed to load appointment"))?
        .ok_or(SchedulingError::AppointmentNotFound)?;

        let status: AppointmentStatus = status.parse()?;
        if status != AppointmentStatus::Completed {
            return Err(SchedulingError::InvalidTransition {
                from: status,
                action: "review",
            });
        }

        let provider_id = ProviderId(provider_id);
        if !lock_provider(&mut tx, provider_id).await? {
            return Err(SchedulingError::ProviderNotFound);
        }

        let now = self.clock.now();
        let row: ReviewRow = sqlx::query_as(
            r"
            INSERT INTO appointment_reviews (appointment_id, provider_id, client_id, rating, comment, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $6)
            ON CONFLICT (appointment_id) DO UPDATE
            SET rating = EXCLUDED.rating, comment = EXCLUDED.comment, updated_at = EXCLUDED.updated_at
            RETURNING id, provider_id, client_id, appointment_id, rating, comment, created_at, updated_at
            ",
        )
        .bind(appointment_id.get())
        .bind(provider_id.get())
        .bind(client_id)
        .bind(draft.rating)
        .bind(draft.comment.as_deref())
        .bind(now)
        .fetch_one(&mut *tx)
        .await
        .map_err(storage("Failed to upsert appointment review"))?;

        let rating = recompute_rating(&mut tx, provider_id).await?;

        tx.commit()
            .await
            .map_err(storage("Failed to commit review"))?;

        Ok((row.into(), rating))
    }

    async fn create_provider_review(
        &self,
        provider_id: ProviderId,
        client_id: ClientId,
        draft: &ReviewDraft,
    ) -> Result<(Review, ProviderRating)> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(storage("Failed to start transaction"))?;

        if !lock_provider(&mut tx, provider_id).await? {
            return Err(SchedulingError::ReviewNotCreated);
        }

        let now = self.clock.now();
        let row: ReviewRow = sqlx::query_as(
            r"
            INSERT INTO provider_reviews (provider_id, client_id, rating, comment, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $5)
            RETURNING id, provider_id, client_id, NULL::BIGINT AS appointment_id, rating, comment, created_at, updated_at
            ",
        )
        .bind(provider_id.get())
        .bind(client_id.get())
        .bind(draft.rating)
        .bind(draft.comment.as_deref())
        .bind(now)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            if is_foreign_key_violation(&e) {
                SchedulingError::ReviewNotCreated
            } else {
                storage("Failed to insert provider review")(e)
            }
        })?;

        let rating = recompute_rating(&mut tx, provider_id).await?;

        tx.commit()
            .await
            .map_err(storage("Failed to commit review"))?;

        Ok((row.into(), rating))
    }

    async fn list_provider_reviews(&self, provider_id: ProviderId) -> Result<Vec<Review>> {
        let rows: Vec<ReviewRow> = sqlx::query_as(
            r"
            SELECT id, provider_id, client_id, appointment_id, rating, comment, created_at, updated_at
            FROM appointment_reviews
            WHERE provider_id = $1
            UNION ALL
            SELECT id, provider_id, client_id, NULL::BIGINT AS appointment_id, rating, comment, created_at, updated_at
            FROM provider_reviews
            WHERE provider_id = $1
            ORDER BY created_at DESC, id DESC
            ",
        )
        .bind(provider_id.get())
        .fetch_all(&self.pool)
        .await
        .map_err(storage("Failed to list reviews"))?;

        Ok(rows.into_iter().map(Review::from).collect())
    }

    async fn list_pending_reviews(&self, client_id: ClientId) -> Result<Vec<PendingReview>> {
        let rows: Vec<PendingReviewRow> = sqlx::query_as(
            r"
            SELECT a.id AS appointment_id, s.provider_id, s.start_time AS slot_start,
                   s.end_time AS slot_end, a.completed_at
            FROM appointments a
            JOIN slots s ON s.id = a.slot_id
            LEFT JOIN appointment_reviews r ON r.appointment_id = a.id
            WHERE a.client_id = $1 AND a.status = 'COMPLETED' AND r.id IS NULL
            ORDER BY a.completed_at DESC NULLS LAST, a.id DESC
            ",
        )
        .bind(client_id.get())
        .fetch_all(&self.pool)
        .await
        .map_err(storage("Failed to list pending reviews"))?;

        Ok(rows.into_iter().map(PendingReview::from).collect())
    }

    async fn provider_rating(&self, provider_id: ProviderId) -> Result<f64> {
        sqlx::query_scalar("SELECT rating FROM providers WHERE id = $1")
            .bind(provider_id.get())
            .fetch_optional(&self.pool)
            .await
            .map_err(storage("Failed to load rating"))?
            .ok_or(SchedulingError::ProviderNotFound)
    }
}
