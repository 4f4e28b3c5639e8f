//! Slot storage.

use crate::rows::SlotRow;
use crate::{PostgresClinicStore, lock_provider, storage};
use chrono::NaiveDate;
use clinic_core::providers::SlotRepository;
use clinic_core::{NewSlot, ProviderId, Result, SchedulingConfig, SchedulingError, Slot, SlotId};

impl SlotRepository for PostgresClinicStore {
    async fn create_slot(&self, slot: &NewSlot, config: &SchedulingConfig) -> Result<Slot> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(storage("Failed to start transaction"))?;

        // Provider lock serializes the overlap check against concurrent inserts
        if !lock_provider(&mut tx, slot.provider_id).await? {
            return Err(SchedulingError::ProviderNotFound);
        }

        if config.reject_overlapping_slots {
            let overlaps: bool = sqlx::query_scalar(
                r"
                SELECT EXISTS (
                    SELECT 1 FROM slots
                    WHERE provider_id = $1 AND start_time < $3 AND $2 < end_time
                )
                ",
            )
            .bind(slot.provider_id.get())
            .bind(slot.start_time)
            .bind(slot.end_time)
            .fetch_one(&mut *tx)
            .await
            .map_err(storage("Failed to check slot overlap"))?;

            if overlaps {
                return Err(SchedulingError::SlotOverlap);
            }
        }

        let now = self.clock.now();
        let row: SlotRow = sqlx::query_as(
            r"
            INSERT INTO slots (provider_id, start_time, end_time, duration_minutes, is_booked, created_at, updated_at)
            VALUES ($1, $2, $3, $4, FALSE, $5, $5)
            RETURNING id, provider_id, start_time, end_time, duration_minutes, is_booked, created_at, updated_at
            ",
        )
        .bind(slot.provider_id.get())
        .bind(slot.start_time)
        .bind(slot.end_time)
        .bind(slot.duration_minutes())
        .bind(now)
        .fetch_one(&mut *tx)
        .await
        .map_err(storage("Failed to insert slot"))?;

        tx.commit()
            .await
            .map_err(storage("Failed to commit slot"))?;

        Ok(row.into())
    }

    async fn list_slots(&self, provider_id: ProviderId, date: Option<NaiveDate>) -> Result<Vec<Slot>> {
        let rows: Vec<SlotRow> = sqlx::query_as(
            r"
            SELECT id, provider_id, start_time, end_time, duration_minutes, is_booked, created_at, updated_at
            FROM slots
            WHERE provider_id = $1
              AND ($2::date IS NULL OR (start_time AT TIME ZONE 'UTC')::date = $2::date)
            ORDER BY start_time ASC, id ASC
            ",
        )
        .bind(provider_id.get())
        .bind(date)
        .fetch_all(&self.pool)
        .await
        .map_err(storage("Failed to list slots"))?;

        Ok(rows.into_iter().map(Slot::from).collect())
    }

    async fn list_available_dates(&self, provider_id: ProviderId) -> Result<Vec<NaiveDate>> {
        sqlx::query_scalar(
            r"
            SELECT DISTINCT (start_time AT TIME ZONE 'UTC')::date AS day
            FROM slots
            WHERE provider_id = $1 AND is_booked = FALSE
            ORDER BY day ASC
            ",
        )
        .bind(provider_id.get())
        .fetch_all(&self.pool)
        .await
        .map_err(storage("Failed to list available dates"))
    }

    async fn delete_slot(&self, provider_id: ProviderId, slot_id: SlotId) -> Result<()> {
        // Appointments are never deleted, so a slot with history stays
        let result = sqlx::query(
            r"
            DELETE FROM slots s
            WHERE s.id = $1
              AND s.provider_id = $2
              AND s.is_booked = FALSE
              AND NOT EXISTS (SELECT 1 FROM appointments a WHERE a.slot_id = s.id)
            ",
        )
        .bind(slot_id.get())
        .bind(provider_id.get())
        .execute(&self.pool)
        .await
        .map_err(storage("Failed to delete slot"))?;

        if result.rows_affected() == 0 {
            return Err(SchedulingError::SlotNotRemovable);
        }
        Ok(())
    }
}
