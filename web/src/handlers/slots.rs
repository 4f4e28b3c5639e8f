//! Slot endpoints, scoped under a provider.

use crate::{AppState, WebResult};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::{DateTime, NaiveDate, Utc};
use clinic_core::providers::{ClinicRepository, Notifier};
use clinic_core::{ProviderId, Slot, SlotId};
use serde::Deserialize;

/// Body of `POST /providers/{provider_id}/slots`.
#[derive(Debug, Deserialize)]
pub struct CreateSlotRequest {
    /// Window start
    pub start_time: DateTime<Utc>,
    /// Window end
    pub end_time: DateTime<Utc>,
}

/// Query of `GET /providers/{provider_id}/slots`.
#[derive(Debug, Default, Deserialize)]
pub struct SlotsQuery {
    /// Only slots starting on this UTC date
    pub date: Option<NaiveDate>,
}

/// `POST /providers/{provider_id}/slots`
///
/// # Errors
///
/// 400 for an empty or inverted window or an overlap, 404 for an unknown provider.
pub async fn create_slot<R, N>(
    State(state): State<AppState<R, N>>,
    Path(provider_id): Path<ProviderId>,
    Json(request): Json<CreateSlotRequest>,
) -> WebResult<(StatusCode, Json<Slot>)>
where
    R: ClinicRepository,
    N: Notifier + Clone + 'static,
{
    let slot = state
        .service()
        .create_slot(provider_id, request.start_time, request.end_time)
        .await?;
    Ok((StatusCode::CREATED, Json(slot)))
}

/// `GET /providers/{provider_id}/slots?date=YYYY-MM-DD`
///
/// # Errors
///
/// 500 on storage failure.
pub async fn list_slots<R, N>(
    State(state): State<AppState<R, N>>,
    Path(provider_id): Path<ProviderId>,
    Query(query): Query<SlotsQuery>,
) -> WebResult<Json<Vec<Slot>>>
where
    R: ClinicRepository,
    N: Notifier + Clone + 'static,
{
    let slots = state.service().list_slots(provider_id, query.date).await?;
    Ok(Json(slots))
}

/// `GET /providers/{provider_id}/available-dates`
///
/// # Errors
///
/// 500 on storage failure.
pub async fn list_available_dates<R, N>(
    State(state): State<AppState<R, N>>,
    Path(provider_id): Path<ProviderId>,
) -> WebResult<Json<Vec<NaiveDate>>>
where
    R: ClinicRepository,
    N: Notifier + Clone + 'static,
{
    let dates = state.service().list_available_dates(provider_id).await?;
    Ok(Json(dates))
}

/// `DELETE /providers/{provider_id}/slots/{slot_id}`
///
/// # Errors
///
/// 400 "Slot not removable" when the slot is missing, foreign, booked or has history.
pub async fn delete_slot<R, N>(
    State(state): State<AppState<R, N>>,
    Path((provider_id, slot_id)): Path<(ProviderId, SlotId)>,
) -> WebResult<StatusCode>
where
    R: ClinicRepository,
    N: Notifier + Clone + 'static,
{
    state.service().delete_slot(provider_id, slot_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
