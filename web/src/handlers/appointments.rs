//! Booking, lifecycle and appointment listing endpoints.

use crate::extractors::CorrelationId;
use crate::{AppState, WebResult};
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use clinic_core::providers::{ClinicRepository, Notifier};
use clinic_core::{
    Appointment, AppointmentDetails, AppointmentId, BookingRequest, ClientId, ProviderId, UserId,
};
use tracing::debug;

/// `POST /appointments`
///
/// # Errors
///
/// 400 "Slot not available" when the slot is missing or taken, 404 for an unknown client.
pub async fn book<R, N>(
    State(state): State<AppState<R, N>>,
    correlation_id: CorrelationId,
    Json(request): Json<BookingRequest>,
) -> WebResult<(StatusCode, Json<Appointment>)>
where
    R: ClinicRepository,
    N: Notifier + Clone + 'static,
{
    debug!(
        correlation_id = %correlation_id,
        slot_id = %request.slot_id,
        client_id = %request.client_id,
        "Booking requested"
    );
    let appointment = state.service().book_appointment(request).await?;
    Ok((StatusCode::CREATED, Json(appointment)))
}

/// `POST /appointments/{id}/cancel`
///
/// # Errors
///
/// 404 for an unknown appointment, 409 unless it is booked.
pub async fn cancel<R, N>(
    State(state): State<AppState<R, N>>,
    Path(id): Path<AppointmentId>,
) -> WebResult<StatusCode>
where
    R: ClinicRepository,
    N: Notifier + Clone + 'static,
{
    state.service().cancel_appointment(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `POST /appointments/{id}/complete`
///
/// # Errors
///
/// 404 for an unknown appointment, 409 unless it is booked.
pub async fn complete<R, N>(
    State(state): State<AppState<R, N>>,
    Path(id): Path<AppointmentId>,
) -> WebResult<StatusCode>
where
    R: ClinicRepository,
    N: Notifier + Clone + 'static,
{
    state.service().complete_appointment(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /clients/{client_id}/appointments`
///
/// # Errors
///
/// 500 on storage failure.
pub async fn list_for_client<R, N>(
    State(state): State<AppState<R, N>>,
    Path(client_id): Path<ClientId>,
) -> WebResult<Json<Vec<AppointmentDetails>>>
where
    R: ClinicRepository,
    N: Notifier + Clone + 'static,
{
    Ok(Json(state.service().list_client_appointments(client_id).await?))
}

/// `GET /providers/{provider_id}/appointments`
///
/// # Errors
///
/// 500 on storage failure.
pub async fn list_for_provider<R, N>(
    State(state): State<AppState<R, N>>,
    Path(provider_id): Path<ProviderId>,
) -> WebResult<Json<Vec<AppointmentDetails>>>
where
    R: ClinicRepository,
    N: Notifier + Clone + 'static,
{
    Ok(Json(state.service().list_provider_appointments(provider_id).await?))
}

/// `GET /users/{user_id}/appointments`
///
/// # Errors
///
/// 404 when the user is neither a client nor a provider.
pub async fn list_for_user<R, N>(
    State(state): State<AppState<R, N>>,
    Path(user_id): Path<UserId>,
) -> WebResult<Json<Vec<AppointmentDetails>>>
where
    R: ClinicRepository,
    N: Notifier + Clone + 'static,
{
    Ok(Json(state.service().list_user_appointments(user_id).await?))
}
