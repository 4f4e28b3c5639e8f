//! Review submission, listing and rating endpoints.

use crate::{AppState, WebResult};
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use clinic_core::providers::{ClinicRepository, Notifier};
use clinic_core::{
    AppointmentId, ClientId, PendingReview, ProviderId, Review, ReviewDraft, SchedulingError,
};
use serde::{Deserialize, Serialize};

/// Body of `POST /appointments/{id}/review`.
#[derive(Debug, Deserialize)]
pub struct AppointmentReviewRequest {
    /// Star rating
    pub rating: i32,
    /// Optional text
    #[serde(default)]
    pub comment: Option<String>,
    /// Must match the path id when present
    #[serde(default)]
    pub appointment_id: Option<AppointmentId>,
}

/// Body of `POST /providers/{provider_id}/reviews`.
#[derive(Debug, Deserialize)]
pub struct ProviderReviewRequest {
    /// Reviewing client
    pub client_id: ClientId,
    /// Star rating
    pub rating: i32,
    /// Optional text
    #[serde(default)]
    pub comment: Option<String>,
}

/// Response of `GET /providers/{provider_id}/rating`.
#[derive(Debug, Serialize, Deserialize)]
pub struct RatingResponse {
    /// Rated provider
    pub provider_id: ProviderId,
    /// Mean of all review ratings, 0 when none
    pub rating: f64,
}

/// `POST /appointments/{id}/review`
///
/// # Errors
///
/// 400 for an out-of-range rating or mismatched body id, 404 for an unknown
/// appointment, 409 unless it is completed.
pub async fn submit_appointment_review<R, N>(
    State(state): State<AppState<R, N>>,
    Path(appointment_id): Path<AppointmentId>,
    Json(request): Json<AppointmentReviewRequest>,
) -> WebResult<(StatusCode, Json<Review>)>
where
    R: ClinicRepository,
    N: Notifier + Clone + 'static,
{
    if let Some(body_id) = request.appointment_id {
        if body_id != appointment_id {
            return Err(SchedulingError::IdMismatch {
                path: appointment_id.get(),
                body: body_id.get(),
            }
            .into());
        }
    }

    let draft = ReviewDraft {
        rating: request.rating,
        comment: request.comment,
    };
    let review = state
        .service()
        .submit_appointment_review(appointment_id, draft)
        .await?;
    Ok((StatusCode::CREATED, Json(review)))
}

/// `POST /providers/{provider_id}/reviews`
///
/// # Errors
///
/// 400 for an out-of-range rating or an unknown provider or client.
pub async fn submit_provider_review<R, N>(
    State(state): State<AppState<R, N>>,
    Path(provider_id): Path<ProviderId>,
    Json(request): Json<ProviderReviewRequest>,
) -> WebResult<(StatusCode, Json<Review>)>
where
    R: ClinicRepository,
    N: Notifier + Clone + 'static,
{
    let draft = ReviewDraft {
        rating: request.rating,
        comment: request.comment,
    };
    let review = state
        .service()
        .submit_provider_review(provider_id, request.client_id, draft)
        .await?;
    Ok((StatusCode::CREATED, Json(review)))
}

/// `GET /providers/{provider_id}/reviews`
///
/// # Errors
///
/// 500 on storage failure.
pub async fn list_provider_reviews<R, N>(
    State(state): State<AppState<R, N>>,
    Path(provider_id): Path<ProviderId>,
) -> WebResult<Json<Vec<Review>>>
where
    R: ClinicRepository,
    N: Notifier + Clone + 'static,
{
    Ok(Json(state.service().list_provider_reviews(provider_id).await?))
}

/// `GET /providers/{provider_id}/rating`
///
/// # Errors
///
/// 404 for an unknown provider.
pub async fn provider_rating<R, N>(
    State(state): State<AppState<R, N>>,
    Path(provider_id): Path<ProviderId>,
) -> WebResult<Json<RatingResponse>>
where
    R: ClinicRepository,
    N: Notifier + Clone + 'static,
{
    let rating = state.service().provider_rating(provider_id).await?;
    Ok(Json(RatingResponse {
        provider_id,
        rating,
    }))
}

/// `GET /clients/{client_id}/pending-reviews`
///
/// # Errors
///
/// 500 on storage failure.
pub async fn list_pending_reviews<R, N>(
    State(state): State<AppState<R, N>>,
    Path(client_id): Path<ClientId>,
) -> WebResult<Json<Vec<PendingReview>>>
where
    R: ClinicRepository,
    N: Notifier + Clone + 'static,
{
    Ok(Json(state.service().list_pending_reviews(client_id).await?))
}
