//! Route table.

use crate::AppState;
use crate::handlers::{appointments, health_check, reviews, slots};
use crate::middleware::correlation_id_layer;
use axum::{
    Router,
    routing::{delete, get, post},
};
use clinic_core::ClinicService;
use clinic_core::providers::{ClinicRepository, Notifier};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Build the `/api` routes over a service, without outer layers.
pub fn api_routes<R, N>(state: AppState<R, N>) -> Router
where
    R: ClinicRepository,
    N: Notifier + Clone + 'static,
{
    Router::new()
        // Slots
        .route(
            "/providers/:provider_id/slots",
            post(slots::create_slot::<R, N>).get(slots::list_slots::<R, N>),
        )
        .route(
            "/providers/:provider_id/slots/:slot_id",
            delete(slots::delete_slot::<R, N>),
        )
        .route(
            "/providers/:provider_id/available-dates",
            get(slots::list_available_dates::<R, N>),
        )
        // Appointments
        .route("/appointments", post(appointments::book::<R, N>))
        .route("/appointments/:id/cancel", post(appointments::cancel::<R, N>))
        .route(
            "/appointments/:id/complete",
            post(appointments::complete::<R, N>),
        )
        .route(
            "/providers/:provider_id/appointments",
            get(appointments::list_for_provider::<R, N>),
        )
        .route(
            "/clients/:client_id/appointments",
            get(appointments::list_for_client::<R, N>),
        )
        .route(
            "/users/:user_id/appointments",
            get(appointments::list_for_user::<R, N>),
        )
        // Reviews
        .route(
            "/appointments/:id/review",
            post(reviews::submit_appointment_review::<R, N>),
        )
        .route(
            "/providers/:provider_id/reviews",
            post(reviews::submit_provider_review::<R, N>).get(reviews::list_provider_reviews::<R, N>),
        )
        .route(
            "/providers/:provider_id/rating",
            get(reviews::provider_rating::<R, N>),
        )
        .route(
            "/clients/:client_id/pending-reviews",
            get(reviews::list_pending_reviews::<R, N>),
        )
        .with_state(state)
}

/// Full application router: `/api`, `/health`, tracing, correlation ids and CORS.
///
/// # Example
///
/// ```ignore
/// let service = ClinicService::new(store, ConsoleNotifier, SchedulingConfig::default());
/// let app = clinic_router(service);
/// axum::serve(listener, app).await?;
/// ```
pub fn clinic_router<R, N>(service: ClinicService<R, N>) -> Router
where
    R: ClinicRepository,
    N: Notifier + Clone + 'static,
{
    Router::new()
        .route("/health", get(health_check))
        .nest("/api", api_routes(AppState::new(service)))
        .layer(TraceLayer::new_for_http())
        .layer(correlation_id_layer())
        .layer(CorsLayer::permissive())
}
