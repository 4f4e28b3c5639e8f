//! Axum HTTP surface for the clinic scheduling backend.
//!
//! The handlers are thin: extract, call [`ClinicService`], map the result.
//! Every domain error becomes an [`AppError`] with a stable JSON body
//! `{"code": ..., "message": ...}`.
//!
//! # Request Flow
//!
//! 1. **Correlation id** attached by [`middleware::correlation_id_layer`]
//! 2. **Extract** path ids, query and JSON body
//! 3. **Call** the service, which owns validation and transactions
//! 4. **Map** the result or [`clinic_core::SchedulingError`] to a response
//!
//! # Example
//!
//! ```ignore
//! use clinic_web::clinic_router;
//!
//! let app = clinic_router(service);
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
//! axum::serve(listener, app).await?;
//! ```
//!
//! [`ClinicService`]: clinic_core::ClinicService

#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod state;

pub use error::AppError;
pub use extractors::CorrelationId;
pub use middleware::{CORRELATION_ID_HEADER, correlation_id_layer};
pub use router::{api_routes, clinic_router};
pub use state::AppState;

/// Result type alias for web handlers.
pub type WebResult<T> = Result<T, AppError>;
