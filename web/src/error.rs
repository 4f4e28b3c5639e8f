//! Error types for web handlers.
//!
//! [`AppError`] bridges [`SchedulingError`] and HTTP responses. The mapping
//! follows the error category: validation and booking conflicts are client
//! errors (400), lifecycle conflicts are 409, missing resources are 404 and
//! storage failures are logged and hidden behind a generic 500.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use clinic_core::{ErrorCategory, SchedulingError};
use serde::Serialize;
use std::fmt;

/// Application error type for web handlers.
///
/// # Examples
///
/// ```ignore
/// async fn handler(State(state): State<AppState<R, N>>) -> Result<Json<Slot>, AppError> {
///     let slot = state.service().create_slot(provider_id, start, end).await?;
///     Ok(Json(slot))
/// }
/// ```
#[derive(Debug)]
pub struct AppError {
    /// HTTP status code
    status: StatusCode,
    /// Error message (user-facing)
    message: String,
    /// Error code (for client error handling)
    code: &'static str,
    /// Internal error (for logging, not exposed to client)
    source: Option<anyhow::Error>,
}

impl AppError {
    /// Create a new application error.
    #[must_use]
    pub fn new(status: StatusCode, message: impl Into<String>, code: &'static str) -> Self {
        Self {
            status,
            message: message.into(),
            code,
            source: None,
        }
    }

    /// Attach the underlying error, logged but never returned.
    #[must_use]
    pub fn with_source(mut self, source: anyhow::Error) -> Self {
        self.source = Some(source);
        self
    }

    /// Create a 500 Internal Server Error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            message,
            "INTERNAL_SERVER_ERROR",
        )
    }

    /// HTTP status of this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// Stable machine-readable code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        self.code
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

/// Error response body (JSON).
#[derive(Debug, Serialize)]
struct ErrorResponse {
    code: &'static str,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            if let Some(source) = &self.source {
                tracing::error!(
                    status = %self.status,
                    code = %self.code,
                    message = %self.message,
                    error = %source,
                    "Internal server error"
                );
            } else {
                tracing::error!(
                    status = %self.status,
                    code = %self.code,
                    message = %self.message,
                    "Internal server error"
                );
            }
        }

        let body = ErrorResponse {
            code: self.code,
            message: self.message,
        };

        (self.status, Json(body)).into_response()
    }
}

impl From<SchedulingError> for AppError {
    fn from(err: SchedulingError) -> Self {
        let classified = match (&err, err.category()) {
            (_, ErrorCategory::Validation) => Some((StatusCode::BAD_REQUEST, "VALIDATION_ERROR")),
            (SchedulingError::InvalidTransition { .. }, _) => {
                Some((StatusCode::CONFLICT, "INVALID_TRANSITION"))
            }
            (SchedulingError::SlotNotAvailable, _) => {
                Some((StatusCode::BAD_REQUEST, "SLOT_NOT_AVAILABLE"))
            }
            (SchedulingError::SlotNotRemovable, _) => {
                Some((StatusCode::BAD_REQUEST, "SLOT_NOT_REMOVABLE"))
            }
            (SchedulingError::SlotOverlap, _) => Some((StatusCode::BAD_REQUEST, "SLOT_OVERLAP")),
            (SchedulingError::ReviewNotCreated, _) => {
                Some((StatusCode::BAD_REQUEST, "REVIEW_NOT_CREATED"))
            }
            (_, ErrorCategory::NotFound) => Some((StatusCode::NOT_FOUND, "NOT_FOUND")),
            (_, ErrorCategory::Conflict | ErrorCategory::Storage) => None,
        };

        match classified {
            Some((status, code)) => Self::new(status, err.to_string(), code),
            None => Self::internal("An internal error occurred").with_source(anyhow::Error::new(err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clinic_core::AppointmentStatus;

    #[test]
    fn test_error_display() {
        let err = AppError::from(SchedulingError::SlotOverlap);
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.code(), "SLOT_OVERLAP");
        assert!(err.to_string().starts_with("[SLOT_OVERLAP] "));
    }

    #[test]
    fn validation_errors_are_bad_requests() {
        let err = AppError::from(SchedulingError::RatingOutOfRange {
            rating: 9,
            min: 1,
            max: 5,
        });
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.code(), "VALIDATION_ERROR");
    }

    #[test]
    fn booking_conflicts_keep_their_message() {
        let err = AppError::from(SchedulingError::SlotNotAvailable);
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.to_string(), "[SLOT_NOT_AVAILABLE] Slot not available");
    }

    #[test]
    fn lifecycle_conflicts_are_409() {
        let err = AppError::from(SchedulingError::InvalidTransition {
            from: AppointmentStatus::Completed,
            action: "cancel",
        });
        assert_eq!(err.status(), StatusCode::CONFLICT);
        assert_eq!(err.code(), "INVALID_TRANSITION");
    }

    #[test]
    fn missing_resources_are_404() {
        let err = AppError::from(SchedulingError::AppointmentNotFound);
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn storage_details_stay_internal() {
        let err = AppError::from(SchedulingError::Storage("connection reset".into()));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!err.to_string().contains("connection reset"));
        assert!(std::error::Error::source(&err).is_some());
    }
}
