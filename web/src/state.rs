//! Application state for Axum handlers.

use clinic_core::ClinicService;
use std::sync::Arc;

/// Application state shared across all HTTP handlers.
///
/// Wraps the [`ClinicService`] in an [`Arc`] so cloning per request is cheap
/// regardless of the repository and notifier types.
pub struct AppState<R, N> {
    service: Arc<ClinicService<R, N>>,
}

impl<R, N> AppState<R, N> {
    /// Create application state around a service.
    #[must_use]
    pub fn new(service: ClinicService<R, N>) -> Self {
        Self {
            service: Arc::new(service),
        }
    }

    /// The scheduling service.
    #[must_use]
    pub fn service(&self) -> &ClinicService<R, N> {
        &self.service
    }
}

// Manual impl: derive would require `R: Clone` and `N: Clone`
impl<R, N> Clone for AppState<R, N> {
    fn clone(&self) -> Self {
        Self {
            service: Arc::clone(&self.service),
        }
    }
}
