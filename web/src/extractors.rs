//! Custom Axum extractors.
//!
//! # Examples
//!
//! ```ignore
//! use clinic_web::extractors::CorrelationId;
//!
//! async fn handler(correlation_id: CorrelationId) -> String {
//!     format!("Request ID: {correlation_id}")
//! }
//! ```

use crate::middleware::CORRELATION_ID_HEADER;
use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use std::fmt;
use uuid::Uuid;

/// Correlation ID for request tracing.
///
/// Taken from the request extensions when [`correlation_id_layer`] ran,
/// otherwise from the `X-Correlation-ID` header, otherwise a new UUID v4.
///
/// [`correlation_id_layer`]: crate::middleware::correlation_id_layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CorrelationId(pub Uuid);

impl CorrelationId {
    /// Parse the header value, falling back to a fresh id.
    #[must_use]
    pub fn from_header(value: Option<&str>) -> Self {
        Self(
            value
                .and_then(|s| Uuid::parse_str(s).ok())
                .unwrap_or_else(Uuid::new_v4),
        )
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for CorrelationId
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        if let Some(id) = parts.extensions.get::<Self>() {
            return Ok(*id);
        }

        let header = parts
            .headers
            .get(CORRELATION_ID_HEADER)
            .and_then(|v| v.to_str().ok());
        Ok(Self::from_header(header))
    }
}
