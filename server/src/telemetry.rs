//! Tracing subscriber and Prometheus exporter setup.

use metrics::describe_counter;
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};
use std::net::SocketAddr;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Default filter when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "info,clinic=debug,sqlx=warn";

/// Install the global `fmt` subscriber honoring `RUST_LOG`.
pub fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Install the Prometheus recorder with its own HTTP listener.
///
/// # Errors
///
/// Returns [`BuildError`] if the listener cannot be started or a recorder is
/// already installed.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    describe_metrics();
    tracing::info!(addr = %addr, "Metrics available at http://{addr}/metrics");
    Ok(())
}

fn describe_metrics() {
    describe_counter!("clinic.appointments.booked", "Appointments booked or reactivated");
    describe_counter!("clinic.booking.rejected", "Bookings rejected because the slot was taken");
    describe_counter!("clinic.appointments.canceled", "Appointments canceled");
    describe_counter!("clinic.appointments.completed", "Appointments completed");
    describe_counter!("clinic.reviews.submitted", "Reviews created or updated");
    describe_counter!("clinic.notifications.failed", "Review invitations that could not be delivered");
}
