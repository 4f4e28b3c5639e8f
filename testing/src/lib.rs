//! # Clinic Testing
//!
//! Test doubles and fixtures for the clinic scheduling backend.
//!
//! This crate provides:
//! - [`FixedClock`]: deterministic time that tests can move forward
//! - [`InMemoryClinicStore`]: a repository with the same atomicity as the
//!   PostgreSQL store, one lock per operation
//! - [`MockNotifier`]: records review invitations and can be told to fail
//! - [`fixtures`]: timestamps and slot windows for scenarios
//!
//! ## Example
//!
//! ```ignore
//! use clinic_testing::{InMemoryClinicStore, MockNotifier, test_clock};
//! use clinic_core::{ClinicService, SchedulingConfig};
//! use std::sync::Arc;
//!
//! #[tokio::test]
//! async fn books_a_slot() {
//!     let store = InMemoryClinicStore::new(Arc::new(test_clock()));
//!     let (_, provider) = store.register_provider("doctor@clinic.test");
//!     let (_, client) = store.register_client("patient@clinic.test");
//!     let service = ClinicService::new(store, MockNotifier::new(), SchedulingConfig::default());
//!     // ...
//! }
//! ```

use chrono::{DateTime, Utc};
use clinic_core::environment::Clock;

mod notifier;
mod store;

/// Mock implementations of environment traits.
pub mod mocks {
    use super::{Clock, DateTime, Utc};
    use chrono::Duration;
    use std::sync::{Arc, Mutex, PoisonError};

    /// Fixed clock for deterministic tests
    ///
    /// Returns the same time until moved with [`FixedClock::advance`].
    /// Clones share the same time.
    ///
    /// # Example
    ///
    /// ```
    /// use clinic_testing::mocks::FixedClock;
    /// use clinic_core::environment::Clock;
    /// use chrono::{Duration, Utc};
    ///
    /// let start = Utc::now();
    /// let clock = FixedClock::new(start);
    /// assert_eq!(clock.now(), clock.now());
    ///
    /// clock.advance(Duration::minutes(5));
    /// assert_eq!(clock.now(), start + Duration::minutes(5));
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: Arc<Mutex<DateTime<Utc>>>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub fn new(time: DateTime<Utc>) -> Self {
            Self {
                time: Arc::new(Mutex::new(time)),
            }
        }

        /// Move the clock forward
        pub fn advance(&self, by: Duration) {
            let mut time = self.time.lock().unwrap_or_else(PoisonError::into_inner);
            *time += by;
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            *self.time.lock().unwrap_or_else(PoisonError::into_inner)
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    ///
    /// # Panics
    ///
    /// This function will panic if the hardcoded timestamp fails to parse,
    /// which should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(
            DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
                .expect("hardcoded timestamp should always parse")
                .with_timezone(&Utc),
        )
    }

    pub use crate::notifier::{MockNotifier, SentInvitation};
}

/// Timestamps and windows for scenario tests.
pub mod fixtures {
    use chrono::{DateTime, Duration, TimeZone, Utc};

    /// 2025-03-`day` at `hour`:00 UTC
    ///
    /// # Panics
    ///
    /// Panics if `day` or `hour` is out of range for March 2025.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, day, hour, 0, 0)
            .single()
            .expect("fixture timestamp should be valid")
    }

    /// One-hour window starting at 2025-03-`day` `hour`:00 UTC
    #[must_use]
    pub fn hour_window(day: u32, hour: u32) -> (DateTime<Utc>, DateTime<Utc>) {
        let start = at(day, hour);
        (start, start + Duration::hours(1))
    }

    /// Install a test subscriber honoring `RUST_LOG`, once per process.
    pub fn init_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    }
}

// Re-export commonly used items
pub use mocks::{FixedClock, MockNotifier, test_clock};
pub use store::InMemoryClinicStore;

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_fixed_clock() {
        let clock = test_clock();
        let time1 = clock.now();
        let time2 = clock.now();
        assert_eq!(time1, time2);
    }

    #[test]
    fn clones_share_time() {
        let clock = test_clock();
        let shared = clock.clone();
        clock.advance(Duration::hours(1));
        assert_eq!(shared.now(), clock.now());
    }
}
