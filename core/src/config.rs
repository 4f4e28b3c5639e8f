//! Scheduling policy configuration.

use crate::rating::RatingScale;

/// Tunable scheduling policy.
///
/// # Example
///
/// ```
/// use clinic_core::SchedulingConfig;
///
/// let config = SchedulingConfig::new()
///     .with_rating_range(1, 10)
///     .with_overlap_check(false);
/// assert_eq!(config.rating_scale.max, 10);
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SchedulingConfig {
    /// Accepted star ratings
    pub rating_scale: RatingScale,
    /// Reject slots that intersect another slot of the same provider
    pub reject_overlapping_slots: bool,
    /// Base URL used to build links in notifications
    pub public_base_url: String,
}

impl SchedulingConfig {
    /// Defaults: ratings 1..=5, overlap check on.
    #[must_use]
    pub fn new() -> Self {
        Self {
            rating_scale: RatingScale::default(),
            reject_overlapping_slots: true,
            public_base_url: "http://localhost:8080".to_string(),
        }
    }

    /// Set the inclusive rating bounds
    #[must_use]
    pub fn with_rating_range(mut self, min: i32, max: i32) -> Self {
        self.rating_scale = RatingScale::new(min, max);
        self
    }

    /// Enable or disable the overlapping slot check
    #[must_use]
    pub fn with_overlap_check(mut self, enabled: bool) -> Self {
        self.reject_overlapping_slots = enabled;
        self
    }

    /// Set the base URL for notification links
    #[must_use]
    pub fn with_public_base_url(mut self, url: impl Into<String>) -> Self {
        self.public_base_url = url.into().trim_end_matches('/').to_string();
        self
    }
}

impl Default for SchedulingConfig {
    fn default() -> Self {
        Self::new()
    }
}
