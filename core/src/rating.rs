//! Provider rating aggregation.
//!
//! Ratings from appointment-linked and general reviews form one population.
//! The aggregate is their arithmetic mean, `0.0` when there are none.

use crate::error::SchedulingError;
use crate::types::{ProviderId, ReviewSource};
use serde::{Deserialize, Serialize};

/// Inclusive bounds for a star rating.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatingScale {
    /// Lowest accepted rating
    pub min: i32,
    /// Highest accepted rating
    pub max: i32,
}

impl RatingScale {
    /// Create a scale from inclusive bounds
    #[must_use]
    pub const fn new(min: i32, max: i32) -> Self {
        Self { min, max }
    }

    /// Check a submitted rating.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulingError::RatingOutOfRange`] if `rating` falls outside the scale.
    pub const fn validate(&self, rating: i32) -> Result<(), SchedulingError> {
        if rating < self.min || rating > self.max {
            return Err(SchedulingError::RatingOutOfRange {
                rating,
                min: self.min,
                max: self.max,
            });
        }
        Ok(())
    }
}

impl Default for RatingScale {
    fn default() -> Self {
        Self::new(1, 5)
    }
}

/// One rating tagged with where it came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RatedReview {
    /// Provenance
    pub source: ReviewSource,
    /// Star rating
    pub rating: i32,
}

/// Aggregate rating for a provider.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProviderRating {
    /// Rated provider
    pub provider_id: ProviderId,
    /// Mean of all ratings, `0.0` when unrated
    pub rating: f64,
    /// Number of appointment-linked reviews folded in
    pub appointment_reviews: u64,
    /// Number of general reviews folded in
    pub general_reviews: u64,
}

impl ProviderRating {
    /// Fold tagged ratings into an aggregate.
    ///
    /// Both sources weigh the same. No rounding is applied.
    #[must_use]
    pub fn fold(provider_id: ProviderId, reviews: impl IntoIterator<Item = RatedReview>) -> Self {
        let mut sum: i64 = 0;
        let mut appointment_reviews: u64 = 0;
        let mut general_reviews: u64 = 0;

        for review in reviews {
            sum += i64::from(review.rating);
            match review.source {
                ReviewSource::Appointment { .. } => appointment_reviews += 1,
                ReviewSource::General => general_reviews += 1,
            }
        }

        let count = appointment_reviews + general_reviews;
        #[allow(clippy::cast_precision_loss)]
        let rating = if count == 0 {
            0.0
        } else {
            sum as f64 / count as f64
        };

        Self {
            provider_id,
            rating,
            appointment_reviews,
            general_reviews,
        }
    }

    /// Total number of reviews folded in
    #[must_use]
    pub const fn review_count(&self) -> u64 {
        self.appointment_reviews + self.general_reviews
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AppointmentId;
    use proptest::prelude::*;

    fn appointment(id: i64, rating: i32) -> RatedReview {
        RatedReview {
            source: ReviewSource::Appointment {
                appointment_id: AppointmentId(id),
            },
            rating,
        }
    }

    const fn general(rating: i32) -> RatedReview {
        RatedReview {
            source: ReviewSource::General,
            rating,
        }
    }

    #[test]
    fn empty_population_rates_zero() {
        let rating = ProviderRating::fold(ProviderId(1), []);
        assert!(rating.rating.abs() < f64::EPSILON);
        assert_eq!(rating.review_count(), 0);
    }

    #[test]
    fn sources_form_one_population() {
        let rating = ProviderRating::fold(ProviderId(1), [appointment(1, 5), general(3)]);
        assert!((rating.rating - 4.0).abs() < f64::EPSILON);
        assert_eq!(rating.appointment_reviews, 1);
        assert_eq!(rating.general_reviews, 1);
    }

    #[test]
    fn mean_is_not_rounded() {
        let rating = ProviderRating::fold(
            ProviderId(1),
            [appointment(1, 5), general(4), general(4)],
        );
        assert!((rating.rating - 13.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn scale_bounds_are_inclusive() {
        let scale = RatingScale::default();
        assert!(scale.validate(1).is_ok());
        assert!(scale.validate(5).is_ok());
        assert_eq!(
            scale.validate(6),
            Err(SchedulingError::RatingOutOfRange {
                rating: 6,
                min: 1,
                max: 5
            })
        );
        assert!(scale.validate(0).is_err());
    }

    proptest! {
        #[test]
        fn mean_stays_within_scale(
            ratings in proptest::collection::vec((1i32..=5, any::<bool>()), 1..64)
        ) {
            let reviews = ratings.iter().enumerate().map(|(i, &(rating, linked))| {
                if linked {
                    appointment(i64::try_from(i).unwrap_or(0), rating)
                } else {
                    general(rating)
                }
            });
            let aggregate = ProviderRating::fold(ProviderId(9), reviews);
            prop_assert!(aggregate.rating >= 1.0);
            prop_assert!(aggregate.rating <= 5.0);
            prop_assert_eq!(aggregate.review_count(), ratings.len() as u64);
        }

        #[test]
        fn order_does_not_change_the_mean(
            ratings in proptest::collection::vec(1i32..=5, 0..32)
        ) {
            let forward = ProviderRating::fold(ProviderId(1), ratings.iter().map(|&r| general(r)));
            let backward = ProviderRating::fold(ProviderId(1), ratings.iter().rev().map(|&r| general(r)));
            prop_assert!((forward.rating - backward.rating).abs() < 1e-9);
        }
    }
}
