//! Review aggregation.
//!
//! Product pages show the average rating and a 5..1 star histogram expressed
//! as whole percentages of all reviews.

use std::collections::BTreeMap;

use serde::{Serialize, Serializer};
use utoipa::ToSchema;

pub const MIN_RATING: i32 = 1;
pub const MAX_RATING: i32 = 5;

/// Count and mean of a product's ratings
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReviewSummary {
    pub review_count: u64,
    /// Mean rating, 0 when there are no reviews
    pub review_rating: f64,
}

impl ReviewSummary {
    pub fn from_ratings(ratings: &[i32]) -> Self {
        if ratings.is_empty() {
            return Self::default();
        }

        let total: i64 = ratings.iter().map(|rating| i64::from(*rating)).sum();
        Self {
            review_count: ratings.len() as u64,
            review_rating: total as f64 / ratings.len() as f64,
        }
    }
}

/// Percentage of reviews per star value, keyed 1..=5
pub type RatingDistribution = BTreeMap<u8, u32>;

/// Serialize a distribution with the highest star first
pub fn serialize_descending<S>(
    distribution: &RatingDistribution,
    serializer: S,
) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.collect_map(distribution.iter().rev())
}

/// Bucket ratings into a percentage histogram.
///
/// Every star value is present in the result. Ratings outside 1..=5 are not
/// bucketed but still count towards the total.
pub fn rating_distribution(ratings: &[i32]) -> RatingDistribution {
    let mut counts: BTreeMap<u8, u32> = (MIN_RATING..=MAX_RATING)
        .map(|star| (star as u8, 0))
        .collect();

    for rating in ratings {
        if (MIN_RATING..=MAX_RATING).contains(rating) {
            *counts.entry(*rating as u8).or_default() += 1;
        }
    }

    let total = ratings.len();
    if total == 0 {
        return counts;
    }

    counts
        .into_iter()
        .map(|(star, count)| {
            let percentage = (f64::from(count) / total as f64 * 100.0).round() as u32;
            (star, percentage)
        })
        .collect()
}

pub fn is_valid_rating(rating: i32) -> bool {
    (MIN_RATING..=MAX_RATING).contains(&rating)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_of_no_reviews_is_zero() {
        let summary = ReviewSummary::from_ratings(&[]);
        assert_eq!(summary.review_count, 0);
        assert_eq!(summary.review_rating, 0.0);
    }

    #[test]
    fn summary_averages_ratings() {
        let summary = ReviewSummary::from_ratings(&[5, 4, 4, 2]);
        assert_eq!(summary.review_count, 4);
        assert!((summary.review_rating - 3.75).abs() < f64::EPSILON);
    }

    #[test]
    fn distribution_always_has_every_star() {
        let distribution = rating_distribution(&[]);
        assert_eq!(distribution.len(), 5);
        assert!(distribution.values().all(|pct| *pct == 0));
    }

    #[test]
    fn distribution_rounds_to_whole_percentages() {
        let distribution = rating_distribution(&[5, 5, 4]);
        assert_eq!(distribution[&5], 67);
        assert_eq!(distribution[&4], 33);
        assert_eq!(distribution[&3], 0);
        assert_eq!(distribution[&1], 0);
    }

    #[test]
    fn out_of_range_ratings_are_not_bucketed() {
        let distribution = rating_distribution(&[5, 9]);
        assert_eq!(distribution[&5], 50);
        assert_eq!(distribution.values().sum::<u32>(), 50);
    }

    #[test]
    fn distribution_serializes_highest_star_first() {
        #[derive(Serialize)]
        struct Page {
            #[serde(serialize_with = "serialize_descending")]
            distribution: RatingDistribution,
        }

        let json = serde_json::to_string(&Page {
            distribution: rating_distribution(&[5, 1]),
        })
        .unwrap();
        assert_eq!(
            json,
            r#"{"distribution":{"5":50,"4":0,"3":0,"2":0,"1":50}}"#
        );
    }

    #[test]
    fn rating_bounds() {
        assert!(is_valid_rating(1));
        assert!(is_valid_rating(5));
        assert!(!is_valid_rating(0));
        assert!(!is_valid_rating(6));
    }
}
