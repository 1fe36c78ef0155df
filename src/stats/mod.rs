//! Derived statistics over the full, unfiltered store contents.
//!
//! Everything here is a pure function of its input, so callers recompute
//! on every store change.

mod summary;

pub use summary::{OnboardingStats, SurveyStats, TeamStats, TestStats};

use serde::Serialize;

/// Round to one decimal place.
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// `numerator / denominator` as a percentage with one decimal; 0 when the
/// denominator is 0.
pub fn rate(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        return 0.0;
    }
    let pct = numerator / denominator * 100.0;
    if pct.is_finite() {
        round1(pct)
    } else {
        0.0
    }
}

pub fn count<R>(records: &[R], predicate: impl Fn(&R) -> bool) -> usize {
    records.iter().filter(|r| predicate(r)).count()
}

/// Mean of the present values; 0 for no values.
pub fn average<I>(values: I) -> f64
where
    I: IntoIterator<Item = Option<f64>>,
{
    let (sum, n) = values
        .into_iter()
        .flatten()
        .fold((0.0, 0usize), |(sum, n), v| (sum + v, n + 1));
    if n == 0 {
        0.0
    } else {
        sum / n as f64
    }
}

/// Period-over-period change in percent, rounded to an integer. A previous
/// count of 0 reports no change.
pub fn change_rate(current: usize, previous: usize) -> i64 {
    if previous == 0 {
        return 0;
    }
    let change = (current as f64 - previous as f64) / previous as f64 * 100.0;
    change.round() as i64
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NpsCategory {
    Promoter,
    Passive,
    Detractor,
}

impl NpsCategory {
    pub fn from_score(score: u8) -> Self {
        match score {
            9..=u8::MAX => NpsCategory::Promoter,
            7 | 8 => NpsCategory::Passive,
            _ => NpsCategory::Detractor,
        }
    }
}

impl std::fmt::Display for NpsCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NpsCategory::Promoter => write!(f, "promoter"),
            NpsCategory::Passive => write!(f, "passive"),
            NpsCategory::Detractor => write!(f, "detractor"),
        }
    }
}

/// Net promoter breakdown of the scored population.
///
/// Shares are unrounded percentages; rounding each for display may make
/// them sum to 99 or 101.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NpsDistribution {
    pub promoters: usize,
    pub passives: usize,
    pub detractors: usize,
    pub promoter_share: f64,
    pub passive_share: f64,
    pub detractor_share: f64,
    pub nps: i64,
}

impl NpsDistribution {
    pub fn from_scores<I>(scores: I) -> Self
    where
        I: IntoIterator<Item = u8>,
    {
        let mut dist = Self::default();
        for score in scores {
            match NpsCategory::from_score(score) {
                NpsCategory::Promoter => dist.promoters += 1,
                NpsCategory::Passive => dist.passives += 1,
                NpsCategory::Detractor => dist.detractors += 1,
            }
        }

        let total = dist.total();
        if total == 0 {
            return dist;
        }
        let share = |n: usize| n as f64 * 100.0 / total as f64;
        dist.promoter_share = share(dist.promoters);
        dist.passive_share = share(dist.passives);
        dist.detractor_share = share(dist.detractors);
        dist.nps = ((dist.promoters as f64 - dist.detractors as f64) / total as f64 * 100.0).round()
            as i64;
        dist
    }

    pub fn total(&self) -> usize {
        self.promoters + self.passives + self.detractors
    }

    /// Whole-percent shares as displayed: promoters, passives, detractors.
    pub fn rounded_shares(&self) -> (i64, i64, i64) {
        (
            self.promoter_share.round() as i64,
            self.passive_share.round() as i64,
            self.detractor_share.round() as i64,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_guards_zero_denominator() {
        assert_eq!(rate(0.0, 0.0), 0.0);
        assert_eq!(rate(5.0, 0.0), 0.0);
        assert_eq!(rate(8.0, 10.0), 80.0);
        assert_eq!(rate(1.0, 3.0), 33.3);
    }

    #[test]
    fn test_change_rate_guards_zero_previous() {
        assert_eq!(change_rate(12, 0), 0);
        assert_eq!(change_rate(0, 0), 0);
        assert_eq!(change_rate(15, 10), 50);
        assert_eq!(change_rate(5, 10), -50);
        assert_eq!(change_rate(2, 3), -33);
    }

    #[test]
    fn test_average_skips_missing() {
        assert_eq!(average(Vec::<Option<f64>>::new()), 0.0);
        assert_eq!(average(vec![None, None]), 0.0);
        assert_eq!(average(vec![Some(2.0), None, Some(4.0)]), 3.0);
    }

    #[test]
    fn test_count() {
        let values = [1, 2, 3, 4];
        assert_eq!(count(&values, |v| *v % 2 == 0), 2);
    }

    #[test]
    fn test_nps_thresholds() {
        assert_eq!(NpsCategory::from_score(10), NpsCategory::Promoter);
        assert_eq!(NpsCategory::from_score(9), NpsCategory::Promoter);
        assert_eq!(NpsCategory::from_score(8), NpsCategory::Passive);
        assert_eq!(NpsCategory::from_score(7), NpsCategory::Passive);
        assert_eq!(NpsCategory::from_score(6), NpsCategory::Detractor);
        assert_eq!(NpsCategory::from_score(0), NpsCategory::Detractor);
    }

    #[test]
    fn test_nps_distribution_even_split() {
        let dist = NpsDistribution::from_scores([9, 6, 8]);
        assert_eq!(dist.total(), 3);
        assert_eq!(dist.rounded_shares(), (33, 33, 33));
        assert_eq!(dist.nps, 0);
    }

    #[test]
    fn test_nps_distribution_empty() {
        let dist = NpsDistribution::from_scores(Vec::new());
        assert_eq!(dist, NpsDistribution::default());
        assert_eq!(dist.nps, 0);
    }

    #[test]
    fn test_nps_score() {
        let dist = NpsDistribution::from_scores([10, 10, 9, 7, 3]);
        // (3 - 1) / 5
        assert_eq!(dist.nps, 40);
        assert_eq!(dist.promoter_share, 60.0);
    }
}
