//! Ordered tier rule tables.
//!
//! A table is a list of `(condition, tier)` pairs checked top to bottom; the
//! first condition that holds decides the tier. Boundary values therefore
//! belong to the earliest rule that claims them.

use crate::data::{Role, Tier};
use serde::{Deserialize, Serialize};

/// Percentiles at or above this are the top band.
pub const UPPER_PERCENTILE_CUTOFF: f64 = 70.0;
/// Percentiles at or above this (and below the upper cutoff) are the middle band.
pub const LOWER_PERCENTILE_CUTOFF: f64 = 30.0;
/// Abundance at or above this is always `high`.
pub const HIGH_ABUNDANCE_CUTOFF: f64 = 0.5;
/// Aggregate percentage at or above this is always `high`.
pub const HIGH_PERCENT_CUTOFF: f64 = 50.0;

/// A single threshold test.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Condition {
    /// `value >= threshold`
    AtLeast(f64),
    /// `value <= threshold`
    AtMost(f64),
    /// `value < threshold`
    Below(f64),
}

impl Condition {
    #[inline]
    pub fn holds(&self, value: f64) -> bool {
        match *self {
            Condition::AtLeast(t) => value >= t,
            Condition::AtMost(t) => value <= t,
            Condition::Below(t) => value < t,
        }
    }
}

/// First-match-wins list of tier rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleTable {
    rules: Vec<(Condition, Tier)>,
}

impl RuleTable {
    pub fn new(rules: Vec<(Condition, Tier)>) -> Self {
        Self { rules }
    }

    /// Tier of the first rule whose condition holds.
    ///
    /// `None` only when no rule matches, which for the built-in tables
    /// happens for NaN alone.
    pub fn evaluate(&self, value: f64) -> Option<Tier> {
        self.rules
            .iter()
            .find(|(condition, _)| condition.holds(value))
            .map(|&(_, tier)| tier)
    }

    pub fn rules(&self) -> &[(Condition, Tier)] {
        &self.rules
    }

    /// Percentile bands for a taxon (or aggregate) with the given role.
    ///
    /// A high percentile is good for beneficial taxa and poor for harmful ones.
    pub fn percentile(role: Role) -> Self {
        let (top, bottom) = match role {
            Role::Beneficial => (Tier::Good, Tier::Poor),
            Role::Harmful => (Tier::Poor, Tier::Good),
        };
        Self::new(vec![
            (Condition::AtLeast(UPPER_PERCENTILE_CUTOFF), top),
            (Condition::AtLeast(LOWER_PERCENTILE_CUTOFF), Tier::Average),
            (Condition::AtMost(LOWER_PERCENTILE_CUTOFF), bottom),
        ])
    }

    /// Raw value bands against a fixed cutoff and a population mean.
    pub fn mean_threshold(cutoff: f64, population_mean: f64) -> Self {
        Self::new(vec![
            (Condition::AtLeast(cutoff), Tier::High),
            (Condition::AtLeast(population_mean), Tier::Average),
            (Condition::Below(population_mean), Tier::Low),
        ])
    }
}

/// Tier of a percentile for a taxon with the given role.
pub fn percentile_tier(role: Role, percentile: Option<f64>) -> Option<Tier> {
    percentile.and_then(|p| RuleTable::percentile(role).evaluate(p))
}

/// Tier of an abundance against the population mean of the same taxon.
pub fn abundance_tier(abundance: f64, population_mean: f64) -> Option<Tier> {
    RuleTable::mean_threshold(HIGH_ABUNDANCE_CUTOFF, population_mean).evaluate(abundance)
}

/// Tier of an aggregate percentage against its population mean.
pub fn percent_tier(percent: f64, population_mean: f64) -> Option<Tier> {
    RuleTable::mean_threshold(HIGH_PERCENT_CUTOFF, population_mean).evaluate(percent)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_beneficial_percentile_bands() {
        let role = Role::Beneficial;
        assert_eq!(percentile_tier(role, Some(95.0)), Some(Tier::Good));
        assert_eq!(percentile_tier(role, Some(70.0)), Some(Tier::Good));
        assert_eq!(percentile_tier(role, Some(69.9)), Some(Tier::Average));
        assert_eq!(percentile_tier(role, Some(30.0)), Some(Tier::Average));
        assert_eq!(percentile_tier(role, Some(29.9)), Some(Tier::Poor));
        assert_eq!(percentile_tier(role, Some(5.0)), Some(Tier::Poor));
        assert_eq!(percentile_tier(role, None), None);
    }

    #[test]
    fn test_harmful_percentile_bands_are_inverted() {
        let role = Role::Harmful;
        assert_eq!(percentile_tier(role, Some(70.0)), Some(Tier::Poor));
        assert_eq!(percentile_tier(role, Some(50.0)), Some(Tier::Average));
        assert_eq!(percentile_tier(role, Some(30.0)), Some(Tier::Average));
        assert_eq!(percentile_tier(role, Some(12.5)), Some(Tier::Good));
    }

    #[test]
    fn test_percentile_table_is_total() {
        for role in [Role::Beneficial, Role::Harmful] {
            let table = RuleTable::percentile(role);
            for step in 0..=1000 {
                let p = step as f64 / 10.0;
                let matching = table.rules().iter().filter(|(c, _)| c.holds(p)).count();
                assert!(matching >= 1, "no rule for {}", p);
                assert!(table.evaluate(p).is_some());
            }
        }
    }

    #[test]
    fn test_mean_threshold_bands() {
        // Reference mean 0.2.
        assert_eq!(abundance_tier(0.6, 0.2), Some(Tier::High));
        assert_eq!(abundance_tier(0.5, 0.2), Some(Tier::High));
        assert_eq!(abundance_tier(0.3, 0.2), Some(Tier::Average));
        assert_eq!(abundance_tier(0.2, 0.2), Some(Tier::Average));
        assert_eq!(abundance_tier(0.1, 0.2), Some(Tier::Low));
        assert_eq!(abundance_tier(0.0, 0.2), Some(Tier::Low));
    }

    #[test]
    fn test_mean_above_cutoff() {
        // When the population mean exceeds the cutoff nothing is `average`.
        assert_eq!(abundance_tier(0.55, 0.7), Some(Tier::High));
        assert_eq!(abundance_tier(0.45, 0.7), Some(Tier::Low));
    }

    #[test]
    fn test_percent_scale() {
        assert_eq!(percent_tier(50.0, 20.0), Some(Tier::High));
        assert_eq!(percent_tier(25.0, 20.0), Some(Tier::Average));
        assert_eq!(percent_tier(19.9, 20.0), Some(Tier::Low));
    }

    #[test]
    fn test_mean_threshold_exactly_one_tier() {
        let table = RuleTable::mean_threshold(HIGH_ABUNDANCE_CUTOFF, 0.13);
        for step in 0..=200 {
            let v = step as f64 / 200.0;
            assert!(table.evaluate(v).is_some(), "no tier for {}", v);
        }
        assert_eq!(table.evaluate(f64::NAN), None);
    }
}
