//! Ranking of sample values against the reference population.
//!
//! Two strategies are supported:
//!
//! - **Percentile**: the value's percentile within the reference values of
//!   the same taxon, banded into good/average/poor by role.
//! - **MeanThreshold**: the raw value against a fixed cutoff and the
//!   population mean, banded into high/average/low.
//!
//! Aggregates (beneficial %, harmful %) are ranked the same way against the
//! aggregate values of the reference samples.

mod percentile;
mod rules;

pub use percentile::{
    clamp_percentile, format_percentile, percentile_of_score, percentile_rank, round_one_decimal,
    PERCENTILE_CEILING, PERCENTILE_FLOOR,
};
pub use rules::{
    abundance_tier, percent_tier, percentile_tier, Condition, RuleTable, HIGH_ABUNDANCE_CUTOFF,
    HIGH_PERCENT_CUTOFF, LOWER_PERCENTILE_CUTOFF, UPPER_PERCENTILE_CUTOFF,
};

use crate::data::{Aggregate, MetricEvaluation, ReferencePopulation, SampleAbundance, Taxon};
use crate::error::Result;
use serde::{Deserialize, Serialize};

/// How sample values are turned into tiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RankStrategy {
    Percentile,
    MeanThreshold,
}

impl RankStrategy {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Percentile => "percentile",
            Self::MeanThreshold => "mean-threshold",
        }
    }
}

/// Tiers for every panel taxon and both aggregates of one sample.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedSample {
    pub taxa: Vec<(Taxon, MetricEvaluation)>,
    pub beneficial: MetricEvaluation,
    pub harmful: MetricEvaluation,
}

/// Reference statistics resolved once per run.
#[derive(Debug, Clone)]
pub struct RankEvaluator {
    strategy: RankStrategy,
    /// Reference values per panel taxon, indexed by `Taxon as usize`.
    taxon_values: Vec<Vec<f64>>,
    /// Reference values per aggregate, in `Aggregate::ALL` order.
    aggregate_values: Vec<Vec<f64>>,
    /// Population means; only resolved for mean-threshold ranking.
    taxon_means: Vec<f64>,
    aggregate_means: Vec<f64>,
}

impl RankEvaluator {
    /// Resolve the reference statistics needed by `strategy`.
    ///
    /// Fails when the reference lacks a panel taxon, or when mean-threshold
    /// ranking is requested against a population without samples.
    pub fn new(reference: &ReferencePopulation, strategy: RankStrategy) -> Result<Self> {
        let taxon_values = Taxon::PANEL
            .iter()
            .map(|&t| reference.taxon_values(t).map(<[f64]>::to_vec))
            .collect::<Result<Vec<_>>>()?;
        let aggregate_values = Aggregate::ALL
            .iter()
            .map(|&a| reference.aggregate_values(a))
            .collect::<Result<Vec<_>>>()?;

        let (taxon_means, aggregate_means) = match strategy {
            RankStrategy::MeanThreshold => (
                Taxon::PANEL
                    .iter()
                    .map(|&t| reference.taxon_mean(t))
                    .collect::<Result<Vec<_>>>()?,
                Aggregate::ALL
                    .iter()
                    .map(|&a| reference.aggregate_mean(a))
                    .collect::<Result<Vec<_>>>()?,
            ),
            RankStrategy::Percentile => (Vec::new(), Vec::new()),
        };

        Ok(Self {
            strategy,
            taxon_values,
            aggregate_values,
            taxon_means,
            aggregate_means,
        })
    }

    #[inline]
    pub fn strategy(&self) -> RankStrategy {
        self.strategy
    }

    /// Clamped percentile of an abundance among the reference values of a
    /// taxon, regardless of the ranking strategy.
    pub fn taxon_percentile(&self, taxon: Taxon, abundance: f64) -> Option<f64> {
        percentile_rank(&self.taxon_values[taxon as usize], abundance)
    }

    pub fn evaluate_taxon(&self, taxon: Taxon, abundance: f64) -> MetricEvaluation {
        match self.strategy {
            RankStrategy::Percentile => {
                let percentile = self.taxon_percentile(taxon, abundance);
                MetricEvaluation {
                    value: abundance,
                    percentile,
                    tier: percentile_tier(taxon.role(), percentile),
                }
            }
            RankStrategy::MeanThreshold => MetricEvaluation {
                value: abundance,
                percentile: None,
                tier: abundance_tier(abundance, self.taxon_means[taxon as usize]),
            },
        }
    }

    pub fn evaluate_aggregate(&self, aggregate: Aggregate, percent: f64) -> MetricEvaluation {
        let idx = aggregate_index(aggregate);
        match self.strategy {
            RankStrategy::Percentile => {
                let percentile = percentile_rank(&self.aggregate_values[idx], percent);
                MetricEvaluation {
                    value: percent,
                    percentile,
                    tier: percentile_tier(aggregate.role(), percentile),
                }
            }
            RankStrategy::MeanThreshold => MetricEvaluation {
                value: percent,
                percentile: None,
                tier: percent_tier(percent, self.aggregate_means[idx]),
            },
        }
    }

    /// Rank every taxon and both aggregates of a sample.
    pub fn evaluate(&self, abundance: &SampleAbundance) -> RankedSample {
        RankedSample {
            taxa: abundance
                .iter()
                .map(|(t, v)| (t, self.evaluate_taxon(t, v)))
                .collect(),
            beneficial: self.evaluate_aggregate(Aggregate::Beneficial, abundance.beneficial_percent()),
            harmful: self.evaluate_aggregate(Aggregate::Harmful, abundance.harmful_percent()),
        }
    }
}

fn aggregate_index(aggregate: Aggregate) -> usize {
    match aggregate {
        Aggregate::Beneficial => 0,
        Aggregate::Harmful => 1,
    }
}
