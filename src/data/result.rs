//! Per-sample evaluation records.

use super::csv_io::write_csv_atomic;
use super::taxon::Taxon;
use crate::error::Result;
use crate::rank::{format_percentile, RankStrategy};
use csv::Writer;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::io::Write;
use std::path::Path;

/// Qualitative tier assigned by a rule table.
///
/// `Good`/`Average`/`Poor` come from percentile ranking, `High`/`Average`/`Low`
/// from mean-threshold ranking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Tier {
    Good,
    Average,
    Poor,
    High,
    Low,
}

impl Tier {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Good => "good",
            Self::Average => "average",
            Self::Poor => "poor",
            Self::High => "high",
            Self::Low => "low",
        }
    }
}

/// Tier label for output; an undefined tier prints as `None`.
pub fn format_tier(tier: Option<Tier>) -> &'static str {
    tier.map(|t| t.name()).unwrap_or("None")
}

/// Community classification of a sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CommunityType {
    /// Community state type named after the dominant taxon.
    Dominant(Taxon),
    /// Signal too weak to name a dominant taxon.
    Other,
    /// Harmful taxa outweigh beneficial taxa.
    ImmuneCompromised,
}

impl CommunityType {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Dominant(taxon) => taxon.cst_label(),
            Self::Other => "other",
            Self::ImmuneCompromised => "immune-compromised",
        }
    }
}

impl fmt::Display for CommunityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Spray-treatment group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SprayGroup {
    /// Default group for lactobacillus-dominated communities.
    C,
    /// Group for weak, harmful-dominated or immune-compromised profiles.
    G,
}

impl SprayGroup {
    pub fn name(&self) -> &'static str {
        match self {
            Self::C => "C",
            Self::G => "G",
        }
    }
}

impl fmt::Display for SprayGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Ranking of a single value (a taxon abundance or an aggregate percentage).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricEvaluation {
    pub value: f64,
    /// Clamped percentile within the reference population, when ranked by
    /// percentile and defined.
    pub percentile: Option<f64>,
    pub tier: Option<Tier>,
}

/// Everything derived for one sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationRecord {
    pub sample_id: String,
    /// One entry per panel taxon, in panel order.
    pub taxa: Vec<(Taxon, MetricEvaluation)>,
    pub beneficial: MetricEvaluation,
    pub harmful: MetricEvaluation,
    pub community_type: CommunityType,
    pub spray_group: SprayGroup,
}

impl EvaluationRecord {
    pub fn taxon(&self, taxon: Taxon) -> Option<&MetricEvaluation> {
        self.taxa.iter().find(|(t, _)| *t == taxon).map(|(_, e)| e)
    }
}

/// Evaluation records for a batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationSet {
    pub strategy: RankStrategy,
    pub records: Vec<EvaluationRecord>,
}

impl EvaluationSet {
    pub fn new(strategy: RankStrategy, records: Vec<EvaluationRecord>) -> Self {
        Self { strategy, records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, sample_id: &str) -> Option<&EvaluationRecord> {
        self.records.iter().find(|r| r.sample_id == sample_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &EvaluationRecord> {
        self.records.iter()
    }

    /// Number of samples per community type label.
    pub fn type_counts(&self) -> BTreeMap<&'static str, usize> {
        let mut counts = BTreeMap::new();
        for r in &self.records {
            *counts.entry(r.community_type.label()).or_insert(0) += 1;
        }
        counts
    }

    /// Write the evaluation table as CSV.
    ///
    /// Percentile columns are only written for percentile ranking.
    pub fn to_csv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        write_csv_atomic(path, |writer| self.write_records(writer))
    }

    pub fn write_records<W: Write>(&self, writer: &mut Writer<W>) -> Result<()> {
        let with_percentile = self.strategy == RankStrategy::Percentile;

        let mut header = vec!["sample_name".to_string()];
        for taxon in Taxon::PANEL {
            header.push(format!("{}_abundance", taxon.name()));
            if with_percentile {
                header.push(format!("{}_percentile", taxon.name()));
            }
            header.push(format!("{}_tier", taxon.name()));
        }
        for name in ["beneficial", "harmful"] {
            header.push(format!("{}_percent", name));
            if with_percentile {
                header.push(format!("{}_percentile", name));
            }
            header.push(format!("{}_tier", name));
        }
        header.push("community_type".to_string());
        header.push("spray_group".to_string());
        writer.write_record(&header)?;

        let push_metric = |record: &mut Vec<String>, m: &MetricEvaluation| {
            record.push(m.value.to_string());
            if with_percentile {
                record.push(format_percentile(m.percentile));
            }
            record.push(format_tier(m.tier).to_string());
        };

        for r in &self.records {
            let mut record = vec![r.sample_id.clone()];
            for (_, m) in &r.taxa {
                push_metric(&mut record, m);
            }
            push_metric(&mut record, &r.beneficial);
            push_metric(&mut record, &r.harmful);
            record.push(r.community_type.label().to_string());
            record.push(r.spray_group.name().to_string());
            writer.write_record(&record)?;
        }
        Ok(())
    }
}
