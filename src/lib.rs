//! Vaginal Microbiome qPCR Panel Library
//!
//! Turns raw qPCR exports for a fixed seven-taxon panel into relative
//! abundances, ranks them against a growing reference population and
//! assigns each sample a community state type and a spray group.
//!
//! # Overview
//!
//! - **data**: Panel taxa, measurement tables, abundance profiles, the
//!   reference population and evaluation results
//! - **normalize**: ΔCt normalization against the universal probe, with the
//!   detection gate
//! - **rank**: Percentile and mean-threshold tiering
//! - **classify**: Community-type and spray-group rules
//! - **summarize**: Distribution summaries of the reference population
//! - **pipeline**: Run configuration and batch execution
//!
//! # Example
//!
//! ```no_run
//! use vaginal_qpcr::prelude::*;
//!
//! let table = MeasurementTable::from_export("batch_07.csv").unwrap();
//! let reference = ReferencePopulation::from_csv("reference.csv").unwrap();
//!
//! let report = Analysis::new(AnalysisConfig::default())
//!     .run(&table, &reference)
//!     .unwrap();
//! report.write("output").unwrap();
//! ```

pub mod classify;
pub mod data;
pub mod error;
pub mod normalize;
pub mod pipeline;
pub mod rank;
pub mod summarize;

/// Convenient re-exports for common usage.
pub mod prelude {
    pub use crate::classify::{
        classify_by_abundance, classify_by_percentile, AbundanceClassifier, Classification,
        ClassifierKind,
    };
    pub use crate::data::{
        format_tier, AbundanceProfile, Aggregate, CommunityType, EvaluationRecord, EvaluationSet,
        MeasurementRow, MeasurementTable, MetricEvaluation, ReferencePopulation, Role,
        SampleAbundance, SprayGroup, Target, Taxon, Tier,
    };
    pub use crate::error::{QpcrError, Result};
    pub use crate::normalize::{norm_delta_ct, relative_abundance, DetectionGate};
    pub use crate::pipeline::{
        update_reference, Analysis, AnalysisConfig, AnalysisReport, ReferenceUpdate,
    };
    pub use crate::rank::{percentile_rank, RankEvaluator, RankStrategy};
    pub use crate::summarize::{summarize, DistributionSummary, ReferenceSummary};
}
