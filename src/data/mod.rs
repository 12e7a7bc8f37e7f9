//! Data structures for qPCR panel analysis.

mod abundance;
pub mod csv_io;
mod measurement;
mod reference;
mod result;
pub mod schema;
mod taxon;

pub use abundance::{Aggregate, AbundanceProfile, SampleAbundance};
pub use measurement::{parse_ct, MeasurementRow, MeasurementTable, UNDETERMINED_CT};
pub use reference::{ReferencePopulation, TAXA_HEADER};
pub use result::{
    format_tier, CommunityType, EvaluationRecord, EvaluationSet, MetricEvaluation, SprayGroup,
    Tier,
};
pub use schema::{ExportField, ExportSchema};
pub use taxon::{Role, Target, Taxon, UNIVERSAL};
