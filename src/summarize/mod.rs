//! Reference-population summaries for reporting.

mod distribution;

pub use distribution::{
    bucket_labels, summarize, DistributionSummary, ReferenceSummary, DEFAULT_EDGES,
};
