//! Batch orchestration: configuration and the analysis runner.

mod config;
mod runner;

pub use config::AnalysisConfig;
pub use runner::{
    update_reference, Analysis, AnalysisReport, ReferenceUpdate, ABUNDANCE_FILE, EVALUATION_FILE,
    REFERENCE_SUMMARY_FILE,
};
