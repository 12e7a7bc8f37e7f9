//! Community-state typing and spray-group routing.

mod community;

pub use community::{
    classify_by_abundance, classify_by_percentile, AbundanceClassifier, AbundanceRule,
    Classification, ClassifierKind, WEAK_SIGNAL_THRESHOLD,
};
