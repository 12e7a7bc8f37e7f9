//! Error types for the vaginal-qpcr library.

use thiserror::Error;

/// Main error type for the library.
#[derive(Error, Debug)]
pub enum QpcrError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Could not replace file atomically: {0}")]
    Persist(#[from] tempfile::PersistError),

    #[error("Unrecognized export layout: {0}")]
    Schema(String),

    #[error("Invalid Ct value '{value}' for sample '{sample}' ({target})")]
    InvalidCt {
        value: String,
        sample: String,
        target: String,
    },

    #[error("Invalid melt temperature '{value}' for sample '{sample}' ({target})")]
    InvalidMeltTemperature {
        value: String,
        sample: String,
        target: String,
    },

    #[error("Sample '{sample}' has no {target} reading")]
    MissingTarget { sample: String, target: String },

    #[error("Sample '{sample}' has more than one {target} reading")]
    DuplicateTarget { sample: String, target: String },

    #[error("Taxon '{0}' is absent from the reference population")]
    MissingReferenceTaxon(String),

    #[error("Invalid abundance value '{value}' for taxon '{taxon}', sample '{sample}'")]
    InvalidAbundance {
        value: String,
        taxon: String,
        sample: String,
    },

    #[error("Empty data: {0}")]
    EmptyData(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("{stage} failed: {source}")]
    Stage {
        stage: &'static str,
        #[source]
        source: Box<QpcrError>,
    },

    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl QpcrError {
    /// Wrap an error with the name of the pipeline stage that produced it.
    pub fn in_stage(stage: &'static str, source: QpcrError) -> Self {
        match source {
            // Keep the innermost stage label.
            already @ QpcrError::Stage { .. } => already,
            other => QpcrError::Stage {
                stage,
                source: Box::new(other),
            },
        }
    }
}

/// Result type alias for library operations.
pub type Result<T> = std::result::Result<T, QpcrError>;
