//! Run configuration, loadable from YAML.

use crate::classify::{ClassifierKind, WEAK_SIGNAL_THRESHOLD};
use crate::error::{QpcrError, Result};
use crate::normalize::DetectionGate;
use crate::rank::RankStrategy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Settings for an analysis or reference-update run.
///
/// Every field has a default, so a YAML file only needs the values it
/// changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Name of the run, used in logs.
    pub name: String,
    pub description: Option<String>,
    /// How abundances are turned into tiers.
    pub strategy: RankStrategy,
    /// Which classifier assigns community type and spray group.
    pub classifier: ClassifierKind,
    pub detection_gate: DetectionGate,
    /// Total panel abundance below which a sample is typed `other`.
    pub weak_signal_threshold: f64,
    /// Directory receiving the output tables.
    pub output_dir: PathBuf,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            name: "vaginal-qpcr".to_string(),
            description: None,
            strategy: RankStrategy::MeanThreshold,
            classifier: ClassifierKind::Abundance,
            detection_gate: DetectionGate::default(),
            weak_signal_threshold: WEAK_SIGNAL_THRESHOLD,
            output_dir: PathBuf::from("output"),
        }
    }
}

impl AnalysisConfig {
    /// Load from YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Save to YAML string.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(QpcrError::from)
    }

    /// Load from a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let yaml = std::fs::read_to_string(path)?;
        Self::from_yaml(&yaml)
    }

    /// Reject values that would make the rule tables meaningless.
    pub fn validate(&self) -> Result<()> {
        if !self.weak_signal_threshold.is_finite() || self.weak_signal_threshold < 0.0 {
            return Err(QpcrError::InvalidParameter(format!(
                "weak_signal_threshold must be a non-negative number, got {}",
                self.weak_signal_threshold
            )));
        }
        let gate = &self.detection_gate;
        if !gate.undetermined_ct.is_finite() || !gate.min_melt_temperature.is_finite() {
            return Err(QpcrError::InvalidParameter(
                "detection gate thresholds must be finite".to_string(),
            ));
        }
        Ok(())
    }
}
