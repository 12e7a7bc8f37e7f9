//! Batch execution: measurements in, abundance and evaluation tables out.

use super::config::AnalysisConfig;
use crate::classify::{classify_by_percentile, AbundanceClassifier, Classification, ClassifierKind};
use crate::data::csv_io::stage_csv;
use crate::data::{
    AbundanceProfile, EvaluationRecord, EvaluationSet, MeasurementTable, ReferencePopulation,
    SampleAbundance, Taxon,
};
use crate::error::{QpcrError, Result};
use crate::normalize::{norm_delta_ct, DetectionGate};
use crate::rank::RankEvaluator;
use crate::summarize::ReferenceSummary;
use std::path::{Path, PathBuf};

pub const ABUNDANCE_FILE: &str = "abundance.csv";
pub const EVALUATION_FILE: &str = "evaluation.csv";
pub const REFERENCE_SUMMARY_FILE: &str = "reference_summary.csv";

/// Run `f`, labelling any failure with the stage name.
fn stage<T, F>(name: &'static str, f: F) -> Result<T>
where
    F: FnOnce() -> Result<T>,
{
    tracing::debug!(stage = name, "starting");
    f().map_err(|e| {
        tracing::error!(stage = name, error = %e, "stage failed");
        QpcrError::in_stage(name, e)
    })
}

/// Everything produced by one analysis run.
#[derive(Debug, Clone)]
pub struct AnalysisReport {
    pub profile: AbundanceProfile,
    pub evaluations: EvaluationSet,
    pub reference_summary: ReferenceSummary,
}

impl AnalysisReport {
    /// Write the three output tables into `dir`, creating it if needed.
    ///
    /// Every table is rendered to a temporary file first; existing files are
    /// only replaced once all three are complete.
    pub fn write<P: AsRef<Path>>(&self, dir: P) -> Result<Vec<PathBuf>> {
        let dir = dir.as_ref();
        stage("write outputs", || {
            std::fs::create_dir_all(dir)?;
            let staged = vec![
                stage_csv(dir.join(ABUNDANCE_FILE), |w| self.profile.write_records(w))?,
                stage_csv(dir.join(EVALUATION_FILE), |w| self.evaluations.write_records(w))?,
                stage_csv(dir.join(REFERENCE_SUMMARY_FILE), |w| {
                    self.reference_summary.write_records(w)
                })?,
            ];

            let mut paths = Vec::with_capacity(staged.len());
            for table in staged {
                paths.push(table.path().to_path_buf());
                table.commit()?;
            }
            tracing::info!(dir = %dir.display(), "wrote output tables");
            Ok(paths)
        })
    }
}

/// Result of folding a batch into the reference population.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceUpdate {
    /// Sample ids appended to the reference.
    pub added: Vec<String>,
    /// Sample ids skipped because the reference already held them.
    pub already_present: Vec<String>,
    /// Samples in the reference after the update.
    pub n_samples: usize,
}

/// An analysis run configured once and applied to batches.
#[derive(Debug, Clone, Default)]
pub struct Analysis {
    config: AnalysisConfig,
}

impl Analysis {
    pub fn new(config: AnalysisConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Rank and classify every sample of `profile` against `reference`.
    pub fn evaluate(
        &self,
        profile: &AbundanceProfile,
        reference: &ReferencePopulation,
    ) -> Result<EvaluationSet> {
        let evaluator = RankEvaluator::new(reference, self.config.strategy)?;
        let classifier = AbundanceClassifier::with_threshold(self.config.weak_signal_threshold);

        let records = profile
            .iter()
            .map(|(sample_id, abundance)| {
                let ranked = evaluator.evaluate(abundance);
                let classification = self.classify(&evaluator, &classifier, abundance);
                EvaluationRecord {
                    sample_id: sample_id.to_string(),
                    taxa: ranked.taxa,
                    beneficial: ranked.beneficial,
                    harmful: ranked.harmful,
                    community_type: classification.community_type,
                    spray_group: classification.spray_group,
                }
            })
            .collect();

        Ok(EvaluationSet::new(self.config.strategy, records))
    }

    fn classify(
        &self,
        evaluator: &RankEvaluator,
        classifier: &AbundanceClassifier,
        abundance: &SampleAbundance,
    ) -> Classification {
        match self.config.classifier {
            ClassifierKind::Abundance => classifier.classify(abundance),
            ClassifierKind::Percentile => {
                let percentiles: Vec<(Taxon, Option<f64>)> = abundance
                    .iter()
                    .map(|(t, v)| (t, evaluator.taxon_percentile(t, v)))
                    .collect();
                classify_by_percentile(&percentiles)
            }
        }
    }

    /// Run the in-memory pipeline on an already loaded batch.
    pub fn run(
        &self,
        table: &MeasurementTable,
        reference: &ReferencePopulation,
    ) -> Result<AnalysisReport> {
        tracing::info!(
            run = %self.config.name,
            samples = table.n_samples(),
            reference_samples = reference.n_samples(),
            strategy = self.config.strategy.name(),
            "analyzing batch"
        );

        let profile = stage("compute abundance", || {
            norm_delta_ct(table, &self.config.detection_gate)
        })?;
        let evaluations = stage("evaluate samples", || self.evaluate(&profile, reference))?;
        let reference_summary = stage("summarize reference", || {
            ReferenceSummary::from_reference(reference)
        })?;

        for (label, count) in evaluations.type_counts() {
            tracing::info!(community_type = label, samples = count, "classified");
        }

        Ok(AnalysisReport {
            profile,
            evaluations,
            reference_summary,
        })
    }

    /// Read the batch and reference from disk, run, and write the outputs
    /// to the configured output directory.
    pub fn run_files<P, Q>(&self, input: P, reference_path: Q) -> Result<AnalysisReport>
    where
        P: AsRef<Path>,
        Q: AsRef<Path>,
    {
        let table = stage("read measurements", || MeasurementTable::from_export(input))?;
        let reference = stage("load reference", || ReferencePopulation::from_csv(reference_path))?;

        let report = self.run(&table, &reference)?;
        report.write(&self.config.output_dir)?;
        Ok(report)
    }
}

/// Append the abundances of a new batch to the reference file.
///
/// A missing reference file starts an empty population. Samples already
/// stored keep their values, so repeating an update changes nothing.
pub fn update_reference<P, Q>(
    input: P,
    reference_path: Q,
    gate: &DetectionGate,
) -> Result<ReferenceUpdate>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
{
    let reference_path = reference_path.as_ref();

    let table = stage("read measurements", || MeasurementTable::from_export(input))?;
    let profile = stage("compute abundance", || norm_delta_ct(&table, gate))?;

    let current = stage("load reference", || {
        if reference_path.exists() {
            ReferencePopulation::from_csv(reference_path)
        } else {
            tracing::warn!(
                path = %reference_path.display(),
                "reference file not found, starting an empty population"
            );
            Ok(ReferencePopulation::empty())
        }
    })?;

    let (already_present, added): (Vec<String>, Vec<String>) = profile
        .sample_ids()
        .into_iter()
        .map(String::from)
        .partition(|id| current.contains_sample(id));

    let merged = current.merge(&profile);
    stage("write reference", || merged.to_csv(reference_path))?;

    tracing::info!(
        added = added.len(),
        skipped = already_present.len(),
        total = merged.n_samples(),
        "reference updated"
    );

    Ok(ReferenceUpdate {
        added,
        already_present,
        n_samples: merged.n_samples(),
    })
}
