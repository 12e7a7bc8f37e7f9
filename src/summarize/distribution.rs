//! Histogram summaries of reference-population metrics.

use crate::data::csv_io::write_csv_atomic;
use crate::data::{Aggregate, ReferencePopulation, Taxon};
use crate::error::{QpcrError, Result};
use csv::Writer;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::Path;

/// Bucket edges on the percentage scale.
pub const DEFAULT_EDGES: [f64; 6] = [0.0, 20.0, 40.0, 60.0, 80.0, 100.0];

/// Percentage of `values` falling into each bucket defined by `edges`.
///
/// Buckets are half-open `[edges[i], edges[i + 1])` except the last, which
/// is closed on the right. Values outside the edges are counted in the
/// nearest end bucket and non-finite values are skipped, so a nonempty
/// population always sums to 100. An empty population yields all zeros.
pub fn summarize(values: &[f64], edges: &[f64]) -> Result<Vec<f64>> {
    if edges.len() < 2 {
        return Err(QpcrError::InvalidParameter(
            "at least two bucket edges are required".to_string(),
        ));
    }
    if edges.windows(2).any(|w| !(w[0] < w[1])) {
        return Err(QpcrError::InvalidParameter(
            "bucket edges must be strictly increasing".to_string(),
        ));
    }

    let n_buckets = edges.len() - 1;
    let mut counts = vec![0usize; n_buckets];
    let mut n = 0usize;

    for &v in values.iter().filter(|v| v.is_finite()) {
        n += 1;
        counts[bucket_index(v, edges)] += 1;
    }

    if n == 0 {
        return Ok(vec![0.0; n_buckets]);
    }

    Ok(counts
        .iter()
        .map(|&c| c as f64 / n as f64 * 100.0)
        .collect())
}

fn bucket_index(value: f64, edges: &[f64]) -> usize {
    let last = edges.len() - 2;
    // Index of the first edge strictly greater than the value.
    let upper = edges.partition_point(|&e| e <= value);
    upper.saturating_sub(1).min(last)
}

/// Labels such as `0-20` for each bucket.
pub fn bucket_labels(edges: &[f64]) -> Vec<String> {
    edges
        .windows(2)
        .map(|w| format!("{}-{}", w[0], w[1]))
        .collect()
}

/// Mean and bucketed distribution of one reference metric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistributionSummary {
    pub metric: String,
    /// Number of finite values summarized.
    pub n: usize,
    /// `None` for an empty population.
    pub mean: Option<f64>,
    pub edges: Vec<f64>,
    pub percentages: Vec<f64>,
}

impl DistributionSummary {
    pub fn from_values(metric: &str, values: &[f64], edges: &[f64]) -> Result<Self> {
        let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
        let mean = if finite.is_empty() {
            None
        } else {
            Some(finite.iter().sum::<f64>() / finite.len() as f64)
        };
        Ok(Self {
            metric: metric.to_string(),
            n: finite.len(),
            mean,
            edges: edges.to_vec(),
            percentages: summarize(&finite, edges)?,
        })
    }

    /// True when there was no data to summarize.
    pub fn is_empty(&self) -> bool {
        self.n == 0
    }
}

/// Distribution summaries for every panel taxon and both aggregates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferenceSummary {
    pub n_samples: usize,
    pub metrics: Vec<DistributionSummary>,
}

impl ReferenceSummary {
    /// Summarize a reference population on the percentage scale.
    pub fn from_reference(reference: &ReferencePopulation) -> Result<Self> {
        let mut metrics = Vec::with_capacity(Taxon::PANEL.len() + Aggregate::ALL.len());

        for taxon in Taxon::PANEL {
            let percent: Vec<f64> = reference
                .taxon_values(taxon)?
                .iter()
                .map(|v| v * 100.0)
                .collect();
            metrics.push(DistributionSummary::from_values(
                taxon.name(),
                &percent,
                &DEFAULT_EDGES,
            )?);
        }
        for aggregate in Aggregate::ALL {
            let values = reference.aggregate_values(aggregate)?;
            metrics.push(DistributionSummary::from_values(
                aggregate.name(),
                &values,
                &DEFAULT_EDGES,
            )?);
        }

        Ok(Self {
            n_samples: reference.n_samples(),
            metrics,
        })
    }

    pub fn get(&self, metric: &str) -> Option<&DistributionSummary> {
        self.metrics.iter().find(|m| m.metric == metric)
    }

    /// Write one row per metric: mean followed by the bucket percentages.
    pub fn to_csv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        write_csv_atomic(path, |writer| self.write_records(writer))
    }

    pub fn write_records<W: Write>(&self, writer: &mut Writer<W>) -> Result<()> {

        let mut header = vec!["metric".to_string(), "n".to_string(), "mean".to_string()];
        header.extend(bucket_labels(&DEFAULT_EDGES));
        writer.write_record(&header)?;

        for m in &self.metrics {
            let mut record = vec![
                m.metric.clone(),
                m.n.to_string(),
                m.mean.map(|v| v.to_string()).unwrap_or_else(|| "None".to_string()),
            ];
            record.extend(m.percentages.iter().map(|p| format!("{:.1}", p)));
            writer.write_record(&record)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use tempfile::NamedTempFile;

    #[test]
    fn test_bucket_boundaries() {
        let values = [0.0, 19.9, 20.0, 40.0, 59.99, 80.0, 100.0];
        let p = summarize(&values, &DEFAULT_EDGES).unwrap();
        let n = values.len() as f64;
        assert_relative_eq!(p[0], 2.0 / n * 100.0);
        assert_relative_eq!(p[1], 1.0 / n * 100.0);
        assert_relative_eq!(p[2], 2.0 / n * 100.0);
        assert_relative_eq!(p[3], 0.0);
        // 80 and the closed right edge 100
        assert_relative_eq!(p[4], 2.0 / n * 100.0);
    }

    #[test]
    fn test_sums_to_hundred() {
        let values: Vec<f64> = (0..137).map(|i| (i as f64 * 7.3) % 130.0 - 10.0).collect();
        let p = summarize(&values, &DEFAULT_EDGES).unwrap();
        assert_eq!(p.len(), 5);
        assert_relative_eq!(p.iter().sum::<f64>(), 100.0, epsilon = 1e-9);
    }

    #[test]
    fn test_out_of_range_values() {
        let p = summarize(&[-3.0, 250.0], &DEFAULT_EDGES).unwrap();
        assert_eq!(p, vec![50.0, 0.0, 0.0, 0.0, 50.0]);
    }

    #[test]
    fn test_empty_population() {
        let p = summarize(&[], &DEFAULT_EDGES).unwrap();
        assert_eq!(p, vec![0.0; 5]);

        let s = DistributionSummary::from_values("L_iners", &[f64::NAN], &DEFAULT_EDGES).unwrap();
        assert!(s.is_empty());
        assert_eq!(s.mean, None);
    }

    #[test]
    fn test_invalid_edges() {
        assert!(summarize(&[1.0], &[0.0]).is_err());
        assert!(summarize(&[1.0], &[0.0, 50.0, 50.0]).is_err());
    }

    #[test]
    fn test_labels() {
        assert_eq!(
            bucket_labels(&DEFAULT_EDGES),
            vec!["0-20", "20-40", "40-60", "60-80", "80-100"]
        );
    }

    #[test]
    fn test_reference_summary() {
        let taxa = Taxon::PANEL.iter().map(|t| t.name().to_string()).collect();
        let values = Taxon::PANEL
            .iter()
            .map(|&t| match t {
                Taxon::LCrispatus => vec![0.9, 0.1, 0.5, 0.3],
                _ => vec![0.0; 4],
            })
            .collect();
        let samples = (1..=4).map(|i| format!("R{}", i)).collect();
        let reference = ReferencePopulation::new(taxa, samples, values).unwrap();

        let summary = ReferenceSummary::from_reference(&reference).unwrap();
        assert_eq!(summary.n_samples, 4);
        assert_eq!(summary.metrics.len(), 9);

        let crispatus = summary.get("L_crispatus").unwrap();
        assert_relative_eq!(crispatus.mean.unwrap(), 45.0, epsilon = 1e-9);
        assert_eq!(crispatus.percentages, vec![25.0, 25.0, 25.0, 0.0, 25.0]);

        let harmful = summary.get("harmful_percent").unwrap();
        assert_eq!(harmful.percentages, vec![100.0, 0.0, 0.0, 0.0, 0.0]);

        let file = NamedTempFile::new().unwrap();
        summary.to_csv(file.path()).unwrap();
        let content = std::fs::read_to_string(file.path()).unwrap();
        let mut lines = content.trim_start_matches('\u{feff}').lines();
        assert_eq!(lines.next().unwrap(), "metric,n,mean,0-20,20-40,40-60,60-80,80-100");
        assert!(lines.next().unwrap().starts_with("L_crispatus,4,"));
    }
}
