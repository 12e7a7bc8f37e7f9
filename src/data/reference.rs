//! Historical reference population of relative abundances.
//!
//! Stored on disk as a taxa × samples CSV whose first header cell is
//! `taxa`. New batches are merged in column-wise; stored samples are never
//! modified or removed.

use super::abundance::{Aggregate, AbundanceProfile, SampleAbundance};
use super::csv_io::{strip_bom, write_csv_atomic};
use super::taxon::Taxon;
use crate::error::{QpcrError, Result};
use csv::ReaderBuilder;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// Header of the taxon column in the reference file.
pub const TAXA_HEADER: &str = "taxa";

/// Abundance values of previously analysed samples.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferencePopulation {
    /// Row names, in file order.
    taxa: Vec<String>,
    /// Column names, in file order.
    sample_ids: Vec<String>,
    /// Values indexed as `values[taxon_row][sample_col]`.
    values: Vec<Vec<f64>>,
}

impl ReferencePopulation {
    pub fn new(taxa: Vec<String>, sample_ids: Vec<String>, values: Vec<Vec<f64>>) -> Result<Self> {
        if values.len() != taxa.len() {
            return Err(QpcrError::InvalidParameter(format!(
                "expected {} taxon rows, got {}",
                taxa.len(),
                values.len()
            )));
        }
        if let Some(row) = values.iter().find(|r| r.len() != sample_ids.len()) {
            return Err(QpcrError::InvalidParameter(format!(
                "expected {} sample values per taxon, got {}",
                sample_ids.len(),
                row.len()
            )));
        }
        Ok(Self {
            taxa,
            sample_ids,
            values,
        })
    }

    /// An empty population containing the panel taxa and no samples.
    pub fn empty() -> Self {
        Self {
            taxa: Taxon::PANEL.iter().map(|t| t.name().to_string()).collect(),
            sample_ids: Vec::new(),
            values: vec![Vec::new(); Taxon::PANEL.len()],
        }
    }

    /// Load a reference file. Empty cells read as 0.
    pub fn from_csv<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_path(path)?;
        let mut records = reader.records();

        let header = records
            .next()
            .ok_or_else(|| QpcrError::EmptyData("Empty reference file".to_string()))??;
        if header.is_empty() || strip_bom(&header[0]).trim().is_empty() {
            return Err(QpcrError::Schema(
                "reference file header has no taxon column".to_string(),
            ));
        }
        let sample_ids: Vec<String> = header.iter().skip(1).map(|s| s.trim().to_string()).collect();

        let mut taxa = Vec::new();
        let mut values = Vec::new();
        for record in records {
            let record = record?;
            let taxon = match record.get(0) {
                Some(t) if !t.trim().is_empty() => t.trim().to_string(),
                _ => continue,
            };

            let mut row = Vec::with_capacity(sample_ids.len());
            for (col, sample_id) in sample_ids.iter().enumerate() {
                let cell = record.get(col + 1).unwrap_or("").trim();
                let value = if cell.is_empty() {
                    0.0
                } else {
                    cell.parse::<f64>().map_err(|_| QpcrError::InvalidAbundance {
                        value: cell.to_string(),
                        taxon: taxon.clone(),
                        sample: sample_id.clone(),
                    })?
                };
                row.push(value);
            }
            taxa.push(taxon);
            values.push(row);
        }

        Self::new(taxa, sample_ids, values)
    }

    /// Persist the whole table, replacing `path` atomically.
    pub fn to_csv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        write_csv_atomic(path, |writer| {
            let mut header = Vec::with_capacity(self.sample_ids.len() + 1);
            header.push(TAXA_HEADER.to_string());
            header.extend(self.sample_ids.iter().cloned());
            writer.write_record(&header)?;

            for (taxon, row) in self.taxa.iter().zip(&self.values) {
                let mut record = Vec::with_capacity(row.len() + 1);
                record.push(taxon.clone());
                record.extend(row.iter().map(|v| v.to_string()));
                writer.write_record(&record)?;
            }
            Ok(())
        })
    }

    #[inline]
    pub fn taxa(&self) -> &[String] {
        &self.taxa
    }

    #[inline]
    pub fn sample_ids(&self) -> &[String] {
        &self.sample_ids
    }

    #[inline]
    pub fn n_samples(&self) -> usize {
        self.sample_ids.len()
    }

    pub fn contains_sample(&self, sample_id: &str) -> bool {
        self.sample_ids.iter().any(|s| s == sample_id)
    }

    fn row_index(&self, taxon: Taxon) -> Result<usize> {
        self.taxa
            .iter()
            .position(|t| t == taxon.name())
            .ok_or_else(|| QpcrError::MissingReferenceTaxon(taxon.name().to_string()))
    }

    /// All stored values for a taxon, in sample order.
    pub fn taxon_values(&self, taxon: Taxon) -> Result<&[f64]> {
        let row = self.row_index(taxon)?;
        Ok(&self.values[row])
    }

    /// Population mean abundance of a taxon.
    pub fn taxon_mean(&self, taxon: Taxon) -> Result<f64> {
        mean(self.taxon_values(taxon)?)
            .ok_or_else(|| QpcrError::EmptyData("reference population has no samples".to_string()))
    }

    /// Panel abundances of the stored sample in column `col`.
    pub fn sample_abundance(&self, col: usize) -> Result<SampleAbundance> {
        if col >= self.n_samples() {
            return Err(QpcrError::InvalidParameter(format!(
                "sample index {} out of bounds",
                col
            )));
        }
        let mut abundance = SampleAbundance::default();
        for taxon in Taxon::PANEL {
            let row = self.row_index(taxon)?;
            abundance.set(taxon, self.values[row][col]);
        }
        Ok(abundance)
    }

    /// An aggregate metric evaluated for every stored sample.
    pub fn aggregate_values(&self, aggregate: Aggregate) -> Result<Vec<f64>> {
        (0..self.n_samples())
            .map(|col| self.sample_abundance(col).map(|a| aggregate.value(&a)))
            .collect()
    }

    /// Population mean of an aggregate metric.
    pub fn aggregate_mean(&self, aggregate: Aggregate) -> Result<f64> {
        mean(&self.aggregate_values(aggregate)?)
            .ok_or_else(|| QpcrError::EmptyData("reference population has no samples".to_string()))
    }

    /// Append the samples of `profile` that are not stored yet.
    ///
    /// Stored values win for sample ids already present. Panel taxa missing
    /// from the table are added as rows, with 0 for the older samples; rows
    /// for non-panel taxa get 0 for the new samples.
    pub fn merge(&self, profile: &AbundanceProfile) -> ReferencePopulation {
        let mut merged = self.clone();

        for taxon in Taxon::PANEL {
            if !merged.taxa.iter().any(|t| t == taxon.name()) {
                merged.taxa.push(taxon.name().to_string());
                merged.values.push(vec![0.0; merged.sample_ids.len()]);
            }
        }

        let mut seen: HashSet<String> = merged.sample_ids.iter().cloned().collect();
        for (sample_id, abundance) in profile.iter() {
            if !seen.insert(sample_id.to_string()) {
                continue;
            }
            merged.sample_ids.push(sample_id.to_string());
            for (name, row) in merged.taxa.iter().zip(merged.values.iter_mut()) {
                let value = Taxon::from_name(name).map(|t| abundance.get(t)).unwrap_or(0.0);
                row.push(value);
            }
        }

        merged
    }
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}
