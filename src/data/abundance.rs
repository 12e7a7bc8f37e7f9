//! Relative-abundance profiles keyed by sample.

use super::csv_io::write_csv_atomic;
use super::taxon::{Role, Taxon};
use crate::error::Result;
use csv::Writer;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::Path;

/// Relative abundance of every panel taxon in one sample.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SampleAbundance {
    values: [f64; 7],
}

impl SampleAbundance {
    /// Build from a function evaluated once per panel taxon.
    pub fn from_fn<F: FnMut(Taxon) -> f64>(mut f: F) -> Self {
        let mut values = [0.0; 7];
        for taxon in Taxon::PANEL {
            values[taxon as usize] = f(taxon);
        }
        Self { values }
    }

    #[inline]
    pub fn get(&self, taxon: Taxon) -> f64 {
        self.values[taxon as usize]
    }

    #[inline]
    pub fn set(&mut self, taxon: Taxon, value: f64) {
        self.values[taxon as usize] = value;
    }

    /// `(taxon, abundance)` pairs in panel order.
    pub fn iter(&self) -> impl Iterator<Item = (Taxon, f64)> + '_ {
        Taxon::PANEL.into_iter().map(move |t| (t, self.get(t)))
    }

    /// Sum over the whole panel.
    pub fn total(&self) -> f64 {
        self.values.iter().sum()
    }

    /// Sum over the taxa with the given role.
    pub fn role_total(&self, role: Role) -> f64 {
        self.iter()
            .filter(|(t, _)| t.role() == role)
            .map(|(_, v)| v)
            .sum()
    }

    /// Beneficial load on the percentage scale (100 × summed abundance).
    pub fn beneficial_percent(&self) -> f64 {
        Aggregate::Beneficial.value(self)
    }

    /// Harmful load on the percentage scale (100 × summed abundance).
    pub fn harmful_percent(&self) -> f64 {
        Aggregate::Harmful.value(self)
    }
}

/// Per-sample aggregate over the beneficial or harmful taxa, on the
/// percentage scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Aggregate {
    Beneficial,
    Harmful,
}

impl Aggregate {
    pub const ALL: [Aggregate; 2] = [Aggregate::Beneficial, Aggregate::Harmful];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Beneficial => "beneficial_percent",
            Self::Harmful => "harmful_percent",
        }
    }

    pub fn role(&self) -> Role {
        match self {
            Self::Beneficial => Role::Beneficial,
            Self::Harmful => Role::Harmful,
        }
    }

    pub fn value(&self, abundance: &SampleAbundance) -> f64 {
        abundance.role_total(self.role()) * 100.0
    }
}

/// Abundances for a batch of samples, in input order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AbundanceProfile {
    samples: Vec<(String, SampleAbundance)>,
}

impl AbundanceProfile {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a sample. A repeated sample id replaces the earlier entry.
    pub fn insert(&mut self, sample_id: &str, abundance: SampleAbundance) {
        match self.samples.iter_mut().find(|(id, _)| id == sample_id) {
            Some(entry) => entry.1 = abundance,
            None => self.samples.push((sample_id.to_string(), abundance)),
        }
    }

    pub fn get(&self, sample_id: &str) -> Option<&SampleAbundance> {
        self.samples
            .iter()
            .find(|(id, _)| id == sample_id)
            .map(|(_, a)| a)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SampleAbundance)> {
        self.samples.iter().map(|(id, a)| (id.as_str(), a))
    }

    pub fn sample_ids(&self) -> Vec<&str> {
        self.samples.iter().map(|(id, _)| id.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Write the profile as CSV: one row per sample, one column per taxon.
    pub fn to_csv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        write_csv_atomic(path, |writer| self.write_records(writer))
    }

    pub fn write_records<W: Write>(&self, writer: &mut Writer<W>) -> Result<()> {
        let mut header = vec!["sample_name".to_string()];
        header.extend(Taxon::PANEL.iter().map(|t| t.name().to_string()));
        writer.write_record(&header)?;

        for (sample_id, abundance) in &self.samples {
            let mut record = vec![sample_id.clone()];
            record.extend(abundance.iter().map(|(_, v)| v.to_string()));
            writer.write_record(&record)?;
        }
        Ok(())
    }
}
