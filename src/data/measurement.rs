//! Validated per-sample qPCR readings.

use super::schema;
use super::taxon::Target;
use crate::error::{QpcrError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Ct assigned to targets the instrument reports as "Undetermined".
pub const UNDETERMINED_CT: f64 = 40.1;

/// Parse a Ct cell, mapping the "Undetermined" sentinel to [`UNDETERMINED_CT`].
///
/// Returns `None` for anything that is neither the sentinel nor a finite number.
pub fn parse_ct(cell: &str) -> Option<f64> {
    let cell = cell.trim();
    if cell.eq_ignore_ascii_case("undetermined") {
        return Some(UNDETERMINED_CT);
    }
    cell.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// A single well reading: one target in one sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasurementRow {
    pub sample_id: String,
    pub target: Target,
    /// Cycle threshold, already normalized for undetermined wells.
    pub ct: f64,
    /// First melt-curve peak (Tm1), when the export carries one.
    pub melt_temperature: Option<f64>,
}

impl MeasurementRow {
    pub fn new(sample_id: &str, target: Target, ct: f64, melt_temperature: Option<f64>) -> Self {
        Self {
            sample_id: sample_id.to_string(),
            target,
            ct,
            melt_temperature,
        }
    }

    /// Whether the well showed no detectable amplification.
    pub fn is_undetermined(&self) -> bool {
        self.ct == UNDETERMINED_CT
    }
}

/// Readings for a batch of samples.
///
/// Every sample has exactly one `Universal` row and at most one row per
/// target. Samples keep the order in which they first appear.
#[derive(Debug, Clone)]
pub struct MeasurementTable {
    sample_ids: Vec<String>,
    rows: Vec<MeasurementRow>,
    index: HashMap<(String, Target), usize>,
}

impl MeasurementTable {
    /// Build a table from rows, validating the per-sample invariants.
    pub fn new(rows: Vec<MeasurementRow>) -> Result<Self> {
        if rows.is_empty() {
            return Err(QpcrError::EmptyData(
                "No measurement rows".to_string(),
            ));
        }

        let mut sample_ids: Vec<String> = Vec::new();
        let mut index = HashMap::with_capacity(rows.len());

        for (i, row) in rows.iter().enumerate() {
            if !sample_ids.contains(&row.sample_id) {
                sample_ids.push(row.sample_id.clone());
            }
            let key = (row.sample_id.clone(), row.target);
            if index.insert(key, i).is_some() {
                return Err(QpcrError::DuplicateTarget {
                    sample: row.sample_id.clone(),
                    target: row.target.to_string(),
                });
            }
        }

        for sample in &sample_ids {
            if !index.contains_key(&(sample.clone(), Target::Universal)) {
                return Err(QpcrError::MissingTarget {
                    sample: sample.clone(),
                    target: Target::Universal.to_string(),
                });
            }
        }

        Ok(Self {
            sample_ids,
            rows,
            index,
        })
    }

    /// Load an instrument export (CSV, or tab-delimited for `.tsv`/`.txt`).
    pub fn from_export<P: AsRef<Path>>(path: P) -> Result<Self> {
        let rows = schema::read_export(path)?;
        Self::new(rows)
    }

    /// Look up the reading for a target in a sample.
    pub fn get(&self, sample_id: &str, target: Target) -> Option<&MeasurementRow> {
        self.index
            .get(&(sample_id.to_string(), target))
            .map(|&i| &self.rows[i])
    }

    /// All readings belonging to one sample, in input order.
    pub fn sample_rows<'a>(&'a self, sample_id: &'a str) -> impl Iterator<Item = &'a MeasurementRow> + 'a {
        self.rows.iter().filter(move |r| r.sample_id == sample_id)
    }

    #[inline]
    pub fn sample_ids(&self) -> &[String] {
        &self.sample_ids
    }

    #[inline]
    pub fn rows(&self) -> &[MeasurementRow] {
        &self.rows
    }

    #[inline]
    pub fn n_samples(&self) -> usize {
        self.sample_ids.len()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Taxon;

    fn row(sample: &str, target: Target, ct: f64) -> MeasurementRow {
        MeasurementRow::new(sample, target, ct, Some(84.0))
    }

    #[test]
    fn test_parse_ct() {
        assert_eq!(parse_ct("25.3"), Some(25.3));
        assert_eq!(parse_ct(" Undetermined "), Some(UNDETERMINED_CT));
        assert_eq!(parse_ct("UNDETERMINED"), Some(UNDETERMINED_CT));
        assert_eq!(parse_ct(""), None);
        assert_eq!(parse_ct("NaN"), None);
        assert_eq!(parse_ct("n/a"), None);
    }

    #[test]
    fn test_sample_order_preserved() {
        let table = MeasurementTable::new(vec![
            row("S2", Target::Universal, 18.0),
            row("S1", Target::Universal, 19.0),
            row("S2", Target::Taxon(Taxon::LIners), 22.0),
        ])
        .unwrap();

        assert_eq!(table.sample_ids(), &["S2", "S1"]);
        assert_eq!(table.n_samples(), 2);
        assert_eq!(table.sample_rows("S2").count(), 2);
        assert_eq!(
            table.get("S2", Target::Taxon(Taxon::LIners)).unwrap().ct,
            22.0
        );
        assert!(table.get("S1", Target::Taxon(Taxon::LIners)).is_none());
    }

    #[test]
    fn test_missing_universal_rejected() {
        let result = MeasurementTable::new(vec![
            row("S1", Target::Universal, 19.0),
            row("S2", Target::Taxon(Taxon::LIners), 22.0),
        ]);
        assert!(matches!(
            result,
            Err(QpcrError::MissingTarget { ref sample, .. }) if sample == "S2"
        ));
    }

    #[test]
    fn test_duplicate_universal_rejected() {
        let result = MeasurementTable::new(vec![
            row("S1", Target::Universal, 19.0),
            row("S1", Target::Universal, 19.5),
        ]);
        assert!(matches!(result, Err(QpcrError::DuplicateTarget { .. })));
    }

    #[test]
    fn test_empty_rejected() {
        assert!(MeasurementTable::new(vec![]).is_err());
    }

    #[test]
    fn test_undetermined_flag() {
        let r = row("S1", Target::Taxon(Taxon::FVaginae), UNDETERMINED_CT);
        assert!(r.is_undetermined());
        assert!(!row("S1", Target::Universal, 20.0).is_undetermined());
    }
}
