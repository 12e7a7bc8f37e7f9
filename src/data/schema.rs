//! Header resolution for instrument result exports.
//!
//! The instrument writes a preamble of run information before the result
//! table. The table starts at the first row whose first cell is `Well` and
//! ends at the first row with an empty `Well` cell. Column headers vary
//! between instrument software versions, so each recognized spelling is
//! mapped to a canonical field and anything else fails closed.

use super::measurement::{parse_ct, MeasurementRow};
use super::taxon::Target;
use crate::error::{QpcrError, Result};
use csv::ReaderBuilder;
use std::path::Path;

/// First cell of the result table header.
pub const HEADER_MARKER: &str = "Well";

/// Canonical fields recognized in an export header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportField {
    SampleName,
    Microbiome,
    Ct,
    MeltTemperature,
}

impl ExportField {
    /// Map a header cell to its canonical field.
    ///
    /// The Ct column is spelled either with a Cyrillic `т` or as a plain `CT`.
    pub fn from_header(cell: &str) -> Option<Self> {
        match cell.trim() {
            "Sample Name" => Some(Self::SampleName),
            "Target Name" => Some(Self::Microbiome),
            "C\u{0442}" | "CT" => Some(Self::Ct),
            "Tm1" => Some(Self::MeltTemperature),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::SampleName => "sample_name",
            Self::Microbiome => "microbiome",
            Self::Ct => "Ct",
            Self::MeltTemperature => "Tm1",
        }
    }
}

/// Column positions of the canonical fields within an export.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportSchema {
    pub sample_name: usize,
    pub microbiome: usize,
    pub ct: usize,
    pub melt_temperature: Option<usize>,
}

impl ExportSchema {
    /// Resolve the schema from a header row.
    pub fn resolve(header: &[String]) -> Result<Self> {
        let mut sample_name = None;
        let mut microbiome = None;
        let mut ct = None;
        let mut melt_temperature = None;

        for (idx, cell) in header.iter().enumerate() {
            let slot = match ExportField::from_header(cell) {
                Some(ExportField::SampleName) => &mut sample_name,
                Some(ExportField::Microbiome) => &mut microbiome,
                Some(ExportField::Ct) => &mut ct,
                Some(ExportField::MeltTemperature) => &mut melt_temperature,
                None => continue,
            };
            if slot.is_none() {
                *slot = Some(idx);
            }
        }

        let require = |slot: Option<usize>, field: ExportField| {
            slot.ok_or_else(|| {
                QpcrError::Schema(format!(
                    "no column for '{}' in the result header",
                    field.name()
                ))
            })
        };

        Ok(Self {
            sample_name: require(sample_name, ExportField::SampleName)?,
            microbiome: require(microbiome, ExportField::Microbiome)?,
            ct: require(ct, ExportField::Ct)?,
            melt_temperature,
        })
    }
}

/// Index of the header row, i.e. the first row whose first cell is `Well`.
pub fn locate_header(records: &[Vec<String>]) -> Result<usize> {
    records
        .iter()
        .position(|r| {
            r.first()
                .map(|c| c.trim_start_matches('\u{feff}').trim() == HEADER_MARKER)
                .unwrap_or(false)
        })
        .ok_or_else(|| {
            QpcrError::Schema(format!("no row starting with '{}'", HEADER_MARKER))
        })
}

/// Turn raw export records into measurement rows.
pub fn parse_records(records: &[Vec<String>]) -> Result<Vec<MeasurementRow>> {
    let header_idx = locate_header(records)?;
    let schema = ExportSchema::resolve(&records[header_idx])?;

    let cell = |record: &[String], idx: usize| -> String {
        record.get(idx).map(|s| s.trim().to_string()).unwrap_or_default()
    };

    let mut rows = Vec::new();
    for record in &records[header_idx + 1..] {
        // The result table ends at the first row without a well id.
        if cell(record, 0).is_empty() {
            break;
        }

        let sample = cell(record, schema.sample_name);
        let target_name = cell(record, schema.microbiome);
        // Control wells such as NTC carry targets outside the panel.
        let target = match Target::from_name(&target_name) {
            Some(target) => target,
            None => {
                tracing::warn!(
                    sample = %sample,
                    target = %target_name,
                    "skipping row with a target outside the panel"
                );
                continue;
            }
        };

        let ct_cell = cell(record, schema.ct);
        let ct = parse_ct(&ct_cell).ok_or_else(|| QpcrError::InvalidCt {
            value: ct_cell.clone(),
            sample: sample.clone(),
            target: target_name.clone(),
        })?;

        let melt_temperature = match schema.melt_temperature {
            Some(idx) => {
                let tm_cell = cell(record, idx);
                if tm_cell.is_empty() {
                    None
                } else {
                    let tm = tm_cell.parse::<f64>().map_err(|_| {
                        QpcrError::InvalidMeltTemperature {
                            value: tm_cell.clone(),
                            sample: sample.clone(),
                            target: target_name.clone(),
                        }
                    })?;
                    Some(tm)
                }
            }
            None => None,
        };

        rows.push(MeasurementRow::new(&sample, target, ct, melt_temperature));
    }

    if rows.is_empty() {
        return Err(QpcrError::EmptyData(
            "result table has no data rows".to_string(),
        ));
    }

    Ok(rows)
}

/// Read raw records from a delimited export. Tab-delimited for `.tsv` and
/// `.txt`, comma otherwise.
pub fn read_records<P: AsRef<Path>>(path: P) -> Result<Vec<Vec<String>>> {
    let path = path.as_ref();
    let delimiter = match path.extension().and_then(|e| e.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("tsv") || ext.eq_ignore_ascii_case("txt") => b'\t',
        _ => b',',
    };

    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(delimiter)
        .from_path(path)?;

    let mut records = Vec::new();
    for record in reader.records() {
        let record = record?;
        records.push(record.iter().map(String::from).collect());
    }
    Ok(records)
}

/// Read and parse an instrument export in one step.
pub fn read_export<P: AsRef<Path>>(path: P) -> Result<Vec<MeasurementRow>> {
    let records = read_records(path)?;
    parse_records(&records)
}
