//! ΔCt normalization against the universal control probe.
//!
//! Each panel target is expressed relative to the universal 16S signal of
//! the same sample:
//!
//! ```text
//! abundance = 2^-(Ct_taxon - Ct_universal)
//! ```
//!
//! This assumes exponential amplification with the same efficiency for the
//! target and the control probe. A detection gate then zeroes readings that
//! do not reflect a real amplicon.

use crate::data::{
    AbundanceProfile, MeasurementRow, MeasurementTable, SampleAbundance, Target, Taxon,
    UNDETERMINED_CT,
};
use crate::error::{QpcrError, Result};
use serde::{Deserialize, Serialize};

/// Melt temperatures at or below this value indicate a nonspecific product.
pub const MIN_MELT_TEMPERATURE: f64 = 80.0;

/// Relative abundance of a target given its Ct and the control Ct.
#[inline]
pub fn relative_abundance(ct_target: f64, ct_universal: f64) -> f64 {
    2f64.powf(-(ct_target - ct_universal))
}

/// Filter for readings that must count as "not detected".
///
/// A target reading is rejected when its Ct is the undetermined sentinel or
/// its melt temperature is at or below `min_melt_temperature`. A missing melt
/// temperature never rejects. The universal control is not gated.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionGate {
    pub enabled: bool,
    pub undetermined_ct: f64,
    pub min_melt_temperature: f64,
}

impl Default for DetectionGate {
    fn default() -> Self {
        Self {
            enabled: true,
            undetermined_ct: UNDETERMINED_CT,
            min_melt_temperature: MIN_MELT_TEMPERATURE,
        }
    }
}

impl DetectionGate {
    /// A gate that accepts every reading.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    pub fn rejects(&self, row: &MeasurementRow) -> bool {
        if !self.enabled {
            return false;
        }
        row.ct == self.undetermined_ct
            || row
                .melt_temperature
                .map(|tm| tm <= self.min_melt_temperature)
                .unwrap_or(false)
    }
}

/// Compute panel abundances from the readings of a single sample.
///
/// `rows` must contain the universal control and every panel taxon.
pub fn sample_abundance<'a, I>(sample_id: &str, rows: I, gate: &DetectionGate) -> Result<SampleAbundance>
where
    I: IntoIterator<Item = &'a MeasurementRow>,
{
    let rows: Vec<&MeasurementRow> = rows.into_iter().collect();
    let find = |target: Target| {
        rows.iter()
            .find(|r| r.target == target)
            .copied()
            .ok_or_else(|| QpcrError::MissingTarget {
                sample: sample_id.to_string(),
                target: target.to_string(),
            })
    };

    let universal = find(Target::Universal)?;
    let mut abundance = SampleAbundance::default();

    for taxon in Taxon::PANEL {
        let row = find(Target::Taxon(taxon))?;
        let value = if gate.rejects(row) {
            tracing::warn!(
                sample = sample_id,
                taxon = taxon.name(),
                ct = row.ct,
                tm = ?row.melt_temperature,
                "reading gated as not detected"
            );
            0.0
        } else {
            relative_abundance(row.ct, universal.ct)
        };
        abundance.set(taxon, value);
    }

    Ok(abundance)
}

/// Compute abundances for every sample in the table.
///
/// Fails on the first sample missing its control or a panel taxon.
pub fn norm_delta_ct(table: &MeasurementTable, gate: &DetectionGate) -> Result<AbundanceProfile> {
    let mut profile = AbundanceProfile::new();
    for sample_id in table.sample_ids() {
        let abundance = sample_abundance(sample_id, table.sample_rows(sample_id), gate)?;
        profile.insert(sample_id, abundance);
    }
    Ok(profile)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn full_sample(sample: &str, universal_ct: f64, ct: f64, tm: Option<f64>) -> Vec<MeasurementRow> {
        let mut rows = vec![MeasurementRow::new(sample, Target::Universal, universal_ct, Some(86.0))];
        for taxon in Taxon::PANEL {
            rows.push(MeasurementRow::new(sample, Target::Taxon(taxon), ct, tm));
        }
        rows
    }

    #[test]
    fn test_formula() {
        assert_relative_eq!(relative_abundance(25.0, 20.0), 0.03125, epsilon = 1e-15);
        assert_relative_eq!(relative_abundance(20.0, 20.0), 1.0);
        assert_relative_eq!(relative_abundance(18.0, 20.0), 4.0);
    }

    #[test]
    fn test_formula_decreasing_in_target_ct() {
        let mut previous = f64::INFINITY;
        for step in 0..40 {
            let ct = 15.0 + step as f64 * 0.5;
            let value = relative_abundance(ct, 20.0);
            assert!(value < previous);
            previous = value;
        }
    }

    #[test]
    fn test_gate_undetermined() {
        let rows = full_sample("S1", 20.0, UNDETERMINED_CT, Some(84.0));
        let a = sample_abundance("S1", &rows, &DetectionGate::default()).unwrap();
        assert_eq!(a.total(), 0.0);

        // Without the gate the formula value comes through.
        let a = sample_abundance("S1", &rows, &DetectionGate::disabled()).unwrap();
        assert_relative_eq!(a.get(Taxon::LIners), relative_abundance(UNDETERMINED_CT, 20.0));
    }

    #[test]
    fn test_gate_melt_temperature() {
        for (tm, expected_zero) in [(Some(80.0), true), (Some(79.5), true), (Some(80.1), false), (None, false)] {
            let rows = full_sample("S1", 20.0, 21.0, tm);
            let a = sample_abundance("S1", &rows, &DetectionGate::default()).unwrap();
            if expected_zero {
                assert_eq!(a.get(Taxon::GVaginalis), 0.0, "tm = {:?}", tm);
            } else {
                assert_relative_eq!(a.get(Taxon::GVaginalis), 0.5);
            }
        }
    }

    #[test]
    fn test_control_is_not_gated() {
        // Universal with a low melt temperature still normalizes.
        let mut rows = full_sample("S1", 20.0, 22.0, Some(84.0));
        rows[0].melt_temperature = Some(70.0);
        let a = sample_abundance("S1", &rows, &DetectionGate::default()).unwrap();
        assert_relative_eq!(a.get(Taxon::LCrispatus), 0.25);
    }

    #[test]
    fn test_missing_taxon_row() {
        let mut rows = full_sample("S1", 20.0, 22.0, Some(84.0));
        rows.retain(|r| r.target != Target::Taxon(Taxon::FVaginae));
        let err = sample_abundance("S1", &rows, &DetectionGate::default()).unwrap_err();
        assert!(matches!(
            err,
            QpcrError::MissingTarget { ref target, .. } if target == "F_vaginae"
        ));
    }

    #[test]
    fn test_missing_universal_row() {
        let mut rows = full_sample("S1", 20.0, 22.0, Some(84.0));
        rows.remove(0);
        assert!(sample_abundance("S1", &rows, &DetectionGate::default()).is_err());
    }

    #[test]
    fn test_norm_delta_ct_table() {
        let mut rows = full_sample("S1", 20.0, 25.0, Some(84.0));
        rows.extend(full_sample("S2", 18.0, 19.0, Some(84.0)));
        let table = MeasurementTable::new(rows).unwrap();

        let profile = norm_delta_ct(&table, &DetectionGate::default()).unwrap();
        assert_eq!(profile.sample_ids(), vec!["S1", "S2"]);
        assert_relative_eq!(profile.get("S1").unwrap().get(Taxon::Bvab1), 0.03125);
        assert_relative_eq!(profile.get("S2").unwrap().get(Taxon::LJensenii), 0.5);
    }

    #[test]
    fn test_norm_delta_ct_incomplete_sample() {
        let mut rows = full_sample("S1", 20.0, 25.0, Some(84.0));
        rows.push(MeasurementRow::new("S2", Target::Universal, 18.0, None));
        let table = MeasurementTable::new(rows).unwrap();
        assert!(norm_delta_ct(&table, &DetectionGate::default()).is_err());
    }
}
