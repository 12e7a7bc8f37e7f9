//! Community-type and spray-group assignment.
//!
//! Both classifiers are priority-ordered: rules are tried in sequence and the
//! first one that applies decides the whole result. Rules are never combined.

use crate::data::{CommunityType, Role, SampleAbundance, SprayGroup, Taxon};
use serde::{Deserialize, Serialize};

/// Below this total panel abundance the signal is too weak to type.
pub const WEAK_SIGNAL_THRESHOLD: f64 = 0.05;

/// Outcome of classifying one sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    pub community_type: CommunityType,
    pub spray_group: SprayGroup,
}

impl Classification {
    pub fn new(community_type: CommunityType, spray_group: SprayGroup) -> Self {
        Self {
            community_type,
            spray_group,
        }
    }

    /// Type named after `taxon`; harmful dominance routes to group G.
    pub fn dominated_by(taxon: Taxon) -> Self {
        let spray_group = match taxon.role() {
            Role::Harmful => SprayGroup::G,
            Role::Beneficial => SprayGroup::C,
        };
        Self::new(CommunityType::Dominant(taxon), spray_group)
    }
}

/// Which classifier drives community typing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ClassifierKind {
    /// Dominant taxon by reference percentile.
    Percentile,
    /// Weak-signal and harmful-balance checks, then dominant taxon by abundance.
    Abundance,
}

/// One entry of the abundance-driven rule list.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum AbundanceRule {
    /// Total panel abundance below the threshold.
    WeakSignal { threshold: f64 },
    /// Summed harmful abundance strictly above summed beneficial abundance.
    HarmfulExceedsBeneficial,
    /// The taxon with the largest abundance.
    DominantTaxon,
}

impl AbundanceRule {
    /// The result of this rule, if it applies.
    pub fn apply(&self, abundance: &SampleAbundance) -> Option<Classification> {
        match *self {
            AbundanceRule::WeakSignal { threshold } => (abundance.total() < threshold)
                .then(|| Classification::new(CommunityType::Other, SprayGroup::G)),
            AbundanceRule::HarmfulExceedsBeneficial => (abundance.role_total(Role::Harmful)
                > abundance.role_total(Role::Beneficial))
            .then(|| Classification::new(CommunityType::ImmuneCompromised, SprayGroup::G)),
            AbundanceRule::DominantTaxon => {
                first_maximum(abundance.iter().map(|(t, v)| (t, Some(v))))
                    .map(Classification::dominated_by)
            }
        }
    }
}

/// Ordered rule list for abundance-driven classification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AbundanceClassifier {
    rules: Vec<AbundanceRule>,
}

impl Default for AbundanceClassifier {
    fn default() -> Self {
        Self::with_threshold(WEAK_SIGNAL_THRESHOLD)
    }
}

impl AbundanceClassifier {
    pub fn with_threshold(weak_signal_threshold: f64) -> Self {
        Self {
            rules: vec![
                AbundanceRule::WeakSignal {
                    threshold: weak_signal_threshold,
                },
                AbundanceRule::HarmfulExceedsBeneficial,
                AbundanceRule::DominantTaxon,
            ],
        }
    }

    pub fn rules(&self) -> &[AbundanceRule] {
        &self.rules
    }

    pub fn classify(&self, abundance: &SampleAbundance) -> Classification {
        self.rules
            .iter()
            .find_map(|rule| rule.apply(abundance))
            // Only reachable with NaN abundances.
            .unwrap_or(Classification::new(CommunityType::Other, SprayGroup::G))
    }
}

/// Classify by abundance with the default weak-signal threshold.
pub fn classify_by_abundance(abundance: &SampleAbundance) -> Classification {
    AbundanceClassifier::default().classify(abundance)
}

/// Classify by the taxon holding the highest reference percentile.
///
/// Undefined percentiles are skipped; if none is defined the sample is
/// `other`.
pub fn classify_by_percentile(percentiles: &[(Taxon, Option<f64>)]) -> Classification {
    first_maximum(percentiles.iter().copied())
        .map(Classification::dominated_by)
        .unwrap_or(Classification::new(CommunityType::Other, SprayGroup::G))
}

/// Taxon with the largest defined score; ties go to the earliest entry.
fn first_maximum<I>(scores: I) -> Option<Taxon>
where
    I: IntoIterator<Item = (Taxon, Option<f64>)>,
{
    let mut best: Option<(Taxon, f64)> = None;
    for (taxon, score) in scores {
        let Some(score) = score.filter(|s| !s.is_nan()) else {
            continue;
        };
        match best {
            Some((_, top)) if score <= top => {}
            _ => best = Some((taxon, score)),
        }
    }
    best.map(|(taxon, _)| taxon)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn abundance(pairs: &[(Taxon, f64)]) -> SampleAbundance {
        let mut a = SampleAbundance::default();
        for &(t, v) in pairs {
            a.set(t, v);
        }
        a
    }

    #[test]
    fn test_weak_signal() {
        let a = abundance(&[(Taxon::LCrispatus, 0.03), (Taxon::Bvab1, 0.01)]);
        let c = classify_by_abundance(&a);
        assert_eq!(c.community_type, CommunityType::Other);
        assert_eq!(c.spray_group, SprayGroup::G);
    }

    #[test]
    fn test_weak_signal_boundary_is_exclusive() {
        let a = abundance(&[(Taxon::LCrispatus, 0.05)]);
        assert_eq!(
            classify_by_abundance(&a),
            Classification::new(CommunityType::Dominant(Taxon::LCrispatus), SprayGroup::C)
        );
    }

    #[test]
    fn test_harmful_exceeds_beneficial() {
        // Beneficial L_crispatus has the single largest value, harmful sum still wins.
        let a = abundance(&[
            (Taxon::LCrispatus, 0.2),
            (Taxon::GVaginalis, 0.1),
            (Taxon::FVaginae, 0.1),
            (Taxon::Bvab1, 0.1),
        ]);
        let c = classify_by_abundance(&a);
        assert_eq!(c.community_type, CommunityType::ImmuneCompromised);
        assert_eq!(c.spray_group, SprayGroup::G);
    }

    #[test]
    fn test_balanced_goes_to_dominant() {
        let a = abundance(&[(Taxon::LIners, 0.3), (Taxon::GVaginalis, 0.3)]);
        let c = classify_by_abundance(&a);
        // Equal sums are not "harmful exceeds", and the tie goes to the earlier taxon.
        assert_eq!(c.community_type, CommunityType::Dominant(Taxon::LIners));
        assert_eq!(c.spray_group, SprayGroup::C);
    }

    #[test]
    fn test_harmful_dominant_taxon() {
        // Harmful taxon dominates without the harmful sum exceeding the beneficial sum.
        let a = abundance(&[
            (Taxon::LCrispatus, 0.2),
            (Taxon::LJensenii, 0.2),
            (Taxon::GVaginalis, 0.35),
        ]);
        let c = classify_by_abundance(&a);
        assert_eq!(c.community_type, CommunityType::Dominant(Taxon::GVaginalis));
        assert_eq!(c.community_type.label(), "CST IV-A");
        assert_eq!(c.spray_group, SprayGroup::G);
    }

    #[test]
    fn test_custom_threshold() {
        let a = abundance(&[(Taxon::LGasseri, 0.08)]);
        let strict = AbundanceClassifier::with_threshold(0.1);
        assert_eq!(strict.classify(&a).community_type, CommunityType::Other);
        assert_eq!(
            AbundanceClassifier::default().classify(&a).community_type,
            CommunityType::Dominant(Taxon::LGasseri)
        );
    }

    #[test]
    fn test_deterministic() {
        let a = abundance(&[(Taxon::LIners, 0.4), (Taxon::FVaginae, 0.1)]);
        let first = classify_by_abundance(&a);
        for _ in 0..10 {
            assert_eq!(classify_by_abundance(&a), first);
        }
    }

    #[test]
    fn test_rule_order() {
        let rules = AbundanceClassifier::default();
        assert!(matches!(rules.rules()[0], AbundanceRule::WeakSignal { .. }));
        assert_eq!(rules.rules()[1], AbundanceRule::HarmfulExceedsBeneficial);
        assert_eq!(rules.rules()[2], AbundanceRule::DominantTaxon);
    }

    #[test]
    fn test_percentile_classifier() {
        let scores = vec![
            (Taxon::LCrispatus, Some(40.0)),
            (Taxon::LGasseri, Some(85.5)),
            (Taxon::LIners, None),
            (Taxon::LJensenii, Some(85.5)),
            (Taxon::GVaginalis, Some(20.0)),
            (Taxon::FVaginae, Some(5.0)),
            (Taxon::Bvab1, Some(5.0)),
        ];
        let c = classify_by_percentile(&scores);
        assert_eq!(c.community_type, CommunityType::Dominant(Taxon::LGasseri));
        assert_eq!(c.community_type.label(), "CST II");
        assert_eq!(c.spray_group, SprayGroup::C);
    }

    #[test]
    fn test_percentile_classifier_harmful() {
        let scores = vec![
            (Taxon::LCrispatus, Some(10.0)),
            (Taxon::Bvab1, Some(95.0)),
        ];
        let c = classify_by_percentile(&scores);
        assert_eq!(c.community_type.label(), "CST IV-C");
        assert_eq!(c.spray_group, SprayGroup::G);
    }

    #[test]
    fn test_percentile_classifier_all_undefined() {
        let scores: Vec<(Taxon, Option<f64>)> = Taxon::PANEL.iter().map(|&t| (t, None)).collect();
        assert_eq!(
            classify_by_percentile(&scores).community_type,
            CommunityType::Other
        );
    }
}
