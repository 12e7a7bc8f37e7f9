//! The fixed qPCR target panel.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Name of the broad-spectrum control probe used for normalization.
pub const UNIVERSAL: &str = "Universal";

/// Clinical role of a panel taxon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    /// Lactobacilli associated with a healthy community.
    Beneficial,
    /// Taxa associated with bacterial vaginosis.
    Harmful,
}

/// One of the seven taxa on the panel.
///
/// Declaration order is the panel order. Tie-breaks in the classifiers
/// resolve to the first taxon in this order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Taxon {
    LCrispatus,
    LGasseri,
    LIners,
    LJensenii,
    GVaginalis,
    FVaginae,
    Bvab1,
}

impl Taxon {
    /// The full panel in panel order.
    pub const PANEL: [Taxon; 7] = [
        Taxon::LCrispatus,
        Taxon::LGasseri,
        Taxon::LIners,
        Taxon::LJensenii,
        Taxon::GVaginalis,
        Taxon::FVaginae,
        Taxon::Bvab1,
    ];

    /// Target name as it appears in instrument exports and reference files.
    pub fn name(&self) -> &'static str {
        match self {
            Self::LCrispatus => "L_crispatus",
            Self::LGasseri => "L_gasseri",
            Self::LIners => "L_iners",
            Self::LJensenii => "L_jensenii",
            Self::GVaginalis => "G_vaginalis",
            Self::FVaginae => "F_vaginae",
            Self::Bvab1 => "BVAB-1",
        }
    }

    /// Look up a panel taxon by its target name.
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim();
        Self::PANEL.into_iter().find(|t| t.name() == name)
    }

    pub fn role(&self) -> Role {
        match self {
            Self::LCrispatus | Self::LGasseri | Self::LIners | Self::LJensenii => {
                Role::Beneficial
            }
            Self::GVaginalis | Self::FVaginae | Self::Bvab1 => Role::Harmful,
        }
    }

    pub fn is_beneficial(&self) -> bool {
        self.role() == Role::Beneficial
    }

    /// Community-state type assigned when this taxon dominates.
    pub fn cst_label(&self) -> &'static str {
        match self {
            Self::LCrispatus => "CST I",
            Self::LGasseri => "CST II",
            Self::LIners => "CST III",
            Self::LJensenii => "CST V",
            Self::GVaginalis => "CST IV-A",
            Self::FVaginae => "CST IV-B",
            Self::Bvab1 => "CST IV-C",
        }
    }

    /// Beneficial taxa in panel order.
    pub fn beneficial() -> impl Iterator<Item = Taxon> {
        Self::PANEL.into_iter().filter(|t| t.is_beneficial())
    }

    /// Harmful taxa in panel order.
    pub fn harmful() -> impl Iterator<Item = Taxon> {
        Self::PANEL.into_iter().filter(|t| !t.is_beneficial())
    }
}

impl fmt::Display for Taxon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A qPCR target: either a panel taxon or the universal control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Target {
    Taxon(Taxon),
    Universal,
}

impl Target {
    pub fn from_name(name: &str) -> Option<Self> {
        if name.trim() == UNIVERSAL {
            Some(Target::Universal)
        } else {
            Taxon::from_name(name).map(Target::Taxon)
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Target::Taxon(t) => t.name(),
            Target::Universal => UNIVERSAL,
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_panel_split() {
        assert_eq!(Taxon::beneficial().count(), 4);
        assert_eq!(Taxon::harmful().count(), 3);
        assert!(Taxon::harmful().all(|t| t.role() == Role::Harmful));
    }

    #[test]
    fn test_name_roundtrip() {
        for taxon in Taxon::PANEL {
            assert_eq!(Taxon::from_name(taxon.name()), Some(taxon));
        }
        assert_eq!(Taxon::from_name(" BVAB-1 "), Some(Taxon::Bvab1));
        assert_eq!(Taxon::from_name("L_acidophilus"), None);
    }

    #[test]
    fn test_target_parsing() {
        assert_eq!(Target::from_name("Universal"), Some(Target::Universal));
        assert_eq!(
            Target::from_name("G_vaginalis"),
            Some(Target::Taxon(Taxon::GVaginalis))
        );
        assert_eq!(Target::from_name("NTC"), None);
    }

    #[test]
    fn test_cst_labels() {
        assert_eq!(Taxon::LCrispatus.cst_label(), "CST I");
        assert_eq!(Taxon::Bvab1.cst_label(), "CST IV-C");
    }
}
