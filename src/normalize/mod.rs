//! Normalization of raw Ct readings into relative abundances.

pub mod delta_ct;

pub use delta_ct::{
    norm_delta_ct, relative_abundance, sample_abundance, DetectionGate, MIN_MELT_TEMPERATURE,
};
