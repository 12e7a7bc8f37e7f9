//! Percentile rank of a value within a reference population.

/// Reported percentiles never go below this value.
pub const PERCENTILE_FLOOR: f64 = 5.0;
/// Reported percentiles never go above this value.
pub const PERCENTILE_CEILING: f64 = 95.0;

/// Percentile of `score` within `population`, counting ties as half.
///
/// `(below + 0.5 * equal) / n * 100`. Non-finite population entries are
/// ignored. Returns `None` for an empty population or a non-finite score.
pub fn percentile_of_score(population: &[f64], score: f64) -> Option<f64> {
    if !score.is_finite() {
        return None;
    }

    let mut n = 0usize;
    let mut below = 0usize;
    let mut equal = 0usize;
    for &v in population.iter().filter(|v| v.is_finite()) {
        n += 1;
        if v < score {
            below += 1;
        } else if v == score {
            equal += 1;
        }
    }

    if n == 0 {
        return None;
    }
    Some((below as f64 + 0.5 * equal as f64) / n as f64 * 100.0)
}

/// Round to one decimal place.
#[inline]
pub fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Clamp into `[PERCENTILE_FLOOR, PERCENTILE_CEILING]`.
#[inline]
pub fn clamp_percentile(value: f64) -> f64 {
    if value <= PERCENTILE_FLOOR {
        PERCENTILE_FLOOR
    } else if value >= PERCENTILE_CEILING {
        PERCENTILE_CEILING
    } else {
        value
    }
}

/// Reported percentile: rounded to one decimal, then clamped.
pub fn percentile_rank(population: &[f64], score: f64) -> Option<f64> {
    percentile_of_score(population, score).map(|p| clamp_percentile(round_one_decimal(p)))
}

/// Output form of a percentile; undefined prints as `None`.
pub fn format_percentile(percentile: Option<f64>) -> String {
    match percentile {
        Some(p) => format!("{:.1}", p),
        None => "None".to_string(),
    }
}
