//! Small numeric helpers shared by the scoring engine, the evaluation panel
//! and run aggregation.

/// z-value for a two-sided 95% interval.
pub const Z_95: f64 = 1.96;

/// Arithmetic mean; `0.0` for an empty slice.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation; `0.0` for fewer than two values.
pub fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let variance = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

/// Round half away from zero to `decimals` places.
pub fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}

pub fn round1(value: f64) -> f64 {
    round_to(value, 1)
}

/// Sorted copy with the single lowest and single highest value removed.
/// Slices shorter than three values are returned sorted but untrimmed.
pub fn trim_extremes(values: &[f64]) -> Vec<f64> {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    if sorted.len() < 3 {
        return sorted;
    }
    sorted[1..sorted.len() - 1].to_vec()
}

/// Half-width of the 95% interval of the mean: `1.96 · σ / √n`, zero when
/// `n ≤ 1`.
pub fn ci95_margin(values: &[f64]) -> f64 {
    if values.len() <= 1 {
        return 0.0;
    }
    Z_95 * std_dev(values) / (values.len() as f64).sqrt()
}

/// `[center − margin, center + margin]` rounded to one decimal and clamped
/// to the 0..100 score range.
pub fn ci95_bounds(center: f64, margin: f64) -> [f64; 2] {
    [
        round1((center - margin).clamp(0.0, 100.0)),
        round1((center + margin).clamp(0.0, 100.0)),
    ]
}
