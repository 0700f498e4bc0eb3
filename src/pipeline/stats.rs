//! Order statistics over work values

/// Percentile of already-sorted data, linearly interpolated between the
/// floor and ceiling ranks of `p / 100 * (n - 1)`.
///
/// Returns `None` for empty input.
pub fn percentile(sorted: &[f64], p: f64) -> Option<f64> {
    match sorted.len() {
        0 => None,
        1 => Some(sorted[0]),
        n => {
            let rank = (p / 100.0) * (n - 1) as f64;
            let lower = rank.floor() as usize;
            let upper = rank.ceil() as usize;
            if lower == upper {
                Some(sorted[lower])
            } else {
                let weight = rank - lower as f64;
                Some(sorted[lower] * (1.0 - weight) + sorted[upper] * weight)
            }
        }
    }
}

/// Median of unsorted values; the mean of the two middle values for even counts
pub fn median(values: &[f64]) -> Option<f64> {
    let sorted = sorted_copy(values);
    let n = sorted.len();
    match n {
        0 => None,
        _ if n % 2 == 1 => Some(sorted[n / 2]),
        _ => Some((sorted[n / 2 - 1] + sorted[n / 2]) / 2.0),
    }
}

/// Ascending copy. Callers filter out non-finite values first.
pub fn sorted_copy(values: &[f64]) -> Vec<f64> {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    sorted
}

/// `numerator / denominator`, or 0.0 when the denominator is zero
pub fn guarded_ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        0.0
    } else {
        numerator / denominator
    }
}
