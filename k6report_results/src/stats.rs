//! Summary statistics over recorded observations.

use average::Mean;

/// Arithmetic mean of `values`, `None` if there are none.
#[must_use]
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let estimator: Mean = values.iter().copied().collect();
    Some(estimator.mean())
}

/// The `p`th percentile of `values`, `p` in `[0, 100]`.
///
/// Interpolates linearly between the two closest ranks: with the values
/// sorted, rank `p / 100 * (n - 1)` is located and the result lies on the
/// line between its floor and ceiling neighbours. Returns `None` when
/// `values` is empty.
#[must_use]
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
pub fn percentile(values: &[f64], p: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_unstable_by(f64::total_cmp);

    let rank = (p.clamp(0.0, 100.0) / 100.0) * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let fraction = rank - lower as f64;

    let value = sorted[lower] + (sorted[upper] - sorted[lower]) * fraction;
    Some(value.clamp(sorted[lower], sorted[upper]))
}

/// The 95th percentile, the one every duration threshold speaks of.
#[must_use]
pub fn p95(values: &[f64]) -> Option<f64> {
    percentile(values, 95.0)
}
