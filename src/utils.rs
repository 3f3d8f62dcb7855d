//! Utility functions shared by the aggregators.
//!
//! Small numeric helpers: medians, quantiles and centred rolling means over
//! optional series.

/// Median of a sample set.
///
/// Odd counts take the middle value, even counts the mean of the two middle
/// values. An empty sample set has no median.
#[must_use]
pub fn median(samples: &[f64]) -> Option<f64> {
    if samples.is_empty() {
        return None;
    }

    let mut sorted = samples.to_vec();
    sorted.sort_by(f64::total_cmp);

    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

/// Quantile with linear interpolation between closest ranks.
///
/// `q` is clamped to [0, 1]. Matches the default quantile method of common
/// dataframe libraries.
#[must_use]
pub fn quantile(samples: &[f64], q: f64) -> Option<f64> {
    if samples.is_empty() {
        return None;
    }

    let mut sorted = samples.to_vec();
    sorted.sort_by(f64::total_cmp);

    let q = q.clamp(0.0, 1.0);
    let position = q * (sorted.len() - 1) as f64;
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let lower = position.floor() as usize;
    let upper = (lower + 1).min(sorted.len() - 1);
    let fraction = position - lower as f64;

    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * fraction)
}

/// Centred rolling mean over the present values of a series.
///
/// Missing entries are skipped when forming windows, and stay missing in the
/// output. For an even window the extra element sits before the centre, so
/// with `window = 4` the value at position `i` averages positions
/// `i - 2 ..= i + 1`. Positions without a full window are `None`.
#[must_use]
pub fn centred_rolling_mean(series: &[Option<f64>], window: usize) -> Vec<Option<f64>> {
    let present: Vec<(usize, f64)> = series
        .iter()
        .enumerate()
        .filter_map(|(i, v)| v.map(|v| (i, v)))
        .collect();

    let mut out = vec![None; series.len()];
    if window == 0 {
        return out;
    }

    let before = window / 2;
    let after = window - before - 1;

    for (pos, &(index, _)) in present.iter().enumerate() {
        if pos < before || pos + after >= present.len() {
            continue;
        }
        let slice = &present[pos - before..=pos + after];
        let sum: f64 = slice.iter().map(|(_, v)| v).sum();
        out[index] = Some(sum / window as f64);
    }

    out
}

/// Ratio that is zero when the denominator is zero
#[must_use]
pub fn share(part: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 / total as f64
    }
}
