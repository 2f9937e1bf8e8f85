//! Null-safe numeric primitives shared by every calculator.
//!
//! Every helper returns `Option<f64>` and never hands `NaN` or an infinity
//! back to the caller: "input missing" and "formula undefined" both collapse
//! into `None`. Ratios stay fractions (`0.25`, not `25`); presentation is the
//! caller's concern.

use statrs::statistics::Statistics;

/// Keep a value only if it is finite.
pub fn finite(value: f64) -> Option<f64> {
    if value.is_finite() {
        Some(value)
    } else {
        None
    }
}

/// `numerator / denominator`, or `None` when either side is missing, the
/// denominator is zero, or the quotient is not finite.
pub fn safe_div(numerator: Option<f64>, denominator: Option<f64>) -> Option<f64> {
    let (n, d) = (numerator?, denominator?);
    if d == 0.0 || !n.is_finite() || !d.is_finite() {
        return None;
    }
    finite(n / d)
}

/// Like [`safe_div`] but also rejects negative denominators, for ratios whose
/// meaning flips when the base goes negative (debt/equity, interest coverage).
pub fn positive_div(numerator: Option<f64>, denominator: Option<f64>) -> Option<f64> {
    match denominator {
        Some(d) if d > 0.0 => safe_div(numerator, Some(d)),
        _ => None,
    }
}

/// Ratios are carried as fractions end to end.
pub fn as_fraction(ratio: Option<f64>) -> Option<f64> {
    ratio.and_then(finite)
}

/// `(current - prior) / |prior|`.
pub fn percent_change(current: Option<f64>, prior: Option<f64>) -> Option<f64> {
    let (c, p) = (current?, prior?);
    safe_div(Some(c - p), Some(p.abs()))
}

/// Compound annual growth rate `(end / begin)^(1 / years) - 1`.
pub fn cagr(begin: f64, end: f64, years: f64) -> Option<f64> {
    if begin <= 0.0 || end < 0.0 || years <= 0.0 {
        return None;
    }
    finite((end / begin).powf(1.0 / years) - 1.0)
}

/// N-period CAGR over the tail of an ascending series; needs `periods + 1` points.
pub fn series_cagr(series: &[f64], periods: usize) -> Option<f64> {
    if periods == 0 || series.len() < periods + 1 {
        return None;
    }
    let end = series[series.len() - 1];
    let begin = series[series.len() - 1 - periods];
    cagr(begin, end, periods as f64)
}

/// Change between the last two points of an ascending series.
pub fn last_change(series: &[f64]) -> Option<f64> {
    if series.len() < 2 {
        return None;
    }
    let n = series.len();
    percent_change(Some(series[n - 1]), Some(series[n - 2]))
}

/// Arithmetic mean; `None` for fewer than two points.
pub fn mean(data: &[f64]) -> Option<f64> {
    if data.len() < 2 {
        return None;
    }
    finite(data.mean())
}

/// Sample standard deviation (n - 1); `None` for fewer than two points.
pub fn sample_std_dev(data: &[f64]) -> Option<f64> {
    if data.len() < 2 {
        return None;
    }
    finite(data.std_dev())
}

/// Sample covariance of two equally sized series.
pub fn covariance(xs: &[f64], ys: &[f64]) -> Option<f64> {
    if xs.len() < 2 || xs.len() != ys.len() {
        return None;
    }
    finite(xs.covariance(ys))
}

/// Pearson correlation; `None` when either series has no variance.
pub fn correlation(xs: &[f64], ys: &[f64]) -> Option<f64> {
    let cov = covariance(xs, ys)?;
    let sx = sample_std_dev(xs)?;
    let sy = sample_std_dev(ys)?;
    safe_div(Some(cov), Some(sx * sy))
}

/// Linear-interpolated percentile, `pct` in `[0, 100]`.
pub fn percentile(data: &[f64], pct: f64) -> Option<f64> {
    if data.is_empty() || !(0.0..=100.0).contains(&pct) {
        return None;
    }
    let mut sorted: Vec<f64> = data.iter().copied().filter(|v| v.is_finite()).collect();
    if sorted.is_empty() {
        return None;
    }
    sorted.sort_by(|a, b| a.total_cmp(b));
    let rank = pct / 100.0 * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let frac = rank - lo as f64;
    finite(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
}

pub fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    let rounded = (value * factor).round() / factor;
    // very large magnitudes overflow the scaled intermediate
    if rounded.is_finite() {
        rounded
    } else {
        value
    }
}

pub fn round_opt(value: Option<f64>, decimals: u32) -> Option<f64> {
    value.map(|v| round_to(v, decimals))
}

/// Map `value` linearly onto 0..=100, where `worst` scores 0 and `best`
/// scores 100. Works in either direction (`worst > best` for lower-is-better).
pub fn linear_score(value: f64, worst: f64, best: f64) -> Option<f64> {
    let span = best - worst;
    if span == 0.0 || !value.is_finite() {
        return None;
    }
    Some(((value - worst) / span * 100.0).clamp(0.0, 100.0))
}

/// Weighted mean over the constituents that are present. Weights of missing
/// constituents drop out and the rest are renormalised.
pub fn weighted_average(parts: &[(Option<f64>, f64)]) -> Option<f64> {
    let mut total = 0.0;
    let mut weight = 0.0;
    for (value, w) in parts {
        if let Some(v) = value {
            if v.is_finite() && *w > 0.0 {
                total += v * w;
                weight += w;
            }
        }
    }
    safe_div(Some(total), Some(weight))
}

/// Sum two optional amounts, treating a single missing side as zero but
/// returning `None` when both are missing.
pub fn sum_present(a: Option<f64>, b: Option<f64>) -> Option<f64> {
    match (a, b) {
        (None, None) => None,
        (a, b) => Some(a.unwrap_or(0.0) + b.unwrap_or(0.0)),
    }
}
