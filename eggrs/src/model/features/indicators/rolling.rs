//! Trailing-window statistics for daily price features
//!
//! Every series function returns one value per input element and never looks
//! ahead: element `i` only reads `x[..=i]`.
//!
//! # Conventions
//! - Inputs are plain slices ordered **oldest → newest**.
//! - Windows use a minimum period of 1, so there are no leading `NaN`s:
//!   the first few outputs are computed over whatever history exists.
//! - Standard deviation is the sample (n-1) estimator; a single-element
//!   window yields 0.

/// Trailing mean over up to `window` elements.
pub fn rolling_mean(x: &[f64], window: usize) -> Vec<f64> {
    if window == 0 {
        return vec![f64::NAN; x.len()];
    }
    let mut out = Vec::with_capacity(x.len());
    let mut sum = 0.0;
    for i in 0..x.len() {
        sum += x[i];
        if i >= window {
            sum -= x[i - window];
        }
        let n = (i + 1).min(window);
        out.push(sum / n as f64);
    }
    out
}

/// Trailing sample standard deviation over up to `window` elements.
pub fn rolling_std(x: &[f64], window: usize) -> Vec<f64> {
    if window == 0 {
        return vec![f64::NAN; x.len()];
    }
    (0..x.len())
        .map(|i| {
            let start = (i + 1).saturating_sub(window);
            sample_std(&x[start..=i])
        })
        .collect()
}

/// Sample standard deviation; 0 for fewer than two points.
pub fn sample_std(x: &[f64]) -> f64 {
    let n = x.len();
    if n < 2 {
        return 0.0;
    }
    let mean = x.iter().sum::<f64>() / n as f64;
    let var = x.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n as f64 - 1.0);
    // 부동소수 오차로 아주 작은 음수가 나오는 경우 방지
    var.max(0.0).sqrt()
}

/// Percentage change against the value `periods` steps back.
///
/// The first `periods` elements have no reference and are 0. A zero
/// reference with a zero current value is 0 (undefined ratio); with a
/// non-zero current value the result is ±infinity, left for the caller to clip.
pub fn pct_change(x: &[f64], periods: usize) -> Vec<f64> {
    (0..x.len())
        .map(|i| {
            if periods == 0 || i < periods {
                return 0.0;
            }
            let prev = x[i - periods];
            let ratio = x[i] / prev - 1.0;
            if ratio.is_nan() {
                0.0
            } else {
                ratio
            }
        })
        .collect()
}

/// Clip every value into `[lo, hi]`; infinities land on the bounds.
pub fn clip(x: &[f64], lo: f64, hi: f64) -> Vec<f64> {
    x.iter().map(|v| v.clamp(lo, hi)).collect()
}

/// Forward-fill `None` gaps, then fill any leading gap with `default`.
pub fn forward_fill(x: &[Option<f64>], default: f64) -> Vec<f64> {
    let mut last: Option<f64> = None;
    x.iter()
        .map(|v| {
            if let Some(value) = v.filter(|value| value.is_finite()) {
                last = Some(value);
            }
            last.unwrap_or(default)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rolling_mean_min_periods() {
        let x = [1.0, 2.0, 3.0, 4.0, 5.0];
        let m = rolling_mean(&x, 3);
        assert!((m[0] - 1.0).abs() < 1e-12);
        assert!((m[1] - 1.5).abs() < 1e-12);
        assert!((m[2] - 2.0).abs() < 1e-12);
        assert!((m[4] - 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_rolling_std_sample() {
        let x = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        let s = rolling_std(&x, 8);
        assert_eq!(s[0], 0.0);
        // 전체 표본표준편차 = sqrt(32/7)
        assert!((s[7] - (32.0f64 / 7.0).sqrt()).abs() < 1e-9);
        assert!(s.iter().all(|v| *v >= 0.0));
    }

    #[test]
    fn test_pct_change_leading_zero() {
        let x = [100.0, 110.0, 121.0];
        let p = pct_change(&x, 1);
        assert_eq!(p[0], 0.0);
        assert!((p[1] - 0.1).abs() < 1e-12);
        assert!((p[2] - 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_pct_change_zero_reference() {
        let x = [0.0, 0.0, 5.0];
        let p = pct_change(&x, 1);
        assert_eq!(p[1], 0.0);
        assert!(p[2].is_infinite());
        assert_eq!(clip(&p, -1.0, 1.0)[2], 1.0);
    }

    #[test]
    fn test_forward_fill() {
        let x = [None, Some(3.0), None, Some(5.0), None];
        assert_eq!(forward_fill(&x, 0.0), vec![0.0, 3.0, 3.0, 5.0, 5.0]);
    }
}
