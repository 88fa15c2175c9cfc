//! Univariate statistics shared across the engine.

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population variance.
pub fn variance(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    values.iter().map(|v| (v - m) * (v - m)).sum::<f64>() / values.len() as f64
}

pub fn std_dev(values: &[f64]) -> f64 {
    variance(values).sqrt()
}

pub fn covariance(a: &[f64], b: &[f64]) -> f64 {
    if a.len() != b.len() || a.len() < 2 {
        return 0.0;
    }
    let (ma, mb) = (mean(a), mean(b));
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - ma) * (y - mb))
        .sum::<f64>()
        / a.len() as f64
}

/// Pearson correlation. Returns 0.0 when either side is constant, so a
/// degenerate window scores as "no relationship" instead of NaN.
pub fn pearson(a: &[f64], b: &[f64]) -> f64 {
    let denom = std_dev(a) * std_dev(b);
    if denom <= f64::EPSILON {
        return 0.0;
    }
    (covariance(a, b) / denom).clamp(-1.0, 1.0)
}

/// Abramowitz & Stegun approximation of the standard normal CDF.
/// Max absolute error ~7.5e-8, far below anything these scores need.
pub fn normal_cdf(z: f64) -> f64 {
    if z < -8.0 {
        return 0.0;
    }
    if z > 8.0 {
        return 1.0;
    }
    let t = 1.0 / (1.0 + 0.2316419 * z.abs());
    let poly = t
        * (0.319381530
            + t * (-0.356563782 + t * (1.781477937 + t * (-1.821255978 + t * 1.330274429))));
    let tail = (-z * z / 2.0).exp() / (2.0 * std::f64::consts::PI).sqrt() * poly;
    if z >= 0.0 { 1.0 - tail } else { tail }
}

/// Two-sided significance of a correlation coefficient, adjusted for sample
/// size: the t statistic r * sqrt((n-2)/(1-r^2)) mapped through the normal
/// CDF. Returns a confidence in [0, 1], monotone in |r| and n.
pub fn correlation_significance(r: f64, n: usize) -> f64 {
    if n < 3 {
        return 0.0;
    }
    let r = r.clamp(-1.0, 1.0);
    let denom = (1.0 - r * r).max(1e-12);
    let t = r.abs() * ((n - 2) as f64 / denom).sqrt();
    (2.0 * normal_cdf(t) - 1.0).clamp(0.0, 1.0)
}

/// Z-scores a column with the given frozen statistics. A (near-)constant
/// column maps to all zeros and contributes nothing to a composite.
pub fn zscore_with(values: &[f64], mean: f64, std: f64) -> Vec<f64> {
    if std <= f64::EPSILON {
        return vec![0.0; values.len()];
    }
    values.iter().map(|v| (v - mean) / std).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pearson_perfect_and_inverse() {
        let x: Vec<f64> = (0..20).map(|i| i as f64).collect();
        let y: Vec<f64> = x.iter().map(|v| 3.0 * v + 1.0).collect();
        let z: Vec<f64> = x.iter().map(|v| -v).collect();
        assert!((pearson(&x, &y) - 1.0).abs() < 1e-12);
        assert!((pearson(&x, &z) + 1.0).abs() < 1e-12);
    }

    #[test]
    fn pearson_constant_side_is_zero() {
        let x = vec![1.0; 10];
        let y: Vec<f64> = (0..10).map(|i| i as f64).collect();
        assert_eq!(pearson(&x, &y), 0.0);
    }

    #[test]
    fn normal_cdf_symmetry() {
        assert!((normal_cdf(0.0) - 0.5).abs() < 1e-7);
        assert!((normal_cdf(1.96) - 0.975).abs() < 1e-3);
        assert!((normal_cdf(-1.96) - 0.025).abs() < 1e-3);
    }

    #[test]
    fn significance_grows_with_sample_size() {
        let small = correlation_significance(0.5, 10);
        let large = correlation_significance(0.5, 100);
        assert!(large > small);
        assert!(correlation_significance(0.99, 50) > 0.99);
    }
}
