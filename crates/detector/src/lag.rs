//! Lag detection on time-ordered data: does the feature at offset -k
//! correlate with the target at offset 0?

use analytics::stats;
use configuration::DetectionSettings;
use core_types::{FeatureMatrix, RelationshipFinding, TargetSeries};
use rayon::prelude::*;

/// Minimum overlapping samples for a lagged correlation to mean anything.
const MIN_OVERLAP: usize = 8;

pub(crate) fn detect(
    features: &FeatureMatrix,
    target: &TargetSeries,
    settings: &DetectionSettings,
) -> Vec<RelationshipFinding> {
    let indices: Vec<usize> = (0..features.n_features()).collect();
    let mut findings: Vec<RelationshipFinding> = indices
        .par_iter()
        .filter_map(|&i| evaluate_feature(features, target, settings, i))
        .collect();
    findings.sort_by(|a, b| a.ordering(b));
    findings
}

fn evaluate_feature(
    features: &FeatureMatrix,
    target: &TargetSeries,
    settings: &DetectionSettings,
    index: usize,
) -> Option<RelationshipFinding> {
    let column = features.column_at(index);
    let y = target.values();
    let n = column.len();

    let mut best: Option<(usize, f64)> = None;
    for k in 1..=settings.max_lag {
        if n <= k + MIN_OVERLAP {
            break;
        }
        // Feature at time t-k against target at time t.
        let r = stats::pearson(&column[..n - k], &y[k..]);
        if r.abs() < settings.min_lag_correlation {
            continue;
        }
        let better = best.map(|(_, br)| r.abs() > br.abs()).unwrap_or(true);
        if better {
            best = Some((k, r));
        }
    }

    let (lag, correlation) = best?;
    Some(RelationshipFinding::Lag {
        feature: features.names()[index].clone(),
        strength: correlation.abs(),
        significance: stats::correlation_significance(correlation, n - lag),
        lag,
        correlation,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn picks_the_strongest_lag() {
        let n = 80;
        let driver: Vec<f64> = (0..n).map(|i| (i as f64 * 1.1).sin() * 3.0).collect();
        let mut y = vec![0.0; n];
        for t in 5..n {
            // Strong signal at lag 5, weaker echo at lag 2.
            y[t] = driver[t - 5] * 3.0 + driver[t - 2] * 0.4;
        }
        let m = FeatureMatrix::new(vec![("d".to_string(), driver)], 10).unwrap();
        let t = TargetSeries::new("y", y).unwrap();
        let finding =
            evaluate_feature(&m, &t, &DetectionSettings::default(), 0).expect("lag expected");
        match finding {
            RelationshipFinding::Lag { lag, strength, .. } => {
                assert_eq!(lag, 5);
                assert!(strength > 0.8);
            }
            other => panic!("unexpected finding {other:?}"),
        }
    }

    #[test]
    fn uncorrelated_feature_reports_no_lag() {
        let n = 60;
        let noise: Vec<f64> = (0..n).map(|i| ((i * 17 + 3) % 23) as f64).collect();
        let y: Vec<f64> = (0..n).map(|i| ((i * 5 + 1) % 29) as f64).collect();
        let m = FeatureMatrix::new(vec![("noise".to_string(), noise)], 10).unwrap();
        let t = TargetSeries::new("y", y).unwrap();
        let mut settings = DetectionSettings::default();
        settings.min_lag_correlation = 0.6;
        assert!(evaluate_feature(&m, &t, &settings, 0).is_none());
    }
}
