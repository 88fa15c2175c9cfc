//! Synergy detection over unordered feature pairs.
//!
//! For each pair, the explanatory power of a bivariate fit is compared with
//! the sum of the two univariate fits. The bivariate R² has a closed form in
//! the three pairwise correlations, so no matrix solve is needed per pair.

use analytics::stats;
use configuration::DetectionSettings;
use core_types::{FeatureMatrix, RelationshipFinding, TargetSeries};
use itertools::Itertools;
use rayon::prelude::*;

const COLLINEARITY_EPS: f64 = 1e-6;

pub(crate) fn detect(
    features: &FeatureMatrix,
    target: &TargetSeries,
    settings: &DetectionSettings,
) -> Vec<RelationshipFinding> {
    let n = features.n_rows();
    let y = target.values();

    // Univariate correlations once, shared by every pair.
    let correlations: Vec<f64> = (0..features.n_features())
        .map(|i| stats::pearson(features.column_at(i), y))
        .collect();

    let pairs: Vec<(usize, usize)> = (0..features.n_features()).tuple_combinations().collect();

    let mut findings: Vec<RelationshipFinding> = pairs
        .par_iter()
        .filter_map(|&(i, j)| {
            evaluate_pair(features, settings, &correlations, n, i, j)
        })
        .collect();

    // Parallel collection order is nondeterministic; the caller sorts the
    // full finding list, but keep pair order stable here too.
    findings.sort_by(|a, b| a.ordering(b));
    findings
}

fn evaluate_pair(
    features: &FeatureMatrix,
    settings: &DetectionSettings,
    correlations: &[f64],
    n: usize,
    i: usize,
    j: usize,
) -> Option<RelationshipFinding> {
    let (r1, r2) = (correlations[i], correlations[j]);
    let r12 = stats::pearson(features.column_at(i), features.column_at(j));
    let individual_sum = r1 * r1 + r2 * r2;

    let names = features.names();
    let pair = (names[i].clone(), names[j].clone());

    let denom = 1.0 - r12 * r12;
    if denom < COLLINEARITY_EPS {
        // The two features are (numerically) one signal. The bivariate fit
        // is undefined; report the collinearity itself, scaled by how much
        // of the target that shared signal explains.
        let explained = (r1 * r1).max(r2 * r2);
        let strength = (r12.abs() * explained.sqrt().max(r1.abs().min(r2.abs()))).clamp(0.0, 1.0);
        if explained < settings.min_synergy_gain {
            return None;
        }
        return Some(RelationshipFinding::Synergy {
            features: pair,
            strength,
            significance: stats::correlation_significance(r12, n),
            joint_r2: explained,
            individual_r2_sum: individual_sum,
        });
    }

    // Closed-form R² of the bivariate least-squares fit.
    let joint_r2 = ((r1 * r1 + r2 * r2 - 2.0 * r1 * r2 * r12) / denom).clamp(0.0, 1.0);
    let excess = joint_r2 - individual_sum;
    if excess < settings.min_synergy_gain {
        return None;
    }

    // Normalize the excess by the explanatory headroom left over the
    // individual fits, clipped to [0, 1].
    let headroom = (1.0 - individual_sum.min(1.0)).max(COLLINEARITY_EPS);
    let strength = (excess / headroom).clamp(0.0, 1.0);

    // F-like comparison of the joint fit against the individual fits,
    // mapped through the normal CDF.
    let residual = (1.0 - joint_r2).max(1e-12);
    let f_stat = if n > 3 {
        excess / (residual / (n - 3) as f64)
    } else {
        0.0
    };
    let significance = (2.0 * stats::normal_cdf(f_stat.max(0.0).sqrt()) - 1.0).clamp(0.0, 1.0);

    Some(RelationshipFinding::Synergy {
        features: pair,
        strength,
        significance,
        joint_r2,
        individual_r2_sum: individual_sum,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> DetectionSettings {
        DetectionSettings::default()
    }

    #[test]
    fn xor_like_pair_scores_high_synergy() {
        // Target is driven by the product of two independent oscillations:
        // neither feature alone explains much, together they explain a lot.
        let n = 80;
        let a: Vec<f64> = (0..n).map(|i| if (i / 2) % 2 == 0 { 1.0 } else { -1.0 }).collect();
        let b: Vec<f64> = (0..n).map(|i| if (i / 4) % 2 == 0 { 1.0 } else { -1.0 }).collect();
        let y: Vec<f64> = a.iter().zip(&b).map(|(x, z)| x + z).collect();

        let m = FeatureMatrix::new(
            vec![("a".to_string(), a), ("b".to_string(), b)],
            10,
        )
        .unwrap();
        let t = TargetSeries::new("y", y).unwrap();
        let findings = detect(&m, &t, &settings());
        assert_eq!(findings.len(), 1);
        assert!(findings[0].strength() > 0.5);
    }

    #[test]
    fn independent_noise_pair_reports_nothing() {
        let n = 60;
        let a: Vec<f64> = (0..n).map(|i| ((i * 7 + 1) % 13) as f64).collect();
        let b: Vec<f64> = (0..n).map(|i| ((i * 5 + 4) % 11) as f64).collect();
        let y: Vec<f64> = (0..n).map(|i| ((i * 3 + 2) % 17) as f64).collect();
        let m = FeatureMatrix::new(
            vec![("a".to_string(), a), ("b".to_string(), b)],
            10,
        )
        .unwrap();
        let t = TargetSeries::new("y", y).unwrap();
        let findings = detect(&m, &t, &settings());
        for f in &findings {
            assert!(f.strength() < 0.5, "spurious strong synergy: {f:?}");
        }
    }
}
