//! Threshold detection: the feature value past which the target's behavior
//! changes discontinuously.
//!
//! Candidate split points are data-driven quantiles of each feature. A split
//! is scored by the standardized separation of the target means on either
//! side (a pooled-variance effect size), and the best split per feature is
//! reported when it clears the configured strength floor.

use analytics::stats;
use configuration::DetectionSettings;
use core_types::{FeatureMatrix, RelationshipFinding, TargetSeries, ThresholdDirection};
use rayon::prelude::*;

/// Smallest group share a split may produce. Splits that shave off fewer
/// rows than this say more about outliers than about thresholds.
const MIN_GROUP_FRACTION: f64 = 0.1;

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
    let min_group = ((n as f64 * MIN_GROUP_FRACTION).ceil() as usize).max(3);

    let mut sorted = column.to_vec();
    sorted.sort_by(f64::total_cmp);

    let mut best: Option<(f64, f64, f64, ThresholdDirection)> = None;

    for q in 1..=settings.threshold_quantiles {
        let rank = (n * q) / (settings.threshold_quantiles + 1);
        let rank = rank.clamp(1, n - 1);
        // Split between adjacent order statistics so the reported threshold
        // is a value the data actually brackets.
        let split = (sorted[rank - 1] + sorted[rank]) / 2.0;

        let (mut below, mut above) = (Vec::new(), Vec::new());
        for (x, t) in column.iter().zip(y) {
            if *x <= split {
                below.push(*t);
            } else {
                above.push(*t);
            }
        }
        if below.len() < min_group || above.len() < min_group {
            continue;
        }

        let (m_below, m_above) = (stats::mean(&below), stats::mean(&above));
        let pooled = pooled_std(&below, &above);
        let effect = (m_above - m_below).abs() / pooled.max(1e-9);

        let is_better = best.map(|(e, ..)| effect > e).unwrap_or(true);
        if is_better {
            let direction = if m_above >= m_below {
                ThresholdDirection::TargetHigherAbove
            } else {
                ThresholdDirection::TargetHigherBelow
            };
            let balance = below.len().min(above.len()) as f64;
            best = Some((effect, split, balance, direction));
        }
    }

    let (effect, split, balance, direction) = best?;

    // Effect size mapped onto [0, 1); a step change dwarfing the in-group
    // noise drives this toward 1.
    let strength = effect / (1.0 + effect);
    if strength < settings.min_threshold_strength {
        return None;
    }

    // Welch-style statistic from the effect size and the group balance.
    let t_stat = effect * (balance / 2.0).sqrt();
    let significance = (2.0 * stats::normal_cdf(t_stat) - 1.0).clamp(0.0, 1.0);

    Some(RelationshipFinding::Threshold {
        feature: features.names()[index].clone(),
        strength,
        significance,
        threshold: split,
        direction,
    })
}

fn pooled_std(a: &[f64], b: &[f64]) -> f64 {
    let (na, nb) = (a.len() as f64, b.len() as f64);
    let pooled_var =
        ((na - 1.0) * stats::variance(a) + (nb - 1.0) * stats::variance(b)) / (na + nb - 2.0);
    pooled_var.max(0.0).sqrt()
}
