//! Higher-order interaction detection.
//!
//! A seeded forest is fitted on the raw features (baseline) and on the raw
//! features plus engineered pairwise products. Product columns whose
//! permutation importance exceeds what their parents already contribute in
//! the baseline model indicate an interaction the additive view misses.

use analytics::forest;
use analytics::stats;
use configuration::DetectionSettings;
use core_types::{FeatureMatrix, RelationshipFinding, TargetSeries};
use itertools::Itertools;

use crate::error::DetectorError;

/// Pairwise engineering is quadratic; above this many features only the
/// columns most correlated with the target enter the product pool.
const MAX_ENGINEERED_FEATURES: usize = 10;

const FOREST_TREES: u16 = 64;
const FOREST_DEPTH: u16 = 6;

pub(crate) fn detect(
    features: &FeatureMatrix,
    target: &TargetSeries,
    settings: &DetectionSettings,
    seed: u64,
) -> Result<Vec<RelationshipFinding>, DetectorError> {
    if settings.top_interactions == 0 || features.n_features() < 2 {
        return Ok(Vec::new());
    }

    let y = target.values();
    let candidates = candidate_indices(features, y);

    // Baseline: raw features only.
    let raw_columns: Vec<&[f64]> = (0..features.n_features())
        .map(|i| features.column_at(i))
        .collect();
    let baseline = forest::fit_forest(&raw_columns, y, FOREST_TREES, FOREST_DEPTH, seed)?;
    let baseline_importance = baseline.permutation_importance(seed)?;

    // Engineered: raw features plus pairwise products of the candidates.
    let pairs: Vec<(usize, usize)> = candidates.iter().copied().tuple_combinations().collect();
    if pairs.is_empty() {
        return Ok(Vec::new());
    }
    let products: Vec<Vec<f64>> = pairs
        .iter()
        .map(|&(i, j)| {
            features
                .column_at(i)
                .iter()
                .zip(features.column_at(j))
                .map(|(a, b)| a * b)
                .collect()
        })
        .collect();

    let mut engineered: Vec<&[f64]> = raw_columns.clone();
    engineered.extend(products.iter().map(Vec::as_slice));

    let full = forest::fit_forest(&engineered, y, FOREST_TREES, FOREST_DEPTH, seed)?;
    let full_importance = full.permutation_importance(seed)?;

    let model_gain = if baseline.mse() > 0.0 {
        ((baseline.mse() - full.mse()) / baseline.mse()).clamp(0.0, 1.0)
    } else {
        0.0
    };

    let target_variance = stats::variance(y).max(1e-12);
    let n_raw = raw_columns.len();

    let mut scored: Vec<RelationshipFinding> = pairs
        .iter()
        .enumerate()
        .filter_map(|(p, &(i, j))| {
            let product_importance = full_importance[n_raw + p];
            let parent_importance = baseline_importance[i].max(baseline_importance[j]);
            let gain = product_importance - parent_importance;
            if gain <= 0.0 {
                return None;
            }
            let strength = (gain / target_variance).clamp(0.0, 1.0);
            Some(RelationshipFinding::Interaction {
                features: vec![
                    features.names()[i].clone(),
                    features.names()[j].clone(),
                ],
                strength,
                significance: model_gain,
                degree: 2,
                importance_gain: gain,
            })
        })
        .collect();

    scored.sort_by(|a, b| a.ordering(b));
    scored.truncate(settings.top_interactions);
    Ok(scored)
}

/// Indices eligible for product engineering, capped by correlation with the
/// target when the feature count is large.
fn candidate_indices(features: &FeatureMatrix, y: &[f64]) -> Vec<usize> {
    let n = features.n_features();
    if n <= MAX_ENGINEERED_FEATURES {
        return (0..n).collect();
    }
    let mut ranked: Vec<(usize, f64)> = (0..n)
        .map(|i| (i, stats::pearson(features.column_at(i), y).abs()))
        .collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    let mut kept: Vec<usize> = ranked
        .into_iter()
        .take(MAX_ENGINEERED_FEATURES)
        .map(|(i, _)| i)
        .collect();
    kept.sort_unstable();
    kept
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn multiplicative_target_surfaces_the_product_pair() {
        let n = 80;
        let a: Vec<f64> = (0..n).map(|i| (i as f64 * 0.61).sin() * 2.0).collect();
        let b: Vec<f64> = (0..n).map(|i| (i as f64 * 0.29).cos() * 2.0).collect();
        let c: Vec<f64> = (0..n).map(|i| ((i * 7 + 2) % 11) as f64 * 0.3).collect();
        let y: Vec<f64> = a.iter().zip(&b).map(|(x, z)| x * z * 5.0).collect();

        let m = FeatureMatrix::new(
            vec![
                ("a".to_string(), a),
                ("b".to_string(), b),
                ("c".to_string(), c),
            ],
            10,
        )
        .unwrap();
        let t = TargetSeries::new("y", y).unwrap();
        let findings = detect(&m, &t, &DetectionSettings::default(), 11).unwrap();

        assert!(!findings.is_empty(), "product interaction not surfaced");
        let top = &findings[0];
        match top {
            RelationshipFinding::Interaction { features, .. } => {
                assert!(features.contains(&"a".to_string()));
                assert!(features.contains(&"b".to_string()));
            }
            other => panic!("unexpected finding {other:?}"),
        }
    }
}
