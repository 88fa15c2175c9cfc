use crate::error::AnalyticsError;
use crate::stats;
use core_types::{
    CoreError, FeatureMatrix, Objective, ObjectiveSpec, TargetSeries, WeightVector,
};
use serde::{Deserialize, Serialize};

/// Per-feature standardization statistics plus the linear calibration of the
/// weighted composite against the target, captured on a training window.
///
/// Freezing these lets the drift monitor evaluate live data against the
/// deployed baseline: a scale shift in a live feature shows up as a score
/// change instead of being silently re-standardized away.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrozenStats {
    names: Vec<String>,
    means: Vec<f64>,
    stds: Vec<f64>,
    /// (intercept, slope) of the target regressed on the composite.
    calibration: (f64, f64),
}

/// A stateless calculator scoring a fixed weight vector against a feature
/// matrix and target under an objective function.
#[derive(Debug, Default)]
pub struct ScoringEngine {}

impl ScoringEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scores using statistics fitted on the evaluation window itself. This
    /// is the path used by detection, optimization and validation, where the
    /// window is the ground truth.
    pub fn score(
        &self,
        features: &FeatureMatrix,
        target: &TargetSeries,
        weights: &WeightVector,
        objective: &ObjectiveSpec,
    ) -> Result<f64, AnalyticsError> {
        let frozen = self.fit_stats(features, target, weights)?;
        self.score_frozen(features, target, weights, objective, &frozen)
    }

    /// Captures standardization and calibration statistics on a training
    /// window, for later frozen-baseline evaluation.
    pub fn fit_stats(
        &self,
        features: &FeatureMatrix,
        target: &TargetSeries,
        weights: &WeightVector,
    ) -> Result<FrozenStats, AnalyticsError> {
        check_alignment(features, target)?;
        let names = features.names().to_vec();
        let means: Vec<f64> = (0..features.n_features())
            .map(|i| stats::mean(features.column_at(i)))
            .collect();
        let stds: Vec<f64> = (0..features.n_features())
            .map(|i| stats::std_dev(features.column_at(i)))
            .collect();

        let aligned = weights.aligned_values(&names)?;
        let composite = composite_series(features, &aligned, &means, &stds);

        let y = target.values();
        let var_s = stats::variance(&composite);
        let slope = if var_s <= f64::EPSILON {
            0.0
        } else {
            stats::covariance(&composite, y) / var_s
        };
        let intercept = stats::mean(y) - slope * stats::mean(&composite);

        Ok(FrozenStats {
            names,
            means,
            stds,
            calibration: (intercept, slope),
        })
    }

    /// Scores against statistics captured earlier on a training window.
    pub fn score_frozen(
        &self,
        features: &FeatureMatrix,
        target: &TargetSeries,
        weights: &WeightVector,
        objective: &ObjectiveSpec,
        frozen: &FrozenStats,
    ) -> Result<f64, AnalyticsError> {
        check_alignment(features, target)?;
        if features.names() != frozen.names.as_slice() {
            return Err(AnalyticsError::Core(CoreError::invalid(
                "feature_matrix",
                "feature names do not match the frozen baseline",
            )));
        }

        let aligned = weights.aligned_values(&frozen.names)?;
        let composite = composite_series(features, &aligned, &frozen.means, &frozen.stds);

        let score = match objective {
            ObjectiveSpec::Single(obj) => {
                self.score_single(*obj, &composite, target.values(), frozen)
            }
            ObjectiveSpec::Weighted(parts) => {
                if parts.is_empty() {
                    return Err(AnalyticsError::Core(CoreError::invalid(
                        "objective",
                        "weighted objective with no parts",
                    )));
                }
                let total: f64 = parts.iter().map(|(_, w)| w.max(0.0)).sum();
                if total <= 0.0 {
                    return Err(AnalyticsError::Core(CoreError::invalid(
                        "objective",
                        "weighted objective weights sum to zero",
                    )));
                }
                // Caller-supplied objective weights must sum to 1; if they
                // do not, normalize rather than reject.
                parts
                    .iter()
                    .map(|(obj, w)| {
                        self.score_single(*obj, &composite, target.values(), frozen)
                            * (w.max(0.0) / total)
                    })
                    .sum()
            }
        };

        if !score.is_finite() {
            return Err(AnalyticsError::Core(CoreError::unstable(
                format!("objective {objective}"),
                "objective evaluation produced a non-finite score",
            )));
        }
        Ok(score)
    }

    fn score_single(
        &self,
        objective: Objective,
        composite: &[f64],
        target: &[f64],
        frozen: &FrozenStats,
    ) -> f64 {
        match objective {
            Objective::RSquared => {
                let r = stats::pearson(composite, target);
                r * r
            }
            Objective::NegMse => {
                let (a, b) = frozen.calibration;
                let mse = composite
                    .iter()
                    .zip(target)
                    .map(|(s, y)| {
                        let e = y - (a + b * s);
                        e * e
                    })
                    .sum::<f64>()
                    / composite.len().max(1) as f64;
                -mse
            }
            Objective::NegMae => {
                let (a, b) = frozen.calibration;
                let mae = composite
                    .iter()
                    .zip(target)
                    .map(|(s, y)| (y - (a + b * s)).abs())
                    .sum::<f64>()
                    / composite.len().max(1) as f64;
                -mae
            }
        }
    }
}

/// The weighted composite index over standardized features.
fn composite_series(
    features: &FeatureMatrix,
    aligned_weights: &[f64],
    means: &[f64],
    stds: &[f64],
) -> Vec<f64> {
    let mut composite = vec![0.0; features.n_rows()];
    for (i, &w) in aligned_weights.iter().enumerate() {
        if w == 0.0 {
            continue;
        }
        let z = stats::zscore_with(features.column_at(i), means[i], stds[i]);
        for (s, zv) in composite.iter_mut().zip(z) {
            *s += w * zv;
        }
    }
    composite
}

fn check_alignment(features: &FeatureMatrix, target: &TargetSeries) -> Result<(), AnalyticsError> {
    if features.n_rows() != target.len() {
        return Err(AnalyticsError::Core(CoreError::invalid(
            target.name().to_string(),
            format!(
                "target has {} rows but features have {}",
                target.len(),
                features.n_rows()
            ),
        )));
    }
    if features.n_rows() < 2 {
        return Err(AnalyticsError::NotEnoughData(
            "fewer than 2 aligned observations".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dataset() -> (FeatureMatrix, TargetSeries) {
        let x: Vec<f64> = (0..40).map(|i| i as f64).collect();
        let noise: Vec<f64> = (0..40).map(|i| ((i * 7 + 3) % 11) as f64).collect();
        let y: Vec<f64> = x.iter().map(|v| 2.0 * v + 5.0).collect();
        let features = FeatureMatrix::new(
            vec![("driver".to_string(), x), ("noise".to_string(), noise)],
            10,
        )
        .unwrap();
        let target = TargetSeries::new("outcome", y).unwrap();
        (features, target)
    }

    #[test]
    fn r_squared_rewards_the_true_driver() {
        let (features, target) = dataset();
        let engine = ScoringEngine::new();
        let driver =
            WeightVector::from_pairs(vec![("driver", 1.0), ("noise", 0.0)]).unwrap();
        let noise = WeightVector::from_pairs(vec![("driver", 0.0), ("noise", 1.0)]).unwrap();

        let good = engine
            .score(&features, &target, &driver, &ObjectiveSpec::r_squared())
            .unwrap();
        let bad = engine
            .score(&features, &target, &noise, &ObjectiveSpec::r_squared())
            .unwrap();
        assert!(good > 0.99);
        assert!(bad < 0.2);
    }

    #[test]
    fn neg_mse_is_zero_for_perfectly_calibrated_composite() {
        let (features, target) = dataset();
        let engine = ScoringEngine::new();
        let driver =
            WeightVector::from_pairs(vec![("driver", 1.0), ("noise", 0.0)]).unwrap();
        let score = engine
            .score(
                &features,
                &target,
                &driver,
                &ObjectiveSpec::Single(Objective::NegMse),
            )
            .unwrap();
        assert!(score.abs() < 1e-18);
    }

    #[test]
    fn scoring_is_deterministic() {
        let (features, target) = dataset();
        let engine = ScoringEngine::new();
        let w = WeightVector::from_pairs(vec![("driver", 0.6), ("noise", 0.4)]).unwrap();
        let a = engine
            .score(&features, &target, &w, &ObjectiveSpec::r_squared())
            .unwrap();
        let b = engine
            .score(&features, &target, &w, &ObjectiveSpec::r_squared())
            .unwrap();
        assert_eq!(a.to_bits(), b.to_bits());
    }

    #[test]
    fn weighted_objective_normalizes_weights() {
        let (features, target) = dataset();
        let engine = ScoringEngine::new();
        let w = WeightVector::from_pairs(vec![("driver", 1.0), ("noise", 0.0)]).unwrap();
        // Weights sum to 4, not 1. The scalarization must normalize.
        let spec = ObjectiveSpec::Weighted(vec![
            (Objective::RSquared, 3.0),
            (Objective::NegMae, 1.0),
        ]);
        let score = engine.score(&features, &target, &w, &spec).unwrap();
        let r2 = engine
            .score(&features, &target, &w, &ObjectiveSpec::r_squared())
            .unwrap();
        assert!((score - 0.75 * r2).abs() < 1e-9);
    }

    #[test]
    fn frozen_stats_expose_scale_shifts() {
        let (features, target) = dataset();
        let engine = ScoringEngine::new();
        let w = WeightVector::from_pairs(vec![("driver", 0.7), ("noise", 0.3)]).unwrap();
        let frozen = engine.fit_stats(&features, &target, &w).unwrap();

        // Same data scores identically under frozen stats.
        let same = engine
            .score_frozen(
                &features,
                &target,
                &w,
                &ObjectiveSpec::Single(Objective::NegMse),
                &frozen,
            )
            .unwrap();
        assert!(same.abs() < 1.0);

        // 10x scale on the driver column degrades the frozen-baseline score.
        let shifted = FeatureMatrix::new(
            vec![
                (
                    "driver".to_string(),
                    (0..40).map(|i| i as f64 * 10.0).collect(),
                ),
                (
                    "noise".to_string(),
                    (0..40).map(|i| ((i * 7 + 3) % 11) as f64).collect(),
                ),
            ],
            10,
        )
        .unwrap();
        let drifted = engine
            .score_frozen(
                &shifted,
                &target,
                &w,
                &ObjectiveSpec::Single(Objective::NegMse),
                &frozen,
            )
            .unwrap();
        assert!(drifted < same - 1.0);
    }
}
