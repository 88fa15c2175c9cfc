//! # Acumen Validator
//!
//! Stress-tests a weight vector before it is trusted: resampling methods
//! (cross-validation, bootstrap, subsampling, out-of-time splits) measure
//! how much the objective degrades away from the full training sample, and
//! perturbation methods (noise injection, weight sensitivity) measure how
//! brittle the score is to small changes in the inputs.
//!
//! Each method reports a robustness score in `[0, 1]` plus the mean and
//! spread of the raw objective over its evaluations; the monitoring
//! component later anchors its drift detection on those baselines. A method
//! that cannot run on the given data reports `NotApplicable` and is simply
//! excluded from the aggregate, never counted as a failure.

use analytics::{stats, ScoringEngine};
use configuration::ValidationSettings;
use core_types::{
    FeatureMatrix, MethodOutcome, MethodReport, ObjectiveSpec, Severity, TargetSeries,
    ValidationIssue, ValidationMethod, ValidationReport, WeightVector,
};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::debug;

mod resampling;
pub mod error;

pub use error::ValidatorError;

use resampling::{bootstrap_sample, k_folds, subsample, time_series_blocks};

/// Sub-seed stride, one lane per validation method.
const SEED_STRIDE: u64 = 0x9E37_79B9_7F4A_7C15;
/// Rounds of noise injection.
const NOISE_ROUNDS: usize = 10;
/// Robustness below this raises a warning issue.
const LOW_ROBUSTNESS: f64 = 0.5;

/// Per-run validation options.
#[derive(Debug, Clone)]
pub struct ValidationOptions {
    /// Methods to run; defaults to all of them.
    pub methods: Vec<ValidationMethod>,
    /// Whether rows are in chronological order. Out-of-time splitting is
    /// meaningless otherwise and reports `NotApplicable`.
    pub time_ordered: bool,
    pub seed: u64,
}

impl Default for ValidationOptions {
    fn default() -> Self {
        Self {
            methods: ValidationMethod::ALL.to_vec(),
            time_ordered: true,
            seed: 0,
        }
    }
}

/// The weight validation engine.
pub struct WeightValidator {
    settings: ValidationSettings,
    scoring: ScoringEngine,
}

impl WeightValidator {
    pub fn new(settings: ValidationSettings) -> Self {
        Self {
            settings,
            scoring: ScoringEngine::new(),
        }
    }

    /// Runs the requested methods and assembles the report. Fails only when
    /// the weights cannot be scored on the full sample at all; individual
    /// method shortfalls become `NotApplicable` outcomes instead.
    pub fn validate(
        &self,
        features: &FeatureMatrix,
        target: &TargetSeries,
        weights: &WeightVector,
        objective: &ObjectiveSpec,
        options: &ValidationOptions,
    ) -> Result<ValidationReport, ValidatorError> {
        weights.aligned_values(features.names())?;
        let full_score = self
            .scoring
            .score(features, target, weights, objective)?;

        let mut methods = Vec::with_capacity(options.methods.len());
        for &method in &options.methods {
            // Seeds are derived from the method's fixed position, not its
            // position in the request, so partial runs reproduce full runs.
            let lane = ValidationMethod::ALL
                .iter()
                .position(|m| *m == method)
                .unwrap_or(0) as u64;
            let seed = options.seed.wrapping_add(SEED_STRIDE.wrapping_mul(lane + 1));

            let (outcome, mut issues) = match method {
                ValidationMethod::CrossValidation => {
                    self.cross_validation(features, target, weights, objective, full_score, seed)
                }
                ValidationMethod::Bootstrap => {
                    self.bootstrap(features, target, weights, objective, full_score, seed)
                }
                ValidationMethod::TimeSeriesSplit => self.time_series_split(
                    features,
                    target,
                    weights,
                    objective,
                    full_score,
                    options.time_ordered,
                ),
                ValidationMethod::NoiseStability => {
                    self.noise_stability(features, target, weights, objective, full_score, seed)
                }
                ValidationMethod::Sensitivity => {
                    self.sensitivity(features, target, weights, objective, full_score)
                }
                ValidationMethod::Subsampling => {
                    self.subsampling(features, target, weights, objective, full_score, seed)
                }
            };

            if let MethodOutcome::Scored { score, .. } = outcome {
                debug!(method = %method, score, "validation method finished");
                if score < LOW_ROBUSTNESS {
                    issues.push(ValidationIssue {
                        message: format!("robustness {score:.3} under {method} is below {LOW_ROBUSTNESS}"),
                        severity: Severity::Warning,
                    });
                }
            }
            methods.push(MethodReport {
                method,
                outcome,
                issues,
            });
        }

        Ok(ValidationReport { methods })
    }

    fn cross_validation(
        &self,
        features: &FeatureMatrix,
        target: &TargetSeries,
        weights: &WeightVector,
        objective: &ObjectiveSpec,
        full_score: f64,
        seed: u64,
    ) -> (MethodOutcome, Vec<ValidationIssue>) {
        let folds = self.settings.folds;
        if features.n_rows() < folds * 2 {
            return not_applicable(format!(
                "{}-fold cross-validation needs at least {} rows, got {}",
                folds,
                folds * 2,
                features.n_rows()
            ));
        }
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let scores: Vec<f64> = k_folds(&mut rng, features.n_rows(), folds)
            .iter()
            .filter_map(|held_out| {
                self.score_rows(features, target, weights, objective, held_out)
            })
            .collect();
        scored_outcome(full_score, &scores, "no fold could be scored")
    }

    fn bootstrap(
        &self,
        features: &FeatureMatrix,
        target: &TargetSeries,
        weights: &WeightVector,
        objective: &ObjectiveSpec,
        full_score: f64,
        seed: u64,
    ) -> (MethodOutcome, Vec<ValidationIssue>) {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let scores: Vec<f64> = (0..self.settings.bootstrap_samples)
            .filter_map(|_| {
                let sample = bootstrap_sample(&mut rng, features.n_rows());
                self.score_rows(features, target, weights, objective, &sample)
            })
            .collect();
        scored_outcome(full_score, &scores, "no bootstrap resample could be scored")
    }

    fn time_series_split(
        &self,
        features: &FeatureMatrix,
        target: &TargetSeries,
        weights: &WeightVector,
        objective: &ObjectiveSpec,
        full_score: f64,
        time_ordered: bool,
    ) -> (MethodOutcome, Vec<ValidationIssue>) {
        if !time_ordered {
            return not_applicable("rows are not time-ordered".to_string());
        }
        let folds = self.settings.folds;
        if features.n_rows() < (folds + 1) * 2 {
            return not_applicable(format!(
                "out-of-time evaluation needs at least {} rows, got {}",
                (folds + 1) * 2,
                features.n_rows()
            ));
        }
        let scores: Vec<f64> = time_series_blocks(features.n_rows(), folds)
            .iter()
            .filter_map(|block| self.score_rows(features, target, weights, objective, block))
            .collect();
        scored_outcome(full_score, &scores, "no out-of-time block could be scored")
    }

    fn noise_stability(
        &self,
        features: &FeatureMatrix,
        target: &TargetSeries,
        weights: &WeightVector,
        objective: &ObjectiveSpec,
        full_score: f64,
        seed: u64,
    ) -> (MethodOutcome, Vec<ValidationIssue>) {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let sigma = self.settings.noise_sigma;
        let column_stds: Vec<f64> = features.columns().map(|(_, c)| stats::std_dev(c)).collect();

        let mut scores = Vec::with_capacity(NOISE_ROUNDS);
        for _ in 0..NOISE_ROUNDS {
            let noisy: Vec<(String, Vec<f64>)> = features
                .columns()
                .zip(&column_stds)
                .map(|((name, col), std)| {
                    let perturbed = col
                        .iter()
                        .map(|v| v + gaussian(&mut rng) * sigma * std)
                        .collect();
                    (name.to_string(), perturbed)
                })
                .collect();
            let Ok(matrix) = FeatureMatrix::new(noisy, 1) else {
                continue;
            };
            if let Ok(score) = self.scoring.score(&matrix, target, weights, objective) {
                if score.is_finite() {
                    scores.push(score);
                }
            }
        }
        scored_outcome(full_score, &scores, "no noisy replica could be scored")
    }

    /// Perturbs each weight by `sensitivity_delta` in both directions,
    /// renormalizes, and measures the relative score impact. Weights whose
    /// impact dwarfs the average are flagged as fragile.
    fn sensitivity(
        &self,
        features: &FeatureMatrix,
        target: &TargetSeries,
        weights: &WeightVector,
        objective: &ObjectiveSpec,
        full_score: f64,
    ) -> (MethodOutcome, Vec<ValidationIssue>) {
        let delta = self.settings.sensitivity_delta;
        let scale = full_score.abs().max(1e-9);
        let names: Vec<String> = weights.names().map(str::to_string).collect();

        let mut impacts = Vec::with_capacity(names.len());
        let mut perturbed_scores = Vec::new();
        for (index, name) in names.iter().enumerate() {
            let mut worst = 0.0_f64;
            for direction in [1.0 + delta, (1.0 - delta).max(0.0)] {
                let mut values: Vec<f64> = weights.iter().map(|(_, v)| v).collect();
                values[index] *= direction;
                let candidate = match weights
                    .with_values(&values)
                    .and_then(|w| w.normalized())
                {
                    Ok(c) => c,
                    Err(_) => continue,
                };
                if let Ok(score) = self.scoring.score(features, target, &candidate, objective) {
                    if score.is_finite() {
                        worst = worst.max((score - full_score).abs() / scale);
                        perturbed_scores.push(score);
                    }
                }
            }
            impacts.push((name.clone(), worst));
        }

        if perturbed_scores.is_empty() {
            return not_applicable("no perturbed vector could be scored".to_string());
        }

        let mean_impact = stats::mean(&impacts.iter().map(|(_, i)| *i).collect::<Vec<_>>());
        let mut issues = Vec::new();
        if mean_impact > 0.0 {
            for (name, impact) in &impacts {
                if *impact > self.settings.fragile_ratio * mean_impact {
                    issues.push(ValidationIssue {
                        message: format!(
                            "weight '{name}' is fragile: impact {impact:.4} vs mean {mean_impact:.4}"
                        ),
                        severity: Severity::Warning,
                    });
                }
            }
        }

        let outcome = MethodOutcome::Scored {
            score: (1.0 - mean_impact).clamp(0.0, 1.0),
            mean_objective: stats::mean(&perturbed_scores),
            spread: stats::std_dev(&perturbed_scores),
            low: percentile(&perturbed_scores, 0.05),
            high: percentile(&perturbed_scores, 0.95),
        };
        (outcome, issues)
    }

    /// Each round drops both rows and features: a random row subset is
    /// scored under a random feature subset, with the weight vector
    /// restricted to the kept features and renormalized. Rounds whose kept
    /// features carry no weight at all are skipped.
    fn subsampling(
        &self,
        features: &FeatureMatrix,
        target: &TargetSeries,
        weights: &WeightVector,
        objective: &ObjectiveSpec,
        full_score: f64,
        seed: u64,
    ) -> (MethodOutcome, Vec<ValidationIssue>) {
        let fraction = self.settings.subsample_fraction;
        let row_count = (features.n_rows() as f64 * fraction) as usize;
        if row_count < 2 {
            return not_applicable(format!(
                "subsample of {} rows at fraction {fraction} is too small",
                features.n_rows(),
            ));
        }
        let feature_count = ((features.n_features() as f64 * fraction).ceil() as usize)
            .clamp(1, features.n_features());
        let aligned = match weights.aligned_values(features.names()) {
            Ok(v) => v,
            Err(e) => return not_applicable(e.to_string()),
        };

        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let scores: Vec<f64> = (0..self.settings.subsample_rounds)
            .filter_map(|_| {
                let rows = subsample(&mut rng, features.n_rows(), row_count);
                let kept = subsample(&mut rng, features.n_features(), feature_count);

                let restricted = WeightVector::from_pairs(
                    kept.iter()
                        .map(|&i| (features.names()[i].clone(), aligned[i])),
                )
                .and_then(|w| w.normalized())
                .ok()?;

                let sub_features = features.subset_features(&kept).subset_rows(&rows);
                let sub_target = target.subset(&rows);
                self.scoring
                    .score(&sub_features, &sub_target, &restricted, objective)
                    .ok()
                    .filter(|s| s.is_finite())
            })
            .collect();
        scored_outcome(full_score, &scores, "no subsample could be scored")
    }

    fn score_rows(
        &self,
        features: &FeatureMatrix,
        target: &TargetSeries,
        weights: &WeightVector,
        objective: &ObjectiveSpec,
        rows: &[usize],
    ) -> Option<f64> {
        if rows.len() < 2 {
            return None;
        }
        let sub_features = features.subset_rows(rows);
        let sub_target = target.subset(rows);
        self.scoring
            .score(&sub_features, &sub_target, weights, objective)
            .ok()
            .filter(|s| s.is_finite())
    }
}

fn not_applicable(reason: String) -> (MethodOutcome, Vec<ValidationIssue>) {
    (MethodOutcome::NotApplicable { reason }, Vec::new())
}

/// Robustness from a set of resample scores: 1 minus the relative
/// degradation of the resample mean against the full-sample score, floored
/// at zero. Improvements over the full sample are not rewarded past 1.
fn scored_outcome(
    full_score: f64,
    scores: &[f64],
    empty_reason: &str,
) -> (MethodOutcome, Vec<ValidationIssue>) {
    if scores.is_empty() {
        return not_applicable(empty_reason.to_string());
    }
    let mean = stats::mean(scores);
    let spread = stats::std_dev(scores);
    let scale = full_score.abs().max(1e-9);
    let degradation = ((full_score - mean) / scale).max(0.0);
    let outcome = MethodOutcome::Scored {
        score: (1.0 - degradation).clamp(0.0, 1.0),
        mean_objective: mean,
        spread,
        low: percentile(scores, 0.05),
        high: percentile(scores, 0.95),
    };
    (outcome, Vec::new())
}

/// Linearly interpolated percentile of an unsorted sample.
fn percentile(scores: &[f64], q: f64) -> f64 {
    let mut sorted = scores.to_vec();
    sorted.sort_by(f64::total_cmp);
    let position = q * (sorted.len() - 1) as f64;
    let below = position.floor() as usize;
    let above = position.ceil() as usize;
    let fraction = position - below as f64;
    sorted[below] + (sorted[above] - sorted[below]) * fraction
}

/// Box-Muller standard normal draw.
fn gaussian<R: rand::Rng>(rng: &mut R) -> f64 {
    let u1: f64 = rng.r#gen::<f64>().max(1e-12);
    let u2: f64 = rng.r#gen();
    (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_types::Objective;

    fn dataset(n: usize) -> (FeatureMatrix, TargetSeries) {
        let driver: Vec<f64> = (0..n).map(|i| (i as f64 * 0.31).sin() * 4.0).collect();
        let noise: Vec<f64> = (0..n).map(|i| ((i * 17 + 5) % 23) as f64 * 0.1).collect();
        let y: Vec<f64> = driver
            .iter()
            .zip(&noise)
            .map(|(d, x)| d * 1.5 + x * 0.05)
            .collect();
        let features = FeatureMatrix::new(
            vec![("driver".to_string(), driver), ("noise".to_string(), noise)],
            10,
        )
        .unwrap();
        (features, TargetSeries::new("y", y).unwrap())
    }

    fn good_weights() -> WeightVector {
        WeightVector::from_pairs([("driver", 0.9), ("noise", 0.1)]).unwrap()
    }

    #[test]
    fn a_genuine_relationship_validates_well_across_methods() {
        let (features, target) = dataset(80);
        let validator = WeightValidator::new(ValidationSettings::default());
        let report = validator
            .validate(
                &features,
                &target,
                &good_weights(),
                &ObjectiveSpec::r_squared(),
                &ValidationOptions::default(),
            )
            .unwrap();
        assert_eq!(report.methods.len(), ValidationMethod::ALL.len());
        let aggregate = report.aggregate_score().unwrap();
        assert!(aggregate > 0.7, "aggregate {aggregate}");
    }

    #[test]
    fn time_series_split_is_not_applicable_without_ordering() {
        let (features, target) = dataset(80);
        let validator = WeightValidator::new(ValidationSettings::default());
        let options = ValidationOptions {
            methods: vec![ValidationMethod::TimeSeriesSplit, ValidationMethod::Bootstrap],
            time_ordered: false,
            ..ValidationOptions::default()
        };
        let report = validator
            .validate(
                &features,
                &target,
                &good_weights(),
                &ObjectiveSpec::r_squared(),
                &options,
            )
            .unwrap();
        let ts = report.method(ValidationMethod::TimeSeriesSplit).unwrap();
        assert!(matches!(ts.outcome, MethodOutcome::NotApplicable { .. }));
        // The aggregate still exists because bootstrap ran.
        assert!(report.aggregate_score().is_some());
    }

    #[test]
    fn too_few_rows_makes_cross_validation_not_applicable() {
        let (features, target) = dataset(12);
        let mut settings = ValidationSettings::default();
        settings.folds = 8;
        let validator = WeightValidator::new(settings);
        let options = ValidationOptions {
            methods: vec![ValidationMethod::CrossValidation],
            ..ValidationOptions::default()
        };
        let report = validator
            .validate(
                &features,
                &target,
                &good_weights(),
                &ObjectiveSpec::r_squared(),
                &options,
            )
            .unwrap();
        assert!(matches!(
            report.methods[0].outcome,
            MethodOutcome::NotApplicable { .. }
        ));
    }

    #[test]
    fn bootstrap_reports_a_percentile_band_around_the_mean() {
        let (features, target) = dataset(80);
        let validator = WeightValidator::new(ValidationSettings::default());
        let options = ValidationOptions {
            methods: vec![ValidationMethod::Bootstrap],
            ..ValidationOptions::default()
        };
        let report = validator
            .validate(
                &features,
                &target,
                &good_weights(),
                &ObjectiveSpec::r_squared(),
                &options,
            )
            .unwrap();
        match report.methods[0].outcome {
            MethodOutcome::Scored {
                mean_objective,
                low,
                high,
                ..
            } => {
                assert!(low < high, "resampled objectives must disperse");
                assert!(low <= mean_objective && mean_objective <= high);
            }
            _ => panic!("bootstrap did not score"),
        }
    }

    #[test]
    fn percentiles_interpolate_over_the_sorted_sample() {
        let scores = vec![3.0, 1.0, 2.0, 5.0, 4.0];
        assert!((percentile(&scores, 0.0) - 1.0).abs() < 1e-12);
        assert!((percentile(&scores, 1.0) - 5.0).abs() < 1e-12);
        assert!((percentile(&scores, 0.5) - 3.0).abs() < 1e-12);
        assert!((percentile(&scores, 0.95) - 4.8).abs() < 1e-12);
    }

    #[test]
    fn subsampling_drops_features_and_survives_zero_weight_subsets() {
        let n = 60;
        let driver: Vec<f64> = (0..n).map(|i| (i as f64 * 0.31).sin() * 4.0).collect();
        let spare: Vec<f64> = (0..n).map(|i| ((i * 11 + 3) % 17) as f64 * 0.2).collect();
        let other: Vec<f64> = (0..n).map(|i| ((i * 5 + 1) % 7) as f64).collect();
        let y: Vec<f64> = driver.iter().map(|d| d * 2.0).collect();
        let features = FeatureMatrix::new(
            vec![
                ("driver".to_string(), driver),
                ("spare".to_string(), spare),
                ("other".to_string(), other),
            ],
            10,
        )
        .unwrap();
        let target = TargetSeries::new("y", y).unwrap();
        // All weight on the driver: rounds whose feature subset drops it
        // cannot renormalize and must be skipped, not crash or score 0.
        let concentrated = WeightVector::from_pairs([
            ("driver", 1.0),
            ("spare", 0.0),
            ("other", 0.0),
        ])
        .unwrap();
        let mut settings = ValidationSettings::default();
        settings.subsample_fraction = 0.5;
        let validator = WeightValidator::new(settings);
        let options = ValidationOptions {
            methods: vec![ValidationMethod::Subsampling],
            ..ValidationOptions::default()
        };
        let report = validator
            .validate(
                &features,
                &target,
                &concentrated,
                &ObjectiveSpec::r_squared(),
                &options,
            )
            .unwrap();
        match report.methods[0].outcome {
            MethodOutcome::Scored { score, .. } => {
                assert!(score > 0.5, "driver-only rounds should score well, got {score}")
            }
            _ => panic!("subsampling did not score"),
        }
    }

    #[test]
    fn same_seed_reproduces_the_report_exactly() {
        let (features, target) = dataset(60);
        let validator = WeightValidator::new(ValidationSettings::default());
        let options = ValidationOptions {
            seed: 99,
            ..ValidationOptions::default()
        };
        let run = || {
            validator
                .validate(
                    &features,
                    &target,
                    &good_weights(),
                    &ObjectiveSpec::r_squared(),
                    &options,
                )
                .unwrap()
        };
        let (a, b) = (run(), run());
        for (ma, mb) in a.methods.iter().zip(&b.methods) {
            match (&ma.outcome, &mb.outcome) {
                (
                    MethodOutcome::Scored { score: sa, .. },
                    MethodOutcome::Scored { score: sb, .. },
                ) => assert_eq!(sa.to_bits(), sb.to_bits()),
                (MethodOutcome::NotApplicable { .. }, MethodOutcome::NotApplicable { .. }) => {}
                _ => panic!("outcomes diverged for {}", ma.method),
            }
        }
    }

    #[test]
    fn partial_method_list_reproduces_full_run_scores() {
        let (features, target) = dataset(60);
        let validator = WeightValidator::new(ValidationSettings::default());
        let full = validator
            .validate(
                &features,
                &target,
                &good_weights(),
                &ObjectiveSpec::r_squared(),
                &ValidationOptions { seed: 5, ..ValidationOptions::default() },
            )
            .unwrap();
        let partial = validator
            .validate(
                &features,
                &target,
                &good_weights(),
                &ObjectiveSpec::r_squared(),
                &ValidationOptions {
                    seed: 5,
                    methods: vec![ValidationMethod::Bootstrap],
                    ..ValidationOptions::default()
                },
            )
            .unwrap();
        let full_bootstrap = full.method(ValidationMethod::Bootstrap).unwrap();
        let partial_bootstrap = partial.method(ValidationMethod::Bootstrap).unwrap();
        match (&full_bootstrap.outcome, &partial_bootstrap.outcome) {
            (
                MethodOutcome::Scored { score: a, .. },
                MethodOutcome::Scored { score: b, .. },
            ) => assert_eq!(a.to_bits(), b.to_bits()),
            _ => panic!("bootstrap did not score"),
        }
    }
}
