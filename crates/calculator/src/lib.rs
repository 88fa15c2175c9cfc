//! # Acumen Weight Calculator
//!
//! Computes candidate per-feature weight vectors by independent statistical
//! methods (correlation, ensemble importance, regression, lag-adjusted
//! time-series) and combines them into a composite. Every returned vector
//! satisfies the simplex contract: non-negative weights summing to 1.
//!
//! Methods that cannot run on the given data (the time-series method on
//! non-temporal data, for instance) are reported as skips, never as silent
//! zero-weight results.

use analytics::{forest, stats};
use configuration::WeightingSettings;
use core_types::{
    CoreError, FeatureMatrix, RelationshipFinding, TargetSeries, WeightMethod, WeightVector,
};
use nalgebra::{DMatrix, DVector};
use std::collections::BTreeMap;
use tracing::debug;

pub mod error;

pub use error::CalculatorError;

/// Maximum singular-value ratio before a design matrix is treated as
/// singular and the regression method refuses to produce weights.
const CONDITION_LIMIT: f64 = 1e10;

/// What the calculator knows about the data beyond the matrix itself:
/// whether row order is time order, and the lag findings the detector
/// produced (the time-series method is derived from them).
#[derive(Debug, Clone, Default)]
pub struct CalculationContext {
    pub time_ordered: bool,
    pub lag_findings: Vec<RelationshipFinding>,
}

#[derive(Debug, Clone)]
pub struct SkippedMethod {
    pub method: WeightMethod,
    pub reason: String,
}

/// Per-method weight vectors plus the methods that could not run.
#[derive(Debug, Clone)]
pub struct CalculationOutcome {
    pub per_method: BTreeMap<WeightMethod, WeightVector>,
    pub skipped: Vec<SkippedMethod>,
}

/// The weight calculation engine.
pub struct WeightCalculator {
    settings: WeightingSettings,
}

impl WeightCalculator {
    pub fn new(settings: WeightingSettings) -> Self {
        Self { settings }
    }

    /// Computes a weight vector for every requested method.
    ///
    /// A method failing on this particular data (singular regression,
    /// inapplicable time-series) becomes a recorded skip; the calculation
    /// fails only when no method at all produced a vector.
    pub fn calculate(
        &self,
        features: &FeatureMatrix,
        target: &TargetSeries,
        methods: &[WeightMethod],
        context: &CalculationContext,
    ) -> Result<CalculationOutcome, CalculatorError> {
        let mut requested: Vec<WeightMethod> = methods.to_vec();
        // Composite alone still needs base vectors to average.
        if requested == [WeightMethod::Composite] {
            requested = vec![
                WeightMethod::Correlation,
                WeightMethod::Importance,
                WeightMethod::Regression,
                WeightMethod::TimeSeries,
                WeightMethod::Composite,
            ];
        }

        let mut per_method = BTreeMap::new();
        let mut skipped = Vec::new();

        for method in requested {
            if method == WeightMethod::Composite {
                continue; // Combined last, from the base results.
            }
            match self.calculate_one(features, target, method, context) {
                Ok(vector) => {
                    per_method.insert(method, vector);
                }
                Err(e) => {
                    debug!(method = %method, error = %e, "weight method skipped");
                    skipped.push(SkippedMethod {
                        method,
                        reason: e.to_string(),
                    });
                }
            }
        }

        if methods.contains(&WeightMethod::Composite)
            || per_method.is_empty() && !methods.is_empty()
        {
            if per_method.is_empty() {
                return Err(CalculatorError::NoMethodSucceeded);
            }
            if methods.contains(&WeightMethod::Composite) {
                let combination: Vec<(WeightMethod, f64)> =
                    per_method.keys().map(|m| (*m, 1.0)).collect();
                let combined = self.combine(&per_method, &combination)?;
                per_method.insert(WeightMethod::Composite, combined);
            }
        }

        if per_method.is_empty() {
            return Err(CalculatorError::NoMethodSucceeded);
        }
        Ok(CalculationOutcome { per_method, skipped })
    }

    /// A configurable weighted average across method outputs. Combination
    /// weights for methods absent from `per_method` are redistributed
    /// proportionally to the remaining methods.
    pub fn combine(
        &self,
        per_method: &BTreeMap<WeightMethod, WeightVector>,
        combination: &[(WeightMethod, f64)],
    ) -> Result<WeightVector, CalculatorError> {
        let available: Vec<(&WeightVector, f64)> = combination
            .iter()
            .filter(|(_, share)| *share > 0.0)
            .filter_map(|(method, share)| per_method.get(method).map(|v| (v, *share)))
            .collect();
        if available.is_empty() {
            return Err(CalculatorError::Core(CoreError::invalid(
                "composite",
                "no method output available to combine",
            )));
        }
        let total: f64 = available.iter().map(|(_, s)| s).sum();

        let names: Vec<String> = available[0].0.names().map(str::to_string).collect();
        let mut accumulated = vec![0.0; names.len()];
        for (vector, share) in &available {
            let aligned = vector.aligned_values(&names)?;
            for (acc, v) in accumulated.iter_mut().zip(aligned) {
                *acc += v * share / total;
            }
        }

        let combined = WeightVector::from_pairs(names.into_iter().zip(accumulated))?;
        Ok(combined.normalized()?)
    }

    fn calculate_one(
        &self,
        features: &FeatureMatrix,
        target: &TargetSeries,
        method: WeightMethod,
        context: &CalculationContext,
    ) -> Result<WeightVector, CalculatorError> {
        match method {
            WeightMethod::Correlation => self.correlation_weights(features, target),
            WeightMethod::Importance => self.importance_weights(features, target),
            WeightMethod::Regression => self.regression_weights(features, target),
            WeightMethod::TimeSeries => self.time_series_weights(features, context),
            WeightMethod::Composite => unreachable!("composite is combined, not calculated"),
        }
    }

    /// weight_i = |corr(feature_i, target)|, normalized to sum 1.
    fn correlation_weights(
        &self,
        features: &FeatureMatrix,
        target: &TargetSeries,
    ) -> Result<WeightVector, CalculatorError> {
        let raw: Vec<f64> = (0..features.n_features())
            .map(|i| stats::pearson(features.column_at(i), target.values()).abs())
            .collect();
        self.normalize_raw(features, raw, "correlation")
    }

    /// Permutation importance from a seeded random forest, normalized.
    fn importance_weights(
        &self,
        features: &FeatureMatrix,
        target: &TargetSeries,
    ) -> Result<WeightVector, CalculatorError> {
        let columns: Vec<&[f64]> = (0..features.n_features())
            .map(|i| features.column_at(i))
            .collect();
        let fit = forest::fit_forest(
            &columns,
            target.values(),
            self.settings.forest_trees,
            self.settings.forest_max_depth,
            self.settings.forest_seed,
        )?;
        let raw = fit.permutation_importance(self.settings.forest_seed)?;
        self.normalize_raw(features, raw, "importance")
    }

    /// |standardized OLS coefficient|, normalized. A singular or collinear
    /// design matrix is a hard numeric-instability error: NaN weights must
    /// never leave this method.
    fn regression_weights(
        &self,
        features: &FeatureMatrix,
        target: &TargetSeries,
    ) -> Result<WeightVector, CalculatorError> {
        let n = features.n_rows();
        let p = features.n_features();
        if n < p + 2 {
            return Err(CalculatorError::Core(CoreError::DataInsufficient {
                entity: "regression".to_string(),
                rows: n,
                required: p + 2,
            }));
        }

        // Standardized design matrix: coefficients become comparable.
        let mut standardized: Vec<Vec<f64>> = Vec::with_capacity(p);
        for i in 0..p {
            let col = features.column_at(i);
            standardized.push(stats::zscore_with(
                col,
                stats::mean(col),
                stats::std_dev(col),
            ));
        }
        let design = DMatrix::from_fn(n, p, |r, c| standardized[c][r]);
        let y_mean = stats::mean(target.values());
        let response = DVector::from_fn(n, |r, _| target.values()[r] - y_mean);

        let svd = design.svd(true, true);
        let max_sv = svd.singular_values.iter().cloned().fold(0.0, f64::max);
        let min_sv = svd
            .singular_values
            .iter()
            .cloned()
            .fold(f64::INFINITY, f64::min);
        if min_sv <= 0.0 || max_sv / min_sv > CONDITION_LIMIT {
            return Err(CalculatorError::Core(CoreError::unstable(
                "regression",
                format!(
                    "design matrix is singular or collinear (condition ratio {:.3e})",
                    max_sv / min_sv.max(f64::MIN_POSITIVE)
                ),
            )));
        }

        let coefficients = svd.solve(&response, 1e-12).map_err(|e| {
            CalculatorError::Core(CoreError::unstable("regression", e.to_string()))
        })?;

        let raw: Vec<f64> = coefficients.iter().map(|c| c.abs()).collect();
        if raw.iter().any(|v| !v.is_finite()) {
            return Err(CalculatorError::Core(CoreError::unstable(
                "regression",
                "least-squares solve produced non-finite coefficients",
            )));
        }
        self.normalize_raw(features, raw, "regression")
    }

    /// Weights from the detector's lag findings. Features with no detected
    /// lag get a floor share rather than zero, so the method never excludes
    /// a feature outright.
    fn time_series_weights(
        &self,
        features: &FeatureMatrix,
        context: &CalculationContext,
    ) -> Result<WeightVector, CalculatorError> {
        if !context.time_ordered {
            return Err(CalculatorError::Core(CoreError::ValidationInapplicable {
                method: "time_series".to_string(),
                reason: "data is not time-ordered".to_string(),
            }));
        }

        let raw: Vec<f64> = features
            .names()
            .iter()
            .map(|name| {
                context
                    .lag_findings
                    .iter()
                    .find_map(|f| match f {
                        RelationshipFinding::Lag {
                            feature,
                            correlation,
                            ..
                        } if feature == name => Some(correlation.abs()),
                        _ => None,
                    })
                    .unwrap_or(self.settings.lag_floor_share)
            })
            .collect();
        self.normalize_raw(features, raw, "time_series")
    }

    fn normalize_raw(
        &self,
        features: &FeatureMatrix,
        raw: Vec<f64>,
        method: &str,
    ) -> Result<WeightVector, CalculatorError> {
        let sum: f64 = raw.iter().sum();
        let vector = if sum <= f64::EPSILON {
            // Nothing discriminating in this window; fall back to uniform
            // rather than failing normalization.
            debug!(method, "all raw weights zero, falling back to uniform");
            WeightVector::uniform(features.names())?
        } else {
            WeightVector::from_pairs(
                features
                    .names()
                    .iter()
                    .map(String::clone)
                    .zip(raw.iter().copied()),
            )?
            .normalized()?
        };
        Ok(vector)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_types::ErrorKind;

    fn dataset() -> (FeatureMatrix, TargetSeries) {
        let n = 50;
        let a: Vec<f64> = (0..n).map(|i| (i as f64 * 0.43).sin() * 4.0).collect();
        let b: Vec<f64> = (0..n).map(|i| ((i * 7 + 1) % 13) as f64).collect();
        let y: Vec<f64> = a.iter().zip(&b).map(|(x, z)| 3.0 * x + 0.1 * z).collect();
        let m = FeatureMatrix::new(
            vec![("a".to_string(), a), ("b".to_string(), b)],
            10,
        )
        .unwrap();
        (m, TargetSeries::new("y", y).unwrap())
    }

    fn calculator() -> WeightCalculator {
        WeightCalculator::new(WeightingSettings::default())
    }

    #[test]
    fn every_method_returns_normalized_weights() {
        let (features, target) = dataset();
        let outcome = calculator()
            .calculate(
                &features,
                &target,
                &[
                    WeightMethod::Correlation,
                    WeightMethod::Importance,
                    WeightMethod::Regression,
                    WeightMethod::Composite,
                ],
                &CalculationContext::default(),
            )
            .unwrap();
        assert!(outcome.per_method.len() >= 4);
        for (method, vector) in &outcome.per_method {
            assert!(vector.is_normalized(), "{method} not normalized");
            assert!(vector.iter().all(|(_, v)| v >= 0.0));
        }
    }

    #[test]
    fn correlation_weights_favor_the_driver() {
        let (features, target) = dataset();
        let outcome = calculator()
            .calculate(
                &features,
                &target,
                &[WeightMethod::Correlation],
                &CalculationContext::default(),
            )
            .unwrap();
        let w = &outcome.per_method[&WeightMethod::Correlation];
        assert!(w.get("a").unwrap() > w.get("b").unwrap());
    }

    #[test]
    fn collinear_design_fails_regression_with_instability() {
        let n = 40;
        let a: Vec<f64> = (0..n).map(|i| i as f64 + (i as f64 * 0.3).sin()).collect();
        let b: Vec<f64> = a.iter().map(|v| 2.0 * v).collect();
        let y = a.clone();
        let features = FeatureMatrix::new(
            vec![("a".to_string(), a), ("b".to_string(), b)],
            10,
        )
        .unwrap();
        let target = TargetSeries::new("y", y).unwrap();

        let outcome = calculator()
            .calculate(
                &features,
                &target,
                &[WeightMethod::Correlation, WeightMethod::Regression],
                &CalculationContext::default(),
            )
            .unwrap();

        // Correlation still works and assigns both features real weight.
        let corr = &outcome.per_method[&WeightMethod::Correlation];
        assert!(corr.get("a").unwrap() > 0.2);
        assert!(corr.get("b").unwrap() > 0.2);

        // Regression must be skipped with a numeric-instability reason.
        assert!(!outcome.per_method.contains_key(&WeightMethod::Regression));
        assert!(outcome
            .skipped
            .iter()
            .any(|s| s.method == WeightMethod::Regression));
    }

    #[test]
    fn time_series_on_non_temporal_data_is_skipped() {
        let (features, target) = dataset();
        let context = CalculationContext {
            time_ordered: false,
            lag_findings: vec![],
        };
        let outcome = calculator()
            .calculate(
                &features,
                &target,
                &[WeightMethod::Correlation, WeightMethod::TimeSeries],
                &context,
            )
            .unwrap();
        assert!(!outcome.per_method.contains_key(&WeightMethod::TimeSeries));
        let skip = outcome
            .skipped
            .iter()
            .find(|s| s.method == WeightMethod::TimeSeries)
            .unwrap();
        assert!(skip.reason.contains("not time-ordered"));
    }

    #[test]
    fn time_series_gives_floor_weight_without_lag_finding() {
        let (features, target) = dataset();
        let context = CalculationContext {
            time_ordered: true,
            lag_findings: vec![RelationshipFinding::Lag {
                feature: "a".to_string(),
                strength: 0.8,
                significance: 0.9,
                lag: 2,
                correlation: 0.8,
            }],
        };
        let outcome = calculator()
            .calculate(&features, &target, &[WeightMethod::TimeSeries], &context)
            .unwrap();
        let w = &outcome.per_method[&WeightMethod::TimeSeries];
        let floor = w.get("b").unwrap();
        assert!(floor > 0.0, "no-lag feature must keep a floor weight");
        assert!(w.get("a").unwrap() > floor);
    }

    #[test]
    fn combine_redistributes_missing_method_share() {
        let (features, target) = dataset();
        let calc = calculator();
        let outcome = calc
            .calculate(
                &features,
                &target,
                &[WeightMethod::Correlation],
                &CalculationContext::default(),
            )
            .unwrap();
        // Ask for a combination that references a method we never computed.
        let combined = calc
            .combine(
                &outcome.per_method,
                &[
                    (WeightMethod::Correlation, 0.5),
                    (WeightMethod::Regression, 0.5),
                ],
            )
            .unwrap();
        assert!(combined.is_normalized());
        // With regression missing, the result must equal correlation alone.
        let corr = &outcome.per_method[&WeightMethod::Correlation];
        for (name, v) in combined.iter() {
            assert!((v - corr.get(name).unwrap()).abs() < 1e-9);
        }
    }

    #[test]
    fn unknown_core_error_kind_is_preserved() {
        let n = 12;
        let a: Vec<f64> = (0..n).map(|i| i as f64).collect();
        let b: Vec<f64> = a.iter().map(|v| v * 3.0).collect();
        let features = FeatureMatrix::new(
            vec![("a".to_string(), a), ("b".to_string(), b)],
            10,
        )
        .unwrap();
        let target = TargetSeries::new("y", (0..n).map(|i| i as f64).collect()).unwrap();
        let calc = calculator();
        let err = calc
            .regression_weights(&features, &target)
            .unwrap_err();
        match err {
            CalculatorError::Core(e) => {
                assert_eq!(e.kind(), ErrorKind::NumericInstability)
            }
            other => panic!("unexpected error {other}"),
        }
    }
}
