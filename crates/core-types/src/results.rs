use crate::enums::{Algorithm, Severity, TerminationReason, ValidationMethod};
use crate::weights::WeightVector;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

/// The outcome of a single optimization run.
///
/// Owns exactly one weight vector: the optimized candidate. The convergence
/// metadata records which termination rule fired and what the run cost.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationResult {
    pub weights: WeightVector,
    pub score: f64,
    pub algorithm: Algorithm,
    pub iterations: usize,
    pub converged: bool,
    pub termination: TerminationReason,
    #[serde(with = "humantime_serde")]
    pub elapsed: Duration,
    /// Intermediate best scores, kept only when the caller asked for
    /// diagnostics.
    pub score_history: Option<Vec<f64>>,
}

/// The outcome of one validation method.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum MethodOutcome {
    Scored {
        /// Robustness score in [0, 1].
        score: f64,
        /// Mean raw objective over the method's evaluations. This is the
        /// baseline the drift monitor anchors on.
        mean_objective: f64,
        /// Dispersion (standard deviation) of the raw objective.
        spread: f64,
        /// 5th percentile of the raw objective over the evaluations.
        low: f64,
        /// 95th percentile of the raw objective over the evaluations.
        high: f64,
    },
    /// The method cannot run on this data. Excluded from the aggregate,
    /// never counted as a failing score.
    NotApplicable { reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub message: String,
    pub severity: Severity,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodReport {
    pub method: ValidationMethod,
    pub outcome: MethodOutcome,
    pub issues: Vec<ValidationIssue>,
}

/// The full validation report for one weight vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub methods: Vec<MethodReport>,
}

impl ValidationReport {
    /// Arithmetic mean of the applicable method scores. `None` when no
    /// method was applicable at all.
    pub fn aggregate_score(&self) -> Option<f64> {
        let scores: Vec<f64> = self
            .methods
            .iter()
            .filter_map(|m| match m.outcome {
                MethodOutcome::Scored { score, .. } => Some(score),
                MethodOutcome::NotApplicable { .. } => None,
            })
            .collect();
        if scores.is_empty() {
            None
        } else {
            Some(scores.iter().sum::<f64>() / scores.len() as f64)
        }
    }

    pub fn method(&self, method: ValidationMethod) -> Option<&MethodReport> {
        self.methods.iter().find(|m| m.method == method)
    }

    pub fn issues(&self) -> impl Iterator<Item = &ValidationIssue> {
        self.methods.iter().flat_map(|m| m.issues.iter())
    }
}

/// One observation of a deployed weight vector against live data.
///
/// Snapshots are append-only: once created they are never modified, so a
/// monitoring history is an auditable trend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitoringSnapshot {
    pub timestamp: DateTime<Utc>,
    pub weight_id: Uuid,
    pub weights: WeightVector,
    /// Live-period objective score of the deployed weights.
    pub objective_score: f64,
    /// Normalized distance from the validated baseline, in [0, 1].
    pub drift_score: f64,
    /// L1 distance to a freshly recalculated recommendation, when one was
    /// supplied with the live data.
    pub weight_drift: Option<f64>,
    pub is_anomalous: bool,
    pub explanation: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aggregate_excludes_not_applicable() {
        let report = ValidationReport {
            methods: vec![
                MethodReport {
                    method: ValidationMethod::CrossValidation,
                    outcome: MethodOutcome::Scored {
                        score: 0.8,
                        mean_objective: 0.7,
                        spread: 0.05,
                        low: 0.6,
                        high: 0.78,
                    },
                    issues: vec![],
                },
                MethodReport {
                    method: ValidationMethod::TimeSeriesSplit,
                    outcome: MethodOutcome::NotApplicable {
                        reason: "data is not time-ordered".to_string(),
                    },
                    issues: vec![],
                },
                MethodReport {
                    method: ValidationMethod::Bootstrap,
                    outcome: MethodOutcome::Scored {
                        score: 0.6,
                        mean_objective: 0.65,
                        spread: 0.1,
                        low: 0.5,
                        high: 0.8,
                    },
                    issues: vec![],
                },
            ],
        };
        let aggregate = report.aggregate_score().unwrap();
        assert!((aggregate - 0.7).abs() < 1e-12);
    }
}
