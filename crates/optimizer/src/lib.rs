//! # Acumen Weight Optimizer
//!
//! Searches for the weight vector maximizing an objective over the feasible
//! region, using a caller-selected algorithm or all of them at once
//! ("comprehensive" mode).
//!
//! Every stochastic algorithm is driven by an explicit seed: the same seed
//! and inputs reproduce the same result bit for bit. Comprehensive mode runs
//! each algorithm as an independent parallel task with a derived sub-seed
//! and merges with a deterministic reduction (score descending, algorithm
//! name as tie-break), so parallel scheduling can never change the winner.

use analytics::ScoringEngine;
use configuration::OptimizationSettings;
use core_types::{
    Algorithm, AlgorithmChoice, CoreError, FeatureMatrix, ObjectiveSpec, OptimizationResult,
    TargetSeries, TerminationReason, WeightConstraints, WeightVector,
};
use rayon::prelude::*;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

mod annealing;
mod bayesian;
mod constrained;
mod context;
pub mod error;
mod genetic;
mod gradient;
mod pso;

pub use context::CancelToken;
pub use error::OptimizerError;

use context::{AlgorithmOutcome, SearchContext};

/// Stride used to derive per-algorithm sub-seeds in comprehensive mode.
const SEED_STRIDE: u64 = 0x9E37_79B9_7F4A_7C15;

/// A single optimization request.
#[derive(Debug, Clone)]
pub struct OptimizeRequest {
    /// Starting point; uniform weights when absent.
    pub initial: Option<WeightVector>,
    pub objective: ObjectiveSpec,
    pub algorithm: AlgorithmChoice,
    pub constraints: WeightConstraints,
    /// Seed for the stochastic algorithms.
    pub seed: u64,
    /// Keep the per-iteration best-score trace for diagnostics.
    pub record_history: bool,
}

impl OptimizeRequest {
    pub fn new(objective: ObjectiveSpec, algorithm: AlgorithmChoice) -> Self {
        Self {
            initial: None,
            objective,
            algorithm,
            constraints: WeightConstraints::default(),
            seed: 0,
            record_history: false,
        }
    }
}

/// An algorithm that failed during comprehensive mode. Recorded, not fatal,
/// as long as at least one algorithm succeeded.
#[derive(Debug, Clone)]
pub struct SkippedAlgorithm {
    pub algorithm: Algorithm,
    pub reason: String,
}

/// The winning result plus any skipped algorithms (comprehensive mode only).
#[derive(Debug, Clone)]
pub struct OptimizationRun {
    pub result: OptimizationResult,
    pub skipped: Vec<SkippedAlgorithm>,
}

/// The weight optimization engine.
pub struct WeightOptimizer {
    settings: OptimizationSettings,
    scoring: ScoringEngine,
}

impl WeightOptimizer {
    pub fn new(settings: OptimizationSettings) -> Self {
        Self {
            settings,
            scoring: ScoringEngine::new(),
        }
    }

    /// Runs the requested search. Cancellation is honored between
    /// iterations of every algorithm.
    pub fn optimize(
        &self,
        features: &FeatureMatrix,
        target: &TargetSeries,
        request: &OptimizeRequest,
        cancel: &CancelToken,
    ) -> Result<OptimizationRun, OptimizerError> {
        let names = features.names().to_vec();
        request.constraints.validate(&names)?;

        let template = match &request.initial {
            Some(initial) => {
                // Make sure the starting vector covers exactly this matrix.
                initial.aligned_values(&names)?;
                initial.clone()
            }
            None => WeightVector::uniform(&names)?,
        };
        let initial_values = template.aligned_values(&names)?;

        match request.algorithm {
            AlgorithmChoice::Single(algorithm) => {
                let result = self.run_algorithm(
                    features,
                    target,
                    request,
                    &names,
                    &template,
                    &initial_values,
                    algorithm,
                    request.seed,
                    cancel,
                )?;
                Ok(OptimizationRun {
                    result,
                    skipped: Vec::new(),
                })
            }
            AlgorithmChoice::Comprehensive => {
                // Independent tasks, no shared mutable state; sub-seeds are
                // derived per algorithm so thread scheduling is irrelevant.
                let runs: Vec<(Algorithm, Result<OptimizationResult, OptimizerError>)> =
                    Algorithm::ALL
                        .par_iter()
                        .enumerate()
                        .map(|(index, &algorithm)| {
                            let sub_seed = request
                                .seed
                                .wrapping_add(SEED_STRIDE.wrapping_mul(index as u64 + 1));
                            let outcome = self.run_algorithm(
                                features,
                                target,
                                request,
                                &names,
                                &template,
                                &initial_values,
                                algorithm,
                                sub_seed,
                                cancel,
                            );
                            (algorithm, outcome)
                        })
                        .collect();

                let mut results = Vec::new();
                let mut skipped = Vec::new();
                for (algorithm, outcome) in runs {
                    match outcome {
                        Ok(result) => results.push(result),
                        Err(e) => {
                            warn!(algorithm = %algorithm, error = %e, "algorithm skipped");
                            skipped.push(SkippedAlgorithm {
                                algorithm,
                                reason: e.to_string(),
                            });
                        }
                    }
                }

                if results.is_empty() {
                    return Err(OptimizerError::AllAlgorithmsFailed {
                        attempts: Algorithm::ALL.len(),
                    });
                }

                // Deterministic reduction: best score first, algorithm name
                // breaking ties.
                results.sort_by(|a, b| {
                    b.score
                        .total_cmp(&a.score)
                        .then_with(|| a.algorithm.name().cmp(b.algorithm.name()))
                });
                let winner = results.remove(0);
                debug!(algorithm = %winner.algorithm, score = winner.score, "comprehensive winner");
                Ok(OptimizationRun {
                    result: winner,
                    skipped,
                })
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn run_algorithm(
        &self,
        features: &FeatureMatrix,
        target: &TargetSeries,
        request: &OptimizeRequest,
        names: &[String],
        template: &WeightVector,
        initial: &[f64],
        algorithm: Algorithm,
        seed: u64,
        cancel: &CancelToken,
    ) -> Result<OptimizationResult, OptimizerError> {
        let started = Instant::now();
        let deadline = started + Duration::from_millis(self.settings.timeout_ms);
        let ctx = SearchContext::new(
            names,
            &self.settings,
            &request.constraints,
            cancel,
            deadline,
            &self.scoring,
            features,
            target,
            &request.objective,
            template.clone(),
        );

        let outcome: AlgorithmOutcome = match algorithm {
            Algorithm::Gradient => gradient::run(&ctx, initial, request.record_history),
            Algorithm::Genetic => genetic::run(&ctx, initial, seed, request.record_history),
            Algorithm::Annealing => annealing::run(&ctx, initial, seed, request.record_history),
            Algorithm::ParticleSwarm => pso::run(&ctx, initial, seed, request.record_history),
            Algorithm::Bayesian => bayesian::run(&ctx, initial, seed, request.record_history),
            Algorithm::Constrained => constrained::run(&ctx, initial, request.record_history),
        };

        if !outcome.score.is_finite() {
            return Err(OptimizerError::Core(CoreError::unstable(
                algorithm.name(),
                "no candidate produced a finite objective score",
            )));
        }

        let weights = template.with_values(&outcome.values)?;
        if !ctx.is_feasible(&outcome.values) {
            // Never hand back an infeasible vector as if it were valid; the
            // best candidate travels inside the error for diagnostics.
            return Err(OptimizerError::Core(CoreError::OptimizationFailed {
                algorithm: algorithm.name().to_string(),
                detail: "no feasible point found within the iteration budget".to_string(),
                best_infeasible: Some(weights),
            }));
        }

        Ok(OptimizationResult {
            weights,
            score: outcome.score,
            algorithm,
            iterations: outcome.iterations,
            converged: outcome.termination == TerminationReason::Converged,
            termination: outcome.termination,
            elapsed: started.elapsed(),
            score_history: outcome.history,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_types::Objective;

    fn dataset() -> (FeatureMatrix, TargetSeries) {
        let n = 60;
        let driver: Vec<f64> = (0..n).map(|i| (i as f64 * 0.37).sin() * 5.0).collect();
        let weak: Vec<f64> = (0..n).map(|i| ((i * 7 + 2) % 13) as f64).collect();
        let y: Vec<f64> = driver.iter().map(|v| v * 2.0 + 1.0).collect();
        let features = FeatureMatrix::new(
            vec![("driver".to_string(), driver), ("weak".to_string(), weak)],
            10,
        )
        .unwrap();
        (features, TargetSeries::new("y", y).unwrap())
    }

    fn optimizer() -> WeightOptimizer {
        let mut settings = OptimizationSettings::default();
        settings.max_iterations = 60;
        settings.population = 16;
        WeightOptimizer::new(settings)
    }

    #[test]
    fn every_algorithm_finds_the_driver_and_stays_on_the_simplex() {
        let (features, target) = dataset();
        let opt = optimizer();
        for algorithm in Algorithm::ALL {
            let request = OptimizeRequest {
                seed: 9,
                ..OptimizeRequest::new(
                    ObjectiveSpec::Single(Objective::RSquared),
                    AlgorithmChoice::Single(algorithm),
                )
            };
            let run = opt
                .optimize(&features, &target, &request, &CancelToken::new())
                .unwrap();
            assert!(
                run.result.weights.is_normalized(),
                "{algorithm} left the simplex"
            );
            assert!(
                run.result.weights.get("driver").unwrap() > 0.5,
                "{algorithm} failed to favor the driver: {:?}",
                run.result.weights
            );
            assert!(run.result.score > 0.8, "{algorithm} score {}", run.result.score);
        }
    }

    #[test]
    fn same_seed_is_bit_identical() {
        let (features, target) = dataset();
        let opt = optimizer();
        let request = OptimizeRequest {
            seed: 1234,
            ..OptimizeRequest::new(
                ObjectiveSpec::Single(Objective::RSquared),
                AlgorithmChoice::Single(Algorithm::Genetic),
            )
        };
        let a = opt
            .optimize(&features, &target, &request, &CancelToken::new())
            .unwrap();
        let b = opt
            .optimize(&features, &target, &request, &CancelToken::new())
            .unwrap();
        for ((_, x), (_, y)) in a.result.weights.iter().zip(b.result.weights.iter()) {
            assert_eq!(x.to_bits(), y.to_bits());
        }
        assert_eq!(a.result.score.to_bits(), b.result.score.to_bits());
    }

    #[test]
    fn comprehensive_mode_returns_a_deterministic_winner() {
        let (features, target) = dataset();
        let opt = optimizer();
        let request = OptimizeRequest {
            seed: 7,
            ..OptimizeRequest::new(
                ObjectiveSpec::Single(Objective::RSquared),
                AlgorithmChoice::Comprehensive,
            )
        };
        let a = opt
            .optimize(&features, &target, &request, &CancelToken::new())
            .unwrap();
        let b = opt
            .optimize(&features, &target, &request, &CancelToken::new())
            .unwrap();
        assert_eq!(a.result.algorithm, b.result.algorithm);
        assert_eq!(a.result.score.to_bits(), b.result.score.to_bits());
    }

    #[test]
    fn contradictory_bounds_fail_before_searching() {
        let (features, target) = dataset();
        let opt = optimizer();
        let mut request = OptimizeRequest::new(
            ObjectiveSpec::Single(Objective::RSquared),
            AlgorithmChoice::Single(Algorithm::Gradient),
        );
        request.constraints = WeightConstraints::default().with_bound("driver", 0.9, 0.1);
        let err = opt
            .optimize(&features, &target, &request, &CancelToken::new())
            .unwrap_err();
        match err {
            OptimizerError::Core(e) => {
                assert_eq!(e.kind(), core_types::ErrorKind::ConstraintViolation)
            }
            other => panic!("unexpected error {other}"),
        }
    }

    #[test]
    fn cancellation_terminates_with_cancelled_reason() {
        let (features, target) = dataset();
        let opt = optimizer();
        let cancel = CancelToken::new();
        cancel.cancel();
        let request = OptimizeRequest::new(
            ObjectiveSpec::Single(Objective::RSquared),
            AlgorithmChoice::Single(Algorithm::Annealing),
        );
        let run = opt.optimize(&features, &target, &request, &cancel).unwrap();
        assert_eq!(run.result.termination, TerminationReason::Cancelled);
        assert!(!run.result.converged);
    }

    #[test]
    fn box_bounds_are_respected() {
        let (features, target) = dataset();
        let opt = optimizer();
        let mut request = OptimizeRequest {
            seed: 3,
            ..OptimizeRequest::new(
                ObjectiveSpec::Single(Objective::RSquared),
                AlgorithmChoice::Single(Algorithm::Constrained),
            )
        };
        request.constraints = WeightConstraints::default().with_bound("driver", 0.0, 0.6);
        let run = opt
            .optimize(&features, &target, &request, &CancelToken::new())
            .unwrap();
        assert!(run.result.weights.get("driver").unwrap() <= 0.6 + 1e-6);
        assert!(run.result.weights.is_normalized());
    }
}
