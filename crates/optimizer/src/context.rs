//! Shared machinery for the search algorithms: objective evaluation,
//! feasibility projection, termination bookkeeping and cancellation.

use analytics::ScoringEngine;
use configuration::OptimizationSettings;
use core_types::{
    FeatureMatrix, ObjectiveSpec, TargetSeries, TerminationReason, WeightConstraints, WeightVector,
};
use rand::Rng;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Cooperative cancellation for long-running optimization loops. Checked
/// between iterations, never mid-evaluation.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Everything an algorithm needs to search: the evaluator, the feasible
/// region, the budgets and the cancel token. Read-only and shared freely
/// across the parallel comprehensive-mode tasks.
pub(crate) struct SearchContext<'a> {
    pub names: &'a [String],
    pub settings: &'a OptimizationSettings,
    pub constraints: &'a WeightConstraints,
    pub cancel: &'a CancelToken,
    pub deadline: Instant,
    scoring: &'a ScoringEngine,
    features: &'a FeatureMatrix,
    target: &'a TargetSeries,
    objective: &'a ObjectiveSpec,
    template: WeightVector,
    lower: Vec<f64>,
    upper: Vec<f64>,
}

impl<'a> SearchContext<'a> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        names: &'a [String],
        settings: &'a OptimizationSettings,
        constraints: &'a WeightConstraints,
        cancel: &'a CancelToken,
        deadline: Instant,
        scoring: &'a ScoringEngine,
        features: &'a FeatureMatrix,
        target: &'a TargetSeries,
        objective: &'a ObjectiveSpec,
        template: WeightVector,
    ) -> Self {
        let lower = names
            .iter()
            .map(|n| constraints.bounds.get(n).map(|b| b.0).unwrap_or(0.0))
            .collect();
        let upper = names
            .iter()
            .map(|n| constraints.bounds.get(n).map(|b| b.1).unwrap_or(1.0))
            .collect();
        Self {
            names,
            settings,
            constraints,
            cancel,
            deadline,
            scoring,
            features,
            target,
            objective,
            template,
            lower,
            upper,
        }
    }

    pub fn dim(&self) -> usize {
        self.names.len()
    }

    /// Objective score of a candidate. Evaluation failures (degenerate
    /// composites, non-finite intermediates) score negative infinity so the
    /// search simply moves away from them.
    pub fn evaluate(&self, values: &[f64]) -> f64 {
        let candidate = match self.template.with_values(values) {
            Ok(c) => c,
            Err(_) => return f64::NEG_INFINITY,
        };
        match self
            .scoring
            .score(self.features, self.target, &candidate, self.objective)
        {
            Ok(score) => score,
            Err(_) => f64::NEG_INFINITY,
        }
    }

    /// Projects a candidate onto the feasible region: box bounds and, under
    /// the default contract, the probability simplex. Algorithms without
    /// native constraint handling call this after every move.
    pub fn project(&self, values: &mut [f64]) {
        if !self.constraints.normalized {
            for (v, (lo, hi)) in values.iter_mut().zip(self.lower.iter().zip(&self.upper)) {
                *v = v.clamp(*lo, *hi);
            }
            return;
        }
        // Alternating projection between the simplex and the box. A handful
        // of rounds is plenty at these dimensions.
        for _ in 0..8 {
            project_simplex(values);
            let mut clamped = false;
            for (v, (lo, hi)) in values.iter_mut().zip(self.lower.iter().zip(&self.upper)) {
                let c = v.clamp(*lo, *hi);
                if c != *v {
                    clamped = true;
                    *v = c;
                }
            }
            if !clamped {
                return;
            }
        }
        project_simplex(values);
    }

    pub fn is_feasible(&self, values: &[f64]) -> bool {
        self.constraints.is_satisfied(self.names, values)
    }

    /// A random point on the simplex (or in the box for unconstrained runs).
    pub fn random_candidate<R: Rng>(&self, rng: &mut R) -> Vec<f64> {
        let mut v: Vec<f64> = (0..self.dim())
            // Exponential draws normalized onto the simplex give a uniform
            // Dirichlet(1) sample.
            .map(|_| -(1.0 - rng.r#gen::<f64>()).ln())
            .collect();
        let sum: f64 = v.iter().sum();
        if sum > 0.0 {
            for x in v.iter_mut() {
                *x /= sum;
            }
        }
        self.project(&mut v);
        v
    }
}

/// Euclidean projection onto the probability simplex (Duchi et al.).
pub(crate) fn project_simplex(values: &mut [f64]) {
    let n = values.len();
    if n == 0 {
        return;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| b.total_cmp(a));

    let mut cumulative = 0.0;
    let mut theta = 0.0;
    for (i, &u) in sorted.iter().enumerate() {
        cumulative += u;
        let candidate = (cumulative - 1.0) / (i as f64 + 1.0);
        if u - candidate > 0.0 {
            theta = candidate;
        }
    }
    for v in values.iter_mut() {
        *v = (*v - theta).max(0.0);
    }
}

/// A standard normal draw via Box-Muller, so the stochastic algorithms need
/// nothing beyond the uniform generator.
pub(crate) fn gaussian<R: Rng>(rng: &mut R) -> f64 {
    let u1: f64 = rng.r#gen::<f64>().max(1e-12);
    let u2: f64 = rng.r#gen();
    (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
}

/// The result of one algorithm run, before packaging.
pub(crate) struct AlgorithmOutcome {
    pub values: Vec<f64>,
    pub score: f64,
    pub iterations: usize,
    pub termination: TerminationReason,
    pub history: Option<Vec<f64>>,
}

/// Best-so-far tracking plus the three termination rules every algorithm
/// shares: convergence patience, wall-clock deadline and cancellation.
pub(crate) struct RunState {
    pub best: Vec<f64>,
    pub best_score: f64,
    history: Option<Vec<f64>>,
    below_tolerance: usize,
    pub iterations: usize,
}

impl RunState {
    pub fn new(initial: Vec<f64>, initial_score: f64, record_history: bool) -> Self {
        Self {
            best: initial,
            best_score: initial_score,
            history: record_history.then(|| vec![initial_score]),
            below_tolerance: 0,
            iterations: 0,
        }
    }

    /// Records an iteration's best candidate and updates convergence
    /// bookkeeping.
    pub fn observe(&mut self, values: &[f64], score: f64, tolerance: f64) {
        self.iterations += 1;
        let improvement = score - self.best_score;
        if improvement > 0.0 {
            self.best = values.to_vec();
            self.best_score = score;
        }
        if improvement.abs() < tolerance {
            self.below_tolerance += 1;
        } else {
            self.below_tolerance = 0;
        }
        if let Some(history) = self.history.as_mut() {
            history.push(self.best_score);
        }
    }

    /// Checked at the top of every iteration; `None` means keep searching.
    pub fn stop_reason(&self, ctx: &SearchContext<'_>) -> Option<TerminationReason> {
        if ctx.cancel.is_cancelled() {
            return Some(TerminationReason::Cancelled);
        }
        if Instant::now() >= ctx.deadline {
            return Some(TerminationReason::Timeout);
        }
        if self.below_tolerance >= ctx.settings.patience {
            return Some(TerminationReason::Converged);
        }
        if self.iterations >= ctx.settings.max_iterations {
            return Some(TerminationReason::MaxIterations);
        }
        None
    }

    pub fn finish(self, termination: TerminationReason) -> AlgorithmOutcome {
        AlgorithmOutcome {
            values: self.best,
            score: self.best_score,
            iterations: self.iterations,
            termination,
            history: self.history,
        }
    }
}
