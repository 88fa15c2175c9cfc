//! Gradient-based local search: finite-difference ascent with an adaptive
//! step size, projected back onto the feasible region after every move.
//! Fully deterministic.

use crate::context::{AlgorithmOutcome, RunState, SearchContext};

const FD_STEP: f64 = 1e-5;
const INITIAL_STEP: f64 = 0.1;
const MIN_STEP: f64 = 1e-10;

pub(crate) fn run(
    ctx: &SearchContext<'_>,
    initial: &[f64],
    record_history: bool,
) -> AlgorithmOutcome {
    let mut current = initial.to_vec();
    ctx.project(&mut current);
    let mut current_score = ctx.evaluate(&current);

    let mut state = RunState::new(current.clone(), current_score, record_history);
    let mut step = INITIAL_STEP;

    loop {
        if let Some(reason) = state.stop_reason(ctx) {
            return state.finish(reason);
        }

        // Central-difference gradient of the objective.
        let mut gradient = vec![0.0; ctx.dim()];
        for i in 0..ctx.dim() {
            let mut forward = current.clone();
            let mut backward = current.clone();
            forward[i] += FD_STEP;
            backward[i] -= FD_STEP;
            gradient[i] = (ctx.evaluate(&forward) - ctx.evaluate(&backward)) / (2.0 * FD_STEP);
        }
        let norm = gradient.iter().map(|g| g * g).sum::<f64>().sqrt();

        if norm <= f64::EPSILON || !norm.is_finite() {
            // Flat (or broken) landscape; nothing left to climb.
            state.observe(&current, current_score, ctx.settings.tolerance);
            continue;
        }

        let mut candidate: Vec<f64> = current
            .iter()
            .zip(&gradient)
            .map(|(c, g)| c + step * g / norm)
            .collect();
        ctx.project(&mut candidate);
        let candidate_score = ctx.evaluate(&candidate);

        if candidate_score > current_score {
            current = candidate.clone();
            current_score = candidate_score;
            step = (step * 1.2).min(1.0);
        } else {
            step *= 0.5;
            if step < MIN_STEP {
                step = MIN_STEP;
            }
        }
        state.observe(&candidate, candidate_score, ctx.settings.tolerance);
    }
}
