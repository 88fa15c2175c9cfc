//! Constrained nonlinear search: projected gradient ascent with an Armijo
//! backtracking line search, honoring explicit box bounds alongside the sum
//! constraint. Deterministic.

use crate::context::{AlgorithmOutcome, RunState, SearchContext};

const FD_STEP: f64 = 1e-5;
const INITIAL_STEP: f64 = 0.5;
const BACKTRACK: f64 = 0.5;
const ARMIJO_C: f64 = 1e-4;
const MAX_BACKTRACKS: usize = 12;

pub(crate) fn run(
    ctx: &SearchContext<'_>,
    initial: &[f64],
    record_history: bool,
) -> AlgorithmOutcome {
    let mut current = initial.to_vec();
    ctx.project(&mut current);
    let mut current_score = ctx.evaluate(&current);

    let mut state = RunState::new(current.clone(), current_score, record_history);

    loop {
        if let Some(reason) = state.stop_reason(ctx) {
            return state.finish(reason);
        }

        let mut gradient = vec![0.0; ctx.dim()];
        for i in 0..ctx.dim() {
            let mut forward = current.clone();
            let mut backward = current.clone();
            forward[i] += FD_STEP;
            backward[i] -= FD_STEP;
            gradient[i] = (ctx.evaluate(&forward) - ctx.evaluate(&backward)) / (2.0 * FD_STEP);
        }
        let norm_sq: f64 = gradient.iter().map(|g| g * g).sum();
        if norm_sq <= f64::EPSILON || !norm_sq.is_finite() {
            state.observe(&current, current_score, ctx.settings.tolerance);
            continue;
        }

        // Backtracking line search along the projected gradient direction.
        let mut step = INITIAL_STEP;
        let mut accepted = false;
        for _ in 0..MAX_BACKTRACKS {
            let mut candidate: Vec<f64> = current
                .iter()
                .zip(&gradient)
                .map(|(c, g)| c + step * g)
                .collect();
            ctx.project(&mut candidate);
            let candidate_score = ctx.evaluate(&candidate);

            // Armijo sufficient-increase condition against the actual
            // (projected) displacement.
            let displacement: f64 = candidate
                .iter()
                .zip(&current)
                .map(|(a, b)| (a - b) * (a - b))
                .sum();
            if candidate_score >= current_score + ARMIJO_C * displacement.sqrt() {
                current = candidate.clone();
                current_score = candidate_score;
                state.observe(&candidate, candidate_score, ctx.settings.tolerance);
                accepted = true;
                break;
            }
            step *= BACKTRACK;
        }
        if !accepted {
            // No acceptable step along this direction; count the iteration
            // toward convergence patience.
            state.observe(&current, current_score, ctx.settings.tolerance);
        }
    }
}
