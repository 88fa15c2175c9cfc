//! Simulated annealing: Gaussian neighborhood moves with a geometric
//! cooling schedule and Metropolis acceptance.

use crate::context::{gaussian, AlgorithmOutcome, RunState, SearchContext};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

const INITIAL_TEMP: f64 = 1.0;
const COOLING: f64 = 0.97;
const MIN_TEMP: f64 = 1e-6;
const NEIGHBOR_SIGMA: f64 = 0.15;

pub(crate) fn run(
    ctx: &SearchContext<'_>,
    initial: &[f64],
    seed: u64,
    record_history: bool,
) -> AlgorithmOutcome {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);

    let mut current = initial.to_vec();
    ctx.project(&mut current);
    let mut current_score = ctx.evaluate(&current);

    let mut state = RunState::new(current.clone(), current_score, record_history);
    let mut temperature = INITIAL_TEMP;

    loop {
        if let Some(reason) = state.stop_reason(ctx) {
            return state.finish(reason);
        }

        let mut neighbor = current.clone();
        for v in neighbor.iter_mut() {
            *v += gaussian(&mut rng) * NEIGHBOR_SIGMA * temperature;
        }
        ctx.project(&mut neighbor);
        let neighbor_score = ctx.evaluate(&neighbor);

        let delta = neighbor_score - current_score;
        let accept = delta > 0.0 || {
            // Metropolis criterion; scores are already on the objective
            // scale, the temperature sets how forgiving we are.
            let p = (delta / temperature.max(MIN_TEMP)).exp();
            rng.r#gen::<f64>() < p
        };
        if accept && neighbor_score.is_finite() {
            current = neighbor.clone();
            current_score = neighbor_score;
        }

        temperature = (temperature * COOLING).max(MIN_TEMP);
        state.observe(&neighbor, neighbor_score, ctx.settings.tolerance);
    }
}
