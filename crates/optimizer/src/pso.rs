//! Particle-swarm search with the standard constriction coefficients.
//! Positions are projected back onto the feasible region after every move.

use crate::context::{AlgorithmOutcome, RunState, SearchContext};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

const INERTIA: f64 = 0.72;
const COGNITIVE: f64 = 1.49;
const SOCIAL: f64 = 1.49;

pub(crate) fn run(
    ctx: &SearchContext<'_>,
    initial: &[f64],
    seed: u64,
    record_history: bool,
) -> AlgorithmOutcome {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let swarm_size = ctx.settings.population.max(4);
    let dim = ctx.dim();

    let mut positions: Vec<Vec<f64>> = Vec::with_capacity(swarm_size);
    let mut start = initial.to_vec();
    ctx.project(&mut start);
    positions.push(start);
    while positions.len() < swarm_size {
        positions.push(ctx.random_candidate(&mut rng));
    }
    let mut velocities: Vec<Vec<f64>> = vec![vec![0.0; dim]; swarm_size];

    let mut personal_best = positions.clone();
    let mut personal_score: Vec<f64> = positions.iter().map(|p| ctx.evaluate(p)).collect();

    let mut global_idx = 0;
    for (i, s) in personal_score.iter().enumerate() {
        if *s > personal_score[global_idx] {
            global_idx = i;
        }
    }
    let mut global_best = personal_best[global_idx].clone();
    let mut global_score = personal_score[global_idx];

    let mut state = RunState::new(global_best.clone(), global_score, record_history);

    loop {
        if let Some(reason) = state.stop_reason(ctx) {
            return state.finish(reason);
        }

        for i in 0..swarm_size {
            for d in 0..dim {
                let r1: f64 = rng.r#gen();
                let r2: f64 = rng.r#gen();
                velocities[i][d] = INERTIA * velocities[i][d]
                    + COGNITIVE * r1 * (personal_best[i][d] - positions[i][d])
                    + SOCIAL * r2 * (global_best[d] - positions[i][d]);
                positions[i][d] += velocities[i][d];
            }
            ctx.project(&mut positions[i]);

            let score = ctx.evaluate(&positions[i]);
            if score > personal_score[i] {
                personal_best[i] = positions[i].clone();
                personal_score[i] = score;
            }
            if score > global_score {
                global_best = positions[i].clone();
                global_score = score;
            }
        }

        state.observe(&global_best, global_score, ctx.settings.tolerance);
    }
}
