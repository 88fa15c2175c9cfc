//! Surrogate-model-guided search. An RBF interpolant over the evaluated
//! pool stands in for the (expensive) objective; each iteration spends one
//! true evaluation on the candidate with the best acquisition value, which
//! blends the surrogate mean with a distance-based exploration bonus.

use crate::context::{gaussian, AlgorithmOutcome, RunState, SearchContext};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

const WARMUP: usize = 10;
const CANDIDATES: usize = 48;
const BANDWIDTH: f64 = 0.25;
const EXPLORATION: f64 = 0.5;
const LOCAL_SIGMA: f64 = 0.1;

pub(crate) fn run(
    ctx: &SearchContext<'_>,
    initial: &[f64],
    seed: u64,
    record_history: bool,
) -> AlgorithmOutcome {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);

    let mut start = initial.to_vec();
    ctx.project(&mut start);
    let start_score = ctx.evaluate(&start);

    // Evaluated pool backing the surrogate.
    let mut pool: Vec<(Vec<f64>, f64)> = vec![(start.clone(), start_score)];
    for _ in 1..WARMUP {
        let candidate = ctx.random_candidate(&mut rng);
        let score = ctx.evaluate(&candidate);
        pool.push((candidate, score));
    }

    let mut best = pool[0].clone();
    for entry in &pool {
        if entry.1 > best.1 {
            best = entry.clone();
        }
    }
    let mut state = RunState::new(best.0.clone(), best.1, record_history);

    loop {
        if let Some(reason) = state.stop_reason(ctx) {
            return state.finish(reason);
        }

        // Candidate set: global simplex samples plus local perturbations of
        // the incumbent.
        let mut candidates: Vec<Vec<f64>> = Vec::with_capacity(CANDIDATES);
        for i in 0..CANDIDATES {
            let candidate = if i % 2 == 0 {
                ctx.random_candidate(&mut rng)
            } else {
                let mut local = state.best.clone();
                for v in local.iter_mut() {
                    *v += gaussian(&mut rng) * LOCAL_SIGMA;
                }
                ctx.project(&mut local);
                local
            };
            candidates.push(candidate);
        }

        let mut chosen = candidates[0].clone();
        let mut chosen_acq = f64::NEG_INFINITY;
        for candidate in candidates {
            let acq = acquisition(&pool, &candidate);
            if acq > chosen_acq {
                chosen_acq = acq;
                chosen = candidate;
            }
        }

        let score = ctx.evaluate(&chosen);
        pool.push((chosen.clone(), score));
        state.observe(&chosen, score, ctx.settings.tolerance);
    }
}

/// Surrogate mean plus exploration bonus. The mean is an RBF-weighted
/// average of the pool scores; the bonus grows with distance from the
/// nearest evaluated point.
fn acquisition(pool: &[(Vec<f64>, f64)], candidate: &[f64]) -> f64 {
    let mut weight_sum = 0.0;
    let mut weighted_score = 0.0;
    let mut nearest = f64::INFINITY;

    for (point, score) in pool {
        if !score.is_finite() {
            continue;
        }
        let d2: f64 = point
            .iter()
            .zip(candidate)
            .map(|(a, b)| (a - b) * (a - b))
            .sum();
        let w = (-d2 / (2.0 * BANDWIDTH * BANDWIDTH)).exp();
        weight_sum += w;
        weighted_score += w * score;
        nearest = nearest.min(d2.sqrt());
    }

    if weight_sum <= 1e-12 || !nearest.is_finite() {
        return f64::NEG_INFINITY;
    }
    weighted_score / weight_sum + EXPLORATION * nearest
}
