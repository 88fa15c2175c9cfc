//! Genetic search over the feasible simplex: tournament selection, blend
//! crossover, Gaussian mutation, elitism. All randomness flows from the
//! caller's seed.

use crate::context::{gaussian, AlgorithmOutcome, RunState, SearchContext};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

const ELITE: usize = 2;
const TOURNAMENT: usize = 3;
const CROSSOVER_RATE: f64 = 0.8;
const MUTATION_RATE: f64 = 0.2;
const MUTATION_SIGMA: f64 = 0.08;

pub(crate) fn run(
    ctx: &SearchContext<'_>,
    initial: &[f64],
    seed: u64,
    record_history: bool,
) -> AlgorithmOutcome {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let pop_size = ctx.settings.population.max(ELITE + 2);

    // Seed the population with the caller's starting point plus random
    // simplex samples.
    let mut population: Vec<Vec<f64>> = Vec::with_capacity(pop_size);
    let mut start = initial.to_vec();
    ctx.project(&mut start);
    population.push(start.clone());
    while population.len() < pop_size {
        population.push(ctx.random_candidate(&mut rng));
    }

    let mut scores: Vec<f64> = population.iter().map(|p| ctx.evaluate(p)).collect();
    let best_idx = argmax(&scores);
    let mut state = RunState::new(
        population[best_idx].clone(),
        scores[best_idx],
        record_history,
    );

    loop {
        if let Some(reason) = state.stop_reason(ctx) {
            return state.finish(reason);
        }

        // Rank by fitness, stable on index so ties keep insertion order.
        let mut order: Vec<usize> = (0..population.len()).collect();
        order.sort_by(|&a, &b| scores[b].total_cmp(&scores[a]).then(a.cmp(&b)));

        let mut next: Vec<Vec<f64>> = order
            .iter()
            .take(ELITE)
            .map(|&i| population[i].clone())
            .collect();

        while next.len() < pop_size {
            let a = tournament(&mut rng, &scores, TOURNAMENT);
            let b = tournament(&mut rng, &scores, TOURNAMENT);
            let mut child = if rng.r#gen::<f64>() < CROSSOVER_RATE {
                let blend: f64 = rng.r#gen();
                population[a]
                    .iter()
                    .zip(&population[b])
                    .map(|(x, y)| blend * x + (1.0 - blend) * y)
                    .collect()
            } else {
                population[a].clone()
            };
            for gene in child.iter_mut() {
                if rng.r#gen::<f64>() < MUTATION_RATE {
                    *gene += gaussian(&mut rng) * MUTATION_SIGMA;
                }
            }
            ctx.project(&mut child);
            next.push(child);
        }

        population = next;
        scores = population.iter().map(|p| ctx.evaluate(p)).collect();
        let gen_best = argmax(&scores);
        state.observe(
            &population[gen_best],
            scores[gen_best],
            ctx.settings.tolerance,
        );
    }
}

fn tournament<R: Rng>(rng: &mut R, scores: &[f64], size: usize) -> usize {
    let mut winner = rng.gen_range(0..scores.len());
    for _ in 1..size {
        let challenger = rng.gen_range(0..scores.len());
        if scores[challenger] > scores[winner] {
            winner = challenger;
        }
    }
    winner
}

fn argmax(scores: &[f64]) -> usize {
    let mut best = 0;
    for (i, s) in scores.iter().enumerate() {
        if *s > scores[best] {
            best = i;
        }
    }
    best
}
