//! Row-index generators behind the resampling-based validation methods.
//! All of them are driven by a caller-supplied RNG so runs are reproducible.

use rand::Rng;

/// Shuffled k-fold partition. Returns the held-out index set of each fold.
pub(crate) fn k_folds<R: Rng>(rng: &mut R, n_rows: usize, folds: usize) -> Vec<Vec<usize>> {
    let mut indices: Vec<usize> = (0..n_rows).collect();
    shuffle(rng, &mut indices);

    let base = n_rows / folds;
    let remainder = n_rows % folds;
    let mut out = Vec::with_capacity(folds);
    let mut cursor = 0;
    for fold in 0..folds {
        let size = base + usize::from(fold < remainder);
        out.push(indices[cursor..cursor + size].to_vec());
        cursor += size;
    }
    out
}

/// One bootstrap resample: `n_rows` draws with replacement.
pub(crate) fn bootstrap_sample<R: Rng>(rng: &mut R, n_rows: usize) -> Vec<usize> {
    (0..n_rows).map(|_| rng.gen_range(0..n_rows)).collect()
}

/// A random subset of `size` distinct rows, in original order.
pub(crate) fn subsample<R: Rng>(rng: &mut R, n_rows: usize, size: usize) -> Vec<usize> {
    let mut indices: Vec<usize> = (0..n_rows).collect();
    shuffle(rng, &mut indices);
    let mut kept = indices[..size.min(n_rows)].to_vec();
    kept.sort_unstable();
    kept
}

/// Consecutive out-of-time test blocks for an expanding-window evaluation:
/// the first block is reserved as the minimum history, each later block is
/// scored in turn.
pub(crate) fn time_series_blocks(n_rows: usize, folds: usize) -> Vec<Vec<usize>> {
    let blocks = folds + 1;
    let base = n_rows / blocks;
    let remainder = n_rows % blocks;
    let mut boundaries = Vec::with_capacity(blocks + 1);
    let mut cursor = 0;
    boundaries.push(0);
    for block in 0..blocks {
        cursor += base + usize::from(block < remainder);
        boundaries.push(cursor);
    }
    (1..blocks)
        .map(|b| (boundaries[b]..boundaries[b + 1]).collect())
        .collect()
}

/// Fisher-Yates.
fn shuffle<R: Rng>(rng: &mut R, indices: &mut [usize]) {
    for i in (1..indices.len()).rev() {
        let j = rng.gen_range(0..=i);
        indices.swap(i, j);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn folds_partition_every_row_exactly_once() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let folds = k_folds(&mut rng, 23, 5);
        assert_eq!(folds.len(), 5);
        let mut all: Vec<usize> = folds.into_iter().flatten().collect();
        all.sort_unstable();
        assert_eq!(all, (0..23).collect::<Vec<_>>());
    }

    #[test]
    fn time_blocks_are_consecutive_and_skip_the_history_block() {
        let blocks = time_series_blocks(30, 4);
        assert_eq!(blocks.len(), 4);
        // First 6 rows are history, the rest is covered in order.
        assert_eq!(blocks[0][0], 6);
        let flat: Vec<usize> = blocks.into_iter().flatten().collect();
        assert_eq!(flat, (6..30).collect::<Vec<_>>());
    }

    #[test]
    fn subsample_is_sorted_and_distinct() {
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let s = subsample(&mut rng, 50, 20);
        assert_eq!(s.len(), 20);
        assert!(s.windows(2).all(|w| w[0] < w[1]));
    }
}
