//! Parallel processing utilities for image and array operations
//!
//! Noise stages touch every pixel of a frame independently, so they are split
//! into row chunks and processed with rayon. Each chunk owns a generator seeded
//! from the base seed and its chunk index, which keeps the output a pure
//! function of the seed no matter how many worker threads run.

use ndarray::{Array2, ArrayViewMut2, Axis};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;

/// Default number of rows handed to one worker.
pub const DEFAULT_CHUNK_ROWS: usize = 64;

/// Derive the seed for one row chunk from the frame-level seed.
pub fn chunk_seed(seed: u64, chunk_idx: usize) -> u64 {
    seed.wrapping_add(chunk_idx as u64)
}

/// Process an Array2 in place, in parallel row chunks with deterministic seeding
///
/// # Arguments
/// * `array` - The 2D array to modify
/// * `seed` - Base seed for random number generation
/// * `chunk_rows` - Optional chunk size in rows. Defaults to [`DEFAULT_CHUNK_ROWS`].
/// * `processor` - Closure applied to each chunk together with that chunk's RNG
pub fn process_array_in_parallel_chunks<F>(
    array: &mut Array2<f64>,
    seed: u64,
    chunk_rows: Option<usize>,
    processor: F,
) where
    F: Fn(&mut ArrayViewMut2<f64>, &mut StdRng) + Send + Sync,
{
    let chunk_rows = chunk_rows.unwrap_or(DEFAULT_CHUNK_ROWS).max(1);

    array
        .axis_chunks_iter_mut(Axis(0), chunk_rows)
        .into_par_iter()
        .enumerate()
        .for_each(|(chunk_idx, mut chunk)| {
            let mut rng = StdRng::seed_from_u64(chunk_seed(seed, chunk_idx));
            processor(&mut chunk, &mut rng);
        });
}
