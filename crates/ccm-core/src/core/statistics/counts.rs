use crate::core::alphabet::NUM_STATES;
use crate::core::models::alignment::{Alignment, SequenceWeights};
use crate::core::models::params::PairParams;
use nalgebra::DMatrix;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

const BLOCK: usize = NUM_STATES * NUM_STATES;

/// Weighted symbol counts per column (`L × 21`).
pub fn single_counts(alignment: &Alignment, weights: &SequenceWeights) -> DMatrix<f64> {
    let mut counts = DMatrix::zeros(alignment.ncol(), NUM_STATES);
    for (n, row) in alignment.rows().enumerate() {
        let w = weights.get(n);
        for (i, &symbol) in row.iter().enumerate() {
            counts[(i, symbol as usize)] += w;
        }
    }
    counts
}

/// Weighted symbol-pair counts per column pair (`L × L × 21 × 21`).
///
/// Counts share the coupling tensor's storage, gap states and diagonal
/// blocks included.
pub fn pair_counts(alignment: &Alignment, weights: &SequenceWeights) -> PairParams {
    let ncol = alignment.ncol();
    let mut table = PairParams::zeros(ncol);

    let fill_row = |i: usize, row_block: &mut [f64]| {
        for (n, seq) in alignment.rows().enumerate() {
            let w = weights.get(n);
            let a = seq[i] as usize;
            for (j, &b) in seq.iter().enumerate() {
                row_block[(j * NUM_STATES + a) * NUM_STATES + b as usize] += w;
            }
        }
    };

    #[cfg(feature = "parallel")]
    table
        .as_mut_slice()
        .par_chunks_mut(ncol * BLOCK)
        .enumerate()
        .for_each(|(i, row_block)| fill_row(i, row_block));

    #[cfg(not(feature = "parallel"))]
    table
        .as_mut_slice()
        .chunks_mut(ncol * BLOCK)
        .enumerate()
        .for_each(|(i, row_block)| fill_row(i, row_block));

    table
}
