use crate::core::alphabet::{NUM_AMINO_ACIDS, NUM_STATES, is_gap};
use crate::core::models::params::{PairParams, SingleParams};

/// Fills `out[a]`, `a < 20`, with the conditional potential of amino acid `a`
/// at column `col` given every other non-gap symbol of `sequence`:
/// `v_col(a) + Σ_{j≠col, x_j≠gap} w_{col,j}(a, x_j)`.
#[inline]
pub(crate) fn amino_acid_potentials(
    single: &SingleParams,
    pair: &PairParams,
    sequence: &[u8],
    col: usize,
    out: &mut [f64],
) {
    for (a, slot) in out.iter_mut().enumerate().take(NUM_AMINO_ACIDS) {
        *slot = single.get(col, a);
    }
    for (j, &xj) in sequence.iter().enumerate() {
        if j == col || is_gap(xj) {
            continue;
        }
        let block = pair.block(col, j);
        let b = xj as usize;
        for (a, slot) in out.iter_mut().enumerate().take(NUM_AMINO_ACIDS) {
            *slot += block[a * NUM_STATES + b];
        }
    }
}

#[inline]
pub(crate) fn log_sum_exp(values: &[f64]) -> f64 {
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if !max.is_finite() {
        return max;
    }
    max + values.iter().map(|v| (v - max).exp()).sum::<f64>().ln()
}
