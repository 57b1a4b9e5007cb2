use crate::core::alphabet::NUM_AMINO_ACIDS;
use crate::core::models::alignment::{Alignment, SequenceWeights};
use crate::core::statistics::counts::single_counts;
use nalgebra::DMatrix;

/// Mixing weight of the global amino-acid composition.
pub const DEFAULT_TAU: f64 = 0.1;

/// Lower bound applied to mixed fractions before taking logarithms, so that
/// amino acids absent from the whole alignment stay finite.
const MIN_FRACTION: f64 = 1e-8;

/// Per-column centering vector for the single fields (`L × 20`).
///
/// Each column's weighted amino-acid fractions are mixed with the global
/// amino-acid composition (`(1 − τ)·column + τ·global`), log-transformed and
/// shifted to zero mean. Columns without amino-acid weight fall back to the
/// global composition.
pub fn calculate_centering(
    alignment: &Alignment,
    weights: &SequenceWeights,
    tau: f64,
) -> DMatrix<f64> {
    let ncol = alignment.ncol();
    let wsum = weights.neff();
    let counts = single_counts(alignment, weights);

    let global: Vec<f64> = (0..NUM_AMINO_ACIDS)
        .map(|a| {
            if wsum > 0.0 {
                counts.column(a).sum() / (ncol as f64 * wsum)
            } else {
                0.0
            }
        })
        .collect();

    let mut center = DMatrix::zeros(ncol, NUM_AMINO_ACIDS);
    for i in 0..ncol {
        let non_gap: f64 = (0..NUM_AMINO_ACIDS).map(|a| counts[(i, a)]).sum();
        let mut log_sum = 0.0;
        for a in 0..NUM_AMINO_ACIDS {
            let fraction = if non_gap > 0.0 {
                counts[(i, a)] / non_gap
            } else {
                0.0
            };
            let mixed = ((1.0 - tau) * fraction + tau * global[a]).max(MIN_FRACTION);
            let log_fraction = mixed.ln();
            center[(i, a)] = log_fraction;
            log_sum += log_fraction;
        }
        let mean = log_sum / NUM_AMINO_ACIDS as f64;
        for a in 0..NUM_AMINO_ACIDS {
            center[(i, a)] -= mean;
        }
    }
    center
}
