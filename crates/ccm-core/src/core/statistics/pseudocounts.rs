use super::counts::{pair_counts, single_counts};
use crate::core::alphabet::{GAP, NUM_AMINO_ACIDS, NUM_STATES};
use crate::core::models::alignment::{Alignment, SequenceWeights};
use crate::core::models::params::PairParams;
use nalgebra::DMatrix;
use serde::Deserialize;

/// Prior distribution mixed into the empirical frequencies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PseudocountKind {
    /// Uniform over the 20 amino acids.
    #[default]
    Uniform,
    /// The alignment's own global amino-acid composition.
    Background,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PseudocountConfig {
    pub kind: PseudocountKind,
    /// Pseudocount strength for single frequencies, in units of sequences.
    pub n_single: f64,
    /// Pseudocount strength for pair frequencies; falls back to `n_single`.
    pub n_pair: Option<f64>,
}

impl Default for PseudocountConfig {
    fn default() -> Self {
        Self {
            kind: PseudocountKind::Uniform,
            n_single: 1.0,
            n_pair: None,
        }
    }
}

impl PseudocountConfig {
    pub fn n_pair(&self) -> f64 {
        self.n_pair.unwrap_or(self.n_single)
    }
}

/// Pseudocount-corrected single (`L × 21`) and pair (`L × L × 21 × 21`)
/// frequencies of a weighted alignment.
#[derive(Debug, Clone, PartialEq)]
pub struct Frequencies {
    pub single: DMatrix<f64>,
    pub pair: PairParams,
    pub neff: f64,
}

impl Frequencies {
    /// Computes frequencies with pseudocounts.
    ///
    /// Raw frequencies are normalized including the gap state. With
    /// `remove_gaps`, gap mass is removed and amino-acid mass renormalized
    /// before the pseudocounts are mixed in.
    pub fn compute(
        alignment: &Alignment,
        weights: &SequenceWeights,
        config: &PseudocountConfig,
        remove_gaps: bool,
    ) -> Self {
        let neff = weights.neff();
        let mut single = single_counts(alignment, weights);
        let mut pair = pair_counts(alignment, weights);
        if neff > 0.0 {
            single /= neff;
            pair.scale(1.0 / neff);
        }
        if remove_gaps {
            single = degap_single(&single);
            pair = degap_pair(&pair);
        }

        let prior = match config.kind {
            PseudocountKind::Uniform => uniform_prior(),
            PseudocountKind::Background => background_prior(&single),
        };

        let ratio_single = config.n_single / (neff + config.n_single);
        let ratio_pair = config.n_pair() / (neff + config.n_pair());

        let mut single_pc = single.clone() * (1.0 - ratio_single);
        for i in 0..single_pc.nrows() {
            for a in 0..NUM_STATES {
                single_pc[(i, a)] += ratio_single * prior[a];
            }
        }

        let ncol = alignment.ncol();
        let keep = (1.0 - ratio_pair) * (1.0 - ratio_pair);
        let mut pair_pc = PairParams::zeros(ncol);
        for i in 0..ncol {
            for j in 0..ncol {
                let raw = pair.block(i, j);
                let out = pair_pc.block_mut(i, j);
                for a in 0..NUM_STATES {
                    for b in 0..NUM_STATES {
                        let k = a * NUM_STATES + b;
                        let connected = raw[k] - single[(i, a)] * single[(j, b)];
                        out[k] = keep * connected + single_pc[(i, a)] * single_pc[(j, b)];
                    }
                }
            }
        }

        Self {
            single: single_pc,
            pair: pair_pc,
            neff,
        }
    }
}

fn uniform_prior() -> [f64; NUM_STATES] {
    let mut prior = [1.0 / NUM_AMINO_ACIDS as f64; NUM_STATES];
    prior[GAP as usize] = 0.0;
    prior
}

fn background_prior(single: &DMatrix<f64>) -> [f64; NUM_STATES] {
    let mut prior = [0.0; NUM_STATES];
    for a in 0..NUM_AMINO_ACIDS {
        prior[a] = single.column(a).sum();
    }
    let total: f64 = prior.iter().sum();
    if total <= 0.0 {
        return uniform_prior();
    }
    prior.iter_mut().for_each(|p| *p /= total);
    prior
}

/// Renormalizes amino-acid mass per column; the gap column becomes zero.
/// Columns without amino-acid mass stay all-zero.
pub fn degap_single(freq: &DMatrix<f64>) -> DMatrix<f64> {
    let mut out = DMatrix::zeros(freq.nrows(), NUM_STATES);
    for i in 0..freq.nrows() {
        let mass: f64 = (0..NUM_AMINO_ACIDS).map(|a| freq[(i, a)]).sum();
        if mass > 0.0 {
            for a in 0..NUM_AMINO_ACIDS {
                out[(i, a)] = freq[(i, a)] / mass;
            }
        }
    }
    out
}

/// Renormalizes amino-acid pair mass per column pair; gap rows and columns
/// become zero. Column pairs without amino-acid mass stay all-zero.
pub fn degap_pair(freq: &PairParams) -> PairParams {
    let ncol = freq.ncol();
    let mut out = PairParams::zeros(ncol);
    for i in 0..ncol {
        for j in 0..ncol {
            let block = freq.block(i, j);
            let mass = amino_acid_mass(block);
            if mass > 0.0 {
                let target = out.block_mut(i, j);
                for a in 0..NUM_AMINO_ACIDS {
                    for b in 0..NUM_AMINO_ACIDS {
                        let k = a * NUM_STATES + b;
                        target[k] = block[k] / mass;
                    }
                }
            }
        }
    }
    out
}

/// Sum of the amino-acid (non-gap) entries of a `21 × 21` block.
pub fn amino_acid_mass(block: &[f64]) -> f64 {
    (0..NUM_AMINO_ACIDS)
        .map(|a| {
            block[a * NUM_STATES..a * NUM_STATES + NUM_AMINO_ACIDS]
                .iter()
                .sum::<f64>()
        })
        .sum()
}
