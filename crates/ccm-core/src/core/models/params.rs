use crate::core::alphabet::{NUM_AMINO_ACIDS, NUM_STATES};
use nalgebra::DMatrix;

/// Per-column field strengths over the 20 amino acids (`L × 20`).
///
/// The gap state never carries a free field. It is only materialized, as a
/// zero column, by [`SingleParams::with_gap_state`] at serialization time.
#[derive(Debug, Clone, PartialEq)]
pub struct SingleParams {
    values: DMatrix<f64>,
}

impl SingleParams {
    pub fn zeros(ncol: usize) -> Self {
        Self {
            values: DMatrix::zeros(ncol, NUM_AMINO_ACIDS),
        }
    }

    /// Wraps an `L × 20` matrix. Returns `None` for any other column count.
    pub fn from_matrix(values: DMatrix<f64>) -> Option<Self> {
        (values.ncols() == NUM_AMINO_ACIDS).then_some(Self { values })
    }

    pub fn ncol(&self) -> usize {
        self.values.nrows()
    }

    #[inline]
    pub fn get(&self, col: usize, aa: usize) -> f64 {
        self.values[(col, aa)]
    }

    #[inline]
    pub fn set(&mut self, col: usize, aa: usize, value: f64) {
        self.values[(col, aa)] = value;
    }

    #[inline]
    pub fn add(&mut self, col: usize, aa: usize, value: f64) {
        self.values[(col, aa)] += value;
    }

    pub fn as_matrix(&self) -> &DMatrix<f64> {
        &self.values
    }

    /// `L × 21` copy with a zero-filled gap column.
    pub fn with_gap_state(&self) -> DMatrix<f64> {
        let mut out = DMatrix::zeros(self.ncol(), NUM_STATES);
        out.columns_mut(0, NUM_AMINO_ACIDS).copy_from(&self.values);
        out
    }
}

/// Column-pair coupling strengths, `L × L × 21 × 21`, stored row-major as
/// `[i][j][a][b]`.
///
/// Entry `(i, j, a, b)` couples symbol `a` at column `i` with symbol `b` at
/// column `j`. Well-formed tensors are symmetric under
/// `(i, a, j, b) <-> (j, b, i, a)` and have zero diagonal blocks. The gap row
/// and column of each block are placeholders kept at zero.
#[derive(Debug, Clone, PartialEq)]
pub struct PairParams {
    ncol: usize,
    values: Vec<f64>,
}

const BLOCK: usize = NUM_STATES * NUM_STATES;

impl PairParams {
    pub fn zeros(ncol: usize) -> Self {
        Self {
            ncol,
            values: vec![0.0; ncol * ncol * BLOCK],
        }
    }

    pub fn from_vec(ncol: usize, values: Vec<f64>) -> Option<Self> {
        (values.len() == ncol * ncol * BLOCK).then_some(Self { ncol, values })
    }

    pub fn ncol(&self) -> usize {
        self.ncol
    }

    #[inline]
    pub fn index(&self, i: usize, j: usize, a: usize, b: usize) -> usize {
        ((i * self.ncol + j) * NUM_STATES + a) * NUM_STATES + b
    }

    #[inline]
    pub fn get(&self, i: usize, j: usize, a: usize, b: usize) -> f64 {
        self.values[self.index(i, j, a, b)]
    }

    #[inline]
    pub fn set(&mut self, i: usize, j: usize, a: usize, b: usize, value: f64) {
        let idx = self.index(i, j, a, b);
        self.values[idx] = value;
    }

    /// The `21 × 21` block coupling column `i` to column `j`.
    #[inline]
    pub fn block(&self, i: usize, j: usize) -> &[f64] {
        let start = (i * self.ncol + j) * BLOCK;
        &self.values[start..start + BLOCK]
    }

    #[inline]
    pub fn block_mut(&mut self, i: usize, j: usize) -> &mut [f64] {
        let start = (i * self.ncol + j) * BLOCK;
        &mut self.values[start..start + BLOCK]
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    pub fn as_mut_slice(&mut self) -> &mut [f64] {
        &mut self.values
    }

    pub fn scale(&mut self, factor: f64) {
        self.values.iter_mut().for_each(|v| *v *= factor);
    }

    pub fn zero_diagonal(&mut self) {
        for i in 0..self.ncol {
            self.block_mut(i, i).fill(0.0);
        }
    }

    pub fn zero_gap_states(&mut self) {
        let gap = NUM_STATES - 1;
        for block in self.values.chunks_exact_mut(BLOCK) {
            for k in 0..NUM_STATES {
                block[gap * NUM_STATES + k] = 0.0;
                block[k * NUM_STATES + gap] = 0.0;
            }
        }
    }

    /// Mirrors every `(i, j)` block with `i < j` into `(j, i)` as its transpose.
    pub fn symmetrize_from_upper(&mut self) {
        for i in 0..self.ncol {
            for j in (i + 1)..self.ncol {
                for a in 0..NUM_STATES {
                    for b in 0..NUM_STATES {
                        let value = self.get(i, j, a, b);
                        self.set(j, i, b, a, value);
                    }
                }
            }
        }
    }
}
