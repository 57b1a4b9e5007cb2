//! # Parameter Codec Module
//!
//! Converts between the flat parameter vector manipulated by an optimizer and
//! the typed [`SingleParams`] / [`PairParams`] tensors the objectives operate on.
//!
//! Every packed vector starts with a single-field block (`L × 20`, row-major,
//! possibly followed by padding) and ends with a pair block whose storage
//! order is described by a [`TensorLayout`]. The two codecs differ only in
//! these two choices:
//!
//! - [`FlatCodec`] - no padding, pair block row-major `(i, j, a, b)`
//! - [`PaddedCodec`] - single block padded to a 32-wide boundary, pair block
//!   stored as `(b, j, a_padded, i)` so the innermost loop streams over columns
//!
//! Vectors produced by one codec must never be fed to the other.

mod flat;
pub mod layout;
mod padded;

pub use flat::FlatCodec;
pub use layout::TensorLayout;
pub use padded::PaddedCodec;

use crate::core::alphabet::{NUM_AMINO_ACIDS, NUM_STATES};
use crate::core::models::params::{PairParams, SingleParams};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CodecError {
    #[error("Parameter vector has length {actual}, expected {expected} for {ncol} columns")]
    LengthMismatch {
        ncol: usize,
        expected: usize,
        actual: usize,
    },
    #[error("Parameters cover {actual} columns, codec expects {expected}")]
    ColumnMismatch { expected: usize, actual: usize },
}

/// Options controlling the untyped view produced by [`ParameterCodec::unpack_with`].
///
/// The single block is always returned as its `L × 20` fields (or `L × 21`
/// with `add_gap_state`); any padding after it is dropped regardless of
/// `clip`. Only the pair row axis can keep its storage width.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnpackOptions {
    /// Append a zero-filled gap column to the single fields (`L × 21`).
    pub add_gap_state: bool,
    /// Clip the pair row axis back to 21 states. When `false`, a padded codec
    /// returns its full storage width.
    pub clip: bool,
}

impl Default for UnpackOptions {
    fn default() -> Self {
        Self {
            add_gap_state: false,
            clip: true,
        }
    }
}

/// A dense row-major tensor with explicit dimensions.
#[derive(Debug, Clone, PartialEq)]
pub struct DenseTensor {
    pub dims: Vec<usize>,
    pub data: Vec<f64>,
}

impl DenseTensor {
    fn zeros(dims: Vec<usize>) -> Self {
        let len = dims.iter().product();
        Self {
            dims,
            data: vec![0.0; len],
        }
    }

    fn flat_index(&self, idx: &[usize]) -> usize {
        idx.iter()
            .zip(self.dims.iter())
            .fold(0, |acc, (&i, &d)| acc * d + i)
    }

    pub fn get(&self, idx: &[usize]) -> f64 {
        self.data[self.flat_index(idx)]
    }

    fn set(&mut self, idx: &[usize], value: f64) {
        let flat = self.flat_index(idx);
        self.data[flat] = value;
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DenseParams {
    pub single: DenseTensor,
    pub pair: DenseTensor,
}

pub trait ParameterCodec {
    fn ncol(&self) -> usize;

    /// Length of the single block including any trailing padding.
    fn single_block_len(&self) -> usize;

    /// Layout of the pair block; its dims are `[L, L, row_width, 21]`.
    fn pair_layout(&self) -> TensorLayout;

    fn nvar(&self) -> usize {
        self.single_block_len() + self.pair_layout().len()
    }

    fn check_len(&self, len: usize) -> Result<(), CodecError> {
        let expected = self.nvar();
        if len != expected {
            return Err(CodecError::LengthMismatch {
                ncol: self.ncol(),
                expected,
                actual: len,
            });
        }
        Ok(())
    }

    /// Writes `single` and `pair` into `out`, overwriting every cell.
    /// Padding cells are always left at zero.
    fn pack_into(
        &self,
        single: &SingleParams,
        pair: &PairParams,
        out: &mut [f64],
    ) -> Result<(), CodecError> {
        let ncol = self.ncol();
        for actual in [single.ncol(), pair.ncol()] {
            if actual != ncol {
                return Err(CodecError::ColumnMismatch {
                    expected: ncol,
                    actual,
                });
            }
        }
        self.check_len(out.len())?;
        out.fill(0.0);

        for i in 0..ncol {
            for a in 0..NUM_AMINO_ACIDS {
                out[i * NUM_AMINO_ACIDS + a] = single.get(i, a);
            }
        }

        let layout = self.pair_layout();
        let pair_out = &mut out[self.single_block_len()..];
        for i in 0..ncol {
            for j in 0..ncol {
                let block = pair.block(i, j);
                for a in 0..NUM_STATES {
                    for b in 0..NUM_STATES {
                        pair_out[layout.offset([i, j, a, b])] = block[a * NUM_STATES + b];
                    }
                }
            }
        }
        Ok(())
    }

    fn pack(&self, single: &SingleParams, pair: &PairParams) -> Result<Vec<f64>, CodecError> {
        let mut x = vec![0.0; self.nvar()];
        self.pack_into(single, pair, &mut x)?;
        Ok(x)
    }

    fn unpack(&self, x: &[f64]) -> Result<(SingleParams, PairParams), CodecError> {
        self.check_len(x.len())?;
        let ncol = self.ncol();

        let mut single = SingleParams::zeros(ncol);
        for i in 0..ncol {
            for a in 0..NUM_AMINO_ACIDS {
                single.set(i, a, x[i * NUM_AMINO_ACIDS + a]);
            }
        }

        let layout = self.pair_layout();
        let pair_in = &x[self.single_block_len()..];
        let mut pair = PairParams::zeros(ncol);
        for i in 0..ncol {
            for j in 0..ncol {
                let block = pair.block_mut(i, j);
                for a in 0..NUM_STATES {
                    for b in 0..NUM_STATES {
                        block[a * NUM_STATES + b] = pair_in[layout.offset([i, j, a, b])];
                    }
                }
            }
        }
        Ok((single, pair))
    }

    fn unpack_with(&self, x: &[f64], options: UnpackOptions) -> Result<DenseParams, CodecError> {
        self.check_len(x.len())?;
        let ncol = self.ncol();

        let single_states = if options.add_gap_state {
            NUM_STATES
        } else {
            NUM_AMINO_ACIDS
        };
        let mut single = DenseTensor::zeros(vec![ncol, single_states]);
        for i in 0..ncol {
            for a in 0..NUM_AMINO_ACIDS {
                single.set(&[i, a], x[i * NUM_AMINO_ACIDS + a]);
            }
        }

        let layout = self.pair_layout();
        let rows = if options.clip {
            NUM_STATES
        } else {
            layout.dims()[2]
        };
        let pair_in = &x[self.single_block_len()..];
        let mut pair = DenseTensor::zeros(vec![ncol, ncol, rows, NUM_STATES]);
        for i in 0..ncol {
            for j in 0..ncol {
                for a in 0..rows {
                    for b in 0..NUM_STATES {
                        pair.set(&[i, j, a, b], pair_in[layout.offset([i, j, a, b])]);
                    }
                }
            }
        }
        Ok(DenseParams { single, pair })
    }
}
