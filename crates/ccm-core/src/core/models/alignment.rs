use crate::core::alphabet::{self, GAP};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum AlignmentError {
    #[error("Alignment must contain at least one sequence and one column")]
    Empty,
    #[error("Sequence {row} has {actual} columns, expected {expected}")]
    RaggedRow {
        row: usize,
        expected: usize,
        actual: usize,
    },
    #[error("Expected {expected} symbols, got {actual}")]
    Shape { expected: usize, actual: usize },
    #[error("Invalid symbol {value} at sequence {row}, column {col} (must be 0..=20)")]
    InvalidSymbol { row: usize, col: usize, value: u8 },
    #[error("Sequence weight {index} is invalid: {value}")]
    InvalidWeight { index: usize, value: f64 },
    #[error("Expected {expected} sequence weights, got {actual}")]
    WeightCount { expected: usize, actual: usize },
}

/// A gap-trimmed multiple-sequence alignment encoded as symbol indices.
///
/// Rows are sequences and columns are alignment positions. Every cell holds a
/// value in `0..=20`, with [`GAP`] marking the gap state. Storage is row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alignment {
    nrow: usize,
    ncol: usize,
    symbols: Vec<u8>,
}

impl Alignment {
    pub fn new(nrow: usize, ncol: usize, symbols: Vec<u8>) -> Result<Self, AlignmentError> {
        if nrow == 0 || ncol == 0 {
            return Err(AlignmentError::Empty);
        }
        if symbols.len() != nrow * ncol {
            return Err(AlignmentError::Shape {
                expected: nrow * ncol,
                actual: symbols.len(),
            });
        }
        if let Some(pos) = symbols.iter().position(|&s| s > GAP) {
            return Err(AlignmentError::InvalidSymbol {
                row: pos / ncol,
                col: pos % ncol,
                value: symbols[pos],
            });
        }
        Ok(Self {
            nrow,
            ncol,
            symbols,
        })
    }

    pub fn from_rows(rows: &[Vec<u8>]) -> Result<Self, AlignmentError> {
        let ncol = rows.first().map(Vec::len).ok_or(AlignmentError::Empty)?;
        let mut symbols = Vec::with_capacity(rows.len() * ncol);
        for (row, sequence) in rows.iter().enumerate() {
            if sequence.len() != ncol {
                return Err(AlignmentError::RaggedRow {
                    row,
                    expected: ncol,
                    actual: sequence.len(),
                });
            }
            symbols.extend_from_slice(sequence);
        }
        Self::new(rows.len(), ncol, symbols)
    }

    /// Encodes one-letter sequences through the amino-acid alphabet.
    pub fn from_sequences<S: AsRef<str>>(sequences: &[S]) -> Result<Self, AlignmentError> {
        let rows: Vec<Vec<u8>> = sequences
            .iter()
            .map(|s| s.as_ref().chars().map(alphabet::symbol_index).collect())
            .collect();
        Self::from_rows(&rows)
    }

    pub fn nrow(&self) -> usize {
        self.nrow
    }

    pub fn ncol(&self) -> usize {
        self.ncol
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> u8 {
        self.symbols[row * self.ncol + col]
    }

    #[inline]
    pub fn row(&self, row: usize) -> &[u8] {
        &self.symbols[row * self.ncol..(row + 1) * self.ncol]
    }

    pub fn rows(&self) -> impl Iterator<Item = &[u8]> {
        self.symbols.chunks_exact(self.ncol)
    }

    /// Builds a new alignment from the given rows, in the given order.
    pub fn select_rows(&self, indices: &[usize]) -> Self {
        let mut symbols = Vec::with_capacity(indices.len() * self.ncol);
        for &index in indices {
            symbols.extend_from_slice(self.row(index));
        }
        Self {
            nrow: indices.len(),
            ncol: self.ncol,
            symbols,
        }
    }

    pub(crate) fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.symbols
    }
}

/// Per-sequence weights; their sum is the effective number of sequences.
#[derive(Debug, Clone, PartialEq)]
pub struct SequenceWeights {
    weights: Vec<f64>,
}

impl SequenceWeights {
    pub fn new(weights: Vec<f64>) -> Result<Self, AlignmentError> {
        if let Some((index, &value)) = weights
            .iter()
            .enumerate()
            .find(|(_, w)| !w.is_finite() || **w < 0.0)
        {
            return Err(AlignmentError::InvalidWeight { index, value });
        }
        Ok(Self { weights })
    }

    pub fn uniform(nrow: usize) -> Self {
        Self {
            weights: vec![1.0; nrow],
        }
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    #[inline]
    pub fn get(&self, index: usize) -> f64 {
        self.weights[index]
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.weights
    }

    /// Effective number of sequences.
    pub fn neff(&self) -> f64 {
        self.weights.iter().sum()
    }

    pub fn select(&self, indices: &[usize]) -> Self {
        Self {
            weights: indices.iter().map(|&i| self.weights[i]).collect(),
        }
    }

    pub fn check_matches(&self, alignment: &Alignment) -> Result<(), AlignmentError> {
        if self.weights.len() != alignment.nrow() {
            return Err(AlignmentError::WeightCount {
                expected: alignment.nrow(),
                actual: self.weights.len(),
            });
        }
        Ok(())
    }
}
