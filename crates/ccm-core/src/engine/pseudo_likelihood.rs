use super::centering::{DEFAULT_TAU, calculate_centering};
use super::conditional::{amino_acid_potentials, log_sum_exp};
use super::config::RegularizationConfig;
use super::error::EngineError;
use super::objective::{Evaluation, GradientBuffers, Objective, ObjectiveValue};
use super::regularization::L2Regularization;
use crate::core::alphabet::{GAP, NUM_AMINO_ACIDS, NUM_STATES, is_gap};
use crate::core::codec::{PaddedCodec, ParameterCodec};
use crate::core::io::raw::RawParams;
use crate::core::models::alignment::{Alignment, SequenceWeights};
use crate::core::models::params::{PairParams, SingleParams};
use nalgebra::DMatrix;
use tracing::{debug, info, instrument};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

const BLOCK: usize = NUM_STATES * NUM_STATES;

/// Weighted negative pseudo-log-likelihood over a padded parameter vector.
///
/// Each column's conditional distribution is a softmax over all 21 states in
/// which the gap state has potential zero and couplings to gap symbols are
/// ignored. The single fields are regularized towards a centering vector.
pub struct PseudoLikelihood<'a> {
    alignment: &'a Alignment,
    weights: &'a SequenceWeights,
    codec: PaddedCodec,
    centering: DMatrix<f64>,
    regularization: L2Regularization,
    buffers: GradientBuffers,
}

impl<'a> PseudoLikelihood<'a> {
    /// Builds the objective with fields centered on [`calculate_centering`].
    pub fn new(
        alignment: &'a Alignment,
        weights: &'a SequenceWeights,
        config: &RegularizationConfig,
    ) -> Result<Self, EngineError> {
        weights.check_matches(alignment)?;
        let center = calculate_centering(alignment, weights, DEFAULT_TAU);
        Ok(Self::with_center(alignment, weights, config, center))
    }

    fn with_center(
        alignment: &'a Alignment,
        weights: &'a SequenceWeights,
        config: &RegularizationConfig,
        center: DMatrix<f64>,
    ) -> Self {
        let ncol = alignment.ncol();
        let codec = PaddedCodec::new(ncol);
        let regularization =
            L2Regularization::for_alignment(ncol, config).with_center(center.clone());
        info!(
            nrow = alignment.nrow(),
            ncol,
            nvar = codec.nvar(),
            lambda_single = regularization.lambda_single,
            lambda_pair = regularization.lambda_pair,
            "Initialized pseudo-likelihood objective."
        );
        Self {
            alignment,
            weights,
            buffers: GradientBuffers::new(codec.nvar()),
            codec,
            centering: center,
            regularization,
        }
    }

    /// Starting point with fields at the centering vector and zero couplings.
    pub fn init_from_default(
        alignment: &'a Alignment,
        weights: &'a SequenceWeights,
        config: &RegularizationConfig,
    ) -> Result<(Vec<f64>, Self), EngineError> {
        let objective = Self::new(alignment, weights, config)?;
        let single = SingleParams::from_matrix(objective.centering().clone())
            .unwrap_or_else(|| SingleParams::zeros(alignment.ncol()));
        let x0 = objective
            .codec
            .pack(&single, &PairParams::zeros(alignment.ncol()))?;
        Ok((x0, objective))
    }

    /// Starting point taken from previously estimated parameters. The single
    /// fields of `raw` also become the regularization center.
    pub fn init_from_raw(
        alignment: &'a Alignment,
        weights: &'a SequenceWeights,
        config: &RegularizationConfig,
        raw: &RawParams,
    ) -> Result<(Vec<f64>, Self), EngineError> {
        if raw.ncol() != alignment.ncol() {
            return Err(EngineError::ColumnMismatch {
                alignment: alignment.ncol(),
                parameters: raw.ncol(),
            });
        }
        weights.check_matches(alignment)?;
        let objective =
            Self::with_center(alignment, weights, config, raw.single.as_matrix().clone());
        let x0 = objective.codec.pack(&raw.single, &raw.pair)?;
        Ok((x0, objective))
    }

    pub fn codec(&self) -> &PaddedCodec {
        &self.codec
    }

    pub fn regularization(&self) -> &L2Regularization {
        &self.regularization
    }

    pub fn centering(&self) -> &DMatrix<f64> {
        &self.centering
    }
}

impl Objective for PseudoLikelihood<'_> {
    fn ncol(&self) -> usize {
        self.alignment.ncol()
    }

    fn nvar(&self) -> usize {
        self.codec.nvar()
    }

    #[instrument(level = "debug", skip_all, name = "pseudo_likelihood_evaluate")]
    fn evaluate(&mut self, x: &[f64]) -> Result<Evaluation<'_>, EngineError> {
        let (single, pair) = self.codec.unpack(x)?;
        let terms = pseudo_likelihood_terms(self.alignment, self.weights, &single, &pair);
        let penalty = self.regularization.regularize(&single, &pair);

        self.codec.pack_into(
            &terms.single_gradient,
            &terms.pair_gradient,
            &mut self.buffers.gradient,
        )?;
        self.codec.pack_into(
            &penalty.single_gradient,
            &penalty.pair_gradient,
            &mut self.buffers.regularization,
        )?;

        debug!(
            value = terms.value,
            regularization = penalty.value,
            "Evaluated pseudo-likelihood."
        );
        Ok(Evaluation {
            value: ObjectiveValue::Exact(terms.value),
            regularization: penalty.value,
            gradient: &self.buffers.gradient,
            regularization_gradient: &self.buffers.regularization,
        })
    }

    fn finalize(&self, x: &[f64]) -> Result<RawParams, EngineError> {
        let (single, pair) = self.codec.unpack(x)?;
        Ok(RawParams { single, pair })
    }
}

/// Unregularized pseudo-likelihood value and gradient.
#[derive(Debug, Clone, PartialEq)]
pub struct PseudoLikelihoodTerms {
    pub value: f64,
    pub single_gradient: SingleParams,
    /// Partial derivative with respect to each ordered entry `w_ij(a,b)`.
    /// Gap states and diagonal blocks do not enter the value and stay zero.
    pub pair_gradient: PairParams,
}

struct ColumnTerm {
    value: f64,
    single: [f64; NUM_AMINO_ACIDS],
}

/// Evaluates `Σ_n w_n Σ_i −log P(x_ni | x_n,−i)` and its gradient.
///
/// Columns are processed independently and reduced in column order, so the
/// result does not depend on the number of worker threads.
pub fn pseudo_likelihood_terms(
    alignment: &Alignment,
    weights: &SequenceWeights,
    single: &SingleParams,
    pair: &PairParams,
) -> PseudoLikelihoodTerms {
    let ncol = alignment.ncol();
    // Row block i collects the derivatives of column i's conditional.
    let mut conditional = PairParams::zeros(ncol);
    let chunk = (ncol * BLOCK).max(1);

    #[cfg(not(feature = "parallel"))]
    let iterator = conditional.as_mut_slice().chunks_mut(chunk).enumerate();

    #[cfg(feature = "parallel")]
    let iterator = conditional.as_mut_slice().par_chunks_mut(chunk).enumerate();

    let columns: Vec<ColumnTerm> = iterator
        .map(|(col, rows)| column_term(alignment, weights, single, pair, col, rows))
        .collect();

    let value = columns.iter().map(|c| c.value).sum();
    let mut single_gradient = SingleParams::zeros(ncol);
    for (col, term) in columns.iter().enumerate() {
        for (a, &g) in term.single.iter().enumerate() {
            single_gradient.set(col, a, g);
        }
    }

    // Entry [i][j][a][b] is the derivative with respect to w_ij(a,b) alone;
    // w_ij(a,b) only enters the conditional of column i.
    let mut pair_gradient = conditional;
    pair_gradient.zero_diagonal();
    pair_gradient.zero_gap_states();

    PseudoLikelihoodTerms {
        value,
        single_gradient,
        pair_gradient,
    }
}

fn column_term(
    alignment: &Alignment,
    weights: &SequenceWeights,
    single: &SingleParams,
    pair: &PairParams,
    col: usize,
    pair_rows: &mut [f64],
) -> ColumnTerm {
    let mut term = ColumnTerm {
        value: 0.0,
        single: [0.0; NUM_AMINO_ACIDS],
    };
    let mut potentials = [0.0; NUM_STATES];
    let mut residual = [0.0; NUM_STATES];

    for (n, sequence) in alignment.rows().enumerate() {
        let weight = weights.get(n);
        if weight == 0.0 {
            continue;
        }
        amino_acid_potentials(single, pair, sequence, col, &mut potentials);
        potentials[GAP as usize] = 0.0;

        let normalizer = log_sum_exp(&potentials);
        let observed = sequence[col] as usize;
        term.value += weight * (normalizer - potentials[observed]);

        for (r, &p) in residual.iter_mut().zip(&potentials) {
            *r = weight * (p - normalizer).exp();
        }
        residual[observed] -= weight;

        for (g, &r) in term.single.iter_mut().zip(&residual) {
            *g += r;
        }
        for (j, &xj) in sequence.iter().enumerate() {
            if j == col || is_gap(xj) {
                continue;
            }
            let block = &mut pair_rows[j * BLOCK..(j + 1) * BLOCK];
            let b = xj as usize;
            for a in 0..NUM_AMINO_ACIDS {
                block[a * NUM_STATES + b] += residual[a];
            }
        }
    }
    term
}
