use super::centering::{DEFAULT_TAU, calculate_centering};
use super::config::EstimationConfig;
use super::error::EngineError;
use super::gibbs::GibbsSampler;
use super::objective::{Evaluation, GradientBuffers, Objective, ObjectiveValue};
use super::regularization::L2Regularization;
use crate::core::alphabet::{GAP, NUM_AMINO_ACIDS};
use crate::core::codec::{FlatCodec, ParameterCodec};
use crate::core::io::raw::RawParams;
use crate::core::models::alignment::{Alignment, SequenceWeights};
use crate::core::models::params::{PairParams, SingleParams};
use crate::core::statistics::pseudocounts::{
    Frequencies, PseudocountConfig, amino_acid_mass, degap_pair, degap_single,
};
use nalgebra::DMatrix;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::index;
use tracing::{debug, info, instrument, warn};

/// Absolute tolerance on per-column amino-acid counts when comparing sampled
/// and alignment statistics.
pub const COUNT_TOLERANCE: f64 = 1e-5;

/// Weighted amino-acid counts of the alignment, with gap entries removed.
#[derive(Debug, Clone, PartialEq)]
pub struct ObservedCounts {
    /// `L × 21`; the gap column is zero.
    pub single: DMatrix<f64>,
    /// Gap rows and columns of every block are zero.
    pub pair: PairParams,
    /// Amino-acid count per column.
    pub column_mass: Vec<f64>,
    /// Amino-acid pair count per column pair, row-major `L × L`.
    pub pair_mass: Vec<f64>,
}

impl ObservedCounts {
    pub fn from_frequencies(freqs: &Frequencies) -> Self {
        let ncol = freqs.single.nrows();
        let mut single = &freqs.single * freqs.neff;
        single.column_mut(GAP as usize).fill(0.0);
        let mut pair = freqs.pair.clone();
        pair.scale(freqs.neff);
        pair.zero_gap_states();

        let column_mass = (0..ncol)
            .map(|i| (0..NUM_AMINO_ACIDS).map(|a| single[(i, a)]).sum())
            .collect();
        let mut pair_mass = Vec::with_capacity(ncol * ncol);
        for i in 0..ncol {
            for j in 0..ncol {
                pair_mass.push(amino_acid_mass(pair.block(i, j)));
            }
        }
        Self {
            single,
            pair,
            column_mass,
            pair_mass,
        }
    }

    /// Degaps sampled frequencies and rescales them to this alignment's
    /// per-column and per-pair amino-acid counts.
    pub fn rescale(&self, sampled: &Frequencies) -> (DMatrix<f64>, PairParams) {
        let ncol = self.single.nrows();
        let mut single = degap_single(&sampled.single);
        for i in 0..ncol {
            for a in 0..NUM_AMINO_ACIDS {
                single[(i, a)] *= self.column_mass[i];
            }
        }
        let mut pair = degap_pair(&sampled.pair);
        for i in 0..ncol {
            for j in 0..ncol {
                let mass = self.pair_mass[i * ncol + j];
                pair.block_mut(i, j).iter_mut().for_each(|v| *v *= mass);
            }
        }
        (single, pair)
    }
}

/// Gradient `sampled − observed` over amino-acid states. Gap entries and
/// diagonal blocks are zero.
pub fn count_discrepancy(
    sampled_single: &DMatrix<f64>,
    sampled_pair: &PairParams,
    observed: &ObservedCounts,
) -> (SingleParams, PairParams) {
    let ncol = observed.single.nrows();
    let mut single = SingleParams::zeros(ncol);
    for i in 0..ncol {
        for a in 0..NUM_AMINO_ACIDS {
            single.set(i, a, sampled_single[(i, a)] - observed.single[(i, a)]);
        }
    }
    let mut pair = sampled_pair.clone();
    pair.as_mut_slice()
        .iter_mut()
        .zip(observed.pair.as_slice())
        .for_each(|(g, &target)| *g -= target);
    pair.zero_diagonal();
    pair.zero_gap_states();
    (single, pair)
}

/// Returns the columns whose sampled amino-acid count differs from the
/// observed one by more than `tolerance`, logging a warning for each.
pub fn check_count_scaling(
    sampled_single: &DMatrix<f64>,
    observed: &ObservedCounts,
    tolerance: f64,
) -> Vec<usize> {
    let mut mismatched = Vec::new();
    for (i, &expected) in observed.column_mass.iter().enumerate() {
        let actual: f64 = (0..NUM_AMINO_ACIDS).map(|a| sampled_single[(i, a)]).sum();
        if (actual - expected).abs() > tolerance {
            warn!(
                column = i,
                sampled = actual,
                observed = expected,
                "Sampled amino-acid counts do not match alignment counts."
            );
            mismatched.push(i);
        }
    }
    mismatched
}

/// Contrastive-divergence objective over a flat parameter vector.
///
/// Each evaluation draws a subsample of the alignment, runs Gibbs sweeps
/// under the current parameters and compares the resulting statistics with
/// the alignment's. Only a gradient is produced.
pub struct ContrastiveDivergence<'a> {
    alignment: &'a Alignment,
    weights: &'a SequenceWeights,
    codec: FlatCodec,
    centering: DMatrix<f64>,
    regularization: L2Regularization,
    pseudocounts: PseudocountConfig,
    observed: ObservedCounts,
    gibbs_steps: usize,
    sample_rows: usize,
    rng: StdRng,
    buffers: GradientBuffers,
}

impl<'a> ContrastiveDivergence<'a> {
    pub fn new(
        alignment: &'a Alignment,
        weights: &'a SequenceWeights,
        config: &EstimationConfig,
    ) -> Result<Self, EngineError> {
        weights.check_matches(alignment)?;
        let center = calculate_centering(alignment, weights, DEFAULT_TAU);
        Ok(Self::with_center(alignment, weights, config, center))
    }

    fn with_center(
        alignment: &'a Alignment,
        weights: &'a SequenceWeights,
        config: &EstimationConfig,
        center: DMatrix<f64>,
    ) -> Self {
        let ncol = alignment.ncol();
        let codec = FlatCodec::new(ncol);
        let regularization = L2Regularization::for_alignment(ncol, &config.regularization)
            .with_center(center.clone());
        let freqs = Frequencies::compute(alignment, weights, &config.pseudocounts, false);
        let observed = ObservedCounts::from_frequencies(&freqs);

        let cd = &config.contrastive_divergence;
        let gibbs_steps = cd.gibbs_steps.max(1);
        let sample_rows = cd
            .sample_size
            .resolve(alignment.nrow(), ncol, weights.neff());
        let rng = cd
            .seed
            .map_or_else(StdRng::from_entropy, StdRng::seed_from_u64);

        info!(
            nrow = alignment.nrow(),
            ncol,
            nvar = codec.nvar(),
            sample_rows,
            gibbs_steps,
            "Initialized contrastive divergence objective."
        );
        Self {
            alignment,
            weights,
            buffers: GradientBuffers::new(codec.nvar()),
            codec,
            centering: center,
            regularization,
            pseudocounts: config.pseudocounts,
            observed,
            gibbs_steps,
            sample_rows,
            rng,
        }
    }

    /// Starting point with fields at the centering vector and zero couplings.
    pub fn init_from_default(
        alignment: &'a Alignment,
        weights: &'a SequenceWeights,
        config: &EstimationConfig,
    ) -> Result<(Vec<f64>, Self), EngineError> {
        let objective = Self::new(alignment, weights, config)?;
        let single = SingleParams::from_matrix(objective.centering.clone())
            .unwrap_or_else(|| SingleParams::zeros(alignment.ncol()));
        let x0 = objective
            .codec
            .pack(&single, &PairParams::zeros(alignment.ncol()))?;
        Ok((x0, objective))
    }

    /// Starting point taken from previously estimated parameters, which also
    /// provide the regularization center for the fields.
    pub fn init_from_raw(
        alignment: &'a Alignment,
        weights: &'a SequenceWeights,
        config: &EstimationConfig,
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

    pub fn codec(&self) -> &FlatCodec {
        &self.codec
    }

    pub fn centering(&self) -> &DMatrix<f64> {
        &self.centering
    }

    pub fn observed(&self) -> &ObservedCounts {
        &self.observed
    }

    /// Number of sequences drawn per evaluation.
    pub fn sample_rows(&self) -> usize {
        self.sample_rows
    }

    pub fn gibbs_steps(&self) -> usize {
        self.gibbs_steps
    }
}

impl Objective for ContrastiveDivergence<'_> {
    fn ncol(&self) -> usize {
        self.alignment.ncol()
    }

    fn nvar(&self) -> usize {
        self.codec.nvar()
    }

    #[instrument(level = "debug", skip_all, name = "contrastive_divergence_evaluate")]
    fn evaluate(&mut self, x: &[f64]) -> Result<Evaluation<'_>, EngineError> {
        let (single, pair) = self.codec.unpack(x)?;

        let rows =
            index::sample(&mut self.rng, self.alignment.nrow(), self.sample_rows).into_vec();
        let seed = self.alignment.select_rows(&rows);
        let seed_weights = self.weights.select(&rows);

        let sampler = GibbsSampler::new(&single, &pair)?;
        let sampled = sampler.sample(&seed, self.gibbs_steps, &mut self.rng)?;
        let freqs = Frequencies::compute(&sampled, &seed_weights, &self.pseudocounts, false);
        let (sampled_single, sampled_pair) = self.observed.rescale(&freqs);
        check_count_scaling(&sampled_single, &self.observed, COUNT_TOLERANCE);

        let (single_gradient, pair_gradient) =
            count_discrepancy(&sampled_single, &sampled_pair, &self.observed);
        let penalty = self.regularization.regularize(&single, &pair);

        self.codec
            .pack_into(&single_gradient, &pair_gradient, &mut self.buffers.gradient)?;
        self.codec.pack_into(
            &penalty.single_gradient,
            &penalty.pair_gradient,
            &mut self.buffers.regularization,
        )?;

        debug!(
            sampled = rows.len(),
            regularization = penalty.value,
            "Evaluated contrastive divergence gradient."
        );
        Ok(Evaluation {
            value: ObjectiveValue::GradientOnly,
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::alphabet::NUM_STATES;
    use crate::core::codec::test_support::random_params;
    use crate::core::statistics::counts::{pair_counts, single_counts};
    use crate::engine::config::{EstimationConfigBuilder, ObjectiveKind, SampleSize};
    use crate::engine::objective::GRADIENT_ONLY_SENTINEL;
    use std::fs::File;
    use tracing_subscriber::{fmt, prelude::*};

    fn seeded_config(sample_size: SampleSize) -> EstimationConfig {
        EstimationConfigBuilder::new()
            .objective(ObjectiveKind::ContrastiveDivergence)
            .sample_size(sample_size)
            .seed(17)
            .build()
            .unwrap()
    }

    fn gapped() -> (Alignment, SequenceWeights) {
        let alignment =
            Alignment::from_sequences(&["ARND", "A-NE", "RR-D", "CRN-", "-KNA", "ARNA"]).unwrap();
        let weights = SequenceWeights::new(vec![1.0, 0.4, 0.8, 1.5, 0.6, 1.0]).unwrap();
        (alignment, weights)
    }

    #[test]
    fn discrepancy_vanishes_for_matching_counts() {
        let (alignment, weights) = gapped();
        let freqs =
            Frequencies::compute(&alignment, &weights, &PseudocountConfig::default(), false);
        let observed = ObservedCounts::from_frequencies(&freqs);
        let (single, pair) = count_discrepancy(&observed.single, &observed.pair, &observed);
        assert!(single.as_matrix().iter().all(|&g| g == 0.0));
        assert!(pair.as_slice().iter().all(|&g| g == 0.0));
    }

    #[test]
    fn discrepancy_drops_gap_and_diagonal_mass_of_samples() {
        let (alignment, weights) = gapped();
        let freqs =
            Frequencies::compute(&alignment, &weights, &PseudocountConfig::default(), false);
        let observed = ObservedCounts::from_frequencies(&freqs);
        let sampled_pair = pair_counts(&alignment, &weights);
        assert!(sampled_pair.get(0, 0, 0, 0) > 0.0);
        assert!(sampled_pair.get(0, 1, GAP as usize, 11) > 0.0);

        let (_, pair) = count_discrepancy(
            &single_counts(&alignment, &weights),
            &sampled_pair,
            &observed,
        );
        let ncol = alignment.ncol();
        for i in 0..ncol {
            for j in 0..ncol {
                for a in 0..NUM_STATES {
                    for b in 0..NUM_STATES {
                        let expected = if i == j || a == GAP as usize || b == GAP as usize {
                            0.0
                        } else {
                            sampled_pair.get(i, j, a, b) - observed.pair.get(i, j, a, b)
                        };
                        assert_eq!(pair.get(i, j, a, b), expected, "({i}, {j}, {a}, {b})");
                    }
                }
            }
        }
    }

    #[test]
    fn observed_counts_exclude_gaps() {
        let (alignment, weights) = gapped();
        let freqs =
            Frequencies::compute(&alignment, &weights, &PseudocountConfig::default(), false);
        let observed = ObservedCounts::from_frequencies(&freqs);
        assert!(observed.single.column(GAP as usize).iter().all(|&v| v == 0.0));
        for i in 0..alignment.ncol() {
            let block = observed.pair.block(i, (i + 1) % alignment.ncol());
            for k in 0..NUM_STATES {
                assert_eq!(block[GAP as usize * NUM_STATES + k], 0.0);
                assert_eq!(block[k * NUM_STATES + GAP as usize], 0.0);
            }
            assert!(observed.column_mass[i] > 0.0);
            assert!(observed.column_mass[i] < weights.neff());
        }
    }

    #[test]
    fn rescaled_samples_match_observed_column_counts() {
        let (alignment, weights) = gapped();
        let config = PseudocountConfig::default();
        let freqs = Frequencies::compute(&alignment, &weights, &config, false);
        let observed = ObservedCounts::from_frequencies(&freqs);
        let other = Alignment::from_sequences(&["CCCC", "DDDD"]).unwrap();
        let other_freqs = Frequencies::compute(&other, &SequenceWeights::uniform(2), &config, false);
        let (single, _) = observed.rescale(&other_freqs);
        assert!(check_count_scaling(&single, &observed, COUNT_TOLERANCE).is_empty());
    }

    #[test]
    fn gradient_vanishes_when_samples_reproduce_alignment() {
        let alignment = Alignment::from_sequences(&["ARN"; 6]).unwrap();
        let weights = SequenceWeights::uniform(6);
        let config = seeded_config(SampleSize::All);
        let mut objective = ContrastiveDivergence::new(&alignment, &weights, &config).unwrap();

        let mut single = SingleParams::zeros(3);
        single.set(0, 0, 40.0);
        single.set(1, 1, 40.0);
        single.set(2, 2, 40.0);
        let x = objective
            .codec()
            .pack(&single, &PairParams::zeros(3))
            .unwrap();

        let evaluation = objective.evaluate(&x).unwrap();
        assert!(
            evaluation.gradient.iter().all(|g| g.abs() < 1e-9),
            "largest entry {}",
            evaluation
                .gradient
                .iter()
                .fold(0.0f64, |m, g| m.max(g.abs()))
        );
    }

    #[test]
    fn evaluation_is_gradient_only() {
        let (alignment, weights) = gapped();
        let config = seeded_config(SampleSize::Absolute(4));
        let (x0, mut objective) =
            ContrastiveDivergence::init_from_default(&alignment, &weights, &config).unwrap();
        assert_eq!(objective.sample_rows(), 4);
        let evaluation = objective.evaluate(&x0).unwrap();
        assert_eq!(evaluation.value, ObjectiveValue::GradientOnly);
        assert_eq!(evaluation.value.as_f64(), GRADIENT_ONLY_SENTINEL);
        assert!(evaluation.regularization.abs() < 1e-12);
    }

    #[test]
    fn packed_gradient_has_zero_gap_and_diagonal_entries() {
        let (alignment, weights) = gapped();
        let config = seeded_config(SampleSize::All);
        let mut objective = ContrastiveDivergence::new(&alignment, &weights, &config).unwrap();
        let (single, pair) = random_params(4, 21);
        let codec = *objective.codec();
        let x = codec.pack(&single, &pair).unwrap();

        let gradient = objective.evaluate(&x).unwrap().gradient.to_vec();
        let (_, pair_gradient) = codec.unpack(&gradient).unwrap();
        for i in 0..4 {
            for j in 0..4 {
                for a in 0..NUM_STATES {
                    for b in 0..NUM_STATES {
                        if i == j || a == GAP as usize || b == GAP as usize {
                            assert_eq!(pair_gradient.get(i, j, a, b), 0.0);
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn seeded_objectives_are_reproducible() {
        let (alignment, weights) = gapped();
        let config = seeded_config(SampleSize::PerColumn(1.0));
        let (single, pair) = random_params(4, 30);
        let mut first = ContrastiveDivergence::new(&alignment, &weights, &config).unwrap();
        let mut second = ContrastiveDivergence::new(&alignment, &weights, &config).unwrap();
        let x = first.codec().pack(&single, &pair).unwrap();

        let a = first.evaluate(&x).unwrap().gradient.to_vec();
        let b = second.evaluate(&x).unwrap().gradient.to_vec();
        assert_eq!(a, b);
    }

    #[test]
    fn raw_start_rejects_column_mismatch() {
        let (alignment, weights) = gapped();
        let raw = RawParams::new(SingleParams::zeros(2), PairParams::zeros(2)).unwrap();
        let result = ContrastiveDivergence::init_from_raw(
            &alignment,
            &weights,
            &EstimationConfig::default(),
            &raw,
        );
        assert!(matches!(
            result,
            Err(EngineError::ColumnMismatch {
                alignment: 4,
                parameters: 2
            })
        ));
    }

    #[test]
    fn count_mismatch_is_logged_as_warning() {
        let (alignment, weights) = gapped();
        let freqs =
            Frequencies::compute(&alignment, &weights, &PseudocountConfig::default(), false);
        let observed = ObservedCounts::from_frequencies(&freqs);
        let mut drifted = observed.single.clone();
        drifted[(2, 0)] += 0.5;

        let temp_dir = tempfile::tempdir().unwrap();
        let log_path = temp_dir.path().join("cd.log");
        let file = File::create(&log_path).unwrap();
        let file_layer = fmt::layer().with_writer(file).with_ansi(false);
        let subscriber = tracing_subscriber::registry().with(file_layer);

        let mismatched = tracing::subscriber::with_default(subscriber, || {
            check_count_scaling(&drifted, &observed, COUNT_TOLERANCE)
        });
        assert_eq!(mismatched, vec![2]);

        let content = std::fs::read_to_string(log_path).unwrap();
        assert!(content.contains("WARN"));
        assert!(content.contains("Sampled amino-acid counts do not match alignment counts."));
        assert!(content.contains("column=2"));
    }
}
