use super::conditional::amino_acid_potentials;
use super::error::EngineError;
use super::utils::sampling::{SamplingError, sample_from_potentials};
use crate::core::alphabet::{NUM_AMINO_ACIDS, is_gap};
use crate::core::models::alignment::Alignment;
use crate::core::models::params::{PairParams, SingleParams};
use rand::prelude::*;
use rand::rngs::StdRng;
use tracing::instrument;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Gibbs sampler over the 20 amino-acid states of a Potts model.
///
/// Gap positions of the seed sequences are fixed. Every other position is
/// redrawn from its conditional distribution given the rest of the sequence.
pub struct GibbsSampler<'p> {
    single: &'p SingleParams,
    pair: &'p PairParams,
}

impl<'p> GibbsSampler<'p> {
    pub fn new(single: &'p SingleParams, pair: &'p PairParams) -> Result<Self, EngineError> {
        if single.ncol() != pair.ncol() {
            return Err(EngineError::ColumnMismatch {
                alignment: single.ncol(),
                parameters: pair.ncol(),
            });
        }
        Ok(Self { single, pair })
    }

    pub fn ncol(&self) -> usize {
        self.single.ncol()
    }

    /// Runs `steps` full sweeps (at least one) starting from `seed`.
    ///
    /// Every sequence draws from its own generator seeded from `rng`, so the
    /// output is reproducible for a seeded `rng` regardless of thread count.
    #[instrument(level = "debug", skip_all, name = "gibbs_sample", fields(nrow = seed.nrow(), steps = steps))]
    pub fn sample(
        &self,
        seed: &Alignment,
        steps: usize,
        rng: &mut impl Rng,
    ) -> Result<Alignment, EngineError> {
        let ncol = self.ncol();
        if seed.ncol() != ncol {
            return Err(EngineError::ColumnMismatch {
                alignment: seed.ncol(),
                parameters: ncol,
            });
        }
        let steps = steps.max(1);
        let mut sampled = seed.clone();
        if ncol == 0 {
            return Ok(sampled);
        }
        let seeds: Vec<u64> = (0..seed.nrow()).map(|_| rng.r#gen()).collect();

        #[cfg(not(feature = "parallel"))]
        let iterator = sampled.as_mut_slice().chunks_mut(ncol).zip(seeds.iter());

        #[cfg(feature = "parallel")]
        let iterator = sampled
            .as_mut_slice()
            .par_chunks_mut(ncol)
            .zip(seeds.par_iter());

        iterator.try_for_each(|(sequence, &sequence_seed)| {
            let mut sequence_rng = StdRng::seed_from_u64(sequence_seed);
            self.sample_sequence(sequence, steps, &mut sequence_rng)
        })?;
        Ok(sampled)
    }

    fn sample_sequence(
        &self,
        sequence: &mut [u8],
        steps: usize,
        rng: &mut StdRng,
    ) -> Result<(), SamplingError> {
        let mut order: Vec<usize> = (0..sequence.len())
            .filter(|&i| !is_gap(sequence[i]))
            .collect();
        let mut potentials = [0.0; NUM_AMINO_ACIDS];
        for _ in 0..steps {
            order.shuffle(rng);
            for &col in &order {
                amino_acid_potentials(self.single, self.pair, sequence, col, &mut potentials);
                sequence[col] = sample_from_potentials(&potentials, rng)? as u8;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::alphabet::GAP;

    fn small_model() -> (SingleParams, PairParams) {
        let mut single = SingleParams::zeros(3);
        single.set(0, 0, 1.0);
        single.set(1, 3, 0.7);
        single.set(2, 5, -0.5);
        let mut pair = PairParams::zeros(3);
        for (i, j, a, b, w) in [(0, 1, 0, 3, 0.8), (1, 2, 3, 3, -0.6), (0, 2, 2, 5, 1.2)] {
            pair.set(i, j, a, b, w);
            pair.set(j, i, b, a, w);
        }
        (single, pair)
    }

    fn energy(single: &SingleParams, pair: &PairParams, s: [usize; 3]) -> f64 {
        let mut e = 0.0;
        for i in 0..3 {
            e += single.get(i, s[i]);
            for j in (i + 1)..3 {
                e += pair.get(i, j, s[i], s[j]);
            }
        }
        e
    }

    fn exact_marginals(single: &SingleParams, pair: &PairParams) -> [[f64; NUM_AMINO_ACIDS]; 3] {
        let mut marginals = [[0.0; NUM_AMINO_ACIDS]; 3];
        let mut z = 0.0;
        for a in 0..NUM_AMINO_ACIDS {
            for b in 0..NUM_AMINO_ACIDS {
                for c in 0..NUM_AMINO_ACIDS {
                    let p = energy(single, pair, [a, b, c]).exp();
                    z += p;
                    marginals[0][a] += p;
                    marginals[1][b] += p;
                    marginals[2][c] += p;
                }
            }
        }
        for column in marginals.iter_mut() {
            column.iter_mut().for_each(|m| *m /= z);
        }
        marginals
    }

    fn empirical_marginals(alignment: &Alignment) -> [[f64; NUM_AMINO_ACIDS]; 3] {
        let mut marginals = [[0.0; NUM_AMINO_ACIDS]; 3];
        for row in alignment.rows() {
            for (i, &x) in row.iter().enumerate() {
                marginals[i][x as usize] += 1.0;
            }
        }
        let n = alignment.nrow() as f64;
        for column in marginals.iter_mut() {
            column.iter_mut().for_each(|m| *m /= n);
        }
        marginals
    }

    #[test]
    fn long_chains_reach_the_model_distribution() {
        let (single, pair) = small_model();
        let sampler = GibbsSampler::new(&single, &pair).unwrap();
        let exact = exact_marginals(&single, &pair);

        let nrow = 4000;
        let from_a = Alignment::from_rows(&vec![vec![0, 0, 0]; nrow]).unwrap();
        let from_w = Alignment::from_rows(&vec![vec![18, 18, 18]; nrow]).unwrap();
        let mut rng = StdRng::seed_from_u64(42);
        let first = empirical_marginals(&sampler.sample(&from_a, 30, &mut rng).unwrap());
        let second = empirical_marginals(&sampler.sample(&from_w, 30, &mut rng).unwrap());

        for i in 0..3 {
            for a in 0..NUM_AMINO_ACIDS {
                assert!((first[i][a] - exact[i][a]).abs() < 0.04, "column {i}, state {a}");
                assert!((second[i][a] - exact[i][a]).abs() < 0.04, "column {i}, state {a}");
                assert!((first[i][a] - second[i][a]).abs() < 0.04, "column {i}, state {a}");
            }
        }
    }

    #[test]
    fn gap_positions_are_preserved() {
        let (single, pair) = small_model();
        let sampler = GibbsSampler::new(&single, &pair).unwrap();
        let seed = Alignment::from_rows(&[vec![0, GAP, 4], vec![GAP, GAP, 1]]).unwrap();
        let mut rng = StdRng::seed_from_u64(7);
        let sampled = sampler.sample(&seed, 5, &mut rng).unwrap();

        for (before, after) in seed.rows().zip(sampled.rows()) {
            for (&b, &a) in before.iter().zip(after) {
                assert_eq!(b == GAP, a == GAP);
                assert!((a as usize) < NUM_AMINO_ACIDS || a == GAP);
            }
        }
    }

    #[test]
    fn seeded_runs_are_reproducible() {
        let (single, pair) = small_model();
        let sampler = GibbsSampler::new(&single, &pair).unwrap();
        let seed = Alignment::from_rows(&vec![vec![1, 2, 3]; 50]).unwrap();
        let first = sampler
            .sample(&seed, 3, &mut StdRng::seed_from_u64(9))
            .unwrap();
        let second = sampler
            .sample(&seed, 3, &mut StdRng::seed_from_u64(9))
            .unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn zero_steps_still_runs_one_sweep() {
        let mut single = SingleParams::zeros(2);
        single.set(0, 6, 50.0);
        single.set(1, 6, 50.0);
        let pair = PairParams::zeros(2);
        let sampler = GibbsSampler::new(&single, &pair).unwrap();
        let seed = Alignment::from_rows(&[vec![0, 0]]).unwrap();
        let sampled = sampler
            .sample(&seed, 0, &mut StdRng::seed_from_u64(3))
            .unwrap();
        assert_eq!(sampled.row(0), &[6, 6]);
    }

    #[test]
    fn column_mismatch_is_rejected() {
        let (single, pair) = small_model();
        let sampler = GibbsSampler::new(&single, &pair).unwrap();
        let seed = Alignment::from_rows(&[vec![0, 0]]).unwrap();
        assert!(matches!(
            sampler.sample(&seed, 1, &mut StdRng::seed_from_u64(0)),
            Err(EngineError::ColumnMismatch { .. })
        ));
    }
}
