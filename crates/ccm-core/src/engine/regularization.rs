use crate::core::alphabet::{NUM_AMINO_ACIDS, NUM_STATES};
use crate::core::models::params::{PairParams, SingleParams};
use crate::engine::config::RegularizationConfig;
use nalgebra::DMatrix;

/// Value and gradient of the L2 penalty.
#[derive(Debug, Clone, PartialEq)]
pub struct RegularizationTerm {
    pub value: f64,
    pub single_gradient: SingleParams,
    pub pair_gradient: PairParams,
}

/// L2 penalty over single fields and off-diagonal amino-acid couplings.
///
/// `value = λ_single·Σ (x_single − c)² + λ_pair·Σ_{i≠j} x_pair²`, where `c` is an
/// optional per-column center for the fields (zero when absent). Gap entries
/// and diagonal blocks are not free parameters and never contribute.
#[derive(Debug, Clone, PartialEq)]
pub struct L2Regularization {
    pub lambda_single: f64,
    pub lambda_pair: f64,
    center: Option<DMatrix<f64>>,
}

impl L2Regularization {
    pub fn new(lambda_single: f64, lambda_pair: f64) -> Self {
        Self {
            lambda_single,
            lambda_pair,
            center: None,
        }
    }

    /// Uses the `λ_pair = factor · (L − 1)` convention.
    pub fn for_alignment(ncol: usize, config: &RegularizationConfig) -> Self {
        Self::new(config.lambda_single, config.lambda_pair(ncol))
    }

    pub fn with_center(mut self, center: DMatrix<f64>) -> Self {
        self.center = Some(center);
        self
    }

    pub fn center(&self) -> Option<&DMatrix<f64>> {
        self.center.as_ref()
    }

    pub fn regularize(&self, single: &SingleParams, pair: &PairParams) -> RegularizationTerm {
        let deviation = match &self.center {
            Some(center) => single.as_matrix() - center,
            None => single.as_matrix().clone(),
        };
        let mut value = self.lambda_single * deviation.norm_squared();
        let single_gradient = SingleParams::from_matrix(deviation * (2.0 * self.lambda_single))
            .unwrap_or_else(|| SingleParams::zeros(single.ncol()));

        let ncol = pair.ncol();
        let mut pair_gradient = PairParams::zeros(ncol);
        let mut pair_sum = 0.0;
        for i in 0..ncol {
            for j in 0..ncol {
                if i == j {
                    continue;
                }
                let block = pair.block(i, j);
                let grad = pair_gradient.block_mut(i, j);
                for a in 0..NUM_AMINO_ACIDS {
                    for b in 0..NUM_AMINO_ACIDS {
                        let k = a * NUM_STATES + b;
                        pair_sum += block[k] * block[k];
                        grad[k] = 2.0 * self.lambda_pair * block[k];
                    }
                }
            }
        }
        value += self.lambda_pair * pair_sum;

        RegularizationTerm {
            value,
            single_gradient,
            pair_gradient,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::codec::test_support::random_params;

    #[test]
    fn value_is_weighted_sum_of_squares() {
        let mut single = SingleParams::zeros(2);
        single.set(0, 3, 2.0);
        let mut pair = PairParams::zeros(2);
        pair.set(0, 1, 1, 2, 3.0);
        pair.set(1, 0, 2, 1, 3.0);

        let term = L2Regularization::new(0.5, 0.25).regularize(&single, &pair);
        assert!((term.value - (0.5 * 4.0 + 0.25 * 18.0)).abs() < 1e-12);
        assert_eq!(term.single_gradient.get(0, 3), 2.0);
        assert_eq!(term.pair_gradient.get(0, 1, 1, 2), 1.5);
    }

    #[test]
    fn diagonal_and_gap_entries_are_ignored() {
        let single = SingleParams::zeros(2);
        let mut pair = PairParams::zeros(2);
        pair.set(0, 0, 1, 1, 5.0);
        pair.set(0, 1, 20, 1, 5.0);
        pair.set(0, 1, 1, 20, 5.0);

        let term = L2Regularization::new(1.0, 1.0).regularize(&single, &pair);
        assert_eq!(term.value, 0.0);
        assert!(term.pair_gradient.as_slice().iter().all(|&g| g == 0.0));
    }

    #[test]
    fn increasing_lambda_single_strictly_increases_value() {
        let (single, pair) = random_params(3, 17);
        let weak = L2Regularization::new(1.0, 0.4).regularize(&single, &pair);
        let strong = L2Regularization::new(1.5, 0.4).regularize(&single, &pair);
        assert!(strong.value > weak.value);
    }

    #[test]
    fn centered_penalty_vanishes_at_center() {
        let (single, pair) = random_params(3, 2);
        let regularization =
            L2Regularization::new(10.0, 0.0).with_center(single.as_matrix().clone());
        let term = regularization.regularize(&single, &pair);
        assert_eq!(term.value, 0.0);
        assert!(term.single_gradient.as_matrix().iter().all(|&g| g == 0.0));
    }

    #[test]
    fn gradient_matches_finite_difference() {
        let (single, pair) = random_params(2, 4);
        let regularization = L2Regularization::new(0.7, 0.3);
        let term = regularization.regularize(&single, &pair);

        let h = 1e-6;
        let mut bumped = pair.clone();
        bumped.set(0, 1, 2, 5, pair.get(0, 1, 2, 5) + h);
        let numeric = (regularization.regularize(&single, &bumped).value - term.value) / h;
        assert!((numeric - term.pair_gradient.get(0, 1, 2, 5)).abs() < 1e-4);
    }
}
