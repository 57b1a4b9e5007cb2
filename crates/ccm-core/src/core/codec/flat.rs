use super::{ParameterCodec, TensorLayout};
use crate::core::alphabet::{NUM_AMINO_ACIDS, NUM_STATES};

/// Unpadded codec: `nvar = L·20 + L·L·21·21`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlatCodec {
    ncol: usize,
}

impl FlatCodec {
    pub fn new(ncol: usize) -> Self {
        Self { ncol }
    }
}

impl ParameterCodec for FlatCodec {
    fn ncol(&self) -> usize {
        self.ncol
    }

    fn single_block_len(&self) -> usize {
        self.ncol * NUM_AMINO_ACIDS
    }

    fn pair_layout(&self) -> TensorLayout {
        TensorLayout::row_major([self.ncol, self.ncol, NUM_STATES, NUM_STATES])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::codec::test_support::random_params;
    use crate::core::codec::{CodecError, UnpackOptions};
    use crate::core::models::params::{PairParams, SingleParams};

    #[test]
    fn nvar_depends_only_on_column_count() {
        assert_eq!(FlatCodec::new(5).nvar(), 5 * 20 + 25 * 441);
        assert_eq!(FlatCodec::new(1).nvar(), 20 + 441);
    }

    #[test]
    fn unpack_inverts_pack() {
        let (single, pair) = random_params(4, 7);
        let codec = FlatCodec::new(4);
        let x = codec.pack(&single, &pair).unwrap();
        let (single_back, pair_back) = codec.unpack(&x).unwrap();
        assert_eq!(single_back, single);
        assert_eq!(pair_back, pair);
    }

    #[test]
    fn pair_block_is_row_major_after_single_block() {
        let codec = FlatCodec::new(3);
        let single = SingleParams::zeros(3);
        let mut pair = PairParams::zeros(3);
        pair.set(1, 2, 4, 5, 9.0);
        let x = codec.pack(&single, &pair).unwrap();
        let expected = 3 * 20 + ((3 + 2) * 21 + 4) * 21 + 5;
        assert_eq!(x[expected], 9.0);
        assert_eq!(x.iter().filter(|&&v| v != 0.0).count(), 1);
    }

    #[test]
    fn pack_rejects_parameters_for_a_different_column_count() {
        let codec = FlatCodec::new(3);
        let result = codec.pack(&SingleParams::zeros(4), &PairParams::zeros(4));
        assert_eq!(
            result,
            Err(CodecError::ColumnMismatch {
                expected: 3,
                actual: 4
            })
        );
    }

    #[test]
    fn unpack_rejects_vector_of_wrong_length() {
        let codec = FlatCodec::new(2);
        let x = vec![0.0; codec.nvar() - 1];
        assert!(matches!(
            codec.unpack(&x),
            Err(CodecError::LengthMismatch { ncol: 2, .. })
        ));
    }

    #[test]
    fn unpack_with_gap_state_synthesizes_zero_gap_column() {
        let (single, pair) = random_params(2, 11);
        let codec = FlatCodec::new(2);
        let x = codec.pack(&single, &pair).unwrap();
        let dense = codec
            .unpack_with(
                &x,
                UnpackOptions {
                    add_gap_state: true,
                    clip: false,
                },
            )
            .unwrap();
        assert_eq!(dense.single.dims, vec![2, 21]);
        assert_eq!(dense.single.get(&[1, 20]), 0.0);
        assert_eq!(dense.single.get(&[1, 3]), single.get(1, 3));
        assert_eq!(dense.pair.dims, vec![2, 2, 21, 21]);
        assert_eq!(dense.pair.get(&[0, 1, 2, 3]), pair.get(0, 1, 2, 3));
    }
}
