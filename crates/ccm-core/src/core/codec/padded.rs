use super::{ParameterCodec, TensorLayout};
use crate::core::alphabet::{NUM_AMINO_ACIDS, NUM_STATES};

/// Alignment width of the padded layout.
pub const PAD_WIDTH: usize = 32;

/// Padded, transposed codec consumed by the pseudo-likelihood objective.
///
/// The single block is `L·20` values followed by zero padding up to the next
/// multiple of [`PAD_WIDTH`] (a block that already ends on a boundary still
/// receives a full padding row). The pair block is stored with shape
/// `(21, L, 32, L)` in the order `(b, j, a, i)`, so the stride table for the
/// logical `(i, j, a, b)` coordinates is `(1, 32·L, L, 32·L²)`. Rows
/// `a = 21..32` are padding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaddedCodec {
    ncol: usize,
}

impl PaddedCodec {
    pub fn new(ncol: usize) -> Self {
        Self { ncol }
    }

    /// Number of meaningful single values, without padding.
    pub fn nsingle(&self) -> usize {
        self.ncol * NUM_AMINO_ACIDS
    }
}

impl ParameterCodec for PaddedCodec {
    fn ncol(&self) -> usize {
        self.ncol
    }

    fn single_block_len(&self) -> usize {
        let nsingle = self.nsingle();
        nsingle + PAD_WIDTH - (nsingle % PAD_WIDTH)
    }

    fn pair_layout(&self) -> TensorLayout {
        let l = self.ncol;
        TensorLayout::with_strides(
            [l, l, PAD_WIDTH, NUM_STATES],
            [1, PAD_WIDTH * l, l, PAD_WIDTH * l * l],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::codec::test_support::random_params;
    use crate::core::codec::{CodecError, UnpackOptions};
    use crate::core::models::params::{PairParams, SingleParams};

    #[test]
    fn nvar_matches_padded_formula() {
        let codec = PaddedCodec::new(3);
        assert_eq!(codec.single_block_len(), 64);
        assert_eq!(codec.nvar(), 64 + 3 * 3 * 21 * 32);
    }

    #[test]
    fn single_block_on_boundary_still_gets_padding() {
        // 8 columns give exactly 160 = 5 * 32 single values.
        let codec = PaddedCodec::new(8);
        assert_eq!(codec.single_block_len(), 192);
    }

    #[test]
    fn unpack_inverts_pack() {
        let (single, pair) = random_params(5, 3);
        let codec = PaddedCodec::new(5);
        let x = codec.pack(&single, &pair).unwrap();
        let (single_back, pair_back) = codec.unpack(&x).unwrap();
        assert_eq!(single_back, single);
        assert_eq!(pair_back, pair);
    }

    #[test]
    fn pair_entries_are_stored_transposed() {
        let l = 3;
        let codec = PaddedCodec::new(l);
        let mut pair = PairParams::zeros(l);
        pair.set(2, 1, 4, 6, 1.5);
        let x = codec.pack(&SingleParams::zeros(l), &pair).unwrap();
        // Stored (b, j, a, i) with shape (21, L, 32, L).
        let stored = ((6 * l + 1) * PAD_WIDTH + 4) * l + 2;
        assert_eq!(x[codec.single_block_len() + stored], 1.5);
    }

    #[test]
    fn padding_cells_stay_zero_after_pack() {
        let (single, pair) = random_params(3, 5);
        let codec = PaddedCodec::new(3);
        let mut x = vec![7.0; codec.nvar()];
        codec.pack_into(&single, &pair, &mut x).unwrap();

        assert!(x[codec.nsingle()..codec.single_block_len()]
            .iter()
            .all(|&v| v == 0.0));

        let dense = codec
            .unpack_with(
                &x,
                UnpackOptions {
                    add_gap_state: false,
                    clip: false,
                },
            )
            .unwrap();
        assert_eq!(dense.pair.dims, vec![3, 3, PAD_WIDTH, 21]);
        for i in 0..3 {
            for j in 0..3 {
                for a in NUM_STATES..PAD_WIDTH {
                    for b in 0..NUM_STATES {
                        assert_eq!(dense.pair.get(&[i, j, a, b]), 0.0);
                    }
                }
            }
        }
    }

    #[test]
    fn unclipped_unpack_still_drops_single_padding() {
        let (single, pair) = random_params(3, 6);
        let codec = PaddedCodec::new(3);
        let mut x = codec.pack(&single, &pair).unwrap();
        x[codec.nsingle()..codec.single_block_len()].fill(9.0);

        for add_gap_state in [false, true] {
            let dense = codec
                .unpack_with(
                    &x,
                    UnpackOptions {
                        add_gap_state,
                        clip: false,
                    },
                )
                .unwrap();
            let states = if add_gap_state {
                NUM_STATES
            } else {
                NUM_AMINO_ACIDS
            };
            assert_eq!(dense.single.dims, vec![3, states]);
            assert!(!dense.single.data.contains(&9.0));
            assert_eq!(dense.single.get(&[2, 19]), single.get(2, 19));
        }
    }

    #[test]
    fn clipped_unpack_matches_typed_unpack() {
        let (single, pair) = random_params(2, 9);
        let codec = PaddedCodec::new(2);
        let x = codec.pack(&single, &pair).unwrap();
        let dense = codec.unpack_with(&x, UnpackOptions::default()).unwrap();
        assert_eq!(dense.single.dims, vec![2, 20]);
        assert_eq!(dense.pair.dims, vec![2, 2, 21, 21]);
        assert_eq!(dense.pair.data, pair.as_slice());
    }

    #[test]
    fn flat_vector_is_rejected_by_padded_codec() {
        let (single, pair) = random_params(2, 1);
        let flat = crate::core::codec::FlatCodec::new(2)
            .pack(&single, &pair)
            .unwrap();
        assert!(matches!(
            PaddedCodec::new(2).unpack(&flat),
            Err(CodecError::LengthMismatch { .. })
        ));
    }
}
