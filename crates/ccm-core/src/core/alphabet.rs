use phf::{Map, phf_map};

/// Number of amino-acid states carrying free single-site parameters.
pub const NUM_AMINO_ACIDS: usize = 20;
/// Number of states in the alphabet, including the gap.
pub const NUM_STATES: usize = 21;
/// Symbol index reserved for the gap state.
pub const GAP: u8 = 20;

const SYMBOLS: [char; NUM_STATES] = [
    'A', 'R', 'N', 'D', 'C', 'Q', 'E', 'G', 'H', 'I', 'L', 'K', 'M', 'F', 'P', 'S', 'T', 'W', 'Y',
    'V', '-',
];

static SYMBOL_INDICES: Map<char, u8> = phf_map! {
    'A' => 0, 'R' => 1, 'N' => 2, 'D' => 3, 'C' => 4,
    'Q' => 5, 'E' => 6, 'G' => 7, 'H' => 8, 'I' => 9,
    'L' => 10, 'K' => 11, 'M' => 12, 'F' => 13, 'P' => 14,
    'S' => 15, 'T' => 16, 'W' => 17, 'Y' => 18, 'V' => 19,
    '-' => 20, '.' => 20,
};

/// Maps a one-letter residue code to its symbol index.
///
/// Lowercase letters are accepted. Any character outside the 20 standard amino
/// acids (e.g. `X`, `B`, `Z`) is treated as a gap.
pub fn symbol_index(symbol: char) -> u8 {
    SYMBOL_INDICES
        .get(&symbol.to_ascii_uppercase())
        .copied()
        .unwrap_or(GAP)
}

pub fn index_symbol(index: u8) -> Option<char> {
    SYMBOLS.get(index as usize).copied()
}

#[inline]
pub fn is_gap(index: u8) -> bool {
    index == GAP
}
