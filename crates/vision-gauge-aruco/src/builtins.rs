//! Embedded built-in dictionary.
//!
//! `DICT_4X4_16` is a compact 16-id dictionary of 4×4 markers. Every code
//! carries a different popcount, and rotation preserves popcount, so no code
//! can ever decode as a rotation of another id. A unit test enforces this.

use crate::Dictionary;

#[rustfmt::skip]
const DICT_4X4_16_CODES: [u64; 16] = [
    0b0000_0010_0000_0000,
    0b0100_0000_0000_0010,
    0b0010_0001_1000_0000,
    0b1000_0110_0000_0001,
    0b0001_1010_0100_0001,
    0b1100_0011_0010_0100,
    0b0110_1001_0011_0100,
    0b1011_0100_1101_0010,
    0b0111_1010_0110_1100,
    0b1101_0111_1001_1010,
    0b1110_1011_0111_1001,
    0b0111_1101_1011_1100,
    0b1111_1011_1101_1110,
    0b1101_1111_1111_1011,
    0b1111_1111_0111_1111,
    0b1111_1111_1111_1111,
];

/// 4×4 markers, 16 ids.
pub const DICT_4X4_16: Dictionary = Dictionary {
    name: "DICT_4X4_16",
    marker_size: 4,
    codes: &DICT_4X4_16_CODES,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn popcounts_are_pairwise_distinct() {
        let mut counts: Vec<u32> = DICT_4X4_16.codes.iter().map(|c| c.count_ones()).collect();
        counts.sort_unstable();
        counts.dedup();
        assert_eq!(counts.len(), DICT_4X4_16.len());
    }

    #[test]
    fn codes_fit_the_bit_count() {
        let mask = (1u64 << DICT_4X4_16.bit_count()) - 1;
        for &c in DICT_4X4_16.codes {
            assert_eq!(c & mask, c);
        }
    }
}
