//! INPUT-HUFFMAN matching against caller supplied bound tables

use crate::bit_input::{reverse_low_bits, BitInput, BIT_ORDER_H};
use crate::error::FailureReason;

/// One row of an INPUT-HUFFMAN table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HuffmanEntry {
    pub bits: u16,
    pub lower_bound: u16,
    pub upper_bound: u16,
    pub uncompressed: u16,
}

/// Outcome of a match attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HuffmanMatch {
    Symbol(u16),
    /// The message ran out before a match; caller redirects
    OutOfInput,
}

/// Walk the table accumulating H := H * 2^bits_j + next bits_j bits until a
/// row's bounds contain H.
pub fn match_symbol(
    input: &mut BitInput<'_>,
    entries: &[HuffmanEntry],
    bit_order: u16,
) -> Result<HuffmanMatch, FailureReason> {
    let mut h: u32 = 0;
    for entry in entries {
        if entry.bits > 16 {
            return Err(FailureReason::InputBitsTooLong);
        }
        let bits = entry.bits as u8;
        let mut k = match input.take_bits(bits, bit_order) {
            Some(k) => k,
            None => return Ok(HuffmanMatch::OutOfInput),
        };
        if bit_order & BIT_ORDER_H != 0 {
            k = reverse_low_bits(k, bits);
        }
        h = h.checked_shl(bits as u32).unwrap_or(0).wrapping_add(k as u32);
        if (entry.lower_bound as u32) <= h && h <= entry.upper_bound as u32 {
            let symbol = h
                .wrapping_add(entry.uncompressed as u32)
                .wrapping_sub(entry.lower_bound as u32);
            return Ok(HuffmanMatch::Symbol((symbol & 0xFFFF) as u16));
        }
    }
    Err(FailureReason::HuffmanNoMatch)
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    /// 1 bit: 0 -> 'a'; 2 bits total: 10 -> 'b'; 3 bits: 110..111 -> 'c','d'
    fn table() -> Vec<HuffmanEntry> {
        vec![
            HuffmanEntry { bits: 1, lower_bound: 0, upper_bound: 0, uncompressed: b'a' as u16 },
            HuffmanEntry { bits: 1, lower_bound: 2, upper_bound: 2, uncompressed: b'b' as u16 },
            HuffmanEntry { bits: 1, lower_bound: 6, upper_bound: 7, uncompressed: b'c' as u16 },
        ]
    }

    #[test]
    fn test_prefix_code() {
        // 0 10 110 111 -> a b c d
        let msg = [0b0101_1011, 0b1000_0000];
        let mut input = BitInput::new(&msg);
        let mut decoded = Vec::new();
        for _ in 0..4 {
            match match_symbol(&mut input, &table(), 0).unwrap() {
                HuffmanMatch::Symbol(s) => decoded.push(s as u8),
                HuffmanMatch::OutOfInput => panic!("ran out"),
            }
        }
        assert_eq!(decoded, b"abcd");
    }

    #[test]
    fn test_no_match_fails() {
        let entries = [HuffmanEntry { bits: 2, lower_bound: 0, upper_bound: 1, uncompressed: 0 }];
        let msg = [0xC0];
        let mut input = BitInput::new(&msg);
        assert_eq!(
            match_symbol(&mut input, &entries, 0),
            Err(FailureReason::HuffmanNoMatch)
        );
    }

    #[test]
    fn test_out_of_input_mid_match() {
        let msg = [0xFF];
        let mut input = BitInput::new(&msg);
        let entries = [
            HuffmanEntry { bits: 4, lower_bound: 0, upper_bound: 0, uncompressed: 0 },
            HuffmanEntry { bits: 8, lower_bound: 0, upper_bound: 0xFFFF, uncompressed: 0 },
        ];
        assert_eq!(
            match_symbol(&mut input, &entries, 0),
            Ok(HuffmanMatch::OutOfInput)
        );
    }

    #[test]
    fn test_h_bit_reverses_code_bits() {
        // With H = 1 the bits 01 read MSB-first are interpreted as 10
        let entries = [HuffmanEntry { bits: 2, lower_bound: 2, upper_bound: 2, uncompressed: 100 }];
        let msg = [0b0100_0000];
        let mut input = BitInput::new(&msg);
        assert_eq!(
            match_symbol(&mut input, &entries, BIT_ORDER_H),
            Ok(HuffmanMatch::Symbol(100))
        );
    }

    #[test]
    fn test_oversized_bits_rejected() {
        let entries = [HuffmanEntry { bits: 17, lower_bound: 0, upper_bound: 0, uncompressed: 0 }];
        let msg = [0u8; 4];
        let mut input = BitInput::new(&msg);
        assert_eq!(
            match_symbol(&mut input, &entries, 0),
            Err(FailureReason::InputBitsTooLong)
        );
    }
}
