//! Bit-level view of the compressed message (RFC 3320 section 8.2)
//!
//! The P bit of the input_bit_order register decides whether bits leave each
//! byte MSB first (P = 0) or LSB first (P = 1). Both orders are `bitvec` views
//! over the same bytes, walked by one bit cursor that spans INPUT-BITS /
//! INPUT-HUFFMAN calls. Whether the first bit taken becomes the MSB or the LSB
//! of the returned value is a separate flag (F for INPUT-BITS, H for
//! INPUT-HUFFMAN) applied after assembly.

use bitvec::prelude::*;
use log::trace;

/// Input bit order register flags
pub const BIT_ORDER_P: u16 = 0x0001;
pub const BIT_ORDER_H: u16 = 0x0002;
pub const BIT_ORDER_F: u16 = 0x0004;

/// Reverse the lowest `n` bits of `value`
pub fn reverse_low_bits(value: u16, n: u8) -> u16 {
    if n == 0 {
        0
    } else {
        value.reverse_bits() >> (16 - n as u32)
    }
}

/// Cursor over the compressed message
#[derive(Debug, Clone)]
pub struct BitInput<'a> {
    message: &'a [u8],
    /// Bits consumed so far, in either view
    position: usize,
    /// P bit in effect for the partially consumed byte
    p_bit: bool,
}

impl<'a> BitInput<'a> {
    pub fn new(message: &'a [u8]) -> Self {
        BitInput {
            message,
            position: 0,
            p_bit: false,
        }
    }

    /// Whole bytes not yet touched
    pub fn remaining_bytes(&self) -> usize {
        self.message.len() - self.position.div_ceil(8)
    }

    /// Bits still available to INPUT-BITS / INPUT-HUFFMAN
    pub fn remaining_bits(&self) -> usize {
        8 * self.message.len() - self.position
    }

    pub fn message_len(&self) -> usize {
        self.message.len()
    }

    /// Drop any partially consumed byte
    pub fn discard_residual(&mut self) {
        let aligned = self.position.next_multiple_of(8);
        if aligned != self.position {
            trace!("discarding {} residual input bits", aligned - self.position);
        }
        self.position = aligned;
    }

    /// INPUT-BYTES: take `n` whole bytes, discarding any fractional byte.
    /// Returns None, consuming nothing further, when fewer than `n` bytes remain.
    pub fn take_bytes(&mut self, n: usize) -> Option<&'a [u8]> {
        self.discard_residual();
        if n > self.remaining_bytes() {
            return None;
        }
        let first = self.position / 8;
        let message = self.message;
        self.position += 8 * n;
        Some(&message[first..first + n])
    }

    /// Take `n` (0..=16) bits using the P bit of `bit_order`. The first bit
    /// taken is the MSB of the result; callers apply F/H afterwards.
    /// Returns None, consuming nothing, when the message runs out.
    pub fn take_bits(&mut self, n: u8, bit_order: u16) -> Option<u16> {
        debug_assert!(n <= 16);
        let p_bit = bit_order & BIT_ORDER_P != 0;
        if p_bit != self.p_bit {
            self.discard_residual();
            self.p_bit = p_bit;
        }
        let n = n as usize;
        if n > self.remaining_bits() {
            return None;
        }
        if n == 0 {
            return Some(0);
        }
        let range = self.position..self.position + n;
        let value = if p_bit {
            self.message.view_bits::<Lsb0>()[range]
                .iter()
                .by_vals()
                .fold(0u16, |acc, bit| (acc << 1) | bit as u16)
        } else {
            self.message.view_bits::<Msb0>()[range].load_be::<u16>()
        };
        self.position += n;
        Some(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    #[test]
    fn test_msb_first_bits() {
        let msg = [0b1011_0011, 0b0101_0000];
        let mut input = BitInput::new(&msg);
        assert_eq!(input.take_bits(3, 0), Some(0b101));
        assert_eq!(input.take_bits(7, 0), Some(0b1_0011_01));
        assert_eq!(input.remaining_bits(), 6);
        assert_eq!(input.take_bits(7, 0), None);
        assert_eq!(input.take_bits(6, 0), Some(0b01_0000));
        assert_eq!(input.take_bits(1, 0), None);
    }

    #[test]
    fn test_lsb_first_bits() {
        let msg = [0b1011_0011];
        let mut input = BitInput::new(&msg);
        // P = 1: bits leave the byte starting with its LSB
        assert_eq!(input.take_bits(3, BIT_ORDER_P), Some(0b110));
        assert_eq!(input.take_bits(5, BIT_ORDER_P), Some(0b01101));
    }

    #[test]
    fn test_lsb_first_across_bytes() {
        let msg = [0x01, 0x80, 0x03];
        let mut input = BitInput::new(&msg);
        // all of 0x01 LSB first, then the low bit of 0x80
        assert_eq!(input.take_bits(9, BIT_ORDER_P), Some(0b1_0000_0000));
        assert_eq!(input.take_bits(7, BIT_ORDER_P), Some(0b000_0001));
        assert_eq!(input.take_bits(2, BIT_ORDER_P), Some(0b11));
        assert_eq!(input.remaining_bits(), 6);
        assert_eq!(input.remaining_bytes(), 0);
    }

    #[test]
    fn test_p_bit_change_discards_residual() {
        let msg = [0xFF, 0x80];
        let mut input = BitInput::new(&msg);
        assert_eq!(input.take_bits(4, 0), Some(0xF));
        // Switching to P = 1 drops the remaining four bits of 0xFF
        assert_eq!(input.take_bits(1, BIT_ORDER_P), Some(0));
        assert_eq!(input.remaining_bits(), 7);
    }

    #[test]
    fn test_take_bytes_discards_fraction() {
        let msg = [0xAA, 0x01, 0x02, 0x03];
        let mut input = BitInput::new(&msg);
        assert_eq!(input.take_bits(2, 0), Some(0b10));
        assert_eq!(input.take_bytes(2), Some(&[0x01, 0x02][..]));
        assert_eq!(input.take_bytes(2), None);
        assert_eq!(input.remaining_bytes(), 1);
        assert_eq!(input.take_bytes(1), Some(&[0x03][..]));
    }

    #[test]
    fn test_sixteen_bits_across_three_bytes() {
        let msg = [0x0F, 0xF0, 0x0F];
        let mut input = BitInput::new(&msg);
        assert_eq!(input.take_bits(4, 0), Some(0));
        assert_eq!(input.take_bits(16, 0), Some(0xFF00));
        assert_eq!(input.take_bits(0, 0), Some(0));
        assert_eq!(input.take_bits(4, 0), Some(0xF));
    }

    #[test]
    fn test_reverse_low_bits() {
        assert_eq!(reverse_low_bits(0b001, 3), 0b100);
        assert_eq!(reverse_low_bits(0x0001, 16), 0x8000);
        assert_eq!(reverse_low_bits(0x5, 0), 0);
    }
}
