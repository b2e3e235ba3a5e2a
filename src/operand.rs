//! Operand decoding (RFC 3320 section 8.5)
//!
//! Four encodings share the instruction stream. The leading bits of the first
//! byte select the form; prefixes overlap, so the multitype decoder tests the
//! 2-bit patterns first, then 3-, 4-, 5-, 7- and finally 8-bit patterns.
//!
//! ```text
//! literal (#)    0nnnnnnn                    N          0 - 127
//!                10nnnnnn nnnnnnnn           N          0 - 16383
//!                11000000 nnnnnnnn nnnnnnnn  N          0 - 65535
//!
//! reference ($)  0nnnnnnn                    memory[2N]
//!                10nnnnnn nnnnnnnn           memory[2N]
//!                11000000 nnnnnnnn nnnnnnnn  memory[N]
//!
//! multitype (%)  00nnnnnn                    N          0 - 63
//!                01nnnnnn                    memory[2N]
//!                1000011n                    2^(N+6)    64, 128
//!                10001nnn                    2^(N+8)    256 - 32768
//!                111nnnnn                    N + 65504  65504 - 65535
//!                1001nnnn nnnnnnnn           N + 61440  61440 - 65535
//!                101nnnnn nnnnnnnn           N          0 - 8191
//!                110nnnnn nnnnnnnn           memory[N]
//!                10000000 nnnnnnnn nnnnnnnn  N          0 - 65535
//!                10000001 nnnnnnnn nnnnnnnn  memory[N]
//! ```

use crate::error::FailureReason;
use crate::memory::Memory;
use log::debug;

/// Operand encodings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperandKind {
    /// `#` literal
    Literal,
    /// `$` reference to a memory word, writable
    Reference,
    /// `%` multitype value, read-only
    Multitype,
    /// `@` multitype offset by the instruction address
    Address,
}

/// Result of decoding one operand
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodedOperand {
    /// Decoded value (for references, the word stored at `address`)
    pub value: u16,
    /// Target address for reference operands
    pub address: Option<u16>,
    /// Offset of the next operand or instruction
    pub next: u16,
}

/// Decode the operand at `offset`. `instruction` is the address of the
/// opcode byte, needed by address operands.
pub fn decode_operand(
    memory: &Memory,
    offset: u16,
    kind: OperandKind,
    instruction: u16,
) -> Result<DecodedOperand, FailureReason> {
    match kind {
        OperandKind::Literal => Ok(decode_literal(memory, offset)),
        OperandKind::Reference => Ok(decode_reference(memory, offset)),
        OperandKind::Multitype => decode_multitype(memory, offset),
        OperandKind::Address => {
            let mut decoded = decode_multitype(memory, offset)?;
            decoded.value = decoded.value.wrapping_add(instruction);
            Ok(decoded)
        }
    }
}

fn byte_at(memory: &Memory, offset: u16, n: u16) -> u16 {
    memory.read_byte(offset.wrapping_add(n)) as u16
}

/// Decode a `#` literal operand
pub fn decode_literal(memory: &Memory, offset: u16) -> DecodedOperand {
    let first = byte_at(memory, offset, 0);
    let (value, len) = if first & 0x80 == 0 {
        (first, 1)
    } else if first & 0xC0 == 0x80 {
        (((first & 0x3F) << 8) | byte_at(memory, offset, 1), 2)
    } else {
        // 11xxxxxx: the low bits are ignored and a full word follows
        ((byte_at(memory, offset, 1) << 8) | byte_at(memory, offset, 2), 3)
    };
    DecodedOperand {
        value,
        address: None,
        next: offset.wrapping_add(len),
    }
}

/// Decode a `$` reference operand, yielding the address and its word
pub fn decode_reference(memory: &Memory, offset: u16) -> DecodedOperand {
    let first = byte_at(memory, offset, 0);
    let (address, len) = if first & 0x80 == 0 {
        (first << 1, 1)
    } else if first & 0xC0 == 0x80 {
        let n = ((first & 0x3F) << 8) | byte_at(memory, offset, 1);
        (n.wrapping_mul(2), 2)
    } else {
        ((byte_at(memory, offset, 1) << 8) | byte_at(memory, offset, 2), 3)
    };
    DecodedOperand {
        value: memory.read_word(address),
        address: Some(address),
        next: offset.wrapping_add(len),
    }
}

/// Decode a `%` multitype operand
pub fn decode_multitype(memory: &Memory, offset: u16) -> Result<DecodedOperand, FailureReason> {
    let first = byte_at(memory, offset, 0);
    let second = || byte_at(memory, offset, 1);
    let word = || (byte_at(memory, offset, 1) << 8) | byte_at(memory, offset, 2);

    let (value, len) = match first {
        // 00nnnnnn
        b if b & 0xC0 == 0x00 => (b, 1),
        // 01nnnnnn
        b if b & 0xC0 == 0x40 => (memory.read_word((b & 0x3F) << 1), 1),
        // 111nnnnn
        b if b & 0xE0 == 0xE0 => ((b & 0x1F) + 65504, 1),
        // 101nnnnn nnnnnnnn
        b if b & 0xE0 == 0xA0 => (((b & 0x1F) << 8) | second(), 2),
        // 110nnnnn nnnnnnnn
        b if b & 0xE0 == 0xC0 => (memory.read_word(((b & 0x1F) << 8) | second()), 2),
        // 1001nnnn nnnnnnnn
        b if b & 0xF0 == 0x90 => ((((b & 0x0F) << 8) | second()) + 61440, 2),
        // 10001nnn
        b if b & 0xF8 == 0x88 => (1u16 << ((b & 0x07) + 8), 1),
        // 1000011n
        b if b & 0xFE == 0x86 => (1u16 << ((b & 0x01) + 6), 1),
        0x80 => (word(), 3),
        0x81 => (memory.read_word(word()), 3),
        b => {
            debug!(
                "reserved multitype encoding 0x{:02x} at 0x{:04x}",
                b, offset
            );
            return Err(FailureReason::NotImplemented);
        }
    };
    Ok(DecodedOperand {
        value,
        address: None,
        next: offset.wrapping_add(len),
    })
}

/// Shortest `#` encoding of `value`
pub fn encode_literal(value: u16) -> Vec<u8> {
    if value < 0x80 {
        vec![value as u8]
    } else if value < 0x4000 {
        vec![0x80 | (value >> 8) as u8, value as u8]
    } else {
        vec![0xC0, (value >> 8) as u8, value as u8]
    }
}

/// Shortest `$` encoding referring to the word at `address`
pub fn encode_reference(address: u16) -> Vec<u8> {
    if address & 1 == 0 && address < 0x100 {
        vec![(address >> 1) as u8]
    } else if address & 1 == 0 && address < 0x8000 {
        let n = address >> 1;
        vec![0x80 | (n >> 8) as u8, n as u8]
    } else {
        vec![0xC0, (address >> 8) as u8, address as u8]
    }
}

/// Shortest `%` encoding of the immediate `value`
pub fn encode_multitype(value: u16) -> Vec<u8> {
    match value {
        0..=63 => vec![value as u8],
        64 => vec![0x86],
        128 => vec![0x87],
        v if v.is_power_of_two() && v >= 256 => vec![0x88 | (v.trailing_zeros() - 8) as u8],
        65504..=65535 => vec![0xE0 | (value - 65504) as u8],
        61440..=65503 => {
            let n = value - 61440;
            vec![0x90 | (n >> 8) as u8, n as u8]
        }
        0..=8191 => vec![0xA0 | (value >> 8) as u8, value as u8],
        _ => vec![0x80, (value >> 8) as u8, value as u8],
    }
}

/// Shortest `%` encoding of memory[address]
pub fn encode_multitype_memory(address: u16) -> Vec<u8> {
    if address & 1 == 0 && address < 0x80 {
        vec![0x40 | (address >> 1) as u8]
    } else if address < 0x2000 {
        vec![0xC0 | (address >> 8) as u8, address as u8]
    } else {
        vec![0x81, (address >> 8) as u8, address as u8]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    fn memory_with(at: u16, bytes: &[u8]) -> Memory {
        let mut mem = Memory::new();
        mem.load(at, bytes);
        mem
    }

    fn decode_bytes(kind: OperandKind, bytes: &[u8]) -> DecodedOperand {
        let mem = memory_with(0x200, bytes);
        decode_operand(&mem, 0x200, kind, 0x1FF).unwrap()
    }

    #[test]
    fn test_literal_boundaries() {
        for value in [0u16, 127, 128, 16383, 16384, 65535] {
            let bytes = encode_literal(value);
            let decoded = decode_bytes(OperandKind::Literal, &bytes);
            assert_eq!(decoded.value, value);
            assert_eq!(decoded.next, 0x200 + bytes.len() as u16);
        }
        assert_eq!(encode_literal(127).len(), 1);
        assert_eq!(encode_literal(128).len(), 2);
        assert_eq!(encode_literal(16383).len(), 2);
        assert_eq!(encode_literal(16384).len(), 3);
    }

    #[test]
    fn test_multitype_boundaries() {
        let cases: [(u16, usize); 16] = [
            (0, 1),
            (63, 1),
            (64, 1),
            (65, 2),
            (128, 1),
            (256, 1),
            (32768, 1),
            (8191, 2),
            (8192, 1),
            (8193, 3),
            (61439, 3),
            (61440, 2),
            (65503, 2),
            (65504, 1),
            (65535, 1),
            (1000, 2),
        ];
        for (value, len) in cases {
            let bytes = encode_multitype(value);
            assert_eq!(bytes.len(), len, "encoded length of {}", value);
            let decoded = decode_bytes(OperandKind::Multitype, &bytes);
            assert_eq!(decoded.value, value);
            assert_eq!(decoded.next, 0x200 + len as u16);
        }
    }

    #[test]
    fn test_reference_yields_address_and_value() {
        let mut mem = memory_with(0x200, &encode_reference(0x0040));
        mem.write_word(0x0040, 0xBEEF);
        let decoded = decode_operand(&mem, 0x200, OperandKind::Reference, 0).unwrap();
        assert_eq!(decoded.address, Some(0x0040));
        assert_eq!(decoded.value, 0xBEEF);
        assert_eq!(decoded.next, 0x201);

        for (address, len) in [(0x00FEu16, 1usize), (0x0100, 2), (0x7FFE, 2), (0x0101, 3), (0xFFFF, 3)] {
            let bytes = encode_reference(address);
            assert_eq!(bytes.len(), len);
            let decoded = decode_bytes(OperandKind::Reference, &bytes);
            assert_eq!(decoded.address, Some(address));
        }
    }

    #[test]
    fn test_multitype_memory_forms() {
        for address in [0x0010u16, 0x007E, 0x0081, 0x1FFF, 0x2000, 0xFFFF] {
            let mut mem = memory_with(0x0300, &encode_multitype_memory(address));
            mem.write_word(address, 0x1234);
            let decoded = decode_operand(&mem, 0x0300, OperandKind::Multitype, 0).unwrap();
            assert_eq!(decoded.value, 0x1234, "memory[0x{:04x}]", address);
        }
    }

    #[test]
    fn test_address_operand_is_relative_to_instruction() {
        let mem = memory_with(0x0101, &encode_multitype(0xFFFE));
        // -2 relative to an instruction at 0x0100
        let decoded = decode_operand(&mem, 0x0101, OperandKind::Address, 0x0100).unwrap();
        assert_eq!(decoded.value, 0x00FE);

        let mem = memory_with(0xFFF0, &encode_multitype(0x20));
        let decoded = decode_operand(&mem, 0xFFF0, OperandKind::Address, 0xFFF0).unwrap();
        assert_eq!(decoded.value, 0x0010);
    }

    #[test]
    fn test_decode_wraps_at_end_of_memory() {
        let mut mem = Memory::new();
        mem.write_byte(0xFFFF, 0x80);
        mem.write_byte(0x0000, 0x12);
        mem.write_byte(0x0001, 0x34);
        let decoded = decode_operand(&mem, 0xFFFF, OperandKind::Multitype, 0).unwrap();
        assert_eq!(decoded.value, 0x1234);
        assert_eq!(decoded.next, 0x0002);
    }

    #[test]
    fn test_reserved_multitype_pattern() {
        let mem = memory_with(0x200, &[0x84]);
        assert_eq!(
            decode_operand(&mem, 0x200, OperandKind::Multitype, 0),
            Err(FailureReason::NotImplemented)
        );
    }
}
