//! The 64KB UDVM memory arena
//!
//! All addresses are `u16`, so every access is implicitly modulo 2^16. Any
//! arithmetic on addresses goes through `wrapping_*` explicitly.
//!
//! Bulk operations (COPY family, SHA-1, CRC, MEMSET, OUTPUT, state access)
//! walk memory with the byte copying rule of RFC 3320 section 8.4: after
//! address m comes m + 1, unless that equals byte_copy_right, in which case
//! it is byte_copy_left.

use log::trace;

/// Size of the UDVM memory in bytes
pub const MEMORY_SIZE: usize = 0x10000;

/// UDVM_memory_size register (65536 stores as 0)
pub const REG_MEMORY_SIZE: u16 = 0;
/// cycles_per_bit register
pub const REG_CYCLES_PER_BIT: u16 = 2;
/// SigComp_version register
pub const REG_SIGCOMP_VERSION: u16 = 4;
/// partial_state_ID_length register
pub const REG_PARTIAL_ID_LENGTH: u16 = 6;
/// state_length register
pub const REG_STATE_LENGTH: u16 = 8;
pub const REG_BYTE_COPY_LEFT: u16 = 64;
pub const REG_BYTE_COPY_RIGHT: u16 = 66;
pub const REG_INPUT_BIT_ORDER: u16 = 68;
pub const REG_STACK_LOCATION: u16 = 70;
/// First address past the reserved register block
pub const RESERVED_END: u16 = 72;

/// The circular buffer bounds, captured once per bulk instruction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CopyWindow {
    pub left: u16,
    pub right: u16,
}

impl CopyWindow {
    /// Address that follows `addr` under the byte copying rule
    pub fn next(&self, addr: u16) -> u16 {
        let next = addr.wrapping_add(1);
        if next == self.right {
            self.left
        } else {
            next
        }
    }

    /// Walk backwards `offset` addresses from `from`, stepping from
    /// byte_copy_left to byte_copy_right - 1 (COPY-OFFSET)
    pub fn walk_back(&self, from: u16, offset: u16) -> u16 {
        let mut position = from;
        let mut remaining = offset;
        while remaining > 0 {
            // Inside a proper window the walk is plain modular arithmetic
            if self.left < self.right && position >= self.left && position < self.right {
                let size = (self.right - self.left) as u32;
                let relative = (position - self.left) as u32;
                let back = remaining as u32 % size;
                return self.left + ((relative + size - back) % size) as u16;
            }
            position = if position == self.left {
                self.right.wrapping_sub(1)
            } else {
                position.wrapping_sub(1)
            };
            remaining -= 1;
        }
        position
    }
}

/// UDVM memory arena
pub struct Memory {
    bytes: Box<[u8]>,
}

impl Default for Memory {
    fn default() -> Self {
        Self::new()
    }
}

impl Memory {
    /// Zero-filled arena
    pub fn new() -> Self {
        Memory {
            bytes: vec![0u8; MEMORY_SIZE].into_boxed_slice(),
        }
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }

    pub fn read_byte(&self, addr: u16) -> u8 {
        self.bytes[addr as usize]
    }

    pub fn write_byte(&mut self, addr: u16, value: u8) {
        self.bytes[addr as usize] = value;
    }

    /// Read a big-endian word; the second byte wraps to address 0
    pub fn read_word(&self, addr: u16) -> u16 {
        let high = self.read_byte(addr) as u16;
        let low = self.read_byte(addr.wrapping_add(1)) as u16;
        (high << 8) | low
    }

    pub fn write_word(&mut self, addr: u16, value: u16) {
        self.write_byte(addr, (value >> 8) as u8);
        self.write_byte(addr.wrapping_add(1), (value & 0xFF) as u8);
    }

    /// Plain (non-circular) read of `length` bytes, wrapping at 2^16
    pub fn read_bytes(&self, addr: u16, length: usize) -> Vec<u8> {
        (0..length)
            .map(|i| self.read_byte(addr.wrapping_add(i as u16)))
            .collect()
    }

    /// Plain (non-circular) write, wrapping at 2^16
    pub fn load(&mut self, addr: u16, data: &[u8]) {
        let mut at = addr;
        for &b in data {
            self.write_byte(at, b);
            at = at.wrapping_add(1);
        }
    }

    pub fn copy_window(&self) -> CopyWindow {
        CopyWindow {
            left: self.read_word(REG_BYTE_COPY_LEFT),
            right: self.read_word(REG_BYTE_COPY_RIGHT),
        }
    }

    /// Read `length` bytes starting at `start` under the byte copying rule
    pub fn read_circular(&self, start: u16, length: u16) -> Vec<u8> {
        let window = self.copy_window();
        let mut out = Vec::with_capacity(length as usize);
        let mut at = start;
        for _ in 0..length {
            out.push(self.read_byte(at));
            at = window.next(at);
        }
        out
    }

    /// Write `data` starting at `start` under the byte copying rule.
    /// Returns the address following the last byte written.
    pub fn write_circular(&mut self, start: u16, data: &[u8]) -> u16 {
        let window = self.copy_window();
        let mut at = start;
        for &b in data {
            self.write_byte(at, b);
            at = window.next(at);
        }
        at
    }

    /// Byte-by-byte copy; an overlapping source picks up bytes written
    /// earlier in the same copy. Returns the address following the last
    /// destination byte.
    pub fn copy_circular(&mut self, position: u16, length: u16, destination: u16) -> u16 {
        let window = self.copy_window();
        trace!(
            "copy {} bytes 0x{:04x} -> 0x{:04x} (window 0x{:04x}..0x{:04x})",
            length,
            position,
            destination,
            window.left,
            window.right
        );
        let mut src = position;
        let mut dst = destination;
        for _ in 0..length {
            let b = self.read_byte(src);
            self.write_byte(dst, b);
            src = window.next(src);
            dst = window.next(dst);
        }
        dst
    }

    /// MEMSET: byte n becomes (start_value + n * offset) mod 256
    pub fn fill_circular(&mut self, address: u16, length: u16, start_value: u8, offset: u8) {
        let window = self.copy_window();
        let mut at = address;
        let mut value = start_value;
        for _ in 0..length {
            self.write_byte(at, value);
            value = value.wrapping_add(offset);
            at = window.next(at);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    #[test]
    fn test_word_access_wraps() {
        let mut mem = Memory::new();
        mem.write_word(0xFFFF, 0xABCD);
        assert_eq!(mem.read_byte(0xFFFF), 0xAB);
        assert_eq!(mem.read_byte(0x0000), 0xCD);
        assert_eq!(mem.read_word(0xFFFF), 0xABCD);

        let addr: u16 = 0xFFFF;
        mem.write_byte(addr, 0x11);
        assert_eq!(mem.read_byte(addr.wrapping_add(1)), 0xCD);
    }

    #[test]
    fn test_copy_wraps_at_right_boundary() {
        let mut mem = Memory::new();
        mem.write_word(REG_BYTE_COPY_LEFT, 0x100);
        mem.write_word(REG_BYTE_COPY_RIGHT, 0x104);
        mem.load(0x200, &[1, 2, 3, 4, 5, 6]);

        // destination 0x102: writes 0x102, 0x103, then wraps to 0x100
        let end = mem.copy_circular(0x200, 6, 0x102);
        assert_eq!(mem.read_bytes(0x100, 4), vec![3, 4, 5, 6]);
        assert_eq!(end, 0x100);
        assert_eq!(mem.read_byte(0x104), 0);
    }

    #[test]
    fn test_full_window_copy_does_not_wrap() {
        let mut mem = Memory::new();
        mem.write_word(REG_BYTE_COPY_LEFT, 0x300);
        mem.write_word(REG_BYTE_COPY_RIGHT, 0x308);
        mem.load(0x300, &[9, 8, 7, 6, 5, 4, 3, 2]);

        let data = mem.read_circular(0x300, 8);
        assert_eq!(data, vec![9, 8, 7, 6, 5, 4, 3, 2]);
        // Only the ninth byte would come from the left boundary again
        let data = mem.read_circular(0x300, 9);
        assert_eq!(data[8], 9);
    }

    #[test]
    fn test_overlapping_copy_repeats_pattern() {
        let mut mem = Memory::new();
        mem.load(0x400, b"ab");
        mem.copy_circular(0x400, 6, 0x402);
        assert_eq!(mem.read_bytes(0x400, 8), b"abababab".to_vec());
    }

    #[test]
    fn test_walk_back_inside_window() {
        let window = CopyWindow {
            left: 0x100,
            right: 0x110,
        };
        assert_eq!(window.walk_back(0x105, 3), 0x102);
        // Stepping back past left lands on right - 1
        assert_eq!(window.walk_back(0x102, 3), 0x10F);
        assert_eq!(window.walk_back(0x100, 0x10), 0x100);
    }

    #[test]
    fn test_walk_back_outside_window() {
        let window = CopyWindow { left: 0, right: 0 };
        assert_eq!(window.walk_back(0x0003, 5), 0xFFFE);
        let window = CopyWindow {
            left: 0x100,
            right: 0x110,
        };
        // From above the window the walk enters at left and continues at right - 1
        assert_eq!(window.walk_back(0x0102, 0), 0x0102);
        assert_eq!(window.walk_back(0x0200, 0x80), 0x0180);
    }

    #[test]
    fn test_memset_sequence() {
        let mut mem = Memory::new();
        mem.fill_circular(0x500, 5, 0xFE, 1);
        assert_eq!(mem.read_bytes(0x500, 5), vec![0xFE, 0xFF, 0x00, 0x01, 0x02]);
    }
}
