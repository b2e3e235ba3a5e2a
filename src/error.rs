//! Failure taxonomy for UDVM execution
//!
//! Every cause of a decompression failure defined by RFC 3320 has a stable
//! numeric code. The codes are what a NACK producer puts on the wire, so they
//! must never be renumbered.

use std::fmt;

/// Reason a message failed to decompress
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureReason {
    /// Partial state identifier (or minimum access length) outside 6..=20
    InvalidPartialIdLength,
    /// No stored state matches the partial identifier
    NoStateMatch,
    /// state_begin + state_length exceeds the stored state value
    StateTooShort,
    /// Second operand of DIVIDE, REMAINDER or MULTIPLY was zero
    ZeroOperand,
    /// SWITCH index j >= n
    SwitchOutOfRange,
    /// Control or program load outside the UDVM memory
    JumpOutsideMemory,
    /// INPUT-BITS (or a Huffman table entry) asked for more than 16 bits
    InputBitsTooLong,
    /// input_bit_order register has reserved bits set
    InvalidInputBitOrder,
    /// DECOMPRESSION-FAILURE instruction executed
    DecompressionFailureInstruction,
    /// INPUT-HUFFMAN exhausted its table without a match
    HuffmanNoMatch,
    /// Input bits requested beyond the end of the message
    InputBitsExhausted,
    /// More than four state creation requests before END-MESSAGE
    TooManyStateRequests,
    /// state_retention_priority of 65535
    InvalidRetentionPriority,
    /// Input bytes requested beyond the end of the message
    InputBytesExhausted,
    /// Cycle budget for the message used up
    CyclesExhausted,
    /// POP or RETURN on an empty stack
    StackUnderflow,
    /// state_length is zero but state_begin is not
    StateBeginWithoutLength,
    /// Opcode or operand encoding this decoder does not handle
    NotImplemented,
}

impl FailureReason {
    pub fn code(&self) -> u8 {
        match self {
            FailureReason::InvalidPartialIdLength => 1,
            FailureReason::NoStateMatch => 2,
            FailureReason::StateTooShort => 3,
            FailureReason::ZeroOperand => 4,
            FailureReason::SwitchOutOfRange => 5,
            FailureReason::JumpOutsideMemory => 6,
            FailureReason::InputBitsTooLong => 7,
            FailureReason::InvalidInputBitOrder => 8,
            FailureReason::DecompressionFailureInstruction => 9,
            FailureReason::HuffmanNoMatch => 10,
            FailureReason::InputBitsExhausted => 11,
            FailureReason::TooManyStateRequests => 12,
            FailureReason::InvalidRetentionPriority => 13,
            FailureReason::InputBytesExhausted => 14,
            FailureReason::CyclesExhausted => 15,
            FailureReason::StackUnderflow => 16,
            FailureReason::StateBeginWithoutLength => 17,
            FailureReason::NotImplemented => 255,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        let reason = match code {
            1 => FailureReason::InvalidPartialIdLength,
            2 => FailureReason::NoStateMatch,
            3 => FailureReason::StateTooShort,
            4 => FailureReason::ZeroOperand,
            5 => FailureReason::SwitchOutOfRange,
            6 => FailureReason::JumpOutsideMemory,
            7 => FailureReason::InputBitsTooLong,
            8 => FailureReason::InvalidInputBitOrder,
            9 => FailureReason::DecompressionFailureInstruction,
            10 => FailureReason::HuffmanNoMatch,
            11 => FailureReason::InputBitsExhausted,
            12 => FailureReason::TooManyStateRequests,
            13 => FailureReason::InvalidRetentionPriority,
            14 => FailureReason::InputBytesExhausted,
            15 => FailureReason::CyclesExhausted,
            16 => FailureReason::StackUnderflow,
            17 => FailureReason::StateBeginWithoutLength,
            255 => FailureReason::NotImplemented,
            _ => return None,
        };
        Some(reason)
    }

    /// Human readable description of the failure
    pub fn description(&self) -> &'static str {
        match self {
            FailureReason::InvalidPartialIdLength => {
                "partial state length less than 6 or greater than 20 bytes"
            }
            FailureReason::NoStateMatch => "no state match",
            FailureReason::StateTooShort => "state_begin + state_length > size of state",
            FailureReason::ZeroOperand => "operand_2 is zero",
            FailureReason::SwitchOutOfRange => "switch statement failed, j >= n",
            FailureReason::JumpOutsideMemory => "attempt to jump outside of UDVM memory",
            FailureReason::InputBitsTooLong => "length in input-bits > 16",
            FailureReason::InvalidInputBitOrder => "input_bit_order > 7",
            FailureReason::DecompressionFailureInstruction => {
                "DECOMPRESSION-FAILURE instruction encountered"
            }
            FailureReason::HuffmanNoMatch => "input-huffman failed, j > n",
            FailureReason::InputBitsExhausted => "input bits requested beyond end of message",
            FailureReason::TooManyStateRequests => {
                "more than four state creation requests before END-MESSAGE"
            }
            FailureReason::InvalidRetentionPriority => "state_retention_priority is 65535",
            FailureReason::InputBytesExhausted => "input bytes requested beyond end of message",
            FailureReason::CyclesExhausted => "maximum number of UDVM cycles reached",
            FailureReason::StackUnderflow => "UDVM stack underrun",
            FailureReason::StateBeginWithoutLength => {
                "state_length is 0, but state_begin is non-zero"
            }
            FailureReason::NotImplemented => "instruction or encoding not implemented",
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (code {})", self.description(), self.code())
    }
}

impl std::error::Error for FailureReason {}

/// A failed decode, with everything needed to build a NACK
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecompressionError {
    pub reason: FailureReason,
    /// Address of the instruction that failed
    pub pc: u16,
    /// Opcode byte at `pc`, if execution got as far as fetching one
    pub opcode: Option<u8>,
    /// Output produced before the failure
    pub partial_output: Vec<u8>,
}

impl DecompressionError {
    pub fn new(reason: FailureReason, pc: u16, opcode: Option<u8>) -> Self {
        DecompressionError {
            reason,
            pc,
            opcode,
            partial_output: Vec::new(),
        }
    }

    pub fn code(&self) -> u8 {
        self.reason.code()
    }
}

impl fmt::Display for DecompressionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.opcode {
            Some(op) => write!(
                f,
                "decompression failure at pc 0x{:04x} (opcode {}): {}",
                self.pc, op, self.reason
            ),
            None => write!(
                f,
                "decompression failure at pc 0x{:04x}: {}",
                self.pc, self.reason
            ),
        }
    }
}

impl std::error::Error for DecompressionError {}

impl From<FailureReason> for DecompressionError {
    fn from(reason: FailureReason) -> Self {
        DecompressionError::new(reason, 0, None)
    }
}

/// Configuration error type
#[derive(Debug, Clone)]
pub struct ConfigError {
    pub message: String,
}

impl ConfigError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Configuration error: {}", self.message)
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(error: std::io::Error) -> Self {
        Self::new(format!("I/O error: {}", error))
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(error: toml::de::Error) -> Self {
        Self::new(format!("invalid TOML: {}", error))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    #[test]
    fn test_codes_round_trip() {
        for code in (1..=17).chain(std::iter::once(255)) {
            let reason = FailureReason::from_code(code).unwrap();
            assert_eq!(reason.code(), code);
        }
        assert!(FailureReason::from_code(0).is_none());
        assert!(FailureReason::from_code(18).is_none());
    }

    #[test]
    fn test_error_display_includes_pc_and_code() {
        let err = DecompressionError::new(FailureReason::StackUnderflow, 0x0123, Some(17));
        let text = err.to_string();
        assert!(text.contains("0x0123"));
        assert!(text.contains("code 16"));
    }
}
