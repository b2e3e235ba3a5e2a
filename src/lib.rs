#![crate_name = "udvm"]

#[macro_use]
extern crate lazy_static;

pub mod assembler;
pub mod bit_input;
pub mod config;
pub mod cycles;
pub mod decompressor;
pub mod dictionary;
pub mod digest;
pub mod error;
pub mod feedback;
pub mod huffman;
pub mod instruction;
pub mod interpreter;
pub mod memory;
pub mod opcode_tables;
pub mod opcodes_control;
pub mod opcodes_input;
pub mod opcodes_math;
pub mod opcodes_memory;
pub mod opcodes_state;
pub mod operand;
pub mod state;
pub mod trace;
pub mod vm;

pub use config::{StateFreePolicy, UdvmConfig};
pub use decompressor::{DecompressRequest, Decompressor, MessageOutcome, Program};
pub use error::{ConfigError, DecompressionError, FailureReason};

#[cfg(test)]
mod test_utils;

#[cfg(test)]
mod arithmetic_tests;

/*
UDVM memory map

        0x0000  UDVM_memory_size (0 = 65536)
        0x0002  cycles_per_bit
        0x0004  SigComp_version
        0x0006  partial_state_ID_length
        0x0008  state_length
        0x000a  reserved
        0x0040  byte_copy_left
        0x0042  byte_copy_right
        0x0044  input_bit_order
        0x0046  stack_location
        0x0048  program / working memory
*/
