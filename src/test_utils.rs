// Test helpers for building and running small UDVM programs
use crate::assembler::ProgramBuilder;
use crate::decompressor::{DecompressRequest, Decompressor, MessageOutcome, Program};
use crate::error::{DecompressionError, FailureReason};
use crate::opcode_tables::Opcode;

/// Load address used by most tests
pub const CODE_START: u16 = 0x0100;
/// Scratch area for data written by test programs
pub const SCRATCH: u16 = 0x0800;

pub fn builder() -> ProgramBuilder {
    ProgramBuilder::new(CODE_START)
}

/// END-MESSAGE with no feedback and no state
pub fn end_message(b: &mut ProgramBuilder) {
    b.op(Opcode::EndMessage);
    for _ in 0..7 {
        b.value(0);
    }
}

/// OUTPUT `length` bytes from `start`, then END-MESSAGE
pub fn output_and_end(b: &mut ProgramBuilder, start: u16, length: u16) {
    b.op(Opcode::Output).value(start).value(length);
    end_message(b);
}

pub fn run_with(
    decompressor: &Decompressor,
    b: &ProgramBuilder,
    message: &[u8],
) -> Result<MessageOutcome, DecompressionError> {
    let code = b.build().unwrap();
    let request = DecompressRequest::new(Program::bytecode(code, b.origin()), message.to_vec());
    decompressor.decompress(&request)
}

pub fn run(b: &ProgramBuilder, message: &[u8]) -> Result<MessageOutcome, DecompressionError> {
    run_with(&Decompressor::default(), b, message)
}

/// Run and return the output, panicking on failure
pub fn run_ok(b: &ProgramBuilder, message: &[u8]) -> Vec<u8> {
    match run(b, message) {
        Ok(outcome) => outcome.output,
        Err(e) => panic!("program failed: {}", e),
    }
}

/// Run and return the failure reason, panicking on success
pub fn run_err(b: &ProgramBuilder, message: &[u8]) -> FailureReason {
    match run(b, message) {
        Ok(outcome) => panic!("program succeeded with output {:?}", outcome.output),
        Err(e) => e.reason,
    }
}
