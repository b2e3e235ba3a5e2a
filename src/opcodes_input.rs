/// Input operations for the UDVM
///
/// INPUT-BYTES, INPUT-BITS and INPUT-HUFFMAN read from the compressed message.
/// Running out of input is not a failure: control moves to the instruction's
/// address operand instead.
use crate::bit_input::{reverse_low_bits, BIT_ORDER_F};
use crate::error::FailureReason;
use crate::huffman::{match_symbol, HuffmanEntry, HuffmanMatch};
use crate::instruction::Instruction;
use crate::interpreter::{ExecutionResult, Interpreter};
use crate::opcode_tables::Opcode;
use log::debug;

/// Highest legal input_bit_order value; bits above F are reserved
const MAX_INPUT_BIT_ORDER: u16 = 7;

impl<'a> Interpreter<'a> {
    /// Handle input opcodes
    pub fn execute_input_op(
        &mut self,
        inst: &Instruction,
    ) -> Result<ExecutionResult, FailureReason> {
        match inst.opcode {
            // INPUT-BYTES (%length, %destination, @address)
            Opcode::InputBytes => {
                let length = inst.value(0);
                let destination = inst.value(1);
                self.charge(length as u64)?;
                match self.input.take_bytes(length as usize) {
                    Some(bytes) => {
                        self.vm.memory.write_circular(destination, bytes);
                        Ok(ExecutionResult::Continue(inst.next))
                    }
                    None => {
                        debug!(
                            "INPUT-BYTES wanted {} bytes, {} left",
                            length,
                            self.input.remaining_bytes()
                        );
                        Ok(ExecutionResult::Jump(inst.value(2)))
                    }
                }
            }

            // INPUT-BITS (%length, %destination, @address)
            Opcode::InputBits => {
                let length = inst.value(0);
                let destination = inst.value(1);
                if length > 16 {
                    return Err(FailureReason::InputBitsTooLong);
                }
                let bit_order = self.checked_bit_order()?;
                match self.input.take_bits(length as u8, bit_order) {
                    Some(mut value) => {
                        if bit_order & BIT_ORDER_F != 0 {
                            value = reverse_low_bits(value, length as u8);
                        }
                        self.vm.memory.write_word(destination, value);
                        Ok(ExecutionResult::Continue(inst.next))
                    }
                    None => {
                        debug!(
                            "INPUT-BITS wanted {} bits, {} left",
                            length,
                            self.input.remaining_bits()
                        );
                        Ok(ExecutionResult::Jump(inst.value(2)))
                    }
                }
            }

            // INPUT-HUFFMAN (%destination, @address, #n, %bits_1, %lower_bound_1,
            //   %upper_bound_1, %uncompressed_1, ..., %uncompressed_n)
            Opcode::InputHuffman => {
                let destination = inst.value(0);
                let n = inst.value(2);
                self.charge(n as u64)?;
                if n == 0 {
                    return Ok(ExecutionResult::Continue(inst.next));
                }
                let bit_order = self.checked_bit_order()?;
                let entries: Vec<HuffmanEntry> = inst.operands[3..]
                    .chunks_exact(4)
                    .map(|group| HuffmanEntry {
                        bits: group[0].value(),
                        lower_bound: group[1].value(),
                        upper_bound: group[2].value(),
                        uncompressed: group[3].value(),
                    })
                    .collect();
                match match_symbol(&mut self.input, &entries, bit_order)? {
                    HuffmanMatch::Symbol(value) => {
                        self.vm.memory.write_word(destination, value);
                        Ok(ExecutionResult::Continue(inst.next))
                    }
                    HuffmanMatch::OutOfInput => Ok(ExecutionResult::Jump(inst.value(1))),
                }
            }

            _ => Err(FailureReason::NotImplemented),
        }
    }

    fn checked_bit_order(&self) -> Result<u16, FailureReason> {
        let bit_order = self.vm.input_bit_order();
        if bit_order > MAX_INPUT_BIT_ORDER {
            debug!("input_bit_order 0x{:04x} has reserved bits set", bit_order);
            return Err(FailureReason::InvalidInputBitOrder);
        }
        Ok(bit_order)
    }

    /// Check if an opcode reads the compressed message
    pub fn is_input_opcode(opcode: Opcode) -> bool {
        matches!(
            opcode,
            Opcode::InputBytes | Opcode::InputBits | Opcode::InputHuffman
        )
    }
}
