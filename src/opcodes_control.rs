/// Control flow operations for the UDVM
///
/// JUMP, COMPARE, CALL, RETURN, SWITCH, CRC and DECOMPRESSION-FAILURE. Address
/// operands arrive already resolved against the instruction address.
use crate::digest::crc16;
use crate::error::FailureReason;
use crate::instruction::Instruction;
use crate::interpreter::{ExecutionResult, Interpreter};
use crate::opcode_tables::Opcode;
use log::debug;
use std::cmp::Ordering;

impl<'a> Interpreter<'a> {
    /// Handle control flow opcodes
    pub fn execute_control_op(
        &mut self,
        inst: &Instruction,
    ) -> Result<ExecutionResult, FailureReason> {
        match inst.opcode {
            Opcode::DecompressionFailure => {
                debug!("DECOMPRESSION-FAILURE at 0x{:04x}", inst.address);
                Err(FailureReason::DecompressionFailureInstruction)
            }

            // JUMP (@address)
            Opcode::Jump => Ok(ExecutionResult::Jump(inst.value(0))),

            // COMPARE (%value_1, %value_2, @address_1, @address_2, @address_3)
            Opcode::Compare => {
                let target = match inst.value(0).cmp(&inst.value(1)) {
                    Ordering::Less => inst.value(2),
                    Ordering::Equal => inst.value(3),
                    Ordering::Greater => inst.value(4),
                };
                Ok(ExecutionResult::Jump(target))
            }

            // CALL (@address)
            Opcode::Call => {
                self.vm.push(inst.next);
                Ok(ExecutionResult::Jump(inst.value(0)))
            }

            Opcode::Return => {
                let target = self.vm.pop()?;
                Ok(ExecutionResult::Jump(target))
            }

            // SWITCH (#n, %j, @address_0, ..., @address_n-1)
            Opcode::Switch => {
                let n = inst.value(0);
                let j = inst.value(1);
                self.charge(n as u64)?;
                if j >= n {
                    debug!("SWITCH index {} out of range 0..{}", j, n);
                    return Err(FailureReason::SwitchOutOfRange);
                }
                Ok(ExecutionResult::Jump(inst.value(2 + j as usize)))
            }

            // CRC (%value, %position, %length, @address)
            Opcode::Crc => {
                let expected = inst.value(0);
                let length = inst.value(2);
                self.charge(length as u64)?;
                let data = self.vm.memory.read_circular(inst.value(1), length);
                let crc = crc16(&data);
                if crc == expected {
                    Ok(ExecutionResult::Continue(inst.next))
                } else {
                    debug!("CRC mismatch: computed 0x{:04x}, expected 0x{:04x}", crc, expected);
                    Ok(ExecutionResult::Jump(inst.value(3)))
                }
            }

            _ => Err(FailureReason::NotImplemented),
        }
    }

    /// Check if an opcode is a control flow operation
    pub fn is_control_opcode(opcode: Opcode) -> bool {
        matches!(
            opcode,
            Opcode::DecompressionFailure
                | Opcode::Jump
                | Opcode::Compare
                | Opcode::Call
                | Opcode::Return
                | Opcode::Switch
                | Opcode::Crc
        )
    }
}
