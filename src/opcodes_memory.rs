/// Memory operations for the UDVM
///
/// This module handles instructions that move data around the arena:
/// - LOAD / MULTILOAD write immediate words
/// - PUSH / POP use the stack described by the stack_location register
/// - COPY, COPY-LITERAL, COPY-OFFSET and MEMSET work through the circular
///   buffer bounded by byte_copy_left / byte_copy_right
/// - SHA-1 hashes a circular region into memory
use crate::digest::sha1;
use crate::error::FailureReason;
use crate::instruction::Instruction;
use crate::interpreter::{ExecutionResult, Interpreter};
use crate::opcode_tables::Opcode;
use log::trace;

impl<'a> Interpreter<'a> {
    /// Handle memory opcodes
    pub fn execute_memory_op(
        &mut self,
        inst: &Instruction,
    ) -> Result<ExecutionResult, FailureReason> {
        match inst.opcode {
            // SHA-1 (%position, %length, %destination)
            Opcode::Sha1 => {
                let position = inst.value(0);
                let length = inst.value(1);
                let destination = inst.value(2);
                self.charge(length as u64)?;
                let data = self.vm.memory.read_circular(position, length);
                let digest = sha1(&data);
                self.vm.memory.write_circular(destination, &digest);
            }

            // LOAD (%address, %value)
            Opcode::Load => {
                self.vm.memory.write_word(inst.value(0), inst.value(1));
            }

            // MULTILOAD (%address, #n, %value_0, ..., %value_n-1)
            Opcode::Multiload => {
                let address = inst.value(0);
                let n = inst.value(1);
                self.charge(n as u64)?;
                for (i, operand) in inst.operands[2..].iter().enumerate() {
                    let at = address.wrapping_add((i as u16).wrapping_mul(2));
                    self.vm.memory.write_word(at, operand.value());
                }
            }

            // PUSH (%value)
            Opcode::Push => {
                self.vm.push(inst.value(0));
            }

            // POP (%address)
            Opcode::Pop => {
                let value = self.vm.pop()?;
                self.vm.memory.write_word(inst.value(0), value);
            }

            // COPY (%position, %length, %destination)
            Opcode::Copy => {
                let length = inst.value(1);
                self.charge(length as u64)?;
                self.vm
                    .memory
                    .copy_circular(inst.value(0), length, inst.value(2));
            }

            // COPY-LITERAL (%position, %length, $destination)
            Opcode::CopyLiteral => {
                let length = inst.value(1);
                self.charge(length as u64)?;
                let end = self
                    .vm
                    .memory
                    .copy_circular(inst.value(0), length, inst.value(2));
                self.vm.memory.write_word(inst.reference(2), end);
            }

            // COPY-OFFSET (%offset, %length, $destination)
            Opcode::CopyOffset => {
                let offset = inst.value(0);
                let length = inst.value(1);
                let destination = inst.value(2);
                self.charge(length as u64)?;
                let position = self
                    .vm
                    .memory
                    .copy_window()
                    .walk_back(destination, offset);
                trace!(
                    "COPY-OFFSET back {} from 0x{:04x} -> 0x{:04x}",
                    offset,
                    destination,
                    position
                );
                let end = self
                    .vm
                    .memory
                    .copy_circular(position, length, destination);
                self.vm.memory.write_word(inst.reference(2), end);
            }

            // MEMSET (%address, %length, %start_value, %offset)
            Opcode::Memset => {
                let length = inst.value(1);
                self.charge(length as u64)?;
                self.vm.memory.fill_circular(
                    inst.value(0),
                    length,
                    (inst.value(2) & 0xFF) as u8,
                    (inst.value(3) & 0xFF) as u8,
                );
            }

            _ => return Err(FailureReason::NotImplemented),
        }
        Ok(ExecutionResult::Continue(inst.next))
    }

    /// Check if an opcode is a memory operation
    pub fn is_memory_opcode(opcode: Opcode) -> bool {
        matches!(
            opcode,
            Opcode::Sha1
                | Opcode::Load
                | Opcode::Multiload
                | Opcode::Push
                | Opcode::Pop
                | Opcode::Copy
                | Opcode::CopyLiteral
                | Opcode::CopyOffset
                | Opcode::Memset
        )
    }
}
