/// Arithmetic, bitwise and sorting operations for the UDVM
///
/// The two-operand instructions take a `$` reference as their first operand
/// and write the result back to it, modulo 2^16. SORT-ASCENDING and
/// SORT-DESCENDING reorder a block of word lists in place.
use crate::error::FailureReason;
use crate::instruction::Instruction;
use crate::interpreter::{ExecutionResult, Interpreter};
use crate::opcode_tables::Opcode;
use log::debug;

/// ceil(log2(k)), 0 for k <= 1
fn ceil_log2(k: u16) -> u64 {
    if k <= 1 {
        0
    } else {
        (16 - (k - 1).leading_zeros()) as u64
    }
}

impl<'a> Interpreter<'a> {
    /// Handle arithmetic and sort opcodes
    pub fn execute_math_op(
        &mut self,
        inst: &Instruction,
    ) -> Result<ExecutionResult, FailureReason> {
        if matches!(inst.opcode, Opcode::SortAscending | Opcode::SortDescending) {
            return self.execute_sort(inst);
        }

        let destination = inst.reference(0);
        let a = inst.value(0);
        // NOT has no second operand
        let b = inst.operands.get(1).map_or(0, |op| op.value());
        let result = match inst.opcode {
            Opcode::And => a & b,
            Opcode::Or => a | b,
            Opcode::Not => !a,
            Opcode::Lshift => a.checked_shl(b as u32).unwrap_or(0),
            Opcode::Rshift => a.checked_shr(b as u32).unwrap_or(0),
            Opcode::Add => a.wrapping_add(b),
            Opcode::Subtract => a.wrapping_sub(b),
            Opcode::Multiply | Opcode::Divide | Opcode::Remainder if b == 0 => {
                debug!("{} by zero", inst.opcode.name());
                return Err(FailureReason::ZeroOperand);
            }
            Opcode::Multiply => a.wrapping_mul(b),
            Opcode::Divide => a / b,
            Opcode::Remainder => a % b,
            _ => return Err(FailureReason::NotImplemented),
        };
        self.vm.memory.write_word(destination, result);
        Ok(ExecutionResult::Continue(inst.next))
    }

    /// SORT-ASCENDING / SORT-DESCENDING (start, n, k): n lists of k words at
    /// `start`; list 1 is the key and its stable sort order is applied to
    /// every list.
    fn execute_sort(&mut self, inst: &Instruction) -> Result<ExecutionResult, FailureReason> {
        let start = inst.value(0);
        let n = inst.value(1);
        let k = inst.value(2);
        self.charge(k as u64 * (ceil_log2(k) + n as u64))?;

        let word_at = |list: u16, index: u16| {
            start
                .wrapping_add(list.wrapping_mul(k).wrapping_mul(2))
                .wrapping_add(index.wrapping_mul(2))
        };

        let keys: Vec<u16> = (0..k)
            .map(|i| self.vm.memory.read_word(word_at(0, i)))
            .collect();
        let mut order: Vec<u16> = (0..k).collect();
        if inst.opcode == Opcode::SortAscending {
            order.sort_by(|&x, &y| keys[x as usize].cmp(&keys[y as usize]));
        } else {
            order.sort_by(|&x, &y| keys[y as usize].cmp(&keys[x as usize]));
        }

        for list in 0..n {
            let words: Vec<u16> = order
                .iter()
                .map(|&i| self.vm.memory.read_word(word_at(list, i)))
                .collect();
            for (i, word) in words.into_iter().enumerate() {
                self.vm.memory.write_word(word_at(list, i as u16), word);
            }
        }
        Ok(ExecutionResult::Continue(inst.next))
    }

    /// Check if an opcode is an arithmetic or sort operation
    pub fn is_math_opcode(opcode: Opcode) -> bool {
        matches!(
            opcode,
            Opcode::And
                | Opcode::Or
                | Opcode::Not
                | Opcode::Lshift
                | Opcode::Rshift
                | Opcode::Add
                | Opcode::Subtract
                | Opcode::Multiply
                | Opcode::Divide
                | Opcode::Remainder
                | Opcode::SortAscending
                | Opcode::SortDescending
        )
    }
}
