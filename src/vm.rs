use crate::error::FailureReason;
use crate::memory::{
    Memory, REG_CYCLES_PER_BIT, REG_INPUT_BIT_ORDER, REG_MEMORY_SIZE, REG_PARTIAL_ID_LENGTH,
    REG_SIGCOMP_VERSION, REG_STACK_LOCATION, REG_STATE_LENGTH,
};
use log::debug;
use std::fmt;

/// The UDVM machine state for one message
pub struct Vm {
    /// 64KB arena, registers included
    pub memory: Memory,
    /// Program counter - address of the next instruction
    pub pc: u16,
}

/// Register values written before execution starts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Registers {
    pub cycles_per_bit: u16,
    pub sigcomp_version: u16,
    pub partial_id_length: u16,
    pub state_length: u16,
}

impl Vm {
    /// Zeroed arena with the mandated registers filled in
    pub fn new(registers: Registers) -> Self {
        let mut memory = Memory::new();
        // 65536 does not fit in a word and is stored as 0
        memory.write_word(REG_MEMORY_SIZE, 0);
        memory.write_word(REG_CYCLES_PER_BIT, registers.cycles_per_bit);
        memory.write_word(REG_SIGCOMP_VERSION, registers.sigcomp_version);
        memory.write_word(REG_PARTIAL_ID_LENGTH, registers.partial_id_length);
        memory.write_word(REG_STATE_LENGTH, registers.state_length);
        Vm { memory, pc: 0 }
    }

    pub fn input_bit_order(&self) -> u16 {
        self.memory.read_word(REG_INPUT_BIT_ORDER)
    }

    pub fn stack_location(&self) -> u16 {
        self.memory.read_word(REG_STACK_LOCATION)
    }

    /// Number of words on the stack
    pub fn stack_fill(&self) -> u16 {
        self.memory.read_word(self.stack_location())
    }

    fn stack_slot(location: u16, index: u16) -> u16 {
        location
            .wrapping_add(2)
            .wrapping_add(index.wrapping_mul(2))
    }

    /// Push a value: stack[stack_fill] := value, stack_fill += 1
    pub fn push(&mut self, value: u16) {
        let location = self.stack_location();
        let fill = self.memory.read_word(location);
        self.memory.write_word(Self::stack_slot(location, fill), value);
        self.memory.write_word(location, fill.wrapping_add(1));
    }

    /// Pop a value; an empty stack is a decompression failure
    pub fn pop(&mut self) -> Result<u16, FailureReason> {
        let location = self.stack_location();
        let fill = self.memory.read_word(location);
        if fill == 0 {
            debug!("stack underflow (stack at 0x{:04x})", location);
            return Err(FailureReason::StackUnderflow);
        }
        let fill = fill - 1;
        self.memory.write_word(location, fill);
        Ok(self.memory.read_word(Self::stack_slot(location, fill)))
    }
}

impl fmt::Debug for Vm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Vm")
            .field("pc", &format_args!("0x{:04x}", self.pc))
            .field("stack_location", &self.stack_location())
            .field("stack_fill", &self.stack_fill())
            .field("input_bit_order", &self.input_bit_order())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    #[test]
    fn test_registers_initialised() {
        let vm = Vm::new(Registers {
            cycles_per_bit: 16,
            sigcomp_version: 1,
            partial_id_length: 6,
            state_length: 300,
        });
        assert_eq!(vm.memory.read_word(REG_MEMORY_SIZE), 0);
        assert_eq!(vm.memory.read_word(REG_CYCLES_PER_BIT), 16);
        assert_eq!(vm.memory.read_word(REG_SIGCOMP_VERSION), 1);
        assert_eq!(vm.memory.read_word(REG_PARTIAL_ID_LENGTH), 6);
        assert_eq!(vm.memory.read_word(REG_STATE_LENGTH), 300);
    }

    #[test]
    fn test_push_pop_layout() {
        let mut vm = Vm::new(Registers::default());
        vm.memory.write_word(REG_STACK_LOCATION, 0x0400);
        vm.push(0x1111);
        vm.push(0x2222);
        assert_eq!(vm.stack_fill(), 2);
        assert_eq!(vm.memory.read_word(0x0402), 0x1111);
        assert_eq!(vm.memory.read_word(0x0404), 0x2222);
        assert_eq!(vm.pop(), Ok(0x2222));
        assert_eq!(vm.pop(), Ok(0x1111));
        assert_eq!(vm.pop(), Err(FailureReason::StackUnderflow));
    }

    #[test]
    fn test_stack_wraps_around_memory() {
        let mut vm = Vm::new(Registers::default());
        vm.memory.write_word(REG_STACK_LOCATION, 0xFFFC);
        vm.push(0xABCD);
        // stack[0] lives at 0xFFFE
        assert_eq!(vm.memory.read_word(0xFFFE), 0xABCD);
        vm.push(0x1234);
        // stack[1] wraps to 0x0000, overwriting the memory size register
        assert_eq!(vm.memory.read_word(0x0000), 0x1234);
        assert_eq!(vm.pop(), Ok(0x1234));
    }
}
