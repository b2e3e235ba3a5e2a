use crate::error::FailureReason;
use crate::memory::Memory;
use crate::opcode_tables::Opcode;
use crate::operand::{decode_operand, OperandKind};
use log::debug;
use std::fmt::{Display, Error, Formatter};

/// A decoded operand
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operand {
    /// `#` literal
    Literal(u16),
    /// `$` reference: the word at `address`, which the instruction may overwrite
    Reference { address: u16, value: u16 },
    /// `%` value, already resolved if it named memory
    Value(u16),
    /// `@` absolute target address
    Address(u16),
}

impl Operand {
    /// Numeric value of the operand
    pub fn value(&self) -> u16 {
        match *self {
            Operand::Literal(v) | Operand::Value(v) | Operand::Address(v) => v,
            Operand::Reference { value, .. } => value,
        }
    }
}

/// A decoded UDVM instruction
#[derive(Debug, Clone)]
pub struct Instruction {
    /// Address of the opcode byte
    pub address: u16,
    pub opcode: Opcode,
    pub operands: Vec<Operand>,
    /// Address of the following instruction
    pub next: u16,
}

impl Instruction {
    /// Decode the instruction at `address`. Memory-valued operands are read
    /// at decode time.
    pub fn decode(memory: &Memory, address: u16) -> Result<Self, FailureReason> {
        let opcode_byte = memory.read_byte(address);
        let opcode = match Opcode::from_byte(opcode_byte) {
            Some(op) => op,
            None => {
                debug!(
                    "invalid opcode 0x{:02x} at 0x{:04x}",
                    opcode_byte, address
                );
                return Err(FailureReason::NotImplemented);
            }
        };

        let mut offset = address.wrapping_add(1);
        let mut operands = Vec::with_capacity(opcode.operand_kinds().len());
        for &kind in opcode.operand_kinds() {
            operands.push(Self::decode_one(memory, &mut offset, kind, address)?);
        }

        if let Some((count_index, group)) = opcode.repeated_operands() {
            let n = operands[count_index].value();
            operands.reserve(n as usize * group.len());
            for _ in 0..n {
                for &kind in group {
                    operands.push(Self::decode_one(memory, &mut offset, kind, address)?);
                }
            }
        }

        Ok(Instruction {
            address,
            opcode,
            operands,
            next: offset,
        })
    }

    fn decode_one(
        memory: &Memory,
        offset: &mut u16,
        kind: OperandKind,
        instruction: u16,
    ) -> Result<Operand, FailureReason> {
        let decoded = decode_operand(memory, *offset, kind, instruction)?;
        *offset = decoded.next;
        Ok(match kind {
            OperandKind::Literal => Operand::Literal(decoded.value),
            OperandKind::Reference => Operand::Reference {
                // decode_operand always sets the address for references
                address: decoded.address.unwrap_or(0),
                value: decoded.value,
            },
            OperandKind::Multitype => Operand::Value(decoded.value),
            OperandKind::Address => Operand::Address(decoded.value),
        })
    }

    /// Value of operand `index`
    pub fn value(&self, index: usize) -> u16 {
        self.operands[index].value()
    }

    /// Write-back address of reference operand `index`
    pub fn reference(&self, index: usize) -> u16 {
        match self.operands[index] {
            Operand::Reference { address, .. } => address,
            other => other.value(),
        }
    }

    /// Size of the encoded instruction in bytes
    pub fn size(&self) -> u16 {
        self.next.wrapping_sub(self.address)
    }
}

impl Display for Instruction {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), Error> {
        write!(f, "{}", self.opcode.name())?;
        for (i, op) in self.operands.iter().enumerate() {
            if i == 0 {
                write!(f, " ")?;
            } else {
                write!(f, ", ")?;
            }
            match op {
                Operand::Literal(v) => write!(f, "#{}", v)?,
                Operand::Reference { address, .. } => write!(f, "$0x{:04x}", address)?,
                Operand::Value(v) => write!(f, "{}", v)?,
                Operand::Address(v) => write!(f, "@0x{:04x}", v)?,
            }
        }
        Ok(())
    }
}
