/// Bytecode assembler for UDVM programs
///
/// `ProgramBuilder` emits instructions operand by operand, always choosing the
/// shortest encoding. Address operands may name a label that is defined
/// later; those are emitted as a 3-byte `0x80 nn nn` multitype placeholder and
/// patched in `build`, so forward references never change the code layout.
///
/// ```ignore
/// let mut b = ProgramBuilder::new(0x100);
/// b.op(Opcode::InputBytes).value(4).value(0x200).label_ref("done");
/// b.op(Opcode::Output).value(0x200).value(4);
/// b.label("done");
/// b.op(Opcode::EndMessage).value(0).value(0).value(0).value(0).value(0).value(0).value(0);
/// let code = b.build()?;
/// ```
use crate::opcode_tables::Opcode;
use crate::operand::{encode_literal, encode_multitype, encode_multitype_memory, encode_reference};
use indexmap::IndexMap;

/// Placeholder waiting for a label address
#[derive(Debug, Clone)]
struct UnresolvedLabel {
    /// Offset of the 2 address bytes in `code`
    location: usize,
    label: String,
    /// Address of the instruction the operand belongs to
    instruction: u16,
}

#[derive(Debug, Clone)]
pub struct ProgramBuilder {
    origin: u16,
    code: Vec<u8>,
    instruction_start: u16,
    labels: IndexMap<String, u16>,
    unresolved: Vec<UnresolvedLabel>,
}

impl ProgramBuilder {
    /// Builder for code that will be loaded at `origin`
    pub fn new(origin: u16) -> Self {
        ProgramBuilder {
            origin,
            code: Vec::new(),
            instruction_start: origin,
            labels: IndexMap::new(),
            unresolved: Vec::new(),
        }
    }

    pub fn origin(&self) -> u16 {
        self.origin
    }

    /// Address of the next byte emitted
    pub fn here(&self) -> u16 {
        self.origin.wrapping_add(self.code.len() as u16)
    }

    /// Start a new instruction
    pub fn op(&mut self, opcode: Opcode) -> &mut Self {
        self.instruction_start = self.here();
        self.code.push(opcode.byte());
        self
    }

    /// `#` literal operand
    pub fn literal(&mut self, value: u16) -> &mut Self {
        self.code.extend(encode_literal(value));
        self
    }

    /// `$` reference operand naming the word at `address`
    pub fn reference(&mut self, address: u16) -> &mut Self {
        self.code.extend(encode_reference(address));
        self
    }

    /// `%` immediate operand
    pub fn value(&mut self, value: u16) -> &mut Self {
        self.code.extend(encode_multitype(value));
        self
    }

    /// `%` operand that reads memory[address]
    pub fn memory(&mut self, address: u16) -> &mut Self {
        self.code.extend(encode_multitype_memory(address));
        self
    }

    /// `@` operand for an absolute target address
    pub fn address(&mut self, target: u16) -> &mut Self {
        let relative = target.wrapping_sub(self.instruction_start);
        self.code.extend(encode_multitype(relative));
        self
    }

    /// `@` operand pointing at a label, defined before or after this point
    pub fn label_ref(&mut self, label: &str) -> &mut Self {
        self.code.push(0x80);
        self.unresolved.push(UnresolvedLabel {
            location: self.code.len(),
            label: label.to_string(),
            instruction: self.instruction_start,
        });
        self.code.extend([0, 0]);
        self
    }

    /// Define `label` at the current address
    pub fn label(&mut self, label: &str) -> &mut Self {
        let here = self.here();
        self.labels.insert(label.to_string(), here);
        self
    }

    /// Raw data bytes
    pub fn bytes(&mut self, data: &[u8]) -> &mut Self {
        self.code.extend_from_slice(data);
        self
    }

    /// Resolve label references and return the bytecode
    pub fn build(&self) -> Result<Vec<u8>, String> {
        let mut code = self.code.clone();
        for reference in &self.unresolved {
            let target = self
                .labels
                .get(&reference.label)
                .ok_or_else(|| format!("Undefined label: {}", reference.label))?;
            let relative = target.wrapping_sub(reference.instruction);
            code[reference.location] = (relative >> 8) as u8;
            code[reference.location + 1] = (relative & 0xFF) as u8;
        }
        Ok(code)
    }
}
