use crate::operand::OperandKind;
use crate::operand::OperandKind::{Address as A, Literal as L, Multitype as M, Reference as R};

const MULTILOAD_VALUES: &[OperandKind] = &[M];
const SWITCH_TARGETS: &[OperandKind] = &[A];
/// bits, lower_bound, upper_bound, uncompressed
const HUFFMAN_ENTRY: &[OperandKind] = &[M, M, M, M];

/// UDVM instruction set (RFC 3320 section 9)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Opcode {
    DecompressionFailure = 0,
    And = 1,
    Or = 2,
    Not = 3,
    Lshift = 4,
    Rshift = 5,
    Add = 6,
    Subtract = 7,
    Multiply = 8,
    Divide = 9,
    Remainder = 10,
    SortAscending = 11,
    SortDescending = 12,
    Sha1 = 13,
    Load = 14,
    Multiload = 15,
    Push = 16,
    Pop = 17,
    Copy = 18,
    CopyLiteral = 19,
    CopyOffset = 20,
    Memset = 21,
    Jump = 22,
    Compare = 23,
    Call = 24,
    Return = 25,
    Switch = 26,
    Crc = 27,
    InputBytes = 28,
    InputBits = 29,
    InputHuffman = 30,
    StateAccess = 31,
    StateCreate = 32,
    StateFree = 33,
    Output = 34,
    EndMessage = 35,
}

impl Opcode {
    pub fn from_byte(byte: u8) -> Option<Opcode> {
        let op = match byte {
            0 => Opcode::DecompressionFailure,
            1 => Opcode::And,
            2 => Opcode::Or,
            3 => Opcode::Not,
            4 => Opcode::Lshift,
            5 => Opcode::Rshift,
            6 => Opcode::Add,
            7 => Opcode::Subtract,
            8 => Opcode::Multiply,
            9 => Opcode::Divide,
            10 => Opcode::Remainder,
            11 => Opcode::SortAscending,
            12 => Opcode::SortDescending,
            13 => Opcode::Sha1,
            14 => Opcode::Load,
            15 => Opcode::Multiload,
            16 => Opcode::Push,
            17 => Opcode::Pop,
            18 => Opcode::Copy,
            19 => Opcode::CopyLiteral,
            20 => Opcode::CopyOffset,
            21 => Opcode::Memset,
            22 => Opcode::Jump,
            23 => Opcode::Compare,
            24 => Opcode::Call,
            25 => Opcode::Return,
            26 => Opcode::Switch,
            27 => Opcode::Crc,
            28 => Opcode::InputBytes,
            29 => Opcode::InputBits,
            30 => Opcode::InputHuffman,
            31 => Opcode::StateAccess,
            32 => Opcode::StateCreate,
            33 => Opcode::StateFree,
            34 => Opcode::Output,
            35 => Opcode::EndMessage,
            _ => return None,
        };
        Some(op)
    }

    pub fn byte(self) -> u8 {
        self as u8
    }

    /// RFC mnemonic
    pub fn name(self) -> &'static str {
        match self {
            Opcode::DecompressionFailure => "DECOMPRESSION-FAILURE",
            Opcode::And => "AND",
            Opcode::Or => "OR",
            Opcode::Not => "NOT",
            Opcode::Lshift => "LSHIFT",
            Opcode::Rshift => "RSHIFT",
            Opcode::Add => "ADD",
            Opcode::Subtract => "SUBTRACT",
            Opcode::Multiply => "MULTIPLY",
            Opcode::Divide => "DIVIDE",
            Opcode::Remainder => "REMAINDER",
            Opcode::SortAscending => "SORT-ASCENDING",
            Opcode::SortDescending => "SORT-DESCENDING",
            Opcode::Sha1 => "SHA-1",
            Opcode::Load => "LOAD",
            Opcode::Multiload => "MULTILOAD",
            Opcode::Push => "PUSH",
            Opcode::Pop => "POP",
            Opcode::Copy => "COPY",
            Opcode::CopyLiteral => "COPY-LITERAL",
            Opcode::CopyOffset => "COPY-OFFSET",
            Opcode::Memset => "MEMSET",
            Opcode::Jump => "JUMP",
            Opcode::Compare => "COMPARE",
            Opcode::Call => "CALL",
            Opcode::Return => "RETURN",
            Opcode::Switch => "SWITCH",
            Opcode::Crc => "CRC",
            Opcode::InputBytes => "INPUT-BYTES",
            Opcode::InputBits => "INPUT-BITS",
            Opcode::InputHuffman => "INPUT-HUFFMAN",
            Opcode::StateAccess => "STATE-ACCESS",
            Opcode::StateCreate => "STATE-CREATE",
            Opcode::StateFree => "STATE-FREE",
            Opcode::Output => "OUTPUT",
            Opcode::EndMessage => "END-MESSAGE",
        }
    }

    /// Fixed operand layout. MULTILOAD, SWITCH and INPUT-HUFFMAN continue
    /// with a group repeated n times; see `repeated_operands`.
    pub fn operand_kinds(self) -> &'static [OperandKind] {
        match self {
            Opcode::DecompressionFailure | Opcode::Return => &[],
            Opcode::And
            | Opcode::Or
            | Opcode::Lshift
            | Opcode::Rshift
            | Opcode::Add
            | Opcode::Subtract
            | Opcode::Multiply
            | Opcode::Divide
            | Opcode::Remainder => &[R, M],
            Opcode::Not => &[R],
            Opcode::SortAscending | Opcode::SortDescending => &[M, M, M],
            Opcode::Sha1 => &[M, M, M],
            Opcode::Load => &[M, M],
            Opcode::Multiload => &[M, L],
            Opcode::Push | Opcode::Pop => &[M],
            Opcode::Copy => &[M, M, M],
            Opcode::CopyLiteral | Opcode::CopyOffset => &[M, M, R],
            Opcode::Memset => &[M, M, M, M],
            Opcode::Jump | Opcode::Call => &[A],
            Opcode::Compare => &[M, M, A, A, A],
            Opcode::Switch => &[L, M],
            Opcode::Crc => &[M, M, M, A],
            Opcode::InputBytes | Opcode::InputBits => &[M, M, A],
            Opcode::InputHuffman => &[M, A, L],
            Opcode::StateAccess => &[M, M, M, M, M, M],
            Opcode::StateCreate => &[M, M, M, M, M],
            Opcode::StateFree => &[M, M],
            Opcode::Output => &[M, M],
            Opcode::EndMessage => &[M, M, M, M, M, M, M],
        }
    }

    /// For variable-length instructions: index of the literal n within the
    /// fixed operands, and the group of operands repeated n times
    pub fn repeated_operands(self) -> Option<(usize, &'static [OperandKind])> {
        match self {
            Opcode::Multiload => Some((1, MULTILOAD_VALUES)),
            Opcode::Switch => Some((0, SWITCH_TARGETS)),
            Opcode::InputHuffman => Some((2, HUFFMAN_ENTRY)),
            _ => None,
        }
    }
}
