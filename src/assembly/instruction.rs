//! Decoded instruction representation.
//!
//! An [`Instruction`] is the decoder's view of a single opcode plus its operands. Branch
//! operands are stored as absolute code offsets rather than the relative displacements found
//! in the byte stream, so that the encoder can relocate them after instructions change size.

use std::fmt;

use crate::{assembly::opcodes, runtime::Relation};

/// Layout of the operand bytes that follow an opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperandType {
    /// No operand bytes.
    None,
    /// Signed byte immediate (`bipush`).
    Int8,
    /// Signed 16-bit immediate (`sipush`).
    Int16,
    /// One-byte constant-pool index (`ldc`).
    ConstantPool8,
    /// Two-byte constant-pool index.
    ConstantPool16,
    /// One-byte local variable index (two bytes after `wide`).
    Local,
    /// Local index and signed increment (`iinc`).
    Increment,
    /// Signed 16-bit branch displacement.
    Branch16,
    /// Signed 32-bit branch displacement.
    Branch32,
    /// Padded `tableswitch` payload.
    TableSwitch,
    /// Padded `lookupswitch` payload.
    LookupSwitch,
    /// Constant-pool index, argument count and a zero byte.
    InvokeInterface,
    /// Constant-pool index and two zero bytes.
    InvokeDynamic,
    /// Primitive array type code (`newarray`).
    ArrayType,
    /// Constant-pool index and dimension count.
    MultiNewArray,
    /// Modifier for the following opcode.
    Wide,
}

impl OperandType {
    /// Size of the operand bytes, or `None` for variable-size layouts.
    #[must_use]
    pub const fn size(&self) -> Option<usize> {
        match self {
            OperandType::None => Some(0),
            OperandType::Int8
            | OperandType::ConstantPool8
            | OperandType::Local
            | OperandType::ArrayType => Some(1),
            OperandType::Int16
            | OperandType::ConstantPool16
            | OperandType::Increment
            | OperandType::Branch16 => Some(2),
            OperandType::MultiNewArray => Some(3),
            OperandType::Branch32 | OperandType::InvokeInterface | OperandType::InvokeDynamic => {
                Some(4)
            }
            OperandType::TableSwitch | OperandType::LookupSwitch | OperandType::Wide => None,
        }
    }
}

/// How an instruction affects control flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowType {
    /// Falls through to the next instruction.
    Sequential,
    /// Branches to a target or falls through.
    ConditionalBranch,
    /// Always transfers control to its target.
    UnconditionalBranch,
    /// Jump to a subroutine (`jsr`, `jsr_w`).
    Subroutine,
    /// Return from a subroutine (`ret`).
    SubroutineReturn,
    /// Multi-way branch.
    Switch,
    /// Method invocation.
    Call,
    /// Method return.
    Return,
    /// Exception throw.
    Throw,
}

/// Decoded operand of an instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operand {
    /// No operand.
    None,
    /// Integer immediate of `bipush` / `sipush`.
    Int(i32),
    /// Constant-pool index.
    ConstantPool(u16),
    /// Local variable index.
    Local(u16),
    /// `iinc` operands.
    Increment {
        /// Local variable index
        local: u16,
        /// Signed increment
        delta: i16,
    },
    /// Absolute branch target offset.
    Target(u32),
    /// `tableswitch` operands with absolute targets.
    TableSwitch {
        /// Default target
        default: u32,
        /// Lowest key
        low: i32,
        /// Highest key
        high: i32,
        /// One target per key in `low..=high`
        targets: Vec<u32>,
    },
    /// `lookupswitch` operands with absolute targets.
    LookupSwitch {
        /// Default target
        default: u32,
        /// `(key, target)` pairs in ascending key order
        pairs: Vec<(i32, u32)>,
    },
    /// `invokeinterface` / `invokedynamic` operands.
    Invoke {
        /// Constant-pool index of the call site or method reference
        index: u16,
        /// Argument slot count (zero for `invokedynamic`)
        count: u8,
    },
    /// `newarray` element type code.
    ArrayType(u8),
    /// `multianewarray` operands.
    MultiNewArray {
        /// Constant-pool index of the array class
        index: u16,
        /// Number of dimensions
        dimensions: u8,
    },
}

/// A single decoded instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
    /// Offset of the opcode (or of the `wide` prefix) within the method code.
    pub offset: u32,
    /// Encoded size in bytes, including `wide` prefix and switch padding.
    pub size: u32,
    /// The opcode (the modified opcode for `wide` forms).
    pub opcode: u8,
    /// True if the instruction was prefixed by `wide`.
    pub wide: bool,
    /// Lower-case mnemonic.
    pub mnemonic: &'static str,
    /// Control flow classification.
    pub flow_type: FlowType,
    /// Decoded operand.
    pub operand: Operand,
}

impl Instruction {
    /// Returns true for instructions that carry branch targets.
    #[must_use]
    pub fn is_branch(&self) -> bool {
        matches!(
            self.operand,
            Operand::Target(_) | Operand::TableSwitch { .. } | Operand::LookupSwitch { .. }
        )
    }

    /// All absolute branch targets of this instruction.
    #[must_use]
    pub fn targets(&self) -> Vec<u32> {
        match &self.operand {
            Operand::Target(target) => vec![*target],
            Operand::TableSwitch {
                default, targets, ..
            } => std::iter::once(*default)
                .chain(targets.iter().copied())
                .collect(),
            Operand::LookupSwitch { default, pairs } => std::iter::once(*default)
                .chain(pairs.iter().map(|(_, target)| *target))
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Offset of the instruction that follows this one.
    #[must_use]
    pub fn next_offset(&self) -> u32 {
        self.offset + self.size
    }

    /// Returns true for the value-producing ordered compares (`lcmp`, `fcmpl`, ...).
    #[must_use]
    pub fn is_ordered_compare(&self) -> bool {
        (opcodes::LCMP..=opcodes::DCMPG).contains(&self.opcode)
    }

    /// The relation tested by a two-operand conditional branch, if this is one.
    #[must_use]
    pub fn branch_relation(&self) -> Option<Relation> {
        match self.opcode {
            opcodes::IF_ICMPEQ => Some(Relation::Eq),
            opcodes::IF_ICMPNE => Some(Relation::Ne),
            opcodes::IF_ICMPLT => Some(Relation::Lt),
            opcodes::IF_ICMPGE => Some(Relation::Ge),
            opcodes::IF_ICMPGT => Some(Relation::Gt),
            opcodes::IF_ICMPLE => Some(Relation::Le),
            opcodes::IF_ACMPEQ => Some(Relation::AcmpEq),
            opcodes::IF_ACMPNE => Some(Relation::AcmpNe),
            _ => None,
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}: ", self.offset)?;
        if self.wide {
            write!(f, "wide ")?;
        }
        write!(f, "{}", self.mnemonic)?;

        match &self.operand {
            Operand::None => Ok(()),
            Operand::Int(value) => write!(f, " {value}"),
            Operand::ConstantPool(index) => write!(f, " #{index}"),
            Operand::Local(index) => write!(f, " {index}"),
            Operand::Increment { local, delta } => write!(f, " {local}, {delta}"),
            Operand::Target(target) => write!(f, " {target}"),
            Operand::TableSwitch {
                default,
                low,
                high,
                ..
            } => write!(f, " {low}..={high} default {default}"),
            Operand::LookupSwitch { default, pairs } => {
                write!(f, " [{}] default {default}", pairs.len())
            }
            Operand::Invoke { index, count } => write!(f, " #{index}, {count}"),
            Operand::ArrayType(atype) => write!(f, " {atype}"),
            Operand::MultiNewArray { index, dimensions } => write!(f, " #{index}, {dimensions}"),
        }
    }
}
