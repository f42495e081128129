//! Instruction model, decoder and encoder for JVM-style method bytecode.
//!
//! This module provides the instruction-level plumbing the comparison rewriter is built on:
//!
//! - **Opcode table**: [`INSTRUCTIONS`] describes operand layout and control flow of every
//!   defined opcode
//! - **Decoding**: [`decode_stream`] turns a code array into [`Instruction`]s whose branch
//!   operands are absolute offsets
//! - **Encoding**: [`InstructionEncoder`] re-assembles instructions, relocating branches and
//!   re-padding switch payloads for their new positions
//!
//! # Example
//!
//! ```rust
//! use pathcond::assembly::decode_stream;
//!
//! let code = [0x1E, 0x20, 0x94, 0xAC]; // lload_0; lload_2; lcmp; ireturn
//! let instructions = decode_stream(&code)?;
//!
//! assert_eq!(instructions.len(), 4);
//! assert!(instructions[2].is_ordered_compare());
//! # Ok::<(), pathcond::Error>(())
//! ```

mod decoder;
mod encoder;
mod instruction;
mod instructions;
pub mod opcodes;

pub use decoder::{decode_instruction, decode_stream};
pub use encoder::{InstructionEncoder, LabelFixup, MAX_CODE_LENGTH};
pub use instruction::{FlowType, Instruction, Operand, OperandType};
pub use instructions::{opcode_info, OpcodeInfo, INSTRUCTIONS};
