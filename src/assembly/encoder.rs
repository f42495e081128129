//! Instruction encoding with label-based branch relocation.
//!
//! [`InstructionEncoder`] re-assembles a method body whose instructions may have changed
//! size. Labels are keyed by the *original* code offset of the instruction they mark, so a
//! decoded branch target can be handed to [`InstructionEncoder::emit_branch`] unchanged.
//! Branch displacements are written as placeholders and patched in
//! [`InstructionEncoder::finalize`], once every label has a position.
//!
//! # Examples
//!
//! ```rust
//! use pathcond::assembly::{opcodes, InstructionEncoder};
//!
//! let mut encoder = InstructionEncoder::new();
//! encoder.define_label(0)?;
//! encoder.emit_opcode(opcodes::NOP);
//! encoder.emit_branch(opcodes::GOTO, 0)?;
//!
//! let (bytecode, labels) = encoder.finalize()?;
//! assert_eq!(bytecode, vec![0x00, 0xA7, 0xFF, 0xFF]);
//! assert_eq!(labels[&0], 0);
//! # Ok::<(), pathcond::Error>(())
//! ```

use std::collections::HashMap;

use crate::{
    assembly::{instruction::OperandType, instructions::opcode_info, opcodes},
    file::io::write_be_at,
    Error, Result,
};

/// Maximum size of a method code array.
pub const MAX_CODE_LENGTH: usize = 65535;

/// A branch displacement waiting for its label to be placed.
#[derive(Debug, Clone)]
pub struct LabelFixup {
    /// The target label
    pub label: u32,
    /// Where the displacement bytes start
    pub fixup_position: usize,
    /// Size of the displacement in bytes (2 or 4)
    pub offset_size: u8,
    /// Position of the opcode the displacement is relative to
    pub instruction_position: usize,
}

/// Builder for a method code array.
#[derive(Debug, Default)]
pub struct InstructionEncoder {
    bytecode: Vec<u8>,
    labels: HashMap<u32, u32>,
    fixups: Vec<LabelFixup>,
}

impl InstructionEncoder {
    /// Create an empty encoder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current write position.
    #[must_use]
    pub fn position(&self) -> usize {
        self.bytecode.len()
    }

    /// Place `label` at the current position.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Malformed`] if the label was already placed.
    pub fn define_label(&mut self, label: u32) -> Result<()> {
        let position = self.position_u32()?;
        if self.labels.insert(label, position).is_some() {
            return Err(malformed_error!("Label {} defined twice", label));
        }
        Ok(())
    }

    /// Append raw bytes, typically an unmodified instruction.
    pub fn emit_bytes(&mut self, bytes: &[u8]) {
        self.bytecode.extend_from_slice(bytes);
    }

    /// Append a single opcode without operands.
    pub fn emit_opcode(&mut self, opcode: u8) {
        self.bytecode.push(opcode);
    }

    /// Append `invokestatic` of the method reference at constant-pool `index`.
    pub fn emit_invokestatic(&mut self, index: u16) {
        self.bytecode.push(opcodes::INVOKESTATIC);
        self.bytecode.extend_from_slice(&index.to_be_bytes());
    }

    /// Push an `int` constant using the shortest encoding.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Malformed`] for values that need a constant-pool entry.
    pub fn emit_int_constant(&mut self, value: i32) -> Result<()> {
        match value {
            -1..=5 => {
                #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                let opcode = (i32::from(opcodes::ICONST_0) + value) as u8;
                self.bytecode.push(opcode);
            }
            v if i8::try_from(v).is_ok() => {
                #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                self.bytecode.extend_from_slice(&[opcodes::BIPUSH, v as i8 as u8]);
            }
            v if i16::try_from(v).is_ok() => {
                #[allow(clippy::cast_possible_truncation)]
                let bytes = (v as i16).to_be_bytes();
                self.bytecode.push(opcodes::SIPUSH);
                self.bytecode.extend_from_slice(&bytes);
            }
            v => {
                return Err(malformed_error!(
                    "Constant {} requires a constant-pool entry",
                    v
                ))
            }
        }
        Ok(())
    }

    /// Append a branch instruction to `label`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Malformed`] if `opcode` is not a branch opcode.
    pub fn emit_branch(&mut self, opcode: u8, label: u32) -> Result<()> {
        let info = opcode_info(opcode)
            .ok_or_else(|| malformed_error!("Unknown branch opcode 0x{:02X}", opcode))?;

        let offset_size = match info.op_type {
            OperandType::Branch16 => 2,
            OperandType::Branch32 => 4,
            _ => {
                return Err(malformed_error!(
                    "instruction '{}' is not a branch instruction",
                    info.mnemonic
                ))
            }
        };

        let instruction_position = self.bytecode.len();
        self.bytecode.push(opcode);
        self.push_fixup(label, offset_size, instruction_position);
        Ok(())
    }

    /// Append a `tableswitch` with padding for the current position.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Malformed`] if the target count does not match `low..=high`.
    pub fn emit_table_switch(
        &mut self,
        default: u32,
        low: i32,
        high: i32,
        targets: &[u32],
    ) -> Result<()> {
        let expected = i64::from(high) - i64::from(low) + 1;
        if i64::try_from(targets.len()).ok() != Some(expected) {
            return Err(malformed_error!(
                "tableswitch {}..={} needs {} targets, got {}",
                low,
                high,
                expected,
                targets.len()
            ));
        }

        let instruction_position = self.bytecode.len();
        self.bytecode.push(opcodes::TABLESWITCH);
        self.pad_to_word();

        self.push_fixup(default, 4, instruction_position);
        self.bytecode.extend_from_slice(&low.to_be_bytes());
        self.bytecode.extend_from_slice(&high.to_be_bytes());
        for target in targets {
            self.push_fixup(*target, 4, instruction_position);
        }
        Ok(())
    }

    /// Append a `lookupswitch` with padding for the current position.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Malformed`] if there are more pairs than the format can count.
    pub fn emit_lookup_switch(&mut self, default: u32, pairs: &[(i32, u32)]) -> Result<()> {
        let npairs = i32::try_from(pairs.len())
            .map_err(|_| malformed_error!("Too many lookupswitch pairs"))?;

        let instruction_position = self.bytecode.len();
        self.bytecode.push(opcodes::LOOKUPSWITCH);
        self.pad_to_word();

        self.push_fixup(default, 4, instruction_position);
        self.bytecode.extend_from_slice(&npairs.to_be_bytes());
        for (key, target) in pairs {
            self.bytecode.extend_from_slice(&key.to_be_bytes());
            self.push_fixup(*target, 4, instruction_position);
        }
        Ok(())
    }

    /// Resolve all branch displacements.
    ///
    /// Returns the bytecode and the final position of every label.
    ///
    /// # Errors
    ///
    /// - [`Error::UndefinedLabel`] if a branch targets a label that was never placed
    /// - [`Error::BranchOutOfRange`] if a displacement does not fit its field
    /// - [`Error::Malformed`] if the code exceeds [`MAX_CODE_LENGTH`]
    pub fn finalize(mut self) -> Result<(Vec<u8>, HashMap<u32, u32>)> {
        if self.bytecode.len() > MAX_CODE_LENGTH {
            return Err(malformed_error!(
                "Code length {} exceeds {}",
                self.bytecode.len(),
                MAX_CODE_LENGTH
            ));
        }

        let fixups = std::mem::take(&mut self.fixups);
        for fixup in &fixups {
            let label_position = self
                .labels
                .get(&fixup.label)
                .ok_or(Error::UndefinedLabel(fixup.label))?;

            #[allow(clippy::cast_possible_wrap)]
            let offset = i64::from(*label_position) - fixup.instruction_position as i64;

            match fixup.offset_size {
                2 => {
                    let value = i16::try_from(offset)
                        .map_err(|_| Error::BranchOutOfRange { offset, size: 2 })?;
                    write_be_at(&mut self.bytecode, fixup.fixup_position, value)?;
                }
                _ => {
                    let value = i32::try_from(offset)
                        .map_err(|_| Error::BranchOutOfRange { offset, size: 4 })?;
                    write_be_at(&mut self.bytecode, fixup.fixup_position, value)?;
                }
            }
        }

        Ok((self.bytecode, self.labels))
    }

    fn push_fixup(&mut self, label: u32, offset_size: u8, instruction_position: usize) {
        self.fixups.push(LabelFixup {
            label,
            fixup_position: self.bytecode.len(),
            offset_size,
            instruction_position,
        });
        self.bytecode
            .extend(std::iter::repeat(0).take(usize::from(offset_size)));
    }

    fn pad_to_word(&mut self) {
        while self.bytecode.len() % 4 != 0 {
            self.bytecode.push(0);
        }
    }

    fn position_u32(&self) -> Result<u32> {
        u32::try_from(self.bytecode.len())
            .map_err(|_| malformed_error!("Code position exceeds u32 range"))
    }
}
