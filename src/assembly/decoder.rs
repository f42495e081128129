//! Linear instruction decoding.
//!
//! Method code is decoded front to back; every byte belongs to exactly one instruction, so
//! a linear sweep yields the complete instruction list. Relative branch displacements are
//! converted to absolute offsets during decoding.

use crate::{
    assembly::{
        instruction::{Instruction, Operand, OperandType},
        instructions::opcode_info,
        opcodes,
    },
    file::parser::Parser,
    Error, Result,
};

/// Decode the instruction under the parser's cursor and advance past it.
///
/// Offsets are relative to the start of the parser's data, which must be the start of the
/// method code: switch padding is computed from it.
///
/// # Errors
///
/// Returns [`Error::UnknownOpcode`] for undefined opcodes, [`Error::OutOfBounds`] for
/// truncated operands and [`Error::Malformed`] for inconsistent operands.
///
/// # Examples
///
/// ```rust
/// use pathcond::{assembly::{decode_instruction, Operand}, Parser};
///
/// let code = [0x00, 0xA7, 0xFF, 0xFF]; // nop; goto -1
/// let mut parser = Parser::new(&code);
/// let nop = decode_instruction(&mut parser)?;
/// let goto = decode_instruction(&mut parser)?;
/// assert_eq!(nop.mnemonic, "nop");
/// assert_eq!(goto.operand, Operand::Target(0));
/// # Ok::<(), pathcond::Error>(())
/// ```
pub fn decode_instruction(parser: &mut Parser<'_>) -> Result<Instruction> {
    let start = parser.pos();
    let offset = u32::try_from(start)
        .map_err(|_| malformed_error!("Instruction offset {} exceeds u32 range", start))?;

    let mut opcode = parser.read_be::<u8>()?;
    let mut wide = false;
    if opcode == opcodes::WIDE {
        wide = true;
        opcode = parser.read_be::<u8>()?;
    }

    let info = opcode_info(opcode).ok_or(Error::UnknownOpcode {
        opcode,
        offset: start,
    })?;

    if wide && !matches!(info.op_type, OperandType::Local | OperandType::Increment) {
        return Err(malformed_error!(
            "wide prefix can not modify '{}' at offset {}",
            info.mnemonic,
            start
        ));
    }

    let operand = match info.op_type {
        OperandType::None => Operand::None,
        OperandType::Int8 => Operand::Int(i32::from(parser.read_be::<i8>()?)),
        OperandType::Int16 => Operand::Int(i32::from(parser.read_be::<i16>()?)),
        OperandType::ConstantPool8 => Operand::ConstantPool(u16::from(parser.read_be::<u8>()?)),
        OperandType::ConstantPool16 => Operand::ConstantPool(parser.read_be::<u16>()?),
        OperandType::Local => {
            if wide {
                Operand::Local(parser.read_be::<u16>()?)
            } else {
                Operand::Local(u16::from(parser.read_be::<u8>()?))
            }
        }
        OperandType::Increment => {
            if wide {
                Operand::Increment {
                    local: parser.read_be::<u16>()?,
                    delta: parser.read_be::<i16>()?,
                }
            } else {
                Operand::Increment {
                    local: u16::from(parser.read_be::<u8>()?),
                    delta: i16::from(parser.read_be::<i8>()?),
                }
            }
        }
        OperandType::Branch16 => {
            let displacement = i32::from(parser.read_be::<i16>()?);
            Operand::Target(branch_target(offset, displacement)?)
        }
        OperandType::Branch32 => {
            let displacement = parser.read_be::<i32>()?;
            Operand::Target(branch_target(offset, displacement)?)
        }
        OperandType::TableSwitch => decode_table_switch(parser, offset)?,
        OperandType::LookupSwitch => decode_lookup_switch(parser, offset)?,
        OperandType::InvokeInterface => {
            let index = parser.read_be::<u16>()?;
            let count = parser.read_be::<u8>()?;
            parser.advance_by(1)?;
            Operand::Invoke { index, count }
        }
        OperandType::InvokeDynamic => {
            let index = parser.read_be::<u16>()?;
            parser.advance_by(2)?;
            Operand::Invoke { index, count: 0 }
        }
        OperandType::ArrayType => Operand::ArrayType(parser.read_be::<u8>()?),
        OperandType::MultiNewArray => Operand::MultiNewArray {
            index: parser.read_be::<u16>()?,
            dimensions: parser.read_be::<u8>()?,
        },
        OperandType::Wide => {
            return Err(malformed_error!("Nested wide prefix at offset {}", start));
        }
    };

    #[allow(clippy::cast_possible_truncation)]
    let size = (parser.pos() - start) as u32;

    Ok(Instruction {
        offset,
        size,
        opcode,
        wide,
        mnemonic: info.mnemonic,
        flow_type: info.flow,
        operand,
    })
}

/// Decode a complete method code array.
///
/// # Errors
///
/// Propagates any error of [`decode_instruction`].
pub fn decode_stream(code: &[u8]) -> Result<Vec<Instruction>> {
    let mut parser = Parser::new(code);
    let mut instructions = Vec::new();

    while parser.has_more_data() {
        instructions.push(decode_instruction(&mut parser)?);
    }

    Ok(instructions)
}

fn branch_target(offset: u32, displacement: i32) -> Result<u32> {
    let target = i64::from(offset) + i64::from(displacement);
    u32::try_from(target).map_err(|_| {
        malformed_error!(
            "Branch at offset {} jumps outside the method ({})",
            offset,
            target
        )
    })
}

fn decode_table_switch(parser: &mut Parser<'_>, offset: u32) -> Result<Operand> {
    parser.align(4)?;

    let default = branch_target(offset, parser.read_be::<i32>()?)?;
    let low = parser.read_be::<i32>()?;
    let high = parser.read_be::<i32>()?;
    if high < low {
        return Err(malformed_error!(
            "tableswitch at offset {} has high {} < low {}",
            offset,
            high,
            low
        ));
    }

    let count = usize::try_from(i64::from(high) - i64::from(low) + 1)
        .map_err(|_| malformed_error!("tableswitch at offset {} is too large", offset))?;
    if count.saturating_mul(4) > parser.remaining() {
        return Err(out_of_bounds_error!());
    }

    let mut targets = Vec::with_capacity(count);
    for _ in 0..count {
        targets.push(branch_target(offset, parser.read_be::<i32>()?)?);
    }

    Ok(Operand::TableSwitch {
        default,
        low,
        high,
        targets,
    })
}

fn decode_lookup_switch(parser: &mut Parser<'_>, offset: u32) -> Result<Operand> {
    parser.align(4)?;

    let default = branch_target(offset, parser.read_be::<i32>()?)?;
    let npairs = parser.read_be::<i32>()?;
    let count = usize::try_from(npairs).map_err(|_| {
        malformed_error!(
            "lookupswitch at offset {} has negative pair count {}",
            offset,
            npairs
        )
    })?;
    if count.saturating_mul(8) > parser.remaining() {
        return Err(out_of_bounds_error!());
    }

    let mut pairs = Vec::with_capacity(count);
    for _ in 0..count {
        let key = parser.read_be::<i32>()?;
        let target = branch_target(offset, parser.read_be::<i32>()?)?;
        pairs.push((key, target));
    }

    Ok(Operand::LookupSwitch { default, pairs })
}
